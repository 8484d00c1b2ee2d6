//! The bidirectional type negotiator.
//!
//! For every typed expression the negotiator reconciles a *required* type
//! (pushed down from context: a declared variable, a formal parameter, a
//! channel element) with the expression's own *known or guessable* type
//! (pushed up from the leaves). Three per-node operations carry the whole
//! protocol:
//!
//! - `expr_type` — the node's current best-known type, possibly unknown;
//! - `apply_type` — fix the node to a type, recursively constraining
//!   sub-expressions; the sole mutation point, idempotent on success;
//! - `guess_type` — a pure bottom-up guess used when no context exists
//!   (`{1, 2}` guesses `[]int`).
//!
//! [`Typer::check_block`] drives statements top-down; within an expression
//! types flow both ways. The first failing negotiation aborts the pass.

use crate::ast::{
    AssertExpr, AssignOp, AssignStmt, BasicLit, BinaryExpr, Binding, Block, CallExpr,
    CompoundLit, CompoundShape, Expr, IndexExpr, LitKind, ReturnStmt, SelectorExpr, SendStmt,
    Stmt, SwitchStmt, UnOp, UnaryExpr, VarDecl, Vars,
};
use crate::error::TypeError;
use crate::types::{ChanDir, Decls, Kind, Method, SimpleKind, Type, TypeList};

/// Negotiates and validates types across a code block. Declarations are
/// read-only during a check; variable slots are filled through [`Vars`].
pub struct Typer<'a> {
    decls: &'a Decls,
    vars: &'a mut Vars,
}

impl<'a> Typer<'a> {
    pub fn new(decls: &'a Decls, vars: &'a mut Vars) -> Self {
        Self { decls, vars }
    }

    /// Check every statement of a block, stopping at the first error.
    pub fn check_block(&mut self, block: &mut Block) -> Result<(), TypeError> {
        for stmt in &mut block.stmts {
            self.negotiate_stmt(stmt)?;
        }
        Ok(())
    }

    // =========================================================================
    // Type relations
    // =========================================================================

    /// Assignability: interfaces absorb anything that implements them;
    /// two named types must have the same name; otherwise the underlying
    /// canonical strings must match.
    pub fn assignable(&self, to: &Type, what: &Type) -> bool {
        if self.decls.is_interface(to) {
            return self.implements(to, what);
        }
        if Decls::is_named(to) && Decls::is_named(what) {
            return to.to_string() == what.to_string();
        }
        self.decls.underlying(to).to_string() == self.decls.underlying(what).to_string()
    }

    /// Whether `value`'s method set covers every method the interface
    /// requires. Pointer-receiver methods only count when the value itself
    /// was a pointer.
    pub fn implements(&self, iface: &Type, value: &Type) -> bool {
        let Type::Interface(iface) = self.decls.root(iface) else {
            return false;
        };

        let (value, ptr) = match value {
            Type::Pointer(to) => (&**to, true),
            _ => (value, false),
        };

        // Types other than named ones and interfaces have no methods, but
        // they still satisfy the empty interface.
        let methods: &[Method] = match value {
            Type::Custom { decl, .. } => &self.decls.get(*decl).methods,
            Type::Interface(i) => &i.methods,
            _ => &[],
        };

        iface.methods.iter().all(|required| {
            methods.iter().any(|m| {
                m.name == required.name
                    && m.ptr_receiver == ptr
                    && m.sig.to_string() == required.sig.to_string()
            })
        })
    }

    /// Explicit-conversion legality; weaker than assignability.
    pub fn convertible(&self, what: &Type, to: &Type) -> bool {
        if self.assignable(to, what) {
            return true;
        }
        if self.decls.underlying(to).to_string() == self.decls.underlying(what).to_string() {
            return true;
        }
        if let (Type::Pointer(a), Type::Pointer(b)) = (to, what) {
            if self.decls.underlying(a).to_string() == self.decls.underlying(b).to_string() {
                return true;
            }
        }
        // TODO: numeric-width conversions and string <-> byte/rune slices.
        false
    }

    /// Mutually assignable, both known.
    pub fn comparable(&self, t1: &Type, t2: &Type) -> bool {
        if t1.kind() == Kind::Unknown || t2.kind() == Kind::Unknown {
            // Might still work out once a guess settles the parent.
            return false;
        }
        self.assignable(t1, t2) && self.assignable(t2, t1)
    }

    /// Comparable and of the same ordered primitive (int or string).
    pub fn ordered(&self, t1: &Type, t2: &Type) -> bool {
        if !self.comparable(t1, t2) {
            return false;
        }
        match (t1, t2) {
            (Type::Simple(a), Type::Simple(b)) => {
                a == b && matches!(a, SimpleKind::Int | SimpleKind::String)
            }
            _ => false,
        }
    }

    fn bool_assignable(&self, t: &Type) -> bool {
        self.assignable(&Type::Simple(SimpleKind::Bool), t)
    }

    // =========================================================================
    // The core primitive
    // =========================================================================

    /// Reconcile a type slot (a declared variable's type, a formal result,
    /// a fresh unknown) with an expression. On success the slot is known
    /// and the expression satisfies it.
    pub fn negotiate_expr_type(&mut self, slot: &mut Type, value: &mut Expr) -> Result<(), TypeError> {
        let value_type = self.expr_type(value);

        let typ = if slot.known() {
            slot.clone()
        } else if value_type.known() {
            value_type.clone()
        } else {
            // Literals like `1` or `{1, 2}` fit many types; with no context
            // available, their guess decides (int, []int).
            match self.guess_type(value) {
                Some(guessed) if guessed.known() => guessed,
                _ => return Err(TypeError::CannotInfer),
            }
        };

        *slot = typ.clone();

        if !value_type.known() {
            // Interfaces are not forced onto the value: the expression keeps
            // its narrower concrete type and only has to prove assignability.
            // This is how builtin types land in the empty interface.
            if self.decls.is_interface(&typ) {
                if let Some(guessed) = self.guess_type(value) {
                    if !self.assignable(&typ, &guessed) {
                        return Err(TypeError::NotAssignable(
                            typ.to_string(),
                            guessed.to_string(),
                        ));
                    }
                    return self.apply_type(value, &guessed);
                }
            }
            self.apply_type(value, &typ)
        } else {
            if !self.assignable(&typ, &value_type) {
                return Err(TypeError::NotAssignable(
                    typ.to_string(),
                    value_type.to_string(),
                ));
            }
            // Re-applying the expression's own type looks redundant, but
            // apply performs side checks the bare comparison does not.
            self.apply_type(value, &value_type)
        }
    }

    /// Distribute a multi-valued right side over several slots. Calls carry
    /// their tuple type already; map indexing, channel receives and type
    /// assertions grow an implicit `(value, bool)` pair — but only in
    /// assignment position (`only_calls` is false).
    pub fn negotiate_tuple_unpack(
        &mut self,
        only_calls: bool,
        slots: &mut [Type],
        rhs: &mut Expr,
    ) -> Result<(), TypeError> {
        let tuple: TypeList = match rhs {
            Expr::Call(_) => match self.expr_type(rhs) {
                Type::Tuple(members) => *members,
                _ => return Err(TypeError::UnpackSingleResult),
            },
            _ => {
                if only_calls {
                    return Err(TypeError::UnpackTooFew);
                }

                let mut left = self.expr_type(rhs);
                if !left.known() {
                    left = self.guess_type(rhs).unwrap_or(Type::Unknown);
                }
                if !left.known() {
                    return Err(TypeError::UnpackUnknownRhs);
                }

                match left {
                    // An earlier negotiation already switched the node into
                    // the two-value form; reuse it.
                    Type::Tuple(members) if members.len() == 2 => *members,
                    other => {
                        let pair = Type::pair(other, Type::Simple(SimpleKind::Bool));
                        self.apply_type(rhs, &pair)?;
                        match pair {
                            Type::Tuple(members) => *members,
                            _ => unreachable!(),
                        }
                    }
                }
            }
        };

        if slots.len() != tuple.len() {
            return Err(TypeError::AssignArity);
        }

        for (slot, member) in slots.iter_mut().zip(tuple.iter()) {
            let typ = if slot.known() {
                slot.clone()
            } else if member.known() {
                member.clone()
            } else {
                return Err(TypeError::CannotInfer);
            };

            if !member.known() {
                return Err(TypeError::UnknownTupleMember);
            }

            if slot.kind() == Kind::Unknown {
                *slot = typ;
            } else if !self.assignable(slot, member) {
                return Err(TypeError::NotAssignable(slot.to_string(), member.to_string()));
            }
        }
        Ok(())
    }

    /// A condition negotiates against `bool` and must end bool-assignable.
    fn check_condition(&mut self, expr: &mut Expr) -> Result<(), TypeError> {
        let mut slot = Type::Simple(SimpleKind::Bool);
        self.negotiate_expr_type(&mut slot, expr)?;
        if !self.bool_assignable(&slot) {
            return Err(TypeError::NotBool);
        }
        Ok(())
    }

    // =========================================================================
    // Statement dispatch
    // =========================================================================

    fn negotiate_stmt(&mut self, stmt: &mut Stmt) -> Result<(), TypeError> {
        match stmt {
            Stmt::Var(vs) => {
                for decl in &mut vs.decls {
                    self.negotiate_var_decl(decl)?;
                }
                Ok(())
            }
            Stmt::Assign(assign) => self.negotiate_assign(assign),
            Stmt::Expr(es) => {
                let mut unknown = Type::Unknown;
                self.negotiate_expr_type(&mut unknown, &mut es.expr)
            }
            Stmt::Return(ret) => self.negotiate_return(ret),
            Stmt::Send(send) => self.negotiate_send(send),
            Stmt::If(ifs) => {
                for branch in &mut ifs.branches {
                    if let Some(scoped) = &mut branch.scoped_var {
                        for decl in &mut scoped.decls {
                            self.negotiate_var_decl(decl)?;
                        }
                    }
                    if let Some(cond) = &mut branch.condition {
                        self.check_condition(cond)?;
                    }
                    self.check_block(&mut branch.code)?;
                }
                Ok(())
            }
            Stmt::For(fs) => {
                if let Some(scoped) = &mut fs.scoped_var {
                    for decl in &mut scoped.decls {
                        self.negotiate_var_decl(decl)?;
                    }
                }
                if let Some(cond) = &mut fs.condition {
                    self.check_condition(cond)?;
                }
                if let Some(repeat) = &mut fs.repeat {
                    self.negotiate_stmt(repeat)?;
                }
                self.check_block(&mut fs.code)
            }
            Stmt::Switch(switch) => self.negotiate_switch(switch),
            Stmt::Struct(ss) => {
                for method in &mut ss.methods {
                    self.check_block(&mut method.code)?;
                }
                Ok(())
            }
            Stmt::Iface(_) | Stmt::TypeDecl(_) | Stmt::Label(_) | Stmt::Branch(_) | Stmt::Pass => {
                Ok(())
            }
        }
    }

    fn negotiate_var_decl(&mut self, decl: &mut VarDecl) -> Result<(), TypeError> {
        if decl.vars.len() > 1 && decl.inits.len() == 1 {
            // Multiple variables, one multi-valued initializer.
            let mut slots: Vec<Type> =
                decl.vars.iter().map(|v| self.vars.get(*v).typ.clone()).collect();
            let result = self.negotiate_tuple_unpack(false, &mut slots, &mut decl.inits[0]);
            for (v, slot) in decl.vars.iter().zip(slots) {
                self.vars.put_type(*v, slot);
            }
            return result;
        }

        for i in 0..decl.vars.len() {
            let var = decl.vars[i];
            let mut slot = self.vars.take_type(var);
            let result = match decl.inits.get_mut(i) {
                Some(init) => self.negotiate_expr_type(&mut slot, init),
                None => {
                    let mut blank = Expr::Blank;
                    self.negotiate_expr_type(&mut slot, &mut blank)
                }
            };
            self.vars.put_type(var, slot);
            result?;
        }
        Ok(())
    }

    fn negotiate_assign(&mut self, assign: &mut AssignStmt) -> Result<(), TypeError> {
        if assign.lhs.len() != assign.rhs.len() {
            if assign.rhs.len() == 1 {
                let mut slots: Vec<Type> =
                    assign.lhs.iter().map(|l| self.expr_type(l)).collect();
                return self.negotiate_tuple_unpack(false, &mut slots, &mut assign.rhs[0]);
            }
            return Err(TypeError::AssignArity);
        }

        for i in 0..assign.lhs.len() {
            let mut left_type = self.expr_type(&assign.lhs[i]);
            self.negotiate_expr_type(&mut left_type, &mut assign.rhs[i])?;
            // TODO: check lvalue addressability, and numeric operand kinds
            // for the compound forms (+=, -=, ...).
        }
        Ok(())
    }

    fn negotiate_return(&mut self, ret: &mut ReturnStmt) -> Result<(), TypeError> {
        if ret.results.len() != ret.values.len() {
            return Err(TypeError::ReturnArity);
        }
        for (result_var, value) in ret.results.clone().into_iter().zip(&mut ret.values) {
            let mut slot = self.vars.take_type(result_var);
            let outcome = self.negotiate_expr_type(&mut slot, value);
            self.vars.put_type(result_var, slot);
            outcome?;
        }
        Ok(())
    }

    fn negotiate_send(&mut self, send: &mut SendStmt) -> Result<(), TypeError> {
        let mut left_type = Type::Unknown;
        self.negotiate_expr_type(&mut left_type, &mut send.lhs)?;

        let mut right_type = Type::Unknown;
        self.negotiate_expr_type(&mut right_type, &mut send.rhs)?;

        let Type::Chan { dir, elem } = self.decls.root(&left_type).clone() else {
            return Err(TypeError::SendToNonChan);
        };
        if dir == ChanDir::Recv {
            return Err(TypeError::SendToReceiveOnly);
        }
        if !self.assignable(&elem, &right_type) {
            return Err(TypeError::SendElemMismatch);
        }
        Ok(())
    }

    fn negotiate_switch(&mut self, switch: &mut SwitchStmt) -> Result<(), TypeError> {
        if let Some(scoped) = &mut switch.scoped {
            match &**scoped {
                Stmt::Var(_) => {}
                Stmt::Assign(assign) if assign.op == AssignOp::Assign => {}
                Stmt::Assign(_) => return Err(TypeError::ScopedAssignOp),
                _ => return Err(TypeError::ScopedStmtKind),
            }
            self.negotiate_stmt(scoped)?;
        }

        // Without a discriminant, case values are conditions.
        let mut value_type = Type::Simple(SimpleKind::Bool);
        if let Some(value) = &mut switch.value {
            let mut unknown = Type::Unknown;
            self.negotiate_expr_type(&mut unknown, value)?;
            value_type = self.expr_type(value);
        }

        let mut seen_default = false;

        for (i, branch) in switch.branches.iter_mut().enumerate() {
            if branch.values.is_empty() {
                if seen_default {
                    return Err(TypeError::DuplicateDefault);
                }
                seen_default = true;
            } else {
                if switch.value.is_none() && branch.values.len() > 1 {
                    return Err(TypeError::FreeformSwitchValues);
                }
                for value in &mut branch.values {
                    self.negotiate_expr_type(&mut value_type, value)
                        .map_err(|e| TypeError::SwitchClause(Box::new(e), i + 1))?;

                    let value_expr_type = self.expr_type(value);
                    if !self.comparable(&value_type, &value_expr_type) {
                        return Err(TypeError::SwitchNotComparable(
                            value_type.to_string(),
                            value_expr_type.to_string(),
                        ));
                    }
                }
            }

            self.check_block(&mut branch.code)?;
        }
        Ok(())
    }

    // =========================================================================
    // The per-node protocol: expr_type / apply_type / guess_type
    // =========================================================================

    /// The expression's current best-known type. May be unknown.
    pub fn expr_type(&self, expr: &Expr) -> Type {
        match expr {
            Expr::Blank => Type::Unknown,
            Expr::Basic(lit) => lit.typ.clone(),
            Expr::Nil(lit) => lit.typ.clone(),
            Expr::Ident(ident) => match ident.binding {
                Binding::Var(id) => self.vars.get(id).typ.clone(),
                _ => Type::Unknown,
            },
            Expr::Unary(unary) => self.unary_type(unary),
            Expr::Binary(binary) => {
                if binary.op.is_comparison() {
                    Type::Simple(SimpleKind::Bool)
                } else {
                    // Left and right are negotiated to the same type.
                    self.expr_type(&binary.left)
                }
            }
            Expr::Call(call) => self.call_type(call),
            Expr::Index(index) => self.index_type(index),
            Expr::SliceRange(_) => Type::Unknown,
            Expr::Selector(sel) => self.selector_type(sel),
            Expr::Assert(assert) => {
                if assert.typ.known() {
                    assert.typ.clone()
                } else if assert.for_switch {
                    Type::Unknown
                } else {
                    assert.asserted.clone()
                }
            }
            Expr::Compound(lit) => lit.typ.clone(),
            Expr::TypeRef(tr) => tr.typ.clone(),
            Expr::Func(decl) => Type::Func(Box::new(decl.sig.clone())),
        }
    }

    /// Fix the expression to `typ`, recursively constraining children.
    /// The sole mutation point of the protocol.
    pub fn apply_type(&mut self, expr: &mut Expr, typ: &Type) -> Result<(), TypeError> {
        match expr {
            Expr::Blank => Ok(()),
            Expr::Basic(lit) => self.apply_basic(lit, typ),
            Expr::Nil(lit) => match self.decls.root(typ).kind() {
                Kind::Pointer | Kind::Interface | Kind::Map | Kind::Slice | Kind::Func => {
                    lit.typ = typ.clone();
                    Ok(())
                }
                _ => Err(TypeError::NotNilable(typ.to_string())),
            },
            Expr::Ident(ident) => {
                let Binding::Var(id) = ident.binding else {
                    return Err(TypeError::NotAVariable(ident.name.clone()));
                };
                let var_type = self.vars.get(id).typ.clone();
                if !self.assignable(typ, &var_type) {
                    return Err(TypeError::IdentTypeMismatch(
                        ident.name.clone(),
                        var_type.to_string(),
                        typ.to_string(),
                    ));
                }
                Ok(())
            }
            Expr::Unary(unary) => self.apply_unary(unary, typ),
            Expr::Binary(binary) => self.apply_binary(binary, typ),
            Expr::Call(call) => self.apply_call(call, typ),
            Expr::Index(index) => self.apply_index(index, typ),
            Expr::SliceRange(_) => Err(TypeError::CannotInfer),
            Expr::Selector(sel) => {
                if self.selector_type(sel).to_string() != typ.to_string() {
                    return Err(TypeError::NoSuchMember(
                        self.expr_type(&sel.left).to_string(),
                        sel.name.clone(),
                    ));
                }
                Ok(())
            }
            Expr::Assert(assert) => self.apply_assert(assert, typ),
            Expr::Compound(lit) => self.apply_compound(lit, typ),
            Expr::TypeRef(tr) => {
                if tr.typ.to_string() != typ.to_string() {
                    return Err(TypeError::DifferentTypes(
                        tr.typ.to_string(),
                        typ.to_string(),
                    ));
                }
                Ok(())
            }
            Expr::Func(decl) => {
                let own = Type::Func(Box::new(decl.sig.clone()));
                if !self.assignable(typ, &own) {
                    return Err(TypeError::CannotAssign(own.to_string(), typ.to_string()));
                }
                self.check_block(&mut decl.code)
            }
        }
    }

    /// A pure, best-effort bottom-up guess; `None` when the node needs
    /// context to mean anything.
    pub fn guess_type(&self, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::Basic(lit) => Some(match lit.kind {
                LitKind::Str => Type::Simple(SimpleKind::String),
                LitKind::Int => Type::Simple(SimpleKind::Int),
                LitKind::Float => Type::Simple(SimpleKind::Float64),
                LitKind::Imag => Type::Simple(SimpleKind::Complex128),
                LitKind::Bool => Type::Simple(SimpleKind::Bool),
                LitKind::Rune => Type::Simple(SimpleKind::Rune),
            }),
            // nil insists on a context type.
            Expr::Nil(_) => None,
            Expr::Unary(unary) => self.guess_unary(unary),
            Expr::Binary(binary) => {
                let left = self.guess_type(&binary.left);
                let right = self.guess_type(&binary.right);
                match (left, right) {
                    (Some(l), Some(r)) if l.to_string() == r.to_string() => Some(l),
                    (Some(l), _) => Some(l),
                    (_, Some(r)) => Some(r),
                    _ => None,
                }
            }
            Expr::Call(call) => self.expr_to_type_name(&call.left),
            Expr::Index(index) => {
                let container = self.guess_type(&index.left)?;
                let (_, value) = self.container_base_types(&container)?;
                if matches!(*index.index, Expr::SliceRange(_)) {
                    Some(Type::slice(value))
                } else {
                    Some(value)
                }
            }
            Expr::Compound(lit) => self.guess_compound(lit),
            _ => None,
        }
    }

    // =========================================================================
    // Expression cases
    // =========================================================================

    /// A call's callee may actually be a type name, making the whole form a
    /// conversion. Resolution already bound the identifier, so the decision
    /// is local; a unary `*T` in callee position builds a pointer type.
    fn expr_to_type_name(&self, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::TypeRef(tr) => Some(tr.typ.clone()),
            Expr::Unary(unary) if unary.op == UnOp::Deref => {
                Some(Type::pointer(self.expr_to_type_name(&unary.right)?))
            }
            Expr::Ident(ident) => match ident.binding {
                Binding::TypeName(decl) => Some(self.decls.custom(decl)),
                _ => None,
            },
            _ => None,
        }
    }

    fn call_type(&self, call: &CallExpr) -> Type {
        if let Some(target) = self.expr_to_type_name(&call.left) {
            if call.args.len() == 1 && self.convertible(&self.expr_type(&call.args[0]), &target)
            {
                return target;
            }
            return Type::Unknown;
        }

        let callee_type = self.expr_type(&call.left);
        let Type::Func(sig) = self.decls.underlying(&callee_type) else {
            return Type::Unknown;
        };
        match sig.results.len() {
            0 => Type::Unknown,
            1 => sig.results[0].clone(),
            _ => Type::Tuple(Box::new(sig.results.clone())),
        }
    }

    fn apply_call(&mut self, call: &mut CallExpr, typ: &Type) -> Result<(), TypeError> {
        if let Some(target) = self.expr_to_type_name(&call.left) {
            if call.args.len() != 1 {
                return Err(TypeError::ConversionArity);
            }
            // Try applying; even if it fails the argument may still be
            // convertible.
            let _ = self.apply_type(&mut call.args[0], &target);
            let arg_type = self.expr_type(&call.args[0]);
            if !self.convertible(&arg_type, &target) {
                return Err(TypeError::ImpossibleConversion(
                    arg_type.to_string(),
                    target.to_string(),
                ));
            }
            if !self.assignable(typ, &target) {
                return Err(TypeError::CannotAssign(target.to_string(), typ.to_string()));
            }
            return Ok(());
        }

        let callee_type = self.expr_type(&call.left);
        let Type::Func(sig) = self.decls.underlying(&callee_type).clone() else {
            return Err(TypeError::NotCallable(
                self.decls.underlying(&callee_type).to_string(),
            ));
        };

        if typ.kind() == Kind::Tuple {
            // Tuples flow through unpacking, never through a scalar apply.
            return Err(TypeError::CannotAssign(
                Type::Func(sig).to_string(),
                typ.to_string(),
            ));
        }

        match sig.results.len() {
            0 => return Err(TypeError::NoResults(Type::Func(sig).to_string())),
            1 => {
                if !self.assignable(&sig.results[0], typ) {
                    return Err(TypeError::CannotAssign(
                        sig.results[0].to_string(),
                        typ.to_string(),
                    ));
                }
            }
            _ => return Err(TypeError::TooManyResults(Type::Func(sig).to_string())),
        }

        if sig.args.len() != call.args.len() {
            if call.args.len() == 1 {
                // One multi-valued argument feeding several parameters.
                let mut slots: Vec<Type> = sig.args.iter().cloned().collect();
                return self.negotiate_tuple_unpack(true, &mut slots, &mut call.args[0]);
            }
            return Err(TypeError::CallArity(call.args.len(), sig.args.len()));
        }

        for (param, arg) in sig.args.iter().zip(&mut call.args) {
            let mut slot = param.clone();
            self.negotiate_expr_type(&mut slot, arg)?;
        }
        Ok(())
    }

    fn unary_type(&self, unary: &UnaryExpr) -> Type {
        if unary.typ.known() {
            // The two-value receive form was negotiated already.
            return unary.typ.clone();
        }
        match unary.op {
            UnOp::Plus | UnOp::Minus | UnOp::Shl | UnOp::Shr => self.expr_type(&unary.right),
            UnOp::Deref => match self.expr_type(&unary.right) {
                Type::Pointer(to) => *to,
                _ => Type::Unknown,
            },
            UnOp::Addr => Type::pointer(self.expr_type(&unary.right)),
            UnOp::Recv => {
                let right = self.expr_type(&unary.right);
                match self.decls.root(&right) {
                    Type::Chan { elem, .. } => (**elem).clone(),
                    _ => Type::Unknown,
                }
            }
        }
    }

    fn apply_unary(&mut self, unary: &mut UnaryExpr, typ: &Type) -> Result<(), TypeError> {
        match unary.op {
            UnOp::Plus | UnOp::Minus | UnOp::Shl | UnOp::Shr => {
                self.apply_type(&mut unary.right, typ)
            }
            UnOp::Deref => self.apply_type(&mut unary.right, &Type::pointer(typ.clone())),
            UnOp::Addr => {
                let Type::Pointer(to) = self.decls.underlying(typ).clone() else {
                    return Err(TypeError::NotPointer);
                };
                self.apply_type(&mut unary.right, &to)
            }
            UnOp::Recv => {
                let right_type = self.expr_type(&unary.right);
                let Type::Chan { dir, elem } = self.decls.root(&right_type).clone() else {
                    return Err(TypeError::NotChannel(right_type.to_string()));
                };
                if dir == ChanDir::Send {
                    return Err(TypeError::RecvFromSendOnly(right_type.to_string()));
                }

                let mut target = typ.clone();
                if let Type::Tuple(members) = typ {
                    if members.len() != 2 {
                        return Err(TypeError::RecvTupleArity);
                    }
                    if !self.bool_assignable(&members[1]) {
                        return Err(TypeError::RecvSecondNotBool(members[1].to_string()));
                    }
                    unary.typ = typ.clone();
                    target = members[0].clone();
                }

                if !self.assignable(&elem, &target) {
                    return Err(TypeError::NotAssignable(
                        elem.to_string(),
                        target.to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    fn guess_unary(&self, unary: &UnaryExpr) -> Option<Type> {
        match unary.op {
            UnOp::Plus | UnOp::Minus | UnOp::Shl | UnOp::Shr => self.guess_type(&unary.right),
            UnOp::Deref => match self.guess_type(&unary.right)? {
                Type::Pointer(to) => Some(*to),
                _ => None,
            },
            UnOp::Addr => Some(Type::pointer(self.guess_type(&unary.right)?)),
            UnOp::Recv => {
                let guessed = self.guess_type(&unary.right)?;
                match self.decls.root(&guessed) {
                    Type::Chan { elem, .. } => Some((**elem).clone()),
                    _ => None,
                }
            }
        }
    }

    fn apply_binary(&mut self, binary: &mut BinaryExpr, typ: &Type) -> Result<(), TypeError> {
        if binary.op.is_comparison() {
            // Comparisons have their own rules: the result is bool and the
            // operand types come from each other.
            return self.apply_comparison(binary, typ);
        }

        if binary.op.is_logical() && !self.bool_assignable(typ) {
            return Err(TypeError::LogicalNotBool(typ.to_string()));
        }

        // TODO: validate operand kinds per operator (numeric operators for
        // numeric types, no tuples).
        self.apply_type(&mut binary.left, typ)?;
        self.apply_type(&mut binary.right, typ)
    }

    fn apply_comparison(&mut self, binary: &mut BinaryExpr, typ: &Type) -> Result<(), TypeError> {
        if !self.bool_assignable(typ) {
            return Err(TypeError::ComparisonNotBool(typ.to_string()));
        }

        let mut left_type = self.expr_type(&binary.left);
        if !left_type.known() {
            if let Some(guessed) = self.guess_type(&binary.left) {
                left_type = guessed;
            }
        }

        let mut right_type = self.expr_type(&binary.right);
        if !right_type.known() {
            if let Some(guessed) = self.guess_type(&binary.right) {
                right_type = guessed;
            }
        }

        // One known side infers the other; neither known is fatal.
        match (left_type.known(), right_type.known()) {
            (true, false) => {
                self.apply_type(&mut binary.right, &left_type)?;
                right_type = left_type.clone();
            }
            (false, true) => {
                self.apply_type(&mut binary.left, &right_type)?;
                left_type = right_type.clone();
            }
            (false, false) => return Err(TypeError::OperandsUnknown),
            (true, true) => {}
        }

        if binary.op.is_ordering() {
            if !self.ordered(&left_type, &right_type) {
                return Err(TypeError::NotOrdered(
                    left_type.to_string(),
                    right_type.to_string(),
                ));
            }
        } else if !self.comparable(&left_type, &right_type) {
            return Err(TypeError::NotComparable(
                left_type.to_string(),
                right_type.to_string(),
            ));
        }

        self.apply_type(&mut binary.left, &left_type)?;
        self.apply_type(&mut binary.right, &right_type)
    }

    fn index_type(&self, index: &IndexExpr) -> Type {
        if index.typ.known() {
            return index.typ.clone();
        }
        let Some((_, value)) = self.container_base_types(&self.expr_type(&index.left)) else {
            return Type::Unknown;
        };
        if matches!(*index.index, Expr::SliceRange(_)) {
            Type::slice(value)
        } else {
            value
        }
    }

    /// What indexing a container produces: `(key type, element type)`.
    fn container_base_types(&self, container: &Type) -> Option<(Type, Type)> {
        match self.decls.root(container) {
            Type::Map { key, value } => Some(((**key).clone(), (**value).clone())),
            Type::Slice(of) => Some((Type::Simple(SimpleKind::Int), (**of).clone())),
            Type::Array { elem, .. } => {
                Some((Type::Simple(SimpleKind::Int), (**elem).clone()))
            }
            Type::Simple(SimpleKind::String) => {
                Some((Type::Simple(SimpleKind::Int), Type::Simple(SimpleKind::Byte)))
            }
            // Indexing through a pointer to an array also works.
            Type::Pointer(to) => match &**to {
                Type::Array { elem, .. } => {
                    Some((Type::Simple(SimpleKind::Int), (**elem).clone()))
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn index_container_type(&self, index: &IndexExpr) -> Type {
        let left_type = self.expr_type(&index.left);
        if left_type.known() {
            return left_type;
        }
        self.guess_type(&index.left).unwrap_or(Type::Unknown)
    }

    fn apply_index(&mut self, index: &mut IndexExpr, typ: &Type) -> Result<(), TypeError> {
        let container = self.index_container_type(index);
        if !container.known() {
            return Err(TypeError::UnknownContainer);
        }
        self.apply_type(&mut index.left, &container)?;

        let Some((key_type, value_type)) = self.container_base_types(&container) else {
            return Err(TypeError::UnknownContainer);
        };

        if matches!(*index.index, Expr::SliceRange(_)) {
            return self.apply_slice_range(index, &container, &key_type, &value_type, typ);
        }

        self.apply_type(&mut index.index, &key_type)?;

        let mut value_target = typ.clone();
        if let Type::Tuple(members) = typ {
            if members.len() != 2 || !self.bool_assignable(&members[1]) {
                return Err(TypeError::IndexSecondNotBool);
            }
            if self.decls.root(&container).kind() != Kind::Map {
                return Err(TypeError::CommaOkNonMap);
            }
            value_target = members[0].clone();
        }

        if !self.assignable(&value_target, &value_type) {
            return Err(TypeError::IndexElemMismatch(
                value_type.to_string(),
                typ.to_string(),
            ));
        }

        index.typ = typ.clone();
        Ok(())
    }

    /// `a[from:to]` always yields a slice of the element type, whatever the
    /// container was.
    fn apply_slice_range(
        &mut self,
        index: &mut IndexExpr,
        container: &Type,
        key_type: &Type,
        value_type: &Type,
        typ: &Type,
    ) -> Result<(), TypeError> {
        if !key_type.is_int() {
            return Err(TypeError::NotSliceable(container.to_string()));
        }

        let Expr::SliceRange(range) = &mut *index.index else {
            return Err(TypeError::UnknownContainer);
        };
        let int = Type::Simple(SimpleKind::Int);
        // TODO: the full slice form with a second ':' and blank bounds.
        self.apply_type(&mut range.from, &int)?;
        self.apply_type(&mut range.to, &int)?;

        let result_type = Type::slice(value_type.clone());
        if !self.assignable(typ, &result_type) {
            return Err(TypeError::NotAssignable(
                result_type.to_string(),
                typ.to_string(),
            ));
        }
        Ok(())
    }

    fn selector_type(&self, sel: &SelectorExpr) -> Type {
        let mut left_type = self.expr_type(&sel.left);
        if let Type::Pointer(to) = left_type {
            left_type = *to;
        }

        match self.decls.root(&left_type) {
            Type::Struct(st) => {
                if let Some(member) = st.member(&sel.name) {
                    member.clone()
                } else if let Some(method) = st.method(&sel.name) {
                    Type::Func(Box::new(method.sig.clone()))
                } else {
                    Type::Unknown
                }
            }
            Type::Interface(iface) => match iface.method(&sel.name) {
                Some(method) => Type::Func(Box::new(method.sig.clone())),
                None => Type::Unknown,
            },
            _ => Type::Unknown,
        }
    }

    fn apply_assert(&mut self, assert: &mut AssertExpr, typ: &Type) -> Result<(), TypeError> {
        if assert.for_switch {
            return Err(TypeError::AssertOutsideSwitch);
        }

        let mut target = typ.clone();
        if let Type::Tuple(members) = typ {
            if members.len() != 2 {
                return Err(TypeError::AssertTupleArity);
            }
            if !self.bool_assignable(&members[1]) {
                return Err(TypeError::AssertSecondNotBool(members[1].to_string()));
            }
            assert.typ = typ.clone();
            target = members[0].clone();
        }

        if assert.asserted.to_string() != target.to_string() {
            return Err(TypeError::DifferentTypes(
                target.to_string(),
                assert.asserted.to_string(),
            ));
        }

        if !self.expr_type(&assert.left).known() {
            if let Err(err) = self.apply_type(&mut assert.left, &target) {
                let Some(guessed) = self.guess_type(&assert.left) else {
                    return Err(err);
                };
                self.apply_type(&mut assert.left, &guessed)?;
            }
        }

        let left_type = self.expr_type(&assert.left);
        if !self.decls.is_interface(&left_type) {
            return Err(TypeError::AssertNonInterface(left_type.to_string()));
        }

        if !self.decls.is_interface(&assert.asserted)
            && !self.implements(&left_type, &assert.asserted)
        {
            return Err(TypeError::AssertNotImplemented(
                assert.asserted.to_string(),
                left_type.to_string(),
            ));
        }

        Ok(())
    }

    fn apply_basic(&mut self, lit: &mut BasicLit, typ: &Type) -> Result<(), TypeError> {
        let actual = self.decls.root(typ);
        if actual.kind() != Kind::Simple {
            return Err(TypeError::LiteralKindMismatch(typ.to_string()));
        }

        let fits = match lit.kind {
            LitKind::Str => matches!(actual, Type::Simple(SimpleKind::String)),
            LitKind::Int | LitKind::Rune => actual.is_numeric(),
            LitKind::Float => actual.is_float_kind() || actual.is_complex_kind(),
            LitKind::Imag => actual.is_complex_kind(),
            LitKind::Bool => matches!(actual, Type::Simple(SimpleKind::Bool)),
        };
        if !fits {
            return Err(TypeError::LiteralKind);
        }

        lit.typ = typ.clone();
        Ok(())
    }

    fn apply_compound(&mut self, lit: &mut CompoundLit, typ: &Type) -> Result<(), TypeError> {
        let root = self.decls.root(typ).clone();
        let mut accepted = false;

        match root {
            Type::Slice(of) => match lit.shape {
                CompoundShape::Empty => accepted = true,
                CompoundShape::List => {
                    for elem in &mut lit.elems {
                        self.apply_type(elem, &of)?;
                    }
                    accepted = true;
                }
                CompoundShape::Keyed => {}
            },
            Type::Array { size, elem } => match lit.shape {
                CompoundShape::Empty => accepted = size == 0,
                CompoundShape::List => {
                    if lit.elems.len() == size {
                        for e in &mut lit.elems {
                            self.apply_type(e, &elem)?;
                        }
                        accepted = true;
                    }
                }
                CompoundShape::Keyed => {}
            },
            Type::Struct(st) => match lit.shape {
                CompoundShape::Empty => accepted = true,
                CompoundShape::List => {
                    if lit.elems.len() != st.members.len() {
                        return Err(TypeError::StructLitArity(
                            st.members.len(),
                            lit.elems.len(),
                        ));
                    }
                    for (elem, (_, member_type)) in lit.elems.iter_mut().zip(&st.members) {
                        self.apply_type(elem, member_type)?;
                    }
                    accepted = true;
                }
                CompoundShape::Keyed => {
                    // TODO: reject duplicate member names in the literal.
                    for pair in lit.elems.chunks_mut(2) {
                        let [key, value] = pair else { break };
                        let Expr::Ident(ident) = key else {
                            return Err(TypeError::ExpectedMemberName);
                        };
                        let Some(member_type) = st.member(&ident.name) else {
                            return Err(TypeError::NoMemberNamed(ident.name.clone()));
                        };
                        let member_type = member_type.clone();
                        self.apply_type(value, &member_type)?;
                    }
                    accepted = true;
                }
            },
            Type::Map { key, value } => match lit.shape {
                CompoundShape::Empty => accepted = true,
                CompoundShape::Keyed => {
                    for (i, elem) in lit.elems.iter_mut().enumerate() {
                        let target = if i % 2 == 0 { &key } else { &value };
                        self.apply_type(elem, target)?;
                    }
                    accepted = true;
                }
                CompoundShape::List => {}
            },
            _ => {}
        }

        if accepted {
            lit.typ = typ.clone();
            Ok(())
        } else {
            Err(TypeError::CompoundShape(typ.to_string()))
        }
    }

    fn guess_compound(&self, lit: &CompoundLit) -> Option<Type> {
        match lit.shape {
            CompoundShape::Empty => None,
            CompoundShape::List => {
                let mut elem_type: Option<Type> = None;
                for elem in &lit.elems {
                    let guessed = self.guess_type(elem)?;
                    match &elem_type {
                        None => elem_type = Some(guessed),
                        Some(t) if t.to_string() == guessed.to_string() => {}
                        Some(_) => return None,
                    }
                }
                Some(Type::slice(elem_type?))
            }
            CompoundShape::Keyed => {
                let mut key_type: Option<Type> = None;
                let mut value_type: Option<Type> = None;
                for (i, elem) in lit.elems.iter().enumerate() {
                    let guessed = self.guess_type(elem)?;
                    let slot = if i % 2 == 0 { &mut key_type } else { &mut value_type };
                    match slot {
                        None => *slot = Some(guessed),
                        Some(t) if t.to_string() == guessed.to_string() => {}
                        Some(_) => return None,
                    }
                }
                Some(Type::Map {
                    key: Box::new(key_type?),
                    value: Box::new(value_type?),
                })
            }
        }
    }
}
