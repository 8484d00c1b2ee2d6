use thiserror::Error;

/// Lexical failures. All are fatal for the lexing pass; the lexer reports
/// the first one and stops.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    #[error("Bad indent")]
    BadIndent,
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Unknown character")]
    UnknownChar,
}

impl Default for LexErrorKind {
    #[inline]
    fn default() -> Self {
        LexErrorKind::UnknownChar
    }
}

/// A lexical error plus the byte offset the cursor was at when it occurred.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{kind} at byte {offset}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub offset: usize,
}

impl LexError {
    #[inline]
    pub const fn new(kind: LexErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

/// Type negotiation failures. The first failing negotiation aborts the
/// whole check; no recovery is attempted.
///
/// Variants carry already-rendered canonical type strings rather than
/// `Type` values so the error type stays `'static` and cheap to move up
/// the stack.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("Too little information to infer types")]
    CannotInfer,

    #[error("Types {0} and {1} are not assignable")]
    NotAssignable(String, String),

    #[error("Cannot assign `{0}` to `{1}`")]
    CannotAssign(String, String),

    #[error("Different number of return values")]
    ReturnArity,

    #[error("Different number of items on the left and right hand side")]
    AssignArity,

    #[error("Not a chan used for sending")]
    SendToNonChan,

    #[error("Channel is receive-only")]
    SendToReceiveOnly,

    #[error("Send value has to be assignable to channel's base type")]
    SendElemMismatch,

    #[error("Error while negotiating types")]
    NotBool,

    #[error("Only `=` assignment allowed in scoped declarations")]
    ScopedAssignOp,

    #[error("Not a var declaration or assignment")]
    ScopedStmtKind,

    #[error("List of values in freeform switch")]
    FreeformSwitchValues,

    #[error("Error with switch clause {1}: {0}")]
    SwitchClause(Box<TypeError>, usize),

    #[error("Error with switch clause, {0} is not comparable to {1}")]
    SwitchNotComparable(String, String),

    #[error("Error - more than one `default` clause")]
    DuplicateDefault,

    #[error("Too few values on the right side (function call returns only 1 result)")]
    UnpackSingleResult,

    #[error("Too few values")]
    UnpackTooFew,

    #[error("Couldn't determine type of the right side of the assignment")]
    UnpackUnknownRhs,

    #[error("Unknown type in a tuple")]
    UnknownTupleMember,

    #[error("Type conversion takes exactly one argument")]
    ConversionArity,

    #[error("Impossible conversion from {0} to {1}")]
    ImpossibleConversion(String, String),

    #[error("Only functions can be called, not {0}")]
    NotCallable(String),

    #[error("Function `{0}` doesn't return anything")]
    NoResults(String),

    #[error("Function `{0}` returns more than one result")]
    TooManyResults(String),

    #[error("Wrong number of arguments: {0} instead of {1}")]
    CallArity(usize, usize),

    #[error("This is only allowed in switch statements")]
    AssertOutsideSwitch,

    #[error("Wrong number of elements on left of type assertion (max. 2)")]
    AssertTupleArity,

    #[error("Second value returned from type assertion is bool, bools aren't assignable to {0}")]
    AssertSecondNotBool(String),

    #[error("Different types: {0} and {1}")]
    DifferentTypes(String, String),

    #[error("Invalid type assertion, non-interface {0} on left")]
    AssertNonInterface(String),

    #[error("Impossible type assertion: {0} doesn't implement {1}")]
    AssertNotImplemented(String, String),

    #[error("Type {0} has no member named {1}")]
    NoSuchMember(String, String),

    #[error("Couldn't infer container's type")]
    UnknownContainer,

    #[error("Type {0} doesn't support slice expressions")]
    NotSliceable(String),

    #[error("Only map index expressions can return extra bool value")]
    CommaOkNonMap,

    #[error("Second value is bool")]
    IndexSecondNotBool,

    #[error("Type {0} cannot be assigned to {1}")]
    IndexElemMismatch(String, String),

    #[error("Type has {0} members, but literal has just {1}")]
    StructLitArity(usize, usize),

    #[error("Expected a member name")]
    ExpectedMemberName,

    #[error("No member named {0}")]
    NoMemberNamed(String),

    #[error("Can't use a compound literal to initialize type {0}")]
    CompoundShape(String),

    #[error("Comparison operators return bools, not {0}")]
    ComparisonNotBool(String),

    #[error("Couldn't infer types of left and right operands")]
    OperandsUnknown,

    #[error("Operands of types {0} and {1} can't be ordered")]
    NotOrdered(String, String),

    #[error("Types {0} and {1} aren't comparable")]
    NotComparable(String, String),

    #[error("Logical operators return bools, not {0}")]
    LogicalNotBool(String),

    #[error("Not a pointer type")]
    NotPointer,

    #[error("Type {0} is not a channel")]
    NotChannel(String),

    #[error("Type {0} is a send-only channel")]
    RecvFromSendOnly(String),

    #[error("Wrong number of elements on channel receive (max. 2)")]
    RecvTupleArity,

    #[error("Second value returned from chan receive is bool, and bools aren't assignable to {0}")]
    RecvSecondNotBool(String),

    #[error("Identifier {0} is not a variable")]
    NotAVariable(String),

    #[error("Identifier {0} is of type {1}, can't assign type {2} to it")]
    IdentTypeMismatch(String, String, String),

    #[error("Type {0} can't be set to nil")]
    NotNilable(String),

    #[error("Can't use this literal for type {0}")]
    LiteralKindMismatch(String),

    #[error("Can't use this literal for this type")]
    LiteralKind,
}
