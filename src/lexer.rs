//! Indentation-aware lexer.
//!
//! Lexing is split in two layers. [`RawTok`] is the Logos-derived scanner:
//! it recognizes words, literals and operators, and keeps newlines (together
//! with the indentation run that follows them) as real tokens. The public
//! [`Lexer`] wraps the raw stream and owns the non-local state: a stack of
//! indentation widths and a queue of pending synthetic tokens. Indentation
//! deltas become explicit [`Tok::NewScope`]/[`Tok::EndScope`] tokens, so a
//! conventional parser can consume the braceless surface syntax.

use std::collections::VecDeque;

use logos::{Lexer as LogosLexer, Logos};

use crate::error::{LexError, LexErrorKind};

fn unterminated_string(_lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    Err(LexErrorKind::UnterminatedString)
}

/// Raw token layer. Newline tokens capture the following indentation run so
/// the wrapper can measure it without re-scanning.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexErrorKind)]
enum RawTok {
    // Intra-line whitespace (newline excluded).
    #[regex(r"[\t\x0B\x0C\r ]+", logos::skip)]
    _Ws,

    // A newline plus the indentation of the next line.
    #[regex(r"\n[\t\r ]*")]
    Newline,

    // A maximal run of letters and digits starting with a letter. Keywords
    // are separated out in the wrapper.
    #[regex(r"\p{L}[\p{L}\p{N}]*")]
    Word,

    // A backslash escapes the next character; content may span lines.
    #[regex(r#""([^"\\]|\\(?s:.))*""#)]
    Str,
    // Same body without the closing quote: end of input inside a literal.
    #[regex(r#""([^"\\]|\\(?s:.))*"#, unterminated_string)]
    StrUnterminated,

    #[regex(r"'([^'\\]|\\.)+'")]
    Rune,

    // Numeric literals, Go grammar. All forms collapse into one NUM token
    // carrying the raw text; classification is the type negotiator's job.
    #[regex(r"0[bB][01]([01_]*[01])?")]
    #[regex(r"0[oO][0-7]([0-7_]*[0-7])?")]
    #[regex(r"0[xX][0-9a-fA-F]([0-9a-fA-F_]*[0-9a-fA-F])?")]
    #[regex(r"0([0-7_]*[0-7])?")]
    #[regex(r"[1-9]([0-9_]*[0-9])?")]
    #[regex(r"([0-9]([0-9_]*[0-9])?\.[0-9]([0-9_]*[0-9])?([eE][+-]?[0-9]([0-9_]*[0-9])?)?)|([0-9]([0-9_]*[0-9])?[eE][+-]?[0-9]([0-9_]*[0-9])?)|(\.[0-9]([0-9_]*[0-9])?([eE][+-]?[0-9]([0-9_]*[0-9])?)?)")]
    #[regex(r"((0[xX][0-9a-fA-F]([0-9a-fA-F_]*[0-9a-fA-F])?)|(0[bB][01]([01_]*[01])?)|(0[oO][0-7]([0-7_]*[0-7])?)|([0-9]([0-9_]*[0-9])?))i")]
    #[regex(r"(([0-9]([0-9_]*[0-9])?\.[0-9]([0-9_]*[0-9])?([eE][+-]?[0-9]([0-9_]*[0-9])?)?)|([0-9]([0-9_]*[0-9])?[eE][+-]?[0-9]([0-9_]*[0-9])?)|(\.[0-9]([0-9_]*[0-9])?([eE][+-]?[0-9]([0-9_]*[0-9])?)?))i")]
    Num,

    // --- Operators and punctuation, longest match first ---
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("<-")]
    Arrow,
    #[token("&&")]
    LAnd,
    #[token("||")]
    LOr,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[token("+=")]
    AddAssign,
    #[token("-=")]
    SubAssign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    DivAssign,

    #[token("=")]
    Assign,
    #[token("!")]
    Bang,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,

    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBrack,
    #[token("]")]
    RBrack,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
}

/// Public token kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tok {
    /// End of input. Emitted exactly once per stream; pulling past it keeps
    /// yielding it.
    Eof,
    /// A block opened by deeper indentation.
    NewScope,
    /// A block closed by shallower indentation or end of input.
    EndScope,

    // Keywords
    KwFor,
    KwIf,
    KwElse,
    KwElif,
    KwSwitch,
    KwCase,
    KwReturn,
    KwTrue,
    KwFalse,
    KwStruct,
    KwInterface,
    KwMap,
    KwFunc,
    KwType,
    KwVar,
    KwPass,
    KwPackage,
    KwBreak,
    KwContinue,
    KwFallthrough,
    KwGoto,
    KwNil,
    KwIn,

    /// Identifier text.
    Word(String),
    /// String literal, unescaped content.
    Str(String),
    /// Numeric literal (integer, float or imaginary), raw text.
    Num(String),
    /// Rune literal, unescaped content.
    Rune(String),

    // Operators and punctuation
    Assign,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Bang,
    Plus,
    AddAssign,
    Inc,
    Minus,
    SubAssign,
    Dec,
    Star,
    MulAssign,
    Slash,
    DivAssign,
    Shl,
    Shr,
    Arrow,
    Comma,
    Colon,
    Semi,
    Dot,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Amp,
    LAnd,
    Pipe,
    LOr,
    Percent,
    Caret,
}

/// A token plus the byte offset at which its scanning began.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub tok: Tok,
    pub offset: usize,
}

impl Token {
    #[inline]
    pub fn new(tok: Tok, offset: usize) -> Self {
        Self { tok, offset }
    }
}

/// What a measured indentation width means relative to the open scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeEvent {
    /// Deeper than the innermost scope (or no scope open yet): one scope
    /// opens.
    Open,
    /// Shallower: this many scopes close.
    Close(usize),
    /// Same width as the innermost scope: nothing changes.
    Level,
    /// After closing, the width matches no remaining scope.
    Misaligned,
}

/// The indent stack. Kept separate from the token machinery so the scope
/// engine can be exercised on bare width sequences.
#[derive(Debug, Default)]
pub struct ScopeStack {
    widths: Vec<usize>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for the indentation width of a fresh, non-blank line.
    pub fn observe(&mut self, indent: usize) -> ScopeEvent {
        match self.widths.last() {
            Some(&top) if indent <= top => {
                let mut closed = 0usize;
                while matches!(self.widths.last(), Some(&top) if top > indent) {
                    self.widths.pop();
                    closed += 1;
                }
                match self.widths.last() {
                    Some(&top) if top != indent => ScopeEvent::Misaligned,
                    _ if closed > 0 => ScopeEvent::Close(closed),
                    _ => ScopeEvent::Level,
                }
            }
            _ => {
                self.widths.push(indent);
                ScopeEvent::Open
            }
        }
    }

    /// Number of currently open scopes.
    pub fn depth(&self) -> usize {
        self.widths.len()
    }

    /// Close every open scope (end of input) and return how many there were.
    pub fn drain(&mut self) -> usize {
        let n = self.widths.len();
        self.widths.clear();
        n
    }
}

/// The scope-emitting lexer.
pub struct Lexer<'src> {
    raw: LogosLexer<'src, RawTok>,
    pending: VecDeque<Token>,
    scopes: ScopeStack,
    /// Indentation measured after the last newline, still unsettled. Blank
    /// lines overwrite it, so they never touch the stack.
    unsettled_indent: Option<(usize, usize)>,
    src_len: usize,
    at_eof: bool,
    failed: Option<LexError>,
    iter_done: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(input: &'src str) -> Self {
        Self {
            raw: RawTok::lexer(input),
            pending: VecDeque::new(),
            scopes: ScopeStack::new(),
            unsettled_indent: None,
            src_len: input.len(),
            at_eof: false,
            failed: None,
            iter_done: false,
        }
    }

    /// Pull the next token. Destructive and deterministic. After the first
    /// error every subsequent call returns that same error; after end of
    /// input every call returns [`Tok::Eof`].
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        if let Some(err) = self.failed {
            return Err(err);
        }
        if let Some(tok) = self.pending.pop_front() {
            return Ok(tok);
        }
        if self.at_eof {
            return Ok(Token::new(Tok::Eof, self.src_len));
        }

        loop {
            let raw = match self.raw.next() {
                None => {
                    // A measurement interrupted by end of input is dropped.
                    self.unsettled_indent = None;
                    for _ in 0..self.scopes.drain() {
                        self.pending.push_back(Token::new(Tok::EndScope, self.src_len));
                    }
                    self.pending.push_back(Token::new(Tok::Eof, self.src_len));
                    self.at_eof = true;
                    return Ok(self.pending.pop_front().expect("queued eof"));
                }
                Some(Err(kind)) => {
                    return Err(self.fail(kind, self.raw.span().start));
                }
                Some(Ok(raw)) => raw,
            };

            let span = self.raw.span();
            let slice = self.raw.slice();

            if raw == RawTok::Newline {
                let indent = slice[1..].chars().count();
                self.unsettled_indent = Some((indent, span.start));
                continue;
            }

            if let Some((indent, at)) = self.unsettled_indent.take() {
                match self.scopes.observe(indent) {
                    ScopeEvent::Open => {
                        self.pending.push_back(Token::new(Tok::NewScope, at));
                    }
                    ScopeEvent::Close(n) => {
                        for _ in 0..n {
                            self.pending.push_back(Token::new(Tok::EndScope, at));
                        }
                    }
                    ScopeEvent::Level => {}
                    ScopeEvent::Misaligned => {
                        return Err(self.fail(LexErrorKind::BadIndent, span.start));
                    }
                }
            }

            let tok = Self::cook(raw, slice);
            self.pending.push_back(Token::new(tok, span.start));
            return Ok(self.pending.pop_front().expect("queued token"));
        }
    }

    fn fail(&mut self, kind: LexErrorKind, offset: usize) -> LexError {
        let err = LexError::new(kind, offset);
        self.failed = Some(err);
        err
    }

    /// Turn a raw token into its public form.
    fn cook(raw: RawTok, slice: &str) -> Tok {
        match raw {
            RawTok::Word => Self::word_or_keyword(slice),
            RawTok::Str => Tok::Str(unescape(&slice[1..slice.len() - 1])),
            RawTok::Rune => Tok::Rune(unescape(&slice[1..slice.len() - 1])),
            RawTok::Num => Tok::Num(slice.to_string()),

            RawTok::EqEq => Tok::EqEq,
            RawTok::NotEq => Tok::NotEq,
            RawTok::Le => Tok::Le,
            RawTok::Ge => Tok::Ge,
            RawTok::Shl => Tok::Shl,
            RawTok::Shr => Tok::Shr,
            RawTok::Arrow => Tok::Arrow,
            RawTok::LAnd => Tok::LAnd,
            RawTok::LOr => Tok::LOr,
            RawTok::Inc => Tok::Inc,
            RawTok::Dec => Tok::Dec,
            RawTok::AddAssign => Tok::AddAssign,
            RawTok::SubAssign => Tok::SubAssign,
            RawTok::MulAssign => Tok::MulAssign,
            RawTok::DivAssign => Tok::DivAssign,
            RawTok::Assign => Tok::Assign,
            RawTok::Bang => Tok::Bang,
            RawTok::Lt => Tok::Lt,
            RawTok::Gt => Tok::Gt,
            RawTok::Plus => Tok::Plus,
            RawTok::Minus => Tok::Minus,
            RawTok::Star => Tok::Star,
            RawTok::Slash => Tok::Slash,
            RawTok::Amp => Tok::Amp,
            RawTok::Pipe => Tok::Pipe,
            RawTok::Percent => Tok::Percent,
            RawTok::Caret => Tok::Caret,
            RawTok::Comma => Tok::Comma,
            RawTok::Colon => Tok::Colon,
            RawTok::Semi => Tok::Semi,
            RawTok::Dot => Tok::Dot,
            RawTok::LParen => Tok::LParen,
            RawTok::RParen => Tok::RParen,
            RawTok::LBrack => Tok::LBrack,
            RawTok::RBrack => Tok::RBrack,
            RawTok::LBrace => Tok::LBrace,
            RawTok::RBrace => Tok::RBrace,

            // Newline is consumed above; skipped and error shapes never
            // reach here.
            RawTok::Newline | RawTok::_Ws | RawTok::StrUnterminated => {
                unreachable!("raw trivia leaked into cook")
            }
        }
    }

    fn word_or_keyword(s: &str) -> Tok {
        match s {
            "for" => Tok::KwFor,
            "if" => Tok::KwIf,
            "else" => Tok::KwElse,
            "elif" => Tok::KwElif,
            "switch" => Tok::KwSwitch,
            "case" => Tok::KwCase,
            "return" => Tok::KwReturn,
            "true" => Tok::KwTrue,
            "false" => Tok::KwFalse,
            "struct" => Tok::KwStruct,
            "interface" => Tok::KwInterface,
            "map" => Tok::KwMap,
            "func" => Tok::KwFunc,
            "type" => Tok::KwType,
            "var" => Tok::KwVar,
            "pass" => Tok::KwPass,
            "package" => Tok::KwPackage,
            "break" => Tok::KwBreak,
            "continue" => Tok::KwContinue,
            "fallthrough" => Tok::KwFallthrough,
            "goto" => Tok::KwGoto,
            "nil" => Tok::KwNil,
            "in" => Tok::KwIn,
            _ => Tok::Word(s.to_string()),
        }
    }
}

/// Each `\c` collapses to `c`; nothing else changes.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Yields every token up to and including the single `Eof`, or up to the
/// first error, then fuses.
impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.iter_done {
            return None;
        }
        match self.next_token() {
            Ok(tok) => {
                if tok.tok == Tok::Eof {
                    self.iter_done = true;
                }
                Some(Ok(tok))
            }
            Err(err) => {
                self.iter_done = true;
                Some(Err(err))
            }
        }
    }
}
