//! Indigo front-end: indentation-aware lexer + bidirectional type negotiator.
//!
//! - The lexer (Logos raw layer + scope-tracking wrapper) turns source text
//!   into a flat token stream where indentation becomes explicit
//!   NEWSCOPE/ENDSCOPE tokens.
//! - The type negotiator walks an already-parsed, already-name-resolved AST
//!   and reconciles required types (pushed down) with known or guessed types
//!   (pushed up), failing on the first inconsistency.
//!
//! Parsing and name resolution sit between the two and are external to this
//! crate: the lexer's output feeds a parser, and the negotiator consumes the
//! bound AST the resolver produces.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod typer;
pub mod types;

// Re-exports for convenience
pub use error::{LexError, LexErrorKind, TypeError};
pub use lexer::{Lexer, Tok, Token};
pub use typer::Typer;
