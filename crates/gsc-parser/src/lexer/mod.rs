//! Lexical analysis for GSC.

mod cursor;
#[allow(clippy::module_inception)]
mod lexer;
mod token;

pub use lexer::Lexer;
pub use token::{Token, TokenKind};
