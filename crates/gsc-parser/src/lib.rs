//! GSC parser crate.
//!
//! Lexer and arena-allocated AST for the GSC scripting dialect:
//! `#include` directives, functions, method and threaded calls, far calls
//! through `path::name`, and `/# ... #/` developer blocks.
//!
//! # Example
//!
//! ```
//! use gsc_parser::Parser;
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let script = Parser::parse("main() { level.ready = true; }", &arena).unwrap();
//! assert_eq!(script.functions[0].name.name, "main");
//! ```

pub mod ast;
pub mod lexer;

pub use ast::{MAX_NESTING, Parser, Script, decode_source};
pub use gsc_core::Span;
pub use lexer::{Lexer, Token, TokenKind};
