//! Abstract syntax tree for GSC.
//!
//! All nodes are allocated in a [`bumpalo::Bump`] arena and borrow from it.
//!
//! # Example
//!
//! ```
//! use gsc_parser::Parser;
//! use bumpalo::Bump;
//!
//! let arena = Bump::new();
//! let source = r#"
//!     #include common\util;
//!
//!     main() {
//!         level.counter = 0;
//!         thread watch();
//!     }
//! "#;
//!
//! match Parser::parse(source, &arena) {
//!     Ok(script) => println!("{} functions", script.functions.len()),
//!     Err(errors) => eprintln!("Parse errors: {}", errors),
//! }
//! ```

pub mod ops;

mod parser;

pub mod expr;
mod expr_parser;

pub mod stmt;
mod stmt_parser;

pub use gsc_core::{ParseError, ParseErrorKind, ParseErrors};

pub use expr::*;
pub use ops::*;
pub use parser::{MAX_NESTING, Parser, decode_source};
pub use stmt::*;

use gsc_core::Span;

/// A parsed script file.
#[derive(Debug, Clone, Copy)]
pub struct Script<'ast> {
    /// `#include` directives in source order.
    pub includes: &'ast [Include<'ast>],
    /// Function definitions in source order.
    pub functions: &'ast [FunctionDecl<'ast>],
    pub span: Span,
}

impl<'ast> Script<'ast> {
    /// Find a function by name.
    pub fn function(&self, name: &str) -> Option<&FunctionDecl<'ast>> {
        self.functions.iter().find(|f| f.name.name == name)
    }
}

/// `#include path;`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Include<'ast> {
    /// The path as written, with backslash separators.
    pub path: &'ast str,
    pub span: Span,
}

/// An identifier with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

impl<'ast> Ident<'ast> {
    pub fn new(name: &'ast str, span: Span) -> Self {
        Self { name, span }
    }
}

/// `name(params) { body }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionDecl<'ast> {
    pub name: Ident<'ast>,
    pub params: &'ast [Ident<'ast>],
    pub body: Block<'ast>,
    pub span: Span,
}
