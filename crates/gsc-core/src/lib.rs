//! Core types shared by the GSC toolchain and the script loader.
//!
//! - [`Span`]: source locations for error reporting
//! - [`error`]: the error hierarchy for lexing, parsing, compiling and assembling
//! - [`TokenTable`]: the bijective name/token table behind numeric script aliases
//! - [`Diagnostics`]: collected failure reports
//! - [`BuildMode`]: whether developer blocks are compiled

mod diagnostics;
pub mod error;
mod span;
mod token;

pub use diagnostics::{Diagnostic, Diagnostics, Stage};
pub use error::{
    AssembleError, CompileError, LexError, ParseError, ParseErrorKind, ParseErrors,
    TokenTableError,
};
pub use span::Span;
pub use token::{TokenId, TokenTable};

/// Compilation mode for the GSC compiler.
///
/// Developer blocks (`/# ... #/`) only survive compilation in [`BuildMode::Dev`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuildMode {
    /// Keep developer blocks.
    Dev,
    /// Strip developer blocks. This is what the shipping game runs.
    #[default]
    Prod,
}

impl BuildMode {
    /// Whether developer blocks are compiled in this mode.
    #[inline]
    pub fn keeps_dev_blocks(self) -> bool {
        matches!(self, BuildMode::Dev)
    }
}
