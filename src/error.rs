//! Errors raised by the loader.
//!
//! ```text
//! LoaderError  - everything that can stop one script from being served
//! CacheError   - violations of the write-once cache
//! GscBinError  - malformed dumped scripts
//! ```
//!
//! Compiler and assembler failures are contained by the interception layer:
//! they become diagnostics plus a fallback to the host asset, never a panic.

use gsc_core::{AssembleError, CompileError, Stage};
use thiserror::Error;

/// Failures of one script load.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// No custom source exists for the script. This is a routing signal,
    /// the lookup continues at the host asset database.
    #[error("no custom source for '{0}'")]
    SourceUnavailable(String),

    /// An `#include` could not be satisfied.
    #[error("Could not load gsc file '{path}'")]
    MissingInclude {
        /// The include as written in the directive.
        name: String,
        /// The file that was attempted.
        path: String,
    },

    /// The compiler rejected the source.
    #[error("{0}")]
    Compile(CompileError),

    /// The assembler rejected the compiled assembly.
    #[error("{0}")]
    Assemble(#[from] AssembleError),

    /// The stack segment could not be compressed.
    #[error("failed to compress stack: {0}")]
    Compress(#[source] std::io::Error),

    /// The cache refused the compiled script.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl LoaderError {
    /// The step of loading this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            LoaderError::SourceUnavailable(_) => Stage::Load,
            LoaderError::MissingInclude { .. } | LoaderError::Compile(_) => Stage::Compile,
            LoaderError::Assemble(_) => Stage::Assemble,
            LoaderError::Compress(_) => Stage::Compress,
            LoaderError::Cache(_) => Stage::Load,
        }
    }

    /// The include name if this is a [`LoaderError::MissingInclude`].
    pub fn missing_include(&self) -> Option<&str> {
        match self {
            LoaderError::MissingInclude { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl From<CompileError> for LoaderError {
    fn from(error: CompileError) -> Self {
        match error {
            CompileError::MissingInclude { name, path } => LoaderError::MissingInclude { name, path },
            other => LoaderError::Compile(other),
        }
    }
}

/// Violations of the script cache's write-once rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// A second insertion under a name that is already cached.
    #[error("cache corruption: script '{name}' is already cached")]
    Corruption { name: String },
}

/// Errors decoding a `.gscbin` dump.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GscBinError {
    /// The buffer ended before `what` was complete.
    #[error("gscbin truncated while reading {what}")]
    Truncated { what: &'static str },

    /// The script name is not valid UTF-8.
    #[error("gscbin script name is not valid UTF-8")]
    InvalidName,

    /// A length field was negative.
    #[error("gscbin {what} is negative ({value})")]
    NegativeLength { what: &'static str, value: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_include_is_lifted_out_of_compile_errors() {
        let error: LoaderError = CompileError::MissingInclude {
            name: "missing_module".into(),
            path: "missing_module.gsc".into(),
        }
        .into();
        assert_eq!(error.missing_include(), Some("missing_module"));
        assert_eq!(error.stage(), Stage::Compile);
        assert_eq!(error.to_string(), "Could not load gsc file 'missing_module.gsc'");
    }

    #[test]
    fn stages() {
        let error = LoaderError::Assemble(AssembleError::BytecodeTooLarge { size: 1 });
        assert_eq!(error.stage(), Stage::Assemble);
        assert_eq!(LoaderError::SourceUnavailable("x".into()).stage(), Stage::Load);
    }
}
