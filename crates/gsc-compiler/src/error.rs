//! Errors raised while reading assembled output back.

use thiserror::Error;

/// A stack or bytecode buffer that does not decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("stack does not start with the GSTK magic")]
    BadMagic,

    #[error("truncated {what}")]
    Truncated { what: &'static str },

    #[error("{what} is not valid UTF-8")]
    InvalidUtf8 { what: &'static str },

    #[error("invalid opcode {byte:#04x} at offset {offset}")]
    InvalidOpcode { byte: u8, offset: usize },
}
