//! Bytecode types for the GSC assembler.
//!
//! - [`OpCode`] - the instruction set
//! - [`BytecodeChunk`] - bytecode under construction
//! - [`Instructions`] - decoding iterator

mod chunk;
mod decode;
mod opcode;

pub use chunk::BytecodeChunk;
pub use decode::{Instruction, Instructions};
pub use opcode::{CallFlags, OpCode};
