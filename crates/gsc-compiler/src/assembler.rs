//! Assembler: [`Assembly`] to bytecode plus stack.
//!
//! The bytecode buffer holds every function body back to back, preceded by a
//! single `End` byte so that offset zero never starts a function. The stack
//! buffer describes the bytecode:
//!
//! ```text
//! "GSTK"
//! u16 function count
//! per function:
//!     u16 name token, or 0 followed by the NUL-terminated name
//!     u32 bytecode offset
//!     u32 bytecode size
//!     u8  parameter count
//! u16 string count
//! per string: NUL-terminated bytes
//! ```

use std::sync::Arc;

use gsc_core::{AssembleError, TokenTable};
use rustc_hash::FxHashMap;

use crate::assembly::{AsmFunction, Assembly, CallTarget, Instruction};
use crate::bytecode::{BytecodeChunk, OpCode};
use crate::stack::STACK_MAGIC;
use crate::AssembledScript;

type Result<T> = std::result::Result<T, AssembleError>;

const MAX_STRINGS: usize = u16::MAX as usize;
const MAX_FUNCTIONS: usize = u16::MAX as usize;

/// Interned string operands.
#[derive(Default)]
struct StringTable {
    index: FxHashMap<String, u16>,
    strings: Vec<String>,
}

impl StringTable {
    fn intern(&mut self, s: &str) -> Result<u16> {
        if let Some(&index) = self.index.get(s) {
            return Ok(index);
        }
        if self.strings.len() >= MAX_STRINGS {
            return Err(AssembleError::TooManyStrings {
                count: self.strings.len() + 1,
                limit: MAX_STRINGS,
            });
        }
        let index = self.strings.len() as u16;
        self.index.insert(s.to_string(), index);
        self.strings.push(s.to_string());
        Ok(index)
    }
}

/// Location of one assembled function.
struct ExportRecord<'a> {
    name: &'a str,
    offset: u32,
    size: u32,
    params: u8,
}

/// The reference assembler.
///
/// Function names that have a token in the table are written as that token.
#[derive(Debug, Default, Clone)]
pub struct StackAssembler {
    tokens: Arc<TokenTable>,
}

impl StackAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write names with a token as the token instead of the string.
    pub fn with_tokens(tokens: Arc<TokenTable>) -> Self {
        Self { tokens }
    }

    /// Assemble `assembly` into bytecode and stack buffers.
    pub fn assemble_script(&self, assembly: &Assembly) -> Result<AssembledScript> {
        #[cfg(feature = "profiling")]
        profiling::scope!("StackAssembler::assemble_script");

        if assembly.functions.len() > MAX_FUNCTIONS {
            return Err(AssembleError::TooManyFunctions {
                count: assembly.functions.len(),
                limit: MAX_FUNCTIONS,
            });
        }

        let function_index: FxHashMap<&str, u16> = assembly
            .functions
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.as_str(), i as u16))
            .collect();

        let mut strings = StringTable::default();
        let mut chunk = BytecodeChunk::with_capacity(assembly.instruction_count() * 3 + 1);
        chunk.write_op(OpCode::End);

        let mut exports = Vec::with_capacity(assembly.functions.len());
        for function in &assembly.functions {
            let offset = chunk.current_offset();
            emit_function(&mut chunk, &mut strings, &function_index, function)?;
            let end = chunk.current_offset();
            if end > u32::MAX as usize {
                return Err(AssembleError::BytecodeTooLarge { size: end });
            }
            exports.push(ExportRecord {
                name: &function.name,
                offset: offset as u32,
                size: (end - offset) as u32,
                params: function.params,
            });
        }

        let stack = self.write_stack(&exports, &strings);
        Ok(AssembledScript {
            bytecode: chunk.into_bytes(),
            stack,
        })
    }

    fn write_stack(&self, exports: &[ExportRecord<'_>], strings: &StringTable) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(STACK_MAGIC);
        out.extend_from_slice(&(exports.len() as u16).to_le_bytes());

        for export in exports {
            match self.tokens.id(export.name) {
                Some(token) => out.extend_from_slice(&token.get().to_le_bytes()),
                None => {
                    out.extend_from_slice(&0u16.to_le_bytes());
                    out.extend_from_slice(export.name.as_bytes());
                    out.push(0);
                }
            }
            out.extend_from_slice(&export.offset.to_le_bytes());
            out.extend_from_slice(&export.size.to_le_bytes());
            out.push(export.params);
        }

        out.extend_from_slice(&(strings.strings.len() as u16).to_le_bytes());
        for s in &strings.strings {
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
        out
    }
}

fn emit_function(
    chunk: &mut BytecodeChunk,
    strings: &mut StringTable,
    function_index: &FxHashMap<&str, u16>,
    function: &AsmFunction,
) -> Result<()> {
    let mut labels = FxHashMap::default();
    let mut fixups = Vec::new();

    for instruction in &function.instructions {
        match instruction {
            Instruction::Op(op) => chunk.write_op(*op),
            Instruction::PushInt(v) => {
                chunk.write_op(OpCode::PushInt);
                chunk.write_i32(*v);
            }
            Instruction::PushFloat(v) => {
                chunk.write_op(OpCode::PushFloat);
                chunk.write_f32(*v);
            }
            Instruction::PushString(s) => {
                chunk.write_op(OpCode::PushString);
                chunk.write_u16(strings.intern(s)?);
            }
            Instruction::PushIString(s) => {
                chunk.write_op(OpCode::PushIString);
                chunk.write_u16(strings.intern(s)?);
            }
            Instruction::FuncRef(None, name) => {
                chunk.write_op(OpCode::PushFuncRef);
                chunk.write_u16(strings.intern(name)?);
            }
            Instruction::FuncRef(Some(path), name) => {
                chunk.write_op(OpCode::PushFarFuncRef);
                chunk.write_u16(strings.intern(path)?);
                chunk.write_u16(strings.intern(name)?);
            }
            Instruction::GetLocal(slot) => {
                chunk.write_op(OpCode::GetLocal);
                chunk.write_u8(*slot);
            }
            Instruction::SetLocal(slot) => {
                chunk.write_op(OpCode::SetLocal);
                chunk.write_u8(*slot);
            }
            Instruction::GetField(name) => {
                chunk.write_op(OpCode::GetField);
                chunk.write_u16(strings.intern(name)?);
            }
            Instruction::SetField(name) => {
                chunk.write_op(OpCode::SetField);
                chunk.write_u16(strings.intern(name)?);
            }
            Instruction::Jump(op, label) => {
                fixups.push((chunk.emit_jump(*op), *label));
            }
            Instruction::Label(label) => {
                labels.insert(label.0, chunk.current_offset());
            }
            Instruction::Call {
                target,
                argc,
                flags,
            } => {
                match target {
                    CallTarget::Local(name) => {
                        let index = function_index.get(name.as_str()).ok_or_else(|| {
                            AssembleError::UnknownFunction {
                                function: function.name.clone(),
                                callee: name.clone(),
                            }
                        })?;
                        chunk.write_op(OpCode::CallLocal);
                        chunk.write_u16(*index);
                    }
                    CallTarget::Far { path, name } => {
                        chunk.write_op(OpCode::CallFar);
                        chunk.write_u16(strings.intern(path)?);
                        chunk.write_u16(strings.intern(name)?);
                    }
                    CallTarget::Builtin(name) => {
                        chunk.write_op(OpCode::CallBuiltin);
                        chunk.write_u16(strings.intern(name)?);
                    }
                }
                chunk.write_u8(*argc);
                chunk.write_u8(flags.bits());
            }
        }
    }

    for (operand, label) in fixups {
        let target = *labels
            .get(&label.0)
            .ok_or_else(|| AssembleError::UnresolvedLabel {
                function: function.name.clone(),
                label: label.0,
            })?;
        chunk
            .patch_jump(operand, target)
            .map_err(|distance| AssembleError::JumpOutOfRange {
                function: function.name.clone(),
                distance,
            })?;
    }

    Ok(())
}
