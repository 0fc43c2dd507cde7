//! Assembly IR produced by the compiler and consumed by the assembler.

use crate::bytecode::{CallFlags, OpCode};
use std::fmt;

/// A compiled script before assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    pub functions: Vec<AsmFunction>,
}

impl Assembly {
    pub fn function(&self, name: &str) -> Option<&AsmFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Total instruction count across all functions.
    pub fn instruction_count(&self) -> usize {
        self.functions.iter().map(|f| f.instructions.len()).sum()
    }
}

/// One function of an [`Assembly`].
#[derive(Debug, Clone, PartialEq)]
pub struct AsmFunction {
    pub name: String,
    /// Parameter count; parameters occupy the first local slots.
    pub params: u8,
    /// Total local slots including parameters.
    pub locals: u8,
    pub instructions: Vec<Instruction>,
}

/// A jump target inside one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// The function a call instruction targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    /// A function of the same script.
    Local(String),
    /// A function in another script, by include path.
    Far { path: String, name: String },
    /// A function provided by the host.
    Builtin(String),
}

impl fmt::Display for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallTarget::Local(name) | CallTarget::Builtin(name) => f.write_str(name),
            CallTarget::Far { path, name } => write!(f, "{path}::{name}"),
        }
    }
}

/// An assembly instruction. Labels are resolved by the assembler.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// An instruction without operands.
    Op(OpCode),
    PushInt(i32),
    PushFloat(f32),
    PushString(String),
    PushIString(String),
    FuncRef(Option<String>, String),
    GetLocal(u8),
    SetLocal(u8),
    GetField(String),
    SetField(String),
    /// `Jump`, `JumpIfFalse` or `JumpIfTrue` to a label.
    Jump(OpCode, Label),
    /// Marks the position of a label.
    Label(Label),
    Call {
        target: CallTarget,
        argc: u8,
        flags: CallFlags,
    },
}
