//! Bytecode operation codes.
//!
//! Each opcode is a single byte, with operands following inline in
//! little-endian order.

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Bytecode operation codes.
///
/// The VM is a stack machine. Most operations pop their operands and push
/// the result. Every call pushes exactly one return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    /// End of a function body; returns `undefined`. Also the first byte of
    /// every bytecode buffer.
    End = 0,

    // =========================================================================
    // Constants
    // =========================================================================
    PushUndefined,
    PushTrue,
    PushFalse,
    /// Operand: i32
    PushInt,
    /// Operand: f32
    PushFloat,
    /// Operand: u16 string index
    PushString,
    /// Operand: u16 string index
    PushIString,
    PushEmptyArray,
    PushSelf,
    PushLevel,
    /// Reference to a function of this file or an include.
    /// Operand: u16 string index of the name
    PushFuncRef,
    /// Operand: u16 path string index, u16 name string index
    PushFarFuncRef,

    // =========================================================================
    // Variables
    // =========================================================================
    /// Operand: u8 slot
    GetLocal,
    /// Operand: u8 slot
    SetLocal,
    /// Pops object, pushes field. Operand: u16 string index
    GetField,
    /// Pops object and value. Operand: u16 string index
    SetField,
    /// Pops object and index, pushes element.
    GetIndex,
    /// Pops object, index and value.
    SetIndex,
    Pop,

    // =========================================================================
    // Operators
    // =========================================================================
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Not,
    Neg,

    // =========================================================================
    // Control flow
    // =========================================================================
    /// Operand: i16 offset from the end of the instruction
    Jump,
    /// Pops condition. Operand: i16
    JumpIfFalse,
    /// Pops condition. Operand: i16
    JumpIfTrue,
    /// Operand: u16 function index, u8 argc, u8 [`CallFlags`]
    CallLocal,
    /// Operand: u16 path string index, u16 name string index, u8 argc, u8 [`CallFlags`]
    CallFar,
    /// Operand: u16 name string index, u8 argc, u8 [`CallFlags`]
    CallBuiltin,
    /// Pops the duration.
    Wait,
    /// Pops the return value.
    Return,
}

impl OpCode {
    /// Number of operand bytes following the opcode.
    pub fn operand_len(self) -> usize {
        use OpCode::*;
        match self {
            PushInt | PushFloat => 4,
            PushString | PushIString | PushFuncRef | GetField | SetField => 2,
            PushFarFuncRef => 4,
            GetLocal | SetLocal => 1,
            Jump | JumpIfFalse | JumpIfTrue => 2,
            CallLocal | CallBuiltin => 4,
            CallFar => 6,
            _ => 0,
        }
    }

    /// Whether the operand is a relative jump offset.
    pub fn is_jump(self) -> bool {
        matches!(self, OpCode::Jump | OpCode::JumpIfFalse | OpCode::JumpIfTrue)
    }
}

bitflags! {
    /// Modifiers carried by call instructions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CallFlags: u8 {
        /// The caller object is on the stack below the arguments.
        const METHOD = 1 << 0;
        /// Run the callee as a new thread.
        const THREAD = 1 << 1;
    }
}
