//! Instruction decoding for inspection and tests.

use super::OpCode;
use crate::StackError;

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    /// Offset of the opcode byte.
    pub offset: usize,
    pub op: OpCode,
    /// Raw operand bytes.
    pub operands: &'a [u8],
}

impl Instruction<'_> {
    /// Absolute target of a jump instruction.
    pub fn jump_target(&self) -> Option<usize> {
        if !self.op.is_jump() {
            return None;
        }
        let relative = i16::from_le_bytes([self.operands[0], self.operands[1]]);
        let end = self.offset + 1 + self.operands.len();
        end.checked_add_signed(relative as isize)
    }

    /// The first operand as `u16`, if it is at least two bytes wide.
    pub fn operand_u16(&self) -> Option<u16> {
        match self.operands {
            [a, b, ..] => Some(u16::from_le_bytes([*a, *b])),
            _ => None,
        }
    }
}

/// Iterator over the instructions of a bytecode range.
pub struct Instructions<'a> {
    code: &'a [u8],
    base: usize,
    position: usize,
}

impl<'a> Instructions<'a> {
    /// Decode `code`, reporting offsets relative to `base`.
    pub fn new(code: &'a [u8], base: usize) -> Self {
        Self {
            code,
            base,
            position: 0,
        }
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>, StackError>;

    fn next(&mut self) -> Option<Self::Item> {
        let byte = *self.code.get(self.position)?;
        let offset = self.base + self.position;

        let op = match OpCode::try_from(byte) {
            Ok(op) => op,
            Err(_) => {
                self.position = self.code.len();
                return Some(Err(StackError::InvalidOpcode { byte, offset }));
            }
        };

        let start = self.position + 1;
        let end = start + op.operand_len();
        let Some(operands) = self.code.get(start..end) else {
            self.position = self.code.len();
            return Some(Err(StackError::Truncated {
                what: "instruction operands",
            }));
        };

        self.position = end;
        Some(Ok(Instruction {
            offset,
            op,
            operands,
        }))
    }
}
