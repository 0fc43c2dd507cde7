//! Growable bytecode buffer with jump patching.

use super::OpCode;

/// Bytecode being written for one script.
///
/// All multi-byte operands are little-endian.
#[derive(Debug, Clone, Default)]
pub struct BytecodeChunk {
    code: Vec<u8>,
}

impl BytecodeChunk {
    /// Create a new empty bytecode chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bytecode chunk with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            code: Vec::with_capacity(capacity),
        }
    }

    pub fn write_op(&mut self, op: OpCode) {
        self.code.push(op.into());
    }

    pub fn write_u8(&mut self, value: u8) {
        self.code.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.code.extend_from_slice(&value.to_le_bytes());
    }

    /// Current code offset.
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Emit a jump with a placeholder offset and return the operand position
    /// to patch later.
    pub fn emit_jump(&mut self, op: OpCode) -> usize {
        self.write_op(op);
        let operand = self.code.len();
        self.code.extend_from_slice(&[0xFF, 0xFF]);
        operand
    }

    /// Point the jump whose operand is at `operand` to `target`.
    ///
    /// Returns the distance if it does not fit in an `i16`.
    pub fn patch_jump(&mut self, operand: usize, target: usize) -> Result<(), i64> {
        let distance = target as i64 - (operand as i64 + 2);
        let offset = i16::try_from(distance).map_err(|_| distance)?;
        self.code[operand..operand + 2].copy_from_slice(&offset.to_le_bytes());
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.code
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.code
    }
}
