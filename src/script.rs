//! Compiled script units and their `.gscbin` dump format.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::GscBinError;

/// A script ready for the host runtime.
///
/// Immutable once built. The only interior state is the loaded flag, which
/// moves from unset to set at most once.
#[derive(Debug)]
pub struct CompiledScript {
    name: String,
    bytecode: Box<[u8]>,
    compressed_stack: Box<[u8]>,
    stack_len: usize,
    source_hash: Option<u64>,
    loaded: AtomicBool,
}

impl CompiledScript {
    /// Build a script from an already compressed stack.
    pub fn new(
        name: impl Into<String>,
        bytecode: Vec<u8>,
        compressed_stack: Vec<u8>,
        stack_len: usize,
    ) -> Self {
        Self {
            name: name.into(),
            bytecode: bytecode.into_boxed_slice(),
            compressed_stack: compressed_stack.into_boxed_slice(),
            stack_len,
            source_hash: None,
            loaded: AtomicBool::new(false),
        }
    }

    pub(crate) fn with_source_hash(mut self, hash: u64) -> Self {
        self.source_hash = Some(hash);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn bytecode_len(&self) -> usize {
        self.bytecode.len()
    }

    pub fn compressed_stack(&self) -> &[u8] {
        &self.compressed_stack
    }

    pub fn compressed_len(&self) -> usize {
        self.compressed_stack.len()
    }

    /// Length of the stack once decompressed.
    pub fn stack_len(&self) -> usize {
        self.stack_len
    }

    /// xxh64 of the source this script was compiled from. Scripts read
    /// back from a dump carry none.
    pub fn source_hash(&self) -> Option<u64> {
        self.source_hash
    }

    /// Inflate the stack segment.
    pub fn decompress_stack(&self) -> std::io::Result<Vec<u8>> {
        let mut stack = Vec::with_capacity(self.stack_len);
        ZlibDecoder::new(&self.compressed_stack[..]).read_to_end(&mut stack)?;
        if stack.len() != self.stack_len {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("stack inflated to {} bytes, expected {}", stack.len(), self.stack_len),
            ));
        }
        Ok(stack)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Set the loaded flag. Returns whether it was already set.
    pub fn mark_loaded(&self) -> bool {
        self.loaded.swap(true, Ordering::AcqRel)
    }

    /// Bytes of buffer storage this script holds.
    pub fn allocated_bytes(&self) -> usize {
        self.name.len() + self.bytecode.len() + self.compressed_stack.len()
    }

    /// Serialize as a `.gscbin`:
    ///
    /// ```text
    /// name            NUL-terminated
    /// compressed_len  i32 LE
    /// stack_len       i32 LE
    /// bytecode_len    i32 LE
    /// compressed stack
    /// bytecode
    /// ```
    pub fn to_gscbin(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.allocated_bytes() + 13);
        out.extend_from_slice(self.name.as_bytes());
        out.push(0);
        out.extend_from_slice(&clamp_len(self.compressed_stack.len()).to_le_bytes());
        out.extend_from_slice(&clamp_len(self.stack_len).to_le_bytes());
        out.extend_from_slice(&clamp_len(self.bytecode.len()).to_le_bytes());
        out.extend_from_slice(&self.compressed_stack);
        out.extend_from_slice(&self.bytecode);
        out
    }

    /// Parse a `.gscbin` produced by [`CompiledScript::to_gscbin`].
    pub fn from_gscbin(data: &[u8]) -> Result<Self, GscBinError> {
        let name_len = data
            .iter()
            .position(|&b| b == 0)
            .ok_or(GscBinError::Truncated { what: "script name" })?;
        let name = std::str::from_utf8(&data[..name_len]).map_err(|_| GscBinError::InvalidName)?;

        let mut rest = &data[name_len + 1..];
        let compressed_len = read_len(&mut rest, "compressed length")?;
        let stack_len = read_len(&mut rest, "stack length")?;
        let bytecode_len = read_len(&mut rest, "bytecode length")?;

        let compressed = take(&mut rest, compressed_len, "compressed stack")?;
        let bytecode = take(&mut rest, bytecode_len, "bytecode")?;

        Ok(Self::new(name, bytecode.to_vec(), compressed.to_vec(), stack_len))
    }
}

/// Deflate a stack segment with zlib framing, the layout the runtime inflates.
pub fn compress_stack(stack: &[u8], level: u32) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(stack.len() / 2 + 16), Compression::new(level));
    encoder.write_all(stack)?;
    encoder.finish()
}

fn clamp_len(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

fn read_len(rest: &mut &[u8], what: &'static str) -> Result<usize, GscBinError> {
    let bytes = take(rest, 4, what)?;
    let value = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    usize::try_from(value).map_err(|_| GscBinError::NegativeLength { what, value })
}

fn take<'a>(rest: &mut &'a [u8], len: usize, what: &'static str) -> Result<&'a [u8], GscBinError> {
    if rest.len() < len {
        return Err(GscBinError::Truncated { what });
    }
    let (head, tail) = rest.split_at(len);
    *rest = tail;
    Ok(head)
}
