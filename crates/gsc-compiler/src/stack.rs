//! Reading assembled stacks back.

use gsc_core::TokenId;

use crate::StackError;

/// First four bytes of every stack.
pub const STACK_MAGIC: &[u8; 4] = b"GSTK";

/// How an exported function is named in the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportName {
    Token(TokenId),
    Name(String),
}

/// One exported function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: ExportName,
    /// Offset of the function body in the bytecode buffer.
    pub offset: u32,
    pub size: u32,
    pub params: u8,
}

impl Export {
    /// Whether this export is `name`, or carries `token`.
    pub fn matches(&self, name: &str, token: Option<TokenId>) -> bool {
        match &self.name {
            ExportName::Token(id) => Some(*id) == token,
            ExportName::Name(n) => n == name,
        }
    }

    /// The function body within `bytecode`.
    pub fn code<'a>(&self, bytecode: &'a [u8]) -> Option<&'a [u8]> {
        let start = self.offset as usize;
        bytecode.get(start..start.checked_add(self.size as usize)?)
    }
}

/// Decoded export and string tables of a stack.
#[derive(Debug, Clone, Default)]
pub struct StackReader {
    exports: Vec<Export>,
    strings: Vec<String>,
}

impl StackReader {
    /// Decode a stack buffer.
    pub fn parse(stack: &[u8]) -> Result<Self, StackError> {
        let mut reader = ByteReader::new(stack);
        if reader.take(4, "magic")? != STACK_MAGIC {
            return Err(StackError::BadMagic);
        }

        let count = reader.u16("function count")?;
        let mut exports = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let raw = reader.u16("function name")?;
            let name = match TokenId::new(raw) {
                Some(token) => ExportName::Token(token),
                None => ExportName::Name(reader.cstr("function name")?),
            };
            exports.push(Export {
                name,
                offset: reader.u32("function offset")?,
                size: reader.u32("function size")?,
                params: reader.u8("parameter count")?,
            });
        }

        let count = reader.u16("string count")?;
        let mut strings = Vec::with_capacity(count as usize);
        for _ in 0..count {
            strings.push(reader.cstr("string table")?);
        }

        Ok(Self { exports, strings })
    }

    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn string(&self, index: u16) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    /// Find an export by name or token.
    pub fn find(&self, name: &str, token: Option<TokenId>) -> Option<&Export> {
        self.exports.iter().find(|e| e.matches(name, token))
    }
}

struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], StackError> {
        let bytes = self
            .data
            .get(self.position..self.position + len)
            .ok_or(StackError::Truncated { what })?;
        self.position += len;
        Ok(bytes)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, StackError> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, StackError> {
        let bytes = self.take(2, what)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, StackError> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn cstr(&mut self, what: &'static str) -> Result<String, StackError> {
        let rest = &self.data[self.position..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(StackError::Truncated { what })?;
        let text = std::str::from_utf8(&rest[..len]).map_err(|_| StackError::InvalidUtf8 { what })?;
        self.position += len + 1;
        Ok(text.to_string())
    }
}
