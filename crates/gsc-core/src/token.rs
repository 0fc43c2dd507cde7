//! Numeric token aliases for script and function names.
//!
//! The game addresses many strings by a 16-bit token instead of by name. A
//! [`TokenTable`] holds that mapping in both directions and refuses any
//! insertion that would break the bijection.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::TokenTableError;

/// A non-zero numeric token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u16);

impl TokenId {
    /// Wrap a raw token. Zero is "no token" and yields `None`.
    #[inline]
    pub fn new(raw: u16) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    /// The raw 16-bit value.
    #[inline]
    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.0)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bidirectional name/token table.
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    by_id: FxHashMap<TokenId, String>,
    by_name: FxHashMap<String, TokenId>,
}

impl TokenTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(token, name)` pairs.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, TokenTableError>
    where
        I: IntoIterator<Item = (u16, S)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (id, name) in entries {
            table.insert(id, name)?;
        }
        Ok(table)
    }

    /// Map `id` to `name`.
    ///
    /// Re-inserting an identical pair is a no-op; anything that would give a
    /// token two names or a name two tokens is rejected.
    pub fn insert(&mut self, id: u16, name: impl Into<String>) -> Result<(), TokenTableError> {
        let name = name.into();
        let Some(token) = TokenId::new(id) else {
            return Err(TokenTableError::ReservedToken { name });
        };

        if let Some(existing) = self.by_id.get(&token) {
            if *existing == name {
                return Ok(());
            }
            return Err(TokenTableError::DuplicateToken {
                id,
                existing: existing.clone(),
                name,
            });
        }
        if let Some(existing) = self.by_name.get(&name) {
            return Err(TokenTableError::DuplicateName {
                name,
                existing: existing.get(),
                id,
            });
        }

        self.by_name.insert(name.clone(), token);
        self.by_id.insert(token, name);
        Ok(())
    }

    /// The token for a name.
    pub fn id(&self, name: &str) -> Option<TokenId> {
        self.by_name.get(name).copied()
    }

    /// The name for a token.
    pub fn name(&self, id: TokenId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the table holds no mappings.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Iterate over `(token, name)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &str)> {
        self.by_id.iter().map(|(id, name)| (*id, name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_a_token() {
        assert!(TokenId::new(0).is_none());
        assert_eq!(TokenId::new(7).map(TokenId::get), Some(7));
    }

    #[test]
    fn lookups_go_both_ways() {
        let table = TokenTable::from_entries([(0x1c7, "main"), (0x1c8, "init")]).unwrap();
        let main = table.id("main").unwrap();
        assert_eq!(main.get(), 0x1c7);
        assert_eq!(table.name(main), Some("main"));
        assert_eq!(table.len(), 2);
        assert!(table.id("missing").is_none());
    }

    #[test]
    fn identical_reinsert_is_accepted() {
        let mut table = TokenTable::new();
        table.insert(10, "maps/mp/gametypes/_callbacksetup").unwrap();
        table.insert(10, "maps/mp/gametypes/_callbacksetup").unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn bijection_is_enforced() {
        let mut table = TokenTable::new();
        table.insert(10, "a").unwrap();

        assert!(matches!(
            table.insert(10, "b"),
            Err(TokenTableError::DuplicateToken { id: 10, .. })
        ));
        assert!(matches!(
            table.insert(11, "a"),
            Err(TokenTableError::DuplicateName { existing: 10, .. })
        ));
        assert!(matches!(
            table.insert(0, "c"),
            Err(TokenTableError::ReservedToken { .. })
        ));
        assert_eq!(table.len(), 1);
    }
}
