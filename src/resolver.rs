//! Script names and their numeric aliases.
//!
//! The host addresses some scripts by a numeric token instead of a path.
//! [`NameResolver`] turns either form into the canonical name used as the
//! cache key and source path.

use std::fmt;
use std::sync::Arc;

use gsc_core::{TokenId, TokenTable};

/// Canonical identity of a script.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptIdentity {
    /// The canonical name, also the source path without extension.
    pub name: String,
    pub token: Option<TokenId>,
}

impl ScriptIdentity {
    /// The name the host uses to address the script file: the token when
    /// there is one, otherwise the name.
    pub fn file_name(&self) -> String {
        match self.token {
            Some(token) => token.to_string(),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ScriptIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Maps lookup keys to [`ScriptIdentity`]s. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    tokens: Arc<TokenTable>,
}

impl NameResolver {
    pub fn new(tokens: Arc<TokenTable>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &Arc<TokenTable> {
        &self.tokens
    }

    /// Resolve a lookup key.
    ///
    /// A key that is a non-zero number with a known name resolves to that
    /// name. Anything else is taken verbatim as the name.
    pub fn resolve(&self, key: &str) -> ScriptIdentity {
        let aliased = key
            .parse::<u16>()
            .ok()
            .and_then(TokenId::new)
            .and_then(|token| self.tokens.name(token).map(|name| (token, name)));

        match aliased {
            Some((token, name)) => ScriptIdentity {
                name: name.to_string(),
                token: Some(token),
            },
            None => ScriptIdentity {
                name: key.to_string(),
                token: self.tokens.id(key),
            },
        }
    }

    /// Host file name of `name`.
    pub fn file_name(&self, name: &str) -> String {
        match self.tokens.id(name) {
            Some(token) => token.to_string(),
            None => name.to_string(),
        }
    }
}
