//! In-process revoked / expired token sets

use dashmap::DashSet;
use std::collections::HashSet;
use std::fmt;

/// Which of the two tracked sets a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Revoked,
    Expired,
}

impl TokenKind {
    pub const ALL: [TokenKind; 2] = [TokenKind::Revoked, TokenKind::Expired];

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Revoked => "revoked",
            TokenKind::Expired => "expired",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two concurrent sets of opaque token strings.
///
/// Backed by `DashSet`, so mutations from several runtime worker threads need
/// no outer lock.
#[derive(Debug, Default)]
pub struct TokenSetStore {
    revoked: DashSet<String>,
    expired: DashSet<String>,
}

impl TokenSetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, kind: TokenKind) -> &DashSet<String> {
        match kind {
            TokenKind::Revoked => &self.revoked,
            TokenKind::Expired => &self.expired,
        }
    }

    /// Returns true if the token was not already present
    pub fn add(&self, kind: TokenKind, token: &str) -> bool {
        self.set(kind).insert(token.to_string())
    }

    /// Returns true if the token was present
    pub fn remove(&self, kind: TokenKind, token: &str) -> bool {
        self.set(kind).remove(token).is_some()
    }

    pub fn contains(&self, kind: TokenKind, token: &str) -> bool {
        self.set(kind).contains(token)
    }

    /// Immutable copy of one set
    pub fn snapshot(&self, kind: TokenKind) -> HashSet<String> {
        self.set(kind).iter().map(|token| token.key().clone()).collect()
    }

    /// Adopt tokens learned elsewhere (disk, cache); returns how many were new
    pub fn extend<I>(&self, kind: TokenKind, tokens: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let set = self.set(kind);
        tokens
            .into_iter()
            .filter(|token| set.insert(token.clone()))
            .count()
    }

    pub fn len(&self, kind: TokenKind) -> usize {
        self.set(kind).len()
    }

    pub fn is_empty(&self, kind: TokenKind) -> bool {
        self.set(kind).is_empty()
    }
}
