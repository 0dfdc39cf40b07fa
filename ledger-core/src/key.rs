//! Hierarchical entity keys.
//!
//! A key names one entity as a `(kind, id)` pair plus an optional parent
//! key. The parent chain expresses ownership: every contest key has the
//! owning user's key as its parent, which is what ancestor-scoped queries
//! match on.
//!
//! # String Encoding
//!
//! [`Key::encode`] renders the chain from root to leaf as
//! `Kind:id/Kind:id`. The encoding is stable, so it doubles as the local
//! cache key, and an ancestor's encoding is always a path prefix of its
//! descendants' encodings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind tag for contest keys.
pub const CONTEST_KIND: &str = "Contest";

/// Kind tag for owner (user) keys.
pub const OWNER_KIND: &str = "User";

const PATH_SEPARATOR: char = '/';
const PART_SEPARATOR: char = ':';

/// Identity of a stored entity.
///
/// An `id` of `0` marks an incomplete key: the store assigns the real id
/// when the entity is first persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    kind: String,
    id: i64,
    parent: Option<Box<Key>>,
}

impl Key {
    pub fn new(kind: impl Into<String>, id: i64, parent: Option<Key>) -> Self {
        Self {
            kind: kind.into(),
            id,
            parent: parent.map(Box::new),
        }
    }

    /// Root key for an owning user.
    pub fn owner(id: i64) -> Self {
        Self::new(OWNER_KIND, id, None)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn parent(&self) -> Option<&Key> {
        self.parent.as_deref()
    }

    /// True until the store has assigned an id.
    pub fn is_incomplete(&self) -> bool {
        self.id == 0
    }

    /// Copy of this key with the id replaced.
    ///
    /// Stores use this to complete an incomplete key on first persist.
    pub fn with_id(&self, id: i64) -> Self {
        Self {
            kind: self.kind.clone(),
            id,
            parent: self.parent.clone(),
        }
    }

    /// Whether `self` appears in `other`'s parent chain.
    ///
    /// A key is not its own ancestor.
    pub fn is_ancestor_of(&self, other: &Key) -> bool {
        let mut current = other.parent();
        while let Some(parent) = current {
            if parent == self {
                return true;
            }
            current = parent.parent();
        }
        false
    }

    /// Stable string form, root first.
    pub fn encode(&self) -> String {
        let mut parts = Vec::new();
        let mut current = Some(self);
        while let Some(key) = current {
            parts.push(format!("{}{}{}", key.kind, PART_SEPARATOR, key.id));
            current = key.parent();
        }
        parts.reverse();
        parts.join(&PATH_SEPARATOR.to_string())
    }

    /// Parse the output of [`Key::encode`].
    ///
    /// Returns `None` for an empty string, an empty kind, or a non-numeric id.
    pub fn decode(encoded: &str) -> Option<Self> {
        let mut key: Option<Key> = None;
        for part in encoded.split(PATH_SEPARATOR) {
            let (kind, id) = part.rsplit_once(PART_SEPARATOR)?;
            if kind.is_empty() || kind.contains(PART_SEPARATOR) {
                return None;
            }
            let id = id.parse::<i64>().ok()?;
            key = Some(Key::new(kind, id, key));
        }
        key
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Build the key of a contest owned by `owner`.
///
/// Pass `0` as `id` to let the store assign one on create.
pub fn contest_key(id: i64, owner: &Key) -> Key {
    Key::new(CONTEST_KIND, id, Some(owner.clone()))
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Encoding is injective over owner/contest pairs.
        #[test]
        fn prop_encode_decode(owner_id in any::<i64>(), id in any::<i64>()) {
            let key = contest_key(id, &Key::owner(owner_id));
            prop_assert_eq!(Key::decode(&key.encode()), Some(key));
        }

        #[test]
        fn prop_owner_encoding_is_prefix(owner_id in any::<i64>(), id in any::<i64>()) {
            let owner = Key::owner(owner_id);
            let key = contest_key(id, &owner);
            let prefix = format!("{}/", owner.encode());
            prop_assert!(key.encode().starts_with(&prefix));
        }
    }
}
