use serde::{Deserialize, Serialize};

use crate::constants::PRIVATE_CHAT_CHANNEL_PREFIX;

/// Opaque identity issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(8).map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Row id of a `private_chats` record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical key for an unordered pair of participants.
///
/// `(a, b)` and `(b, a)` produce the same key; the lower id always comes first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    low: UserId,
    high: UserId,
}

impl PairKey {
    pub fn new(a: &UserId, b: &UserId) -> Self {
        if a <= b {
            Self {
                low: a.clone(),
                high: b.clone(),
            }
        } else {
            Self {
                low: b.clone(),
                high: a.clone(),
            }
        }
    }

    /// The two ids in storage order (`user_id1`, `user_id2`).
    pub fn ids(&self) -> (&UserId, &UserId) {
        (&self.low, &self.high)
    }

    pub fn to_channel_name(&self) -> String {
        format!("{PRIVATE_CHAT_CHANNEL_PREFIX}:{self}")
    }
}

impl std::fmt::Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.low, self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_symmetric() {
        let a = UserId::from("u2");
        let b = UserId::from("u1");

        let ab = PairKey::new(&a, &b);
        let ba = PairKey::new(&b, &a);

        assert_eq!(ab, ba);
        assert_eq!(ab.to_string(), "u1_u2");
        assert_eq!(ab.ids(), (&b, &a));
        assert_eq!(ab.to_channel_name(), "private_chat:u1_u2");
    }

    #[test]
    fn test_short_id() {
        let id = UserId::from("0f6c2a1e-5b8d-4c1e-9d7a-3e2f1a0b9c8d");
        assert_eq!(id.short(), "0f6c2a1e");
        assert_eq!(UserId::from("abc").short(), "abc");
    }
}
