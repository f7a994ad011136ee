//! Row shapes exchanged with the backend tables.
//!
//! Each persisted table has a read model (what `select` returns) and, where
//! the client inserts rows, a `New*` model carrying only the columns the
//! client supplies. Ids and timestamps are assigned by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{ChatId, UserId};

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Identity returned by sign-up, sign-in and session recovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub email: String,
}

// ---------------------------------------------------------------------------
// user_profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub display_name: Option<String>,
    pub career: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUserProfile {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub career: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl From<&Account> for NewUserProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            display_name: None,
            career: None,
            bio: None,
        }
    }
}

/// Partial profile edit.
///
/// The outer `Option` says whether the field takes part in the edit at all;
/// `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub display_name: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub career: Option<Option<String>>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.bio.is_none() && self.career.is_none()
    }

    /// JSON update object holding only the named columns.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        let fields = [
            ("display_name", &self.display_name),
            ("bio", &self.bio),
            ("career", &self.career),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                let json = value.clone().map(Value::String).unwrap_or(Value::Null);
                map.insert(column.to_string(), json);
            }
        }
        Value::Object(map)
    }
}

// ---------------------------------------------------------------------------
// global_chat_messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalChatMessage {
    pub id: i64,
    pub sender_id: Option<UserId>,
    pub email: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewGlobalChatMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<UserId>,
    pub email: String,
    pub content: String,
}

// ---------------------------------------------------------------------------
// private_chats / private_chat_messages
// ---------------------------------------------------------------------------

/// A two-party conversation. `user_id1 < user_id2` always holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivateChat {
    pub id: ChatId,
    pub user_id1: UserId,
    pub user_id2: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPrivateChat {
    pub user_id1: UserId,
    pub user_id2: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivateChatMessage {
    pub id: i64,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPrivateChatMessage {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_patch_only_names_touched_columns() {
        let patch = ProfilePatch {
            display_name: Some(Some("Ada".into())),
            career: Some(None),
            ..Default::default()
        };

        assert_eq!(
            patch.to_json(),
            json!({ "display_name": "Ada", "career": null })
        );
        assert!(!patch.is_empty());
        assert!(ProfilePatch::default().is_empty());
    }

    #[test]
    fn test_private_message_from_row() {
        let row = json!({
            "id": 7,
            "chat_id": 3,
            "sender_id": "u1",
            "content": "hola",
            "created_at": "2024-05-01T10:00:00.000Z",
        });

        let msg: PrivateChatMessage = serde_json::from_value(row).unwrap();
        assert_eq!(msg.chat_id, ChatId(3));
        assert_eq!(msg.sender_id, UserId::from("u1"));
    }
}
