//! Registry of the tables reachable through the generic row API.
//!
//! Table and column names are interpolated into SQL, so every name coming
//! from a caller is checked against this list first. The auth tables are
//! deliberately absent: they are only reachable through [`crate::accounts`].

use tertulia_shared::constants::{
    TABLE_GLOBAL_CHAT_MESSAGES, TABLE_PRIVATE_CHATS, TABLE_PRIVATE_CHAT_MESSAGES,
    TABLE_USER_PROFILES,
};

use crate::error::{Result, StoreError};

#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

pub const TABLES: &[TableSchema] = &[
    TableSchema {
        name: TABLE_USER_PROFILES,
        columns: &["id", "email", "created_at", "display_name", "career", "bio"],
    },
    TableSchema {
        name: TABLE_GLOBAL_CHAT_MESSAGES,
        columns: &["id", "sender_id", "email", "content", "created_at"],
    },
    TableSchema {
        name: TABLE_PRIVATE_CHATS,
        columns: &["id", "user_id1", "user_id2", "created_at"],
    },
    TableSchema {
        name: TABLE_PRIVATE_CHAT_MESSAGES,
        columns: &["id", "chat_id", "sender_id", "content", "created_at"],
    },
];

pub fn schema(table: &str) -> Result<&'static TableSchema> {
    TABLES
        .iter()
        .find(|t| t.name == table)
        .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
}

impl TableSchema {
    pub fn check_column(&self, column: &str) -> Result<()> {
        if self.columns.contains(&column) {
            Ok(())
        } else {
            Err(StoreError::UnknownColumn {
                table: self.name.to_string(),
                column: column.to_string(),
            })
        }
    }

    /// Comma-separated column list in schema order.
    pub fn column_list(&self) -> String {
        self.columns.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let profiles = schema("user_profiles").unwrap();
        assert!(profiles.check_column("bio").is_ok());
        assert!(matches!(
            profiles.check_column("password_hash"),
            Err(StoreError::UnknownColumn { .. })
        ));
        assert!(matches!(schema("auth_users"), Err(StoreError::UnknownTable(_))));
    }
}
