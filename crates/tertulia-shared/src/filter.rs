//! Row predicates shared by table queries and realtime filters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::DEFAULT_SCHEMA;

/// `column = value` predicate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EqFilter {
    pub column: String,
    pub value: Value,
}

impl EqFilter {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Whether a JSON row satisfies the predicate. Missing columns never match.
    pub fn matches(&self, row: &Value) -> bool {
        row.get(&self.column).is_some_and(|v| *v == self.value)
    }

    /// Filter string in the `column=eq.value` form used by realtime channels.
    pub fn to_filter_string(&self) -> String {
        let value = match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        format!("{}=eq.{}", self.column, value)
    }
}

/// Kind of row change a channel listens to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeEvent {
    Insert,
    Update,
    Delete,
    #[serde(rename = "*")]
    All,
}

impl ChangeEvent {
    pub fn accepts(self, event: ChangeEvent) -> bool {
        self == ChangeEvent::All || self == event
    }
}

/// What a realtime channel wants to hear about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeFilter {
    pub event: ChangeEvent,
    pub schema: String,
    pub table: String,
    pub filter: Option<EqFilter>,
}

impl ChangeFilter {
    /// Insert events on `table` in the default schema.
    pub fn inserts(table: impl Into<String>) -> Self {
        Self {
            event: ChangeEvent::Insert,
            schema: DEFAULT_SCHEMA.to_string(),
            table: table.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: EqFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn matches(&self, change: &RowChange) -> bool {
        self.table == change.table
            && self.event.accepts(change.event)
            && self
                .filter
                .as_ref()
                .map_or(true, |f| f.matches(&change.record))
    }
}

/// A committed row change pushed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowChange {
    pub table: String,
    pub event: ChangeEvent,
    /// The row after the change (`new` in the wire payload).
    pub record: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_string() {
        assert_eq!(EqFilter::new("chat_id", 42).to_filter_string(), "chat_id=eq.42");
        assert_eq!(EqFilter::new("id", "u1").to_filter_string(), "id=eq.u1");
    }

    #[test]
    fn test_change_filter_matching() {
        let filter = ChangeFilter::inserts("private_chat_messages")
            .with_filter(EqFilter::new("chat_id", 3));

        let hit = RowChange {
            table: "private_chat_messages".into(),
            event: ChangeEvent::Insert,
            record: json!({ "chat_id": 3, "content": "hi" }),
        };
        assert!(filter.matches(&hit));

        let other_chat = RowChange {
            record: json!({ "chat_id": 4 }),
            ..hit.clone()
        };
        assert!(!filter.matches(&other_chat));

        let update = RowChange {
            event: ChangeEvent::Update,
            ..hit.clone()
        };
        assert!(!filter.matches(&update));

        let other_table = RowChange {
            table: "global_chat_messages".into(),
            ..hit
        };
        assert!(!filter.matches(&other_table));
    }
}
