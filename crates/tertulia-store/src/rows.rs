//! Generic JSON row operations over the tables in [`crate::tables`].

use rusqlite::params_from_iter;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Map, Number, Value};
use tertulia_shared::EqFilter;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::tables::{schema, TableSchema};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert one row and return it with its generated columns filled in.
    pub fn insert_row(&self, table: &str, row: &Value) -> Result<Value> {
        let schema = schema(table)?;
        let object = row
            .as_object()
            .ok_or_else(|| StoreError::InvalidRow("expected a JSON object".into()))?;

        let mut columns = Vec::with_capacity(object.len());
        let mut values = Vec::with_capacity(object.len());
        for (column, value) in object {
            schema.check_column(column)?;
            columns.push(column.as_str());
            values.push(json_to_sql(value)?);
        }

        let sql = if columns.is_empty() {
            format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                schema.name,
                schema.column_list()
            )
        } else {
            let placeholders = (1..=columns.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                schema.name,
                columns.join(", "),
                placeholders,
                schema.column_list()
            )
        };

        let mut stmt = self.conn().prepare(&sql)?;
        let inserted = stmt.query_row(params_from_iter(values.iter()), |r| row_to_json(schema, r))?;
        Ok(inserted)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Rows matching every filter, in insertion order.
    pub fn select_rows(&self, table: &str, filters: &[EqFilter]) -> Result<Vec<Value>> {
        let schema = schema(table)?;
        let (where_clause, values) = where_clause(schema, filters, 1)?;

        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY rowid ASC",
            schema.column_list(),
            schema.name,
            where_clause
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |r| row_to_json(schema, r))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply `patch` to every matching row and return the updated rows.
    pub fn update_rows(&self, table: &str, filters: &[EqFilter], patch: &Value) -> Result<Vec<Value>> {
        let schema = schema(table)?;
        let object = patch
            .as_object()
            .ok_or_else(|| StoreError::InvalidRow("expected a JSON object".into()))?;
        if object.is_empty() {
            return Ok(Vec::new());
        }

        let mut assignments = Vec::with_capacity(object.len());
        let mut values = Vec::with_capacity(object.len() + filters.len());
        for (i, (column, value)) in object.iter().enumerate() {
            schema.check_column(column)?;
            assignments.push(format!("{column} = ?{}", i + 1));
            values.push(json_to_sql(value)?);
        }

        let (where_clause, filter_values) = where_clause(schema, filters, values.len() + 1)?;
        values.extend(filter_values);

        let sql = format!(
            "UPDATE {} SET {}{} RETURNING {}",
            schema.name,
            assignments.join(", "),
            where_clause,
            schema.column_list()
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |r| row_to_json(schema, r))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build ` WHERE a IS ?n AND b IS ?n+1 ...` starting at placeholder `first`.
fn where_clause(
    schema: &TableSchema,
    filters: &[EqFilter],
    first: usize,
) -> Result<(String, Vec<SqlValue>)> {
    if filters.is_empty() {
        return Ok((String::new(), Vec::new()));
    }

    let mut terms = Vec::with_capacity(filters.len());
    let mut values = Vec::with_capacity(filters.len());
    for (i, filter) in filters.iter().enumerate() {
        schema.check_column(&filter.column)?;
        terms.push(format!("{} IS ?{}", filter.column, first + i));
        values.push(json_to_sql(&filter.value)?);
    }
    Ok((format!(" WHERE {}", terms.join(" AND ")), values))
}

fn json_to_sql(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => {
            return Err(StoreError::InvalidRow(format!(
                "nested values are not supported: {value}"
            )))
        }
    })
}

/// Map a `rusqlite::Row` selected with `schema.column_list()` to a JSON object.
fn row_to_json(schema: &TableSchema, row: &rusqlite::Row<'_>) -> rusqlite::Result<Value> {
    let mut map = Map::with_capacity(schema.columns.len());
    for (i, column) in schema.columns.iter().enumerate() {
        let value = match row.get_ref(i)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(n) => Value::Number(n.into()),
            ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
        };
        map.insert(column.to_string(), value);
    }
    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_returns_generated_columns() {
        let db = db();
        let row = db
            .insert_row(
                "global_chat_messages",
                &json!({ "sender_id": "u1", "email": "a@x.com", "content": "hi" }),
            )
            .unwrap();

        assert_eq!(row["id"], json!(1));
        assert_eq!(row["content"], json!("hi"));
        assert!(row["created_at"].is_string());
    }

    #[test]
    fn test_select_filters_and_order() {
        let db = db();
        db.insert_row("private_chats", &json!({ "user_id1": "a", "user_id2": "b" }))
            .unwrap();
        db.insert_row("private_chats", &json!({ "user_id1": "a", "user_id2": "c" }))
            .unwrap();

        for content in ["one", "two", "three"] {
            db.insert_row(
                "private_chat_messages",
                &json!({ "chat_id": 1, "sender_id": "a", "content": content }),
            )
            .unwrap();
        }
        db.insert_row(
            "private_chat_messages",
            &json!({ "chat_id": 2, "sender_id": "a", "content": "elsewhere" }),
        )
        .unwrap();

        let rows = db
            .select_rows("private_chat_messages", &[EqFilter::new("chat_id", 1)])
            .unwrap();
        let contents: Vec<_> = rows.iter().map(|r| r["content"].clone()).collect();
        assert_eq!(contents, vec![json!("one"), json!("two"), json!("three")]);

        let chats = db
            .select_rows(
                "private_chats",
                &[EqFilter::new("user_id1", "a"), EqFilter::new("user_id2", "c")],
            )
            .unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0]["id"], json!(2));
    }

    #[test]
    fn test_private_chat_pair_is_unique_and_ordered() {
        let db = db();
        db.insert_row("private_chats", &json!({ "user_id1": "a", "user_id2": "b" }))
            .unwrap();

        let dup = db.insert_row("private_chats", &json!({ "user_id1": "a", "user_id2": "b" }));
        let err = tertulia_shared::ProviderError::from(dup.unwrap_err());
        assert!(err.has_code("23505"));

        let unordered = db.insert_row("private_chats", &json!({ "user_id1": "z", "user_id2": "b" }));
        assert!(unordered.is_err());
    }

    #[test]
    fn test_update_touches_only_named_columns() {
        let db = db();
        db.insert_row(
            "user_profiles",
            &json!({ "id": "u1", "email": "a@x.com", "bio": "b" }),
        )
        .unwrap();

        let updated = db
            .update_rows(
                "user_profiles",
                &[EqFilter::new("id", "u1")],
                &json!({ "display_name": "X" }),
            )
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["display_name"], json!("X"));
        assert_eq!(updated[0]["bio"], json!("b"));
        assert_eq!(updated[0]["career"], Value::Null);
    }

    #[test]
    fn test_rejects_unknown_names() {
        let db = db();
        assert!(matches!(
            db.select_rows("auth_users", &[]),
            Err(StoreError::UnknownTable(_))
        ));
        assert!(matches!(
            db.insert_row("user_profiles", &json!({ "id": "u1", "email": "e", "admin": 1 })),
            Err(StoreError::UnknownColumn { .. })
        ));
    }
}
