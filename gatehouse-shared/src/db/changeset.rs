/// Column-level change tracking for partial updates
///
/// Every record type implements [`Diff`], comparing an updated in-memory
/// value against the row currently stored in the database. The result is a
/// [`Changeset`]: an ordered list of `(column, new value)` pairs, one per
/// field whose value actually differs.
///
/// A changeset turns into a parameterized statement with
/// [`Changeset::update_query`]:
///
/// ```text
/// UPDATE organizations SET name = $1, updated_at = $2 WHERE id = $3 RETURNING ...
/// ```
///
/// Column names only ever come from `&'static str` constants in the model
/// code. Values are always bound, never spliced into the SQL text.
///
/// # Example
///
/// ```
/// use gatehouse_shared::db::changeset::Changeset;
/// use uuid::Uuid;
///
/// let mut changes = Changeset::new();
/// changes
///     .field("name", &"Acme".to_string(), &"Acme Corp".to_string())
///     .field("is_active", &true, &true);
///
/// assert_eq!(changes.columns(), vec!["name"]);
///
/// let query = changes.update_query("organizations", Uuid::nil(), "id").unwrap();
/// assert_eq!(query.sql(), "UPDATE organizations SET name = $1 WHERE id = $2 RETURNING id");
/// ```

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, warn};
use uuid::Uuid;

/// A new column value captured by a [`Changeset`]
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// TEXT / VARCHAR, nullable
    Text(Option<String>),

    /// BOOLEAN
    Bool(bool),

    /// INTEGER
    Int(i32),

    /// BIGINT
    BigInt(i64),

    /// UUID, nullable
    Uuid(Option<Uuid>),

    /// TIMESTAMPTZ, nullable
    Timestamp(Option<DateTime<Utc>>),

    /// JSONB (already validated)
    Json(JsonValue),
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(Some(value))
    }
}

impl From<Option<String>> for ColumnValue {
    fn from(value: Option<String>) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        ColumnValue::Bool(value)
    }
}

impl From<i32> for ColumnValue {
    fn from(value: i32) -> Self {
        ColumnValue::Int(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::BigInt(value)
    }
}

impl From<Uuid> for ColumnValue {
    fn from(value: Uuid) -> Self {
        ColumnValue::Uuid(Some(value))
    }
}

impl From<Option<Uuid>> for ColumnValue {
    fn from(value: Option<Uuid>) -> Self {
        ColumnValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for ColumnValue {
    fn from(value: DateTime<Utc>) -> Self {
        ColumnValue::Timestamp(Some(value))
    }
}

impl From<Option<DateTime<Utc>>> for ColumnValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        ColumnValue::Timestamp(value)
    }
}

/// One changed column
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Column name
    pub column: &'static str,

    /// Value to write
    pub value: ColumnValue,
}

/// Ordered set of changed columns
///
/// Columns keep the order in which they were compared, so the generated SQL
/// is deterministic for a given pair of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    changes: Vec<Change>,
}

/// Implemented by every record type that supports partial updates
pub trait Diff {
    /// Returns the columns of `self` that differ from `current`
    fn diff(&self, current: &Self) -> Changeset;
}

impl Changeset {
    /// Creates an empty changeset
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `column` if `updated` differs from `current`
    pub fn field<T>(&mut self, column: &'static str, current: &T, updated: &T) -> &mut Self
    where
        T: PartialEq + Clone + Into<ColumnValue>,
    {
        if current != updated {
            self.push(column, updated.clone().into());
        }
        self
    }

    /// Records a timestamp column if it differs at microsecond precision
    ///
    /// PostgreSQL keeps microseconds, so a value read back from the database
    /// must not count as changed against the nanosecond original.
    pub fn timestamp(
        &mut self,
        column: &'static str,
        current: &Option<DateTime<Utc>>,
        updated: &Option<DateTime<Utc>>,
    ) -> &mut Self {
        let micros = |value: &Option<DateTime<Utc>>| value.map(|ts| ts.timestamp_micros());

        if micros(current) != micros(updated) {
            self.push(column, ColumnValue::Timestamp(*updated));
        }
        self
    }

    /// Records a JSON column held as text
    ///
    /// The new text must parse as JSON. A malformed value is left out of the
    /// update instead of failing the whole statement.
    pub fn json(&mut self, column: &'static str, current: &str, updated: &str) -> &mut Self {
        if current == updated {
            return self;
        }

        match serde_json::from_str::<JsonValue>(updated) {
            Ok(value) => {
                // Whitespace-only edits are not changes.
                let unchanged = serde_json::from_str::<JsonValue>(current)
                    .map(|old| old == value)
                    .unwrap_or(false);
                if !unchanged {
                    self.push(column, ColumnValue::Json(value));
                }
            }
            Err(error) => {
                warn!(column, %error, "Dropping malformed JSON value from update");
            }
        }
        self
    }

    fn push(&mut self, column: &'static str, value: ColumnValue) {
        self.changes.push(Change { column, value });
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed columns
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Changed column names in comparison order
    pub fn columns(&self) -> Vec<&'static str> {
        self.changes.iter().map(|c| c.column).collect()
    }

    /// The new value recorded for `column`, if it changed
    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.changes
            .iter()
            .find(|c| c.column == column)
            .map(|c| &c.value)
    }

    /// Iterates over the recorded changes
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    /// Builds `UPDATE <table> SET ... WHERE id = $n RETURNING <returning>`
    ///
    /// Returns `None` for an empty changeset: there is no valid UPDATE
    /// statement without at least one SET clause.
    pub fn update_query(
        self,
        table: &'static str,
        id: Uuid,
        returning: &'static str,
    ) -> Option<QueryBuilder<'static, Postgres>> {
        if self.is_empty() {
            return None;
        }

        debug!(table, columns = ?self.columns(), "Building partial update");

        let mut builder = QueryBuilder::new("UPDATE ");
        builder.push(table).push(" SET ");

        let mut assignments = builder.separated(", ");
        for Change { column, value } in self.changes {
            assignments.push(column);
            assignments.push_unseparated(" = ");
            match value {
                ColumnValue::Text(v) => assignments.push_bind_unseparated(v),
                ColumnValue::Bool(v) => assignments.push_bind_unseparated(v),
                ColumnValue::Int(v) => assignments.push_bind_unseparated(v),
                ColumnValue::BigInt(v) => assignments.push_bind_unseparated(v),
                ColumnValue::Uuid(v) => assignments.push_bind_unseparated(v),
                ColumnValue::Timestamp(v) => assignments.push_bind_unseparated(v),
                ColumnValue::Json(v) => assignments.push_bind_unseparated(v),
            };
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING ");
        builder.push(returning);

        Some(builder)
    }
}
