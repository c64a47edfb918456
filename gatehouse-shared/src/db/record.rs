/// Shared persistence operations for record types
///
/// Every table has the same shape around its business columns: a UUID `id`,
/// soft-delete and activity flags, and an audit quartet. The [`Record`]
/// trait captures the table name and column list; the free functions here
/// implement the operations that are identical for every table (fetch by
/// id, scoped listing, diff-based update, delete).
///
/// Model modules add the table-specific parts (`INSERT`, name lookups) and
/// expose typed wrappers around these helpers.

use sqlx::{postgres::PgRow, FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::changeset::Diff;

/// A row type backed by one table
pub trait Record: for<'r> FromRow<'r, PgRow> + Diff + Clone + Send + Unpin + 'static {
    /// Table name
    const TABLE: &'static str;

    /// Comma-separated column list used in SELECT and RETURNING clauses
    const COLUMNS: &'static str;

    /// Primary key
    fn id(&self) -> Uuid;

    /// Stamps the update audit columns
    fn touch(&mut self, actor: Option<Uuid>);
}

/// Fetches one row by primary key
pub async fn fetch_by_id<R: Record>(pool: &PgPool, id: Uuid) -> Result<Option<R>, sqlx::Error> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", R::COLUMNS, R::TABLE);

    sqlx::query_as::<_, R>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Fetches every row whose `column` equals `value`, oldest first
///
/// `column` must be a constant from model code.
pub async fn fetch_all_by<R: Record>(
    pool: &PgPool,
    column: &'static str,
    value: Uuid,
) -> Result<Vec<R>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = $1 ORDER BY created_at, id",
        R::COLUMNS,
        R::TABLE,
        column
    );

    sqlx::query_as::<_, R>(&sql)
        .bind(value)
        .fetch_all(pool)
        .await
}

/// Fetches every row of the table, oldest first
pub async fn fetch_all<R: Record>(pool: &PgPool) -> Result<Vec<R>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY created_at, id",
        R::COLUMNS,
        R::TABLE
    );

    sqlx::query_as::<_, R>(&sql).fetch_all(pool).await
}

/// Fetches the row named `name` inside the scope `scope_column = scope_id`
pub async fn fetch_by_name_in<R: Record>(
    pool: &PgPool,
    scope_column: &'static str,
    scope_id: Uuid,
    name: &str,
) -> Result<Option<R>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = $1 AND name = $2",
        R::COLUMNS,
        R::TABLE,
        scope_column
    );

    sqlx::query_as::<_, R>(&sql)
        .bind(scope_id)
        .bind(name)
        .fetch_optional(pool)
        .await
}

/// Applies `patch` to the stored row and persists what changed
///
/// 1. Locks and reads the current row inside a transaction.
/// 2. Runs `patch` on a copy of it and stamps `updated_at` / `updated_by_id`.
/// 3. Computes the changeset and issues a single parameterized UPDATE.
///
/// The patch sees the row as it is under the lock, so fields it does not
/// touch keep whatever a concurrent writer committed before us. An error
/// from `patch` rolls back without writing.
///
/// Returns `Ok(None)` if the row does not exist. When nothing but the audit
/// stamp would change the stored row is returned as-is.
pub async fn update<R, E, F>(
    pool: &PgPool,
    id: Uuid,
    actor: Option<Uuid>,
    patch: F,
) -> Result<Option<R>, E>
where
    R: Record,
    E: From<sqlx::Error>,
    F: FnOnce(&mut R) -> Result<(), E>,
{
    let mut tx = pool.begin().await?;

    let sql = format!(
        "SELECT {} FROM {} WHERE id = $1 FOR UPDATE",
        R::COLUMNS,
        R::TABLE
    );
    let Some(current) = sqlx::query_as::<_, R>(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
    else {
        tx.rollback().await?;
        return Ok(None);
    };

    let mut record = current.clone();
    if let Err(e) = patch(&mut record) {
        tx.rollback().await?;
        return Err(e);
    }
    record.touch(actor);

    let changes = record.diff(&current);
    let only_audit = changes
        .iter()
        .all(|c| matches!(c.column, "updated_at" | "updated_by_id"));

    if only_audit {
        debug!(table = R::TABLE, %id, "No column changed, skipping update");
        tx.rollback().await?;
        return Ok(Some(current));
    }

    let Some(mut query) = changes.update_query(R::TABLE, id, R::COLUMNS) else {
        tx.rollback().await?;
        return Ok(Some(current));
    };

    let updated = query.build_query_as::<R>().fetch_one(&mut *tx).await?;
    tx.commit().await?;

    debug!(table = R::TABLE, %id, "Row updated");
    Ok(Some(updated))
}

/// Deletes a row by primary key
///
/// Deleting an id that does not exist is not an error; the return value
/// tells whether a row was removed.
pub async fn delete<R: Record>(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let sql = format!("DELETE FROM {} WHERE id = $1", R::TABLE);

    let result = sqlx::query(&sql).bind(id).execute(pool).await?;

    debug!(table = R::TABLE, %id, removed = result.rows_affected(), "Delete executed");
    Ok(result.rows_affected() > 0)
}
