/// User model and database operations
///
/// Users authenticate with a username or email and a password. A user owns
/// organizations, has exactly one profile, and is granted roles inside
/// organizations through `user_roles`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     username VARCHAR(64) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     email_confirmed BOOLEAN NOT NULL DEFAULT FALSE,
///     last_ip VARCHAR(64),
///     -- audit and soft-delete columns
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use gatehouse_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     username: "ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }, None).await?;
///
/// let found = User::find_by_username(&pool, "ada").await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    changeset::{Changeset, Diff},
    record::{self, Record},
};

use super::key::EntityKey;

const COLUMNS: &str = "id, username, email, password_hash, email_confirmed, last_ip, \
    is_active, is_logical_deleted, created_by_id, updated_by_id, created_at, updated_at";

/// User account
///
/// The password hash never leaves the server: it is skipped when the record
/// is serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Login name, unique across all users
    pub username: String,

    /// Email address, unique across all users
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Whether the email address has been confirmed
    pub email_confirmed: bool,

    /// Address of the last successful login
    pub last_ip: Option<String>,

    /// Whether the account is active
    pub is_active: bool,

    /// Soft-delete flag
    pub is_logical_deleted: bool,

    /// Actor that created the row
    pub created_by_id: Option<Uuid>,

    /// Actor of the last update
    pub updated_by_id: Option<Uuid>,

    /// When the row was created
    pub created_at: DateTime<Utc>,

    /// When the row was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Login name
    pub username: String,

    /// Email address
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,
}

/// Partial user update
///
/// `None` leaves the field unchanged. Passwords are changed by setting
/// `password_hash` after hashing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// Must match the target user when present
    pub id: Option<Uuid>,

    /// New login name
    pub username: Option<String>,

    /// New email address
    pub email: Option<String>,

    /// New password hash
    #[serde(skip)]
    pub password_hash: Option<String>,

    /// New confirmation flag
    pub email_confirmed: Option<bool>,

    /// New activity flag
    pub is_active: Option<bool>,
}

impl UpdateUser {
    /// Copies the present fields onto `user`
    pub fn apply_to(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(password_hash) = self.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(confirmed) = self.email_confirmed {
            user.email_confirmed = confirmed;
        }
        if let Some(active) = self.is_active {
            user.is_active = active;
        }
    }
}

impl Diff for User {
    fn diff(&self, current: &Self) -> Changeset {
        let mut changes = Changeset::new();
        changes
            .field("username", &current.username, &self.username)
            .field("email", &current.email, &self.email)
            .field("password_hash", &current.password_hash, &self.password_hash)
            .field("email_confirmed", &current.email_confirmed, &self.email_confirmed)
            .field("last_ip", &current.last_ip, &self.last_ip)
            .field("is_active", &current.is_active, &self.is_active)
            .field("is_logical_deleted", &current.is_logical_deleted, &self.is_logical_deleted)
            .field("updated_by_id", &current.updated_by_id, &self.updated_by_id)
            .timestamp("updated_at", &Some(current.updated_at), &Some(self.updated_at));
        changes
    }
}

impl Record for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, actor: Option<Uuid>) {
        self.updated_at = Utc::now();
        self.updated_by_id = actor;
    }
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the username or email is already taken
    /// (unique constraint violation) or the database is unreachable.
    pub async fn create(
        pool: &PgPool,
        data: CreateUser,
        actor: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, created_by_id, updated_by_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5, $6, $6) RETURNING {}",
            COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.username)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(actor)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Lists all users, oldest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all(pool).await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_id(pool, id).await
    }

    /// Finds a user by username
    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", COLUMNS);

        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", COLUMNS);

        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by id or username
    pub async fn find_by_key(pool: &PgPool, key: &EntityKey) -> Result<Option<Self>, sqlx::Error> {
        match key {
            EntityKey::Id(id) => Self::find_by_id(pool, *id).await,
            EntityKey::Name(username) => Self::find_by_username(pool, username).await,
        }
    }

    /// Finds a user by username or email, as typed on the login form
    pub async fn find_by_login(pool: &PgPool, login: &str) -> Result<Option<Self>, sqlx::Error> {
        if login.contains('@') {
            Self::find_by_email(pool, login).await
        } else {
            Self::find_by_username(pool, login).await
        }
    }

    /// Persists changed columns (see [`record::update`])
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: UpdateUser,
        actor: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::update(pool, id, actor, |user: &mut Self| {
            changes.apply_to(user);
            Ok(())
        })
        .await
    }

    /// Records the address of a successful login
    pub async fn record_login(pool: &PgPool, id: Uuid, ip: Option<String>) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_ip = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(ip)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user (cascades to profile, organizations and grants)
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        record::delete::<User>(pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
            email_confirmed: false,
            last_ip: None,
            is_active: true,
            is_logical_deleted: false,
            created_by_id: None,
            updated_by_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "ada");
    }

    #[test]
    fn test_diff_detects_changed_columns() {
        let current = sample_user();
        let mut updated = current.clone();
        updated.email = "lovelace@example.com".to_string();
        updated.email_confirmed = true;

        assert_eq!(updated.diff(&current).columns(), vec!["email", "email_confirmed"]);
    }

    #[test]
    fn test_touch_marks_audit_columns() {
        let current = sample_user();
        let mut updated = current.clone();
        let actor = Uuid::new_v4();
        updated.touch(Some(actor));

        let columns = updated.diff(&current).columns();
        assert!(columns.contains(&"updated_by_id"));
    }

    #[test]
    fn test_update_user_apply() {
        let mut user = sample_user();
        UpdateUser {
            username: Some("countess".to_string()),
            is_active: Some(false),
            ..Default::default()
        }
        .apply_to(&mut user);

        assert_eq!(user.username, "countess");
        assert!(!user.is_active);
        assert_eq!(user.email, "ada@example.com");
    }
}
