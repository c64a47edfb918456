/// User profile model
///
/// Each user has at most one profile (`user_id` is unique). The free-form
/// `data` column is JSONB; the record carries it as JSON text so that an
/// update with malformed JSON can be detected and left out of the diff.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE profiles (
///     id UUID PRIMARY KEY,
///     user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255),
///     email VARCHAR(255),
///     location VARCHAR(255),
///     bio TEXT,
///     moto VARCHAR(255),
///     website VARCHAR(512),
///     anniversary_date TIMESTAMPTZ,
///     data JSONB NOT NULL DEFAULT '{}',
///     -- audit and soft-delete columns
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    changeset::{Changeset, Diff},
    record::{self, Record},
};

const COLUMNS: &str = "id, user_id, name, email, location, bio, moto, website, anniversary_date, \
    data::text AS data, is_active, is_logical_deleted, created_by_id, updated_by_id, created_at, updated_at";

/// Public profile attached to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    /// Unique profile ID
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Display name
    pub name: Option<String>,

    /// Contact email (may differ from the login email)
    pub email: Option<String>,

    /// Free-text location
    pub location: Option<String>,

    /// Short biography
    pub bio: Option<String>,

    /// Personal motto
    pub moto: Option<String>,

    /// Personal website
    pub website: Option<String>,

    /// Anniversary date
    pub anniversary_date: Option<DateTime<Utc>>,

    /// Free-form JSON document, as text
    pub data: String,

    /// Whether the profile is active
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

/// Input for creating a profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProfile {
    /// Owning user
    pub user_id: Uuid,

    /// Display name
    pub name: Option<String>,

    /// Contact email
    pub email: Option<String>,
}

/// Partial profile update
///
/// `data` is accepted as raw JSON text; invalid JSON is ignored by the diff.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfile {
    /// Must match the target profile when present
    pub id: Option<Uuid>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub moto: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub anniversary_date: Option<Option<DateTime<Utc>>>,
    pub data: Option<String>,
}

impl UpdateProfile {
    /// Copies the present fields onto `profile`
    pub fn apply_to(self, profile: &mut Profile) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(email) = self.email {
            profile.email = email;
        }
        if let Some(location) = self.location {
            profile.location = location;
        }
        if let Some(bio) = self.bio {
            profile.bio = bio;
        }
        if let Some(moto) = self.moto {
            profile.moto = moto;
        }
        if let Some(website) = self.website {
            profile.website = website;
        }
        if let Some(anniversary_date) = self.anniversary_date {
            profile.anniversary_date = anniversary_date;
        }
        if let Some(data) = self.data {
            profile.data = data;
        }
    }
}

impl Profile {
    /// Parsed `data` document (`{}` if the stored text is not valid JSON)
    pub fn data_json(&self) -> JsonValue {
        serde_json::from_str(&self.data).unwrap_or_else(|_| JsonValue::Object(Default::default()))
    }
}

impl Diff for Profile {
    fn diff(&self, current: &Self) -> Changeset {
        let mut changes = Changeset::new();
        changes
            .field("name", &current.name, &self.name)
            .field("email", &current.email, &self.email)
            .field("location", &current.location, &self.location)
            .field("bio", &current.bio, &self.bio)
            .field("moto", &current.moto, &self.moto)
            .field("website", &current.website, &self.website)
            .timestamp("anniversary_date", &current.anniversary_date, &self.anniversary_date)
            .json("data", &current.data, &self.data)
            .field("is_active", &current.is_active, &self.is_active)
            .field("is_logical_deleted", &current.is_logical_deleted, &self.is_logical_deleted)
            .field("updated_by_id", &current.updated_by_id, &self.updated_by_id)
            .timestamp("updated_at", &Some(current.updated_at), &Some(self.updated_at));
        changes
    }
}

impl Record for Profile {
    const TABLE: &'static str = "profiles";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, actor: Option<Uuid>) {
        self.updated_at = Utc::now();
        self.updated_by_id = actor;
    }
}

impl Profile {
    /// Creates the profile of a user
    pub async fn create(
        pool: &PgPool,
        data: CreateProfile,
        actor: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO profiles (id, user_id, name, email, created_by_id, updated_by_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5, $6, $6) RETURNING {}",
            COLUMNS
        );

        sqlx::query_as::<_, Profile>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.user_id)
            .bind(data.name)
            .bind(data.email)
            .bind(actor)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Lists all profiles
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all(pool).await
    }

    /// Finds a profile by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_id(pool, id).await
    }

    /// Finds the profile of a user
    pub async fn find_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM profiles WHERE user_id = $1", COLUMNS);

        sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Persists changed columns
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: UpdateProfile,
        actor: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::update(pool, id, actor, |profile: &mut Self| {
            changes.apply_to(profile);
            Ok(())
        })
        .await
    }

    /// Deletes a profile
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        record::delete::<Profile>(pool, id).await
    }
}
