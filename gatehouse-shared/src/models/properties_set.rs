/// Property sets
///
/// A property set groups typed properties under a name and attaches them to
/// any entity through `holder_id` (a user, an organization, a resource...).
/// The holder is not a foreign key, so a set may outlive what it describes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    changeset::{Changeset, Diff},
    record::{self, Record},
};

const COLUMNS: &str = "id, holder_id, name, description, \
    is_active, is_logical_deleted, created_by_id, updated_by_id, created_at, updated_at";

/// Named group of properties attached to a holder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PropertiesSet {
    pub id: Uuid,

    /// Id of the entity the set describes
    pub holder_id: Uuid,

    /// Name, unique per holder
    pub name: String,

    pub description: Option<String>,
    pub is_active: bool,
    pub is_logical_deleted: bool,
    pub created_by_id: Option<Uuid>,
    pub updated_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePropertiesSet {
    pub holder_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePropertiesSet {
    pub id: Option<Uuid>,
    pub holder_id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl UpdatePropertiesSet {
    pub fn apply_to(self, set: &mut PropertiesSet) {
        if let Some(holder_id) = self.holder_id {
            set.holder_id = holder_id;
        }
        if let Some(name) = self.name {
            set.name = name;
        }
        if let Some(description) = self.description {
            set.description = description;
        }
        if let Some(active) = self.is_active {
            set.is_active = active;
        }
    }
}

impl Diff for PropertiesSet {
    fn diff(&self, current: &Self) -> Changeset {
        let mut changes = Changeset::new();
        changes
            .field("holder_id", &current.holder_id, &self.holder_id)
            .field("name", &current.name, &self.name)
            .field("description", &current.description, &self.description)
            .field("is_active", &current.is_active, &self.is_active)
            .field("is_logical_deleted", &current.is_logical_deleted, &self.is_logical_deleted)
            .field("updated_by_id", &current.updated_by_id, &self.updated_by_id)
            .timestamp("updated_at", &Some(current.updated_at), &Some(self.updated_at));
        changes
    }
}

impl Record for PropertiesSet {
    const TABLE: &'static str = "properties_sets";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, actor: Option<Uuid>) {
        self.updated_at = Utc::now();
        self.updated_by_id = actor;
    }
}

impl PropertiesSet {
    pub async fn create(
        pool: &PgPool,
        data: CreatePropertiesSet,
        actor: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO properties_sets (id, holder_id, name, description, \
             created_by_id, updated_by_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5, $6, $6) RETURNING {}",
            COLUMNS
        );

        sqlx::query_as::<_, PropertiesSet>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.holder_id)
            .bind(data.name)
            .bind(data.description)
            .bind(actor)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all(pool).await
    }

    /// Lists the sets attached to one holder
    pub async fn list_by_holder(pool: &PgPool, holder_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all_by(pool, "holder_id", holder_id).await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_id(pool, id).await
    }

    pub async fn find_by_name(
        pool: &PgPool,
        holder_id: Uuid,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_name_in(pool, "holder_id", holder_id, name).await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: UpdatePropertiesSet,
        actor: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::update(pool, id, actor, |set: &mut Self| {
            changes.apply_to(set);
            Ok(())
        })
        .await
    }

    /// Deletes a set and its properties
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        record::delete::<PropertiesSet>(pool, id).await
    }
}
