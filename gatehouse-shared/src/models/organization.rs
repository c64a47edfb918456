/// Organization model
///
/// Organizations are the tenancy boundary of the RBAC graph: resources,
/// permissions, roles and every grant between them belong to exactly one
/// organization. An organization is owned by the user that created it and
/// its name is unique among that owner's organizations.
///
/// # Example
///
/// ```no_run
/// use gatehouse_shared::models::organization::{CreateOrganization, Organization};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner: Uuid) -> Result<(), sqlx::Error> {
/// let org = Organization::create(&pool, CreateOrganization {
///     owner_id: owner,
///     name: "acme".to_string(),
///     description: None,
/// }, Some(owner)).await?;
///
/// let mine = Organization::list_by_owner(&pool, owner).await?;
/// assert!(mine.iter().any(|o| o.id == org.id));
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

const COLUMNS: &str = "id, owner_id, name, description, \
    is_active, is_logical_deleted, created_by_id, updated_by_id, created_at, updated_at";

/// Tenant owning a slice of the RBAC graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    /// Unique organization ID
    pub id: Uuid,

    /// User that owns the organization
    pub owner_id: Uuid,

    /// Name, unique per owner
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Whether the organization is active
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

/// Input for creating an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    /// Owning user
    pub owner_id: Uuid,

    /// Name
    pub name: String,

    /// Optional description
    pub description: Option<String>,
}

/// Partial organization update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrganization {
    /// Must match the target organization when present
    pub id: Option<Uuid>,

    /// New name
    pub name: Option<String>,

    /// New description
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,

    /// New activity flag
    pub is_active: Option<bool>,
}

impl UpdateOrganization {
    /// Copies the present fields onto `org`
    pub fn apply_to(self, org: &mut Organization) {
        if let Some(name) = self.name {
            org.name = name;
        }
        if let Some(description) = self.description {
            org.description = description;
        }
        if let Some(active) = self.is_active {
            org.is_active = active;
        }
    }
}

impl Organization {
    /// Whether `user_id` owns this organization
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

impl Diff for Organization {
    fn diff(&self, current: &Self) -> Changeset {
        let mut changes = Changeset::new();
        changes
            .field("owner_id", &current.owner_id, &self.owner_id)
            .field("name", &current.name, &self.name)
            .field("description", &current.description, &self.description)
            .field("is_active", &current.is_active, &self.is_active)
            .field("is_logical_deleted", &current.is_logical_deleted, &self.is_logical_deleted)
            .field("updated_by_id", &current.updated_by_id, &self.updated_by_id)
            .timestamp("updated_at", &Some(current.updated_at), &Some(self.updated_at));
        changes
    }
}

impl Record for Organization {
    const TABLE: &'static str = "organizations";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, actor: Option<Uuid>) {
        self.updated_at = Utc::now();
        self.updated_by_id = actor;
    }
}

impl Organization {
    /// Creates a new organization
    ///
    /// # Errors
    ///
    /// Returns a unique violation if the owner already has an organization
    /// with this name.
    pub async fn create(
        pool: &PgPool,
        data: CreateOrganization,
        actor: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO organizations (id, owner_id, name, description, created_by_id, updated_by_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5, $6, $6) RETURNING {}",
            COLUMNS
        );

        sqlx::query_as::<_, Organization>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.owner_id)
            .bind(data.name)
            .bind(data.description)
            .bind(actor)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Lists every organization
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all(pool).await
    }

    /// Lists the organizations owned by a user
    pub async fn list_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all_by(pool, "owner_id", owner_id).await
    }

    /// Finds an organization by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_id(pool, id).await
    }

    /// Finds one of the owner's organizations by name
    pub async fn find_by_name(
        pool: &PgPool,
        owner_id: Uuid,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_name_in(pool, "owner_id", owner_id, name).await
    }

    /// Finds an organization by id, or by name among the owner's organizations
    pub async fn find_by_key(
        pool: &PgPool,
        owner_id: Uuid,
        key: &EntityKey,
    ) -> Result<Option<Self>, sqlx::Error> {
        match key {
            EntityKey::Id(id) => Self::find_by_id(pool, *id).await,
            EntityKey::Name(name) => Self::find_by_name(pool, owner_id, name).await,
        }
    }

    /// Persists changed columns
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: UpdateOrganization,
        actor: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::update(pool, id, actor, |org: &mut Self| {
            changes.apply_to(org);
            Ok(())
        })
        .await
    }

    /// Deletes an organization together with its RBAC graph
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        record::delete::<Organization>(pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_org(owner: Uuid) -> Organization {
        let now = Utc::now();
        Organization {
            id: Uuid::new_v4(),
            owner_id: owner,
            name: "acme".to_string(),
            description: None,
            is_active: true,
            is_logical_deleted: false,
            created_by_id: Some(owner),
            updated_by_id: Some(owner),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_ownership() {
        let owner = Uuid::new_v4();
        let org = sample_org(owner);
        assert!(org.is_owned_by(owner));
        assert!(!org.is_owned_by(Uuid::new_v4()));
    }

    #[test]
    fn test_identical_records_have_empty_diff() {
        let org = sample_org(Uuid::new_v4());
        assert!(org.clone().diff(&org).is_empty());
    }

    #[test]
    fn test_rename_and_describe() {
        let current = sample_org(Uuid::new_v4());
        let mut updated = current.clone();
        UpdateOrganization {
            name: Some("acme-labs".to_string()),
            description: Some(Some("Research arm".to_string())),
            ..Default::default()
        }
        .apply_to(&mut updated);

        let changes = updated.diff(&current);
        assert_eq!(changes.columns(), vec!["name", "description"]);
    }
}
