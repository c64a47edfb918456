/// Resource model
///
/// A resource is anything access is checked against: a door, a printer, an
/// API endpoint. It lives in one organization and can be addressed either
/// by id or by its short `tag`, which is unique inside the organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    changeset::{Changeset, Diff},
    record::{self, Record},
};

use super::key::{EntityKey, ResourceRef};

const COLUMNS: &str = "id, organization_id, owner_id, name, description, tag, \
    is_active, is_logical_deleted, created_by_id, updated_by_id, created_at, updated_at";

/// Protected resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Resource {
    pub id: Uuid,

    /// Owning organization
    pub organization_id: Uuid,

    /// User responsible for the resource
    pub owner_id: Option<Uuid>,

    /// Name, unique inside the organization
    pub name: String,

    pub description: Option<String>,

    /// Short lookup key, unique inside the organization
    pub tag: Option<String>,

    pub is_active: bool,
    pub is_logical_deleted: bool,
    pub created_by_id: Option<Uuid>,
    pub updated_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResource {
    pub organization_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub tag: Option<String>,
}

/// Partial resource update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateResource {
    /// Must match the target resource when present
    pub id: Option<Uuid>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub owner_id: Option<Option<Uuid>>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub tag: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl UpdateResource {
    /// Copies the present fields onto `resource`
    pub fn apply_to(self, resource: &mut Resource) {
        if let Some(owner_id) = self.owner_id {
            resource.owner_id = owner_id;
        }
        if let Some(name) = self.name {
            resource.name = name;
        }
        if let Some(description) = self.description {
            resource.description = description;
        }
        if let Some(tag) = self.tag {
            resource.tag = tag;
        }
        if let Some(active) = self.is_active {
            resource.is_active = active;
        }
    }
}

impl Diff for Resource {
    fn diff(&self, current: &Self) -> Changeset {
        let mut changes = Changeset::new();
        changes
            .field("owner_id", &current.owner_id, &self.owner_id)
            .field("name", &current.name, &self.name)
            .field("description", &current.description, &self.description)
            .field("tag", &current.tag, &self.tag)
            .field("is_active", &current.is_active, &self.is_active)
            .field("is_logical_deleted", &current.is_logical_deleted, &self.is_logical_deleted)
            .field("updated_by_id", &current.updated_by_id, &self.updated_by_id)
            .timestamp("updated_at", &Some(current.updated_at), &Some(self.updated_at));
        changes
    }
}

impl Record for Resource {
    const TABLE: &'static str = "resources";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, actor: Option<Uuid>) {
        self.updated_at = Utc::now();
        self.updated_by_id = actor;
    }
}

impl Resource {
    /// Creates a resource
    pub async fn create(
        pool: &PgPool,
        data: CreateResource,
        actor: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO resources (id, organization_id, owner_id, name, description, tag, \
             created_by_id, updated_by_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8, $8) RETURNING {}",
            COLUMNS
        );

        sqlx::query_as::<_, Resource>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.organization_id)
            .bind(data.owner_id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.tag)
            .bind(actor)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Lists the resources of an organization
    pub async fn list_by_organization(pool: &PgPool, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all_by(pool, "organization_id", org_id).await
    }

    /// Finds a resource by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_id(pool, id).await
    }

    /// Finds a resource by name inside an organization
    pub async fn find_by_name(
        pool: &PgPool,
        org_id: Uuid,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_name_in(pool, "organization_id", org_id, name).await
    }

    /// Finds a resource by id or name inside an organization
    pub async fn find_by_key(
        pool: &PgPool,
        org_id: Uuid,
        key: &EntityKey,
    ) -> Result<Option<Self>, sqlx::Error> {
        match key {
            EntityKey::Id(id) => Self::find_by_id(pool, *id).await,
            EntityKey::Name(name) => Self::find_by_name(pool, org_id, name).await,
        }
    }

    /// Finds a resource by tag
    ///
    /// Tags are unique per organization; across organizations the oldest
    /// match wins.
    pub async fn find_by_tag(pool: &PgPool, tag: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM resources WHERE tag = $1 ORDER BY created_at, id LIMIT 1",
            COLUMNS
        );

        sqlx::query_as::<_, Resource>(&sql)
            .bind(tag)
            .fetch_optional(pool)
            .await
    }

    /// Finds a resource by id or tag
    pub async fn find_by_ref(pool: &PgPool, reference: &ResourceRef) -> Result<Option<Self>, sqlx::Error> {
        match reference {
            ResourceRef::Id(id) => Self::find_by_id(pool, *id).await,
            ResourceRef::Tag(tag) => Self::find_by_tag(pool, tag).await,
        }
    }

    /// Persists changed columns
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: UpdateResource,
        actor: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::update(pool, id, actor, |resource: &mut Self| {
            changes.apply_to(resource);
            Ok(())
        })
        .await
    }

    /// Deletes a resource and the permissions attached to it
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        record::delete::<Resource>(pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_resource() -> Resource {
        let now = Utc::now();
        Resource {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            owner_id: None,
            name: "front door".to_string(),
            description: None,
            tag: Some("door-1".to_string()),
            is_active: true,
            is_logical_deleted: false,
            created_by_id: None,
            updated_by_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_retag() {
        let current = sample_resource();
        let mut updated = current.clone();
        UpdateResource {
            tag: Some(Some("door-2".to_string())),
            ..Default::default()
        }
        .apply_to(&mut updated);

        let changes = updated.diff(&current);
        assert_eq!(changes.columns(), vec!["tag"]);
    }

    #[test]
    fn test_absent_fields_keep_values() {
        let mut resource = sample_resource();
        UpdateResource::default().apply_to(&mut resource);
        assert_eq!(resource.tag.as_deref(), Some("door-1"));
        assert_eq!(resource.name, "front door");
    }

    #[test]
    fn test_null_clears_tag() {
        let current = sample_resource();
        let changes: UpdateResource =
            serde_json::from_value(serde_json::json!({ "tag": null, "description": null })).unwrap();
        assert_eq!(changes.tag, Some(None));

        let mut updated = current.clone();
        changes.apply_to(&mut updated);
        assert_eq!(updated.tag, None);
        assert_eq!(updated.diff(&current).columns(), vec!["tag"]);
    }
}
