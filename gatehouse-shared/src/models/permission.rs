/// Permission model
///
/// A permission names an action (`open`, `print`, `billing:read`). It gains
/// meaning through two grants: `resource_permissions` attaches it to a
/// resource, and `role_permissions` hands it to a role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    changeset::{Changeset, Diff},
    record::{self, Record},
};

use super::key::EntityKey;

const COLUMNS: &str = "id, organization_id, owner_id, name, description, \
    is_active, is_logical_deleted, created_by_id, updated_by_id, created_at, updated_at";

/// Grantable action inside an organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub owner_id: Option<Uuid>,

    /// Name, unique inside the organization
    pub name: String,

    pub description: Option<String>,
    pub is_active: bool,
    pub is_logical_deleted: bool,
    pub created_by_id: Option<Uuid>,
    pub updated_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a permission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub organization_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
}

/// Partial permission update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePermission {
    pub id: Option<Uuid>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub owner_id: Option<Option<Uuid>>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl UpdatePermission {
    /// Copies the present fields onto `permission`
    pub fn apply_to(self, permission: &mut Permission) {
        if let Some(owner_id) = self.owner_id {
            permission.owner_id = owner_id;
        }
        if let Some(name) = self.name {
            permission.name = name;
        }
        if let Some(description) = self.description {
            permission.description = description;
        }
        if let Some(active) = self.is_active {
            permission.is_active = active;
        }
    }
}

impl Diff for Permission {
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

impl Record for Permission {
    const TABLE: &'static str = "permissions";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, actor: Option<Uuid>) {
        self.updated_at = Utc::now();
        self.updated_by_id = actor;
    }
}

impl Permission {
    /// Creates a permission
    pub async fn create(
        pool: &PgPool,
        data: CreatePermission,
        actor: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO permissions (id, organization_id, owner_id, name, description, \
             created_by_id, updated_by_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $7) RETURNING {}",
            COLUMNS
        );

        sqlx::query_as::<_, Permission>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.organization_id)
            .bind(data.owner_id)
            .bind(data.name)
            .bind(data.description)
            .bind(actor)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Lists the permissions of an organization
    pub async fn list_by_organization(pool: &PgPool, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all_by(pool, "organization_id", org_id).await
    }

    /// Fetches several permissions at once, in creation order
    pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM permissions WHERE id = ANY($1) ORDER BY created_at, id",
            COLUMNS
        );

        sqlx::query_as::<_, Permission>(&sql)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_id(pool, id).await
    }

    pub async fn find_by_name(
        pool: &PgPool,
        org_id: Uuid,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_name_in(pool, "organization_id", org_id, name).await
    }

    /// Finds a permission by id or name inside an organization
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

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: UpdatePermission,
        actor: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::update(pool, id, actor, |permission: &mut Self| {
            changes.apply_to(permission);
            Ok(())
        })
        .await
    }

    /// Deletes a permission; its grants cascade
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        record::delete::<Permission>(pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deactivate() {
        let now = Utc::now();
        let current = Permission {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            owner_id: None,
            name: "open".to_string(),
            description: None,
            is_active: true,
            is_logical_deleted: false,
            created_by_id: None,
            updated_by_id: None,
            created_at: now,
            updated_at: now,
        };
        let mut updated = current.clone();
        UpdatePermission {
            is_active: Some(false),
            ..Default::default()
        }
        .apply_to(&mut updated);

        assert_eq!(updated.diff(&current).columns(), vec!["is_active"]);
    }
}
