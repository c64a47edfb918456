/// Role-permission grant
///
/// Hands a permission to a role. Every holder of the role holds the
/// permission on every resource the permission is attached to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    changeset::{Changeset, Diff},
    record::{self, Record},
};

use super::key::EntityKey;

const COLUMNS: &str = "id, organization_id, owner_id, role_id, permission_id, name, description, \
    is_active, is_logical_deleted, created_by_id, updated_by_id, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RolePermission {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub role_id: Uuid,
    pub permission_id: Uuid,
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
pub struct CreateRolePermission {
    pub organization_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub role_id: Uuid,
    pub permission_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRolePermission {
    pub id: Option<Uuid>,
    pub role_id: Option<Uuid>,
    pub permission_id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl UpdateRolePermission {
    pub fn apply_to(self, grant: &mut RolePermission) {
        if let Some(role_id) = self.role_id {
            grant.role_id = role_id;
        }
        if let Some(permission_id) = self.permission_id {
            grant.permission_id = permission_id;
        }
        if let Some(name) = self.name {
            grant.name = name;
        }
        if let Some(description) = self.description {
            grant.description = description;
        }
        if let Some(active) = self.is_active {
            grant.is_active = active;
        }
    }
}

impl Diff for RolePermission {
    fn diff(&self, current: &Self) -> Changeset {
        let mut changes = Changeset::new();
        changes
            .field("owner_id", &current.owner_id, &self.owner_id)
            .field("role_id", &current.role_id, &self.role_id)
            .field("permission_id", &current.permission_id, &self.permission_id)
            .field("name", &current.name, &self.name)
            .field("description", &current.description, &self.description)
            .field("is_active", &current.is_active, &self.is_active)
            .field("is_logical_deleted", &current.is_logical_deleted, &self.is_logical_deleted)
            .field("updated_by_id", &current.updated_by_id, &self.updated_by_id)
            .timestamp("updated_at", &Some(current.updated_at), &Some(self.updated_at));
        changes
    }
}

impl Record for RolePermission {
    const TABLE: &'static str = "role_permissions";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, actor: Option<Uuid>) {
        self.updated_at = Utc::now();
        self.updated_by_id = actor;
    }
}

impl RolePermission {
    /// Grants a permission to a role
    pub async fn create(
        pool: &PgPool,
        data: CreateRolePermission,
        actor: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO role_permissions (id, organization_id, owner_id, role_id, permission_id, \
             name, description, created_by_id, updated_by_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $9, $9) RETURNING {}",
            COLUMNS
        );

        sqlx::query_as::<_, RolePermission>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.organization_id)
            .bind(data.owner_id)
            .bind(data.role_id)
            .bind(data.permission_id)
            .bind(data.name)
            .bind(data.description)
            .bind(actor)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    pub async fn list_by_organization(pool: &PgPool, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all_by(pool, "organization_id", org_id).await
    }

    /// Lists the permissions granted to one role
    pub async fn list_by_role(pool: &PgPool, role_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all_by(pool, "role_id", role_id).await
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
        changes: UpdateRolePermission,
        actor: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::update(pool, id, actor, |grant: &mut Self| {
            changes.apply_to(grant);
            Ok(())
        })
        .await
    }

    /// Revokes the grant
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        record::delete::<RolePermission>(pool, id).await
    }
}
