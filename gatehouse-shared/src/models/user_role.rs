/// User-role assignment
///
/// Places a user in a role of an organization. The user does not need to
/// own or belong to the organization in any other way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    changeset::{Changeset, Diff},
    record::{self, Record},
};

use super::key::EntityKey;

const COLUMNS: &str = "id, organization_id, owner_id, user_id, role_id, name, description, \
    is_active, is_logical_deleted, created_by_id, updated_by_id, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRole {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub owner_id: Option<Uuid>,

    /// Assigned user
    pub user_id: Uuid,

    /// Assigned role
    pub role_id: Uuid,

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
pub struct CreateUserRole {
    pub organization_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRole {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub role_id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl UpdateUserRole {
    pub fn apply_to(self, assignment: &mut UserRole) {
        if let Some(user_id) = self.user_id {
            assignment.user_id = user_id;
        }
        if let Some(role_id) = self.role_id {
            assignment.role_id = role_id;
        }
        if let Some(name) = self.name {
            assignment.name = name;
        }
        if let Some(description) = self.description {
            assignment.description = description;
        }
        if let Some(active) = self.is_active {
            assignment.is_active = active;
        }
    }
}

impl Diff for UserRole {
    fn diff(&self, current: &Self) -> Changeset {
        let mut changes = Changeset::new();
        changes
            .field("owner_id", &current.owner_id, &self.owner_id)
            .field("user_id", &current.user_id, &self.user_id)
            .field("role_id", &current.role_id, &self.role_id)
            .field("name", &current.name, &self.name)
            .field("description", &current.description, &self.description)
            .field("is_active", &current.is_active, &self.is_active)
            .field("is_logical_deleted", &current.is_logical_deleted, &self.is_logical_deleted)
            .field("updated_by_id", &current.updated_by_id, &self.updated_by_id)
            .timestamp("updated_at", &Some(current.updated_at), &Some(self.updated_at));
        changes
    }
}

impl Record for UserRole {
    const TABLE: &'static str = "user_roles";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, actor: Option<Uuid>) {
        self.updated_at = Utc::now();
        self.updated_by_id = actor;
    }
}

impl UserRole {
    /// Assigns a role to a user
    pub async fn create(
        pool: &PgPool,
        data: CreateUserRole,
        actor: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO user_roles (id, organization_id, owner_id, user_id, role_id, \
             name, description, created_by_id, updated_by_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $9, $9) RETURNING {}",
            COLUMNS
        );

        sqlx::query_as::<_, UserRole>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.organization_id)
            .bind(data.owner_id)
            .bind(data.user_id)
            .bind(data.role_id)
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

    /// Lists every role assignment of a user, across organizations
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all_by(pool, "user_id", user_id).await
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
        changes: UpdateUserRole,
        actor: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::update(pool, id, actor, |assignment: &mut Self| {
            changes.apply_to(assignment);
            Ok(())
        })
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        record::delete::<UserRole>(pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_user_to_other_role() {
        let now = Utc::now();
        let current = UserRole {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            owner_id: None,
            user_id: Uuid::new_v4(),
            role_id: Uuid::new_v4(),
            name: "ada-admin".to_string(),
            description: None,
            is_active: true,
            is_logical_deleted: false,
            created_by_id: None,
            updated_by_id: None,
            created_at: now,
            updated_at: now,
        };
        let mut updated = current.clone();
        UpdateUserRole {
            role_id: Some(Uuid::new_v4()),
            name: Some("ada-viewer".to_string()),
            ..Default::default()
        }
        .apply_to(&mut updated);

        assert_eq!(updated.diff(&current).columns(), vec!["role_id", "name"]);
    }
}
