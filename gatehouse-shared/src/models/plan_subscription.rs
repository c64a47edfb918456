/// Plan subscriptions
///
/// One row per subscription period of a user to a plan. `ends_at` is open
/// when the subscription has no fixed end; the database rejects an end that
/// is not after the start.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    changeset::{Changeset, Diff},
    record::{self, Record},
};

const COLUMNS: &str = "id, user_id, plan_id, name, description, starts_at, ends_at, \
    is_active, is_logical_deleted, created_by_id, updated_by_id, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlanSubscription {
    pub id: Uuid,

    /// Subscribed user
    pub user_id: Uuid,

    /// Subscribed plan
    pub plan_id: Uuid,

    /// Name, unique per user
    pub name: String,

    pub description: Option<String>,

    /// Start of the period
    pub starts_at: DateTime<Utc>,

    /// End of the period, exclusive; `None` is open-ended
    pub ends_at: Option<DateTime<Utc>>,

    pub is_active: bool,
    pub is_logical_deleted: bool,
    pub created_by_id: Option<Uuid>,
    pub updated_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlanSubscription {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlanSubscription {
    pub id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub ends_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

impl UpdatePlanSubscription {
    pub fn apply_to(self, sub: &mut PlanSubscription) {
        if let Some(plan_id) = self.plan_id {
            sub.plan_id = plan_id;
        }
        if let Some(name) = self.name {
            sub.name = name;
        }
        if let Some(description) = self.description {
            sub.description = description;
        }
        if let Some(starts_at) = self.starts_at {
            sub.starts_at = starts_at;
        }
        if let Some(ends_at) = self.ends_at {
            sub.ends_at = ends_at;
        }
        if let Some(active) = self.is_active {
            sub.is_active = active;
        }
    }
}

impl PlanSubscription {
    /// Whether the subscription covers `now`
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.starts_at <= now && self.ends_at.map_or(true, |end| now < end)
    }

    /// Whether the period bounds are consistent
    pub fn has_valid_period(&self) -> bool {
        self.ends_at.map_or(true, |end| end > self.starts_at)
    }
}

impl Diff for PlanSubscription {
    fn diff(&self, current: &Self) -> Changeset {
        let mut changes = Changeset::new();
        changes
            .field("plan_id", &current.plan_id, &self.plan_id)
            .field("name", &current.name, &self.name)
            .field("description", &current.description, &self.description)
            .timestamp("starts_at", &Some(current.starts_at), &Some(self.starts_at))
            .timestamp("ends_at", &current.ends_at, &self.ends_at)
            .field("is_active", &current.is_active, &self.is_active)
            .field("is_logical_deleted", &current.is_logical_deleted, &self.is_logical_deleted)
            .field("updated_by_id", &current.updated_by_id, &self.updated_by_id)
            .timestamp("updated_at", &Some(current.updated_at), &Some(self.updated_at));
        changes
    }
}

impl Record for PlanSubscription {
    const TABLE: &'static str = "plan_subscriptions";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, actor: Option<Uuid>) {
        self.updated_at = Utc::now();
        self.updated_by_id = actor;
    }
}

impl PlanSubscription {
    pub async fn create(
        pool: &PgPool,
        data: CreatePlanSubscription,
        actor: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO plan_subscriptions (id, user_id, plan_id, name, description, starts_at, ends_at, \
             created_by_id, updated_by_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $9, $9) RETURNING {}",
            COLUMNS
        );

        sqlx::query_as::<_, PlanSubscription>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.user_id)
            .bind(data.plan_id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.starts_at)
            .bind(data.ends_at)
            .bind(actor)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Lists the subscriptions of a user, oldest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all_by(pool, "user_id", user_id).await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_id(pool, id).await
    }

    pub async fn find_by_name(
        pool: &PgPool,
        user_id: Uuid,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_name_in(pool, "user_id", user_id, name).await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: UpdatePlanSubscription,
        actor: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        Self::update_checked(pool, id, changes, actor, |_| Ok(())).await
    }

    /// Like [`Self::update`], but `check` sees the patched row before it is
    /// written; an error aborts the update
    ///
    /// Lets callers validate the merged period under the row lock.
    pub async fn update_checked<E, F>(
        pool: &PgPool,
        id: Uuid,
        changes: UpdatePlanSubscription,
        actor: Option<Uuid>,
        check: F,
    ) -> Result<Option<Self>, E>
    where
        E: From<sqlx::Error>,
        F: FnOnce(&Self) -> Result<(), E>,
    {
        record::update(pool, id, actor, |sub: &mut Self| {
            changes.apply_to(sub);
            check(sub)
        })
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        record::delete::<PlanSubscription>(pool, id).await
    }
}
