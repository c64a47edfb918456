/// Subscription plans
///
/// Plans are global (not organization-scoped) and named uniquely. Prices are
/// integer minor units to avoid floating point money.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    changeset::{Changeset, Diff},
    record::{self, Record},
};

use super::key::EntityKey;

const COLUMNS: &str = "id, name, description, price_cents, currency, period_days, \
    is_active, is_logical_deleted, created_by_id, updated_by_id, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Plan {
    pub id: Uuid,

    /// Name, unique across all plans
    pub name: String,

    pub description: Option<String>,

    /// Price per period in minor units
    pub price_cents: i64,

    /// ISO 4217 currency code
    pub currency: String,

    /// Length of one billing period
    pub period_days: i32,

    pub is_active: bool,
    pub is_logical_deleted: bool,
    pub created_by_id: Option<Uuid>,
    pub updated_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlan {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub period_days: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlan {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub period_days: Option<i32>,
    pub is_active: Option<bool>,
}

impl UpdatePlan {
    pub fn apply_to(self, plan: &mut Plan) {
        if let Some(name) = self.name {
            plan.name = name;
        }
        if let Some(description) = self.description {
            plan.description = description;
        }
        if let Some(price) = self.price_cents {
            plan.price_cents = price;
        }
        if let Some(currency) = self.currency {
            plan.currency = currency;
        }
        if let Some(days) = self.period_days {
            plan.period_days = days;
        }
        if let Some(active) = self.is_active {
            plan.is_active = active;
        }
    }
}

/// Longest accepted billing period, one hundred years
pub const MAX_PERIOD_DAYS: i32 = 36_500;

impl Plan {
    /// Length of one billing period
    pub fn period(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.period_days))
    }

    /// End of the period starting at `start`, `None` past the representable range
    pub fn period_end(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        start.checked_add_signed(self.period())
    }
}

impl Diff for Plan {
    fn diff(&self, current: &Self) -> Changeset {
        let mut changes = Changeset::new();
        changes
            .field("name", &current.name, &self.name)
            .field("description", &current.description, &self.description)
            .field("price_cents", &current.price_cents, &self.price_cents)
            .field("currency", &current.currency, &self.currency)
            .field("period_days", &current.period_days, &self.period_days)
            .field("is_active", &current.is_active, &self.is_active)
            .field("is_logical_deleted", &current.is_logical_deleted, &self.is_logical_deleted)
            .field("updated_by_id", &current.updated_by_id, &self.updated_by_id)
            .timestamp("updated_at", &Some(current.updated_at), &Some(self.updated_at));
        changes
    }
}

impl Record for Plan {
    const TABLE: &'static str = "plans";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, actor: Option<Uuid>) {
        self.updated_at = Utc::now();
        self.updated_by_id = actor;
    }
}

impl Plan {
    pub async fn create(
        pool: &PgPool,
        data: CreatePlan,
        actor: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO plans (id, name, description, price_cents, currency, period_days, \
             created_by_id, updated_by_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8, $8) RETURNING {}",
            COLUMNS
        );

        sqlx::query_as::<_, Plan>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.name)
            .bind(data.description)
            .bind(data.price_cents)
            .bind(data.currency)
            .bind(data.period_days)
            .bind(actor)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_id(pool, id).await
    }

    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM plans WHERE name = $1", COLUMNS);

        sqlx::query_as::<_, Plan>(&sql)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_key(pool: &PgPool, key: &EntityKey) -> Result<Option<Self>, sqlx::Error> {
        match key {
            EntityKey::Id(id) => Self::find_by_id(pool, *id).await,
            EntityKey::Name(name) => Self::find_by_name(pool, name).await,
        }
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: UpdatePlan,
        actor: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        Self::update_checked(pool, id, changes, actor, |_| Ok(())).await
    }

    /// Like [`Self::update`], but `check` sees the patched row before it is
    /// written; an error aborts the update
    ///
    /// Lets callers validate the merged price, currency and period under the row lock.
    pub async fn update_checked<E, F>(
        pool: &PgPool,
        id: Uuid,
        changes: UpdatePlan,
        actor: Option<Uuid>,
        check: F,
    ) -> Result<Option<Self>, E>
    where
        E: From<sqlx::Error>,
        F: FnOnce(&Self) -> Result<(), E>,
    {
        record::update(pool, id, actor, |plan: &mut Self| {
            changes.apply_to(plan);
            check(plan)
        })
        .await
    }

    /// Deletes a plan
    ///
    /// Fails with a foreign key violation while subscriptions reference it.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        record::delete::<Plan>(pool, id).await
    }
}
