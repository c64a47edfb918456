/// Plan subscription endpoints
///
/// - `GET  /api/v1/users/:key/subscriptions` - list a user's subscriptions
/// - `POST /api/v1/users/:key/subscriptions` - subscribe the caller to a plan
/// - `GET|PUT|DELETE /api/v1/subscriptions/:id`
///
/// Only the subscribed user may change a subscription.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{check_payload_id, parse_key, users::find_user},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use gatehouse_shared::{
    auth::{authorization::require_ownership, middleware::AuthContext},
    models::{
        plan::Plan,
        plan_subscription::{CreatePlanSubscription, PlanSubscription, UpdatePlanSubscription},
    },
};
use serde::Deserialize;
use uuid::Uuid;

/// New subscription
///
/// `name` defaults to the plan name, `starts_at` to now and `ends_at` to one
/// plan period after the start.
#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Plan id or name
    pub plan: String,

    pub name: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

fn ensure_valid_period(sub: &PlanSubscription) -> ApiResult<()> {
    if !sub.has_valid_period() {
        return Err(ApiError::invalid_field("ends_at", "End must be after start"));
    }
    Ok(())
}

async fn find_subscription(state: &AppState, id: Uuid) -> ApiResult<PlanSubscription> {
    PlanSubscription::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Subscription", id))
}

pub async fn list(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Vec<PlanSubscription>>> {
    let user = find_user(&state, &key).await?;
    Ok(Json(PlanSubscription::list_by_user(&state.db, user.id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(key): Path<String>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> ApiResult<(StatusCode, Json<PlanSubscription>)> {
    let user = find_user(&state, &key).await?;
    require_ownership(&auth, user.id)?;

    let plan_key = parse_key(&req.plan)?;
    let plan = Plan::find_by_key(&state.db, &plan_key)
        .await?
        .ok_or_else(|| ApiError::not_found("Plan", &plan_key))?;

    let starts_at = req.starts_at.unwrap_or_else(Utc::now);
    let ends_at = match req.ends_at {
        Some(end) => end,
        None => plan.period_end(starts_at).ok_or_else(|| {
            ApiError::invalid_field("starts_at", "Start is too late for one plan period")
        })?,
    };
    if ends_at <= starts_at {
        return Err(ApiError::invalid_field("ends_at", "End must be after start"));
    }

    let sub = PlanSubscription::create(
        &state.db,
        CreatePlanSubscription {
            user_id: user.id,
            plan_id: plan.id,
            name: req.name.unwrap_or_else(|| plan.name.clone()),
            description: req.description,
            starts_at,
            ends_at: Some(ends_at),
        },
        Some(auth.user_id),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(sub)))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PlanSubscription>> {
    Ok(Json(find_subscription(&state, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(changes): Json<UpdatePlanSubscription>,
) -> ApiResult<Json<PlanSubscription>> {
    let sub = find_subscription(&state, id).await?;
    require_ownership(&auth, sub.user_id)?;
    check_payload_id(changes.id, sub.id)?;

    let updated =
        PlanSubscription::update_checked(&state.db, id, changes, Some(auth.user_id), ensure_valid_period)
            .await?
        .ok_or_else(|| ApiError::not_found("Subscription", id))?;

    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if let Some(sub) = PlanSubscription::find_by_id(&state.db, id).await? {
        require_ownership(&auth, sub.user_id)?;
        PlanSubscription::delete(&state.db, sub.id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
