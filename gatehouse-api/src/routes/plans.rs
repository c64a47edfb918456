/// Subscription plan endpoints
///
/// - `GET|POST /api/v1/plans`
/// - `GET|PUT|DELETE /api/v1/plans/:key` - by id or name
///
/// Deleting a plan that still has subscriptions answers `409`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{check_payload_id, parse_key},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use gatehouse_shared::{
    auth::middleware::AuthContext,
    models::plan::{CreatePlan, Plan, UpdatePlan, MAX_PERIOD_DAYS},
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[validate(range(min = 0, message = "Price must not be negative"))]
    pub price_cents: i64,

    #[validate(length(equal = 3, message = "Currency must be an ISO 4217 code"))]
    pub currency: Option<String>,

    #[validate(range(min = 1, max = 36500, message = "Period must be 1 to 36500 days"))]
    pub period_days: Option<i32>,
}

fn check_plan(plan: &Plan) -> ApiResult<()> {
    if plan.price_cents < 0 {
        return Err(ApiError::invalid_field("price_cents", "Price must not be negative"));
    }
    if !(1..=MAX_PERIOD_DAYS).contains(&plan.period_days) {
        return Err(ApiError::invalid_field("period_days", "Period must be 1 to 36500 days"));
    }
    if plan.currency.len() != 3 {
        return Err(ApiError::invalid_field("currency", "Currency must be an ISO 4217 code"));
    }
    Ok(())
}

async fn find_in(state: &AppState, raw: &str) -> ApiResult<Option<Plan>> {
    let key = parse_key(raw)?;
    Ok(Plan::find_by_key(&state.db, &key).await?)
}

async fn find_plan(state: &AppState, raw: &str) -> ApiResult<Plan> {
    find_in(state, raw)
        .await?
        .ok_or_else(|| ApiError::not_found("Plan", raw))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Plan>>> {
    Ok(Json(Plan::list(&state.db).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreatePlanRequest>,
) -> ApiResult<(StatusCode, Json<Plan>)> {
    req.validate()?;

    let plan = Plan::create(
        &state.db,
        CreatePlan {
            name: req.name,
            description: req.description,
            price_cents: req.price_cents,
            currency: req
                .currency
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_else(|| "USD".to_string()),
            period_days: req.period_days.unwrap_or(30),
        },
        Some(auth.user_id),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn get(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult<Json<Plan>> {
    Ok(Json(find_plan(&state, &key).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(key): Path<String>,
    Json(changes): Json<UpdatePlan>,
) -> ApiResult<Json<Plan>> {
    let plan = find_plan(&state, &key).await?;
    check_payload_id(changes.id, plan.id)?;

    let id = plan.id;
    let updated = Plan::update_checked(&state.db, id, changes, Some(auth.user_id), check_plan)
        .await?
        .ok_or_else(|| ApiError::not_found("Plan", id))?;

    Ok(Json(updated))
}

pub async fn delete(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult<StatusCode> {
    if let Some(plan) = find_in(&state, &key).await? {
        Plan::delete(&state.db, plan.id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
