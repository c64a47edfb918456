/// Permission check endpoint
///
/// ```text
/// GET /api/v1/authorize?resource=<id-or-tag>&user=<uuid>
/// ```
///
/// ```json
/// { "resource": { "tag": "front-door" }, "user_id": "…", "allowed": true }
/// ```
///
/// `user` defaults to the caller. An unknown resource or user is simply not
/// allowed; the answer is always `200`.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use gatehouse_shared::{
    auth::{authorization::has_permission, middleware::AuthContext},
    models::key::ResourceRef,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    /// Resource id or tag
    pub resource: String,

    pub user: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub resource: ResourceRef,
    pub user_id: Uuid,
    pub allowed: bool,
}

pub async fn authorize(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AuthorizeQuery>,
) -> ApiResult<Json<AuthorizeResponse>> {
    let resource = ResourceRef::parse(&query.resource)?;
    let user_id = query.user.unwrap_or(auth.user_id);

    let allowed = has_permission(&state.db, &resource, user_id).await?;

    Ok(Json(AuthorizeResponse {
        resource,
        user_id,
        allowed,
    }))
}
