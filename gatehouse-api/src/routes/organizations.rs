/// Organization endpoints
///
/// - `GET    /api/v1/organizations` - the caller's organizations
/// - `POST   /api/v1/organizations` - create one owned by the caller
/// - `GET|PUT|DELETE /api/v1/organizations/:org` - by id or name
///
/// Names resolve among the caller's own organizations. Deleting an
/// organization removes its whole RBAC graph.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{check_payload_id, owned_organization, parse_key},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use gatehouse_shared::{
    auth::{authorization::require_ownership, middleware::AuthContext},
    models::organization::{CreateOrganization, Organization, UpdateOrganization},
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,

    pub description: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Organization>>> {
    Ok(Json(Organization::list_by_owner(&state.db, auth.user_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateOrganizationRequest>,
) -> ApiResult<(StatusCode, Json<Organization>)> {
    req.validate()?;

    let org = Organization::create(
        &state.db,
        CreateOrganization {
            owner_id: auth.user_id,
            name: req.name,
            description: req.description,
        },
        Some(auth.user_id),
    )
    .await?;

    info!(org_id = %org.id, owner_id = %org.owner_id, "Organization created");
    Ok((StatusCode::CREATED, Json(org)))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
) -> ApiResult<Json<Organization>> {
    Ok(Json(owned_organization(&state, &auth, &org).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
    Json(changes): Json<UpdateOrganization>,
) -> ApiResult<Json<Organization>> {
    let org = owned_organization(&state, &auth, &org).await?;
    check_payload_id(changes.id, org.id)?;

    let id = org.id;
    let updated = Organization::update(&state.db, id, changes, Some(auth.user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Organization", id))?;

    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
) -> ApiResult<StatusCode> {
    let key = parse_key(&org)?;

    if let Some(org) = Organization::find_by_key(&state.db, auth.user_id, &key).await? {
        require_ownership(&auth, org.owner_id)?;
        Organization::delete(&state.db, org.id).await?;
        info!(org_id = %org.id, "Organization deleted");
    }

    Ok(StatusCode::NO_CONTENT)
}
