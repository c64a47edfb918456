/// Permission endpoints, scoped to one of the caller's organizations
///
/// - `GET|POST /api/v1/organizations/:org/permissions`
/// - `GET|PUT|DELETE /api/v1/organizations/:org/permissions/:key`

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
    auth::middleware::AuthContext,
    models::{
        organization::Organization,
        permission::{CreatePermission, Permission, UpdatePermission},
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Body for creating a permission or a role
#[derive(Debug, Deserialize, Validate)]
pub struct CreateNamedRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,

    pub description: Option<String>,

    /// Defaults to the caller
    pub owner_id: Option<Uuid>,
}

pub(crate) async fn find_in(
    state: &AppState,
    org: &Organization,
    raw: &str,
) -> ApiResult<Option<Permission>> {
    let key = parse_key(raw)?;
    let found = Permission::find_by_key(&state.db, org.id, &key).await?;

    Ok(found.filter(|permission| permission.organization_id == org.id))
}

pub(crate) async fn find_permission(
    state: &AppState,
    org: &Organization,
    raw: &str,
) -> ApiResult<Permission> {
    find_in(state, org, raw)
        .await?
        .ok_or_else(|| ApiError::not_found("Permission", raw))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
) -> ApiResult<Json<Vec<Permission>>> {
    let org = owned_organization(&state, &auth, &org).await?;
    Ok(Json(Permission::list_by_organization(&state.db, org.id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
    Json(req): Json<CreateNamedRequest>,
) -> ApiResult<(StatusCode, Json<Permission>)> {
    req.validate()?;
    let org = owned_organization(&state, &auth, &org).await?;

    let permission = Permission::create(
        &state.db,
        CreatePermission {
            organization_id: org.id,
            owner_id: req.owner_id.or(Some(auth.user_id)),
            name: req.name,
            description: req.description,
        },
        Some(auth.user_id),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(permission)))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
) -> ApiResult<Json<Permission>> {
    let org = owned_organization(&state, &auth, &org).await?;
    Ok(Json(find_permission(&state, &org, &key).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
    Json(changes): Json<UpdatePermission>,
) -> ApiResult<Json<Permission>> {
    let org = owned_organization(&state, &auth, &org).await?;
    let permission = find_permission(&state, &org, &key).await?;
    check_payload_id(changes.id, permission.id)?;

    let id = permission.id;
    let updated = Permission::update(&state.db, id, changes, Some(auth.user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Permission", id))?;

    Ok(Json(updated))
}

/// Deletes the permission and every grant that references it
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let org = owned_organization(&state, &auth, &org).await?;

    if let Some(permission) = find_in(&state, &org, &key).await? {
        Permission::delete(&state.db, permission.id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
