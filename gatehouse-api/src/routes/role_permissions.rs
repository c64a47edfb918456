/// Role-permission endpoints: grant permissions to roles
///
/// - `GET|POST /api/v1/organizations/:org/role-permissions`
/// - `GET|PUT|DELETE /api/v1/organizations/:org/role-permissions/:key`
///
/// Both sides must belong to the organization in the path.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{
        check_payload_id, check_same_organization, owned_organization, parse_key,
        permissions::find_permission, roles::find_role,
    },
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
        permission::Permission,
        role::Role,
        role_permission::{CreateRolePermission, RolePermission, UpdateRolePermission},
    },
};
use serde::Deserialize;
use uuid::Uuid;

/// New grant; `role` and `permission` accept an id or a name
#[derive(Debug, Deserialize)]
pub struct CreateRolePermissionRequest {
    pub role: String,
    pub permission: String,

    /// Defaults to `<role>:<permission>`
    pub name: Option<String>,

    pub description: Option<String>,
}

async fn find_in(
    state: &AppState,
    org: &Organization,
    raw: &str,
) -> ApiResult<Option<RolePermission>> {
    let key = parse_key(raw)?;
    let found = RolePermission::find_by_key(&state.db, org.id, &key).await?;

    Ok(found.filter(|grant| grant.organization_id == org.id))
}

async fn find_grant(state: &AppState, org: &Organization, raw: &str) -> ApiResult<RolePermission> {
    find_in(state, org, raw)
        .await?
        .ok_or_else(|| ApiError::not_found("Role permission", raw))
}

async fn check_references(
    state: &AppState,
    org: &Organization,
    role_id: Option<Uuid>,
    permission_id: Option<Uuid>,
) -> ApiResult<()> {
    if let Some(id) = role_id {
        let role = Role::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Role", id))?;
        check_same_organization("Role", role.organization_id, org)?;
    }

    if let Some(id) = permission_id {
        let permission = Permission::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Permission", id))?;
        check_same_organization("Permission", permission.organization_id, org)?;
    }

    Ok(())
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
) -> ApiResult<Json<Vec<RolePermission>>> {
    let org = owned_organization(&state, &auth, &org).await?;
    Ok(Json(RolePermission::list_by_organization(&state.db, org.id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
    Json(req): Json<CreateRolePermissionRequest>,
) -> ApiResult<(StatusCode, Json<RolePermission>)> {
    let org = owned_organization(&state, &auth, &org).await?;
    let role = find_role(&state, &org, &req.role).await?;
    let permission = find_permission(&state, &org, &req.permission).await?;

    let grant = RolePermission::create(
        &state.db,
        CreateRolePermission {
            organization_id: org.id,
            owner_id: Some(auth.user_id),
            role_id: role.id,
            permission_id: permission.id,
            name: req
                .name
                .unwrap_or_else(|| format!("{}:{}", role.name, permission.name)),
            description: req.description,
        },
        Some(auth.user_id),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(grant)))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
) -> ApiResult<Json<RolePermission>> {
    let org = owned_organization(&state, &auth, &org).await?;
    Ok(Json(find_grant(&state, &org, &key).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
    Json(changes): Json<UpdateRolePermission>,
) -> ApiResult<Json<RolePermission>> {
    let org = owned_organization(&state, &auth, &org).await?;
    let grant = find_grant(&state, &org, &key).await?;
    check_payload_id(changes.id, grant.id)?;
    check_references(&state, &org, changes.role_id, changes.permission_id).await?;

    let id = grant.id;
    let updated = RolePermission::update(&state.db, id, changes, Some(auth.user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Role permission", id))?;

    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let org = owned_organization(&state, &auth, &org).await?;

    if let Some(grant) = find_in(&state, &org, &key).await? {
        RolePermission::delete(&state.db, grant.id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
