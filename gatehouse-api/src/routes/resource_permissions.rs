/// Resource-permission endpoints: attach permissions to resources
///
/// - `GET|POST /api/v1/organizations/:org/resource-permissions`
/// - `GET|PUT|DELETE /api/v1/organizations/:org/resource-permissions/:key`
///
/// Both sides must belong to the organization in the path.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{
        check_payload_id, check_same_organization, owned_organization, parse_key,
        permissions::find_permission, resources::find_resource,
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
        resource::Resource,
        resource_permission::{CreateResourcePermission, ResourcePermission, UpdateResourcePermission},
    },
};
use serde::Deserialize;
use uuid::Uuid;

/// New grant; `resource` and `permission` accept an id or a name
#[derive(Debug, Deserialize)]
pub struct CreateResourcePermissionRequest {
    pub resource: String,
    pub permission: String,

    /// Defaults to `<resource>:<permission>`
    pub name: Option<String>,

    pub description: Option<String>,
}

async fn find_in(
    state: &AppState,
    org: &Organization,
    raw: &str,
) -> ApiResult<Option<ResourcePermission>> {
    let key = parse_key(raw)?;
    let found = ResourcePermission::find_by_key(&state.db, org.id, &key).await?;

    Ok(found.filter(|grant| grant.organization_id == org.id))
}

async fn find_grant(state: &AppState, org: &Organization, raw: &str) -> ApiResult<ResourcePermission> {
    find_in(state, org, raw)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource permission", raw))
}

async fn check_references(
    state: &AppState,
    org: &Organization,
    resource_id: Option<Uuid>,
    permission_id: Option<Uuid>,
) -> ApiResult<()> {
    if let Some(id) = resource_id {
        let resource = Resource::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Resource", id))?;
        check_same_organization("Resource", resource.organization_id, org)?;
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
) -> ApiResult<Json<Vec<ResourcePermission>>> {
    let org = owned_organization(&state, &auth, &org).await?;
    Ok(Json(ResourcePermission::list_by_organization(&state.db, org.id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
    Json(req): Json<CreateResourcePermissionRequest>,
) -> ApiResult<(StatusCode, Json<ResourcePermission>)> {
    let org = owned_organization(&state, &auth, &org).await?;
    let resource = find_resource(&state, &org, &req.resource).await?;
    let permission = find_permission(&state, &org, &req.permission).await?;

    let grant = ResourcePermission::create(
        &state.db,
        CreateResourcePermission {
            organization_id: org.id,
            owner_id: Some(auth.user_id),
            resource_id: resource.id,
            permission_id: permission.id,
            name: req
                .name
                .unwrap_or_else(|| format!("{}:{}", resource.name, permission.name)),
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
) -> ApiResult<Json<ResourcePermission>> {
    let org = owned_organization(&state, &auth, &org).await?;
    Ok(Json(find_grant(&state, &org, &key).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
    Json(changes): Json<UpdateResourcePermission>,
) -> ApiResult<Json<ResourcePermission>> {
    let org = owned_organization(&state, &auth, &org).await?;
    let grant = find_grant(&state, &org, &key).await?;
    check_payload_id(changes.id, grant.id)?;
    check_references(&state, &org, changes.resource_id, changes.permission_id).await?;

    let id = grant.id;
    let updated = ResourcePermission::update(&state.db, id, changes, Some(auth.user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Resource permission", id))?;

    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let org = owned_organization(&state, &auth, &org).await?;

    if let Some(grant) = find_in(&state, &org, &key).await? {
        ResourcePermission::delete(&state.db, grant.id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
