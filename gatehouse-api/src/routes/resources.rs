/// Resource endpoints, scoped to one of the caller's organizations
///
/// - `GET|POST /api/v1/organizations/:org/resources`
/// - `GET|PUT|DELETE /api/v1/organizations/:org/resources/:key`
/// - `GET /api/v1/organizations/:org/resources/:key/permissions`
///
/// `:key` is the resource id or name.

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
    auth::{authorization::enabling_permission_ids, middleware::AuthContext},
    models::{
        key::ResourceRef,
        organization::Organization,
        permission::Permission,
        resource::{CreateResource, Resource, UpdateResource},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateResourceRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[validate(length(min = 1, max = 64, message = "Tag must be 1 to 64 characters"))]
    pub tag: Option<String>,

    /// Defaults to the caller
    pub owner_id: Option<Uuid>,
}

/// Permissions that grant access to a resource
#[derive(Debug, Serialize, Deserialize)]
pub struct EnablingPermissionsResponse {
    pub resource_id: Uuid,
    pub permission_ids: Vec<Uuid>,
    pub permissions: Vec<Permission>,
}

/// Rejects tags that lookups could never match
///
/// References are trimmed before they are resolved, and one that parses as
/// a UUID is taken for an id.
fn check_tag(tag: Option<&str>) -> ApiResult<()> {
    let Some(tag) = tag else {
        return Ok(());
    };
    if tag.trim() != tag {
        return Err(ApiError::invalid_field(
            "tag",
            "Tag must not start or end with whitespace",
        ));
    }

    match ResourceRef::parse(tag)? {
        ResourceRef::Id(_) => Err(ApiError::invalid_field("tag", "Tag must not be a UUID")),
        ResourceRef::Tag(_) => Ok(()),
    }
}

pub(crate) async fn find_in(
    state: &AppState,
    org: &Organization,
    raw: &str,
) -> ApiResult<Option<Resource>> {
    let key = parse_key(raw)?;
    let found = Resource::find_by_key(&state.db, org.id, &key).await?;

    Ok(found.filter(|resource| resource.organization_id == org.id))
}

pub(crate) async fn find_resource(state: &AppState, org: &Organization, raw: &str) -> ApiResult<Resource> {
    find_in(state, org, raw)
        .await?
        .ok_or_else(|| ApiError::not_found("Resource", raw))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
) -> ApiResult<Json<Vec<Resource>>> {
    let org = owned_organization(&state, &auth, &org).await?;
    Ok(Json(Resource::list_by_organization(&state.db, org.id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
    Json(req): Json<CreateResourceRequest>,
) -> ApiResult<(StatusCode, Json<Resource>)> {
    req.validate()?;
    let org = owned_organization(&state, &auth, &org).await?;

    check_tag(req.tag.as_deref())?;

    let resource = Resource::create(
        &state.db,
        CreateResource {
            organization_id: org.id,
            owner_id: req.owner_id.or(Some(auth.user_id)),
            name: req.name,
            description: req.description,
            tag: req.tag,
        },
        Some(auth.user_id),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(resource)))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
) -> ApiResult<Json<Resource>> {
    let org = owned_organization(&state, &auth, &org).await?;
    Ok(Json(find_resource(&state, &org, &key).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
    Json(changes): Json<UpdateResource>,
) -> ApiResult<Json<Resource>> {
    let org = owned_organization(&state, &auth, &org).await?;
    let resource = find_resource(&state, &org, &key).await?;
    check_payload_id(changes.id, resource.id)?;

    check_tag(changes.tag.as_ref().and_then(Option::as_deref))?;

    let id = resource.id;
    let updated = Resource::update(&state.db, id, changes, Some(auth.user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Resource", id))?;

    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let org = owned_organization(&state, &auth, &org).await?;

    if let Some(resource) = find_in(&state, &org, &key).await? {
        Resource::delete(&state.db, resource.id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Permissions attached to the resource; holding any one grants access
pub async fn enabling_permissions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
) -> ApiResult<Json<EnablingPermissionsResponse>> {
    let org = owned_organization(&state, &auth, &org).await?;
    let resource = find_resource(&state, &org, &key).await?;

    let permission_ids = enabling_permission_ids(&state.db, &ResourceRef::Id(resource.id)).await?;
    let permissions = Permission::find_many(&state.db, &permission_ids).await?;

    Ok(Json(EnablingPermissionsResponse {
        resource_id: resource.id,
        permission_ids,
        permissions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tag() {
        assert!(check_tag(None).is_ok());
        assert!(check_tag(Some("front-door")).is_ok());
        assert!(check_tag(Some(&Uuid::new_v4().to_string())).is_err());
        assert!(matches!(check_tag(Some("  ")), Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn test_check_tag_rejects_surrounding_whitespace() {
        assert!(matches!(check_tag(Some(" door ")), Err(ApiError::ValidationError(_))));
        assert!(matches!(check_tag(Some("door\n")), Err(ApiError::ValidationError(_))));
        assert!(check_tag(Some("front door")).is_ok());
    }
}
