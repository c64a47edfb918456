/// Role endpoints, scoped to one of the caller's organizations
///
/// - `GET|POST /api/v1/organizations/:org/roles`
/// - `GET|PUT|DELETE /api/v1/organizations/:org/roles/:key`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{check_payload_id, owned_organization, parse_key, permissions::CreateNamedRequest},
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
        role::{CreateRole, Role, UpdateRole},
    },
};
use validator::Validate;

pub(crate) async fn find_in(
    state: &AppState,
    org: &Organization,
    raw: &str,
) -> ApiResult<Option<Role>> {
    let key = parse_key(raw)?;
    let found = Role::find_by_key(&state.db, org.id, &key).await?;

    Ok(found.filter(|role| role.organization_id == org.id))
}

pub(crate) async fn find_role(state: &AppState, org: &Organization, raw: &str) -> ApiResult<Role> {
    find_in(state, org, raw)
        .await?
        .ok_or_else(|| ApiError::not_found("Role", raw))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
) -> ApiResult<Json<Vec<Role>>> {
    let org = owned_organization(&state, &auth, &org).await?;
    Ok(Json(Role::list_by_organization(&state.db, org.id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
    Json(req): Json<CreateNamedRequest>,
) -> ApiResult<(StatusCode, Json<Role>)> {
    req.validate()?;
    let org = owned_organization(&state, &auth, &org).await?;

    let role = Role::create(
        &state.db,
        CreateRole {
            organization_id: org.id,
            owner_id: req.owner_id.or(Some(auth.user_id)),
            name: req.name,
            description: req.description,
        },
        Some(auth.user_id),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
) -> ApiResult<Json<Role>> {
    let org = owned_organization(&state, &auth, &org).await?;
    Ok(Json(find_role(&state, &org, &key).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
    Json(changes): Json<UpdateRole>,
) -> ApiResult<Json<Role>> {
    let org = owned_organization(&state, &auth, &org).await?;
    let role = find_role(&state, &org, &key).await?;
    check_payload_id(changes.id, role.id)?;

    let id = role.id;
    let updated = Role::update(&state.db, id, changes, Some(auth.user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Role", id))?;

    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let org = owned_organization(&state, &auth, &org).await?;

    if let Some(role) = find_in(&state, &org, &key).await? {
        Role::delete(&state.db, role.id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
