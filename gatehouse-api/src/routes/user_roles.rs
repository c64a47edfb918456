/// User-role endpoints: assign roles to users inside an organization
///
/// - `GET|POST /api/v1/organizations/:org/user-roles`
/// - `GET|PUT|DELETE /api/v1/organizations/:org/user-roles/:key`
///
/// Any user may be assigned; the role must belong to the organization.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{
        check_payload_id, check_same_organization, owned_organization, parse_key,
        roles::find_role, users::find_user,
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
        role::Role,
        user::User,
        user_role::{CreateUserRole, UpdateUserRole, UserRole},
    },
};
use serde::Deserialize;

/// New assignment; `user` accepts an id or username, `role` an id or name
#[derive(Debug, Deserialize)]
pub struct CreateUserRoleRequest {
    pub user: String,
    pub role: String,

    /// Defaults to `<username>:<role>`
    pub name: Option<String>,

    pub description: Option<String>,
}

async fn find_in(state: &AppState, org: &Organization, raw: &str) -> ApiResult<Option<UserRole>> {
    let key = parse_key(raw)?;
    let found = UserRole::find_by_key(&state.db, org.id, &key).await?;

    Ok(found.filter(|assignment| assignment.organization_id == org.id))
}

async fn find_assignment(state: &AppState, org: &Organization, raw: &str) -> ApiResult<UserRole> {
    find_in(state, org, raw)
        .await?
        .ok_or_else(|| ApiError::not_found("User role", raw))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
) -> ApiResult<Json<Vec<UserRole>>> {
    let org = owned_organization(&state, &auth, &org).await?;
    Ok(Json(UserRole::list_by_organization(&state.db, org.id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org): Path<String>,
    Json(req): Json<CreateUserRoleRequest>,
) -> ApiResult<(StatusCode, Json<UserRole>)> {
    let org = owned_organization(&state, &auth, &org).await?;
    let user = find_user(&state, &req.user).await?;
    let role = find_role(&state, &org, &req.role).await?;

    let assignment = UserRole::create(
        &state.db,
        CreateUserRole {
            organization_id: org.id,
            owner_id: Some(auth.user_id),
            user_id: user.id,
            role_id: role.id,
            name: req
                .name
                .unwrap_or_else(|| format!("{}:{}", user.username, role.name)),
            description: req.description,
        },
        Some(auth.user_id),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
) -> ApiResult<Json<UserRole>> {
    let org = owned_organization(&state, &auth, &org).await?;
    Ok(Json(find_assignment(&state, &org, &key).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
    Json(changes): Json<UpdateUserRole>,
) -> ApiResult<Json<UserRole>> {
    let org = owned_organization(&state, &auth, &org).await?;
    let assignment = find_assignment(&state, &org, &key).await?;
    check_payload_id(changes.id, assignment.id)?;

    if let Some(id) = changes.user_id {
        User::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| ApiError::not_found("User", id))?;
    }
    if let Some(id) = changes.role_id {
        let role = Role::find_by_id(&state.db, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Role", id))?;
        check_same_organization("Role", role.organization_id, &org)?;
    }

    let id = assignment.id;
    let updated = UserRole::update(&state.db, id, changes, Some(auth.user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("User role", id))?;

    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org, key)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let org = owned_organization(&state, &auth, &org).await?;

    if let Some(assignment) = find_in(&state, &org, &key).await? {
        UserRole::delete(&state.db, assignment.id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
