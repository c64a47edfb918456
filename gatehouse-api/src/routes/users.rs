/// User endpoints
///
/// - `GET    /api/v1/users` - list users
/// - `POST   /api/v1/users` - create a user
/// - `GET    /api/v1/users/:key` - get by id or username
/// - `PUT    /api/v1/users/:key` - update the caller's own account
/// - `DELETE /api/v1/users/:key` - delete the caller's own account
/// - `GET    /api/v1/users/:key/profile` - get the profile
/// - `PUT    /api/v1/users/:key/profile` - update the caller's own profile
/// - `GET    /api/v1/users/:key/permissions` - permissions held through roles

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{auth::{register_user, SignupRequest}, check_payload_id, parse_key},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use gatehouse_shared::{
    auth::{
        authorization::{require_ownership, user_permission_ids},
        middleware::AuthContext,
        password,
    },
    models::{
        permission::Permission,
        profile::{Profile, UpdateProfile},
        user::{UpdateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Account update
///
/// A new `password` is strength-checked and stored hashed.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub id: Option<Uuid>,

    #[validate(length(min = 3, max = 64, message = "Username must be 3 to 64 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: Option<String>,
    pub email_confirmed: Option<bool>,
    pub is_active: Option<bool>,
}

/// Effective permissions of a user
#[derive(Debug, Serialize, Deserialize)]
pub struct UserPermissionsResponse {
    pub user_id: Uuid,

    /// Distinct ids, sorted
    pub permission_ids: Vec<Uuid>,

    pub permissions: Vec<Permission>,
}

pub(crate) async fn find_user(state: &AppState, raw: &str) -> ApiResult<User> {
    let key = parse_key(raw)?;
    User::find_by_key(&state.db, &key)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &key))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(User::list(&state.db).await?))
}

/// Creates a user on behalf of the caller, recorded as `created_by_id`
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = register_user(&state, req, Some(auth.user_id)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult<Json<User>> {
    Ok(Json(find_user(&state, &key).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(key): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;

    let user = find_user(&state, &key).await?;
    require_ownership(&auth, user.id)?;
    check_payload_id(req.id, user.id)?;

    let password_hash = match req.password.as_deref() {
        Some(plain) => {
            password::validate_password_strength(plain)?;
            Some(password::hash_password(plain)?)
        }
        None => None,
    };

    let changes = UpdateUser {
        id: req.id,
        username: req.username,
        email: req.email,
        password_hash,
        email_confirmed: req.email_confirmed,
        is_active: req.is_active,
    };

    let id = user.id;
    let updated = User::update(&state.db, id, changes, Some(auth.user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(updated))
}

/// Deletes the caller's account; `204` even if it was already gone
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    let key = parse_key(&key)?;

    if let Some(user) = User::find_by_key(&state.db, &key).await? {
        require_ownership(&auth, user.id)?;
        User::delete(&state.db, user.id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Profile>> {
    let user = find_user(&state, &key).await?;
    let profile = Profile::find_by_user_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile of user", user.id))?;

    Ok(Json(profile))
}

/// Updates the caller's profile
///
/// `data` must be a JSON document in text form; text that does not parse is
/// left out of the update.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(key): Path<String>,
    Json(changes): Json<UpdateProfile>,
) -> ApiResult<Json<Profile>> {
    let user = find_user(&state, &key).await?;
    require_ownership(&auth, user.id)?;

    let profile = Profile::find_by_user_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile of user", user.id))?;
    check_payload_id(changes.id, profile.id)?;

    let id = profile.id;
    let updated = Profile::update(&state.db, id, changes, Some(auth.user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Profile", id))?;

    Ok(Json(updated))
}

pub async fn permissions(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<UserPermissionsResponse>> {
    let user = find_user(&state, &key).await?;
    let permission_ids = user_permission_ids(&state.db, user.id).await?;
    let permissions = Permission::find_many(&state.db, &permission_ids).await?;

    Ok(Json(UserPermissionsResponse {
        user_id: user.id,
        permission_ids,
        permissions,
    }))
}
