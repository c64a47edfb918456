/// Authentication endpoints
///
/// - `POST /api/v1/signup` - create an account and sign in
/// - `POST /api/v1/login` - sign in with username or email
/// - `POST /api/v1/refresh` - exchange a refresh token for an access token
///
/// All three are public; every other `/api/v1` route requires the access
/// token returned here as `Authorization: Bearer <token>`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    Json,
};
use gatehouse_shared::{
    auth::{jwt, password},
    models::{
        profile::{CreateProfile, Profile},
        user::{CreateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Login name
    #[validate(length(min = 3, max = 64, message = "Username must be 3 to 64 characters"))]
    pub username: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (also checked for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional display name for the profile
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email address
    #[validate(length(min = 1, message = "Login is required"))]
    pub login: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Tokens issued on signup and login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Authenticated user
    pub user_id: Uuid,

    #[serde(flatten)]
    pub tokens: jwt::TokenPair,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Validates the request, hashes the password and creates user and profile
pub(crate) async fn register_user(
    state: &AppState,
    req: SignupRequest,
    actor: Option<Uuid>,
) -> ApiResult<User> {
    req.validate()?;
    password::validate_password_strength(&req.password)?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email.clone(),
            password_hash,
        },
        actor,
    )
    .await?;

    Profile::create(
        &state.db,
        CreateProfile {
            user_id: user.id,
            name: req.name,
            email: Some(req.email),
        },
        actor.or(Some(user.id)),
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(user)
}

/// Creates an account and returns a token pair
///
/// ```text
/// POST /api/v1/signup
///
/// { "username": "ada", "email": "ada@example.com", "password": "C0mpl3x#Pwd" }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: validation or password strength failed
/// - `409 Conflict`: username or email already taken
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let user = register_user(&state, req, None).await?;
    let tokens = jwt::issue_token_pair(user.id, &state.keys)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id: user.id,
            tokens,
        }),
    ))
}

/// Authenticates a user and returns a token pair
///
/// ```text
/// POST /api/v1/login
///
/// { "login": "ada", "password": "C0mpl3x#Pwd" }
/// ```
///
/// Unknown users, wrong passwords and inactive accounts all answer the same
/// `401`.
pub async fn login(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid login or password".to_string());

    let user = User::find_by_login(&state.db, req.login.trim())
        .await?
        .ok_or_else(invalid)?;

    if !user.is_active || !password::verify_password(&req.password, &user.password_hash)? {
        return Err(invalid());
    }

    let ip = peer.map(|ConnectInfo(addr)| addr.ip().to_string());
    User::record_login(&state.db, user.id, ip).await?;

    let tokens = jwt::issue_token_pair(user.id, &state.keys)?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        user_id: user.id,
        tokens,
    }))
}

/// Exchanges a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, &state.keys)?;

    Ok(Json(RefreshResponse { access_token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_validation() {
        let req = SignupRequest {
            username: "ad".to_string(),
            email: "not-an-email".to_string(),
            password: "C0mpl3x#Pwd".to_string(),
            name: None,
        };

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("password"));
    }

    #[test]
    fn test_auth_response_is_flat() {
        let response = AuthResponse {
            user_id: Uuid::nil(),
            tokens: jwt::TokenPair {
                access_token: "a".to_string(),
                refresh_token: "r".to_string(),
                token_type: "Bearer".to_string(),
                expires_in: 86400,
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["access_token"], "a");
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["user_id"], Uuid::nil().to_string());
    }
}
