/// Bearer-token authentication for Axum
///
/// [`authenticate`] extracts the token from the `Authorization` header,
/// validates it as an access token and resolves the caller into an
/// [`AuthContext`]. The API router runs it in a middleware layer and inserts
/// the context into the request extensions, where handlers read it back
/// with `Extension<AuthContext>`.
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use gatehouse_shared::auth::jwt::{create_token, Claims, JwtKeys, TokenType};
/// use gatehouse_shared::auth::middleware::authenticate;
/// use uuid::Uuid;
///
/// let keys = JwtKeys::from_secret("a-secret-that-is-at-least-32-bytes", "gatehouse").unwrap();
/// let user_id = Uuid::new_v4();
/// let token = create_token(&Claims::new(user_id, "gatehouse", TokenType::Access), &keys).unwrap();
///
/// let mut headers = HeaderMap::new();
/// let value = HeaderValue::from_str(&format!("Bearer {}", token)).unwrap();
/// headers.insert(header::AUTHORIZATION, value);
///
/// assert_eq!(authenticate(&headers, &keys).unwrap().user_id, user_id);
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError, JwtKeys};

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            AuthError::MissingCredentials => ("missing_credentials", "Missing credentials".to_string()),
            AuthError::InvalidFormat(msg) => ("invalid_credentials", msg),
            AuthError::InvalidToken(msg) => ("invalid_token", msg),
        };

        let body = Json(json!({ "error": code, "message": message }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates the request's access token and resolves the caller
pub fn authenticate(headers: &HeaderMap, keys: &JwtKeys) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;

    let claims = validate_access_token(token, keys).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        other => AuthError::InvalidToken(other.to_string()),
    })?;

    Ok(AuthContext::new(claims.sub))
}
