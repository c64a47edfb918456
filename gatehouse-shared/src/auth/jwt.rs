/// JWT token generation and validation module
///
/// Tokens identify a user (`sub`) and are either short-lived access tokens
/// or long-lived refresh tokens. Signing keys are loaded once at boot into a
/// [`JwtKeys`] value and shared through the application state.
///
/// # Signing
///
/// - **HS256**: shared secret, at least 32 bytes
/// - **RS256**: PEM-encoded RSA key pair (private key signs, public key verifies)
///
/// # Token Types
///
/// - **Access Token**: 24 hours, accepted by the API middleware
/// - **Refresh Token**: 30 days, accepted only by the refresh endpoint
///
/// # Example
///
/// ```
/// use gatehouse_shared::auth::jwt::{create_token, validate_token, Claims, JwtKeys, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let keys = JwtKeys::from_secret("a-secret-that-is-at-least-32-bytes", "gatehouse")?;
/// let user_id = Uuid::new_v4();
///
/// let token = create_token(&Claims::new(user_id, keys.issuer(), TokenType::Access), &keys)?;
/// let claims = validate_token(&token, &keys)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Minimum length of an HS256 secret
pub const MIN_SECRET_LEN: usize = 32;

/// Issuer used when none is configured
pub const DEFAULT_ISSUER: &str = "gatehouse";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, issuer or format check failed
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token is valid but of the wrong kind for this use
    #[error("Expected {expected} token, got {actual} token")]
    WrongTokenType {
        expected: &'static str,
        actual: &'static str,
    },

    /// Key material could not be loaded
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (short-lived, 24 hours)
    Access,

    /// Refresh token (long-lived, 30 days)
    Refresh,
}

impl TokenType {
    /// Gets default expiration duration for token type
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(24),
            TokenType::Refresh => Duration::days(30),
        }
    }

    /// Gets token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Signing and verification keys
pub struct JwtKeys {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
}

impl JwtKeys {
    /// HS256 keys from a shared secret
    ///
    /// # Errors
    ///
    /// Returns `JwtError::InvalidKey` if the secret is shorter than
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn from_secret(secret: &str, issuer: &str) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(JwtError::InvalidKey(format!(
                "HS256 secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self {
            algorithm: Algorithm::HS256,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
        })
    }

    /// RS256 keys from PEM-encoded private and public keys
    pub fn from_rsa_pem(private_pem: &[u8], public_pem: &[u8], issuer: &str) -> Result<Self, JwtError> {
        let encoding = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| JwtError::InvalidKey(format!("private key: {}", e)))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| JwtError::InvalidKey(format!("public key: {}", e)))?;

        Ok(Self {
            algorithm: Algorithm::RS256,
            encoding,
            decoding,
            issuer: issuer.to_string(),
        })
    }

    /// Signing algorithm
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Issuer written into and required from every token
    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeys")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

/// JWT claims structure
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer
/// - `iat`, `nbf`, `exp`: Unix timestamps
/// - `token_type`: Access or refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub token_type: TokenType,
}

impl Claims {
    /// Creates new claims with the default expiration for `token_type`
    pub fn new(user_id: Uuid, issuer: &str, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, issuer, token_type, token_type.default_expiration())
    }

    /// Creates claims with custom expiration
    ///
    /// # Example
    ///
    /// ```
    /// use gatehouse_shared::auth::jwt::{Claims, TokenType};
    /// use chrono::Duration;
    /// use uuid::Uuid;
    ///
    /// let claims = Claims::with_expiration(
    ///     Uuid::new_v4(),
    ///     "gatehouse",
    ///     TokenType::Access,
    ///     Duration::hours(1),
    /// );
    /// assert!(!claims.is_expired());
    /// ```
    pub fn with_expiration(
        user_id: Uuid,
        issuer: &str,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            token_type,
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Seconds until expiration, if any remain
    pub fn expires_in(&self) -> Option<i64> {
        let left = self.exp - Utc::now().timestamp();
        (left > 0).then_some(left)
    }
}

/// Access and refresh token issued together on login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,

    /// Always `Bearer`
    pub token_type: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Signs `claims` with `keys`
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, keys: &JwtKeys) -> Result<String, JwtError> {
    encode(&Header::new(keys.algorithm), claims, &keys.encoding)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a token and extracts its claims
///
/// Verifies the signature, expiration, not-before time and issuer.
pub fn validate_token(token: &str, keys: &JwtKeys) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(keys.algorithm);
    validation.set_issuer(&[keys.issuer.as_str()]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let data = decode::<Claims>(token, &keys.decoding, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(data.claims)
}

fn validate_kind(token: &str, keys: &JwtKeys, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, keys)?;

    if claims.token_type != expected {
        return Err(JwtError::WrongTokenType {
            expected: expected.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

/// Validates a token and checks it is an access token
pub fn validate_access_token(token: &str, keys: &JwtKeys) -> Result<Claims, JwtError> {
    validate_kind(token, keys, TokenType::Access)
}

/// Validates a token and checks it is a refresh token
pub fn validate_refresh_token(token: &str, keys: &JwtKeys) -> Result<Claims, JwtError> {
    validate_kind(token, keys, TokenType::Refresh)
}

/// Issues an access/refresh pair for a user
pub fn issue_token_pair(user_id: Uuid, keys: &JwtKeys) -> Result<TokenPair, JwtError> {
    let access = Claims::new(user_id, keys.issuer(), TokenType::Access);
    let refresh = Claims::new(user_id, keys.issuer(), TokenType::Refresh);

    Ok(TokenPair {
        access_token: create_token(&access, keys)?,
        refresh_token: create_token(&refresh, keys)?,
        token_type: "Bearer".to_string(),
        expires_in: TokenType::Access.default_expiration().num_seconds(),
    })
}

/// Exchanges a refresh token for a new access token
pub fn refresh_access_token(refresh_token: &str, keys: &JwtKeys) -> Result<String, JwtError> {
    let refresh = validate_refresh_token(refresh_token, keys)?;
    let access = Claims::new(refresh.sub, keys.issuer(), TokenType::Access);

    create_token(&access, keys)
}
