/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: access/refresh token issuance and validation (HS256 or RS256)
/// - [`middleware`]: Axum middleware resolving the bearer token to an [`middleware::AuthContext`]
/// - [`authorization`]: permission resolution over the RBAC graph
///
/// # Example
///
/// ```no_run
/// use gatehouse_shared::auth::jwt::{issue_token_pair, JwtKeys};
/// use gatehouse_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("S3cure!pass")?;
/// assert!(verify_password("S3cure!pass", &hash)?);
///
/// let keys = JwtKeys::from_secret("a-secret-that-is-at-least-32-bytes", "gatehouse")?;
/// let tokens = issue_token_pair(Uuid::new_v4(), &keys)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
