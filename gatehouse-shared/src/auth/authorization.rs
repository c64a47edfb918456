/// Permission resolution and authorization checks
///
/// # Permission Model
///
/// A user holds a permission over a resource when the RBAC graph contains
/// the path
///
/// ```text
/// user → user_roles → role_permissions → permission → resource_permissions → resource
/// ```
///
/// Every check is a single query against the current state of the graph;
/// nothing is cached, so revoking any edge takes effect on the next call.
///
/// Resources are addressed with a [`ResourceRef`]: either the id or the
/// short tag. A tag resolves to the oldest resource carrying it. An
/// unknown resource or user simply has no path, so the check
/// answers `false` rather than failing.
///
/// # Example
///
/// ```no_run
/// use gatehouse_shared::auth::authorization::{has_permission, require_resource_permission};
/// use gatehouse_shared::models::key::ResourceRef;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let door = ResourceRef::parse("front-door")?;
///
/// if has_permission(&pool, &door, user_id).await? {
///     println!("door opens");
/// }
///
/// require_resource_permission(&pool, &door, user_id).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::key::ResourceRef;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// No permission path from the user to the resource
    #[error("Not authorized to access resource {0}")]
    NotAuthorized(String),

    /// The caller does not own the entity
    #[error("Only the owner may perform this action")]
    NotOwner,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

const HAS_PERMISSION_BY_ID: &str = r#"
    SELECT EXISTS (
        SELECT 1
        FROM resources r
        JOIN resource_permissions rsp ON rsp.resource_id = r.id
        JOIN permissions p ON p.id = rsp.permission_id
        JOIN role_permissions rp ON rp.permission_id = p.id
        JOIN user_roles ur ON ur.role_id = rp.role_id
        JOIN users u ON u.id = ur.user_id
        WHERE r.id = $1
          AND u.id = $2
    )
"#;

// Tags are unique per organization only; a tag names the oldest resource
// carrying it, the same one `Resource::find_by_tag` returns.
const HAS_PERMISSION_BY_TAG: &str = r#"
    SELECT EXISTS (
        SELECT 1
        FROM resources r
        JOIN resource_permissions rsp ON rsp.resource_id = r.id
        JOIN permissions p ON p.id = rsp.permission_id
        JOIN role_permissions rp ON rp.permission_id = p.id
        JOIN user_roles ur ON ur.role_id = rp.role_id
        JOIN users u ON u.id = ur.user_id
        WHERE r.id = (SELECT id FROM resources WHERE tag = $1 ORDER BY created_at, id LIMIT 1)
          AND u.id = $2
    )
"#;

const USER_PERMISSION_IDS: &str = r#"
    SELECT DISTINCT rp.permission_id
    FROM user_roles ur
    JOIN role_permissions rp ON rp.role_id = ur.role_id
    WHERE ur.user_id = $1
    ORDER BY rp.permission_id
"#;

const ENABLING_PERMISSION_IDS_BY_ID: &str = r#"
    SELECT DISTINCT rsp.permission_id
    FROM resources r
    JOIN resource_permissions rsp ON rsp.resource_id = r.id
    WHERE r.id = $1
    ORDER BY rsp.permission_id
"#;

const ENABLING_PERMISSION_IDS_BY_TAG: &str = r#"
    SELECT DISTINCT rsp.permission_id
    FROM resources r
    JOIN resource_permissions rsp ON rsp.resource_id = r.id
    WHERE r.id = (SELECT id FROM resources WHERE tag = $1 ORDER BY created_at, id LIMIT 1)
    ORDER BY rsp.permission_id
"#;

/// Whether `user_id` holds any permission attached to `resource`
///
/// # Errors
///
/// Only database failures are errors; a missing resource or user yields
/// `Ok(false)`.
pub async fn has_permission(
    pool: &PgPool,
    resource: &ResourceRef,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let allowed = match resource {
        ResourceRef::Id(id) => {
            sqlx::query_scalar::<_, bool>(HAS_PERMISSION_BY_ID)
                .bind(id)
                .bind(user_id)
                .fetch_one(pool)
                .await?
        }
        ResourceRef::Tag(tag) => {
            sqlx::query_scalar::<_, bool>(HAS_PERMISSION_BY_TAG)
                .bind(tag)
                .bind(user_id)
                .fetch_one(pool)
                .await?
        }
    };

    debug!(%resource, %user_id, allowed, "Permission check");
    Ok(allowed)
}

/// Distinct ids of the permissions a user holds through any role
pub async fn user_permission_ids(pool: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(USER_PERMISSION_IDS)
        .bind(user_id)
        .fetch_all(pool)
        .await
}

/// Distinct ids of the permissions attached to a resource
///
/// Holding any one of them grants access to the resource.
pub async fn enabling_permission_ids(
    pool: &PgPool,
    resource: &ResourceRef,
) -> Result<Vec<Uuid>, sqlx::Error> {
    match resource {
        ResourceRef::Id(id) => {
            sqlx::query_scalar::<_, Uuid>(ENABLING_PERMISSION_IDS_BY_ID)
                .bind(id)
                .fetch_all(pool)
                .await
        }
        ResourceRef::Tag(tag) => {
            sqlx::query_scalar::<_, Uuid>(ENABLING_PERMISSION_IDS_BY_TAG)
                .bind(tag)
                .fetch_all(pool)
                .await
        }
    }
}

/// Fails with `AuthzError::NotAuthorized` unless [`has_permission`] holds
pub async fn require_resource_permission(
    pool: &PgPool,
    resource: &ResourceRef,
    user_id: Uuid,
) -> Result<(), AuthzError> {
    if !has_permission(pool, resource, user_id).await? {
        return Err(AuthzError::NotAuthorized(resource.to_string()));
    }

    Ok(())
}

/// Checks that the authenticated user is `owner_id`
///
/// # Example
///
/// ```
/// use gatehouse_shared::auth::authorization::require_ownership;
/// use gatehouse_shared::auth::middleware::AuthContext;
/// use uuid::Uuid;
///
/// let me = Uuid::new_v4();
/// let auth = AuthContext::new(me);
/// assert!(require_ownership(&auth, me).is_ok());
/// assert!(require_ownership(&auth, Uuid::new_v4()).is_err());
/// ```
pub fn require_ownership(auth: &AuthContext, owner_id: Uuid) -> Result<(), AuthzError> {
    if auth.user_id != owner_id {
        return Err(AuthzError::NotOwner);
    }

    Ok(())
}
