/// API route handlers
///
/// Handlers are organized by entity:
///
/// - `health`: health check
/// - `auth`: signup, login and token refresh
/// - `users`: accounts, profiles and a user's effective permissions
/// - `subscriptions`: plan subscriptions of a user
/// - `organizations`: organizations owned by the caller
/// - `resources`, `permissions`, `roles`: the RBAC vertices of an organization
/// - `resource_permissions`, `role_permissions`, `user_roles`: the RBAC edges
/// - `authorize`: permission checks
/// - `properties`: properties sets and their typed properties
/// - `plans`: subscription plans
///
/// Every entity path segment accepts an id or a name (see [`EntityKey`]).

pub mod auth;
pub mod authorize;
pub mod health;
pub mod organizations;
pub mod permissions;
pub mod plans;
pub mod properties;
pub mod resource_permissions;
pub mod resources;
pub mod role_permissions;
pub mod roles;
pub mod subscriptions;
pub mod user_roles;
pub mod users;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use gatehouse_shared::{
    auth::{authorization::require_ownership, middleware::AuthContext},
    models::{key::EntityKey, organization::Organization},
};
use uuid::Uuid;

/// Parses a path segment into an [`EntityKey`]
pub(crate) fn parse_key(raw: &str) -> ApiResult<EntityKey> {
    Ok(EntityKey::parse(raw)?)
}

/// Resolves `raw` to one of the caller's organizations
///
/// Names are looked up among the caller's own organizations; an id of an
/// organization owned by someone else is `403`.
pub(crate) async fn owned_organization(
    state: &AppState,
    auth: &AuthContext,
    raw: &str,
) -> ApiResult<Organization> {
    let key = parse_key(raw)?;
    let org = Organization::find_by_key(&state.db, auth.user_id, &key)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization", &key))?;

    require_ownership(auth, org.owner_id)?;
    Ok(org)
}

/// Rejects an update payload that names a different entity than the path
pub(crate) fn check_payload_id(payload_id: Option<Uuid>, target_id: Uuid) -> ApiResult<()> {
    match payload_id {
        Some(id) if id != target_id => Err(ApiError::BadRequest(format!(
            "Payload id {} does not match {}",
            id, target_id
        ))),
        _ => Ok(()),
    }
}

/// Rejects a reference to an entity of another organization
pub(crate) fn check_same_organization(
    entity: &str,
    entity_org: Uuid,
    org: &Organization,
) -> ApiResult<()> {
    if entity_org != org.id {
        return Err(ApiError::BadRequest(format!(
            "{} belongs to another organization",
            entity
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_payload_id() {
        let id = Uuid::new_v4();
        assert!(check_payload_id(None, id).is_ok());
        assert!(check_payload_id(Some(id), id).is_ok());
        assert!(matches!(
            check_payload_id(Some(Uuid::new_v4()), id),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_parse_key() {
        assert!(matches!(parse_key("acme"), Ok(EntityKey::Name(_))));
        assert!(matches!(parse_key(" "), Err(ApiError::BadRequest(_))));
    }
}
