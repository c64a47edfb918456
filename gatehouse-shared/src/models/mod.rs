/// Database models for Gatehouse
///
/// Each module holds one record type, its create/update payloads and its
/// CRUD operations. Shared behavior (fetch by id, diff-based update,
/// delete) lives in [`crate::db::record`].
///
/// # Models
///
/// - `user`, `profile`: accounts and their public profile
/// - `organization`: tenancy boundary of the RBAC graph
/// - `resource`, `permission`, `role`: RBAC nodes inside an organization
/// - `resource_permission`, `role_permission`, `user_role`: RBAC edges
/// - `properties_set`, `property`: typed attributes attached to any id
/// - `plan`, `plan_subscription`: subscription periods
/// - `key`: id-or-name path identifiers
///
/// # Example
///
/// ```no_run
/// use gatehouse_shared::db::pool::{create_pool, DatabaseConfig};
/// use gatehouse_shared::models::user::{CreateUser, User};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     username: "ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }, None).await?;
/// # Ok(())
/// # }
/// ```

pub mod key;
pub mod organization;
pub mod permission;
pub mod plan;
pub mod plan_subscription;
pub mod profile;
pub mod properties_set;
pub mod property;
pub mod resource;
pub mod resource_permission;
pub mod role;
pub mod role_permission;
pub mod user;
pub mod user_role;

use serde::{Deserialize, Deserializer};

/// Deserializes a clearable update field
///
/// Used with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: an absent field stays `None` (leave unchanged) while
/// an explicit `null` becomes `Some(None)` (clear the column).
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        description: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_distinguishes_absent_from_null() {
        let absent: Patch = serde_json::from_value(json!({})).unwrap();
        assert_eq!(absent.description, None);

        let cleared: Patch = serde_json::from_value(json!({ "description": null })).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: Patch = serde_json::from_value(json!({ "description": "x" })).unwrap();
        assert_eq!(set.description, Some(Some("x".to_string())));
    }
}
