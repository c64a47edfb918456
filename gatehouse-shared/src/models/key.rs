/// Path identifiers that may be either a UUID or a human-readable key
///
/// URLs such as `/organizations/{key}` accept an id or a name; resources can
/// also be addressed by their short tag. The discriminant is decided by
/// actually parsing the string as a UUID, not by looking at its length.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Error returned when a key is blank
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("identifier must not be empty")]
pub struct KeyError;

/// An entity addressed by id or by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKey {
    /// Primary key
    Id(Uuid),

    /// Name, unique inside the owning scope
    Name(String),
}

impl EntityKey {
    /// Parses a path segment
    ///
    /// ```
    /// use gatehouse_shared::models::key::EntityKey;
    ///
    /// let key = EntityKey::parse("billing").unwrap();
    /// assert_eq!(key, EntityKey::Name("billing".to_string()));
    /// ```
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(KeyError);
        }

        Ok(match Uuid::parse_str(raw) {
            Ok(id) => EntityKey::Id(id),
            Err(_) => EntityKey::Name(raw.to_string()),
        })
    }

    /// The id, if this key is one
    pub fn as_id(&self) -> Option<Uuid> {
        match self {
            EntityKey::Id(id) => Some(*id),
            EntityKey::Name(_) => None,
        }
    }
}

impl FromStr for EntityKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Id(id) => write!(f, "{}", id),
            EntityKey::Name(name) => f.write_str(name),
        }
    }
}

/// A resource addressed by id or by tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceRef {
    /// Primary key
    Id(Uuid),

    /// Short tag, unique inside the organization
    Tag(String),
}

impl ResourceRef {
    /// Parses a resource id or tag
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        Ok(match EntityKey::parse(raw)? {
            EntityKey::Id(id) => ResourceRef::Id(id),
            EntityKey::Name(tag) => ResourceRef::Tag(tag),
        })
    }
}

impl FromStr for ResourceRef {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for ResourceRef {
    fn from(id: Uuid) -> Self {
        ResourceRef::Id(id)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::Id(id) => write!(f, "{}", id),
            ResourceRef::Tag(tag) => f.write_str(tag),
        }
    }
}
