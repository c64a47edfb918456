/// Typed properties
///
/// A property stores its value as text together with a declared
/// [`PropertyType`]. Values are checked against the type before they are
/// written, so anything read back parses cleanly with [`Property::typed_value`].
///
/// # Example
///
/// ```
/// use gatehouse_shared::models::property::{PropertyType, PropertyValue};
///
/// let value = PropertyType::Integer.parse("42").unwrap();
/// assert_eq!(value, PropertyValue::Integer(42));
/// assert!(PropertyType::Boolean.parse("maybe").is_err());
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::db::{
    changeset::{Changeset, Diff},
    record::{self, Record},
};

const COLUMNS: &str = "id, set_id, name, description, property_type, value, \
    is_active, is_logical_deleted, created_by_id, updated_by_id, created_at, updated_at";

/// Property validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    /// The declared type is not one of the supported names
    #[error("unknown property type: {0}")]
    UnknownType(String),

    /// The value does not parse as the declared type
    #[error("value {value:?} is not a valid {expected}")]
    InvalidValue {
        expected: PropertyType,
        value: String,
    },
}

/// Declared type of a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Json,
}

/// A property value parsed according to its type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Json(JsonValue),
}

impl PropertyType {
    /// Name stored in the `property_type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Text => "text",
            PropertyType::Integer => "integer",
            PropertyType::Float => "float",
            PropertyType::Boolean => "boolean",
            PropertyType::Timestamp => "timestamp",
            PropertyType::Json => "json",
        }
    }

    /// Parses `raw` as this type
    ///
    /// Timestamps are RFC 3339. Booleans accept `true` and `false` only.
    pub fn parse(&self, raw: &str) -> Result<PropertyValue, PropertyError> {
        let invalid = || PropertyError::InvalidValue {
            expected: *self,
            value: raw.to_string(),
        };

        match self {
            PropertyType::Text => Ok(PropertyValue::Text(raw.to_string())),
            PropertyType::Integer => raw.trim().parse().map(PropertyValue::Integer).map_err(|_| invalid()),
            PropertyType::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(PropertyValue::Float)
                .ok_or_else(invalid),
            PropertyType::Boolean => raw.trim().parse().map(PropertyValue::Boolean).map_err(|_| invalid()),
            PropertyType::Timestamp => DateTime::parse_from_rfc3339(raw.trim())
                .map(|ts| PropertyValue::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|_| invalid()),
            PropertyType::Json => serde_json::from_str(raw).map(PropertyValue::Json).map_err(|_| invalid()),
        }
    }
}

impl FromStr for PropertyType {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(PropertyType::Text),
            "integer" => Ok(PropertyType::Integer),
            "float" => Ok(PropertyType::Float),
            "boolean" => Ok(PropertyType::Boolean),
            "timestamp" => Ok(PropertyType::Timestamp),
            "json" => Ok(PropertyType::Json),
            other => Err(PropertyError::UnknownType(other.to_string())),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed attribute inside a [`PropertiesSet`](super::properties_set::PropertiesSet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Property {
    pub id: Uuid,

    /// Owning set
    pub set_id: Uuid,

    /// Name, unique inside the set
    pub name: String,

    pub description: Option<String>,

    /// Declared type, one of the [`PropertyType`] names
    pub property_type: String,

    /// Value as text
    pub value: String,

    pub is_active: bool,
    pub is_logical_deleted: bool,
    pub created_by_id: Option<Uuid>,
    pub updated_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProperty {
    pub set_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProperty {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::nullable")]
    pub description: Option<Option<String>>,
    pub property_type: Option<PropertyType>,
    pub value: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateProperty {
    pub fn apply_to(self, property: &mut Property) {
        if let Some(name) = self.name {
            property.name = name;
        }
        if let Some(description) = self.description {
            property.description = description;
        }
        if let Some(kind) = self.property_type {
            property.property_type = kind.as_str().to_string();
        }
        if let Some(value) = self.value {
            property.value = value;
        }
        if let Some(active) = self.is_active {
            property.is_active = active;
        }
    }
}

impl Property {
    /// Declared type
    pub fn kind(&self) -> Result<PropertyType, PropertyError> {
        self.property_type.parse()
    }

    /// Value parsed according to the declared type
    pub fn typed_value(&self) -> Result<PropertyValue, PropertyError> {
        self.kind()?.parse(&self.value)
    }

    /// Checks that the value matches the declared type
    pub fn validate(&self) -> Result<(), PropertyError> {
        self.typed_value().map(|_| ())
    }
}

impl Diff for Property {
    fn diff(&self, current: &Self) -> Changeset {
        let mut changes = Changeset::new();
        changes
            .field("name", &current.name, &self.name)
            .field("description", &current.description, &self.description)
            .field("property_type", &current.property_type, &self.property_type)
            .field("value", &current.value, &self.value)
            .field("is_active", &current.is_active, &self.is_active)
            .field("is_logical_deleted", &current.is_logical_deleted, &self.is_logical_deleted)
            .field("updated_by_id", &current.updated_by_id, &self.updated_by_id)
            .timestamp("updated_at", &Some(current.updated_at), &Some(self.updated_at));
        changes
    }
}

impl Record for Property {
    const TABLE: &'static str = "properties";
    const COLUMNS: &'static str = COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&mut self, actor: Option<Uuid>) {
        self.updated_at = Utc::now();
        self.updated_by_id = actor;
    }
}

impl Property {
    /// Creates a property
    ///
    /// The caller validates the value first (see [`PropertyType::parse`]);
    /// the database only checks the type name.
    pub async fn create(
        pool: &PgPool,
        data: CreateProperty,
        actor: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO properties (id, set_id, name, description, property_type, value, \
             created_by_id, updated_by_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8, $8) RETURNING {}",
            COLUMNS
        );

        sqlx::query_as::<_, Property>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.set_id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.property_type.as_str())
            .bind(data.value)
            .bind(actor)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Lists the properties of a set
    pub async fn list_by_set(pool: &PgPool, set_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        record::fetch_all_by(pool, "set_id", set_id).await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_id(pool, id).await
    }

    pub async fn find_by_name(
        pool: &PgPool,
        set_id: Uuid,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        record::fetch_by_name_in(pool, "set_id", set_id, name).await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: UpdateProperty,
        actor: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        Self::update_checked(pool, id, changes, actor, |_| Ok(())).await
    }

    /// Like [`Self::update`], but `check` sees the patched row before it is
    /// written; an error aborts the update
    ///
    /// Lets callers validate the merged value against its type under the row lock.
    pub async fn update_checked<E, F>(
        pool: &PgPool,
        id: Uuid,
        changes: UpdateProperty,
        actor: Option<Uuid>,
        check: F,
    ) -> Result<Option<Self>, E>
    where
        E: From<sqlx::Error>,
        F: FnOnce(&Self) -> Result<(), E>,
    {
        record::update(pool, id, actor, |property: &mut Self| {
            changes.apply_to(property);
            check(property)
        })
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        record::delete::<Property>(pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_property(kind: PropertyType, value: &str) -> Property {
        let now = Utc::now();
        Property {
            id: Uuid::new_v4(),
            set_id: Uuid::new_v4(),
            name: "limit".to_string(),
            description: None,
            property_type: kind.as_str().to_string(),
            value: value.to_string(),
            is_active: true,
            is_logical_deleted: false,
            created_by_id: None,
            updated_by_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_type_names_round_trip() {
        for kind in [
            PropertyType::Text,
            PropertyType::Integer,
            PropertyType::Float,
            PropertyType::Boolean,
            PropertyType::Timestamp,
            PropertyType::Json,
        ] {
            assert_eq!(kind.as_str().parse::<PropertyType>(), Ok(kind));
        }
        assert_eq!(
            "decimal".parse::<PropertyType>(),
            Err(PropertyError::UnknownType("decimal".to_string()))
        );
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(PropertyType::Float.parse("2.5"), Ok(PropertyValue::Float(2.5)));
        assert_eq!(PropertyType::Boolean.parse("true"), Ok(PropertyValue::Boolean(true)));
        assert!(PropertyType::Float.parse("NaN").is_err());
        assert!(PropertyType::Integer.parse("4.2").is_err());
        assert!(PropertyType::Json.parse("{").is_err());
        assert!(matches!(
            PropertyType::Timestamp.parse("2025-03-01T12:00:00Z"),
            Ok(PropertyValue::Timestamp(_))
        ));
    }

    #[test]
    fn test_validate_uses_declared_type() {
        assert!(sample_property(PropertyType::Integer, "10").validate().is_ok());
        assert!(sample_property(PropertyType::Integer, "ten").validate().is_err());
    }

    #[test]
    fn test_retype_is_a_change() {
        let current = sample_property(PropertyType::Text, "10");
        let mut updated = current.clone();
        UpdateProperty {
            property_type: Some(PropertyType::Integer),
            ..Default::default()
        }
        .apply_to(&mut updated);

        assert_eq!(updated.diff(&current).columns(), vec!["property_type"]);
        assert_eq!(updated.typed_value(), Ok(PropertyValue::Integer(10)));
    }
}
