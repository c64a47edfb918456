/// Properties sets and typed properties
///
/// - `GET|POST /api/v1/properties-sets?holder=<uuid>`
/// - `GET|PUT|DELETE /api/v1/properties-sets/:set`
/// - `GET|POST /api/v1/properties-sets/:set/properties`
/// - `GET|PUT|DELETE /api/v1/properties-sets/:set/properties/:key`
///
/// A set name resolves among the sets of `holder`, which defaults to the
/// caller. Property values are checked against their declared type on every
/// write.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{check_payload_id, parse_key},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use gatehouse_shared::{
    auth::middleware::AuthContext,
    models::{
        key::EntityKey,
        properties_set::{CreatePropertiesSet, PropertiesSet, UpdatePropertiesSet},
        property::{CreateProperty, Property, PropertyType, UpdateProperty},
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct HolderQuery {
    pub holder: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSetRequest {
    /// Defaults to the caller
    pub holder_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,

    pub description: Option<String>,
}

/// New property; `set_id` comes from the path
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePropertyRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,

    pub description: Option<String>,
    pub property_type: String,
    pub value: String,
}

async fn find_set_in(
    state: &AppState,
    holder: Uuid,
    raw: &str,
) -> ApiResult<Option<PropertiesSet>> {
    match parse_key(raw)? {
        EntityKey::Id(id) => Ok(PropertiesSet::find_by_id(&state.db, id).await?),
        EntityKey::Name(name) => Ok(PropertiesSet::find_by_name(&state.db, holder, &name).await?),
    }
}

async fn find_set(state: &AppState, holder: Uuid, raw: &str) -> ApiResult<PropertiesSet> {
    find_set_in(state, holder, raw)
        .await?
        .ok_or_else(|| ApiError::not_found("Properties set", raw))
}

async fn find_property_in(
    state: &AppState,
    set: &PropertiesSet,
    raw: &str,
) -> ApiResult<Option<Property>> {
    let found = match parse_key(raw)? {
        EntityKey::Id(id) => Property::find_by_id(&state.db, id).await?,
        EntityKey::Name(name) => Property::find_by_name(&state.db, set.id, &name).await?,
    };

    Ok(found.filter(|property| property.set_id == set.id))
}

async fn find_property(state: &AppState, set: &PropertiesSet, raw: &str) -> ApiResult<Property> {
    find_property_in(state, set, raw)
        .await?
        .ok_or_else(|| ApiError::not_found("Property", raw))
}

pub async fn list_sets(
    State(state): State<AppState>,
    Query(query): Query<HolderQuery>,
) -> ApiResult<Json<Vec<PropertiesSet>>> {
    let sets = match query.holder {
        Some(holder) => PropertiesSet::list_by_holder(&state.db, holder).await?,
        None => PropertiesSet::list(&state.db).await?,
    };

    Ok(Json(sets))
}

pub async fn create_set(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateSetRequest>,
) -> ApiResult<(StatusCode, Json<PropertiesSet>)> {
    req.validate()?;

    let set = PropertiesSet::create(
        &state.db,
        CreatePropertiesSet {
            holder_id: req.holder_id.unwrap_or(auth.user_id),
            name: req.name,
            description: req.description,
        },
        Some(auth.user_id),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(set)))
}

pub async fn get_set(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(set): Path<String>,
    Query(query): Query<HolderQuery>,
) -> ApiResult<Json<PropertiesSet>> {
    let holder = query.holder.unwrap_or(auth.user_id);
    Ok(Json(find_set(&state, holder, &set).await?))
}

pub async fn update_set(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(set): Path<String>,
    Query(query): Query<HolderQuery>,
    Json(changes): Json<UpdatePropertiesSet>,
) -> ApiResult<Json<PropertiesSet>> {
    let holder = query.holder.unwrap_or(auth.user_id);
    let set = find_set(&state, holder, &set).await?;
    check_payload_id(changes.id, set.id)?;

    let id = set.id;
    let updated = PropertiesSet::update(&state.db, id, changes, Some(auth.user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Properties set", id))?;

    Ok(Json(updated))
}

/// Deletes the set and its properties
pub async fn delete_set(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(set): Path<String>,
    Query(query): Query<HolderQuery>,
) -> ApiResult<StatusCode> {
    let holder = query.holder.unwrap_or(auth.user_id);

    if let Some(set) = find_set_in(&state, holder, &set).await? {
        PropertiesSet::delete(&state.db, set.id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(set): Path<String>,
    Query(query): Query<HolderQuery>,
) -> ApiResult<Json<Vec<Property>>> {
    let set = find_set(&state, query.holder.unwrap_or(auth.user_id), &set).await?;
    Ok(Json(Property::list_by_set(&state.db, set.id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(set): Path<String>,
    Query(query): Query<HolderQuery>,
    Json(req): Json<CreatePropertyRequest>,
) -> ApiResult<(StatusCode, Json<Property>)> {
    req.validate()?;
    let set = find_set(&state, query.holder.unwrap_or(auth.user_id), &set).await?;

    let property_type = req.property_type.parse::<PropertyType>()?;
    let data = CreateProperty {
        set_id: set.id,
        name: req.name,
        description: req.description,
        property_type,
        value: req.value,
    };
    data.property_type.parse(&data.value)?;

    let property = Property::create(&state.db, data, Some(auth.user_id)).await?;
    Ok((StatusCode::CREATED, Json(property)))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((set, key)): Path<(String, String)>,
    Query(query): Query<HolderQuery>,
) -> ApiResult<Json<Property>> {
    let set = find_set(&state, query.holder.unwrap_or(auth.user_id), &set).await?;
    Ok(Json(find_property(&state, &set, &key).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((set, key)): Path<(String, String)>,
    Query(query): Query<HolderQuery>,
    Json(changes): Json<UpdateProperty>,
) -> ApiResult<Json<Property>> {
    let set = find_set(&state, query.holder.unwrap_or(auth.user_id), &set).await?;
    let property = find_property(&state, &set, &key).await?;
    check_payload_id(changes.id, property.id)?;

    let id = property.id;
    let updated = Property::update_checked(&state.db, id, changes, Some(auth.user_id), |patched| {
        patched.validate().map_err(ApiError::from)
    })
    .await?
        .ok_or_else(|| ApiError::not_found("Property", id))?;

    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((set, key)): Path<(String, String)>,
    Query(query): Query<HolderQuery>,
) -> ApiResult<StatusCode> {
    let holder = query.holder.unwrap_or(auth.user_id);

    if let Some(set) = find_set_in(&state, holder, &set).await? {
        if let Some(property) = find_property_in(&state, &set, &key).await? {
            Property::delete(&state.db, property.id).await?;
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
