/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use gatehouse_api::{app::{build_router, AppState}, config::{BootParams, Config}};
/// use gatehouse_shared::db::pool::create_pool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let boot = BootParams::from_env()?;
/// let config = Config::load(&boot)?;
/// let pool = create_pool(&config.database).await?;
/// let keys = config.jwt.load_keys(&boot)?;
/// let app = build_router(AppState::new(pool, config, keys));
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use gatehouse_shared::auth::{jwt::JwtKeys, middleware::authenticate};
use sqlx::PgPool;
use std::{path::PathBuf, sync::Arc};
use tower::Layer;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    set_header::{SetResponseHeader, SetResponseHeaderLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler through Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Token signing and verification keys
    pub keys: Arc<JwtKeys>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, keys: JwtKeys) -> Self {
        Self {
            db,
            config: Arc::new(config),
            keys: Arc::new(keys),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── /health                                 public
/// ├── /public/*                               static files, when configured
/// └── /api/v1
///     ├── POST /signup | /login | /refresh    public
///     └── everything else                     bearer token required
///         ├── /users, /subscriptions
///         ├── /organizations/:org/{resources, permissions, roles,
///         │       resource-permissions, role-permissions, user-roles}
///         ├── /authorize
///         ├── /properties-sets/:set/properties
///         └── /plans
/// ```
pub fn build_router(state: AppState) -> Router {
    build_router_with_public(state, None)
}

/// Same as [`build_router`], additionally serving `public_dir` under `/public`
pub fn build_router_with_public(state: AppState, public_dir: Option<PathBuf>) -> Router {
    let public_routes = Router::new()
        .route("/signup", axum::routing::post(routes::auth::signup))
        .route("/login", axum::routing::post(routes::auth::login))
        .route("/refresh", axum::routing::post(routes::auth::refresh));

    let org_routes = Router::new()
        .route(
            "/",
            get(routes::organizations::list).post(routes::organizations::create),
        )
        .route(
            "/:org",
            get(routes::organizations::get)
                .put(routes::organizations::update)
                .delete(routes::organizations::delete),
        )
        .route(
            "/:org/resources",
            get(routes::resources::list).post(routes::resources::create),
        )
        .route(
            "/:org/resources/:key",
            get(routes::resources::get)
                .put(routes::resources::update)
                .delete(routes::resources::delete),
        )
        .route(
            "/:org/resources/:key/permissions",
            get(routes::resources::enabling_permissions),
        )
        .route(
            "/:org/permissions",
            get(routes::permissions::list).post(routes::permissions::create),
        )
        .route(
            "/:org/permissions/:key",
            get(routes::permissions::get)
                .put(routes::permissions::update)
                .delete(routes::permissions::delete),
        )
        .route(
            "/:org/roles",
            get(routes::roles::list).post(routes::roles::create),
        )
        .route(
            "/:org/roles/:key",
            get(routes::roles::get)
                .put(routes::roles::update)
                .delete(routes::roles::delete),
        )
        .route(
            "/:org/resource-permissions",
            get(routes::resource_permissions::list).post(routes::resource_permissions::create),
        )
        .route(
            "/:org/resource-permissions/:key",
            get(routes::resource_permissions::get)
                .put(routes::resource_permissions::update)
                .delete(routes::resource_permissions::delete),
        )
        .route(
            "/:org/role-permissions",
            get(routes::role_permissions::list).post(routes::role_permissions::create),
        )
        .route(
            "/:org/role-permissions/:key",
            get(routes::role_permissions::get)
                .put(routes::role_permissions::update)
                .delete(routes::role_permissions::delete),
        )
        .route(
            "/:org/user-roles",
            get(routes::user_roles::list).post(routes::user_roles::create),
        )
        .route(
            "/:org/user-roles/:key",
            get(routes::user_roles::get)
                .put(routes::user_roles::update)
                .delete(routes::user_roles::delete),
        );

    let protected_routes = Router::new()
        .route("/users", get(routes::users::list).post(routes::users::create))
        .route(
            "/users/:key",
            get(routes::users::get)
                .put(routes::users::update)
                .delete(routes::users::delete),
        )
        .route(
            "/users/:key/profile",
            get(routes::users::get_profile).put(routes::users::update_profile),
        )
        .route("/users/:key/permissions", get(routes::users::permissions))
        .route(
            "/users/:key/subscriptions",
            get(routes::subscriptions::list).post(routes::subscriptions::create),
        )
        .route(
            "/subscriptions/:id",
            get(routes::subscriptions::get)
                .put(routes::subscriptions::update)
                .delete(routes::subscriptions::delete),
        )
        .nest("/organizations", org_routes)
        .route("/authorize", get(routes::authorize::authorize))
        .route(
            "/properties-sets",
            get(routes::properties::list_sets).post(routes::properties::create_set),
        )
        .route(
            "/properties-sets/:set",
            get(routes::properties::get_set)
                .put(routes::properties::update_set)
                .delete(routes::properties::delete_set),
        )
        .route(
            "/properties-sets/:set/properties",
            get(routes::properties::list).post(routes::properties::create),
        )
        .route(
            "/properties-sets/:set/properties/:key",
            get(routes::properties::get)
                .put(routes::properties::update)
                .delete(routes::properties::delete),
        )
        .route("/plans", get(routes::plans::list).post(routes::plans::create))
        .route(
            "/plans/:key",
            get(routes::plans::get)
                .put(routes::plans::update)
                .delete(routes::plans::delete),
        )
        .layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    let v1_routes = Router::new().merge(public_routes).merge(protected_routes);

    let mut router = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", v1_routes);

    if let Some(dir) = public_dir {
        router = router.nest_service("/public", public_service(dir, state.config.autoreload));
    }

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

/// Static files; with `autoreload` browsers are told to revalidate every time
fn public_service(dir: PathBuf, autoreload: bool) -> SetResponseHeader<ServeDir, HeaderValue> {
    let cache_control = if autoreload {
        HeaderValue::from_static("no-cache")
    } else {
        HeaderValue::from_static("public, max-age=3600")
    };

    SetResponseHeaderLayer::overriding(header::CACHE_CONTROL, cache_control).layer(ServeDir::new(dir))
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.server.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Validates the bearer token and injects `AuthContext` into request extensions
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(req.headers(), &state.keys)?;
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
