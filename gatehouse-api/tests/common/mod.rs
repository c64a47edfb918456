//! Common test utilities for integration tests
//!
//! - Test database setup (migrations applied once per context)
//! - Test user and organization creation
//! - JWT token generation
//! - Request helpers for driving the router in-process
//!
//! Tests using [`TestContext`] need a PostgreSQL database in `DATABASE_URL`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use gatehouse_api::{
    app::{build_router, AppState},
    config::Config,
};
use gatehouse_shared::{
    auth::jwt::{create_token, Claims, JwtKeys, TokenType},
    db::migrations::run_migrations,
    models::{
        organization::{CreateOrganization, Organization},
        user::{CreateUser, User},
    },
};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Config pointing at `DATABASE_URL`
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.database.url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgresql://localhost/gatehouse_test".to_string());
    config.jwt.secret = TEST_SECRET.to_string();
    config
}

pub fn test_keys() -> JwtKeys {
    JwtKeys::from_secret(TEST_SECRET, "gatehouse").unwrap()
}

/// Router over a lazily connected pool; fine for requests that never reach the database
pub fn offline_app() -> Router {
    let config = test_config();
    let db = PgPool::connect_lazy(&config.database.url).unwrap();
    build_router(AppState::new(db, config, test_keys()))
}

/// Access token for `user_id`
pub fn access_token(user_id: Uuid) -> String {
    let claims = Claims::new(user_id, "gatehouse", TokenType::Access);
    create_token(&claims, &test_keys()).unwrap()
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub user: User,
    pub organization: Organization,
    pub jwt_token: String,
}

impl TestContext {
    /// Connects, migrates, and creates a user owning one organization
    pub async fn new() -> anyhow::Result<Self> {
        let config = test_config();
        let db = PgPool::connect(&config.database.url).await?;
        run_migrations(&db).await?;

        let user = create_user(&db, "owner").await?;

        let organization = Organization::create(
            &db,
            CreateOrganization {
                owner_id: user.id,
                name: format!("org-{}", Uuid::new_v4().simple()),
                description: Some("Integration test organization".to_string()),
            },
            Some(user.id),
        )
        .await?;

        let jwt_token = access_token(user.id);
        let app = build_router(AppState::new(db.clone(), config, test_keys()));

        Ok(TestContext {
            db,
            app,
            user,
            organization,
            jwt_token,
        })
    }

    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.jwt_token)
    }

    /// Sends a request as the context user
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send(&self.app, method, uri, Some(&self.jwt_token), body).await
    }

    /// `/api/v1/organizations/<org>/<path>`
    pub fn org_uri(&self, path: &str) -> String {
        format!("/api/v1/organizations/{}/{}", self.organization.id, path)
    }

    /// Deletes the test user; everything it owns cascades
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        User::delete(&self.db, self.user.id).await?;
        Ok(())
    }
}

/// Creates a user with a unique username and a placeholder hash
pub async fn create_user(db: &PgPool, prefix: &str) -> anyhow::Result<User> {
    let suffix = Uuid::new_v4().simple().to_string();
    let user = User::create(
        db,
        CreateUser {
            username: format!("{}-{}", prefix, &suffix[..12]),
            email: format!("{}-{}@example.com", prefix, suffix),
            password_hash: "test_hash".to_string(),
        },
        None,
    )
    .await?;

    Ok(user)
}

/// Drives one request through `app`, returning the status and JSON body
///
/// Empty bodies come back as `Value::Null`.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    (status, json)
}
