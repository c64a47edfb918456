/// Integration tests for the Gatehouse API
///
/// These drive the full router in-process:
/// - Authentication (missing and invalid tokens, signup, login, refresh)
/// - Organization ownership
/// - Building an RBAC graph over HTTP and checking `/authorize`
/// - Update and delete conventions (payload id, idempotent delete)
///
/// Tests marked `#[ignore]` need PostgreSQL in `DATABASE_URL`:
/// `cargo test -p gatehouse-api --test integration_test -- --ignored`

mod common;

use axum::http::{Method, StatusCode};
use common::{create_user, offline_app, send, TestContext};
use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = offline_app();

    let (status, body) = send(&app, Method::GET, "/api/v1/organizations", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["message"], "Missing credentials");
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let app = offline_app();

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/authorize?resource=front-door",
        Some("not-a-jwt"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_refresh_rejects_garbage() {
    let app = offline_app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/refresh",
        None,
        Some(json!({ "refresh_token": "garbage" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = offline_app();
    let access = common::access_token(Uuid::new_v4());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/refresh",
        None,
        Some(json!({ "refresh_token": access })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = offline_app();

    let (status, _) = send(&app, Method::GET, "/api/v2/anything", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_health_check() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = send(&ctx.app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_signup_login_refresh_flow() {
    let ctx = TestContext::new().await.unwrap();
    let suffix = &Uuid::new_v4().simple().to_string()[..12];
    let username = format!("ada-{}", suffix);
    let password = "C0mpl3x#Pwd";

    let (status, body) = send(
        &ctx.app,
        Method::POST,
        "/api/v1/signup",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": password,
            "name": "Ada"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let user_id = body["user_id"].as_str().unwrap().to_string();
    assert!(body["access_token"].is_string());
    assert_eq!(body["token_type"], "Bearer");

    // Same username again
    let (status, _) = send(
        &ctx.app,
        Method::POST,
        "/api/v1/signup",
        None,
        Some(json!({
            "username": username,
            "email": format!("other-{}@example.com", suffix),
            "password": password
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &ctx.app,
        Method::POST,
        "/api/v1/login",
        None,
        Some(json!({ "login": username, "password": "Wr0ng#Password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Login by email
    let (status, body) = send(
        &ctx.app,
        Method::POST,
        "/api/v1/login",
        None,
        Some(json!({ "login": format!("{}@example.com", username), "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user_id.as_str());

    let access = body["access_token"].as_str().unwrap().to_string();
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &ctx.app,
        Method::POST,
        "/api/v1/refresh",
        None,
        Some(json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    // Signup created a profile
    let uri = format!("/api/v1/users/{}/profile", user_id);
    let (status, body) = send(&ctx.app, Method::GET, &uri, Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada");

    let uri = format!("/api/v1/users/{}", user_id);
    let (status, _) = send(&ctx.app, Method::DELETE, &uri, Some(&access), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_weak_password_rejected() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = send(
        &ctx.app,
        Method::POST,
        "/api/v1/signup",
        None,
        Some(json!({
            "username": "weakling",
            "email": "weakling@example.com",
            "password": "password1"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "password");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_organization_of_another_user_is_forbidden() {
    let ctx = TestContext::new().await.unwrap();
    let stranger = create_user(&ctx.db, "stranger").await.unwrap();
    let stranger_token = common::access_token(stranger.id);

    let uri = format!("/api/v1/organizations/{}", ctx.organization.id);
    let (status, _) = send(&ctx.app, Method::GET, &uri, Some(&stranger_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/v1/organizations/{}/resources", ctx.organization.id);
    let (status, _) = send(&ctx.app, Method::GET, &uri, Some(&stranger_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // By name the organization is simply not among the stranger's
    let uri = format!("/api/v1/organizations/{}", ctx.organization.name);
    let (status, _) = send(&ctx.app, Method::GET, &uri, Some(&stranger_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx.send(Method::GET, &format!("/api/v1/organizations/{}", ctx.organization.name), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], ctx.organization.id.to_string());

    gatehouse_shared::models::user::User::delete(&ctx.db, stranger.id)
        .await
        .unwrap();
    ctx.cleanup().await.unwrap();
}

async fn create(ctx: &TestContext, path: &str, body: Value) -> Value {
    let (status, body) = ctx.send(Method::POST, &ctx.org_uri(path), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "POST {}: {}", path, body);
    body
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_rbac_graph_and_authorize() {
    let ctx = TestContext::new().await.unwrap();
    let tag = format!("door-{}", &Uuid::new_v4().simple().to_string()[..12]);

    let resource = create(&ctx, "resources", json!({ "name": "front_door", "tag": tag })).await;
    create(&ctx, "permissions", json!({ "name": "open" })).await;
    create(&ctx, "roles", json!({ "name": "doorman" })).await;

    // Edges by name
    let grant = create(
        &ctx,
        "resource-permissions",
        json!({ "resource": "front_door", "permission": "open" }),
    )
    .await;
    assert_eq!(grant["name"], "front_door:open");

    let role_grant = create(
        &ctx,
        "role-permissions",
        json!({ "role": "doorman", "permission": "open" }),
    )
    .await;

    let authorize_uri = format!("/api/v1/authorize?resource={}", tag);
    let (status, body) = ctx.send(Method::GET, &authorize_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);

    create(
        &ctx,
        "user-roles",
        json!({ "user": ctx.user.username, "role": "doorman" }),
    )
    .await;

    let (_, body) = ctx.send(Method::GET, &authorize_uri, None).await;
    assert_eq!(body["allowed"], true);
    assert_eq!(body["resource"]["tag"], tag.as_str());
    assert_eq!(body["user_id"], ctx.user.id.to_string());

    let by_id = format!("/api/v1/authorize?resource={}", resource["id"].as_str().unwrap());
    let (_, body) = ctx.send(Method::GET, &by_id, None).await;
    assert_eq!(body["allowed"], true);

    let (status, body) = ctx
        .send(Method::GET, &format!("/api/v1/users/{}/permissions", ctx.user.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["permission_ids"].as_array().unwrap().len(), 1);
    assert_eq!(body["permissions"][0]["name"], "open");

    let (status, body) = ctx
        .send(Method::GET, &ctx.org_uri("resources/front_door/permissions"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["permissions"][0]["name"], "open");

    // Revoking the role's permission revokes access
    let uri = ctx.org_uri(&format!("role-permissions/{}", role_grant["id"].as_str().unwrap()));
    let (status, _) = ctx.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = ctx.send(Method::GET, &authorize_uri, None).await;
    assert_eq!(body["allowed"], false);

    // Unknown resources are not an error
    let (status, body) = ctx
        .send(Method::GET, "/api/v1/authorize?resource=no-such-door", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_update_conventions() {
    let ctx = TestContext::new().await.unwrap();

    let role = create(&ctx, "roles", json!({ "name": "auditor" })).await;
    let role_id = role["id"].as_str().unwrap();
    let uri = ctx.org_uri(&format!("roles/{}", role_id));

    // Payload naming another entity
    let (status, _) = ctx
        .send(Method::PUT, &uri, Some(json!({ "id": Uuid::new_v4(), "name": "x" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // No changes: same row back
    let (status, body) = ctx.send(Method::PUT, &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated_at"], role["updated_at"]);

    let (status, body) = ctx
        .send(Method::PUT, &uri, Some(json!({ "id": role_id, "description": "Read-only" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "Read-only");
    assert_eq!(body["name"], "auditor");
    assert_eq!(body["updated_by_id"], ctx.user.id.to_string());

    // Renamed role resolves by its new name
    let (status, _) = ctx
        .send(Method::PUT, &uri, Some(json!({ "name": "inspector" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = ctx.send(Method::GET, &ctx.org_uri("roles/inspector"), None).await;
    assert_eq!(status, StatusCode::OK);

    // Delete is idempotent
    let (status, _) = ctx.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = ctx.send(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = ctx.send(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_resource_tag_rules() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx
        .send(
            Method::POST,
            &ctx.org_uri("resources"),
            Some(json!({ "name": "vault", "tag": Uuid::new_v4().to_string() })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let tag = format!("vault-{}", &Uuid::new_v4().simple().to_string()[..12]);
    let vault = create(&ctx, "resources", json!({ "name": "vault", "tag": tag })).await;

    let (status, body) = ctx.send(Method::GET, &ctx.org_uri("resources/vault"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], vault["id"]);
    assert_eq!(body["tag"], tag.as_str());

    // Tags are unique within an organization
    let (status, _) = ctx
        .send(
            Method::POST,
            &ctx.org_uri("resources"),
            Some(json!({ "name": "vault-2", "tag": tag })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // A padded tag could never be looked up
    let (status, _) = ctx
        .send(
            Method::POST,
            &ctx.org_uri("resources"),
            Some(json!({ "name": "vault-3", "tag": " padded " })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx
        .send(Method::PUT, &ctx.org_uri("resources/vault"), Some(json!({ "tag": "vault " })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // null clears the tag; an absent field leaves it alone
    let (status, body) = ctx
        .send(Method::PUT, &ctx.org_uri("resources/vault"), Some(json!({ "description": "Main" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tag"], tag.as_str());

    let (status, body) = ctx
        .send(Method::PUT, &ctx.org_uri("resources/vault"), Some(json!({ "tag": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["tag"].is_null());
    assert_eq!(body["description"], "Main");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_plan_and_subscription() {
    let ctx = TestContext::new().await.unwrap();
    let plan_name = format!("pro-{}", &Uuid::new_v4().simple().to_string()[..12]);

    let (status, plan) = ctx
        .send(
            Method::POST,
            "/api/v1/plans",
            Some(json!({ "name": plan_name, "price_cents": 1500, "currency": "eur", "period_days": 30 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", plan);
    assert_eq!(plan["currency"], "EUR");

    // Periods are capped so subscription end dates stay representable
    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/v1/plans",
            Some(json!({ "name": format!("{}-x", plan_name), "price_cents": 1, "period_days": i32::MAX })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let plan_uri = format!("/api/v1/plans/{}", plan_name);
    let (status, _) = ctx
        .send(Method::PUT, &plan_uri, Some(json!({ "period_days": 36501 })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let uri = format!("/api/v1/users/{}/subscriptions", ctx.user.id);
    let (status, subscription) = ctx
        .send(Method::POST, &uri, Some(json!({ "plan": plan_name })))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", subscription);
    assert_eq!(subscription["name"], plan_name.as_str());

    let (status, list) = ctx.send(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    // Plan still in use
    let (status, _) = ctx.send(Method::DELETE, &plan_uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let sub_uri = format!("/api/v1/subscriptions/{}", subscription["id"].as_str().unwrap());
    let (status, _) = ctx.send(Method::DELETE, &sub_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.send(Method::DELETE, &plan_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL
async fn test_typed_properties() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx
        .send(Method::POST, "/api/v1/properties-sets", Some(json!({ "name": "limits" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = "/api/v1/properties-sets/limits/properties";
    let (status, _) = ctx
        .send(
            Method::POST,
            uri,
            Some(json!({ "name": "max_doors", "property_type": "integer", "value": "twelve" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = ctx
        .send(
            Method::POST,
            uri,
            Some(json!({ "name": "max_doors", "property_type": "integer", "value": "12" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, body) = ctx
        .send(Method::GET, "/api/v1/properties-sets/limits/properties/max_doors", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "12");

    ctx.cleanup().await.unwrap();
}
