mod common;

use axum::http::{Method, StatusCode};
use cargotracker_api::auth::Role;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn register_login_refresh_logout_cycle() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "correct-horse-battery",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert_eq!(body["data"]["role"], "customer");

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({
                "email": "alice@example.com",
                "password": "correct-horse-battery",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["message"],
        "Successfully logged you in. Welcome to CargoTracker!"
    );
    let access = body["data"]["access"].as_str().expect("access").to_string();
    let refresh = body["data"]["refresh"].as_str().expect("refresh").to_string();
    assert!(!access.is_empty());

    // The access token authenticates requests.
    let (status, _) = app
        .request(Method::GET, "/cargo", Some(&access), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    // The refresh token mints new access tokens.
    let (status, body) = app
        .request(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({"refresh": refresh})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access"].as_str().is_some());

    // Logout revokes the refresh token...
    let (status, body) = app
        .request(
            Method::POST,
            "/auth/logout",
            None,
            Some(json!({"refresh": refresh})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["message"],
        "You have been successfully logged out."
    );

    // ...after which refreshing fails and logging out again reports it.
    let (status, _) = app
        .request(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({"refresh": refresh})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/logout",
            None,
            Some(json!({"refresh": refresh})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["detail"], "You are already logged out");
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = TestApp::new().await;
    app.seed_user("alice", "alice@example.com", Role::Customer)
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({
                "email": "alice@example.com",
                "password": "wrong-password",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["errors"]["detail"]
        .as_str()
        .expect("detail")
        .contains("Invalid email or password"));
}

#[tokio::test]
async fn registration_validates_fields_and_uniqueness() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"email": "alice@example.com", "password": "pw-long-enough"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["username"], "username must be provided.");

    let payload = json!({
        "username": "alice",
        "email": "alice@example.com",
        "password": "correct-horse-battery",
    });
    let (status, _) = app
        .request(Method::POST, "/auth/register", None, Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .request(Method::POST, "/auth/register", None, Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"]["email"],
        "A user with that email address already exists."
    );
}

#[tokio::test]
async fn agent_accounts_are_created_by_admins_only() {
    let app = TestApp::new().await;
    let admin = app.seed_user("root", "root@cargotracker.io", Role::Admin).await;
    let admin_token = app.token_for(&admin).await;
    let customer = app
        .seed_user("alice", "alice@example.com", Role::Customer)
        .await;
    let customer_token = app.token_for(&customer).await;

    let payload = json!({
        "username": "agent-nbo",
        "email": "agent@cargotracker.io",
        "password": "correct-horse-battery",
    });

    let (status, _) = app
        .request(Method::POST, "/auth/agent", None, Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/agent",
            Some(&customer_token),
            Some(payload.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::POST, "/auth/agent", Some(&admin_token), Some(payload))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "agent");
}
