mod common;

use axum::http::{Method, StatusCode};
use cargotracker_api::auth::Role;
use serde_json::{json, Value};

use common::TestApp;

async fn create_branch(
    app: &TestApp,
    token: &str,
    city: &str,
    agent_email: &str,
    main_branch: bool,
) -> (StatusCode, Value) {
    app.request(
        Method::POST,
        "/branches",
        Some(token),
        Some(json!({
            "city": city,
            "branch_agent": agent_email,
            "main_branch": main_branch,
        })),
    )
    .await
}

#[tokio::test]
async fn branch_creation_succeeds_once_per_city() {
    let app = TestApp::new().await;
    let admin = app.seed_user("root", "root@cargotracker.io", Role::Admin).await;
    let token = app.token_for(&admin).await;
    let agent = app
        .seed_user("agent-nbo", "nairobi-agent@cargotracker.io", Role::Agent)
        .await;

    let (status, body) = create_branch(&app, &token, "Nairobi", &agent.email, false).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["city"], "Nairobi");
    assert_eq!(body["data"]["branch_agent"], "nairobi-agent@cargotracker.io");
    assert_eq!(body["data"]["message"], "Successfully created the branch!");

    // Same city again, even with a fresh agent, must fail.
    let other = app
        .seed_user("agent-two", "second-agent@cargotracker.io", Role::Agent)
        .await;
    let (status, body) = create_branch(&app, &token, "Nairobi", &other.email, false).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"]["city"],
        "There already exists a branch in this city."
    );
}

#[tokio::test]
async fn at_most_one_main_branch_exists() {
    let app = TestApp::new().await;
    let admin = app.seed_user("root", "root@cargotracker.io", Role::Admin).await;
    let token = app.token_for(&admin).await;
    let first = app
        .seed_user("agent-one", "one@cargotracker.io", Role::Agent)
        .await;
    let second = app
        .seed_user("agent-two", "two@cargotracker.io", Role::Agent)
        .await;

    let (status, _) = create_branch(&app, &token, "Nairobi", &first.email, true).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = create_branch(&app, &token, "Mombasa", &second.email, true).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"]["main_branch"],
        "There can only be one main branch."
    );

    // Without the flag the second branch is fine.
    let (status, _) = create_branch(&app, &token, "Mombasa", &second.email, false).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn an_agent_holds_at_most_one_branch() {
    let app = TestApp::new().await;
    let admin = app.seed_user("root", "root@cargotracker.io", Role::Admin).await;
    let token = app.token_for(&admin).await;
    let agent = app
        .seed_user("agent-one", "one@cargotracker.io", Role::Agent)
        .await;

    let (status, _) = create_branch(&app, &token, "Nairobi", &agent.email, false).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = create_branch(&app, &token, "Kisumu", &agent.email, false).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"]["branch_agent"],
        "This agent is already assigned to another branch."
    );
}

#[tokio::test]
async fn branch_agents_must_be_staff_accounts() {
    let app = TestApp::new().await;
    let admin = app.seed_user("root", "root@cargotracker.io", Role::Admin).await;
    let token = app.token_for(&admin).await;
    let customer = app
        .seed_user("alice", "alice@example.com", Role::Customer)
        .await;

    let (status, body) = create_branch(&app, &token, "Nairobi", &customer.email, false).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"]["detail"],
        "There is no agent registered with the provided email address."
    );

    let (status, body) = app
        .request(
            Method::POST,
            "/branches",
            Some(&token),
            Some(json!({"branch_agent": null, "city": "Nairobi"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["branch_agent"], "Branches must have an agent.");
}

#[tokio::test]
async fn branch_requires_a_city() {
    let app = TestApp::new().await;
    let admin = app.seed_user("root", "root@cargotracker.io", Role::Admin).await;
    let token = app.token_for(&admin).await;
    let agent = app
        .seed_user("agent-one", "one@cargotracker.io", Role::Agent)
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/branches",
            Some(&token),
            Some(json!({"branch_agent": agent.email, "city": ""})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["city"], "Branches must have a city.");
}

#[tokio::test]
async fn branch_writes_are_admin_only_but_reads_are_open() {
    let app = TestApp::new().await;
    let agent = app
        .seed_user("agent-one", "one@cargotracker.io", Role::Agent)
        .await;
    let agent_token = app.token_for(&agent).await;

    // Anonymous read is allowed.
    let (status, body) = app.request(Method::GET, "/branches", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    // Anonymous write is not.
    let (status, _) = app
        .request(
            Method::POST,
            "/branches",
            None,
            Some(json!({"city": "Nairobi", "branch_agent": agent.email})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Neither is a staff write below admin.
    let (status, _) = create_branch(&app, &agent_token, "Nairobi", &agent.email, false).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn city_search_is_case_insensitive_substring() {
    let app = TestApp::new().await;
    let admin = app.seed_user("root", "root@cargotracker.io", Role::Admin).await;
    let token = app.token_for(&admin).await;
    let first = app
        .seed_user("agent-one", "one@cargotracker.io", Role::Agent)
        .await;
    let second = app
        .seed_user("agent-two", "two@cargotracker.io", Role::Agent)
        .await;

    create_branch(&app, &token, "Nairobi", &first.email, false).await;
    create_branch(&app, &token, "Mombasa", &second.email, false).await;

    let (status, body) = app
        .request(Method::GET, "/branches/search?city=NAIR", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let hits = body["data"].as_array().expect("array");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["city"], "Nairobi");

    // An empty query matches nothing.
    let (status, body) = app
        .request(Method::GET, "/branches/search?city=", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (_, body) = app.request(Method::GET, "/branches", None, None).await;
    assert_eq!(body["data"].as_array().expect("array").len(), 2);
}
