mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::start_server().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn login_returns_token_and_user() -> Result<()> {
    let server = common::start_server().await?;

    let res = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({ "username": "it.agent", "password": common::DEMO_PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["data"]["user"]["role"], "AgenteArea");
    assert!(body["data"]["user"].get("passwordHash").is_none());
    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_401_with_the_same_message() -> Result<()> {
    let server = common::start_server().await?;

    let mut messages = Vec::new();
    for (username, password) in [("alice", "wrong-password"), ("nobody", common::DEMO_PASSWORD)] {
        let res = server
            .client
            .post(server.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let body: Value = res.json().await?;
        assert_eq!(body["statusCode"], 401);
        messages.push(body["message"].clone());
    }
    assert_eq!(messages[0], messages[1]);
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() -> Result<()> {
    let server = common::start_server().await?;

    let res = server.client.get(server.url("/api/requests/mine")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["statusCode"], 401);

    let (status, _) = server.get("not.a.token", "/api/requests/mine").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn whoami_reflects_the_stored_user() -> Result<()> {
    let server = common::start_server().await?;
    let token = server.login("alice").await?;

    let (status, body) = server.get(&token, "/api/auth/whoami").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["role"], "Usuario");
    Ok(())
}

#[tokio::test]
async fn deactivated_users_lose_access_immediately() -> Result<()> {
    let server = common::start_server().await?;
    let root = server.login("root").await?;
    let bob = server.login("bob").await?;

    let (_, users) = server.get(&root, "/api/admin/users?role=Usuario").await?;
    let bob_id = users["data"]
        .as_array()
        .and_then(|users| users.iter().find(|u| u["username"] == "bob"))
        .and_then(|u| u["id"].as_i64())
        .expect("bob is seeded");

    let (status, _) = server
        .put(&root, &format!("/api/admin/users/{}", bob_id), json!({ "active": false }))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server.get(&bob, "/api/requests/mine").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
