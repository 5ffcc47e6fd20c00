mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client.get(server.url("/health")).send().await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn register_then_login_returns_usable_token() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.register("alice", "pw1").await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], true);
    assert!(body["data"]["account_id"].is_i64(), "{}", body);

    let login = server.login("alice", "pw1").await?;
    assert_eq!(login["success"], true);
    assert_eq!(login["data"]["expires_in"].as_i64().map(|s| s > 0 && s <= 600), Some(true));

    let token = login["data"]["token"].as_str().unwrap_or_default();
    let res = server.client.get(server.url("/todos")).bearer_auth(token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn duplicate_username_conflicts() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.register("alice", "pw1").await?;

    let res = server.register("alice", "another").await?;

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], "CONFLICT");

    // The original password still works, so nothing was overwritten
    assert_eq!(server.login("alice", "pw1").await?["success"], true);
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_user_fail_identically() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.register("alice", "pw1").await?;

    let wrong_password = server.login("alice", "wrong").await?;
    let unknown_user = server.login("nobody", "pw1").await?;

    assert_eq!(wrong_password["success"], false);
    assert_eq!(wrong_password, unknown_user);
    assert!(!wrong_password.to_string().contains("wrong"));
    Ok(())
}

#[tokio::test]
async fn invalid_username_is_a_validation_error() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.register("a b", "pw1").await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["username"].is_string(), "{}", body);
    Ok(())
}

#[tokio::test]
async fn missing_fields_are_rejected() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .client
        .post(server.url("/auth/register"))
        .json(&json!({ "username": "alice" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["code"], "INVALID_JSON");
    Ok(())
}

#[tokio::test]
async fn mistyped_password_is_not_echoed() -> Result<()> {
    let server = TestServer::spawn().await?;

    for path in ["/auth/register", "/auth/login"] {
        let res = server
            .client
            .post(server.url(path))
            .json(&json!({ "username": "alice", "password": 987654321 }))
            .send()
            .await?;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{path}");
        let body = res.text().await?;
        assert!(!body.contains("987654321"), "{path} echoed the password: {body}");
        assert!(body.contains("INVALID_JSON"), "{path}: {body}");
    }
    Ok(())
}

#[tokio::test]
async fn malformed_login_body_is_not_echoed() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .client
        .post(server.url("/auth/login"))
        .header("content-type", "application/json")
        .body(r#"{"username": "alice", "password": "hunter2"#)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(!res.text().await?.contains("hunter2"));
    Ok(())
}

#[tokio::test]
async fn logout_revokes_the_token() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.session("alice", "pw1").await?;

    let res = server.client.get(server.url("/auth/logout")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["revoked"], true);

    let res = server.client.get(server.url("/todos")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // A fresh login still works
    assert_eq!(server.login("alice", "pw1").await?["success"], true);
    Ok(())
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client.get(server.url("/todos")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/todos"))
        .header("Authorization", "Token abc")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
