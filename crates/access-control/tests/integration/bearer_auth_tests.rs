//! Integration tests for bearer token enforcement on protected routes.

use access_control_test_utils::*;
use reqwest::StatusCode;
use sqlx::PgPool;

const PROTECTED: [&str; 2] = ["/api/users", "/api/logs"];

async fn status_with(
    server: &TestAccessServer,
    path: &str,
    token: Option<String>,
) -> Result<StatusCode, anyhow::Error> {
    let mut request = reqwest::Client::new().get(format!("{}{}", server.url(), path));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    Ok(request.send().await?.status())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_protected_routes_require_token(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestAccessServer::spawn(pool).await?;

    for path in PROTECTED {
        assert_eq!(
            status_with(&server, path, None).await?,
            StatusCode::UNAUTHORIZED,
            "{path} without a token"
        );
        assert_eq!(
            status_with(&server, path, Some(server.bearer_token())).await?,
            StatusCode::OK,
            "{path} with a valid token"
        );
    }
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_expired_token_rejected(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestAccessServer::spawn(pool).await?;
    let expired = TestTokenBuilder::new().expired_seconds_ago(60).build();

    assert_eq!(
        status_with(&server, "/api/users", Some(expired)).await?,
        StatusCode::UNAUTHORIZED
    );
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_token_for_other_audience_or_issuer_rejected(
    pool: PgPool,
) -> Result<(), anyhow::Error> {
    let server = TestAccessServer::spawn(pool).await?;
    let wrong_audience = TestTokenBuilder::new()
        .with_audience("someone-else")
        .build();
    let wrong_issuer = TestTokenBuilder::new().with_issuer("impostor").build();

    assert_eq!(
        status_with(&server, "/api/users", Some(wrong_audience)).await?,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        status_with(&server, "/api/users", Some(wrong_issuer)).await?,
        StatusCode::UNAUTHORIZED
    );
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_token_with_wrong_signature_rejected(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestAccessServer::spawn(pool).await?;
    let forged = TestTokenBuilder::new()
        .signed_with(b"not-the-server-signing-key-0123456789")
        .build();

    let response = reqwest::Client::new()
        .get(format!("{}/api/logs", server.url()))
        .bearer_auth(forged)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"].as_str(), Some("INVALID_TOKEN"));
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_token_from_login_opens_protected_routes(pool: PgPool) -> Result<(), anyhow::Error> {
    create_test_user(&pool, "alan@example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;

    let token = server.login("alan@example.com", TEST_PASSWORD).await?;

    assert_eq!(
        status_with(&server, "/api/users", Some(token)).await?,
        StatusCode::OK
    );
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_public_routes_need_no_token(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestAccessServer::spawn(pool).await?;

    for path in ["/health", "/ready", "/metrics"] {
        assert_eq!(
            status_with(&server, path, None).await?,
            StatusCode::OK,
            "{path}"
        );
    }
    Ok(())
}
