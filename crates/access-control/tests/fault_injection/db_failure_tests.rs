//! Fault injection tests for database connection loss.
//!
//! `pool.close()` makes the database unavailable to the running server.
//! Readiness must fail with a generic body while liveness keeps passing, and
//! a login that cannot reach the user store must not schedule deferred work.

use access_control_test_utils::*;
use reqwest::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use std::time::Duration;

#[sqlx::test(migrations = "../../migrations")]
async fn test_readiness_returns_503_when_db_unavailable(pool: PgPool) -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestAccessServer::spawn(pool.clone()).await?;
    let client = reqwest::Client::new();

    let response = client.get(format!("{}/ready", server.url())).send().await?;
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "Service should be ready with healthy DB"
    );

    // Act
    pool.close().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Assert
    let response = client.get(format!("{}/ready", server.url())).send().await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"].as_str(), Some("not_ready"));
    assert_eq!(body["database"].as_str(), Some("unhealthy"));

    let error_msg = body["error"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("error message should be present"))?;
    assert_eq!(error_msg, "Service dependencies unavailable");
    for leak in ["postgres", "connection", "pool"] {
        assert!(!error_msg.contains(leak), "error should not mention {leak}");
    }

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_health_stays_up_when_db_unavailable(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestAccessServer::spawn(pool.clone()).await?;

    pool.close().await;

    let response = reqwest::get(format!("{}/health", server.url())).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_with_db_unavailable_schedules_nothing(
    pool: PgPool,
) -> Result<(), anyhow::Error> {
    create_test_user(&pool, "edgar@example.com").await?;
    let server = TestAccessServer::spawn(pool.clone()).await?;

    pool.close().await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/users/login", server.url()))
        .json(&json!({ "email": "edgar@example.com", "password": TEST_PASSWORD }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(
        body["error"]["code"].as_str(),
        Some("DATABASE_ERROR"),
        "store failures must not look like a rejected login"
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.pending_tasks(), 0);
    assert!(server.sent_mail().is_empty());
    Ok(())
}
