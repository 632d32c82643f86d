//! Integration tests for the health probes and metrics endpoint.

use access_control_test_utils::TestAccessServer;
use reqwest::StatusCode;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
async fn test_health_endpoint_returns_ok(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestAccessServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_ready_endpoint_reports_healthy_database(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestAccessServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"].as_str(), Some("ready"));
    assert_eq!(body["database"].as_str(), Some("healthy"));
    assert!(body.get("error").is_none());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_metrics_endpoint_is_public(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestAccessServer::spawn(pool).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}
