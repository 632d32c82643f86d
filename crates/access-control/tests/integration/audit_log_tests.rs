//! Integration tests for the audit log endpoints.

use access_control::models::AuditLogResponse;
use access_control::services::audit_service::EVENT_LOGIN_SUCCEEDED;
use access_control_test_utils::*;
use reqwest::StatusCode;
use sqlx::PgPool;
use std::time::Duration;

#[sqlx::test(migrations = "../../migrations")]
async fn test_logs_list_login_events_with_user(pool: PgPool) -> Result<(), anyhow::Error> {
    // Arrange
    let user = create_named_test_user(&pool, "Hedy", "Lamarr", "hedy@example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;
    server.login("hedy@example.com", TEST_PASSWORD).await?;
    server.wait_for_audit_logs(1, Duration::from_secs(5)).await?;

    // Act
    let logs: Vec<AuditLogResponse> = reqwest::Client::new()
        .get(format!("{}/api/logs", server.url()))
        .bearer_auth(server.bearer_token())
        .send()
        .await?
        .json()
        .await?;

    // Assert
    assert_eq!(logs.len(), 1);
    let entry = logs.first().ok_or_else(|| anyhow::anyhow!("no log entry"))?;
    assert_eq!(entry.event_name, EVENT_LOGIN_SUCCEEDED);
    assert_eq!(entry.email, "hedy@example.com");
    let summary = entry
        .user
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("entry has no user summary"))?;
    assert_eq!(summary.id, user.id);
    assert_eq!(summary.first_name, "Hedy");
    assert_eq!(summary.last_name, "Lamarr");
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_single_log_entry(pool: PgPool) -> Result<(), anyhow::Error> {
    create_test_user(&pool, "katherine@example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;
    server.login("katherine@example.com", TEST_PASSWORD).await?;
    let entries = server.wait_for_audit_logs(1, Duration::from_secs(5)).await?;
    let id = entries
        .first()
        .map(|e| e.id)
        .ok_or_else(|| anyhow::anyhow!("no audit entry"))?;
    let client = reqwest::Client::new();

    let entry: AuditLogResponse = client
        .get(format!("{}/api/logs/{}", server.url(), id))
        .bearer_auth(server.bearer_token())
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(entry.id, id);

    let missing = client
        .get(format!("{}/api/logs/{}", server.url(), TEST_MISSING_ID))
        .bearer_auth(server.bearer_token())
        .send()
        .await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_log_survives_user_deletion(pool: PgPool) -> Result<(), anyhow::Error> {
    let user = create_test_user(&pool, "mary@example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;
    server.login("mary@example.com", TEST_PASSWORD).await?;
    server.wait_for_audit_logs(1, Duration::from_secs(5)).await?;
    let client = reqwest::Client::new();

    client
        .delete(format!("{}/api/users/{}", server.url(), user.id))
        .bearer_auth(server.bearer_token())
        .send()
        .await?;

    let body: serde_json::Value = client
        .get(format!("{}/api/logs", server.url()))
        .bearer_auth(server.bearer_token())
        .send()
        .await?
        .json()
        .await?;
    let entries = body
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("expected an array"))?;
    assert_eq!(entries.len(), 1);
    let entry = entries.first().ok_or_else(|| anyhow::anyhow!("no entry"))?;
    assert_eq!(entry["email"].as_str(), Some("mary@example.com"));
    assert!(entry.get("user").is_none());
    Ok(())
}
