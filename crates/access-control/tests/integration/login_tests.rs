//! Integration tests for `POST /api/users/login` and the deferred work it
//! schedules.

use access_control::services::audit_service::EVENT_LOGIN_SUCCEEDED;
use access_control_test_utils::*;
use reqwest::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

async fn post_login(
    server: &TestAccessServer,
    email: &str,
    password: &str,
) -> Result<reqwest::Response, anyhow::Error> {
    let response = reqwest::Client::new()
        .post(format!("{}/api/users/login", server.url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    Ok(response)
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_success_returns_token(pool: PgPool) -> Result<(), anyhow::Error> {
    // Arrange
    let user = create_named_test_user(&pool, "Ada", "Lovelace", "ada@example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;

    // Act
    let response = post_login(&server, "ada@example.com", TEST_PASSWORD).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    let token = body["token"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("response has no token"))?
        .to_string();
    assert!(body["expires_at"].is_string());

    token
        .assert_valid_jwt()
        .assert_for_subject(&user.id.to_string())
        .assert_names("Ada", "Lovelace")
        .assert_lifetime_hours(1);

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_success_records_audit_and_sends_notification(
    pool: PgPool,
) -> Result<(), anyhow::Error> {
    let user = create_test_user(&pool, "grace@example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;

    server.login("grace@example.com", TEST_PASSWORD).await?;

    let entries = server.wait_for_audit_logs(1, WAIT).await?;
    assert_eq!(entries.len(), 1);
    let entry = entries
        .first()
        .ok_or_else(|| anyhow::anyhow!("no audit entry"))?;
    assert_eq!(entry.event_name, EVENT_LOGIN_SUCCEEDED);
    assert_eq!(entry.user_id, Some(user.id));
    assert_eq!(entry.email, "grace@example.com");
    assert!(entry.detail.contains("grace@example.com"));

    let mail = server.wait_for_mail(1, WAIT).await?;
    assert_eq!(mail.len(), 1);
    let notification = mail.first().ok_or_else(|| anyhow::anyhow!("no mail"))?;
    assert_eq!(notification.to, "grace@example.com");
    assert_eq!(
        notification.subject,
        server.config().login_notification.subject
    );

    assert_eq!(server.pending_tasks(), 0);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_email_is_case_insensitive(pool: PgPool) -> Result<(), anyhow::Error> {
    let user = create_test_user(&pool, "Linus@Example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;

    let token = server.login("  linus@EXAMPLE.com ", TEST_PASSWORD).await?;

    token.assert_for_subject(&user.id.to_string());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_rejections_are_indistinguishable(pool: PgPool) -> Result<(), anyhow::Error> {
    create_test_user(&pool, "ken@example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;

    let unknown = post_login(&server, "nobody@example.com", TEST_PASSWORD).await?;
    let unknown_status = unknown.status();
    let unknown_body: serde_json::Value = unknown.json().await?;

    let wrong = post_login(&server, "ken@example.com", "Wrong-Password-1").await?;
    let wrong_status = wrong.status();
    let wrong_body: serde_json::Value = wrong.json().await?;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_body, wrong_body);
    assert_eq!(
        unknown_body["error"]["code"].as_str(),
        Some("INVALID_CREDENTIALS")
    );

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_rejected_login_schedules_no_work(pool: PgPool) -> Result<(), anyhow::Error> {
    create_test_user(&pool, "dennis@example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;

    post_login(&server, "dennis@example.com", "Not-The-Password-9").await?;
    post_login(&server, "brian@example.com", TEST_PASSWORD).await?;

    // Give any stray work a chance to run before asserting on its absence.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(server.wait_for_audit_logs(1, Duration::ZERO).await.is_err());
    assert!(server.sent_mail().is_empty());
    assert_eq!(server.pending_tasks(), 0);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_without_signing_key_is_configuration_error(
    pool: PgPool,
) -> Result<(), anyhow::Error> {
    create_test_user(&pool, "barbara@example.com").await?;
    let mut config = test_config();
    config.jwt.signing_key = common::secret::SecretString::from(String::new());
    let server = TestAccessServer::spawn_with_config(pool, config).await?;

    let response = post_login(&server, "barbara@example.com", TEST_PASSWORD).await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"].as_str(), Some("CONFIGURATION_ERROR"));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(server.sent_mail().is_empty());
    assert_eq!(server.pending_tasks(), 0);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_login_with_malformed_body_is_rejected(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestAccessServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/users/login", server.url()))
        .json(&json!({ "email": "missing-password@example.com" }))
        .send()
        .await?;

    assert!(response.status().is_client_error());
    assert_eq!(server.pending_tasks(), 0);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_each_login_schedules_its_own_work(pool: PgPool) -> Result<(), anyhow::Error> {
    create_test_user(&pool, "margaret@example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;

    for _ in 0..3 {
        server.login("margaret@example.com", TEST_PASSWORD).await?;
    }

    let entries = server.wait_for_audit_logs(3, WAIT).await?;
    let mail = server.wait_for_mail(3, WAIT).await?;
    assert_eq!(entries.len(), 3);
    assert_eq!(mail.len(), 3);
    Ok(())
}
