//! Integration tests for the protected user management endpoints.

use access_control::models::UserResponse;
use access_control_test_utils::*;
use reqwest::StatusCode;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
async fn test_register_then_login(pool: PgPool) -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestAccessServer::spawn(pool).await?;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(format!("{}/api/users/register", server.url()))
        .bearer_auth(server.bearer_token())
        .json(&json!({
            "first_name": "Frances",
            "last_name": "Allen",
            "email": "frances@example.com",
            "password": "Optim1zing-Compilers"
        }))
        .send()
        .await?;

    // Assert
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: UserResponse = response.json().await?;
    assert_eq!(created.email, "frances@example.com");
    assert_eq!(created.first_name, "Frances");

    let token = server
        .login("frances@example.com", "Optim1zing-Compilers")
        .await?;
    token
        .assert_for_subject(&created.id.to_string())
        .assert_names("Frances", "Allen");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_register_response_has_no_password_fields(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestAccessServer::spawn(pool).await?;

    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/api/users/register", server.url()))
        .bearer_auth(server.bearer_token())
        .json(&json!({
            "first_name": "Radia",
            "last_name": "Perlman",
            "email": "radia@example.com",
            "password": "Spanning-Tr3e"
        }))
        .send()
        .await?
        .json()
        .await?;

    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
    assert!(body.get("normalized_email").is_none());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_register_weak_password_rejected(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestAccessServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/users/register", server.url()))
        .bearer_auth(server.bearer_token())
        .json(&json!({
            "first_name": "Weak",
            "last_name": "Password",
            "email": "weak@example.com",
            "password": "password"
        }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"].as_str(), Some("INVALID_REQUEST"));
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_register_duplicate_email_conflicts(pool: PgPool) -> Result<(), anyhow::Error> {
    create_test_user(&pool, "taken@example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/users/register", server.url()))
        .bearer_auth(server.bearer_token())
        .json(&json!({
            "first_name": "Second",
            "last_name": "Account",
            "email": "TAKEN@example.com",
            "password": "Another-Passw0rd"
        }))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_and_get_users(pool: PgPool) -> Result<(), anyhow::Error> {
    let alice = create_named_test_user(&pool, "Alice", "Adams", "alice@example.com").await?;
    create_named_test_user(&pool, "Bob", "Brown", "bob@example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;
    let client = reqwest::Client::new();

    let users: Vec<UserResponse> = client
        .get(format!("{}/api/users", server.url()))
        .bearer_auth(server.bearer_token())
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(users.len(), 2);

    let alice_token = TestTokenBuilder::new()
        .for_user(alice.id)
        .with_names("Alice", "Adams")
        .build();
    let fetched: UserResponse = client
        .get(format!("{}/api/users/{}", server.url(), alice.id))
        .bearer_auth(alice_token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(fetched.id, alice.id);
    assert_eq!(fetched.last_name, "Adams");

    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_user_changes_name_and_password(pool: PgPool) -> Result<(), anyhow::Error> {
    let user = create_test_user(&pool, "joan@example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;
    let client = reqwest::Client::new();

    let response = client
        .put(format!("{}/api/users/{}", server.url(), user.id))
        .bearer_auth(server.bearer_token())
        .json(&json!({ "first_name": "Joan", "new_password": "Cl4rke-Compiler" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let fetched: UserResponse = client
        .get(format!("{}/api/users/{}", server.url(), user.id))
        .bearer_auth(server.bearer_token())
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(fetched.first_name, "Joan");
    assert_eq!(fetched.last_name, "User");

    let old_password = server.login("joan@example.com", TEST_PASSWORD).await;
    assert!(old_password.is_err());
    server.login("joan@example.com", "Cl4rke-Compiler").await?;
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_user(pool: PgPool) -> Result<(), anyhow::Error> {
    let user = create_test_user(&pool, "gone@example.com").await?;
    let server = TestAccessServer::spawn(pool).await?;
    let client = reqwest::Client::new();
    let url = format!("{}/api/users/{}", server.url(), user.id);

    let response = client
        .delete(&url)
        .bearer_auth(server.bearer_token())
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(&url)
        .bearer_auth(server.bearer_token())
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let login = server.login("gone@example.com", TEST_PASSWORD).await;
    assert!(login.is_err());
    Ok(())
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_unknown_user_is_not_found(pool: PgPool) -> Result<(), anyhow::Error> {
    let server = TestAccessServer::spawn(pool).await?;
    let client = reqwest::Client::new();
    let url = format!("{}/api/users/{}", server.url(), TEST_MISSING_ID);

    let get = client
        .get(&url)
        .bearer_auth(server.bearer_token())
        .send()
        .await?;
    let put = client
        .put(&url)
        .bearer_auth(server.bearer_token())
        .json(&json!({ "last_name": "Nobody" }))
        .send()
        .await?;
    let delete = client
        .delete(&url)
        .bearer_auth(server.bearer_token())
        .send()
        .await?;

    assert_eq!(get.status(), StatusCode::NOT_FOUND);
    assert_eq!(put.status(), StatusCode::NOT_FOUND);
    assert_eq!(delete.status(), StatusCode::NOT_FOUND);
    Ok(())
}
