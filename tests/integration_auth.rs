mod common;

use axum::http::StatusCode;
use common::{create_test_user, generate_unique_email, login, send, setup_test_app, system_roles};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_login_returns_tokens_and_permissions(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": admin.email, "password": admin.password })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
    assert_eq!(body["user"]["email"], admin.email);
    assert_eq!(body["role_ids"], json!([system_roles::ADMIN]));

    let permissions = body["permissions"].as_array().unwrap();
    assert!(permissions.contains(&json!("students:write")));
    assert!(permissions.contains(&json!("payments:validate")));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_with_wrong_password(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let user = create_test_user(&mut tx, "student").await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": "wrong-password" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_with_unknown_email(pool: PgPool) {
    let app = setup_test_app(pool.clone()).await;
    let (status, _) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": generate_unique_email(), "password": "whatever123" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_inactive_account_cannot_login(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let user = create_test_user(&mut tx, "teacher").await;
    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": user.password })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Account is inactive");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_rejects_invalid_email_format(pool: PgPool) {
    let app = setup_test_app(pool.clone()).await;
    let (status, _) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "not-an-email", "password": "password123" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_refresh_token_issues_new_access_token(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let user = create_test_user(&mut tx, "teacher").await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let (_, body) = send(
        app.clone(),
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": user.email, "password": user.password })),
    )
    .await;
    let refresh_token = body["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": refresh_token })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].as_str().is_some());

    let (status, _) = send(
        app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh_token": "garbage" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_me_requires_token(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let user = create_test_user(&mut tx, "student").await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone()).await;
    let (status, _) = send(app, "GET", "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (app, token) = login(&pool, &user).await;
    let (status, body) = send(app, "GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], user.email);
    assert_eq!(body["role_ids"], json!([system_roles::STUDENT]));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_creates_user_and_action_is_audited(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let email = generate_unique_email();

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/users",
        Some(&token),
        Some(json!({
            "first_name": "Awa",
            "last_name": "Diallo",
            "email": email,
            "password": "password123",
            "role_ids": [system_roles::TEACHER]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], email);
    assert_eq!(body["role_ids"], json!([system_roles::TEACHER]));

    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/users",
        Some(&token),
        Some(json!({
            "first_name": "Awa",
            "last_name": "Diallo",
            "email": email,
            "password": "password123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        app,
        "GET",
        "/api/audit-logs?table_name=users&action=CREATE",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["details"]["email"], email);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_cannot_list_users(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let student = create_test_user(&mut tx, "student").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &student).await;
    let (status, _) = send(app, "GET", "/api/users", Some(&token), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_cannot_delete_own_account(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, _) = send(
        app,
        "DELETE",
        &format!("/api/users/{}", admin.id),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
