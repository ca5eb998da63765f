mod common;

use axum::http::StatusCode;
use common::{create_test_user, login, send, system_roles};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_announcement_lifecycle(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let student = create_test_user(&mut tx, "student").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, draft) = send(
        app.clone(),
        "POST",
        "/api/announcements",
        Some(&token),
        Some(json!({
            "title": "Campus closed",
            "content": "The campus is closed on Friday.",
            "kind": "URGENT"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(draft["status"], "DRAFT");
    assert_eq!(draft["author_id"], json!(admin.id));
    let id = draft["id"].as_str().unwrap();

    let (student_app, student_token) = login(&pool, &student).await;
    let (_, published) = send(
        student_app.clone(),
        "GET",
        "/api/announcements/published",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(published.as_array().unwrap().len(), 0);

    let publish_uri = format!("/api/announcements/{}/publish", id);
    let (status, live) = send(app.clone(), "POST", &publish_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(live["status"], "PUBLISHED");
    assert!(live["published_at"].as_str().is_some());

    let (status, body) = send(app.clone(), "POST", &publish_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Announcement is already published");

    let (_, urgent) = send(
        student_app.clone(),
        "GET",
        "/api/announcements/urgent",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(urgent.as_array().unwrap().len(), 1);

    let (status, _) = send(
        student_app,
        "POST",
        "/api/announcements",
        Some(&student_token),
        Some(json!({ "title": "Party", "content": "Tonight" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, archived) = send(
        app,
        "POST",
        &format!("/api/announcements/{}/archive", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(archived["status"], "ARCHIVED");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_broadcast_reaches_active_role_members(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let first = create_test_user(&mut tx, "student").await;
    let second = create_test_user(&mut tx, "student").await;
    let inactive = create_test_user(&mut tx, "student").await;
    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(inactive.id)
        .execute(&mut *tx)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/notifications/broadcast",
        Some(&token),
        Some(json!({
            "role_id": system_roles::STUDENT,
            "title": "Exam timetable",
            "message": "The exam timetable is online.",
            "category": "timetable"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["recipients"], 2);
    assert_eq!(body["sent"], 2);

    let (status, _) = send(
        app,
        "POST",
        "/api/notifications/broadcast",
        Some(&token),
        Some(json!({ "title": "Nobody", "message": "No audience" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (first_app, first_token) = login(&pool, &first).await;
    let (_, mine) = send(
        first_app.clone(),
        "GET",
        "/api/notifications/mine",
        Some(&first_token),
        None,
    )
    .await;
    assert_eq!(mine["meta"]["total"], 1);
    assert_eq!(mine["data"][0]["is_read"], false);
    let notification_id = mine["data"][0]["id"].as_str().unwrap().to_string();

    let (second_app, second_token) = login(&pool, &second).await;
    let (status, _) = send(
        second_app,
        "POST",
        &format!("/api/notifications/{}/read", notification_id),
        Some(&second_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, marked) = send(
        first_app.clone(),
        "POST",
        "/api/notifications/read-all",
        Some(&first_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["updated"], 1);

    let (_, unread) = send(
        first_app,
        "GET",
        "/api/notifications/unread",
        Some(&first_token),
        None,
    )
    .await;
    assert_eq!(unread.as_array().unwrap().len(), 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_preferences_defaults_and_email_delivery(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let student = create_test_user(&mut tx, "student").await;
    tx.commit().await.unwrap();

    let (student_app, student_token) = login(&pool, &student).await;
    let (status, defaults) = send(
        student_app.clone(),
        "GET",
        "/api/notification-preferences/mine",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(defaults["user_id"], json!(student.id));
    assert_eq!(defaults["grades"], true);
    assert_eq!(defaults["email"], true);
    assert_eq!(defaults["sms"], false);
    assert_eq!(defaults["push"], true);
    assert_eq!(defaults["digest_frequency"], "IMMEDIATE");

    let (status, updated) = send(
        student_app.clone(),
        "PUT",
        "/api/notification-preferences/mine",
        Some(&student_token),
        Some(json!({ "payments": false, "digest_frequency": "WEEKLY" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], defaults["id"]);
    assert_eq!(updated["payments"], false);
    assert_eq!(updated["grades"], true);
    assert_eq!(updated["digest_frequency"], "WEEKLY");

    let (app, token) = login(&pool, &admin).await;
    let (status, in_app) = send(
        app.clone(),
        "POST",
        "/api/notifications",
        Some(&token),
        Some(json!({
            "recipient_id": student.id,
            "title": "Grades published",
            "message": "Your semester grades are available.",
            "category": "grades"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", in_app);
    assert_eq!(in_app["channel"], "APP");
    assert_eq!(in_app["sent"], true);

    let (status, by_email) = send(
        app,
        "POST",
        "/api/notifications",
        Some(&token),
        Some(json!({
            "recipient_id": student.id,
            "title": "Grades published",
            "message": "Your semester grades are available.",
            "channel": "EMAIL",
            "category": "grades"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(by_email["sent"], false);
    assert_eq!(by_email["sent_at"], serde_json::Value::Null);

    let (_, mine) = send(
        student_app,
        "GET",
        "/api/notifications/mine",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(mine["meta"]["total"], 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cannot_message_yourself(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let teacher = create_test_user(&mut tx, "teacher").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &teacher).await;
    let (status, body) = send(
        app,
        "POST",
        "/api/messages",
        Some(&token),
        Some(json!({ "recipient_id": teacher.id, "subject": "Hi", "body": "Me" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot send a message to yourself");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_message_reply_and_thread(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let teacher = create_test_user(&mut tx, "teacher").await;
    let student = create_test_user(&mut tx, "student").await;
    let outsider = create_test_user(&mut tx, "student").await;
    tx.commit().await.unwrap();

    let (teacher_app, teacher_token) = login(&pool, &teacher).await;
    let (status, message) = send(
        teacher_app.clone(),
        "POST",
        "/api/messages",
        Some(&teacher_token),
        Some(json!({
            "recipient_id": student.id,
            "subject": "Project deadline",
            "body": "Please submit your report by Monday."
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message["is_read"], false);
    let message_uri = format!("/api/messages/{}", message["id"].as_str().unwrap());

    let (status, _) = send(
        teacher_app.clone(),
        "POST",
        &format!("{}/read", message_uri),
        Some(&teacher_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (outsider_app, outsider_token) = login(&pool, &outsider).await;
    let (status, _) = send(outsider_app, "GET", &message_uri, Some(&outsider_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (student_app, student_token) = login(&pool, &student).await;
    let (_, inbox) = send(
        student_app.clone(),
        "GET",
        "/api/messages/inbox",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(inbox["meta"]["total"], 1);

    let (status, opened) = send(
        student_app.clone(),
        "GET",
        &message_uri,
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(opened["is_read"], true);

    let (status, reply) = send(
        student_app.clone(),
        "POST",
        &format!("{}/reply", message_uri),
        Some(&student_token),
        Some(json!({ "body": "Noted, thank you." })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["subject"], "Re: Project deadline");
    assert_eq!(reply["recipient_id"], json!(teacher.id));
    assert_eq!(reply["parent_id"], message["id"]);

    let (status, thread) = send(
        teacher_app,
        "GET",
        &format!("/api/messages/{}/thread", reply["id"].as_str().unwrap()),
        Some(&teacher_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let thread = thread.as_array().unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0]["id"], message["id"]);

    let (_, stats) = send(
        student_app,
        "GET",
        "/api/messages/statistics",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(stats["received"], 1);
    assert_eq!(stats["sent"], 1);
    assert_eq!(stats["unread"], 0);
}
