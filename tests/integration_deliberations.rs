mod common;

use axum::http::StatusCode;
use common::{
    TestStructure, create_test_student, create_test_structure, create_test_user,
    generate_unique_code, login, send,
};
use serde_json::{Value, json};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

async fn insert_result(
    tx: &mut Transaction<'_, Postgres>,
    structure: &TestStructure,
    student_id: Uuid,
    average: f64,
) {
    let (status, credits) = match average {
        a if a >= 10.0 => ("PASSED", 4),
        a if a >= 7.0 => ("RESIT", 0),
        _ => ("FAILED", 0),
    };
    sqlx::query(
        r#"INSERT INTO results (student_id, subject_id, academic_year_id, average, credits_earned, status)
           VALUES ($1, $2, $3, $4, $5, $6)"#,
    )
    .bind(student_id)
    .bind(structure.subject_id)
    .bind(structure.academic_year_id)
    .bind(average)
    .bind(credits)
    .bind(status)
    .execute(&mut **tx)
    .await
    .unwrap();
}

async fn create_session(
    app: &axum::Router,
    token: &str,
    structure: &TestStructure,
) -> (StatusCode, Value) {
    send(
        app.clone(),
        "POST",
        "/api/deliberations",
        Some(token),
        Some(json!({
            "academic_year_id": structure.academic_year_id,
            "program_id": structure.program_id,
            "level": 1,
            "semester": 1,
            "date": "2025-02-10",
            "location": "Council room"
        })),
    )
    .await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_generate_decisions_applies_thresholds(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let mut students = Vec::new();
    for average in [15.0, 8.0, 5.0] {
        let student = create_test_student(&mut tx, &structure).await;
        insert_result(&mut tx, &structure, student.student_id, average).await;
        students.push(student);
    }
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, session) = create_session(&app, &token, &structure).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["status"], "PLANNED");
    let session_uri = format!("/api/deliberations/{}", session["id"].as_str().unwrap());

    let (status, _) = create_session(&app, &token, &structure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        app.clone(),
        "POST",
        &format!("{}/generate-decisions", session_uri),
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["generated"], 3);

    let decisions = body["decisions"].as_array().unwrap();
    assert_eq!(decisions[0]["student_id"], json!(students[0].student_id));
    assert_eq!(decisions[0]["decision"], "ADMITTED");
    assert_eq!(decisions[0]["mention"], "GOOD");
    assert_eq!(decisions[0]["class_rank"], 1);
    assert_eq!(decisions[0]["credits_earned"], 4);
    assert_eq!(decisions[0]["credit_rate"], 6.67);
    assert_eq!(decisions[1]["decision"], "DEFERRED");
    assert_eq!(decisions[1]["mention"], Value::Null);
    assert_eq!(decisions[2]["decision"], "REPEAT");
    assert_eq!(decisions[2]["class_rank"], 3);

    let (_, session) = send(app.clone(), "GET", &session_uri, Some(&token), None).await;
    assert_eq!(session["status"], "IN_PROGRESS");

    let (_, listed) = send(
        app,
        "GET",
        &format!("{}/decisions", session_uri),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(listed["statistics"]["total"], 3);
    assert_eq!(listed["statistics"]["admitted"], 1);
    assert_eq!(listed["statistics"]["success_rate"], 33.33);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_validated_session_is_frozen(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    insert_result(&mut tx, &structure, student.student_id, 9.0).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (_, session) = create_session(&app, &token, &structure).await;
    let session_uri = format!("/api/deliberations/{}", session["id"].as_str().unwrap());

    let generate_uri = format!("{}/generate-decisions", session_uri);
    let (status, body) = send(app.clone(), "POST", &generate_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["decisions"][0]["decision"], "DEFERRED");
    let decision_uri = format!(
        "/api/deliberations/decisions/{}",
        body["decisions"][0]["id"].as_str().unwrap()
    );

    let (status, overridden) = send(
        app.clone(),
        "PUT",
        &decision_uri,
        Some(&token),
        Some(json!({
            "decision": "ADMITTED_WITH_RESERVATION",
            "observations": "Strong progress in the second half"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overridden["decision"], "ADMITTED_WITH_RESERVATION");
    assert_eq!(overridden["mention"], Value::Null);

    let validate_uri = format!("{}/validate", session_uri);
    let (status, body) = send(app.clone(), "POST", &validate_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only a closed session can be validated");

    let (status, closed) = send(
        app.clone(),
        "POST",
        &format!("{}/close", session_uri),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "CLOSED");

    let (status, validated) = send(app.clone(), "POST", &validate_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validated["status"], "VALIDATED");

    let (status, body) = send(
        app.clone(),
        "PUT",
        &decision_uri,
        Some(&token),
        Some(json!({ "decision": "ADMITTED" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "The session has been validated and can no longer change"
    );

    let (status, body) = send(app.clone(), "POST", &generate_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "The session has been validated and can no longer change"
    );

    let (status, _) = send(app, "DELETE", &session_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_jury_membership(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let teacher_user = create_test_user(&mut tx, "teacher").await;
    let structure = create_test_structure(&mut tx).await;
    let teacher_id: Uuid = sqlx::query_scalar(
        "INSERT INTO teachers (user_id, registration_number) VALUES ($1, $2) RETURNING id",
    )
    .bind(teacher_user.id)
    .bind(generate_unique_code("ENS"))
    .fetch_one(&mut *tx)
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (_, session) = create_session(&app, &token, &structure).await;
    let jury_uri = format!("/api/deliberations/{}/jury", session["id"].as_str().unwrap());

    let (status, member) = send(
        app.clone(),
        "POST",
        &jury_uri,
        Some(&token),
        Some(json!({ "teacher_id": teacher_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(member["role"], "MEMBER");
    assert_eq!(member["present"], true);

    let (status, body) = send(
        app.clone(),
        "POST",
        &jury_uri,
        Some(&token),
        Some(json!({ "teacher_id": teacher_id, "role": "PRESIDENT" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Teacher is already on this jury");

    let (teacher_app, teacher_token) = login(&pool, &teacher_user).await;
    let (status, jury) = send(
        teacher_app.clone(),
        "GET",
        &jury_uri,
        Some(&teacher_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(jury.as_array().unwrap().len(), 1);

    let (status, _) = create_session(&teacher_app, &teacher_token, &structure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let member_uri = format!("{}/{}", jury_uri, member["id"].as_str().unwrap());
    let (status, _) = send(app.clone(), "DELETE", &member_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(app, "DELETE", &member_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
