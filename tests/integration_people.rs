mod common;

use axum::http::StatusCode;
use chrono::{Datelike, Utc};
use common::{
    create_test_student, create_test_structure, create_test_user, generate_unique_email, login,
    send,
};
use serde_json::{Value, json};
use sqlx::PgPool;

fn student_body(email: &str) -> Value {
    json!({
        "first_name": "Moussa",
        "last_name": "Sow",
        "email": email,
        "password": "studentpass123",
        "date_of_birth": "2004-02-11",
        "place_of_birth": "Thies",
        "sex": "M",
        "nationality": "Senegalese"
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn test_students_get_sequential_registration_numbers(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let year = Utc::now().year();

    let (status, first) = send(
        app.clone(),
        "POST",
        "/api/students",
        Some(&token),
        Some(student_body(&generate_unique_email())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["registration_number"], format!("ETU{}001", year));
    assert_eq!(first["status"], "ACTIVE");
    assert_eq!(first["country"], "Senegal");

    let (status, second) = send(
        app,
        "POST",
        "/api/students",
        Some(&token),
        Some(student_body(&generate_unique_email())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["registration_number"], format!("ETU{}002", year));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_create_student_as_student_forbidden(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let student = create_test_user(&mut tx, "student").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &student).await;
    let (status, _) = send(
        app,
        "POST",
        "/api/students",
        Some(&token),
        Some(student_body(&generate_unique_email())),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_missing_field_is_bad_request(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let mut body = student_body(&generate_unique_email());
    body.as_object_mut().unwrap().remove("place_of_birth");

    let (status, body) = send(app, "POST", "/api/students", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "place_of_birth is required");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_enrollment_defaults_fee_and_tracks_payments(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (_, student) = send(
        app.clone(),
        "POST",
        "/api/students",
        Some(&token),
        Some(student_body(&generate_unique_email())),
    )
    .await;

    let enrollment_body = json!({
        "student_id": student["id"],
        "program_id": structure.program_id,
        "academic_year_id": structure.academic_year_id,
        "level": 1,
        "amount_paid": 50000
    });

    let (status, enrollment) = send(
        app.clone(),
        "POST",
        "/api/enrollments",
        Some(&token),
        Some(enrollment_body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(enrollment["registration_fee"], 150000.0);
    assert_eq!(enrollment["payment_status"], "PARTIAL");
    assert_eq!(enrollment["remaining_amount"], 100000.0);

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/enrollments",
        Some(&token),
        Some(enrollment_body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Student is already enrolled in this program for this academic year"
    );

    let pay_uri = format!("/api/enrollments/{}/pay", enrollment["id"].as_str().unwrap());

    let (status, _) = send(
        app.clone(),
        "POST",
        &pay_uri,
        Some(&token),
        Some(json!({ "amount": 120000 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, paid) = send(
        app,
        "POST",
        &pay_uri,
        Some(&token),
        Some(json!({ "amount": 100000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["payment_status"], "PAID");
    assert_eq!(paid["remaining_amount"], 0.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_enrollment_level_cannot_exceed_program_duration(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, body) = send(
        app,
        "POST",
        "/api/enrollments",
        Some(&token),
        Some(json!({
            "student_id": student.student_id,
            "program_id": structure.program_id,
            "academic_year_id": uuid::Uuid::new_v4(),
            "level": 4
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "level 4 exceeds the program duration of 3 years");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_active_enrollment_and_statistics(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;

    let (status, active) = send(
        app.clone(),
        "GET",
        &format!("/api/students/{}/active-enrollment", student.student_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["id"], json!(student.enrollment_id));

    let (status, stats) = send(
        app,
        "GET",
        "/api/enrollments/statistics",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["total_fees"], 300000.0);
    assert_eq!(stats["total_collected"], 0.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_assignments_and_workload(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let year = Utc::now().year();

    let (status, teacher) = send(
        app.clone(),
        "POST",
        "/api/teachers",
        Some(&token),
        Some(json!({
            "first_name": "Fatou",
            "last_name": "Ba",
            "email": generate_unique_email(),
            "password": "teacherpass123",
            "department_id": structure.department_id,
            "grade": "LECTURER"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(teacher["registration_number"], format!("ENS{}001", year));
    assert_eq!(teacher["grade"], "LECTURER");

    let assignment = |kind: &str, hours: i32| {
        json!({
            "teacher_id": teacher["id"],
            "subject_id": structure.subject_id,
            "academic_year_id": structure.academic_year_id,
            "kind": kind,
            "assigned_hours": hours
        })
    };

    for (kind, hours) in [("LECTURE", 30), ("TUTORIAL", 15)] {
        let (status, _) = send(
            app.clone(),
            "POST",
            "/api/assignments",
            Some(&token),
            Some(assignment(kind, hours)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/assignments",
        Some(&token),
        Some(assignment("LECTURE", 10)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, workload) = send(
        app,
        "GET",
        &format!(
            "/api/teachers/{}/workload?academic_year_id={}",
            teacher["id"].as_str().unwrap(),
            structure.academic_year_id
        ),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(workload["lecture_hours"], 30);
    assert_eq!(workload["tutorial_hours"], 15);
    assert_eq!(workload["practical_hours"], 0);
    assert_eq!(workload["total_hours"], 45);
    assert_eq!(workload["assignment_count"], 2);
}
