mod common;

use axum::http::StatusCode;
use common::{
    create_test_student, create_test_structure, create_test_user, generate_unique_code, login,
    send,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_create_faculty_as_admin(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let code = generate_unique_code("FST");

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/faculties",
        Some(&token),
        Some(json!({ "code": code, "name": "Faculty of Sciences", "dean": "Pr. Ndiaye" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["code"], code);
    assert_eq!(body["dean"], "Pr. Ndiaye");

    let (status, body) = send(
        app,
        "POST",
        "/api/faculties",
        Some(&token),
        Some(json!({ "code": code, "name": "Another" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A faculty with this code already exists");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_can_read_but_not_write_catalogue(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let student = create_test_user(&mut tx, "student").await;
    create_test_structure(&mut tx).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &student).await;

    let (status, body) = send(app.clone(), "GET", "/api/faculties", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);

    let (status, _) = send(
        app,
        "POST",
        "/api/faculties",
        Some(&token),
        Some(json!({ "code": "NOPE", "name": "Nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_department_requires_existing_faculty(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, body) = send(
        app,
        "POST",
        "/api/departments",
        Some(&token),
        Some(json!({
            "faculty_id": uuid::Uuid::new_v4(),
            "code": generate_unique_code("D"),
            "name": "Mathematics"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Faculty does not exist");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_one_academic_year_is_active(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;

    let (status, first) = send(
        app.clone(),
        "POST",
        "/api/academic-years",
        Some(&token),
        Some(json!({
            "code": "2024-2025",
            "start_date": "2024-09-01",
            "end_date": "2025-07-31",
            "is_active": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["is_active"], true);

    let (status, second) = send(
        app.clone(),
        "POST",
        "/api/academic-years",
        Some(&token),
        Some(json!({
            "code": "2025-2026",
            "start_date": "2025-09-01",
            "end_date": "2026-07-31"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["is_active"], false);

    let (status, activated) = send(
        app.clone(),
        "POST",
        &format!("/api/academic-years/{}/activate", second["id"].as_str().unwrap()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(activated["is_active"], true);

    let (status, active) = send(
        app.clone(),
        "GET",
        "/api/academic-years/active",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["code"], "2025-2026");

    let (_, previous) = send(
        app,
        "GET",
        &format!("/api/academic-years/{}", first["id"].as_str().unwrap()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(previous["is_active"], false);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_academic_year_must_end_after_start(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, _) = send(
        app,
        "POST",
        "/api/academic-years",
        Some(&token),
        Some(json!({
            "code": "2025-2026",
            "start_date": "2026-07-31",
            "end_date": "2025-09-01"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_subject_validation_and_program_links(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;

    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/subjects",
        Some(&token),
        Some(json!({
            "code": generate_unique_code("S"),
            "name": "Databases",
            "coefficient": 11,
            "semester": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, subject) = send(
        app.clone(),
        "POST",
        "/api/subjects",
        Some(&token),
        Some(json!({
            "code": generate_unique_code("S"),
            "name": "Databases",
            "coefficient": 3,
            "hours_lecture": 20,
            "hours_practical": 10,
            "semester": 2,
            "program_ids": [structure.program_id]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(subject["total_hours"], 30);
    assert_eq!(subject["program_ids"], json!([structure.program_id]));

    let (status, subjects) = send(
        app.clone(),
        "GET",
        &format!("/api/programs/{}/subjects", structure.program_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(subjects.as_array().unwrap().len(), 2);

    let (status, by_semester) = send(
        app,
        "GET",
        "/api/subjects/by-semester?semester=3",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", by_semester);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_faculty_statistics_count_enrolled_students(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    create_test_student(&mut tx, &structure).await;
    create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, body) = send(
        app,
        "GET",
        &format!("/api/faculties/{}/statistics", structure.faculty_id),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["department_count"], 1);
    assert_eq!(body["program_count"], 1);
    assert_eq!(body["teacher_count"], 0);
    assert_eq!(body["enrolled_student_count"], 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_program_with_enrollments_cannot_be_deleted(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, body) = send(
        app,
        "DELETE",
        &format!("/api/programs/{}", structure.program_id),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Program still has enrollments");
}
