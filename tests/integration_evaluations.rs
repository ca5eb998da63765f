mod common;

use axum::http::StatusCode;
use common::{
    TestStructure, create_test_student, create_test_structure, create_test_user, login, send,
};
use serde_json::{Value, json};
use sqlx::PgPool;

async fn create_type(app: axum::Router, token: &str, code: &str, min: f64, max: f64) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/evaluation-types",
        Some(token),
        Some(json!({
            "code": code,
            "name": code,
            "min_coefficient": min,
            "max_coefficient": max
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

async fn create_evaluation(
    app: axum::Router,
    token: &str,
    structure: &TestStructure,
    type_id: &Value,
    title: &str,
    coefficient: f64,
) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/evaluations",
        Some(token),
        Some(json!({
            "subject_id": structure.subject_id,
            "evaluation_type_id": type_id,
            "academic_year_id": structure.academic_year_id,
            "title": title,
            "date": "2025-01-20",
            "coefficient": coefficient
        })),
    )
    .await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_evaluation_coefficient_must_fit_type_range(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let teacher = create_test_user(&mut tx, "teacher").await;
    let structure = create_test_structure(&mut tx).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &teacher).await;
    let exam = create_type(app.clone(), &token, "EXAM", 1.0, 3.0).await;

    let (status, body) =
        create_evaluation(app.clone(), &token, &structure, &exam["id"], "Final exam", 5.0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "coefficient must be between 1 and 3 for EXAM evaluations"
    );

    let (status, evaluation) =
        create_evaluation(app.clone(), &token, &structure, &exam["id"], "Final exam", 2.0).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(evaluation["max_score"], 20.0);

    let (status, _) =
        create_evaluation(app, &token, &structure, &exam["id"], "Final exam", 2.0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_grade_defaults_out_of_and_remark(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let teacher = create_test_user(&mut tx, "teacher").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &teacher).await;
    let exam = create_type(app.clone(), &token, "EXAM", 1.0, 3.0).await;
    let (_, evaluation) =
        create_evaluation(app.clone(), &token, &structure, &exam["id"], "Midterm", 1.0).await;

    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/grades",
        Some(&token),
        Some(json!({
            "evaluation_id": evaluation["id"],
            "student_id": student.student_id,
            "score": 21
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, grade) = send(
        app.clone(),
        "POST",
        "/api/grades",
        Some(&token),
        Some(json!({
            "evaluation_id": evaluation["id"],
            "student_id": student.student_id,
            "score": 16.5
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(grade["out_of"], 20.0);
    assert_eq!(grade["score_over_20"], 16.5);
    assert_eq!(grade["remarks"], "Very good");

    let (status, body) = send(
        app,
        "POST",
        "/api/grades",
        Some(&token),
        Some(json!({
            "evaluation_id": evaluation["id"],
            "student_id": student.student_id,
            "score": 10
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "The student already has a grade for this evaluation"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_evaluation_copies_settings_without_grades(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let teacher = create_test_user(&mut tx, "teacher").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &teacher).await;
    let tutorial = create_type(app.clone(), &token, "TUTORIAL", 0.5, 2.0).await;
    let (_, source) = create_evaluation(
        app.clone(),
        &token,
        &structure,
        &tutorial["id"],
        "Quiz 1",
        1.5,
    )
    .await;

    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/grades",
        Some(&token),
        Some(json!({
            "evaluation_id": source["id"],
            "student_id": student.student_id,
            "score": 12
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let duplicate_uri = format!("/api/evaluations/{}/duplicate", source["id"].as_str().unwrap());
    let (status, copy) = send(
        app.clone(),
        "POST",
        &duplicate_uri,
        Some(&token),
        Some(json!({ "title": "Quiz 2", "date": "2025-02-03" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", copy);
    assert_ne!(copy["id"], source["id"]);
    assert_eq!(copy["title"], "Quiz 2");
    assert_eq!(copy["date"], "2025-02-03");
    assert_eq!(copy["coefficient"], 1.5);
    assert_eq!(copy["max_score"], source["max_score"]);
    assert_eq!(copy["evaluation_type_id"], source["evaluation_type_id"]);
    assert_eq!(copy["subject_id"], source["subject_id"]);

    let (_, grades) = send(
        app.clone(),
        "GET",
        &format!("/api/evaluations/{}/grades", copy["id"].as_str().unwrap()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(grades.as_array().unwrap().len(), 0);

    let (status, _) = send(
        app,
        "POST",
        &duplicate_uri,
        Some(&token),
        Some(json!({ "title": "Quiz 1", "date": "2025-02-10" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_bulk_grades_report_per_entry_errors(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let teacher = create_test_user(&mut tx, "teacher").await;
    let structure = create_test_structure(&mut tx).await;
    let first = create_test_student(&mut tx, &structure).await;
    let second = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &teacher).await;
    let exam = create_type(app.clone(), &token, "EXAM", 1.0, 3.0).await;
    let (_, evaluation) =
        create_evaluation(app.clone(), &token, &structure, &exam["id"], "Final", 2.0).await;

    let bulk = |first_score: f64| {
        json!({
            "evaluation_id": evaluation["id"],
            "grades": [
                { "student_id": first.student_id, "score": first_score },
                { "student_id": second.student_id, "is_absent": true },
                { "student_id": uuid::Uuid::new_v4(), "score": 30 }
            ]
        })
    };

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/grades/bulk",
        Some(&token),
        Some(bulk(12.0)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 2);
    assert_eq!(body["updated"], 0);
    assert_eq!(body["errors"][0]["error"], "score cannot exceed 20");

    let (_, body) = send(
        app.clone(),
        "POST",
        "/api/grades/bulk",
        Some(&token),
        Some(bulk(14.0)),
    )
    .await;
    assert_eq!(body["created"], 0);
    assert_eq!(body["updated"], 2);

    let (status, stats) = send(
        app,
        "GET",
        &format!(
            "/api/evaluations/{}/statistics",
            evaluation["id"].as_str().unwrap()
        ),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["present_count"], 1);
    assert_eq!(stats["absent_count"], 1);
    assert_eq!(stats["average"], 14.0);
    assert_eq!(stats["pass_rate"], 100.0);
    assert_eq!(stats["distribution"]["from_14_to_16"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_compute_subject_results_ranks_students(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let teacher = create_test_user(&mut tx, "teacher").await;
    let structure = create_test_structure(&mut tx).await;
    let students = [
        create_test_student(&mut tx, &structure).await,
        create_test_student(&mut tx, &structure).await,
        create_test_student(&mut tx, &structure).await,
    ];
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &teacher).await;
    let exam_type = create_type(app.clone(), &token, "EXAM", 1.0, 3.0).await;
    let assignment_type = create_type(app.clone(), &token, "ASSIGNMENT", 0.5, 2.0).await;
    let (_, exam) =
        create_evaluation(app.clone(), &token, &structure, &exam_type["id"], "Exam", 2.0).await;
    let (_, homework) = create_evaluation(
        app.clone(),
        &token,
        &structure,
        &assignment_type["id"],
        "Homework",
        1.0,
    )
    .await;

    // (exam, homework) per student: averages 14, 7 and 14
    let scores = [(15.0, 12.0), (8.0, 5.0), (15.0, 12.0)];
    for (evaluation, pick) in [(&exam, 0), (&homework, 1)] {
        let grades: Vec<Value> = students
            .iter()
            .zip(scores)
            .map(|(student, pair)| {
                let score = if pick == 0 { pair.0 } else { pair.1 };
                json!({ "student_id": student.student_id, "score": score })
            })
            .collect();

        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/grades/bulk",
            Some(&token),
            Some(json!({ "evaluation_id": evaluation["id"], "grades": grades })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["created"], 3);
    }

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/results/compute-subject",
        Some(&token),
        Some(json!({
            "subject_id": structure.subject_id,
            "academic_year_id": structure.academic_year_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["computed"], 3);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["average"], 14.0);
    assert_eq!(results[0]["rank"], 1);
    assert_eq!(results[1]["rank"], 1);
    assert_eq!(results[0]["status"], "PASSED");
    assert_eq!(results[0]["mention"], "GOOD");
    assert_eq!(results[0]["credits_earned"], 4);

    let weakest = &results[2];
    assert_eq!(weakest["student_id"], json!(students[1].student_id));
    assert_eq!(weakest["average"], 7.0);
    assert_eq!(weakest["rank"], 3);
    assert_eq!(weakest["status"], "RESIT");
    assert_eq!(weakest["mention"], Value::Null);
    assert_eq!(weakest["credits_earned"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_cannot_enter_grades(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &student.user).await;
    let (status, _) = send(
        app,
        "POST",
        "/api/grades",
        Some(&token),
        Some(json!({
            "evaluation_id": uuid::Uuid::new_v4(),
            "student_id": student.student_id,
            "score": 20
        })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}
