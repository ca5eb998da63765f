mod common;

use axum::http::StatusCode;
use chrono::{Datelike, Utc};
use common::{create_test_student, create_test_structure, create_test_user, login, send};
use serde_json::{Value, json};
use sqlx::PgPool;

async fn create_attestation_template(app: &axum::Router, token: &str) -> Value {
    let (status, template) = send(
        app.clone(),
        "POST",
        "/api/document-templates",
        Some(token),
        Some(json!({
            "document_type": "ENROLLMENT_ATTESTATION",
            "name": "Enrollment attestation",
            "header_html": "<h1>{{ document_number }}</h1>",
            "body_html": "<p>{{full_name}} ({{ registration_number }}) is enrolled in {{ program }}, level {{ level }}.</p>"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", template);
    template
}

#[sqlx::test(migrations = "./migrations")]
async fn test_template_preview_and_duplicate(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let template = create_attestation_template(&app, &token).await;
    assert_eq!(template["is_active"], true);
    let template_uri = format!("/api/document-templates/{}", template["id"].as_str().unwrap());

    let (status, preview) = send(
        app.clone(),
        "POST",
        &format!("{}/preview", template_uri),
        Some(&token),
        Some(json!({ "context": { "full_name": "Moussa Ndiaye" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let html = preview["html"].as_str().unwrap();
    assert!(html.contains("Moussa Ndiaye (ETU2025001)"));
    assert!(html.contains("<h1>ATT-SCO-2025-000001</h1>"));

    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/document-templates",
        Some(&token),
        Some(json!({
            "document_type": "ENROLLMENT_ATTESTATION",
            "name": "Second",
            "body_html": "<p></p>"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, copy) = send(
        app.clone(),
        "POST",
        &format!("{}/duplicate", template_uri),
        Some(&token),
        Some(json!({ "document_type": "SCHOOL_ATTESTATION" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(copy["name"], "Enrollment attestation (copy)");
    assert_eq!(copy["is_active"], false);
    assert_eq!(copy["body_html"], template["body_html"]);

    let (_, active) = send(
        app,
        "GET",
        "/api/document-templates/active",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(active.as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_document_generation_and_verification(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, draft) = send(
        app.clone(),
        "POST",
        "/api/documents",
        Some(&token),
        Some(json!({
            "student_id": student.student_id,
            "document_type": "ENROLLMENT_ATTESTATION",
            "enrollment_id": student.enrollment_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", draft);
    assert_eq!(draft["status"], "DRAFT");
    let number = format!("ATT-INS-{}-000001", Utc::now().year());
    assert_eq!(draft["number"], number.as_str());
    let document_uri = format!("/api/documents/{}", draft["id"].as_str().unwrap());
    let generate_uri = format!("{}/generate", document_uri);

    let (status, body) = send(app.clone(), "POST", &generate_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No active template for ENROLLMENT_ATTESTATION");

    create_attestation_template(&app, &token).await;
    let (status, generated) = send(app.clone(), "POST", &generate_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{}", generated);
    assert_eq!(generated["status"], "GENERATED");
    assert_eq!(generated["generated_by"], json!(admin.id));
    let content = generated["content_html"].as_str().unwrap();
    assert!(content.contains("Test User"));
    assert!(content.contains("Licence in Computer Science, level 1"));
    assert!(content.contains(&number));
    let code = generated["verification_code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 32);

    let (status, body) = send(app.clone(), "POST", &generate_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Document already generated");

    let (status, verified) = send(
        app.clone(),
        "POST",
        "/api/documents/verify",
        None,
        Some(json!({ "number": number, "verification_code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["document"]["student_name"], "Test User");
    assert_eq!(verified["document"]["status"], "GENERATED");

    let (_, forged) = send(
        app.clone(),
        "POST",
        "/api/documents/verify",
        None,
        Some(json!({ "number": number, "verification_code": "0".repeat(32) })),
    )
    .await;
    assert_eq!(forged["valid"], false);
    assert_eq!(forged["document"], Value::Null);

    let (status, delivered) = send(
        app.clone(),
        "POST",
        &format!("{}/deliver", document_uri),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(delivered["status"], "DELIVERED");
    assert_eq!(delivered["delivered_by"], json!(admin.id));

    let (status, body) = send(
        app,
        "POST",
        &format!("{}/cancel", document_uri),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A delivered document cannot be cancelled");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_requests_own_document(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (student_app, student_token) = login(&pool, &student.user).await;
    let (status, requested) = send(
        student_app.clone(),
        "POST",
        "/api/documents/request",
        Some(&student_token),
        Some(json!({
            "document_type": "SCHOOL_CERTIFICATE",
            "request_reason": "Visa application"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(requested["student_id"], json!(student.student_id));
    assert_eq!(requested["status"], "DRAFT");

    let (_, mine) = send(
        student_app.clone(),
        "GET",
        "/api/documents/mine",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, _) = send(
        student_app,
        "GET",
        "/api/documents/pending",
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (app, token) = login(&pool, &admin).await;
    let (_, pending) = send(
        app.clone(),
        "GET",
        "/api/documents/pending",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, body) = send(
        app,
        "POST",
        "/api/documents/request",
        Some(&token),
        Some(json!({ "document_type": "SCHOOL_CERTIFICATE" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No student profile for this account");
}
