mod common;

use axum::http::StatusCode;
use chrono::{Datelike, Utc};
use common::{
    TestStructure, TestStudent, create_test_student, create_test_structure, create_test_user,
    login, send,
};
use serde_json::{Value, json};
use sqlx::PgPool;

async fn setup_billing(
    app: &axum::Router,
    token: &str,
    structure: &TestStructure,
    student: &TestStudent,
) -> Value {
    let (status, fee) = send(
        app.clone(),
        "POST",
        "/api/fees",
        Some(token),
        Some(json!({
            "program_id": structure.program_id,
            "academic_year_id": structure.academic_year_id,
            "level": 1,
            "total_amount": 300000,
            "installments": 3
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", fee);
    assert_eq!(fee["amount_per_installment"], 100000.0);

    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/scholarships",
        Some(token),
        Some(json!({
            "student_id": student.student_id,
            "academic_year_id": structure.academic_year_id,
            "kind": "PARTIAL",
            "source": "GOVERNMENT",
            "percentage": 25,
            "start_date": "2024-09-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, invoice) = send(
        app.clone(),
        "POST",
        "/api/invoices/generate",
        Some(token),
        Some(json!({ "enrollment_id": student.enrollment_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", invoice);
    invoice
}

#[sqlx::test(migrations = "./migrations")]
async fn test_partial_scholarship_requires_percentage(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, body) = send(
        app,
        "POST",
        "/api/scholarships",
        Some(&token),
        Some(json!({
            "student_id": student.student_id,
            "academic_year_id": structure.academic_year_id,
            "kind": "PARTIAL",
            "source": "UNIVERSITY",
            "start_date": "2024-09-01"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "percentage is required for a partial scholarship");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_invoice_applies_scholarship_discount(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let invoice = setup_billing(&app, &token, &structure, &student).await;

    assert_eq!(invoice["number"], format!("FACT-{}-000001", Utc::now().year()));
    assert_eq!(invoice["gross_amount"], 300000.0);
    assert_eq!(invoice["discount_amount"], 75000.0);
    assert_eq!(invoice["net_amount"], 225000.0);
    assert_eq!(invoice["balance"], 225000.0);
    assert_eq!(invoice["status"], "UNPAID");
    assert_eq!(invoice["payment_rate"], 0.0);

    let (status, body) = send(
        app,
        "POST",
        "/api/invoices/generate",
        Some(&token),
        Some(json!({ "enrollment_id": student.enrollment_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "An invoice already exists for this enrollment");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_invoice_requires_active_fee(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, body) = send(
        app,
        "POST",
        "/api/invoices/generate",
        Some(&token),
        Some(json!({ "enrollment_id": student.enrollment_id })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "No active tuition fee for this program, year and level"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_validated_payment_credits_invoice_and_enrollment(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let invoice = setup_billing(&app, &token, &structure, &student).await;

    let (status, payment) = send(
        app.clone(),
        "POST",
        "/api/payments",
        Some(&token),
        Some(json!({
            "enrollment_id": student.enrollment_id,
            "amount": 100000,
            "method": "MOBILE_MONEY",
            "transaction_reference": "OM-4471"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["status"], "PENDING");
    assert_eq!(
        payment["receipt_number"],
        format!("REC-{}-000001", Utc::now().year())
    );

    let validate_uri = format!("/api/payments/{}/validate", payment["id"].as_str().unwrap());
    let (status, validated) = send(app.clone(), "POST", &validate_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validated["status"], "VALIDATED");
    assert_eq!(validated["validated_by"], json!(admin.id));

    let (status, body) = send(app.clone(), "POST", &validate_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Payment already validated");

    let (_, credited) = send(
        app.clone(),
        "GET",
        &format!("/api/invoices/{}", invoice["id"].as_str().unwrap()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(credited["amount_paid"], 100000.0);
    assert_eq!(credited["balance"], 125000.0);
    assert_eq!(credited["status"], "PARTIAL");

    let (_, enrollment) = send(
        app.clone(),
        "GET",
        &format!("/api/enrollments/{}", student.enrollment_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(enrollment["amount_paid"], 100000.0);
    assert_eq!(enrollment["payment_status"], "PARTIAL");

    let (status, stats) = send(app, "GET", "/api/invoices/statistics", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["total_billed"], 300000.0);
    assert_eq!(stats["total_discounts"], 75000.0);
    assert_eq!(stats["total_collected"], 100000.0);
    assert_eq!(stats["total_outstanding"], 125000.0);
    assert_eq!(stats["collection_rate"], 44.44);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_payment_above_enrollment_fee_is_fully_credited(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/fees",
        Some(&token),
        Some(json!({
            "program_id": structure.program_id,
            "academic_year_id": structure.academic_year_id,
            "level": 1,
            "total_amount": 300000,
            "installments": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, invoice) = send(
        app.clone(),
        "POST",
        "/api/invoices/generate",
        Some(&token),
        Some(json!({ "enrollment_id": student.enrollment_id, "due_date": "2024-10-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", invoice);

    let (_, payment) = send(
        app.clone(),
        "POST",
        "/api/payments",
        Some(&token),
        Some(json!({
            "enrollment_id": student.enrollment_id,
            "amount": 200000,
            "method": "CASH"
        })),
    )
    .await;
    let (status, _) = send(
        app.clone(),
        "POST",
        &format!("/api/payments/{}/validate", payment["id"].as_str().unwrap()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, enrollment) = send(
        app.clone(),
        "GET",
        &format!("/api/enrollments/{}", student.enrollment_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(enrollment["amount_paid"], 200000.0);
    assert_eq!(enrollment["payment_status"], "PAID");

    let (_, credited) = send(
        app.clone(),
        "GET",
        &format!("/api/invoices/{}", invoice["id"].as_str().unwrap()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(credited["amount_paid"], 200000.0);
    assert_eq!(credited["balance"], 100000.0);
    assert_eq!(credited["status"], "PARTIAL");

    let (status, overdue) = send(app, "GET", "/api/invoices/overdue", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overdue["count"], 1);
    assert_eq!(overdue["total_outstanding"], 100000.0);
    assert_eq!(overdue["data"][0]["id"], invoice["id"]);
    assert_eq!(overdue["data"][0]["is_overdue"], true);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_rejected_payment_keeps_reason(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (_, payment) = send(
        app.clone(),
        "POST",
        "/api/payments",
        Some(&token),
        Some(json!({
            "enrollment_id": student.enrollment_id,
            "amount": 50000,
            "method": "CHEQUE"
        })),
    )
    .await;
    let id = payment["id"].as_str().unwrap();

    let (status, rejected) = send(
        app.clone(),
        "POST",
        &format!("/api/payments/{}/reject", id),
        Some(&token),
        Some(json!({ "reason": "Cheque bounced" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "REJECTED");
    assert!(
        rejected["observations"]
            .as_str()
            .unwrap()
            .contains("Rejected: Cheque bounced")
    );

    let (status, _) = send(
        app,
        "POST",
        &format!("/api/payments/{}/cancel", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cancelled_invoice_cannot_be_cancelled_again(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let invoice = setup_billing(&app, &token, &structure, &student).await;
    let cancel_uri = format!("/api/invoices/{}/cancel", invoice["id"].as_str().unwrap());

    let (status, cancelled) = send(app.clone(), "POST", &cancel_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");
    assert_eq!(cancelled["is_overdue"], false);

    let (status, body) = send(app.clone(), "POST", &cancel_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invoice is already CANCELLED");

    let (_, stats) = send(app, "GET", "/api/invoices/statistics", Some(&token), None).await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["total_billed"], 0.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_scholarship_suspend_and_reactivate(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    let student = create_test_student(&mut tx, &structure).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (_, scholarship) = send(
        app.clone(),
        "POST",
        "/api/scholarships",
        Some(&token),
        Some(json!({
            "student_id": student.student_id,
            "academic_year_id": structure.academic_year_id,
            "kind": "FIXED_AMOUNT",
            "source": "COMPANY",
            "fixed_amount": 50000,
            "start_date": "2024-10-01",
            "organization": "Sonatel"
        })),
    )
    .await;
    assert_eq!(scholarship["status"], "ACTIVE");
    let id = scholarship["id"].as_str().unwrap();

    let (status, suspended) = send(
        app.clone(),
        "POST",
        &format!("/api/scholarships/{}/suspend", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(suspended["status"], "SUSPENDED");

    let (status, _) = send(
        app.clone(),
        "POST",
        &format!("/api/scholarships/{}/suspend", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, reactivated) = send(
        app,
        "POST",
        &format!("/api/scholarships/{}/reactivate", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reactivated["status"], "ACTIVE");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_cannot_read_payments(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let student = create_test_user(&mut tx, "student").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &student).await;
    let (status, _) = send(app, "GET", "/api/payments", Some(&token), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}
