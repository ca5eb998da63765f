mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{create_test_user, login, send};
use serde_json::{Value, json};
use sqlx::PgPool;

async fn create_projector(app: &axum::Router, token: &str, quantity: i32) -> Value {
    let (status, equipment) = send(
        app.clone(),
        "POST",
        "/api/equipment",
        Some(token),
        Some(json!({
            "name": "Projector",
            "reference": "PRJ-001",
            "category": "AUDIOVISUAL",
            "total_quantity": quantity,
            "acquisition_value": 450000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", equipment);
    equipment
}

fn equipment_reservation(equipment_id: &Value, quantity: i32, days_ahead: i64) -> Value {
    let starts_at = Utc::now() + Duration::days(days_ahead);
    let ends_at = starts_at + Duration::hours(2);
    json!({
        "kind": "EQUIPMENT",
        "starts_at": starts_at.to_rfc3339(),
        "ends_at": ends_at.to_rfc3339(),
        "purpose": "Thesis defense",
        "items": [{ "equipment_id": equipment_id, "quantity": quantity }]
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn test_equipment_quantities_are_checked(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/equipment",
        Some(&token),
        Some(json!({
            "name": "Laptop",
            "reference": "LAP-001",
            "category": "IT",
            "total_quantity": 2,
            "available_quantity": 3
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "available_quantity cannot exceed total_quantity");

    let equipment = create_projector(&app, &token, 4).await;
    assert_eq!(equipment["available_quantity"], 4);
    assert_eq!(equipment["state"], "AVAILABLE");
    assert_eq!(equipment["is_reservable"], true);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reservation_approval_moves_stock(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let teacher = create_test_user(&mut tx, "teacher").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let projector = create_projector(&app, &token, 2).await;
    let equipment_uri = format!("/api/equipment/{}", projector["id"].as_str().unwrap());

    let (teacher_app, teacher_token) = login(&pool, &teacher).await;
    let (status, reservation) = send(
        teacher_app.clone(),
        "POST",
        "/api/reservations",
        Some(&teacher_token),
        Some(equipment_reservation(&projector["id"], 2, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", reservation);
    assert_eq!(reservation["status"], "PENDING");
    assert_eq!(reservation["duration_hours"], 2.0);
    assert_eq!(reservation["room_id"], Value::Null);
    assert_eq!(reservation["items"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        teacher_app.clone(),
        "POST",
        "/api/reservations",
        Some(&teacher_token),
        Some(equipment_reservation(&projector["id"], 1, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Only 0 unit(s) of Projector available for this period"
    );

    let reservation_uri = format!("/api/reservations/{}", reservation["id"].as_str().unwrap());
    let (status, _) = send(
        teacher_app,
        "POST",
        &format!("{}/approve", reservation_uri),
        Some(&teacher_token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, approved) = send(
        app.clone(),
        "POST",
        &format!("{}/approve", reservation_uri),
        Some(&token),
        Some(json!({ "comment": "Enjoy" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "APPROVED");
    assert_eq!(approved["validated_by"], json!(admin.id));

    let (_, out) = send(app.clone(), "GET", &equipment_uri, Some(&token), None).await;
    assert_eq!(out["available_quantity"], 0);
    assert_eq!(out["state"], "RESERVED");

    let (status, returned) = send(
        app.clone(),
        "POST",
        &format!("{}/return-equipment", reservation_uri),
        Some(&token),
        Some(json!({ "equipment_id": projector["id"], "return_condition": "Good" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["status"], "COMPLETED");
    assert_eq!(returned["items"][0]["returned"], true);

    let (_, back) = send(app, "GET", &equipment_uri, Some(&token), None).await;
    assert_eq!(back["available_quantity"], 2);
    assert_eq!(back["state"], "AVAILABLE");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_reservation_must_start_in_future(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let projector = create_projector(&app, &token, 1).await;

    let (status, body) = send(
        app,
        "POST",
        "/api/reservations",
        Some(&token),
        Some(equipment_reservation(&projector["id"], 1, -1)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "starts_at must be in the future");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_requester_can_cancel_reservation(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let teacher = create_test_user(&mut tx, "teacher").await;
    let student = create_test_user(&mut tx, "student").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let projector = create_projector(&app, &token, 1).await;

    let (teacher_app, teacher_token) = login(&pool, &teacher).await;
    let (_, reservation) = send(
        teacher_app.clone(),
        "POST",
        "/api/reservations",
        Some(&teacher_token),
        Some(equipment_reservation(&projector["id"], 1, 3)),
    )
    .await;
    let cancel_uri = format!(
        "/api/reservations/{}/cancel",
        reservation["id"].as_str().unwrap()
    );

    let (student_app, student_token) = login(&pool, &student).await;
    let (status, _) = send(student_app, "POST", &cancel_uri, Some(&student_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, cancelled) =
        send(teacher_app.clone(), "POST", &cancel_uri, Some(&teacher_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");

    let (status, body) = send(teacher_app, "POST", &cancel_uri, Some(&teacher_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Reservation is already cancelled");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cancelling_approved_reservation_releases_unreturned_stock(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let teacher = create_test_user(&mut tx, "teacher").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let projector = create_projector(&app, &token, 2).await;
    let (status, speaker) = send(
        app.clone(),
        "POST",
        "/api/equipment",
        Some(&token),
        Some(json!({
            "name": "Speaker",
            "reference": "SPK-001",
            "category": "AUDIOVISUAL",
            "total_quantity": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", speaker);

    let mut request = equipment_reservation(&projector["id"], 2, 2);
    request["items"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "equipment_id": speaker["id"], "quantity": 1 }));

    let (teacher_app, teacher_token) = login(&pool, &teacher).await;
    let (status, reservation) = send(
        teacher_app.clone(),
        "POST",
        "/api/reservations",
        Some(&teacher_token),
        Some(request),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", reservation);
    let reservation_uri = format!("/api/reservations/{}", reservation["id"].as_str().unwrap());

    let (status, _) = send(
        app.clone(),
        "POST",
        &format!("{}/approve", reservation_uri),
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, partial) = send(
        app.clone(),
        "POST",
        &format!("{}/return-equipment", reservation_uri),
        Some(&token),
        Some(json!({ "equipment_id": speaker["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(partial["status"], "APPROVED");

    let projector_uri = format!("/api/equipment/{}", projector["id"].as_str().unwrap());
    let speaker_uri = format!("/api/equipment/{}", speaker["id"].as_str().unwrap());
    let (_, out) = send(app.clone(), "GET", &projector_uri, Some(&token), None).await;
    assert_eq!(out["available_quantity"], 0);

    let (status, cancelled) = send(
        teacher_app,
        "POST",
        &format!("{}/cancel", reservation_uri),
        Some(&teacher_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");

    let (_, released) = send(app.clone(), "GET", &projector_uri, Some(&token), None).await;
    assert_eq!(released["available_quantity"], 2);
    assert_eq!(released["state"], "AVAILABLE");

    let (_, untouched) = send(app, "GET", &speaker_uri, Some(&token), None).await;
    assert_eq!(untouched["available_quantity"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_maintenance_takes_equipment_out_of_service(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let projector = create_projector(&app, &token, 1).await;
    let equipment_uri = format!("/api/equipment/{}", projector["id"].as_str().unwrap());

    let (status, maintenance) = send(
        app.clone(),
        "POST",
        "/api/maintenances",
        Some(&token),
        Some(json!({
            "equipment_id": projector["id"],
            "kind": "CORRECTIVE",
            "scheduled_on": "2025-03-10",
            "description": "Lamp replacement",
            "labour_cost": 10000,
            "parts_cost": 35000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(maintenance["status"], "PLANNED");
    assert_eq!(maintenance["total_cost"], 45000.0);
    let maintenance_uri = format!("/api/maintenances/{}", maintenance["id"].as_str().unwrap());

    let start_uri = format!("{}/start", maintenance_uri);
    let (status, started) = send(app.clone(), "POST", &start_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "IN_PROGRESS");

    let (_, equipment) = send(app.clone(), "GET", &equipment_uri, Some(&token), None).await;
    assert_eq!(equipment["state"], "UNDER_MAINTENANCE");

    let (status, body) = send(app.clone(), "POST", &start_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only a planned maintenance can be started");

    let (status, cancelled) = send(
        app.clone(),
        "POST",
        &format!("{}/cancel", maintenance_uri),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");

    let (_, equipment) = send(app.clone(), "GET", &equipment_uri, Some(&token), None).await;
    assert_eq!(equipment["state"], "AVAILABLE");

    let (status, body) = send(
        app,
        "POST",
        &format!("{}/complete", maintenance_uri),
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Maintenance is already finished");
}
