mod common;

use axum::http::StatusCode;
use common::{TestStructure, create_test_structure, create_test_user, login, send};
use serde_json::{Value, json};
use sqlx::PgPool;

struct Venue {
    room_id: Value,
    spare_room_id: Value,
    time_slot_id: Value,
}

async fn create_venue(app: &axum::Router, token: &str) -> Venue {
    let (status, building) = send(
        app.clone(),
        "POST",
        "/api/buildings",
        Some(token),
        Some(json!({ "code": "BAT-A", "name": "Building A", "floors": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let mut rooms = Vec::new();
    for (code, capacity) in [("A101", 40), ("A201", 120)] {
        let (status, room) = send(
            app.clone(),
            "POST",
            "/api/rooms",
            Some(token),
            Some(json!({
                "building_id": building["id"],
                "code": code,
                "name": code,
                "room_type": "CLASSROOM",
                "capacity": capacity
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        rooms.push(room["id"].clone());
    }

    let (status, slot) = send(
        app.clone(),
        "POST",
        "/api/time-slots",
        Some(token),
        Some(json!({
            "code": "MON-1",
            "day": "MONDAY",
            "start_time": "08:00:00",
            "end_time": "10:00:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    Venue {
        room_id: rooms[0].clone(),
        spare_room_id: rooms[1].clone(),
        time_slot_id: slot["id"].clone(),
    }
}

fn course_body(structure: &TestStructure, venue: &Venue, expected_size: i32) -> Value {
    json!({
        "academic_year_id": structure.academic_year_id,
        "subject_id": structure.subject_id,
        "program_id": structure.program_id,
        "room_id": venue.room_id,
        "time_slot_id": venue.time_slot_id,
        "kind": "LECTURE",
        "expected_size": expected_size,
        "semester": 1
    })
}

#[sqlx::test(migrations = "./migrations")]
async fn test_time_slot_must_end_after_start(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let (status, body) = send(
        app,
        "POST",
        "/api/time-slots",
        Some(&token),
        Some(json!({
            "code": "TUE-1",
            "day": "TUESDAY",
            "start_time": "10:00:00",
            "end_time": "08:00:00"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "end_time must be after start_time");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_course_placement_rejects_clashes(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let venue = create_venue(&app, &token).await;

    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/courses",
        Some(&token),
        Some(course_body(&structure, &venue, 50)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, course) = send(
        app.clone(),
        "POST",
        "/api/courses",
        Some(&token),
        Some(course_body(&structure, &venue, 30)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(course["is_active"], true);

    let (status, body) = send(
        app.clone(),
        "POST",
        "/api/courses",
        Some(&token),
        Some(course_body(&structure, &venue, 20)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Room is already booked for this time slot");

    let (status, available) = send(
        app.clone(),
        "GET",
        &format!(
            "/api/rooms/available?time_slot_id={}&academic_year_id={}",
            venue.time_slot_id.as_str().unwrap(),
            structure.academic_year_id
        ),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let available = available.as_array().unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0]["id"], venue.spare_room_id);

    let (status, occupancy) = send(
        app,
        "GET",
        &format!("/api/rooms/{}/occupancy", venue.room_id.as_str().unwrap()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(occupancy["occupied_slots"], 1);
    assert_eq!(occupancy["total_slots"], 1);
    assert_eq!(occupancy["occupancy_rate"], 100.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_timetable_groups_courses_by_day(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let student = create_test_user(&mut tx, "student").await;
    let structure = create_test_structure(&mut tx).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let venue = create_venue(&app, &token).await;
    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/courses",
        Some(&token),
        Some(course_body(&structure, &venue, 25)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (app, token) = login(&pool, &student).await;
    let (status, timetable) = send(
        app,
        "GET",
        &format!(
            "/api/courses/timetable?program_id={}&academic_year_id={}",
            structure.program_id, structure.academic_year_id
        ),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let days = timetable.as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["day"], "MONDAY");
    assert_eq!(days[0]["courses"][0]["room_code"], "A101");
    assert_eq!(days[0]["courses"][0]["subject_name"], "Algorithms");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_conflict_detection_and_resolution(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, "admin").await;
    let structure = create_test_structure(&mut tx).await;
    tx.commit().await.unwrap();

    let (app, token) = login(&pool, &admin).await;
    let venue = create_venue(&app, &token).await;
    let (status, _) = send(
        app.clone(),
        "POST",
        "/api/courses",
        Some(&token),
        Some(course_body(&structure, &venue, 30)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Written directly so the placement checks are bypassed.
    sqlx::query(
        r#"INSERT INTO courses
            (academic_year_id, subject_id, program_id, room_id, time_slot_id, kind, expected_size, semester)
           VALUES ($1, $2, $3, $4::UUID, $5::UUID, 'TUTORIAL', 50, 1)"#,
    )
    .bind(structure.academic_year_id)
    .bind(structure.subject_id)
    .bind(structure.program_id)
    .bind(venue.room_id.as_str().unwrap())
    .bind(venue.time_slot_id.as_str().unwrap())
    .execute(&pool)
    .await
    .unwrap();

    let detect = json!({ "academic_year_id": structure.academic_year_id });
    let (status, found) = send(
        app.clone(),
        "POST",
        "/api/conflicts/detect",
        Some(&token),
        Some(detect.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["room"], 1);
    assert_eq!(found["capacity"], 1);
    assert_eq!(found["teacher"], 0);
    assert_eq!(found["total"], 2);

    let (_, again) = send(
        app.clone(),
        "POST",
        "/api/conflicts/detect",
        Some(&token),
        Some(detect),
    )
    .await;
    assert_eq!(again["total"], 0);

    let (_, conflicts) = send(
        app.clone(),
        "GET",
        "/api/conflicts?kind=ROOM",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(conflicts["meta"]["total"], 1);
    let resolve_uri = format!(
        "/api/conflicts/{}/resolve",
        conflicts["data"][0]["id"].as_str().unwrap()
    );

    let (status, resolved) = send(
        app.clone(),
        "POST",
        &resolve_uri,
        Some(&token),
        Some(json!({ "resolution": "Tutorial moved to A201" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "RESOLVED");
    assert_eq!(resolved["resolution"], "Tutorial moved to A201");

    let (status, body) = send(
        app,
        "POST",
        &resolve_uri,
        Some(&token),
        Some(json!({ "resolution": "again" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Conflict is already RESOLVED");
}
