#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use campus::campus_config::{CorsConfig, EmailConfig, JwtConfig};
use campus::campus_core::hash_password;
use campus::router::init_router;
use campus::state::AppState;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::{PgPool, Postgres, Transaction};
use tower::ServiceExt;
use uuid::Uuid;

/// Well-known system role IDs (must match migration)
pub mod system_roles {
    use uuid::Uuid;
    pub const SYSTEM_ADMIN: Uuid = Uuid::from_u128(0x00000000_0000_0000_0000_000000000001);
    pub const ADMIN: Uuid = Uuid::from_u128(0x00000000_0000_0000_0000_000000000002);
    pub const TEACHER: Uuid = Uuid::from_u128(0x00000000_0000_0000_0000_000000000003);
    pub const STUDENT: Uuid = Uuid::from_u128(0x00000000_0000_0000_0000_000000000004);
}

pub const TEST_PASSWORD: &str = "testpass123";

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
}

/// Ids of one faculty > department > program chain, a subject linked to the
/// program and an active academic year.
pub struct TestStructure {
    pub faculty_id: Uuid,
    pub department_id: Uuid,
    pub program_id: Uuid,
    pub subject_id: Uuid,
    pub academic_year_id: Uuid,
}

pub struct TestStudent {
    pub user: TestUser,
    pub student_id: Uuid,
    pub enrollment_id: Uuid,
}

pub async fn setup_test_app(pool: PgPool) -> axum::Router {
    dotenvy::dotenv().ok();
    let state = AppState {
        db: pool,
        jwt_config: JwtConfig::from_env(),
        email_config: EmailConfig::disabled(),
        cors_config: CorsConfig::from_env(),
    };
    init_router(state)
}

pub fn generate_unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

/// Short unique code fitting the 20-character code columns.
pub fn generate_unique_code(prefix: &str) -> String {
    format!("{}{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

/// Create a test user with specified role
/// role should be one of: "system_admin", "admin", "teacher", "student"
pub async fn create_test_user(tx: &mut Transaction<'_, Postgres>, role: &str) -> TestUser {
    let email = generate_unique_email();
    let hashed = hash_password(TEST_PASSWORD).unwrap();

    let id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO users (first_name, last_name, email, password)
           VALUES ('Test', 'User', $1, $2)
           RETURNING id"#,
    )
    .bind(&email)
    .bind(&hashed)
    .fetch_one(&mut **tx)
    .await
    .unwrap();

    let role_id = match role {
        "system_admin" => system_roles::SYSTEM_ADMIN,
        "admin" => system_roles::ADMIN,
        "teacher" => system_roles::TEACHER,
        "student" => system_roles::STUDENT,
        _ => panic!("Invalid role: {}", role),
    };

    sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(id)
        .bind(role_id)
        .execute(&mut **tx)
        .await
        .unwrap();

    TestUser {
        id,
        email,
        password: TEST_PASSWORD.to_string(),
    }
}

pub async fn create_test_structure(tx: &mut Transaction<'_, Postgres>) -> TestStructure {
    let faculty_id: Uuid = sqlx::query_scalar(
        "INSERT INTO faculties (code, name) VALUES ($1, 'Faculty of Sciences') RETURNING id",
    )
    .bind(generate_unique_code("F"))
    .fetch_one(&mut **tx)
    .await
    .unwrap();

    let department_id: Uuid = sqlx::query_scalar(
        "INSERT INTO departments (faculty_id, code, name) VALUES ($1, $2, 'Computer Science') RETURNING id",
    )
    .bind(faculty_id)
    .bind(generate_unique_code("D"))
    .fetch_one(&mut **tx)
    .await
    .unwrap();

    let program_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO programs (department_id, code, name, cycle, duration_years, registration_fee)
           VALUES ($1, $2, 'Licence in Computer Science', 'LICENCE', 3, 150000)
           RETURNING id"#,
    )
    .bind(department_id)
    .bind(generate_unique_code("P"))
    .fetch_one(&mut **tx)
    .await
    .unwrap();

    let subject_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO subjects (code, name, coefficient, credits, semester)
           VALUES ($1, 'Algorithms', 2, 4, 1)
           RETURNING id"#,
    )
    .bind(generate_unique_code("S"))
    .fetch_one(&mut **tx)
    .await
    .unwrap();

    sqlx::query("INSERT INTO program_subjects (program_id, subject_id) VALUES ($1, $2)")
        .bind(program_id)
        .bind(subject_id)
        .execute(&mut **tx)
        .await
        .unwrap();

    sqlx::query("UPDATE academic_years SET is_active = FALSE WHERE is_active")
        .execute(&mut **tx)
        .await
        .unwrap();

    let academic_year_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO academic_years (code, start_date, end_date, is_active)
           VALUES ($1, '2024-09-01', '2025-07-31', TRUE)
           RETURNING id"#,
    )
    .bind(generate_unique_code("Y"))
    .fetch_one(&mut **tx)
    .await
    .unwrap();

    TestStructure {
        faculty_id,
        department_id,
        program_id,
        subject_id,
        academic_year_id,
    }
}

/// A student account with a profile, enrolled at level 1 of the program.
pub async fn create_test_student(
    tx: &mut Transaction<'_, Postgres>,
    structure: &TestStructure,
) -> TestStudent {
    let user = create_test_user(tx, "student").await;

    let student_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO students (user_id, registration_number, date_of_birth, place_of_birth, sex, nationality)
           VALUES ($1, $2, '2003-05-14', 'Dakar', 'F', 'Senegalese')
           RETURNING id"#,
    )
    .bind(user.id)
    .bind(generate_unique_code("T"))
    .fetch_one(&mut **tx)
    .await
    .unwrap();

    let enrollment_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO enrollments (student_id, program_id, academic_year_id, level, registration_fee)
           VALUES ($1, $2, $3, 1, 150000)
           RETURNING id"#,
    )
    .bind(student_id)
    .bind(structure.program_id)
    .bind(structure.academic_year_id)
    .fetch_one(&mut **tx)
    .await
    .unwrap();

    TestStudent {
        user,
        student_id,
        enrollment_id,
    }
}

pub async fn get_auth_token(app: axum::Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["access_token"].as_str().unwrap().to_string()
}

/// Sends one request and returns the status with the decoded JSON body
/// (`Value::Null` for empty bodies).
pub async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

/// Logs `user` in against a fresh router and returns the router and token.
pub async fn login(pool: &PgPool, user: &TestUser) -> (axum::Router, String) {
    let app = setup_test_app(pool.clone()).await;
    let token = get_auth_token(app.clone(), &user.email, &user.password).await;
    (app, token)
}
