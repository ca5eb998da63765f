use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use campus_core::AppError;
use campus_models::ids::{EnrollmentId, StudentId};

use crate::middleware::auth::{
    RequireEnrollmentsRead, RequireEnrollmentsWrite, RequireStudentsRead, RequireStudentsWrite,
};
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{
    CreateEnrollmentDto, CreateStudentDto, Enrollment, EnrollmentFilterParams,
    EnrollmentPaymentDto, EnrollmentStatistics, PaginatedEnrollmentsResponse,
    PaginatedStudentsResponse, Student, StudentFilterParams, StudentStatistics,
    UpdateEnrollmentDto, UpdateStudentDto,
};
use super::service::{EnrollmentService, StudentService};

// =============================================================================
// Students
// =============================================================================

/// Register a student together with their user account
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudentDto,
    responses(
        (status = 201, description = "Student registered", body = Student),
        (status = 400, description = "Email already in use"),
        (status = 403, description = "Forbidden - requires students:write permission")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_student(
    State(state): State<AppState>,
    RequireStudentsWrite(_auth_user): RequireStudentsWrite,
    ValidatedJson(dto): ValidatedJson<CreateStudentDto>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let student = StudentService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

#[utoipa::path(
    get,
    path = "/api/students",
    params(StudentFilterParams),
    responses(
        (status = 200, description = "Students ordered by name", body = PaginatedStudentsResponse),
        (status = 403, description = "Forbidden - requires students:read permission")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_students(
    State(state): State<AppState>,
    RequireStudentsRead(_auth_user): RequireStudentsRead,
    Query(filters): Query<StudentFilterParams>,
) -> Result<Json<PaginatedStudentsResponse>, AppError> {
    Ok(Json(StudentService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/students/statistics",
    responses(
        (status = 200, description = "Student counts by status and sex", body = StudentStatistics)
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student_statistics(
    State(state): State<AppState>,
    RequireStudentsRead(_auth_user): RequireStudentsRead,
) -> Result<Json<StudentStatistics>, AppError> {
    Ok(Json(StudentService::statistics(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id" = String, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student", body = Student),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student(
    State(state): State<AppState>,
    RequireStudentsRead(_auth_user): RequireStudentsRead,
    Path(id): Path<StudentId>,
) -> Result<Json<Student>, AppError> {
    Ok(Json(StudentService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/students/{id}",
    params(("id" = String, Path, description = "Student ID")),
    request_body = UpdateStudentDto,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_student(
    State(state): State<AppState>,
    RequireStudentsWrite(_auth_user): RequireStudentsWrite,
    Path(id): Path<StudentId>,
    ValidatedJson(dto): ValidatedJson<UpdateStudentDto>,
) -> Result<Json<Student>, AppError> {
    Ok(Json(StudentService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(("id" = String, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student and account deleted"),
        (status = 400, description = "Student is still referenced"),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_student(
    State(state): State<AppState>,
    RequireStudentsWrite(_auth_user): RequireStudentsWrite,
    Path(id): Path<StudentId>,
) -> Result<StatusCode, AppError> {
    StudentService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/students/{id}/enrollments",
    params(("id" = String, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Enrollments, latest first", body = Vec<Enrollment>),
        (status = 404, description = "Student not found")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student_enrollments(
    State(state): State<AppState>,
    RequireStudentsRead(_auth_user): RequireStudentsRead,
    Path(id): Path<StudentId>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    Ok(Json(StudentService::enrollments(&state.db, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}/active-enrollment",
    params(("id" = String, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Enrollment in the active academic year", body = Enrollment),
        (status = 404, description = "Student not found or not enrolled this year")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student_active_enrollment(
    State(state): State<AppState>,
    RequireStudentsRead(_auth_user): RequireStudentsRead,
    Path(id): Path<StudentId>,
) -> Result<Json<Enrollment>, AppError> {
    Ok(Json(StudentService::active_enrollment(&state.db, id).await?))
}

// =============================================================================
// Enrollments
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/enrollments",
    request_body = CreateEnrollmentDto,
    responses(
        (status = 201, description = "Enrollment created", body = Enrollment),
        (status = 400, description = "Duplicate enrollment or level beyond program duration"),
        (status = 404, description = "Program not found")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_enrollment(
    State(state): State<AppState>,
    RequireEnrollmentsWrite(_auth_user): RequireEnrollmentsWrite,
    ValidatedJson(dto): ValidatedJson<CreateEnrollmentDto>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = EnrollmentService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/enrollments",
    params(EnrollmentFilterParams),
    responses(
        (status = 200, description = "Enrollments", body = PaginatedEnrollmentsResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_enrollments(
    State(state): State<AppState>,
    RequireEnrollmentsRead(_auth_user): RequireEnrollmentsRead,
    Query(filters): Query<EnrollmentFilterParams>,
) -> Result<Json<PaginatedEnrollmentsResponse>, AppError> {
    Ok(Json(EnrollmentService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/enrollments/statistics",
    responses(
        (status = 200, description = "Enrollment and fee totals", body = EnrollmentStatistics)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_enrollment_statistics(
    State(state): State<AppState>,
    RequireEnrollmentsRead(_auth_user): RequireEnrollmentsRead,
) -> Result<Json<EnrollmentStatistics>, AppError> {
    Ok(Json(EnrollmentService::statistics(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/enrollments/{id}",
    params(("id" = String, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment", body = Enrollment),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_enrollment(
    State(state): State<AppState>,
    RequireEnrollmentsRead(_auth_user): RequireEnrollmentsRead,
    Path(id): Path<EnrollmentId>,
) -> Result<Json<Enrollment>, AppError> {
    Ok(Json(EnrollmentService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/enrollments/{id}",
    params(("id" = String, Path, description = "Enrollment ID")),
    request_body = UpdateEnrollmentDto,
    responses(
        (status = 200, description = "Enrollment updated", body = Enrollment),
        (status = 400, description = "Level beyond program duration"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_enrollment(
    State(state): State<AppState>,
    RequireEnrollmentsWrite(_auth_user): RequireEnrollmentsWrite,
    Path(id): Path<EnrollmentId>,
    ValidatedJson(dto): ValidatedJson<UpdateEnrollmentDto>,
) -> Result<Json<Enrollment>, AppError> {
    Ok(Json(EnrollmentService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/enrollments/{id}",
    params(("id" = String, Path, description = "Enrollment ID")),
    responses(
        (status = 204, description = "Enrollment deleted"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_enrollment(
    State(state): State<AppState>,
    RequireEnrollmentsWrite(_auth_user): RequireEnrollmentsWrite,
    Path(id): Path<EnrollmentId>,
) -> Result<StatusCode, AppError> {
    EnrollmentService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record a payment against the registration fee
#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/pay",
    params(("id" = String, Path, description = "Enrollment ID")),
    request_body = EnrollmentPaymentDto,
    responses(
        (status = 200, description = "Payment recorded", body = Enrollment),
        (status = 400, description = "Amount exceeds the remaining balance"),
        (status = 404, description = "Enrollment not found")
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn pay_enrollment(
    State(state): State<AppState>,
    RequireEnrollmentsWrite(_auth_user): RequireEnrollmentsWrite,
    Path(id): Path<EnrollmentId>,
    ValidatedJson(dto): ValidatedJson<EnrollmentPaymentDto>,
) -> Result<Json<Enrollment>, AppError> {
    Ok(Json(EnrollmentService::pay(&state.db, id, dto.amount).await?))
}
