use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use campus_core::AppError;
use campus_models::YearScope;
use campus_models::ids::{AssignmentId, TeacherId};

use crate::middleware::auth::{RequireTeachersRead, RequireTeachersWrite};
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{
    AssignmentFilterParams, CreateAssignmentDto, CreateTeacherDto, PaginatedAssignmentsResponse,
    PaginatedTeachersResponse, Teacher, TeacherFilterParams, TeacherStatistics,
    TeachingAssignment, UpdateAssignmentDto, UpdateTeacherDto, Workload,
};
use super::service::{AssignmentService, TeacherService};

/// Register a teacher together with their user account
#[utoipa::path(
    post,
    path = "/api/teachers",
    request_body = CreateTeacherDto,
    responses(
        (status = 201, description = "Teacher registered", body = Teacher),
        (status = 400, description = "Email already in use or unknown department"),
        (status = 403, description = "Forbidden - requires teachers:write permission")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_teacher(
    State(state): State<AppState>,
    RequireTeachersWrite(_auth_user): RequireTeachersWrite,
    ValidatedJson(dto): ValidatedJson<CreateTeacherDto>,
) -> Result<(StatusCode, Json<Teacher>), AppError> {
    let teacher = TeacherService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(teacher)))
}

#[utoipa::path(
    get,
    path = "/api/teachers",
    params(TeacherFilterParams),
    responses(
        (status = 200, description = "Teachers ordered by name", body = PaginatedTeachersResponse)
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_teachers(
    State(state): State<AppState>,
    RequireTeachersRead(_auth_user): RequireTeachersRead,
    Query(filters): Query<TeacherFilterParams>,
) -> Result<Json<PaginatedTeachersResponse>, AppError> {
    Ok(Json(TeacherService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/teachers/statistics",
    responses((status = 200, description = "Teacher counts by status and grade", body = TeacherStatistics)),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_teacher_statistics(
    State(state): State<AppState>,
    RequireTeachersRead(_auth_user): RequireTeachersRead,
) -> Result<Json<TeacherStatistics>, AppError> {
    Ok(Json(TeacherService::statistics(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/teachers/{id}",
    params(("id" = String, Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Teacher", body = Teacher),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_teacher(
    State(state): State<AppState>,
    RequireTeachersRead(_auth_user): RequireTeachersRead,
    Path(id): Path<TeacherId>,
) -> Result<Json<Teacher>, AppError> {
    Ok(Json(TeacherService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/teachers/{id}",
    params(("id" = String, Path, description = "Teacher ID")),
    request_body = UpdateTeacherDto,
    responses(
        (status = 200, description = "Teacher updated", body = Teacher),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_teacher(
    State(state): State<AppState>,
    RequireTeachersWrite(_auth_user): RequireTeachersWrite,
    Path(id): Path<TeacherId>,
    ValidatedJson(dto): ValidatedJson<UpdateTeacherDto>,
) -> Result<Json<Teacher>, AppError> {
    Ok(Json(TeacherService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/teachers/{id}",
    params(("id" = String, Path, description = "Teacher ID")),
    responses(
        (status = 204, description = "Teacher and account deleted"),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_teacher(
    State(state): State<AppState>,
    RequireTeachersWrite(_auth_user): RequireTeachersWrite,
    Path(id): Path<TeacherId>,
) -> Result<StatusCode, AppError> {
    TeacherService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/teachers/{id}/assignments",
    params(("id" = String, Path, description = "Teacher ID"), YearScope),
    responses(
        (status = 200, description = "Teaching assignments", body = Vec<TeachingAssignment>),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_teacher_assignments(
    State(state): State<AppState>,
    RequireTeachersRead(_auth_user): RequireTeachersRead,
    Path(id): Path<TeacherId>,
    Query(scope): Query<YearScope>,
) -> Result<Json<Vec<TeachingAssignment>>, AppError> {
    Ok(Json(
        TeacherService::assignments(&state.db, id, scope.academic_year_id).await?,
    ))
}

/// Hours per assignment kind, optionally for one academic year
#[utoipa::path(
    get,
    path = "/api/teachers/{id}/workload",
    params(("id" = String, Path, description = "Teacher ID"), YearScope),
    responses(
        (status = 200, description = "Workload", body = Workload),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_teacher_workload(
    State(state): State<AppState>,
    RequireTeachersRead(_auth_user): RequireTeachersRead,
    Path(id): Path<TeacherId>,
    Query(scope): Query<YearScope>,
) -> Result<Json<Workload>, AppError> {
    Ok(Json(
        TeacherService::workload(&state.db, id, scope.academic_year_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/assignments",
    request_body = CreateAssignmentDto,
    responses(
        (status = 201, description = "Assignment created", body = TeachingAssignment),
        (status = 400, description = "Duplicate assignment or unknown reference")
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_assignment(
    State(state): State<AppState>,
    RequireTeachersWrite(_auth_user): RequireTeachersWrite,
    ValidatedJson(dto): ValidatedJson<CreateAssignmentDto>,
) -> Result<(StatusCode, Json<TeachingAssignment>), AppError> {
    let assignment = AssignmentService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    get,
    path = "/api/assignments",
    params(AssignmentFilterParams),
    responses((status = 200, description = "Assignments", body = PaginatedAssignmentsResponse)),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_assignments(
    State(state): State<AppState>,
    RequireTeachersRead(_auth_user): RequireTeachersRead,
    Query(filters): Query<AssignmentFilterParams>,
) -> Result<Json<PaginatedAssignmentsResponse>, AppError> {
    Ok(Json(AssignmentService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/assignments/{id}",
    params(("id" = String, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment", body = TeachingAssignment),
        (status = 404, description = "Assignment not found")
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_assignment(
    State(state): State<AppState>,
    RequireTeachersRead(_auth_user): RequireTeachersRead,
    Path(id): Path<AssignmentId>,
) -> Result<Json<TeachingAssignment>, AppError> {
    Ok(Json(AssignmentService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/assignments/{id}",
    params(("id" = String, Path, description = "Assignment ID")),
    request_body = UpdateAssignmentDto,
    responses(
        (status = 200, description = "Assignment updated", body = TeachingAssignment),
        (status = 404, description = "Assignment not found")
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_assignment(
    State(state): State<AppState>,
    RequireTeachersWrite(_auth_user): RequireTeachersWrite,
    Path(id): Path<AssignmentId>,
    ValidatedJson(dto): ValidatedJson<UpdateAssignmentDto>,
) -> Result<Json<TeachingAssignment>, AppError> {
    Ok(Json(AssignmentService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/assignments/{id}",
    params(("id" = String, Path, description = "Assignment ID")),
    responses(
        (status = 204, description = "Assignment deleted"),
        (status = 404, description = "Assignment not found")
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_assignment(
    State(state): State<AppState>,
    RequireTeachersWrite(_auth_user): RequireTeachersWrite,
    Path(id): Path<AssignmentId>,
) -> Result<StatusCode, AppError> {
    AssignmentService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
