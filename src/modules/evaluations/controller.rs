use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use campus_core::{AppError, PaginationParams};
use campus_models::YearScope;
use campus_models::ids::{EvaluationId, EvaluationTypeId, GradeId, ResultId, StudentId};

use crate::middleware::auth::{
    RequireEvaluationsRead, RequireEvaluationsWrite, RequireGradesRead, RequireGradesWrite,
    RequireResultsCompute, RequireResultsRead,
};
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{
    BulkGradeDto, BulkGradeResponse, ComputeResultDto, ComputeSubjectResultsDto,
    ComputeSubjectResultsResponse, CreateEvaluationDto, CreateEvaluationTypeDto, CreateGradeDto,
    DuplicateEvaluationDto, Evaluation, EvaluationFilterParams, EvaluationStatistics,
    EvaluationType, Grade, GradeFilterParams, PaginatedEvaluationTypesResponse,
    PaginatedEvaluationsResponse, PaginatedGradesResponse, PaginatedResultsResponse,
    ResultFilterParams, ResultStatistics, ResultStatisticsParams, SubjectResult, Transcript,
    UpdateEvaluationDto, UpdateEvaluationTypeDto, UpdateGradeDto,
};
use super::service::{EvaluationService, EvaluationTypeService, GradeService, ResultService};

// =============================================================================
// Evaluation types
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/evaluation-types",
    request_body = CreateEvaluationTypeDto,
    responses(
        (status = 201, description = "Evaluation type created", body = EvaluationType),
        (status = 400, description = "Duplicate code or min_coefficient above max_coefficient")
    ),
    tag = "Evaluations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_evaluation_type(
    State(state): State<AppState>,
    RequireEvaluationsWrite(_auth_user): RequireEvaluationsWrite,
    ValidatedJson(dto): ValidatedJson<CreateEvaluationTypeDto>,
) -> Result<(StatusCode, Json<EvaluationType>), AppError> {
    let evaluation_type = EvaluationTypeService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(evaluation_type)))
}

#[utoipa::path(
    get,
    path = "/api/evaluation-types",
    params(PaginationParams),
    responses((status = 200, description = "Evaluation types", body = PaginatedEvaluationTypesResponse)),
    tag = "Evaluations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_evaluation_types(
    State(state): State<AppState>,
    RequireEvaluationsRead(_auth_user): RequireEvaluationsRead,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedEvaluationTypesResponse>, AppError> {
    Ok(Json(EvaluationTypeService::list(&state.db, pagination).await?))
}

#[utoipa::path(
    get,
    path = "/api/evaluation-types/{id}",
    params(("id" = String, Path, description = "Evaluation type ID")),
    responses(
        (status = 200, description = "Evaluation type", body = EvaluationType),
        (status = 404, description = "Evaluation type not found")
    ),
    tag = "Evaluations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_evaluation_type(
    State(state): State<AppState>,
    RequireEvaluationsRead(_auth_user): RequireEvaluationsRead,
    Path(id): Path<EvaluationTypeId>,
) -> Result<Json<EvaluationType>, AppError> {
    Ok(Json(EvaluationTypeService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/evaluation-types/{id}",
    params(("id" = String, Path, description = "Evaluation type ID")),
    request_body = UpdateEvaluationTypeDto,
    responses(
        (status = 200, description = "Evaluation type updated", body = EvaluationType),
        (status = 400, description = "min_coefficient above max_coefficient"),
        (status = 404, description = "Evaluation type not found")
    ),
    tag = "Evaluations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_evaluation_type(
    State(state): State<AppState>,
    RequireEvaluationsWrite(_auth_user): RequireEvaluationsWrite,
    Path(id): Path<EvaluationTypeId>,
    ValidatedJson(dto): ValidatedJson<UpdateEvaluationTypeDto>,
) -> Result<Json<EvaluationType>, AppError> {
    Ok(Json(EvaluationTypeService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/evaluation-types/{id}",
    params(("id" = String, Path, description = "Evaluation type ID")),
    responses(
        (status = 204, description = "Evaluation type deleted"),
        (status = 400, description = "Evaluation type still in use"),
        (status = 404, description = "Evaluation type not found")
    ),
    tag = "Evaluations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_evaluation_type(
    State(state): State<AppState>,
    RequireEvaluationsWrite(_auth_user): RequireEvaluationsWrite,
    Path(id): Path<EvaluationTypeId>,
) -> Result<StatusCode, AppError> {
    EvaluationTypeService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Evaluations
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/evaluations",
    request_body = CreateEvaluationDto,
    responses(
        (status = 201, description = "Evaluation created", body = Evaluation),
        (status = 400, description = "Duplicate title or coefficient outside the type's range")
    ),
    tag = "Evaluations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_evaluation(
    State(state): State<AppState>,
    RequireEvaluationsWrite(_auth_user): RequireEvaluationsWrite,
    ValidatedJson(dto): ValidatedJson<CreateEvaluationDto>,
) -> Result<(StatusCode, Json<Evaluation>), AppError> {
    let evaluation = EvaluationService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(evaluation)))
}

#[utoipa::path(
    get,
    path = "/api/evaluations",
    params(EvaluationFilterParams),
    responses((status = 200, description = "Evaluations, latest first", body = PaginatedEvaluationsResponse)),
    tag = "Evaluations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_evaluations(
    State(state): State<AppState>,
    RequireEvaluationsRead(_auth_user): RequireEvaluationsRead,
    Query(filters): Query<EvaluationFilterParams>,
) -> Result<Json<PaginatedEvaluationsResponse>, AppError> {
    Ok(Json(EvaluationService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/evaluations/{id}",
    params(("id" = String, Path, description = "Evaluation ID")),
    responses(
        (status = 200, description = "Evaluation", body = Evaluation),
        (status = 404, description = "Evaluation not found")
    ),
    tag = "Evaluations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_evaluation(
    State(state): State<AppState>,
    RequireEvaluationsRead(_auth_user): RequireEvaluationsRead,
    Path(id): Path<EvaluationId>,
) -> Result<Json<Evaluation>, AppError> {
    Ok(Json(EvaluationService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/evaluations/{id}",
    params(("id" = String, Path, description = "Evaluation ID")),
    request_body = UpdateEvaluationDto,
    responses(
        (status = 200, description = "Evaluation updated", body = Evaluation),
        (status = 404, description = "Evaluation not found")
    ),
    tag = "Evaluations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_evaluation(
    State(state): State<AppState>,
    RequireEvaluationsWrite(_auth_user): RequireEvaluationsWrite,
    Path(id): Path<EvaluationId>,
    ValidatedJson(dto): ValidatedJson<UpdateEvaluationDto>,
) -> Result<Json<Evaluation>, AppError> {
    Ok(Json(EvaluationService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/evaluations/{id}",
    params(("id" = String, Path, description = "Evaluation ID")),
    responses(
        (status = 204, description = "Evaluation and its grades deleted"),
        (status = 404, description = "Evaluation not found")
    ),
    tag = "Evaluations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_evaluation(
    State(state): State<AppState>,
    RequireEvaluationsWrite(_auth_user): RequireEvaluationsWrite,
    Path(id): Path<EvaluationId>,
) -> Result<StatusCode, AppError> {
    EvaluationService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/evaluations/{id}/grades",
    params(("id" = String, Path, description = "Evaluation ID")),
    responses(
        (status = 200, description = "Grades ordered by student name", body = Vec<Grade>),
        (status = 404, description = "Evaluation not found")
    ),
    tag = "Evaluations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_evaluation_grades(
    State(state): State<AppState>,
    RequireGradesRead(_auth_user): RequireGradesRead,
    Path(id): Path<EvaluationId>,
) -> Result<Json<Vec<Grade>>, AppError> {
    Ok(Json(EvaluationService::grades(&state.db, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/evaluations/{id}/statistics",
    params(("id" = String, Path, description = "Evaluation ID")),
    responses(
        (status = 200, description = "Class statistics over present students", body = EvaluationStatistics),
        (status = 404, description = "Evaluation not found")
    ),
    tag = "Evaluations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_evaluation_statistics(
    State(state): State<AppState>,
    RequireGradesRead(_auth_user): RequireGradesRead,
    Path(id): Path<EvaluationId>,
) -> Result<Json<EvaluationStatistics>, AppError> {
    Ok(Json(EvaluationService::statistics(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/evaluations/{id}/duplicate",
    params(("id" = String, Path, description = "Evaluation ID")),
    request_body = DuplicateEvaluationDto,
    responses(
        (status = 201, description = "Copy created", body = Evaluation),
        (status = 400, description = "Title already used for the subject and year"),
        (status = 404, description = "Evaluation not found")
    ),
    tag = "Evaluations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn duplicate_evaluation(
    State(state): State<AppState>,
    RequireEvaluationsWrite(_auth_user): RequireEvaluationsWrite,
    Path(id): Path<EvaluationId>,
    ValidatedJson(dto): ValidatedJson<DuplicateEvaluationDto>,
) -> Result<(StatusCode, Json<Evaluation>), AppError> {
    let evaluation = EvaluationService::duplicate(&state.db, id, dto).await?;
    Ok((StatusCode::CREATED, Json(evaluation)))
}

// =============================================================================
// Grades
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/grades",
    request_body = CreateGradeDto,
    responses(
        (status = 201, description = "Grade recorded", body = Grade),
        (status = 400, description = "Score missing, above out_of, or already graded"),
        (status = 404, description = "Evaluation not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_grade(
    State(state): State<AppState>,
    RequireGradesWrite(_auth_user): RequireGradesWrite,
    ValidatedJson(dto): ValidatedJson<CreateGradeDto>,
) -> Result<(StatusCode, Json<Grade>), AppError> {
    let grade = GradeService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(grade)))
}

#[utoipa::path(
    get,
    path = "/api/grades",
    params(GradeFilterParams),
    responses((status = 200, description = "Grades", body = PaginatedGradesResponse)),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_grades(
    State(state): State<AppState>,
    RequireGradesRead(_auth_user): RequireGradesRead,
    Query(filters): Query<GradeFilterParams>,
) -> Result<Json<PaginatedGradesResponse>, AppError> {
    Ok(Json(GradeService::list(&state.db, filters).await?))
}

/// Upsert grades for many students of one evaluation
#[utoipa::path(
    post,
    path = "/api/grades/bulk",
    request_body = BulkGradeDto,
    responses(
        (status = 200, description = "Counts of created and updated grades with per-student errors", body = BulkGradeResponse),
        (status = 404, description = "Evaluation not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn bulk_grades(
    State(state): State<AppState>,
    RequireGradesWrite(_auth_user): RequireGradesWrite,
    ValidatedJson(dto): ValidatedJson<BulkGradeDto>,
) -> Result<Json<BulkGradeResponse>, AppError> {
    Ok(Json(GradeService::bulk(&state.db, dto).await?))
}

#[utoipa::path(
    get,
    path = "/api/grades/by-student/{student_id}",
    params(("student_id" = String, Path, description = "Student ID"), YearScope),
    responses((status = 200, description = "The student's grades", body = Vec<Grade>)),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_grades_by_student(
    State(state): State<AppState>,
    RequireGradesRead(_auth_user): RequireGradesRead,
    Path(student_id): Path<StudentId>,
    Query(scope): Query<YearScope>,
) -> Result<Json<Vec<Grade>>, AppError> {
    Ok(Json(
        GradeService::by_student(&state.db, student_id, scope.academic_year_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/grades/{id}",
    params(("id" = String, Path, description = "Grade ID")),
    responses(
        (status = 200, description = "Grade", body = Grade),
        (status = 404, description = "Grade not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_grade(
    State(state): State<AppState>,
    RequireGradesRead(_auth_user): RequireGradesRead,
    Path(id): Path<GradeId>,
) -> Result<Json<Grade>, AppError> {
    Ok(Json(GradeService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/grades/{id}",
    params(("id" = String, Path, description = "Grade ID")),
    request_body = UpdateGradeDto,
    responses(
        (status = 200, description = "Grade updated", body = Grade),
        (status = 400, description = "Score missing or above out_of"),
        (status = 404, description = "Grade not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_grade(
    State(state): State<AppState>,
    RequireGradesWrite(_auth_user): RequireGradesWrite,
    Path(id): Path<GradeId>,
    ValidatedJson(dto): ValidatedJson<UpdateGradeDto>,
) -> Result<Json<Grade>, AppError> {
    Ok(Json(GradeService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/grades/{id}",
    params(("id" = String, Path, description = "Grade ID")),
    responses(
        (status = 204, description = "Grade deleted"),
        (status = 404, description = "Grade not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_grade(
    State(state): State<AppState>,
    RequireGradesWrite(_auth_user): RequireGradesWrite,
    Path(id): Path<GradeId>,
) -> Result<StatusCode, AppError> {
    GradeService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Results
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/results",
    params(ResultFilterParams),
    responses((status = 200, description = "Results, best average first", body = PaginatedResultsResponse)),
    tag = "Results",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_results(
    State(state): State<AppState>,
    RequireResultsRead(_auth_user): RequireResultsRead,
    Query(filters): Query<ResultFilterParams>,
) -> Result<Json<PaginatedResultsResponse>, AppError> {
    Ok(Json(ResultService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/results/{id}",
    params(("id" = String, Path, description = "Result ID")),
    responses(
        (status = 200, description = "Result", body = SubjectResult),
        (status = 404, description = "Result not found")
    ),
    tag = "Results",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_result(
    State(state): State<AppState>,
    RequireResultsRead(_auth_user): RequireResultsRead,
    Path(id): Path<ResultId>,
) -> Result<Json<SubjectResult>, AppError> {
    Ok(Json(ResultService::get(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/results/compute",
    request_body = ComputeResultDto,
    responses(
        (status = 200, description = "Result computed and stored", body = SubjectResult),
        (status = 404, description = "Subject not found")
    ),
    tag = "Results",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn compute_result(
    State(state): State<AppState>,
    RequireResultsCompute(_auth_user): RequireResultsCompute,
    ValidatedJson(dto): ValidatedJson<ComputeResultDto>,
) -> Result<Json<SubjectResult>, AppError> {
    Ok(Json(
        ResultService::compute(&state.db, dto.student_id, dto.subject_id, dto.academic_year_id)
            .await?,
    ))
}

/// Compute and rank results for every graded student of a subject
#[utoipa::path(
    post,
    path = "/api/results/compute-subject",
    request_body = ComputeSubjectResultsDto,
    responses(
        (status = 200, description = "Results ranked best first", body = ComputeSubjectResultsResponse),
        (status = 404, description = "Subject not found")
    ),
    tag = "Results",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn compute_subject_results(
    State(state): State<AppState>,
    RequireResultsCompute(_auth_user): RequireResultsCompute,
    ValidatedJson(dto): ValidatedJson<ComputeSubjectResultsDto>,
) -> Result<Json<ComputeSubjectResultsResponse>, AppError> {
    Ok(Json(
        ResultService::compute_subject(&state.db, dto.subject_id, dto.academic_year_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/results/transcript/{student_id}",
    params(("student_id" = String, Path, description = "Student ID"), YearScope),
    responses(
        (status = 200, description = "Results with credits and overall average", body = Transcript),
        (status = 404, description = "Student not found")
    ),
    tag = "Results",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_transcript(
    State(state): State<AppState>,
    RequireResultsRead(_auth_user): RequireResultsRead,
    Path(student_id): Path<StudentId>,
    Query(scope): Query<YearScope>,
) -> Result<Json<Transcript>, AppError> {
    Ok(Json(
        ResultService::transcript(&state.db, student_id, scope.academic_year_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/results/statistics",
    params(ResultStatisticsParams),
    responses((status = 200, description = "Counts by status and mention", body = ResultStatistics)),
    tag = "Results",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_result_statistics(
    State(state): State<AppState>,
    RequireResultsRead(_auth_user): RequireResultsRead,
    Query(params): Query<ResultStatisticsParams>,
) -> Result<Json<ResultStatistics>, AppError> {
    Ok(Json(ResultService::statistics(&state.db, params).await?))
}
