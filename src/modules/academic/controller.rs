use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use campus_core::AppError;
use campus_models::ids::{AcademicYearId, DepartmentId, FacultyId, ProgramId, SubjectId};

use crate::middleware::auth::{RequireAcademicRead, RequireAcademicWrite};
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{
    AcademicYear, AcademicYearFilterParams, CreateAcademicYearDto, CreateDepartmentDto,
    CreateFacultyDto, CreateProgramDto, CreateSubjectDto, Department, DepartmentFilterParams,
    Faculty, FacultyFilterParams, FacultyStatistics, LinkSubjectDto,
    PaginatedAcademicYearsResponse, PaginatedDepartmentsResponse, PaginatedFacultiesResponse,
    PaginatedProgramsResponse, PaginatedSubjectsResponse, Program, ProgramFilterParams,
    SemesterQuery, SubjectDetail, SubjectFilterParams, UpdateAcademicYearDto,
    UpdateDepartmentDto, UpdateFacultyDto, UpdateProgramDto, UpdateSubjectDto,
};
use super::service::{
    AcademicYearService, DepartmentService, FacultyService, ProgramService, SubjectService,
};

// =============================================================================
// Academic years
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/academic-years",
    request_body = CreateAcademicYearDto,
    responses(
        (status = 201, description = "Academic year created", body = AcademicYear),
        (status = 400, description = "Duplicate code or end_date not after start_date"),
        (status = 403, description = "Forbidden - requires academic:write permission")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_academic_year(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    ValidatedJson(dto): ValidatedJson<CreateAcademicYearDto>,
) -> Result<(StatusCode, Json<AcademicYear>), AppError> {
    let year = AcademicYearService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(year)))
}

#[utoipa::path(
    get,
    path = "/api/academic-years",
    params(AcademicYearFilterParams),
    responses(
        (status = 200, description = "Academic years, latest first", body = PaginatedAcademicYearsResponse),
        (status = 403, description = "Forbidden - requires academic:read permission")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_academic_years(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Query(filters): Query<AcademicYearFilterParams>,
) -> Result<Json<PaginatedAcademicYearsResponse>, AppError> {
    Ok(Json(AcademicYearService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/academic-years/active",
    responses(
        (status = 200, description = "The active academic year", body = AcademicYear),
        (status = 404, description = "No active academic year")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_active_academic_year(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
) -> Result<Json<AcademicYear>, AppError> {
    Ok(Json(AcademicYearService::get_active(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/academic-years/{id}",
    params(("id" = AcademicYearId, Path, description = "Academic year ID")),
    responses(
        (status = 200, description = "Academic year", body = AcademicYear),
        (status = 404, description = "Academic year not found")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_academic_year(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Path(id): Path<AcademicYearId>,
) -> Result<Json<AcademicYear>, AppError> {
    Ok(Json(AcademicYearService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/academic-years/{id}",
    params(("id" = AcademicYearId, Path, description = "Academic year ID")),
    request_body = UpdateAcademicYearDto,
    responses(
        (status = 200, description = "Academic year updated", body = AcademicYear),
        (status = 400, description = "Duplicate code or invalid dates"),
        (status = 404, description = "Academic year not found")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_academic_year(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path(id): Path<AcademicYearId>,
    ValidatedJson(dto): ValidatedJson<UpdateAcademicYearDto>,
) -> Result<Json<AcademicYear>, AppError> {
    Ok(Json(AcademicYearService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/academic-years/{id}",
    params(("id" = AcademicYearId, Path, description = "Academic year ID")),
    responses(
        (status = 204, description = "Academic year deleted"),
        (status = 400, description = "Academic year still referenced"),
        (status = 404, description = "Academic year not found")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_academic_year(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path(id): Path<AcademicYearId>,
) -> Result<StatusCode, AppError> {
    AcademicYearService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/academic-years/{id}/activate",
    params(("id" = AcademicYearId, Path, description = "Academic year ID")),
    responses(
        (status = 200, description = "Year activated, all others deactivated", body = AcademicYear),
        (status = 404, description = "Academic year not found")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn activate_academic_year(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path(id): Path<AcademicYearId>,
) -> Result<Json<AcademicYear>, AppError> {
    Ok(Json(AcademicYearService::activate(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/academic-years/{id}/close",
    params(("id" = AcademicYearId, Path, description = "Academic year ID")),
    responses(
        (status = 200, description = "Year closed", body = AcademicYear),
        (status = 404, description = "Academic year not found")
    ),
    tag = "Academic Years",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn close_academic_year(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path(id): Path<AcademicYearId>,
) -> Result<Json<AcademicYear>, AppError> {
    Ok(Json(AcademicYearService::close(&state.db, id).await?))
}

// =============================================================================
// Faculties
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/faculties",
    request_body = CreateFacultyDto,
    responses(
        (status = 201, description = "Faculty created", body = Faculty),
        (status = 400, description = "Duplicate code")
    ),
    tag = "Faculties",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_faculty(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    ValidatedJson(dto): ValidatedJson<CreateFacultyDto>,
) -> Result<(StatusCode, Json<Faculty>), AppError> {
    let faculty = FacultyService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(faculty)))
}

#[utoipa::path(
    get,
    path = "/api/faculties",
    params(FacultyFilterParams),
    responses((status = 200, description = "Faculties", body = PaginatedFacultiesResponse)),
    tag = "Faculties",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_faculties(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Query(filters): Query<FacultyFilterParams>,
) -> Result<Json<PaginatedFacultiesResponse>, AppError> {
    Ok(Json(FacultyService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/faculties/{id}",
    params(("id" = FacultyId, Path, description = "Faculty ID")),
    responses(
        (status = 200, description = "Faculty", body = Faculty),
        (status = 404, description = "Faculty not found")
    ),
    tag = "Faculties",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_faculty(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Path(id): Path<FacultyId>,
) -> Result<Json<Faculty>, AppError> {
    Ok(Json(FacultyService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/faculties/{id}",
    params(("id" = FacultyId, Path, description = "Faculty ID")),
    request_body = UpdateFacultyDto,
    responses(
        (status = 200, description = "Faculty updated", body = Faculty),
        (status = 404, description = "Faculty not found")
    ),
    tag = "Faculties",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_faculty(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path(id): Path<FacultyId>,
    ValidatedJson(dto): ValidatedJson<UpdateFacultyDto>,
) -> Result<Json<Faculty>, AppError> {
    Ok(Json(FacultyService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/faculties/{id}",
    params(("id" = FacultyId, Path, description = "Faculty ID")),
    responses(
        (status = 204, description = "Faculty deleted"),
        (status = 404, description = "Faculty not found")
    ),
    tag = "Faculties",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_faculty(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path(id): Path<FacultyId>,
) -> Result<StatusCode, AppError> {
    FacultyService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/faculties/{id}/departments",
    params(("id" = FacultyId, Path, description = "Faculty ID")),
    responses(
        (status = 200, description = "Departments of the faculty", body = Vec<Department>),
        (status = 404, description = "Faculty not found")
    ),
    tag = "Faculties",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_faculty_departments(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Path(id): Path<FacultyId>,
) -> Result<Json<Vec<Department>>, AppError> {
    Ok(Json(FacultyService::departments(&state.db, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/faculties/{id}/statistics",
    params(("id" = FacultyId, Path, description = "Faculty ID")),
    responses(
        (status = 200, description = "Faculty counts", body = FacultyStatistics),
        (status = 404, description = "Faculty not found")
    ),
    tag = "Faculties",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_faculty_statistics(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Path(id): Path<FacultyId>,
) -> Result<Json<FacultyStatistics>, AppError> {
    Ok(Json(FacultyService::statistics(&state.db, id).await?))
}

// =============================================================================
// Departments
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = CreateDepartmentDto,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Duplicate code or unknown faculty")
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_department(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    ValidatedJson(dto): ValidatedJson<CreateDepartmentDto>,
) -> Result<(StatusCode, Json<Department>), AppError> {
    let department = DepartmentService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

#[utoipa::path(
    get,
    path = "/api/departments",
    params(DepartmentFilterParams),
    responses((status = 200, description = "Departments", body = PaginatedDepartmentsResponse)),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_departments(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Query(filters): Query<DepartmentFilterParams>,
) -> Result<Json<PaginatedDepartmentsResponse>, AppError> {
    Ok(Json(DepartmentService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    params(("id" = DepartmentId, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department", body = Department),
        (status = 404, description = "Department not found")
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_department(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Path(id): Path<DepartmentId>,
) -> Result<Json<Department>, AppError> {
    Ok(Json(DepartmentService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/departments/{id}",
    params(("id" = DepartmentId, Path, description = "Department ID")),
    request_body = UpdateDepartmentDto,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 404, description = "Department not found")
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_department(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path(id): Path<DepartmentId>,
    ValidatedJson(dto): ValidatedJson<UpdateDepartmentDto>,
) -> Result<Json<Department>, AppError> {
    Ok(Json(DepartmentService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/departments/{id}",
    params(("id" = DepartmentId, Path, description = "Department ID")),
    responses(
        (status = 204, description = "Department deleted"),
        (status = 404, description = "Department not found")
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_department(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path(id): Path<DepartmentId>,
) -> Result<StatusCode, AppError> {
    DepartmentService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/departments/{id}/programs",
    params(("id" = DepartmentId, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Programs of the department", body = Vec<Program>),
        (status = 404, description = "Department not found")
    ),
    tag = "Departments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_department_programs(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Path(id): Path<DepartmentId>,
) -> Result<Json<Vec<Program>>, AppError> {
    Ok(Json(DepartmentService::programs(&state.db, id).await?))
}

// =============================================================================
// Programs
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/programs",
    request_body = CreateProgramDto,
    responses(
        (status = 201, description = "Program created", body = Program),
        (status = 400, description = "Duplicate code or unknown department")
    ),
    tag = "Programs",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_program(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    ValidatedJson(dto): ValidatedJson<CreateProgramDto>,
) -> Result<(StatusCode, Json<Program>), AppError> {
    let program = ProgramService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(program)))
}

#[utoipa::path(
    get,
    path = "/api/programs",
    params(ProgramFilterParams),
    responses((status = 200, description = "Programs", body = PaginatedProgramsResponse)),
    tag = "Programs",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_programs(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Query(filters): Query<ProgramFilterParams>,
) -> Result<Json<PaginatedProgramsResponse>, AppError> {
    Ok(Json(ProgramService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/programs/{id}",
    params(("id" = ProgramId, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Program", body = Program),
        (status = 404, description = "Program not found")
    ),
    tag = "Programs",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_program(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Path(id): Path<ProgramId>,
) -> Result<Json<Program>, AppError> {
    Ok(Json(ProgramService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/programs/{id}",
    params(("id" = ProgramId, Path, description = "Program ID")),
    request_body = UpdateProgramDto,
    responses(
        (status = 200, description = "Program updated", body = Program),
        (status = 404, description = "Program not found")
    ),
    tag = "Programs",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_program(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path(id): Path<ProgramId>,
    ValidatedJson(dto): ValidatedJson<UpdateProgramDto>,
) -> Result<Json<Program>, AppError> {
    Ok(Json(ProgramService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/programs/{id}",
    params(("id" = ProgramId, Path, description = "Program ID")),
    responses(
        (status = 204, description = "Program deleted"),
        (status = 400, description = "Program still has enrollments"),
        (status = 404, description = "Program not found")
    ),
    tag = "Programs",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_program(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path(id): Path<ProgramId>,
) -> Result<StatusCode, AppError> {
    ProgramService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/programs/{id}/subjects",
    params(("id" = ProgramId, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Subjects of the program", body = Vec<SubjectDetail>),
        (status = 404, description = "Program not found")
    ),
    tag = "Programs",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_program_subjects(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Path(id): Path<ProgramId>,
) -> Result<Json<Vec<SubjectDetail>>, AppError> {
    Ok(Json(ProgramService::subjects(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/programs/{id}/subjects",
    params(("id" = ProgramId, Path, description = "Program ID")),
    request_body = LinkSubjectDto,
    responses(
        (status = 200, description = "Subject linked; returns the program's subjects", body = Vec<SubjectDetail>),
        (status = 404, description = "Program or subject not found")
    ),
    tag = "Programs",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn link_program_subject(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path(id): Path<ProgramId>,
    ValidatedJson(dto): ValidatedJson<LinkSubjectDto>,
) -> Result<Json<Vec<SubjectDetail>>, AppError> {
    Ok(Json(ProgramService::link_subject(&state.db, id, dto.subject_id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/programs/{id}/subjects/{subject_id}",
    params(
        ("id" = ProgramId, Path, description = "Program ID"),
        ("subject_id" = SubjectId, Path, description = "Subject ID")
    ),
    responses(
        (status = 204, description = "Subject unlinked"),
        (status = 404, description = "Subject is not linked to this program")
    ),
    tag = "Programs",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn unlink_program_subject(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path((id, subject_id)): Path<(ProgramId, SubjectId)>,
) -> Result<StatusCode, AppError> {
    ProgramService::unlink_subject(&state.db, id, subject_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Subjects
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/subjects",
    request_body = CreateSubjectDto,
    responses(
        (status = 201, description = "Subject created", body = SubjectDetail),
        (status = 400, description = "Duplicate code or unknown program"),
        (status = 422, description = "Validation error")
    ),
    tag = "Subjects",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_subject(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    ValidatedJson(dto): ValidatedJson<CreateSubjectDto>,
) -> Result<(StatusCode, Json<SubjectDetail>), AppError> {
    let subject = SubjectService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

#[utoipa::path(
    get,
    path = "/api/subjects",
    params(SubjectFilterParams),
    responses((status = 200, description = "Subjects", body = PaginatedSubjectsResponse)),
    tag = "Subjects",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_subjects(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Query(filters): Query<SubjectFilterParams>,
) -> Result<Json<PaginatedSubjectsResponse>, AppError> {
    Ok(Json(SubjectService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/subjects/by-semester",
    params(SemesterQuery),
    responses(
        (status = 200, description = "Subjects taught in the semester", body = Vec<SubjectDetail>),
        (status = 400, description = "semester must be 1 or 2")
    ),
    tag = "Subjects",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_subjects_by_semester(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Query(query): Query<SemesterQuery>,
) -> Result<Json<Vec<SubjectDetail>>, AppError> {
    Ok(Json(SubjectService::by_semester(&state.db, query.semester).await?))
}

#[utoipa::path(
    get,
    path = "/api/subjects/{id}",
    params(("id" = SubjectId, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject", body = SubjectDetail),
        (status = 404, description = "Subject not found")
    ),
    tag = "Subjects",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_subject(
    State(state): State<AppState>,
    RequireAcademicRead(_auth_user): RequireAcademicRead,
    Path(id): Path<SubjectId>,
) -> Result<Json<SubjectDetail>, AppError> {
    Ok(Json(SubjectService::get_detail(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/subjects/{id}",
    params(("id" = SubjectId, Path, description = "Subject ID")),
    request_body = UpdateSubjectDto,
    responses(
        (status = 200, description = "Subject updated", body = SubjectDetail),
        (status = 404, description = "Subject not found")
    ),
    tag = "Subjects",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_subject(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path(id): Path<SubjectId>,
    ValidatedJson(dto): ValidatedJson<UpdateSubjectDto>,
) -> Result<Json<SubjectDetail>, AppError> {
    Ok(Json(SubjectService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/subjects/{id}",
    params(("id" = SubjectId, Path, description = "Subject ID")),
    responses(
        (status = 204, description = "Subject deleted"),
        (status = 404, description = "Subject not found")
    ),
    tag = "Subjects",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_subject(
    State(state): State<AppState>,
    RequireAcademicWrite(_auth_user): RequireAcademicWrite,
    Path(id): Path<SubjectId>,
) -> Result<StatusCode, AppError> {
    SubjectService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
