use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use campus_core::AppError;
use campus_models::YearScope;
use campus_models::ids::{BuildingId, ConflictId, CourseId, RoomId, TeacherId, TimeSlotId};

use crate::middleware::auth::{RequireScheduleRead, RequireScheduleWrite};
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{
    AvailableRoomsQuery, Building, BuildingFilterParams, ConflictFilterParams, Course,
    CourseDetail, CourseFilterParams, CoursesByDayQuery, CreateBuildingDto, CreateCourseDto,
    CreateRoomDto, CreateTimeSlotDto, DetectConflictsDto, DetectConflictsResponse,
    PaginatedBuildingsResponse, PaginatedConflictsResponse, PaginatedCoursesResponse,
    PaginatedRoomsResponse, PaginatedTimeSlotsResponse, ResolveConflictDto, Room, RoomFilterParams,
    RoomOccupancy,
    ScheduleConflict, TimeSlot, TimeSlotFilterParams, TimetableDay, TimetableQuery,
    UpdateBuildingDto, UpdateCourseDto, UpdateRoomDto, UpdateTimeSlotDto,
};
use super::service::{BuildingService, ConflictService, CourseService, RoomService, TimeSlotService};

// =============================================================================
// Buildings
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/buildings",
    request_body = CreateBuildingDto,
    responses(
        (status = 201, description = "Building created", body = Building),
        (status = 400, description = "Code already in use")
    ),
    tag = "Buildings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_building(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    ValidatedJson(dto): ValidatedJson<CreateBuildingDto>,
) -> Result<(StatusCode, Json<Building>), AppError> {
    let building = BuildingService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(building)))
}

#[utoipa::path(
    get,
    path = "/api/buildings",
    params(BuildingFilterParams),
    responses((status = 200, description = "Buildings with their room count", body = PaginatedBuildingsResponse)),
    tag = "Buildings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_buildings(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Query(filters): Query<BuildingFilterParams>,
) -> Result<Json<PaginatedBuildingsResponse>, AppError> {
    Ok(Json(BuildingService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/buildings/{id}",
    params(("id" = String, Path, description = "Building ID")),
    responses(
        (status = 200, description = "Building", body = Building),
        (status = 404, description = "Building not found")
    ),
    tag = "Buildings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_building(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Path(id): Path<BuildingId>,
) -> Result<Json<Building>, AppError> {
    Ok(Json(BuildingService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/buildings/{id}",
    params(("id" = String, Path, description = "Building ID")),
    request_body = UpdateBuildingDto,
    responses(
        (status = 200, description = "Building updated", body = Building),
        (status = 404, description = "Building not found")
    ),
    tag = "Buildings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_building(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    Path(id): Path<BuildingId>,
    ValidatedJson(dto): ValidatedJson<UpdateBuildingDto>,
) -> Result<Json<Building>, AppError> {
    Ok(Json(BuildingService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/buildings/{id}",
    params(("id" = String, Path, description = "Building ID")),
    responses(
        (status = 204, description = "Building and its rooms deleted"),
        (status = 404, description = "Building not found")
    ),
    tag = "Buildings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_building(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    Path(id): Path<BuildingId>,
) -> Result<StatusCode, AppError> {
    BuildingService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Rooms
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/rooms",
    request_body = CreateRoomDto,
    responses(
        (status = 201, description = "Room created", body = Room),
        (status = 400, description = "Code already in use or unknown building")
    ),
    tag = "Rooms",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_room(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    ValidatedJson(dto): ValidatedJson<CreateRoomDto>,
) -> Result<(StatusCode, Json<Room>), AppError> {
    let room = RoomService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

#[utoipa::path(
    get,
    path = "/api/rooms",
    params(RoomFilterParams),
    responses((status = 200, description = "Rooms", body = PaginatedRoomsResponse)),
    tag = "Rooms",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_rooms(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Query(filters): Query<RoomFilterParams>,
) -> Result<Json<PaginatedRoomsResponse>, AppError> {
    Ok(Json(RoomService::list(&state.db, filters).await?))
}

/// Rooms free in a time slot for an academic year, smallest first
#[utoipa::path(
    get,
    path = "/api/rooms/available",
    params(AvailableRoomsQuery),
    responses((status = 200, description = "Free rooms", body = Vec<Room>)),
    tag = "Rooms",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_available_rooms(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Query(query): Query<AvailableRoomsQuery>,
) -> Result<Json<Vec<Room>>, AppError> {
    Ok(Json(RoomService::available(&state.db, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/rooms/{id}",
    params(("id" = String, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Room", body = Room),
        (status = 404, description = "Room not found")
    ),
    tag = "Rooms",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_room(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Path(id): Path<RoomId>,
) -> Result<Json<Room>, AppError> {
    Ok(Json(RoomService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/rooms/{id}",
    params(("id" = String, Path, description = "Room ID")),
    request_body = UpdateRoomDto,
    responses(
        (status = 200, description = "Room updated", body = Room),
        (status = 404, description = "Room not found")
    ),
    tag = "Rooms",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_room(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    Path(id): Path<RoomId>,
    ValidatedJson(dto): ValidatedJson<UpdateRoomDto>,
) -> Result<Json<Room>, AppError> {
    Ok(Json(RoomService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/rooms/{id}",
    params(("id" = String, Path, description = "Room ID")),
    responses(
        (status = 204, description = "Room deleted"),
        (status = 404, description = "Room not found")
    ),
    tag = "Rooms",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_room(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    Path(id): Path<RoomId>,
) -> Result<StatusCode, AppError> {
    RoomService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/rooms/{id}/occupancy",
    params(("id" = String, Path, description = "Room ID"), YearScope),
    responses(
        (status = 200, description = "Occupied slots over all slots", body = RoomOccupancy),
        (status = 404, description = "Room not found")
    ),
    tag = "Rooms",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_room_occupancy(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Path(id): Path<RoomId>,
    Query(scope): Query<YearScope>,
) -> Result<Json<RoomOccupancy>, AppError> {
    Ok(Json(
        RoomService::occupancy(&state.db, id, scope.academic_year_id).await?,
    ))
}

// =============================================================================
// Time slots
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/time-slots",
    request_body = CreateTimeSlotDto,
    responses(
        (status = 201, description = "Time slot created", body = TimeSlot),
        (status = 400, description = "End before start, or slot already defined")
    ),
    tag = "Time Slots",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_time_slot(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    ValidatedJson(dto): ValidatedJson<CreateTimeSlotDto>,
) -> Result<(StatusCode, Json<TimeSlot>), AppError> {
    let slot = TimeSlotService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

#[utoipa::path(
    get,
    path = "/api/time-slots",
    params(TimeSlotFilterParams),
    responses((status = 200, description = "Time slots in weekly order", body = PaginatedTimeSlotsResponse)),
    tag = "Time Slots",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_time_slots(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Query(filters): Query<TimeSlotFilterParams>,
) -> Result<Json<PaginatedTimeSlotsResponse>, AppError> {
    Ok(Json(TimeSlotService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/time-slots/{id}",
    params(("id" = String, Path, description = "Time slot ID")),
    responses(
        (status = 200, description = "Time slot", body = TimeSlot),
        (status = 404, description = "Time slot not found")
    ),
    tag = "Time Slots",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_time_slot(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Path(id): Path<TimeSlotId>,
) -> Result<Json<TimeSlot>, AppError> {
    Ok(Json(TimeSlotService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/time-slots/{id}",
    params(("id" = String, Path, description = "Time slot ID")),
    request_body = UpdateTimeSlotDto,
    responses(
        (status = 200, description = "Time slot updated", body = TimeSlot),
        (status = 400, description = "End before start"),
        (status = 404, description = "Time slot not found")
    ),
    tag = "Time Slots",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_time_slot(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    Path(id): Path<TimeSlotId>,
    ValidatedJson(dto): ValidatedJson<UpdateTimeSlotDto>,
) -> Result<Json<TimeSlot>, AppError> {
    Ok(Json(TimeSlotService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/time-slots/{id}",
    params(("id" = String, Path, description = "Time slot ID")),
    responses(
        (status = 204, description = "Time slot deleted"),
        (status = 400, description = "Time slot still used by courses"),
        (status = 404, description = "Time slot not found")
    ),
    tag = "Time Slots",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_time_slot(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    Path(id): Path<TimeSlotId>,
) -> Result<StatusCode, AppError> {
    TimeSlotService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Courses
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CreateCourseDto,
    responses(
        (status = 201, description = "Course scheduled", body = Course),
        (status = 400, description = "Room or teacher already busy, or room too small")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_course(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    ValidatedJson(dto): ValidatedJson<CreateCourseDto>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = CourseService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    get,
    path = "/api/courses",
    params(CourseFilterParams),
    responses((status = 200, description = "Courses", body = PaginatedCoursesResponse)),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_courses(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Query(filters): Query<CourseFilterParams>,
) -> Result<Json<PaginatedCoursesResponse>, AppError> {
    Ok(Json(CourseService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/courses/by-day",
    params(CoursesByDayQuery),
    responses((status = 200, description = "Active courses of the day by start time", body = Vec<CourseDetail>)),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_courses_by_day(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Query(query): Query<CoursesByDayQuery>,
) -> Result<Json<Vec<CourseDetail>>, AppError> {
    Ok(Json(CourseService::by_day(&state.db, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/courses/timetable",
    params(TimetableQuery),
    responses((status = 200, description = "Weekly timetable grouped by day", body = Vec<TimetableDay>)),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_timetable(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Query(query): Query<TimetableQuery>,
) -> Result<Json<Vec<TimetableDay>>, AppError> {
    Ok(Json(CourseService::timetable(&state.db, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/courses/by-teacher/{teacher_id}",
    params(("teacher_id" = String, Path, description = "Teacher ID"), YearScope),
    responses((status = 200, description = "The teacher's active courses", body = Vec<CourseDetail>)),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_courses_by_teacher(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Path(teacher_id): Path<TeacherId>,
    Query(scope): Query<YearScope>,
) -> Result<Json<Vec<CourseDetail>>, AppError> {
    Ok(Json(
        CourseService::by_teacher(&state.db, teacher_id, scope.academic_year_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 404, description = "Course not found")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Path(id): Path<CourseId>,
) -> Result<Json<Course>, AppError> {
    Ok(Json(CourseService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    params(("id" = String, Path, description = "Course ID")),
    request_body = UpdateCourseDto,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Room or teacher already busy, or room too small"),
        (status = 404, description = "Course not found")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_course(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    Path(id): Path<CourseId>,
    ValidatedJson(dto): ValidatedJson<UpdateCourseDto>,
) -> Result<Json<Course>, AppError> {
    Ok(Json(CourseService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 404, description = "Course not found")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_course(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    Path(id): Path<CourseId>,
) -> Result<StatusCode, AppError> {
    CourseService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Conflicts
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/conflicts",
    params(ConflictFilterParams),
    responses((status = 200, description = "Conflicts, latest first", body = PaginatedConflictsResponse)),
    tag = "Conflicts",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_conflicts(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Query(filters): Query<ConflictFilterParams>,
) -> Result<Json<PaginatedConflictsResponse>, AppError> {
    Ok(Json(ConflictService::list(&state.db, filters).await?))
}

/// Scan a year's active courses for room, teacher and capacity clashes
#[utoipa::path(
    post,
    path = "/api/conflicts/detect",
    request_body = DetectConflictsDto,
    responses((status = 200, description = "New conflicts recorded per kind", body = DetectConflictsResponse)),
    tag = "Conflicts",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn detect_conflicts(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    ValidatedJson(dto): ValidatedJson<DetectConflictsDto>,
) -> Result<Json<DetectConflictsResponse>, AppError> {
    Ok(Json(
        ConflictService::detect(&state.db, dto.academic_year_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/conflicts/{id}",
    params(("id" = String, Path, description = "Conflict ID")),
    responses(
        (status = 200, description = "Conflict", body = ScheduleConflict),
        (status = 404, description = "Conflict not found")
    ),
    tag = "Conflicts",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_conflict(
    State(state): State<AppState>,
    RequireScheduleRead(_auth_user): RequireScheduleRead,
    Path(id): Path<ConflictId>,
) -> Result<Json<ScheduleConflict>, AppError> {
    Ok(Json(ConflictService::get(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/conflicts/{id}/resolve",
    params(("id" = String, Path, description = "Conflict ID")),
    request_body = ResolveConflictDto,
    responses(
        (status = 200, description = "Conflict resolved", body = ScheduleConflict),
        (status = 400, description = "Conflict already closed"),
        (status = 404, description = "Conflict not found")
    ),
    tag = "Conflicts",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn resolve_conflict(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    Path(id): Path<ConflictId>,
    ValidatedJson(dto): ValidatedJson<ResolveConflictDto>,
) -> Result<Json<ScheduleConflict>, AppError> {
    Ok(Json(
        ConflictService::resolve(&state.db, id, dto.resolution).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/conflicts/{id}/ignore",
    params(("id" = String, Path, description = "Conflict ID")),
    responses(
        (status = 200, description = "Conflict ignored", body = ScheduleConflict),
        (status = 400, description = "Conflict already closed"),
        (status = 404, description = "Conflict not found")
    ),
    tag = "Conflicts",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn ignore_conflict(
    State(state): State<AppState>,
    RequireScheduleWrite(_auth_user): RequireScheduleWrite,
    Path(id): Path<ConflictId>,
) -> Result<Json<ScheduleConflict>, AppError> {
    Ok(Json(ConflictService::ignore(&state.db, id).await?))
}
