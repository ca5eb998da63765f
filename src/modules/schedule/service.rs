use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, instrument};

use campus_core::AppError;
use campus_models::ids::{
    AcademicYearId, BuildingId, ConflictId, CourseId, RoomId, TeacherId, TimeSlotId,
};

use crate::metrics;
use crate::modules::search_pattern;

use super::model::{
    AvailableRoomsQuery, Building, BuildingFilterParams, ConflictFilterParams, ConflictKind,
    ConflictStatus, Course, CourseDetail, CourseFilterParams, CoursePlacement, CoursesByDayQuery,
    CreateBuildingDto, CreateCourseDto, CreateRoomDto, CreateTimeSlotDto, DetectConflictsResponse,
    PaginatedBuildingsResponse, PaginatedConflictsResponse, PaginatedCoursesResponse,
    PaginatedRoomsResponse, PaginatedTimeSlotsResponse, Room, RoomFilterParams, RoomOccupancy,
    ScheduleConflict, TimeSlot, TimeSlotFilterParams, TimetableDay, TimetableQuery,
    UpdateBuildingDto, UpdateCourseDto, UpdateRoomDto, UpdateTimeSlotDto, check_placement,
    check_slot_times, detect_conflicts, group_timetable, occupancy_rate,
};

const BUILDING_SELECT: &str = r#"SELECT b.id, b.code, b.name, b.floors, b.address, b.is_active,
        (SELECT COUNT(*) FROM rooms r WHERE r.building_id = b.id) AS room_count,
        b.created_at, b.updated_at
    FROM buildings b"#;

const ROOM_COLUMNS: &str = "id, building_id, code, name, room_type, capacity, floor, equipment, \
     is_available, created_at, updated_at";

const SLOT_COLUMNS: &str = "id, code, day, start_time, end_time, duration_minutes, created_at";

/// Monday first, then by start time.
const SLOT_ORDER: &str = "array_position(ARRAY['MONDAY','TUESDAY','WEDNESDAY','THURSDAY','FRIDAY','SATURDAY','SUNDAY'], day), start_time";

const COURSE_COLUMNS: &str = "id, academic_year_id, subject_id, teacher_id, program_id, room_id, \
     time_slot_id, kind, expected_size, semester, start_date, end_date, is_active, notes, \
     created_at, updated_at";

const COURSE_DETAIL_SELECT: &str = r#"SELECT c.id, c.academic_year_id, c.program_id, c.kind, c.semester,
        ts.day, ts.start_time, ts.end_time,
        c.subject_id, s.code AS subject_code, s.name AS subject_name,
        c.room_id, r.code AS room_code,
        c.teacher_id, (u.first_name || ' ' || u.last_name) AS teacher_name,
        c.expected_size
    FROM courses c
    INNER JOIN time_slots ts ON ts.id = c.time_slot_id
    INNER JOIN subjects s ON s.id = c.subject_id
    LEFT JOIN rooms r ON r.id = c.room_id
    LEFT JOIN teachers t ON t.id = c.teacher_id
    LEFT JOIN users u ON u.id = t.user_id"#;

const CONFLICT_COLUMNS: &str = "id, course_id, other_course_id, kind, status, description, \
     detected_at, resolved_at, resolution";

// =============================================================================
// Buildings
// =============================================================================

pub struct BuildingService;

impl BuildingService {
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateBuildingDto) -> Result<Building, AppError> {
        let id = sqlx::query_scalar::<_, BuildingId>(
            r#"INSERT INTO buildings (code, name, floors, address, is_active)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id"#,
        )
        .bind(&dto.code)
        .bind(&dto.name)
        .bind(dto.floors)
        .bind(&dto.address)
        .bind(dto.is_active)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, "A building with this code already exists", "Invalid reference"))?;

        Self::get(db, id).await
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: BuildingFilterParams,
    ) -> Result<PaginatedBuildingsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::BOOLEAN IS NULL OR b.is_active = $1)
              AND ($2::TEXT IS NULL OR b.code ILIKE $2 OR b.name ILIKE $2)";
        let search = search_pattern(filters.search.as_deref());

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM buildings b{WHERE}"))
            .bind(filters.is_active)
            .bind(&search)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Building>(&format!(
            "{BUILDING_SELECT}{WHERE} ORDER BY b.code{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.is_active)
        .bind(&search)
        .fetch_all(db)
        .await?;

        Ok(PaginatedBuildingsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: BuildingId) -> Result<Building, AppError> {
        sqlx::query_as::<_, Building>(&format!("{BUILDING_SELECT} WHERE b.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Building not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(
        db: &PgPool,
        id: BuildingId,
        dto: UpdateBuildingDto,
    ) -> Result<Building, AppError> {
        let result = sqlx::query(
            r#"UPDATE buildings
               SET code = COALESCE($1, code),
                   name = COALESCE($2, name),
                   floors = COALESCE($3, floors),
                   address = COALESCE($4, address),
                   is_active = COALESCE($5, is_active),
                   updated_at = NOW()
               WHERE id = $6"#,
        )
        .bind(&dto.code)
        .bind(&dto.name)
        .bind(dto.floors)
        .bind(&dto.address)
        .bind(dto.is_active)
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| AppError::from_db(e, "A building with this code already exists", "Invalid reference"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Building not found")));
        }
        Self::get(db, id).await
    }

    /// Rooms of the building cascade.
    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: BuildingId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM buildings WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| AppError::from_db(e, "Building cannot be deleted", "Building is still referenced"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Building not found")));
        }
        Ok(())
    }
}

// =============================================================================
// Rooms
// =============================================================================

pub struct RoomService;

impl RoomService {
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateRoomDto) -> Result<Room, AppError> {
        sqlx::query_as::<_, Room>(&format!(
            r#"INSERT INTO rooms (building_id, code, name, room_type, capacity, floor, equipment, is_available)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {ROOM_COLUMNS}"#
        ))
        .bind(dto.building_id)
        .bind(&dto.code)
        .bind(&dto.name)
        .bind(dto.room_type)
        .bind(dto.capacity)
        .bind(dto.floor)
        .bind(&dto.equipment)
        .bind(dto.is_available)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, "A room with this code already exists", "Building does not exist"))
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: RoomFilterParams,
    ) -> Result<PaginatedRoomsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR building_id = $1)
              AND ($2::TEXT IS NULL OR room_type = $2)
              AND ($3::INTEGER IS NULL OR capacity >= $3)
              AND ($4::BOOLEAN IS NULL OR is_available = $4)
              AND ($5::TEXT IS NULL OR code ILIKE $5 OR name ILIKE $5)";
        let search = search_pattern(filters.search.as_deref());

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM rooms{WHERE}"))
            .bind(filters.building_id)
            .bind(filters.room_type)
            .bind(filters.min_capacity)
            .bind(filters.is_available)
            .bind(&search)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Room>(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms{WHERE} ORDER BY code{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.building_id)
        .bind(filters.room_type)
        .bind(filters.min_capacity)
        .bind(filters.is_available)
        .bind(&search)
        .fetch_all(db)
        .await?;

        Ok(PaginatedRoomsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: RoomId) -> Result<Room, AppError> {
        sqlx::query_as::<_, Room>(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Room not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(db: &PgPool, id: RoomId, dto: UpdateRoomDto) -> Result<Room, AppError> {
        sqlx::query_as::<_, Room>(&format!(
            r#"UPDATE rooms
               SET building_id = COALESCE($1, building_id),
                   code = COALESCE($2, code),
                   name = COALESCE($3, name),
                   room_type = COALESCE($4, room_type),
                   capacity = COALESCE($5, capacity),
                   floor = COALESCE($6, floor),
                   equipment = COALESCE($7, equipment),
                   is_available = COALESCE($8, is_available),
                   updated_at = NOW()
               WHERE id = $9
               RETURNING {ROOM_COLUMNS}"#
        ))
        .bind(dto.building_id)
        .bind(&dto.code)
        .bind(&dto.name)
        .bind(dto.room_type)
        .bind(dto.capacity)
        .bind(dto.floor)
        .bind(&dto.equipment)
        .bind(dto.is_available)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(|e| AppError::from_db(e, "A room with this code already exists", "Building does not exist"))?
        .ok_or_else(|| AppError::not_found(anyhow!("Room not found")))
    }

    /// Courses in the room keep their slot and lose the room.
    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: RoomId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| AppError::from_db(e, "Room cannot be deleted", "Room is still referenced"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Room not found")));
        }
        Ok(())
    }

    /// Distinct slots used by active courses over all defined slots.
    #[instrument(skip(db))]
    pub async fn occupancy(
        db: &PgPool,
        id: RoomId,
        academic_year_id: Option<AcademicYearId>,
    ) -> Result<RoomOccupancy, AppError> {
        Self::get(db, id).await?;

        let occupied_slots = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(DISTINCT time_slot_id) FROM courses
               WHERE room_id = $1 AND is_active
                 AND ($2::UUID IS NULL OR academic_year_id = $2)"#,
        )
        .bind(id)
        .bind(academic_year_id)
        .fetch_one(db)
        .await?;

        let total_slots = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM time_slots")
            .fetch_one(db)
            .await?;

        Ok(RoomOccupancy {
            room_id: id,
            academic_year_id,
            occupied_slots,
            total_slots,
            occupancy_rate: occupancy_rate(occupied_slots, total_slots),
        })
    }

    /// Available rooms with no active course in the slot for the year.
    #[instrument(skip(db))]
    pub async fn available(db: &PgPool, query: AvailableRoomsQuery) -> Result<Vec<Room>, AppError> {
        let rooms = sqlx::query_as::<_, Room>(&format!(
            r#"SELECT {ROOM_COLUMNS} FROM rooms r
               WHERE r.is_available
                 AND ($3::INTEGER IS NULL OR r.capacity >= $3)
                 AND NOT EXISTS (
                     SELECT 1 FROM courses c
                     WHERE c.room_id = r.id AND c.time_slot_id = $1
                       AND c.academic_year_id = $2 AND c.is_active
                 )
               ORDER BY r.capacity, r.code"#
        ))
        .bind(query.time_slot_id)
        .bind(query.academic_year_id)
        .bind(query.min_capacity)
        .fetch_all(db)
        .await?;
        Ok(rooms)
    }
}

// =============================================================================
// Time slots
// =============================================================================

pub struct TimeSlotService;

impl TimeSlotService {
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateTimeSlotDto) -> Result<TimeSlot, AppError> {
        check_slot_times(dto.start_time, dto.end_time)
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        sqlx::query_as::<_, TimeSlot>(&format!(
            r#"INSERT INTO time_slots (code, day, start_time, end_time)
               VALUES ($1, $2, $3, $4)
               RETURNING {SLOT_COLUMNS}"#
        ))
        .bind(&dto.code)
        .bind(dto.day)
        .bind(dto.start_time)
        .bind(dto.end_time)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "A time slot with this code or these hours already exists", "Invalid reference")
        })
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: TimeSlotFilterParams,
    ) -> Result<PaginatedTimeSlotsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::TEXT IS NULL OR day = $1)";

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM time_slots{WHERE}"))
            .bind(filters.day)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, TimeSlot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM time_slots{WHERE} ORDER BY {SLOT_ORDER}{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.day)
        .fetch_all(db)
        .await?;

        Ok(PaginatedTimeSlotsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: TimeSlotId) -> Result<TimeSlot, AppError> {
        sqlx::query_as::<_, TimeSlot>(&format!("SELECT {SLOT_COLUMNS} FROM time_slots WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Time slot not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(
        db: &PgPool,
        id: TimeSlotId,
        dto: UpdateTimeSlotDto,
    ) -> Result<TimeSlot, AppError> {
        let existing = Self::get(db, id).await?;
        let start_time = dto.start_time.unwrap_or(existing.start_time);
        let end_time = dto.end_time.unwrap_or(existing.end_time);
        check_slot_times(start_time, end_time).map_err(|e| AppError::bad_request(anyhow!(e)))?;

        sqlx::query_as::<_, TimeSlot>(&format!(
            r#"UPDATE time_slots
               SET code = COALESCE($1, code),
                   day = COALESCE($2, day),
                   start_time = $3,
                   end_time = $4
               WHERE id = $5
               RETURNING {SLOT_COLUMNS}"#
        ))
        .bind(&dto.code)
        .bind(dto.day)
        .bind(start_time)
        .bind(end_time)
        .bind(id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "A time slot with this code or these hours already exists", "Invalid reference")
        })
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: TimeSlotId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM time_slots WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| {
                AppError::from_db(e, "Time slot cannot be deleted", "Time slot is still used by courses")
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Time slot not found")));
        }
        Ok(())
    }
}

// =============================================================================
// Courses
// =============================================================================

pub struct CourseService;

impl CourseService {
    /// Active courses are checked for room, teacher and capacity clashes first.
    #[instrument(skip(db))]
    pub async fn create(db: &PgPool, dto: CreateCourseDto) -> Result<Course, AppError> {
        if dto.is_active {
            check_course_placement(
                db,
                None,
                dto.academic_year_id,
                dto.time_slot_id,
                dto.room_id,
                dto.teacher_id,
                dto.expected_size,
            )
            .await?;
        }

        sqlx::query_as::<_, Course>(&format!(
            r#"INSERT INTO courses
                (academic_year_id, subject_id, teacher_id, program_id, room_id, time_slot_id, kind,
                 expected_size, semester, start_date, end_date, is_active, notes)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
               RETURNING {COURSE_COLUMNS}"#
        ))
        .bind(dto.academic_year_id)
        .bind(dto.subject_id)
        .bind(dto.teacher_id)
        .bind(dto.program_id)
        .bind(dto.room_id)
        .bind(dto.time_slot_id)
        .bind(dto.kind)
        .bind(dto.expected_size)
        .bind(dto.semester)
        .bind(dto.start_date)
        .bind(dto.end_date)
        .bind(dto.is_active)
        .bind(&dto.notes)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, "Duplicate course", "A referenced record does not exist"))
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: CourseFilterParams,
    ) -> Result<PaginatedCoursesResponse, AppError> {
        const WHERE: &str = " WHERE ($1::UUID IS NULL OR academic_year_id = $1)
              AND ($2::UUID IS NULL OR program_id = $2)
              AND ($3::UUID IS NULL OR teacher_id = $3)
              AND ($4::UUID IS NULL OR room_id = $4)
              AND ($5::INTEGER IS NULL OR semester = $5)
              AND ($6::BOOLEAN IS NULL OR is_active = $6)";

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM courses{WHERE}"))
            .bind(filters.academic_year_id)
            .bind(filters.program_id)
            .bind(filters.teacher_id)
            .bind(filters.room_id)
            .bind(filters.semester)
            .bind(filters.is_active)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses{WHERE} ORDER BY created_at DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.academic_year_id)
        .bind(filters.program_id)
        .bind(filters.teacher_id)
        .bind(filters.room_id)
        .bind(filters.semester)
        .bind(filters.is_active)
        .fetch_all(db)
        .await?;

        Ok(PaginatedCoursesResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: CourseId) -> Result<Course, AppError> {
        sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Course not found")))
    }

    #[instrument(skip(db))]
    pub async fn update(db: &PgPool, id: CourseId, dto: UpdateCourseDto) -> Result<Course, AppError> {
        let existing = Self::get(db, id).await?;

        let is_active = dto.is_active.unwrap_or(existing.is_active);
        if is_active {
            check_course_placement(
                db,
                Some(id),
                existing.academic_year_id,
                dto.time_slot_id.unwrap_or(existing.time_slot_id),
                dto.room_id.or(existing.room_id),
                dto.teacher_id.or(existing.teacher_id),
                dto.expected_size.unwrap_or(existing.expected_size),
            )
            .await?;
        }

        sqlx::query_as::<_, Course>(&format!(
            r#"UPDATE courses
               SET teacher_id = COALESCE($1, teacher_id),
                   room_id = COALESCE($2, room_id),
                   time_slot_id = COALESCE($3, time_slot_id),
                   kind = COALESCE($4, kind),
                   expected_size = COALESCE($5, expected_size),
                   semester = COALESCE($6, semester),
                   start_date = COALESCE($7, start_date),
                   end_date = COALESCE($8, end_date),
                   is_active = $9,
                   notes = COALESCE($10, notes),
                   updated_at = NOW()
               WHERE id = $11
               RETURNING {COURSE_COLUMNS}"#
        ))
        .bind(dto.teacher_id)
        .bind(dto.room_id)
        .bind(dto.time_slot_id)
        .bind(dto.kind)
        .bind(dto.expected_size)
        .bind(dto.semester)
        .bind(dto.start_date)
        .bind(dto.end_date)
        .bind(is_active)
        .bind(&dto.notes)
        .bind(id)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, "Duplicate course", "A referenced record does not exist"))
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: CourseId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Course not found")));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn by_day(
        db: &PgPool,
        query: CoursesByDayQuery,
    ) -> Result<Vec<CourseDetail>, AppError> {
        let courses = sqlx::query_as::<_, CourseDetail>(&format!(
            r#"{COURSE_DETAIL_SELECT}
               WHERE c.is_active AND ts.day = $1
                 AND ($2::UUID IS NULL OR c.academic_year_id = $2)
               ORDER BY ts.start_time, s.code"#
        ))
        .bind(query.day)
        .bind(query.academic_year_id)
        .fetch_all(db)
        .await?;
        Ok(courses)
    }

    /// A program's weekly timetable grouped by day.
    #[instrument(skip(db))]
    pub async fn timetable(
        db: &PgPool,
        query: TimetableQuery,
    ) -> Result<Vec<TimetableDay>, AppError> {
        let courses = sqlx::query_as::<_, CourseDetail>(&format!(
            r#"{COURSE_DETAIL_SELECT}
               WHERE c.is_active AND c.program_id = $1 AND c.academic_year_id = $2
                 AND ($3::INTEGER IS NULL OR c.semester = $3)"#
        ))
        .bind(query.program_id)
        .bind(query.academic_year_id)
        .bind(query.semester)
        .fetch_all(db)
        .await?;
        Ok(group_timetable(courses))
    }

    #[instrument(skip(db))]
    pub async fn by_teacher(
        db: &PgPool,
        teacher_id: TeacherId,
        academic_year_id: Option<AcademicYearId>,
    ) -> Result<Vec<CourseDetail>, AppError> {
        let courses = sqlx::query_as::<_, CourseDetail>(&format!(
            r#"{COURSE_DETAIL_SELECT}
               WHERE c.is_active AND c.teacher_id = $1
                 AND ($2::UUID IS NULL OR c.academic_year_id = $2)
               ORDER BY {SLOT_ORDER}"#
        ))
        .bind(teacher_id)
        .bind(academic_year_id)
        .fetch_all(db)
        .await?;
        Ok(courses)
    }
}

/// 400 if the placement clashes with another active course of the year.
async fn check_course_placement(
    db: &PgPool,
    course_id: Option<CourseId>,
    academic_year_id: AcademicYearId,
    time_slot_id: TimeSlotId,
    room_id: Option<RoomId>,
    teacher_id: Option<TeacherId>,
    expected_size: i32,
) -> Result<(), AppError> {
    let room_capacity = match room_id {
        Some(room_id) => Some(
            sqlx::query_scalar::<_, i32>("SELECT capacity FROM rooms WHERE id = $1")
                .bind(room_id)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| AppError::bad_request(anyhow!("Room does not exist")))?,
        ),
        None => None,
    };

    let candidate = CoursePlacement {
        id: course_id.unwrap_or_else(CourseId::new),
        time_slot_id,
        room_id,
        teacher_id,
        expected_size,
        room_capacity,
    };

    let others = sqlx::query_as::<_, CoursePlacement>(
        r#"SELECT c.id, c.time_slot_id, c.room_id, c.teacher_id, c.expected_size,
                  r.capacity AS room_capacity
           FROM courses c
           LEFT JOIN rooms r ON r.id = c.room_id
           WHERE c.academic_year_id = $1 AND c.time_slot_id = $2 AND c.is_active
             AND ($3::UUID IS NULL OR c.id <> $3)"#,
    )
    .bind(academic_year_id)
    .bind(time_slot_id)
    .bind(course_id)
    .fetch_all(db)
    .await?;

    check_placement(&candidate, &others).map_err(|e| AppError::bad_request(anyhow!(e)))
}

// =============================================================================
// Conflicts
// =============================================================================

pub struct ConflictService;

impl ConflictService {
    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: ConflictFilterParams,
    ) -> Result<PaginatedConflictsResponse, AppError> {
        const WHERE: &str = " WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::TEXT IS NULL OR kind = $2)
              AND ($3::UUID IS NULL OR course_id = $3 OR other_course_id = $3)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM schedule_conflicts{WHERE}"
        ))
        .bind(filters.status)
        .bind(filters.kind)
        .bind(filters.course_id)
        .fetch_one(db)
        .await?;

        let data = sqlx::query_as::<_, ScheduleConflict>(&format!(
            "SELECT {CONFLICT_COLUMNS} FROM schedule_conflicts{WHERE} ORDER BY detected_at DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.status)
        .bind(filters.kind)
        .bind(filters.course_id)
        .fetch_all(db)
        .await?;

        Ok(PaginatedConflictsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    /// Scans the year's active courses and records clashes not already open.
    #[instrument(skip(db))]
    pub async fn detect(
        db: &PgPool,
        academic_year_id: AcademicYearId,
    ) -> Result<DetectConflictsResponse, AppError> {
        let mut tx = db.begin().await?;

        let placements = sqlx::query_as::<_, CoursePlacement>(
            r#"SELECT c.id, c.time_slot_id, c.room_id, c.teacher_id, c.expected_size,
                      r.capacity AS room_capacity
               FROM courses c
               LEFT JOIN rooms r ON r.id = c.room_id
               WHERE c.academic_year_id = $1 AND c.is_active
               ORDER BY c.created_at, c.id"#,
        )
        .bind(academic_year_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut response = DetectConflictsResponse::default();
        for conflict in detect_conflicts(&placements) {
            let already_open = sqlx::query_scalar::<_, bool>(
                r#"SELECT EXISTS (
                       SELECT 1 FROM schedule_conflicts
                       WHERE kind = $1 AND status IN ('DETECTED', 'IN_PROGRESS')
                         AND ((course_id = $2 AND other_course_id IS NOT DISTINCT FROM $3)
                           OR (course_id = $3 AND other_course_id = $2))
                   )"#,
            )
            .bind(conflict.kind)
            .bind(conflict.course_id)
            .bind(conflict.other_course_id)
            .fetch_one(&mut *tx)
            .await?;

            if already_open {
                continue;
            }

            sqlx::query(
                r#"INSERT INTO schedule_conflicts (course_id, other_course_id, kind, description)
                   VALUES ($1, $2, $3, $4)"#,
            )
            .bind(conflict.course_id)
            .bind(conflict.other_course_id)
            .bind(conflict.kind)
            .bind(&conflict.description)
            .execute(&mut *tx)
            .await?;

            response.record(conflict.kind);
        }

        tx.commit().await?;

        for (kind, count) in [
            (ConflictKind::Room, response.room),
            (ConflictKind::Teacher, response.teacher),
            (ConflictKind::Capacity, response.capacity),
        ] {
            metrics::track_conflicts_detected(kind.as_str(), count);
        }
        info!(
            room = response.room,
            teacher = response.teacher,
            capacity = response.capacity,
            "Schedule conflicts detected"
        );
        Ok(response)
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: ConflictId) -> Result<ScheduleConflict, AppError> {
        sqlx::query_as::<_, ScheduleConflict>(&format!(
            "SELECT {CONFLICT_COLUMNS} FROM schedule_conflicts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Conflict not found")))
    }

    #[instrument(skip(db))]
    pub async fn resolve(
        db: &PgPool,
        id: ConflictId,
        resolution: String,
    ) -> Result<ScheduleConflict, AppError> {
        Self::close(db, id, ConflictStatus::Resolved, Some(resolution)).await
    }

    #[instrument(skip(db))]
    pub async fn ignore(db: &PgPool, id: ConflictId) -> Result<ScheduleConflict, AppError> {
        Self::close(db, id, ConflictStatus::Ignored, None).await
    }

    async fn close(
        db: &PgPool,
        id: ConflictId,
        status: ConflictStatus,
        resolution: Option<String>,
    ) -> Result<ScheduleConflict, AppError> {
        let conflict = Self::get(db, id).await?;
        if !conflict.status.is_open() {
            return Err(AppError::bad_request(anyhow!(
                "Conflict is already {}",
                conflict.status
            )));
        }

        let conflict = sqlx::query_as::<_, ScheduleConflict>(&format!(
            r#"UPDATE schedule_conflicts
               SET status = $1, resolution = COALESCE($2, resolution), resolved_at = NOW()
               WHERE id = $3
               RETURNING {CONFLICT_COLUMNS}"#
        ))
        .bind(status)
        .bind(resolution)
        .bind(id)
        .fetch_one(db)
        .await?;

        Ok(conflict)
    }
}
