//! Buildings, rooms, weekly time slots, courses and schedule conflicts.

use crate::enums::define_enum;
use crate::ids::{
    AcademicYearId, BuildingId, ConflictId, CourseId, ProgramId, RoomId, SubjectId, TeacherId,
    TimeSlotId,
};
use campus_core::serde::{
    deserialize_optional_bool, deserialize_optional_from_str, deserialize_optional_i32,
};
use campus_core::{PaginationMeta, PaginationParams, round2};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

// =============================================================================
// Buildings and rooms
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Building {
    pub id: BuildingId,
    pub code: String,
    pub name: String,
    pub floors: i32,
    pub address: Option<String>,
    pub is_active: bool,
    pub room_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_floors() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBuildingDto {
    #[validate(length(min = 1, max = 20, message = "code must be 1-20 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[serde(default = "default_floors")]
    #[validate(range(min = 1, message = "floors must be at least 1"))]
    pub floors: i32,
    pub address: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateBuildingDto {
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(min = 1, message = "floors must be at least 1"))]
    pub floors: Option<i32>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BuildingFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_active: Option<bool>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedBuildingsResponse {
    pub data: Vec<Building>,
    pub meta: PaginationMeta,
}

define_enum!(
    RoomType {
        Classroom => "CLASSROOM",
        Tutorial => "TUTORIAL",
        Lab => "LAB",
        Amphitheater => "AMPHITHEATER",
        Conference => "CONFERENCE",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Room {
    pub id: RoomId,
    pub building_id: BuildingId,
    pub code: String,
    pub name: String,
    pub room_type: RoomType,
    pub capacity: i32,
    pub floor: i32,
    /// Free-text description of fixed equipment
    pub equipment: Option<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRoomDto {
    pub building_id: BuildingId,
    #[validate(length(min = 1, max = 20, message = "code must be 1-20 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    pub room_type: RoomType,
    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub capacity: i32,
    #[serde(default)]
    pub floor: i32,
    pub equipment: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateRoomDto {
    pub building_id: Option<BuildingId>,
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub room_type: Option<RoomType>,
    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub capacity: Option<i32>,
    pub floor: Option<i32>,
    pub equipment: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoomFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub building_id: Option<BuildingId>,
    pub room_type: Option<RoomType>,
    #[serde(default, deserialize_with = "deserialize_optional_i32")]
    pub min_capacity: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_available: Option<bool>,
    /// Matches code or name
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedRoomsResponse {
    pub data: Vec<Room>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailableRoomsQuery {
    pub time_slot_id: TimeSlotId,
    pub academic_year_id: AcademicYearId,
    pub min_capacity: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RoomOccupancy {
    pub room_id: RoomId,
    pub academic_year_id: Option<AcademicYearId>,
    pub occupied_slots: i64,
    pub total_slots: i64,
    pub occupancy_rate: f64,
}

pub fn occupancy_rate(occupied_slots: i64, total_slots: i64) -> f64 {
    if total_slots <= 0 {
        return 0.0;
    }
    round2(occupied_slots as f64 / total_slots as f64 * 100.0)
}

// =============================================================================
// Time slots
// =============================================================================

define_enum!(
    DayOfWeek {
        Monday => "MONDAY",
        Tuesday => "TUESDAY",
        Wednesday => "WEDNESDAY",
        Thursday => "THURSDAY",
        Friday => "FRIDAY",
        Saturday => "SATURDAY",
        Sunday => "SUNDAY",
    }
);

impl DayOfWeek {
    /// 1 for Monday through 7 for Sunday.
    pub fn number(&self) -> i32 {
        match self {
            DayOfWeek::Monday => 1,
            DayOfWeek::Tuesday => 2,
            DayOfWeek::Wednesday => 3,
            DayOfWeek::Thursday => 4,
            DayOfWeek::Friday => 5,
            DayOfWeek::Saturday => 6,
            DayOfWeek::Sunday => 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub code: String,
    pub day: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
}

pub fn check_slot_times(start: NaiveTime, end: NaiveTime) -> Result<(), String> {
    if end <= start {
        return Err("end_time must be after start_time".to_string());
    }
    Ok(())
}

pub fn duration_minutes(start: NaiveTime, end: NaiveTime) -> i64 {
    (end - start).num_minutes()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTimeSlotDto {
    #[validate(length(min = 1, max = 20, message = "code must be 1-20 characters"))]
    pub code: String,
    pub day: DayOfWeek,
    #[schema(value_type = String, example = "08:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:00:00")]
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateTimeSlotDto {
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    pub day: Option<DayOfWeek>,
    #[schema(value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TimeSlotFilterParams {
    pub day: Option<DayOfWeek>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedTimeSlotsResponse {
    pub data: Vec<TimeSlot>,
    pub meta: PaginationMeta,
}

// =============================================================================
// Courses
// =============================================================================

define_enum!(
    CourseKind {
        Lecture => "LECTURE",
        Tutorial => "TUTORIAL",
        Practical => "PRACTICAL",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Course {
    pub id: CourseId,
    pub academic_year_id: AcademicYearId,
    pub subject_id: SubjectId,
    pub teacher_id: Option<TeacherId>,
    pub program_id: ProgramId,
    pub room_id: Option<RoomId>,
    pub time_slot_id: TimeSlotId,
    pub kind: CourseKind,
    pub expected_size: i32,
    pub semester: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A course joined with its slot, subject, room and teacher for display.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CourseDetail {
    pub id: CourseId,
    pub academic_year_id: AcademicYearId,
    pub program_id: ProgramId,
    pub kind: CourseKind,
    pub semester: i32,
    pub day: DayOfWeek,
    #[schema(value_type = String)]
    pub start_time: NaiveTime,
    #[schema(value_type = String)]
    pub end_time: NaiveTime,
    pub subject_id: SubjectId,
    pub subject_code: String,
    pub subject_name: String,
    pub room_id: Option<RoomId>,
    pub room_code: Option<String>,
    pub teacher_id: Option<TeacherId>,
    pub teacher_name: Option<String>,
    pub expected_size: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TimetableDay {
    pub day: DayOfWeek,
    pub courses: Vec<CourseDetail>,
}

/// Groups courses by day, Monday first, each day ordered by start time.
pub fn group_timetable(mut courses: Vec<CourseDetail>) -> Vec<TimetableDay> {
    courses.sort_by_key(|c| (c.day.number(), c.start_time));
    let mut days: Vec<TimetableDay> = Vec::new();
    for course in courses {
        match days.last_mut() {
            Some(last) if last.day == course.day => last.courses.push(course),
            _ => days.push(TimetableDay {
                day: course.day,
                courses: vec![course],
            }),
        }
    }
    days
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCourseDto {
    pub academic_year_id: AcademicYearId,
    pub subject_id: SubjectId,
    pub teacher_id: Option<TeacherId>,
    pub program_id: ProgramId,
    pub room_id: Option<RoomId>,
    pub time_slot_id: TimeSlotId,
    pub kind: CourseKind,
    #[serde(default)]
    #[validate(range(min = 0, message = "expected_size cannot be negative"))]
    pub expected_size: i32,
    #[validate(range(min = 1, max = 2, message = "semester must be 1 or 2"))]
    pub semester: i32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCourseDto {
    pub teacher_id: Option<TeacherId>,
    pub room_id: Option<RoomId>,
    pub time_slot_id: Option<TimeSlotId>,
    pub kind: Option<CourseKind>,
    #[validate(range(min = 0, message = "expected_size cannot be negative"))]
    pub expected_size: Option<i32>,
    #[validate(range(min = 1, max = 2, message = "semester must be 1 or 2"))]
    pub semester: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourseFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub academic_year_id: Option<AcademicYearId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub program_id: Option<ProgramId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub teacher_id: Option<TeacherId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub room_id: Option<RoomId>,
    #[serde(default, deserialize_with = "deserialize_optional_i32")]
    pub semester: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedCoursesResponse {
    pub data: Vec<Course>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CoursesByDayQuery {
    pub day: DayOfWeek,
    pub academic_year_id: Option<AcademicYearId>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TimetableQuery {
    pub program_id: ProgramId,
    pub academic_year_id: AcademicYearId,
    pub semester: Option<i32>,
}

// =============================================================================
// Conflicts
// =============================================================================

define_enum!(
    ConflictKind {
        Room => "ROOM",
        Teacher => "TEACHER",
        Capacity => "CAPACITY",
    }
);

define_enum!(
    ConflictStatus {
        Detected => "DETECTED",
        InProgress => "IN_PROGRESS",
        Resolved => "RESOLVED",
        Ignored => "IGNORED",
    }
);

impl ConflictStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, ConflictStatus::Detected | ConflictStatus::InProgress)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ScheduleConflict {
    pub id: ConflictId,
    pub course_id: CourseId,
    pub other_course_id: Option<CourseId>,
    pub kind: ConflictKind,
    pub status: ConflictStatus,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution: Option<String>,
}

/// What conflict detection needs to know about one active course.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CoursePlacement {
    pub id: CourseId,
    pub time_slot_id: TimeSlotId,
    pub room_id: Option<RoomId>,
    pub teacher_id: Option<TeacherId>,
    pub expected_size: i32,
    pub room_capacity: Option<i32>,
}

impl CoursePlacement {
    pub fn over_capacity(&self) -> bool {
        self.room_capacity
            .is_some_and(|capacity| self.expected_size > capacity)
    }

    fn shares_room(&self, other: &CoursePlacement) -> bool {
        self.time_slot_id == other.time_slot_id
            && self.room_id.is_some()
            && self.room_id == other.room_id
    }

    fn shares_teacher(&self, other: &CoursePlacement) -> bool {
        self.time_slot_id == other.time_slot_id
            && self.teacher_id.is_some()
            && self.teacher_id == other.teacher_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedConflict {
    pub kind: ConflictKind,
    pub course_id: CourseId,
    pub other_course_id: Option<CourseId>,
    pub description: String,
}

/// Checks a course against the other active courses of its year before it
/// is saved. Returns the first clash found.
pub fn check_placement(candidate: &CoursePlacement, others: &[CoursePlacement]) -> Result<(), String> {
    if candidate.over_capacity() {
        return Err(format!(
            "Expected size {} exceeds room capacity {}",
            candidate.expected_size,
            candidate.room_capacity.unwrap_or_default()
        ));
    }
    for other in others.iter().filter(|o| o.id != candidate.id) {
        if candidate.shares_room(other) {
            return Err("Room is already booked for this time slot".to_string());
        }
        if candidate.shares_teacher(other) {
            return Err("Teacher already has a course in this time slot".to_string());
        }
    }
    Ok(())
}

/// Every room, teacher and capacity clash among `courses`. Each pair is
/// reported once, in input order.
pub fn detect_conflicts(courses: &[CoursePlacement]) -> Vec<DetectedConflict> {
    let mut conflicts = Vec::new();

    for (i, course) in courses.iter().enumerate() {
        for other in &courses[i + 1..] {
            if course.shares_room(other) {
                conflicts.push(DetectedConflict {
                    kind: ConflictKind::Room,
                    course_id: course.id,
                    other_course_id: Some(other.id),
                    description: "Two courses share the same room and time slot".to_string(),
                });
            }
            if course.shares_teacher(other) {
                conflicts.push(DetectedConflict {
                    kind: ConflictKind::Teacher,
                    course_id: course.id,
                    other_course_id: Some(other.id),
                    description: "A teacher has two courses in the same time slot".to_string(),
                });
            }
        }
        if course.over_capacity() {
            conflicts.push(DetectedConflict {
                kind: ConflictKind::Capacity,
                course_id: course.id,
                other_course_id: None,
                description: format!(
                    "Expected size {} exceeds room capacity {}",
                    course.expected_size,
                    course.room_capacity.unwrap_or_default()
                ),
            });
        }
    }

    conflicts
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConflictFilterParams {
    pub status: Option<ConflictStatus>,
    pub kind: Option<ConflictKind>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub course_id: Option<CourseId>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedConflictsResponse {
    pub data: Vec<ScheduleConflict>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DetectConflictsDto {
    pub academic_year_id: AcademicYearId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct DetectConflictsResponse {
    pub room: i64,
    pub teacher: i64,
    pub capacity: i64,
    pub total: i64,
}

impl DetectConflictsResponse {
    pub fn record(&mut self, kind: ConflictKind) {
        match kind {
            ConflictKind::Room => self.room += 1,
            ConflictKind::Teacher => self.teacher += 1,
            ConflictKind::Capacity => self.capacity += 1,
        }
        self.total += 1;
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ResolveConflictDto {
    #[validate(length(min = 1, message = "resolution is required"))]
    pub resolution: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(slot: TimeSlotId, room: Option<RoomId>, teacher: Option<TeacherId>) -> CoursePlacement {
        CoursePlacement {
            id: CourseId::new(),
            time_slot_id: slot,
            room_id: room,
            teacher_id: teacher,
            expected_size: 30,
            room_capacity: Some(40),
        }
    }

    #[test]
    fn test_detects_room_and_teacher_pairs_once() {
        let slot = TimeSlotId::new();
        let room = RoomId::new();
        let teacher = TeacherId::new();

        let a = placement(slot, Some(room), Some(teacher));
        let b = placement(slot, Some(room), None);
        let c = placement(slot, None, Some(teacher));
        let d = placement(TimeSlotId::new(), Some(room), Some(teacher));

        let conflicts = detect_conflicts(&[a.clone(), b.clone(), c.clone(), d]);
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].kind, ConflictKind::Room);
        assert_eq!(conflicts[0].course_id, a.id);
        assert_eq!(conflicts[0].other_course_id, Some(b.id));
        assert_eq!(conflicts[1].kind, ConflictKind::Teacher);
        assert_eq!(conflicts[1].other_course_id, Some(c.id));
    }

    #[test]
    fn test_detects_capacity_overflow() {
        let mut course = placement(TimeSlotId::new(), Some(RoomId::new()), None);
        course.expected_size = 60;
        let conflicts = detect_conflicts(&[course.clone()]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::Capacity);
        assert_eq!(conflicts[0].other_course_id, None);
        assert!(conflicts[0].description.contains("60"));
    }

    #[test]
    fn test_courses_without_room_never_clash_on_room() {
        let slot = TimeSlotId::new();
        let conflicts = detect_conflicts(&[placement(slot, None, None), placement(slot, None, None)]);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_check_placement() {
        let slot = TimeSlotId::new();
        let room = RoomId::new();
        let teacher = TeacherId::new();
        let existing = placement(slot, Some(room), Some(teacher));

        let same_room = placement(slot, Some(room), None);
        assert!(check_placement(&same_room, &[existing.clone()]).is_err());

        let same_teacher = placement(slot, Some(RoomId::new()), Some(teacher));
        let err = check_placement(&same_teacher, &[existing.clone()]).unwrap_err();
        assert!(err.contains("Teacher"));

        // updating a course never clashes with itself
        assert!(check_placement(&existing, &[existing.clone()]).is_ok());

        let mut crowded = placement(TimeSlotId::new(), Some(room), None);
        crowded.expected_size = 41;
        assert!(check_placement(&crowded, &[]).is_err());
    }

    #[test]
    fn test_occupancy_rate() {
        assert_eq!(occupancy_rate(5, 20), 25.0);
        assert_eq!(occupancy_rate(1, 3), 33.33);
        assert_eq!(occupancy_rate(0, 0), 0.0);
    }

    #[test]
    fn test_time_slot_times() {
        let eight = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        assert!(check_slot_times(eight, ten).is_ok());
        assert!(check_slot_times(ten, eight).is_err());
        assert!(check_slot_times(eight, eight).is_err());
        assert_eq!(duration_minutes(eight, ten), 120);
    }

    #[test]
    fn test_group_timetable_orders_days_and_times() {
        let course = |day: DayOfWeek, hour: u32| CourseDetail {
            id: CourseId::new(),
            academic_year_id: AcademicYearId::new(),
            program_id: ProgramId::new(),
            kind: CourseKind::Lecture,
            semester: 1,
            day,
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(hour + 2, 0, 0).unwrap(),
            subject_id: SubjectId::new(),
            subject_code: "MATH101".to_string(),
            subject_name: "Analysis".to_string(),
            room_id: None,
            room_code: None,
            teacher_id: None,
            teacher_name: None,
            expected_size: 0,
        };

        let days = group_timetable(vec![
            course(DayOfWeek::Wednesday, 10),
            course(DayOfWeek::Monday, 14),
            course(DayOfWeek::Monday, 8),
        ]);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, DayOfWeek::Monday);
        assert_eq!(days[0].courses[0].start_time.format("%H").to_string(), "08");
        assert_eq!(days[1].day, DayOfWeek::Wednesday);
    }

    #[test]
    fn test_detect_response_counts() {
        let mut response = DetectConflictsResponse::default();
        response.record(ConflictKind::Room);
        response.record(ConflictKind::Capacity);
        response.record(ConflictKind::Room);
        assert_eq!(response.room, 2);
        assert_eq!(response.capacity, 1);
        assert_eq!(response.total, 3);
    }
}
