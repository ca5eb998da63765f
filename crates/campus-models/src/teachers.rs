use crate::common::LabelCount;
use crate::enums::define_enum;
use crate::ids::{AcademicYearId, AssignmentId, DepartmentId, SubjectId, TeacherId, UserId};
use crate::students::Sex;
use campus_core::serde::deserialize_optional_from_str;
use campus_core::{PaginationMeta, PaginationParams, round2};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

define_enum!(
    TeacherGrade {
        Assistant => "ASSISTANT",
        Lecturer => "LECTURER",
        SeniorLecturer => "SENIOR_LECTURER",
        AssociateProfessor => "ASSOCIATE_PROFESSOR",
        Professor => "PROFESSOR",
    }
);

define_enum!(
    TeacherStatus {
        Active => "ACTIVE",
        OnLeave => "ON_LEAVE",
        Retired => "RETIRED",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Teacher {
    pub id: TeacherId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department_id: Option<DepartmentId>,
    /// e.g. `ENS2025003`
    pub registration_number: String,
    pub grade: TeacherGrade,
    pub specialty: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub phone: Option<String>,
    pub hired_on: Option<NaiveDate>,
    pub status: TeacherStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_grade() -> TeacherGrade {
    TeacherGrade::Assistant
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTeacherDto {
    #[validate(length(min = 1, max = 100, message = "first_name must be 1-100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "last_name must be 1-100 characters"))]
    pub last_name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    pub department_id: Option<DepartmentId>,
    #[serde(default = "default_grade")]
    pub grade: TeacherGrade,
    pub specialty: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub phone: Option<String>,
    pub hired_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateTeacherDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub department_id: Option<DepartmentId>,
    pub grade: Option<TeacherGrade>,
    pub specialty: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: Option<Sex>,
    pub phone: Option<String>,
    pub hired_on: Option<NaiveDate>,
    pub status: Option<TeacherStatus>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TeacherFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub department_id: Option<DepartmentId>,
    pub grade: Option<TeacherGrade>,
    pub status: Option<TeacherStatus>,
    /// Matches names, e-mail, registration number or specialty
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedTeachersResponse {
    pub data: Vec<Teacher>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeacherStatistics {
    pub total: i64,
    pub by_status: Vec<LabelCount>,
    pub by_grade: Vec<LabelCount>,
}

// =============================================================================
// Teaching assignments
// =============================================================================

define_enum!(
    AssignmentKind {
        Lecture => "LECTURE",
        Tutorial => "TUTORIAL",
        Practical => "PRACTICAL",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TeachingAssignment {
    pub id: AssignmentId,
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
    pub academic_year_id: AcademicYearId,
    pub kind: AssignmentKind,
    pub assigned_hours: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAssignmentDto {
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
    pub academic_year_id: AcademicYearId,
    pub kind: AssignmentKind,
    #[validate(range(min = 1, message = "assigned_hours must be positive"))]
    pub assigned_hours: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateAssignmentDto {
    pub kind: Option<AssignmentKind>,
    #[validate(range(min = 1, message = "assigned_hours must be positive"))]
    pub assigned_hours: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AssignmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub teacher_id: Option<TeacherId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub subject_id: Option<SubjectId>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub academic_year_id: Option<AcademicYearId>,
    pub kind: Option<AssignmentKind>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedAssignmentsResponse {
    pub data: Vec<TeachingAssignment>,
    pub meta: PaginationMeta,
}

/// Hours per assignment kind for one teacher.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Workload {
    pub teacher_id: TeacherId,
    pub academic_year_id: Option<AcademicYearId>,
    pub lecture_hours: i64,
    pub tutorial_hours: i64,
    pub practical_hours: i64,
    pub total_hours: i64,
    pub assignment_count: i64,
}

impl Workload {
    pub fn from_assignments(
        teacher_id: TeacherId,
        academic_year_id: Option<AcademicYearId>,
        assignments: &[TeachingAssignment],
    ) -> Self {
        let hours = |kind: AssignmentKind| -> i64 {
            assignments
                .iter()
                .filter(|a| a.kind == kind)
                .map(|a| i64::from(a.assigned_hours))
                .sum()
        };
        let lecture_hours = hours(AssignmentKind::Lecture);
        let tutorial_hours = hours(AssignmentKind::Tutorial);
        let practical_hours = hours(AssignmentKind::Practical);

        Self {
            teacher_id,
            academic_year_id,
            lecture_hours,
            tutorial_hours,
            practical_hours,
            total_hours: lecture_hours + tutorial_hours + practical_hours,
            assignment_count: assignments.len() as i64,
        }
    }

    /// Share of lecture hours in the total, as a percentage.
    pub fn lecture_share(&self) -> f64 {
        if self.total_hours == 0 {
            return 0.0;
        }
        round2(self.lecture_hours as f64 / self.total_hours as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(kind: AssignmentKind, hours: i32) -> TeachingAssignment {
        TeachingAssignment {
            id: AssignmentId::new(),
            teacher_id: TeacherId::new(),
            subject_id: SubjectId::new(),
            academic_year_id: AcademicYearId::new(),
            kind,
            assigned_hours: hours,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_workload_sums_hours_per_kind() {
        let assignments = vec![
            assignment(AssignmentKind::Lecture, 30),
            assignment(AssignmentKind::Lecture, 15),
            assignment(AssignmentKind::Tutorial, 20),
            assignment(AssignmentKind::Practical, 10),
        ];
        let workload = Workload::from_assignments(TeacherId::new(), None, &assignments);

        assert_eq!(workload.lecture_hours, 45);
        assert_eq!(workload.tutorial_hours, 20);
        assert_eq!(workload.practical_hours, 10);
        assert_eq!(workload.total_hours, 75);
        assert_eq!(workload.assignment_count, 4);
        assert_eq!(workload.lecture_share(), 60.0);
    }

    #[test]
    fn test_empty_workload() {
        let workload = Workload::from_assignments(TeacherId::new(), None, &[]);
        assert_eq!(workload.total_hours, 0);
        assert_eq!(workload.lecture_share(), 0.0);
    }

    #[test]
    fn test_assigned_hours_must_be_positive() {
        let dto = CreateAssignmentDto {
            teacher_id: TeacherId::new(),
            subject_id: SubjectId::new(),
            academic_year_id: AcademicYearId::new(),
            kind: AssignmentKind::Lecture,
            assigned_hours: 0,
        };
        assert!(dto.validate().is_err());
    }
}
