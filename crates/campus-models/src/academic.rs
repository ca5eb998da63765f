//! Academic structure: years, faculties, departments, programs, subjects.

use crate::enums::define_enum;
use crate::ids::{AcademicYearId, DepartmentId, FacultyId, ProgramId, SubjectId};
use campus_core::serde::{
    deserialize_optional_bool, deserialize_optional_from_str, deserialize_optional_i32,
};
use campus_core::{PaginationMeta, PaginationParams};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

// =============================================================================
// Academic years
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AcademicYear {
    pub id: AcademicYearId,
    /// e.g. `2024-2025`
    pub code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AcademicYear {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// A year must end strictly after it starts.
pub fn check_year_dates(start: NaiveDate, end: NaiveDate) -> Result<(), String> {
    if end <= start {
        return Err("end_date must be after start_date".to_string());
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAcademicYearDto {
    #[validate(length(min = 4, max = 20, message = "code must be 4-20 characters"))]
    #[schema(example = "2024-2025")]
    pub code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateAcademicYearDto {
    #[validate(length(min = 4, max = 20))]
    pub code: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AcademicYearFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_active: Option<bool>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedAcademicYearsResponse {
    pub data: Vec<AcademicYear>,
    pub meta: PaginationMeta,
}

// =============================================================================
// Faculties
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Faculty {
    pub id: FacultyId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub dean: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFacultyDto {
    #[validate(length(min = 1, max = 20, message = "code must be 1-20 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub dean: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateFacultyDto {
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub dean: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FacultyFilterParams {
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedFacultiesResponse {
    pub data: Vec<Faculty>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct FacultyStatistics {
    pub department_count: i64,
    pub program_count: i64,
    pub teacher_count: i64,
    /// Students with an ENROLLED enrollment in the active year
    pub enrolled_student_count: i64,
}

// =============================================================================
// Departments
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Department {
    pub id: DepartmentId,
    pub faculty_id: FacultyId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub head: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDepartmentDto {
    pub faculty_id: FacultyId,
    #[validate(length(min = 1, max = 20, message = "code must be 1-20 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub head: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateDepartmentDto {
    pub faculty_id: Option<FacultyId>,
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub head: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DepartmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub faculty_id: Option<FacultyId>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedDepartmentsResponse {
    pub data: Vec<Department>,
    pub meta: PaginationMeta,
}

// =============================================================================
// Programs
// =============================================================================

define_enum!(
    /// Degree cycle of a program.
    Cycle {
        Licence => "LICENCE",
        Master => "MASTER",
        Doctorate => "DOCTORAT",
        Dut => "DUT",
        Bts => "BTS",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Program {
    pub id: ProgramId,
    pub department_id: DepartmentId,
    pub code: String,
    pub name: String,
    pub cycle: Cycle,
    pub duration_years: i32,
    pub description: Option<String>,
    pub registration_fee: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_duration_years() -> i32 {
    3
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProgramDto {
    pub department_id: DepartmentId,
    #[validate(length(min = 1, max = 20, message = "code must be 1-20 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    pub cycle: Cycle,
    #[serde(default = "default_duration_years")]
    #[validate(range(min = 1, max = 8, message = "duration_years must be between 1 and 8"))]
    pub duration_years: i32,
    pub description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "registration_fee cannot be negative"))]
    pub registration_fee: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProgramDto {
    pub department_id: Option<DepartmentId>,
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub cycle: Option<Cycle>,
    #[validate(range(min = 1, max = 8, message = "duration_years must be between 1 and 8"))]
    pub duration_years: Option<i32>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "registration_fee cannot be negative"))]
    pub registration_fee: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProgramFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub department_id: Option<DepartmentId>,
    pub cycle: Option<Cycle>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_active: Option<bool>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedProgramsResponse {
    pub data: Vec<Program>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LinkSubjectDto {
    pub subject_id: SubjectId,
}

// =============================================================================
// Subjects
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Subject {
    pub id: SubjectId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub coefficient: i32,
    pub credits: i32,
    pub hours_lecture: i32,
    pub hours_tutorial: i32,
    pub hours_practical: i32,
    pub semester: i32,
    pub is_optional: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subject {
    pub fn total_hours(&self) -> i32 {
        self.hours_lecture + self.hours_tutorial + self.hours_practical
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubjectDetail {
    #[serde(flatten)]
    pub subject: Subject,
    pub total_hours: i32,
    pub program_ids: Vec<ProgramId>,
}

impl SubjectDetail {
    pub fn new(subject: Subject, program_ids: Vec<ProgramId>) -> Self {
        Self {
            total_hours: subject.total_hours(),
            subject,
            program_ids,
        }
    }
}

fn default_coefficient() -> i32 {
    1
}

fn default_credits() -> i32 {
    3
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSubjectDto {
    #[validate(length(min = 1, max = 20, message = "code must be 1-20 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_coefficient")]
    #[validate(range(min = 1, max = 10, message = "coefficient must be between 1 and 10"))]
    pub coefficient: i32,
    #[serde(default = "default_credits")]
    #[validate(range(min = 1, max = 30, message = "credits must be between 1 and 30"))]
    pub credits: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "hours cannot be negative"))]
    pub hours_lecture: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "hours cannot be negative"))]
    pub hours_tutorial: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "hours cannot be negative"))]
    pub hours_practical: i32,
    #[validate(range(min = 1, max = 2, message = "semester must be 1 or 2"))]
    pub semester: i32,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub program_ids: Vec<ProgramId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateSubjectDto {
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 10, message = "coefficient must be between 1 and 10"))]
    pub coefficient: Option<i32>,
    #[validate(range(min = 1, max = 30, message = "credits must be between 1 and 30"))]
    pub credits: Option<i32>,
    #[validate(range(min = 0))]
    pub hours_lecture: Option<i32>,
    #[validate(range(min = 0))]
    pub hours_tutorial: Option<i32>,
    #[validate(range(min = 0))]
    pub hours_practical: Option<i32>,
    #[validate(range(min = 1, max = 2, message = "semester must be 1 or 2"))]
    pub semester: Option<i32>,
    pub is_optional: Option<bool>,
    /// Replaces the linked programs when present
    pub program_ids: Option<Vec<ProgramId>>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubjectFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub program_id: Option<ProgramId>,
    #[serde(default, deserialize_with = "deserialize_optional_i32")]
    pub semester: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_optional: Option<bool>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedSubjectsResponse {
    pub data: Vec<SubjectDetail>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SemesterQuery {
    pub semester: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_year_dates_must_be_ordered() {
        assert!(check_year_dates(date(2024, 9, 1), date(2025, 7, 31)).is_ok());
        assert!(check_year_dates(date(2024, 9, 1), date(2024, 9, 1)).is_err());
        assert!(check_year_dates(date(2025, 9, 1), date(2024, 9, 1)).is_err());
    }

    #[test]
    fn test_program_defaults_and_ranges() {
        let json = format!(
            r#"{{"department_id":"{}","code":"INF","name":"Informatique","cycle":"LICENCE"}}"#,
            DepartmentId::new()
        );
        let dto: CreateProgramDto = serde_json::from_str(&json).unwrap();
        assert_eq!(dto.duration_years, 3);
        assert_eq!(dto.registration_fee, 0.0);
        assert!(dto.is_active);
        assert!(dto.validate().is_ok());

        let too_long = CreateProgramDto {
            duration_years: 9,
            ..dto.clone()
        };
        assert!(too_long.validate().is_err());

        let negative_fee = CreateProgramDto {
            registration_fee: -1.0,
            ..dto
        };
        assert!(negative_fee.validate().is_err());
    }

    #[test]
    fn test_cycle_codes() {
        assert_eq!(Cycle::Doctorate.as_str(), "DOCTORAT");
        assert!("PHD".parse::<Cycle>().is_err());
    }

    #[test]
    fn test_subject_validation_and_total_hours() {
        let dto: CreateSubjectDto = serde_json::from_str(
            r#"{"code":"ALG1","name":"Algebra","semester":1,"hours_lecture":20,"hours_tutorial":10}"#,
        )
        .unwrap();
        assert_eq!(dto.coefficient, 1);
        assert_eq!(dto.credits, 3);
        assert!(dto.validate().is_ok());

        let bad_semester = CreateSubjectDto {
            semester: 3,
            ..dto.clone()
        };
        assert!(bad_semester.validate().is_err());

        let bad_coefficient = CreateSubjectDto {
            coefficient: 11,
            ..dto
        };
        assert!(bad_coefficient.validate().is_err());

        let now = Utc::now();
        let subject = Subject {
            id: SubjectId::new(),
            code: "ALG1".to_string(),
            name: "Algebra".to_string(),
            description: None,
            coefficient: 2,
            credits: 4,
            hours_lecture: 20,
            hours_tutorial: 10,
            hours_practical: 6,
            semester: 1,
            is_optional: false,
            created_at: now,
            updated_at: now,
        };
        let detail = SubjectDetail::new(subject, vec![]);
        assert_eq!(detail.total_hours, 36);
    }
}
