//! Seed rows and the configuration controlling how many are generated.

use campus_models::academic::Cycle;
use campus_models::ids::{DepartmentId, FacultyId, ProgramId, RoleId};
use campus_models::students::Sex;
use campus_models::teachers::TeacherGrade;
use chrono::NaiveDate;

pub struct FacultySeed {
    pub code: String,
    pub name: String,
    pub dean: String,
}

pub struct DepartmentSeed {
    pub faculty_id: FacultyId,
    pub code: String,
    pub name: String,
    pub head: String,
}

pub struct ProgramSeed {
    pub department_id: DepartmentId,
    pub code: String,
    pub name: String,
    pub cycle: Cycle,
    pub duration_years: i32,
    pub registration_fee: f64,
}

pub struct SubjectSeed {
    pub program_id: ProgramId,
    pub code: String,
    pub name: String,
    pub coefficient: i32,
    pub credits: i32,
    pub semester: i32,
}

/// Account row shared by teachers and students.
pub struct UserSeed {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: RoleId,
}

pub struct StudentSeed {
    pub user: UserSeed,
    pub program_id: ProgramId,
    pub registration_fee: f64,
    pub date_of_birth: NaiveDate,
    pub place_of_birth: String,
    pub sex: Sex,
    pub city: String,
}

pub struct TeacherSeed {
    pub user: UserSeed,
    pub department_id: DepartmentId,
    pub grade: TeacherGrade,
    pub specialty: String,
    pub sex: Sex,
}

/// Size of the academic structure under each faculty.
#[derive(Clone)]
pub struct StructurePerFaculty {
    pub departments: usize,
    pub programs_per_department: usize,
    pub subjects_per_program: usize,
}

impl Default for StructurePerFaculty {
    fn default() -> Self {
        Self {
            departments: 3,
            programs_per_department: 2,
            subjects_per_program: 8,
        }
    }
}

/// People generated for each department and program.
#[derive(Clone)]
pub struct PeoplePerUnit {
    pub teachers_per_department: usize,
    pub students_per_program: usize,
}

impl Default for PeoplePerUnit {
    fn default() -> Self {
        Self {
            teachers_per_department: 4,
            students_per_program: 30,
        }
    }
}

#[derive(Clone, Default)]
pub struct SeedConfig {
    pub num_faculties: usize,
    pub structure: StructurePerFaculty,
    pub people: PeoplePerUnit,
}

impl SeedConfig {
    pub fn new(num_faculties: usize) -> Self {
        Self {
            num_faculties,
            ..Default::default()
        }
    }

    pub fn with_structure(mut self, structure: StructurePerFaculty) -> Self {
        self.structure = structure;
        self
    }

    pub fn with_people(mut self, people: PeoplePerUnit) -> Self {
        self.people = people;
        self
    }

    pub fn total_departments(&self) -> usize {
        self.num_faculties * self.structure.departments
    }

    pub fn total_programs(&self) -> usize {
        self.total_departments() * self.structure.programs_per_department
    }

    pub fn total_teachers(&self) -> usize {
        self.total_departments() * self.people.teachers_per_department
    }

    pub fn total_students(&self) -> usize {
        self.total_programs() * self.people.students_per_program
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_follow_structure() {
        let config = SeedConfig::new(2)
            .with_structure(StructurePerFaculty {
                departments: 3,
                programs_per_department: 2,
                subjects_per_program: 5,
            })
            .with_people(PeoplePerUnit {
                teachers_per_department: 4,
                students_per_program: 10,
            });

        assert_eq!(config.total_departments(), 6);
        assert_eq!(config.total_programs(), 12);
        assert_eq!(config.total_teachers(), 24);
        assert_eq!(config.total_students(), 120);
    }

    #[test]
    fn test_default_config_is_empty() {
        let config = SeedConfig::default();
        assert_eq!(config.total_students(), 0);
        assert_eq!(config.structure.departments, 3);
    }
}
