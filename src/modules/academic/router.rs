use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use super::controller::{
    activate_academic_year, close_academic_year, create_academic_year, create_department,
    create_faculty, create_program, create_subject, delete_academic_year, delete_department,
    delete_faculty, delete_program, delete_subject, get_academic_year, get_academic_years,
    get_active_academic_year, get_department, get_department_programs, get_departments,
    get_faculties, get_faculty, get_faculty_departments, get_faculty_statistics, get_program,
    get_program_subjects, get_programs, get_subject, get_subjects, get_subjects_by_semester,
    link_program_subject, unlink_program_subject, update_academic_year, update_department,
    update_faculty, update_program, update_subject,
};

pub fn init_academic_years_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_academic_year).get(get_academic_years))
        .route("/active", get(get_active_academic_year))
        .route(
            "/{id}",
            get(get_academic_year)
                .put(update_academic_year)
                .delete(delete_academic_year),
        )
        .route("/{id}/activate", post(activate_academic_year))
        .route("/{id}/close", post(close_academic_year))
}

pub fn init_faculties_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_faculty).get(get_faculties))
        .route(
            "/{id}",
            get(get_faculty).put(update_faculty).delete(delete_faculty),
        )
        .route("/{id}/departments", get(get_faculty_departments))
        .route("/{id}/statistics", get(get_faculty_statistics))
}

pub fn init_departments_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_department).get(get_departments))
        .route(
            "/{id}",
            get(get_department)
                .put(update_department)
                .delete(delete_department),
        )
        .route("/{id}/programs", get(get_department_programs))
}

pub fn init_programs_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_program).get(get_programs))
        .route(
            "/{id}",
            get(get_program).put(update_program).delete(delete_program),
        )
        .route(
            "/{id}/subjects",
            get(get_program_subjects).post(link_program_subject),
        )
        .route("/{id}/subjects/{subject_id}", delete(unlink_program_subject))
}

pub fn init_subjects_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_subject).get(get_subjects))
        .route("/by-semester", get(get_subjects_by_semester))
        .route(
            "/{id}",
            get(get_subject).put(update_subject).delete(delete_subject),
        )
}
