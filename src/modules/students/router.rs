use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_enrollment, create_student, delete_enrollment, delete_student, get_enrollment,
    get_enrollment_statistics, get_enrollments, get_student, get_student_active_enrollment,
    get_student_enrollments, get_student_statistics, get_students, pay_enrollment,
    update_enrollment, update_student,
};

pub fn init_students_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_student).get(get_students))
        .route("/statistics", get(get_student_statistics))
        .route(
            "/{id}",
            get(get_student).put(update_student).delete(delete_student),
        )
        .route("/{id}/enrollments", get(get_student_enrollments))
        .route("/{id}/active-enrollment", get(get_student_active_enrollment))
}

pub fn init_enrollments_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_enrollment).get(get_enrollments))
        .route("/statistics", get(get_enrollment_statistics))
        .route(
            "/{id}",
            get(get_enrollment)
                .put(update_enrollment)
                .delete(delete_enrollment),
        )
        .route("/{id}/pay", post(pay_enrollment))
}
