use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_assignment, create_teacher, delete_assignment, delete_teacher, get_assignment,
    get_assignments, get_teacher, get_teacher_assignments, get_teacher_statistics,
    get_teacher_workload, get_teachers, update_assignment, update_teacher,
};

pub fn init_teachers_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_teacher).get(get_teachers))
        .route("/statistics", get(get_teacher_statistics))
        .route(
            "/{id}",
            get(get_teacher).put(update_teacher).delete(delete_teacher),
        )
        .route("/{id}/assignments", get(get_teacher_assignments))
        .route("/{id}/workload", get(get_teacher_workload))
}

pub fn init_assignments_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_assignment).get(get_assignments))
        .route(
            "/{id}",
            get(get_assignment)
                .put(update_assignment)
                .delete(delete_assignment),
        )
}
