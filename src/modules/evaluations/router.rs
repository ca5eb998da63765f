use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    bulk_grades, compute_result, compute_subject_results, create_evaluation,
    create_evaluation_type, create_grade, delete_evaluation, delete_evaluation_type,
    delete_grade, duplicate_evaluation, get_evaluation, get_evaluation_grades,
    get_evaluation_statistics, get_evaluation_type, get_evaluation_types, get_evaluations,
    get_grade, get_grades, get_grades_by_student, get_result, get_result_statistics,
    get_results, get_transcript, update_evaluation, update_evaluation_type, update_grade,
};

pub fn init_evaluation_types_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_evaluation_type).get(get_evaluation_types))
        .route(
            "/{id}",
            get(get_evaluation_type)
                .put(update_evaluation_type)
                .delete(delete_evaluation_type),
        )
}

pub fn init_evaluations_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_evaluation).get(get_evaluations))
        .route(
            "/{id}",
            get(get_evaluation)
                .put(update_evaluation)
                .delete(delete_evaluation),
        )
        .route("/{id}/grades", get(get_evaluation_grades))
        .route("/{id}/statistics", get(get_evaluation_statistics))
        .route("/{id}/duplicate", post(duplicate_evaluation))
}

pub fn init_grades_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_grade).get(get_grades))
        .route("/bulk", post(bulk_grades))
        .route("/by-student/{student_id}", get(get_grades_by_student))
        .route(
            "/{id}",
            get(get_grade).put(update_grade).delete(delete_grade),
        )
}

pub fn init_results_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_results))
        .route("/compute", post(compute_result))
        .route("/compute-subject", post(compute_subject_results))
        .route("/statistics", get(get_result_statistics))
        .route("/transcript/{student_id}", get(get_transcript))
        .route("/{id}", get(get_result))
}
