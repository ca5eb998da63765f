use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

use super::controller::{
    add_jury_member, close_deliberation, create_deliberation, delete_deliberation,
    generate_decisions, get_decisions, get_deliberation, get_deliberations, get_jury,
    remove_jury_member, update_decision, update_deliberation, validate_deliberation,
};

pub fn init_deliberations_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_deliberation).get(get_deliberations))
        .route("/decisions/{decision_id}", put(update_decision))
        .route(
            "/{id}",
            get(get_deliberation)
                .put(update_deliberation)
                .delete(delete_deliberation),
        )
        .route("/{id}/decisions", get(get_decisions))
        .route("/{id}/generate-decisions", post(generate_decisions))
        .route("/{id}/close", post(close_deliberation))
        .route("/{id}/validate", post(validate_deliberation))
        .route("/{id}/jury", get(get_jury).post(add_jury_member))
        .route("/{id}/jury/{member_id}", delete(remove_jury_member))
}
