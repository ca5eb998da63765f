use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    approve_reservation, cancel_maintenance, cancel_reservation, change_equipment_state,
    check_equipment_availability, complete_maintenance, create_equipment, create_maintenance,
    create_reservation, delete_equipment, delete_maintenance, get_available_equipment,
    get_equipment, get_equipment_list, get_equipment_statistics, get_maintenance,
    get_maintenance_history, get_maintenances, get_my_reservations, get_pending_reservations,
    get_reservation, get_reservation_statistics, get_reservations, reject_reservation,
    return_reserved_equipment, start_maintenance, update_equipment, update_maintenance,
};

pub fn init_equipment_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_equipment).get(get_equipment_list))
        .route("/available", get(get_available_equipment))
        .route("/check-availability", post(check_equipment_availability))
        .route("/statistics", get(get_equipment_statistics))
        .route(
            "/{id}",
            get(get_equipment)
                .put(update_equipment)
                .delete(delete_equipment),
        )
        .route("/{id}/change-state", post(change_equipment_state))
        .route("/{id}/maintenance-history", get(get_maintenance_history))
}

pub fn init_reservations_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_reservation).get(get_reservations))
        .route("/mine", get(get_my_reservations))
        .route("/pending", get(get_pending_reservations))
        .route("/statistics", get(get_reservation_statistics))
        .route("/{id}", get(get_reservation))
        .route("/{id}/approve", post(approve_reservation))
        .route("/{id}/reject", post(reject_reservation))
        .route("/{id}/cancel", post(cancel_reservation))
        .route("/{id}/return-equipment", post(return_reserved_equipment))
}

pub fn init_maintenances_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_maintenance).get(get_maintenances))
        .route(
            "/{id}",
            get(get_maintenance)
                .put(update_maintenance)
                .delete(delete_maintenance),
        )
        .route("/{id}/start", post(start_maintenance))
        .route("/{id}/complete", post(complete_maintenance))
        .route("/{id}/cancel", post(cancel_maintenance))
}
