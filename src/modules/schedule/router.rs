use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{
    create_building, create_course, create_room, create_time_slot, delete_building,
    delete_course, delete_room, delete_time_slot, detect_conflicts, get_available_rooms,
    get_building, get_buildings, get_conflict, get_conflicts, get_course, get_courses,
    get_courses_by_day, get_courses_by_teacher, get_room, get_room_occupancy, get_rooms,
    get_time_slot, get_time_slots, get_timetable, ignore_conflict, resolve_conflict,
    update_building, update_course, update_room, update_time_slot,
};

pub fn init_buildings_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_building).get(get_buildings))
        .route(
            "/{id}",
            get(get_building).put(update_building).delete(delete_building),
        )
}

pub fn init_rooms_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_room).get(get_rooms))
        .route("/available", get(get_available_rooms))
        .route("/{id}", get(get_room).put(update_room).delete(delete_room))
        .route("/{id}/occupancy", get(get_room_occupancy))
}

pub fn init_time_slots_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_time_slot).get(get_time_slots))
        .route(
            "/{id}",
            get(get_time_slot)
                .put(update_time_slot)
                .delete(delete_time_slot),
        )
}

pub fn init_courses_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_course).get(get_courses))
        .route("/by-day", get(get_courses_by_day))
        .route("/timetable", get(get_timetable))
        .route("/by-teacher/{teacher_id}", get(get_courses_by_teacher))
        .route(
            "/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
}

pub fn init_conflicts_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_conflicts))
        .route("/detect", post(detect_conflicts))
        .route("/{id}", get(get_conflict))
        .route("/{id}/resolve", post(resolve_conflict))
        .route("/{id}/ignore", post(ignore_conflict))
}
