use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use campus_core::{AppError, PaginationParams};
use campus_models::ids::{EquipmentId, MaintenanceId, ReservationId};

use crate::middleware::auth::{
    AuthUser, RequireReservationsValidate, RequireResourcesRead, RequireResourcesWrite,
};
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{
    AvailabilityResponse, ChangeEquipmentStateDto, CheckAvailabilityDto,
    CompleteMaintenanceDto, CreateEquipmentDto, CreateMaintenanceDto, CreateReservationDto,
    Equipment, EquipmentFilterParams, EquipmentStatistics, Maintenance, MaintenanceFilterParams,
    PaginatedEquipmentResponse, PaginatedMaintenancesResponse, PaginatedReservationsResponse,
    RejectReservationDto, Reservation, ReservationDetail, ReservationFilterParams,
    ReservationStatistics, ReturnEquipmentDto, ReviewReservationDto, UpdateEquipmentDto,
    UpdateMaintenanceDto,
};
use super::service::{EquipmentService, MaintenanceService, ReservationService};

// =============================================================================
// Equipment
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/equipment",
    request_body = CreateEquipmentDto,
    responses(
        (status = 201, description = "Equipment created", body = Equipment),
        (status = 400, description = "Duplicate reference or inconsistent quantities")
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_equipment(
    State(state): State<AppState>,
    RequireResourcesWrite(_auth_user): RequireResourcesWrite,
    ValidatedJson(dto): ValidatedJson<CreateEquipmentDto>,
) -> Result<(StatusCode, Json<Equipment>), AppError> {
    let equipment = EquipmentService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

#[utoipa::path(
    get,
    path = "/api/equipment",
    params(EquipmentFilterParams),
    responses((status = 200, description = "Equipment", body = PaginatedEquipmentResponse)),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_equipment_list(
    State(state): State<AppState>,
    RequireResourcesRead(_auth_user): RequireResourcesRead,
    Query(filters): Query<EquipmentFilterParams>,
) -> Result<Json<PaginatedEquipmentResponse>, AppError> {
    Ok(Json(EquipmentService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/equipment/available",
    responses((status = 200, description = "Equipment that can be reserved now", body = Vec<Equipment>)),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_available_equipment(
    State(state): State<AppState>,
    RequireResourcesRead(_auth_user): RequireResourcesRead,
) -> Result<Json<Vec<Equipment>>, AppError> {
    Ok(Json(EquipmentService::available(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/api/equipment/check-availability",
    request_body = CheckAvailabilityDto,
    responses(
        (status = 200, description = "Units free over the period", body = AvailabilityResponse),
        (status = 404, description = "Equipment not found")
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn check_equipment_availability(
    State(state): State<AppState>,
    RequireResourcesRead(_auth_user): RequireResourcesRead,
    ValidatedJson(dto): ValidatedJson<CheckAvailabilityDto>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    Ok(Json(EquipmentService::check_availability(&state.db, dto).await?))
}

#[utoipa::path(
    get,
    path = "/api/equipment/statistics",
    responses((status = 200, description = "Inventory statistics", body = EquipmentStatistics)),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_equipment_statistics(
    State(state): State<AppState>,
    RequireResourcesRead(_auth_user): RequireResourcesRead,
) -> Result<Json<EquipmentStatistics>, AppError> {
    Ok(Json(EquipmentService::statistics(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/equipment/{id}",
    params(("id" = String, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment", body = Equipment),
        (status = 404, description = "Equipment not found")
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_equipment(
    State(state): State<AppState>,
    RequireResourcesRead(_auth_user): RequireResourcesRead,
    Path(id): Path<EquipmentId>,
) -> Result<Json<Equipment>, AppError> {
    Ok(Json(EquipmentService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/equipment/{id}",
    params(("id" = String, Path, description = "Equipment ID")),
    request_body = UpdateEquipmentDto,
    responses(
        (status = 200, description = "Equipment updated", body = Equipment),
        (status = 400, description = "Inconsistent quantities"),
        (status = 404, description = "Equipment not found")
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_equipment(
    State(state): State<AppState>,
    RequireResourcesWrite(_auth_user): RequireResourcesWrite,
    Path(id): Path<EquipmentId>,
    ValidatedJson(dto): ValidatedJson<UpdateEquipmentDto>,
) -> Result<Json<Equipment>, AppError> {
    Ok(Json(EquipmentService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/equipment/{id}",
    params(("id" = String, Path, description = "Equipment ID")),
    responses(
        (status = 204, description = "Equipment deleted"),
        (status = 404, description = "Equipment not found")
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_equipment(
    State(state): State<AppState>,
    RequireResourcesWrite(_auth_user): RequireResourcesWrite,
    Path(id): Path<EquipmentId>,
) -> Result<StatusCode, AppError> {
    EquipmentService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/equipment/{id}/change-state",
    params(("id" = String, Path, description = "Equipment ID")),
    request_body = ChangeEquipmentStateDto,
    responses(
        (status = 200, description = "State changed", body = Equipment),
        (status = 404, description = "Equipment not found")
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn change_equipment_state(
    State(state): State<AppState>,
    RequireResourcesWrite(_auth_user): RequireResourcesWrite,
    Path(id): Path<EquipmentId>,
    ValidatedJson(dto): ValidatedJson<ChangeEquipmentStateDto>,
) -> Result<Json<Equipment>, AppError> {
    Ok(Json(EquipmentService::change_state(&state.db, id, dto).await?))
}

#[utoipa::path(
    get,
    path = "/api/equipment/{id}/maintenance-history",
    params(("id" = String, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Maintenances, most recent first", body = Vec<Maintenance>),
        (status = 404, description = "Equipment not found")
    ),
    tag = "Equipment",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_maintenance_history(
    State(state): State<AppState>,
    RequireResourcesRead(_auth_user): RequireResourcesRead,
    Path(id): Path<EquipmentId>,
) -> Result<Json<Vec<Maintenance>>, AppError> {
    Ok(Json(EquipmentService::maintenance_history(&state.db, id).await?))
}

// =============================================================================
// Reservations
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/reservations",
    request_body = CreateReservationDto,
    responses(
        (status = 201, description = "Reservation requested", body = ReservationDetail),
        (status = 400, description = "Invalid period, room taken or not enough units")
    ),
    tag = "Reservations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_reservation(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateReservationDto>,
) -> Result<(StatusCode, Json<ReservationDetail>), AppError> {
    let requester_id = auth_user.user_id()?;
    let reservation = ReservationService::create(&state.db, requester_id, dto).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

#[utoipa::path(
    get,
    path = "/api/reservations",
    params(ReservationFilterParams),
    responses((status = 200, description = "Reservations", body = PaginatedReservationsResponse)),
    tag = "Reservations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_reservations(
    State(state): State<AppState>,
    RequireResourcesRead(_auth_user): RequireResourcesRead,
    Query(filters): Query<ReservationFilterParams>,
) -> Result<Json<PaginatedReservationsResponse>, AppError> {
    Ok(Json(ReservationService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/reservations/mine",
    params(PaginationParams),
    responses((status = 200, description = "Current user's reservations", body = PaginatedReservationsResponse)),
    tag = "Reservations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_my_reservations(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedReservationsResponse>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(ReservationService::mine(&state.db, user_id, pagination).await?))
}

#[utoipa::path(
    get,
    path = "/api/reservations/pending",
    responses((status = 200, description = "Reservations awaiting review", body = Vec<Reservation>)),
    tag = "Reservations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_pending_reservations(
    State(state): State<AppState>,
    RequireReservationsValidate(_auth_user): RequireReservationsValidate,
) -> Result<Json<Vec<Reservation>>, AppError> {
    Ok(Json(ReservationService::pending(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/reservations/statistics",
    responses((status = 200, description = "Reservation statistics", body = ReservationStatistics)),
    tag = "Reservations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_reservation_statistics(
    State(state): State<AppState>,
    RequireResourcesRead(_auth_user): RequireResourcesRead,
) -> Result<Json<ReservationStatistics>, AppError> {
    Ok(Json(ReservationService::statistics(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/reservations/{id}",
    params(("id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation with its items", body = ReservationDetail),
        (status = 404, description = "Reservation not found")
    ),
    tag = "Reservations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_reservation(
    State(state): State<AppState>,
    RequireResourcesRead(_auth_user): RequireResourcesRead,
    Path(id): Path<ReservationId>,
) -> Result<Json<ReservationDetail>, AppError> {
    Ok(Json(ReservationService::get(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/reservations/{id}/approve",
    params(("id" = String, Path, description = "Reservation ID")),
    request_body = ReviewReservationDto,
    responses(
        (status = 200, description = "Reservation approved", body = ReservationDetail),
        (status = 400, description = "Reservation is not pending"),
        (status = 404, description = "Reservation not found")
    ),
    tag = "Reservations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn approve_reservation(
    State(state): State<AppState>,
    RequireReservationsValidate(auth_user): RequireReservationsValidate,
    Path(id): Path<ReservationId>,
    ValidatedJson(dto): ValidatedJson<ReviewReservationDto>,
) -> Result<Json<ReservationDetail>, AppError> {
    let validated_by = auth_user.user_id()?;
    Ok(Json(
        ReservationService::approve(&state.db, id, validated_by, dto).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/reservations/{id}/reject",
    params(("id" = String, Path, description = "Reservation ID")),
    request_body = RejectReservationDto,
    responses(
        (status = 200, description = "Reservation rejected", body = ReservationDetail),
        (status = 400, description = "Reservation is not pending"),
        (status = 404, description = "Reservation not found"),
        (status = 422, description = "Comment missing")
    ),
    tag = "Reservations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn reject_reservation(
    State(state): State<AppState>,
    RequireReservationsValidate(auth_user): RequireReservationsValidate,
    Path(id): Path<ReservationId>,
    ValidatedJson(dto): ValidatedJson<RejectReservationDto>,
) -> Result<Json<ReservationDetail>, AppError> {
    let validated_by = auth_user.user_id()?;
    Ok(Json(
        ReservationService::reject(&state.db, id, validated_by, dto).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/reservations/{id}/cancel",
    params(("id" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = ReservationDetail),
        (status = 400, description = "Reservation can no longer be cancelled"),
        (status = 403, description = "Not the requester"),
        (status = 404, description = "Reservation not found")
    ),
    tag = "Reservations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<ReservationId>,
) -> Result<Json<ReservationDetail>, AppError> {
    let user_id = auth_user.user_id()?;
    Ok(Json(ReservationService::cancel(&state.db, id, user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/reservations/{id}/return-equipment",
    params(("id" = String, Path, description = "Reservation ID")),
    request_body = ReturnEquipmentDto,
    responses(
        (status = 200, description = "Item returned", body = ReservationDetail),
        (status = 400, description = "Reservation not approved or item already returned"),
        (status = 404, description = "Reservation or item not found")
    ),
    tag = "Reservations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn return_reserved_equipment(
    State(state): State<AppState>,
    RequireResourcesWrite(_auth_user): RequireResourcesWrite,
    Path(id): Path<ReservationId>,
    ValidatedJson(dto): ValidatedJson<ReturnEquipmentDto>,
) -> Result<Json<ReservationDetail>, AppError> {
    Ok(Json(
        ReservationService::return_equipment(&state.db, id, dto).await?,
    ))
}

// =============================================================================
// Maintenance
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/maintenances",
    request_body = CreateMaintenanceDto,
    responses(
        (status = 201, description = "Maintenance planned", body = Maintenance),
        (status = 400, description = "Equipment or technician not found")
    ),
    tag = "Maintenances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_maintenance(
    State(state): State<AppState>,
    RequireResourcesWrite(_auth_user): RequireResourcesWrite,
    ValidatedJson(dto): ValidatedJson<CreateMaintenanceDto>,
) -> Result<(StatusCode, Json<Maintenance>), AppError> {
    let maintenance = MaintenanceService::create(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(maintenance)))
}

#[utoipa::path(
    get,
    path = "/api/maintenances",
    params(MaintenanceFilterParams),
    responses((status = 200, description = "Maintenances", body = PaginatedMaintenancesResponse)),
    tag = "Maintenances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_maintenances(
    State(state): State<AppState>,
    RequireResourcesRead(_auth_user): RequireResourcesRead,
    Query(filters): Query<MaintenanceFilterParams>,
) -> Result<Json<PaginatedMaintenancesResponse>, AppError> {
    Ok(Json(MaintenanceService::list(&state.db, filters).await?))
}

#[utoipa::path(
    get,
    path = "/api/maintenances/{id}",
    params(("id" = String, Path, description = "Maintenance ID")),
    responses(
        (status = 200, description = "Maintenance", body = Maintenance),
        (status = 404, description = "Maintenance not found")
    ),
    tag = "Maintenances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_maintenance(
    State(state): State<AppState>,
    RequireResourcesRead(_auth_user): RequireResourcesRead,
    Path(id): Path<MaintenanceId>,
) -> Result<Json<Maintenance>, AppError> {
    Ok(Json(MaintenanceService::get(&state.db, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/maintenances/{id}",
    params(("id" = String, Path, description = "Maintenance ID")),
    request_body = UpdateMaintenanceDto,
    responses(
        (status = 200, description = "Maintenance updated", body = Maintenance),
        (status = 404, description = "Maintenance not found")
    ),
    tag = "Maintenances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_maintenance(
    State(state): State<AppState>,
    RequireResourcesWrite(_auth_user): RequireResourcesWrite,
    Path(id): Path<MaintenanceId>,
    ValidatedJson(dto): ValidatedJson<UpdateMaintenanceDto>,
) -> Result<Json<Maintenance>, AppError> {
    Ok(Json(MaintenanceService::update(&state.db, id, dto).await?))
}

#[utoipa::path(
    delete,
    path = "/api/maintenances/{id}",
    params(("id" = String, Path, description = "Maintenance ID")),
    responses(
        (status = 204, description = "Maintenance deleted"),
        (status = 404, description = "Maintenance not found")
    ),
    tag = "Maintenances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_maintenance(
    State(state): State<AppState>,
    RequireResourcesWrite(_auth_user): RequireResourcesWrite,
    Path(id): Path<MaintenanceId>,
) -> Result<StatusCode, AppError> {
    MaintenanceService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/maintenances/{id}/start",
    params(("id" = String, Path, description = "Maintenance ID")),
    responses(
        (status = 200, description = "Maintenance started", body = Maintenance),
        (status = 400, description = "Maintenance is not planned"),
        (status = 404, description = "Maintenance not found")
    ),
    tag = "Maintenances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn start_maintenance(
    State(state): State<AppState>,
    RequireResourcesWrite(_auth_user): RequireResourcesWrite,
    Path(id): Path<MaintenanceId>,
) -> Result<Json<Maintenance>, AppError> {
    Ok(Json(MaintenanceService::start(&state.db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/maintenances/{id}/complete",
    params(("id" = String, Path, description = "Maintenance ID")),
    request_body = CompleteMaintenanceDto,
    responses(
        (status = 200, description = "Maintenance completed", body = Maintenance),
        (status = 400, description = "Maintenance is already finished"),
        (status = 404, description = "Maintenance not found")
    ),
    tag = "Maintenances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn complete_maintenance(
    State(state): State<AppState>,
    RequireResourcesWrite(_auth_user): RequireResourcesWrite,
    Path(id): Path<MaintenanceId>,
    ValidatedJson(dto): ValidatedJson<CompleteMaintenanceDto>,
) -> Result<Json<Maintenance>, AppError> {
    Ok(Json(MaintenanceService::complete(&state.db, id, dto).await?))
}

#[utoipa::path(
    post,
    path = "/api/maintenances/{id}/cancel",
    params(("id" = String, Path, description = "Maintenance ID")),
    responses(
        (status = 200, description = "Maintenance cancelled", body = Maintenance),
        (status = 400, description = "Maintenance is already finished"),
        (status = 404, description = "Maintenance not found")
    ),
    tag = "Maintenances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn cancel_maintenance(
    State(state): State<AppState>,
    RequireResourcesWrite(_auth_user): RequireResourcesWrite,
    Path(id): Path<MaintenanceId>,
) -> Result<Json<Maintenance>, AppError> {
    Ok(Json(MaintenanceService::cancel(&state.db, id).await?))
}
