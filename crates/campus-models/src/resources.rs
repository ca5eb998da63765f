//! Equipment inventory, room and equipment reservations, and maintenance.

use crate::common::LabelCount;
use crate::enums::define_enum;
use crate::ids::{
    EquipmentId, MaintenanceId, ReservationId, ReservationItemId, RoomId, UserId,
};
use campus_core::serde::{deserialize_optional_bool, deserialize_optional_from_str};
use campus_core::{PaginationMeta, PaginationParams, round2};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

// =============================================================================
// Equipment
// =============================================================================

define_enum!(
    EquipmentCategory {
        It => "IT",
        Audiovisual => "AUDIOVISUAL",
        Furniture => "FURNITURE",
        Sports => "SPORTS",
        Scientific => "SCIENTIFIC",
        Other => "OTHER",
    }
);

define_enum!(
    EquipmentState {
        Available => "AVAILABLE",
        Reserved => "RESERVED",
        UnderMaintenance => "UNDER_MAINTENANCE",
        OutOfService => "OUT_OF_SERVICE",
    }
);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: EquipmentId,
    pub name: String,
    pub reference: String,
    pub category: EquipmentCategory,
    pub description: Option<String>,
    pub room_id: Option<RoomId>,
    pub state: EquipmentState,
    pub available_quantity: i32,
    pub total_quantity: i32,
    pub acquired_on: Option<NaiveDate>,
    pub acquisition_value: Option<f64>,
    pub last_service: Option<NaiveDate>,
    pub next_service: Option<NaiveDate>,
    pub is_reservable: bool,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quantity and state of a piece of equipment after a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stock {
    pub available: i32,
    pub total: i32,
    pub state: EquipmentState,
}

impl Stock {
    /// Takes `quantity` units out; the equipment becomes `RESERVED` when
    /// nothing is left.
    pub fn reserve(self, quantity: i32) -> Self {
        let available = (self.available - quantity).max(0);
        let state = if available == 0 && self.state == EquipmentState::Available {
            EquipmentState::Reserved
        } else {
            self.state
        };
        Self {
            available,
            state,
            ..self
        }
    }

    /// Puts `quantity` units back, never above the total.
    pub fn release(self, quantity: i32) -> Self {
        let available = (self.available + quantity).min(self.total);
        let state = if available > 0 && self.state == EquipmentState::Reserved {
            EquipmentState::Available
        } else {
            self.state
        };
        Self {
            available,
            state,
            ..self
        }
    }
}

impl Equipment {
    pub fn is_available(&self) -> bool {
        self.state == EquipmentState::Available && self.available_quantity > 0 && self.is_reservable
    }

    pub fn stock(&self) -> Stock {
        Stock {
            available: self.available_quantity,
            total: self.total_quantity,
            state: self.state,
        }
    }
}

pub fn check_quantities(available: i32, total: i32) -> Result<(), String> {
    if available > total {
        return Err("available_quantity cannot exceed total_quantity".to_string());
    }
    Ok(())
}

fn default_quantity() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEquipmentDto {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "reference must be 1-50 characters"))]
    pub reference: String,
    pub category: EquipmentCategory,
    pub description: Option<String>,
    pub room_id: Option<RoomId>,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "total_quantity must be at least 1"))]
    pub total_quantity: i32,
    /// Defaults to total_quantity
    #[validate(range(min = 0, message = "available_quantity cannot be negative"))]
    pub available_quantity: Option<i32>,
    pub acquired_on: Option<NaiveDate>,
    #[validate(range(min = 0.0, message = "acquisition_value cannot be negative"))]
    pub acquisition_value: Option<f64>,
    pub next_service: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_reservable: bool,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipmentDto {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub reference: Option<String>,
    pub category: Option<EquipmentCategory>,
    pub description: Option<String>,
    pub room_id: Option<RoomId>,
    #[validate(range(min = 1, message = "total_quantity must be at least 1"))]
    pub total_quantity: Option<i32>,
    #[validate(range(min = 0, message = "available_quantity cannot be negative"))]
    pub available_quantity: Option<i32>,
    pub acquired_on: Option<NaiveDate>,
    #[validate(range(min = 0.0))]
    pub acquisition_value: Option<f64>,
    pub last_service: Option<NaiveDate>,
    pub next_service: Option<NaiveDate>,
    pub is_reservable: Option<bool>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangeEquipmentStateDto {
    pub state: EquipmentState,
    pub observations: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EquipmentFilterParams {
    pub category: Option<EquipmentCategory>,
    pub state: Option<EquipmentState>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub room_id: Option<RoomId>,
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_reservable: Option<bool>,
    /// Matches name or reference
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedEquipmentResponse {
    pub data: Vec<Equipment>,
    pub meta: PaginationMeta,
}

fn validate_period(dto: &CheckAvailabilityDto) -> Result<(), ValidationError> {
    if dto.ends_at <= dto.starts_at {
        let mut err = ValidationError::new("period");
        err.message = Some("ends_at must be after starts_at".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_period"))]
pub struct CheckAvailabilityDto {
    pub equipment_id: EquipmentId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub equipment_id: EquipmentId,
    pub total_quantity: i32,
    pub reserved_quantity: i64,
    pub available_quantity: i64,
    pub available: bool,
}

impl AvailabilityResponse {
    /// `reserved` counts units held by overlapping pending or approved
    /// reservations.
    pub fn compute(equipment_id: EquipmentId, total: i32, reserved: i64, requested: i32) -> Self {
        let available_quantity = (i64::from(total) - reserved).max(0);
        Self {
            equipment_id,
            total_quantity: total,
            reserved_quantity: reserved,
            available_quantity,
            available: available_quantity >= i64::from(requested),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EquipmentStatistics {
    pub total: i64,
    pub by_state: Vec<LabelCount>,
    pub by_category: Vec<LabelCount>,
    pub total_units: i64,
    pub available_units: i64,
    pub total_value: f64,
}

// =============================================================================
// Reservations
// =============================================================================

define_enum!(
    ReservationKind {
        Room => "ROOM",
        Equipment => "EQUIPMENT",
        RoomAndEquipment => "ROOM_AND_EQUIPMENT",
    }
);

impl ReservationKind {
    pub fn needs_room(&self) -> bool {
        matches!(self, ReservationKind::Room | ReservationKind::RoomAndEquipment)
    }

    pub fn needs_equipment(&self) -> bool {
        matches!(
            self,
            ReservationKind::Equipment | ReservationKind::RoomAndEquipment
        )
    }
}

define_enum!(
    ReservationStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        Cancelled => "CANCELLED",
        Completed => "COMPLETED",
    }
);

impl ReservationStatus {
    /// Pending and approved reservations hold their room and equipment.
    pub fn holds_resources(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Approved)
    }

    pub fn ensure_cancellable(&self) -> Result<(), &'static str> {
        match self {
            ReservationStatus::Completed => Err("A completed reservation cannot be cancelled"),
            ReservationStatus::Cancelled => Err("Reservation is already cancelled"),
            ReservationStatus::Rejected => Err("A rejected reservation cannot be cancelled"),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: ReservationId,
    pub requester_id: UserId,
    pub kind: ReservationKind,
    pub room_id: Option<RoomId>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub purpose: String,
    pub description: Option<String>,
    pub participants: Option<i32>,
    pub status: ReservationStatus,
    pub validated_by: Option<UserId>,
    pub validated_at: Option<DateTime<Utc>>,
    pub validation_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn duration_hours(&self) -> f64 {
        round2((self.ends_at - self.starts_at).num_minutes() as f64 / 60.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReservationItem {
    pub id: ReservationItemId,
    pub reservation_id: ReservationId,
    pub equipment_id: EquipmentId,
    pub quantity: i32,
    pub returned: bool,
    pub returned_at: Option<DateTime<Utc>>,
    pub return_condition: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReservationDetail {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub duration_hours: f64,
    pub items: Vec<ReservationItem>,
}

impl ReservationDetail {
    pub fn new(reservation: Reservation, items: Vec<ReservationItem>) -> Self {
        Self {
            duration_hours: reservation.duration_hours(),
            reservation,
            items,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReservationItemDto {
    pub equipment_id: EquipmentId,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReservationDto {
    pub kind: ReservationKind,
    pub room_id: Option<RoomId>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[validate(length(min = 1, max = 200, message = "purpose must be 1-200 characters"))]
    pub purpose: String,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "participants must be positive"))]
    pub participants: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<ReservationItemDto>,
}

impl CreateReservationDto {
    /// Shape checks that need the current time or cross several fields.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), String> {
        if self.ends_at <= self.starts_at {
            return Err("ends_at must be after starts_at".to_string());
        }
        if self.starts_at <= now {
            return Err("starts_at must be in the future".to_string());
        }
        if self.kind.needs_room() && self.room_id.is_none() {
            return Err("room_id is required for a room reservation".to_string());
        }
        if self.kind.needs_equipment() && self.items.is_empty() {
            return Err("at least one equipment item is required".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        if !self.items.iter().all(|item| seen.insert(item.equipment_id)) {
            return Err("each equipment can only be listed once".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ReviewReservationDto {
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RejectReservationDto {
    #[validate(length(min = 1, message = "comment is required"))]
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReturnEquipmentDto {
    pub equipment_id: EquipmentId,
    #[validate(length(max = 500))]
    pub return_condition: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReservationFilterParams {
    pub status: Option<ReservationStatus>,
    pub kind: Option<ReservationKind>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub room_id: Option<RoomId>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedReservationsResponse {
    pub data: Vec<Reservation>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationStatistics {
    pub total: i64,
    pub by_status: Vec<LabelCount>,
    pub by_kind: Vec<LabelCount>,
    pub upcoming: i64,
}

// =============================================================================
// Maintenance
// =============================================================================

define_enum!(
    MaintenanceKind {
        Preventive => "PREVENTIVE",
        Corrective => "CORRECTIVE",
        Urgent => "URGENT",
    }
);

define_enum!(
    MaintenanceStatus {
        Planned => "PLANNED",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
);

impl MaintenanceStatus {
    pub fn ensure_startable(&self) -> Result<(), &'static str> {
        match self {
            MaintenanceStatus::Planned => Ok(()),
            _ => Err("Only a planned maintenance can be started"),
        }
    }

    pub fn ensure_completable(&self) -> Result<(), &'static str> {
        match self {
            MaintenanceStatus::Planned | MaintenanceStatus::InProgress => Ok(()),
            _ => Err("Maintenance is already finished"),
        }
    }

    pub fn ensure_cancellable(&self) -> Result<(), &'static str> {
        match self {
            MaintenanceStatus::Completed => Err("A completed maintenance cannot be cancelled"),
            MaintenanceStatus::Cancelled => Err("Maintenance is already cancelled"),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Maintenance {
    pub id: MaintenanceId,
    pub equipment_id: EquipmentId,
    pub kind: MaintenanceKind,
    pub status: MaintenanceStatus,
    pub scheduled_on: NaiveDate,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub technician_id: Option<UserId>,
    pub description: String,
    pub work_done: Option<String>,
    pub parts_replaced: Option<String>,
    pub labour_cost: Option<f64>,
    pub parts_cost: Option<f64>,
    pub total_cost: f64,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn total_cost(labour_cost: Option<f64>, parts_cost: Option<f64>) -> f64 {
    round2(labour_cost.unwrap_or(0.0) + parts_cost.unwrap_or(0.0))
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMaintenanceDto {
    pub equipment_id: EquipmentId,
    pub kind: MaintenanceKind,
    pub scheduled_on: NaiveDate,
    pub technician_id: Option<UserId>,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[validate(range(min = 0.0, message = "labour_cost cannot be negative"))]
    pub labour_cost: Option<f64>,
    #[validate(range(min = 0.0, message = "parts_cost cannot be negative"))]
    pub parts_cost: Option<f64>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateMaintenanceDto {
    pub kind: Option<MaintenanceKind>,
    pub scheduled_on: Option<NaiveDate>,
    pub technician_id: Option<UserId>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub work_done: Option<String>,
    pub parts_replaced: Option<String>,
    #[validate(range(min = 0.0, message = "labour_cost cannot be negative"))]
    pub labour_cost: Option<f64>,
    #[validate(range(min = 0.0, message = "parts_cost cannot be negative"))]
    pub parts_cost: Option<f64>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CompleteMaintenanceDto {
    pub work_done: Option<String>,
    pub parts_replaced: Option<String>,
    #[validate(range(min = 0.0, message = "labour_cost cannot be negative"))]
    pub labour_cost: Option<f64>,
    #[validate(range(min = 0.0, message = "parts_cost cannot be negative"))]
    pub parts_cost: Option<f64>,
    pub observations: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MaintenanceFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub equipment_id: Option<EquipmentId>,
    pub kind: Option<MaintenanceKind>,
    pub status: Option<MaintenanceStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedMaintenancesResponse {
    pub data: Vec<Maintenance>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn stock(available: i32, total: i32, state: EquipmentState) -> Stock {
        Stock {
            available,
            total,
            state,
        }
    }

    #[test]
    fn test_reserve_down_to_zero_marks_reserved() {
        let after = stock(3, 5, EquipmentState::Available).reserve(2);
        assert_eq!(after, stock(1, 5, EquipmentState::Available));

        let after = after.reserve(1);
        assert_eq!(after, stock(0, 5, EquipmentState::Reserved));

        // never negative
        assert_eq!(after.reserve(4).available, 0);
    }

    #[test]
    fn test_release_caps_at_total_and_frees_equipment() {
        let after = stock(0, 5, EquipmentState::Reserved).release(2);
        assert_eq!(after, stock(2, 5, EquipmentState::Available));
        assert_eq!(stock(4, 5, EquipmentState::Available).release(3).available, 5);

        // maintenance is not overridden by a return
        let in_repair = stock(0, 2, EquipmentState::UnderMaintenance).release(1);
        assert_eq!(in_repair.state, EquipmentState::UnderMaintenance);
    }

    #[test]
    fn test_availability_in_period() {
        let id = EquipmentId::new();
        let response = AvailabilityResponse::compute(id, 10, 7, 3);
        assert_eq!(response.available_quantity, 3);
        assert!(response.available);

        let response = AvailabilityResponse::compute(id, 10, 7, 4);
        assert!(!response.available);

        let response = AvailabilityResponse::compute(id, 2, 5, 1);
        assert_eq!(response.available_quantity, 0);
    }

    fn reservation_dto(kind: ReservationKind) -> CreateReservationDto {
        let now = Utc::now();
        CreateReservationDto {
            kind,
            room_id: Some(RoomId::new()),
            starts_at: now + Duration::days(1),
            ends_at: now + Duration::days(1) + Duration::hours(2),
            purpose: "Thesis defence".to_string(),
            description: None,
            participants: Some(20),
            items: vec![ReservationItemDto {
                equipment_id: EquipmentId::new(),
                quantity: 1,
            }],
        }
    }

    #[test]
    fn test_reservation_request_checks() {
        let now = Utc::now();
        assert!(reservation_dto(ReservationKind::RoomAndEquipment).check(now).is_ok());

        let mut past = reservation_dto(ReservationKind::Room);
        past.starts_at = now - Duration::hours(1);
        assert_eq!(past.check(now).unwrap_err(), "starts_at must be in the future");

        let mut no_room = reservation_dto(ReservationKind::Room);
        no_room.room_id = None;
        assert!(no_room.check(now).is_err());

        let mut no_items = reservation_dto(ReservationKind::Equipment);
        no_items.items.clear();
        assert!(no_items.check(now).is_err());

        let mut duplicate = reservation_dto(ReservationKind::Equipment);
        duplicate.items.push(duplicate.items[0].clone());
        assert!(duplicate.check(now).is_err());
    }

    #[test]
    fn test_reservation_duration_hours() {
        let dto = reservation_dto(ReservationKind::Room);
        let reservation = Reservation {
            id: ReservationId::new(),
            requester_id: UserId::new(),
            kind: dto.kind,
            room_id: dto.room_id,
            starts_at: dto.starts_at,
            ends_at: dto.starts_at + Duration::minutes(90),
            purpose: dto.purpose,
            description: None,
            participants: None,
            status: ReservationStatus::Pending,
            validated_by: None,
            validated_at: None,
            validation_comment: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(reservation.duration_hours(), 1.5);
    }

    #[test]
    fn test_equipment_availability_flag() {
        let now = Utc::now();
        let equipment = Equipment {
            id: EquipmentId::new(),
            name: "Projector".to_string(),
            reference: "PRJ-001".to_string(),
            category: EquipmentCategory::Audiovisual,
            description: None,
            room_id: None,
            state: EquipmentState::Available,
            available_quantity: 1,
            total_quantity: 1,
            acquired_on: None,
            acquisition_value: None,
            last_service: None,
            next_service: None,
            is_reservable: true,
            observations: None,
            created_at: now,
            updated_at: now,
        };
        assert!(equipment.is_available());
        assert!(!Equipment { is_reservable: false, ..equipment.clone() }.is_available());
        assert!(!Equipment { available_quantity: 0, ..equipment.clone() }.is_available());
        assert!(
            !Equipment {
                state: EquipmentState::UnderMaintenance,
                ..equipment
            }
            .is_available()
        );
    }

    #[test]
    fn test_maintenance_transitions_and_cost() {
        assert!(MaintenanceStatus::Planned.ensure_startable().is_ok());
        assert!(MaintenanceStatus::InProgress.ensure_startable().is_err());
        assert!(MaintenanceStatus::InProgress.ensure_completable().is_ok());
        assert!(MaintenanceStatus::Completed.ensure_cancellable().is_err());
        assert_eq!(total_cost(Some(15_000.0), Some(7_500.5)), 22_500.5);
        assert_eq!(total_cost(None, None), 0.0);
    }

    #[test]
    fn test_quantities_check() {
        assert!(check_quantities(3, 5).is_ok());
        assert!(check_quantities(6, 5).is_err());
    }
}
