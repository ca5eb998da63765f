use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{info, instrument};

use campus_core::{AppError, PaginationParams};
use campus_models::LabelCount;
use campus_models::ids::{EquipmentId, MaintenanceId, ReservationId, RoomId, UserId};

use crate::modules::search_pattern;

use super::model::{
    AvailabilityResponse, ChangeEquipmentStateDto, CheckAvailabilityDto,
    CompleteMaintenanceDto, CreateEquipmentDto, CreateMaintenanceDto, CreateReservationDto,
    Equipment, EquipmentFilterParams, EquipmentState, EquipmentStatistics, Maintenance,
    MaintenanceFilterParams, MaintenanceStatus, PaginatedEquipmentResponse,
    PaginatedMaintenancesResponse, PaginatedReservationsResponse, RejectReservationDto,
    Reservation, ReservationDetail, ReservationFilterParams, ReservationItem,
    ReservationStatistics, ReservationStatus, ReturnEquipmentDto, ReviewReservationDto,
    UpdateEquipmentDto, UpdateMaintenanceDto, check_quantities,
};

const EQUIPMENT_COLUMNS: &str = "id, name, reference, category, description, room_id, state, \
     available_quantity, total_quantity, acquired_on, acquisition_value, last_service, \
     next_service, is_reservable, observations, created_at, updated_at";

const RESERVATION_COLUMNS: &str = "id, requester_id, kind, room_id, starts_at, ends_at, purpose, \
     description, participants, status, validated_by, validated_at, validation_comment, \
     created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, reservation_id, equipment_id, quantity, returned, returned_at, return_condition";

const MAINTENANCE_COLUMNS: &str = "id, equipment_id, kind, status, scheduled_on, started_at, \
     finished_at, technician_id, description, work_done, parts_replaced, labour_cost, parts_cost, \
     total_cost, observations, created_at, updated_at";

/// Reservations that still hold their room and equipment.
const HOLDING: &str = "status IN ('PENDING', 'APPROVED')";

// =============================================================================
// Equipment
// =============================================================================

pub struct EquipmentService;

impl EquipmentService {
    #[instrument(skip(db, dto))]
    pub async fn create(db: &PgPool, dto: CreateEquipmentDto) -> Result<Equipment, AppError> {
        let available = dto.available_quantity.unwrap_or(dto.total_quantity);
        check_quantities(available, dto.total_quantity)
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let equipment = sqlx::query_as::<_, Equipment>(&format!(
            r#"INSERT INTO equipment
                (name, reference, category, description, room_id, available_quantity,
                 total_quantity, acquired_on, acquisition_value, next_service, is_reservable,
                 observations)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               RETURNING {EQUIPMENT_COLUMNS}"#
        ))
        .bind(&dto.name)
        .bind(&dto.reference)
        .bind(dto.category)
        .bind(&dto.description)
        .bind(dto.room_id)
        .bind(available)
        .bind(dto.total_quantity)
        .bind(dto.acquired_on)
        .bind(dto.acquisition_value)
        .bind(dto.next_service)
        .bind(dto.is_reservable)
        .bind(&dto.observations)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "Equipment with this reference already exists", "Room not found")
        })?;

        info!(equipment.id = %equipment.id, equipment.reference = %equipment.reference, "Equipment created");
        Ok(equipment)
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: EquipmentFilterParams,
    ) -> Result<PaginatedEquipmentResponse, AppError> {
        const WHERE: &str = r#" WHERE ($1::TEXT IS NULL OR category = $1)
              AND ($2::TEXT IS NULL OR state = $2)
              AND ($3::UUID IS NULL OR room_id = $3)
              AND ($4::BOOLEAN IS NULL OR is_reservable = $4)
              AND ($5::TEXT IS NULL OR name ILIKE $5 OR reference ILIKE $5)"#;

        let search = search_pattern(filters.search.as_deref());

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM equipment{WHERE}"))
            .bind(filters.category)
            .bind(filters.state)
            .bind(filters.room_id)
            .bind(filters.is_reservable)
            .bind(&search)
            .fetch_one(db)
            .await?;

        let data = sqlx::query_as::<_, Equipment>(&format!(
            "SELECT {EQUIPMENT_COLUMNS} FROM equipment{WHERE} ORDER BY name, reference{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.category)
        .bind(filters.state)
        .bind(filters.room_id)
        .bind(filters.is_reservable)
        .bind(&search)
        .fetch_all(db)
        .await?;

        Ok(PaginatedEquipmentResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    /// Reservable equipment in the AVAILABLE state with units left.
    #[instrument(skip(db))]
    pub async fn available(db: &PgPool) -> Result<Vec<Equipment>, AppError> {
        let equipment = sqlx::query_as::<_, Equipment>(&format!(
            r#"SELECT {EQUIPMENT_COLUMNS} FROM equipment
               WHERE state = 'AVAILABLE' AND available_quantity > 0 AND is_reservable
               ORDER BY name, reference"#
        ))
        .fetch_all(db)
        .await?;
        Ok(equipment)
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: EquipmentId) -> Result<Equipment, AppError> {
        sqlx::query_as::<_, Equipment>(&format!(
            "SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Equipment not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update(
        db: &PgPool,
        id: EquipmentId,
        dto: UpdateEquipmentDto,
    ) -> Result<Equipment, AppError> {
        let current = Self::get(db, id).await?;
        check_quantities(
            dto.available_quantity.unwrap_or(current.available_quantity),
            dto.total_quantity.unwrap_or(current.total_quantity),
        )
        .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        sqlx::query_as::<_, Equipment>(&format!(
            r#"UPDATE equipment
               SET name = COALESCE($1, name),
                   reference = COALESCE($2, reference),
                   category = COALESCE($3, category),
                   description = COALESCE($4, description),
                   room_id = COALESCE($5, room_id),
                   total_quantity = COALESCE($6, total_quantity),
                   available_quantity = COALESCE($7, available_quantity),
                   acquired_on = COALESCE($8, acquired_on),
                   acquisition_value = COALESCE($9, acquisition_value),
                   last_service = COALESCE($10, last_service),
                   next_service = COALESCE($11, next_service),
                   is_reservable = COALESCE($12, is_reservable),
                   observations = COALESCE($13, observations),
                   updated_at = NOW()
               WHERE id = $14
               RETURNING {EQUIPMENT_COLUMNS}"#
        ))
        .bind(&dto.name)
        .bind(&dto.reference)
        .bind(dto.category)
        .bind(&dto.description)
        .bind(dto.room_id)
        .bind(dto.total_quantity)
        .bind(dto.available_quantity)
        .bind(dto.acquired_on)
        .bind(dto.acquisition_value)
        .bind(dto.last_service)
        .bind(dto.next_service)
        .bind(dto.is_reservable)
        .bind(&dto.observations)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "Equipment with this reference already exists", "Room not found")
        })?
        .ok_or_else(|| AppError::not_found(anyhow!("Equipment not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: EquipmentId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Equipment not found")));
        }
        Ok(())
    }

    #[instrument(skip(db, dto))]
    pub async fn change_state(
        db: &PgPool,
        id: EquipmentId,
        dto: ChangeEquipmentStateDto,
    ) -> Result<Equipment, AppError> {
        let equipment = sqlx::query_as::<_, Equipment>(&format!(
            r#"UPDATE equipment
               SET state = $1, observations = COALESCE($2, observations), updated_at = NOW()
               WHERE id = $3
               RETURNING {EQUIPMENT_COLUMNS}"#
        ))
        .bind(dto.state)
        .bind(&dto.observations)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Equipment not found")))?;

        info!(equipment.id = %id, state = %dto.state, "Equipment state changed");
        Ok(equipment)
    }

    #[instrument(skip(db))]
    pub async fn maintenance_history(
        db: &PgPool,
        id: EquipmentId,
    ) -> Result<Vec<Maintenance>, AppError> {
        Self::get(db, id).await?;

        let history = sqlx::query_as::<_, Maintenance>(&format!(
            r#"SELECT {MAINTENANCE_COLUMNS} FROM maintenances
               WHERE equipment_id = $1
               ORDER BY scheduled_on DESC, created_at DESC"#
        ))
        .bind(id)
        .fetch_all(db)
        .await?;
        Ok(history)
    }

    #[instrument(skip(db))]
    pub async fn check_availability(
        db: &PgPool,
        dto: CheckAvailabilityDto,
    ) -> Result<AvailabilityResponse, AppError> {
        let equipment = Self::get(db, dto.equipment_id).await?;

        let mut conn = db.acquire().await?;
        let reserved =
            reserved_in_period(&mut conn, equipment.id, dto.starts_at, dto.ends_at).await?;

        Ok(AvailabilityResponse::compute(
            equipment.id,
            equipment.total_quantity,
            reserved,
            dto.quantity,
        ))
    }

    #[instrument(skip(db))]
    pub async fn statistics(db: &PgPool) -> Result<EquipmentStatistics, AppError> {
        let (total, total_units, available_units, total_value) =
            sqlx::query_as::<_, (i64, i64, i64, f64)>(
                r#"SELECT COUNT(*),
                          COALESCE(SUM(total_quantity), 0)::BIGINT,
                          COALESCE(SUM(available_quantity), 0)::BIGINT,
                          COALESCE(SUM(acquisition_value), 0)::DOUBLE PRECISION
                   FROM equipment"#,
            )
            .fetch_one(db)
            .await?;

        let by_state = sqlx::query_as::<_, LabelCount>(
            "SELECT state AS label, COUNT(*) AS count FROM equipment GROUP BY state ORDER BY state",
        )
        .fetch_all(db)
        .await?;

        let by_category = sqlx::query_as::<_, LabelCount>(
            r#"SELECT category AS label, COUNT(*) AS count FROM equipment
               GROUP BY category ORDER BY count DESC, category"#,
        )
        .fetch_all(db)
        .await?;

        Ok(EquipmentStatistics {
            total,
            by_state,
            by_category,
            total_units,
            available_units,
            total_value,
        })
    }
}

/// Units of the equipment held by pending or approved reservations that
/// overlap `[starts_at, ends_at)`.
async fn reserved_in_period(
    conn: &mut PgConnection,
    equipment_id: EquipmentId,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Result<i64, AppError> {
    let reserved = sqlx::query_scalar::<_, i64>(&format!(
        r#"SELECT COALESCE(SUM(ri.quantity), 0)::BIGINT
           FROM reservation_items ri
           JOIN reservations r ON r.id = ri.reservation_id
           WHERE ri.equipment_id = $1
             AND r.{HOLDING}
             AND r.starts_at < $3 AND r.ends_at > $2"#
    ))
    .bind(equipment_id)
    .bind(starts_at)
    .bind(ends_at)
    .fetch_one(conn)
    .await?;
    Ok(reserved)
}

async fn lock_equipment(
    tx: &mut Transaction<'_, Postgres>,
    id: EquipmentId,
) -> Result<Equipment, AppError> {
    sqlx::query_as::<_, Equipment>(&format!(
        "SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::bad_request(anyhow!("Equipment {} not found", id)))
}

/// Applies a reserve or release to the equipment's quantity and state.
async fn move_stock(
    tx: &mut Transaction<'_, Postgres>,
    equipment_id: EquipmentId,
    quantity: i32,
    reserve: bool,
) -> Result<(), AppError> {
    let equipment = lock_equipment(tx, equipment_id).await?;
    let stock = if reserve {
        equipment.stock().reserve(quantity)
    } else {
        equipment.stock().release(quantity)
    };

    sqlx::query(
        "UPDATE equipment SET available_quantity = $1, state = $2, updated_at = NOW() WHERE id = $3",
    )
    .bind(stock.available)
    .bind(stock.state)
    .bind(equipment_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn set_equipment_state(
    tx: &mut Transaction<'_, Postgres>,
    equipment_id: EquipmentId,
    state: EquipmentState,
    serviced: bool,
) -> Result<(), AppError> {
    sqlx::query(
        r#"UPDATE equipment
           SET state = $1,
               last_service = CASE WHEN $2 THEN CURRENT_DATE ELSE last_service END,
               updated_at = NOW()
           WHERE id = $3"#,
    )
    .bind(state)
    .bind(serviced)
    .bind(equipment_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// =============================================================================
// Reservations
// =============================================================================

pub struct ReservationService;

impl ReservationService {
    /// Checks the room and every item against overlapping reservations
    /// before storing the request as PENDING.
    #[instrument(skip(db, dto))]
    pub async fn create(
        db: &PgPool,
        requester_id: UserId,
        dto: CreateReservationDto,
    ) -> Result<ReservationDetail, AppError> {
        dto.check(Utc::now())
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let room_id = dto.room_id.filter(|_| dto.kind.needs_room());
        let mut tx = db.begin().await?;

        if let Some(room_id) = room_id {
            ensure_room_free(&mut tx, room_id, dto.starts_at, dto.ends_at).await?;
        }

        let items = if dto.kind.needs_equipment() {
            dto.items.clone()
        } else {
            Vec::new()
        };

        for item in &items {
            let equipment = lock_equipment(&mut tx, item.equipment_id).await?;
            if !equipment.is_reservable {
                return Err(AppError::bad_request(anyhow!(
                    "{} cannot be reserved",
                    equipment.name
                )));
            }

            let reserved =
                reserved_in_period(&mut tx, equipment.id, dto.starts_at, dto.ends_at).await?;
            let availability = AvailabilityResponse::compute(
                equipment.id,
                equipment.total_quantity,
                reserved,
                item.quantity,
            );
            if !availability.available {
                return Err(AppError::bad_request(anyhow!(
                    "Only {} unit(s) of {} available for this period",
                    availability.available_quantity,
                    equipment.name
                )));
            }
        }

        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            r#"INSERT INTO reservations
                (requester_id, kind, room_id, starts_at, ends_at, purpose, description, participants)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {RESERVATION_COLUMNS}"#
        ))
        .bind(requester_id)
        .bind(dto.kind)
        .bind(room_id)
        .bind(dto.starts_at)
        .bind(dto.ends_at)
        .bind(&dto.purpose)
        .bind(&dto.description)
        .bind(dto.participants)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "Reservation already exists", "Room not found"))?;

        let mut stored = Vec::with_capacity(items.len());
        for item in &items {
            let row = sqlx::query_as::<_, ReservationItem>(&format!(
                r#"INSERT INTO reservation_items (reservation_id, equipment_id, quantity)
                   VALUES ($1, $2, $3)
                   RETURNING {ITEM_COLUMNS}"#
            ))
            .bind(reservation.id)
            .bind(item.equipment_id)
            .bind(item.quantity)
            .fetch_one(&mut *tx)
            .await?;
            stored.push(row);
        }

        tx.commit().await?;

        info!(reservation.id = %reservation.id, kind = %reservation.kind, "Reservation requested");
        Ok(ReservationDetail::new(reservation, stored))
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: ReservationFilterParams,
    ) -> Result<PaginatedReservationsResponse, AppError> {
        const WHERE: &str = r#" WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::TEXT IS NULL OR kind = $2)
              AND ($3::UUID IS NULL OR room_id = $3)"#;

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM reservations{WHERE}"))
                .bind(filters.status)
                .bind(filters.kind)
                .bind(filters.room_id)
                .fetch_one(db)
                .await?;

        let data = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations{WHERE} ORDER BY starts_at DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.status)
        .bind(filters.kind)
        .bind(filters.room_id)
        .fetch_all(db)
        .await?;

        Ok(PaginatedReservationsResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn mine(
        db: &PgPool,
        user_id: UserId,
        pagination: PaginationParams,
    ) -> Result<PaginatedReservationsResponse, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reservations WHERE requester_id = $1",
        )
        .bind(user_id)
        .fetch_one(db)
        .await?;

        let data = sqlx::query_as::<_, Reservation>(&format!(
            r#"SELECT {RESERVATION_COLUMNS} FROM reservations
               WHERE requester_id = $1
               ORDER BY starts_at DESC{}"#,
            pagination.sql_suffix()
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;

        Ok(PaginatedReservationsResponse {
            data,
            meta: pagination.meta(total),
        })
    }

    /// Oldest start first, so the most urgent requests are reviewed first.
    #[instrument(skip(db))]
    pub async fn pending(db: &PgPool) -> Result<Vec<Reservation>, AppError> {
        let reservations = sqlx::query_as::<_, Reservation>(&format!(
            r#"SELECT {RESERVATION_COLUMNS} FROM reservations
               WHERE status = 'PENDING'
               ORDER BY starts_at"#
        ))
        .fetch_all(db)
        .await?;
        Ok(reservations)
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: ReservationId) -> Result<ReservationDetail, AppError> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Reservation not found")))?;

        let mut conn = db.acquire().await?;
        let items = items_of(&mut conn, id).await?;
        Ok(ReservationDetail::new(reservation, items))
    }

    /// Takes every item out of stock.
    #[instrument(skip(db, dto))]
    pub async fn approve(
        db: &PgPool,
        id: ReservationId,
        validated_by: UserId,
        dto: ReviewReservationDto,
    ) -> Result<ReservationDetail, AppError> {
        let mut tx = db.begin().await?;
        let reservation = lock_reservation(&mut tx, id).await?;
        ensure_pending(&reservation)?;

        let items = items_of(&mut tx, id).await?;
        for item in &items {
            move_stock(&mut tx, item.equipment_id, item.quantity, true).await?;
        }

        let reservation =
            review(&mut tx, id, ReservationStatus::Approved, validated_by, dto.comment).await?;
        tx.commit().await?;

        info!(reservation.id = %id, "Reservation approved");
        Ok(ReservationDetail::new(reservation, items))
    }

    #[instrument(skip(db, dto))]
    pub async fn reject(
        db: &PgPool,
        id: ReservationId,
        validated_by: UserId,
        dto: RejectReservationDto,
    ) -> Result<ReservationDetail, AppError> {
        let mut tx = db.begin().await?;
        let reservation = lock_reservation(&mut tx, id).await?;
        ensure_pending(&reservation)?;

        let reservation = review(
            &mut tx,
            id,
            ReservationStatus::Rejected,
            validated_by,
            Some(dto.comment),
        )
        .await?;
        let items = items_of(&mut tx, id).await?;
        tx.commit().await?;

        Ok(ReservationDetail::new(reservation, items))
    }

    /// Requester only. Units still out on an approved reservation go back to stock.
    #[instrument(skip(db))]
    pub async fn cancel(
        db: &PgPool,
        id: ReservationId,
        user_id: UserId,
    ) -> Result<ReservationDetail, AppError> {
        let mut tx = db.begin().await?;
        let reservation = lock_reservation(&mut tx, id).await?;

        if reservation.requester_id != user_id {
            return Err(AppError::forbidden(
                "Only the requester can cancel this reservation",
            ));
        }
        reservation
            .status
            .ensure_cancellable()
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let items = items_of(&mut tx, id).await?;
        if reservation.status == ReservationStatus::Approved {
            for item in items.iter().filter(|item| !item.returned) {
                move_stock(&mut tx, item.equipment_id, item.quantity, false).await?;
            }
        }

        let reservation = set_status(&mut tx, id, ReservationStatus::Cancelled).await?;
        tx.commit().await?;

        info!(reservation.id = %id, "Reservation cancelled");
        Ok(ReservationDetail::new(reservation, items))
    }

    /// Marks one item returned. The reservation completes once every item is back.
    #[instrument(skip(db, dto))]
    pub async fn return_equipment(
        db: &PgPool,
        id: ReservationId,
        dto: ReturnEquipmentDto,
    ) -> Result<ReservationDetail, AppError> {
        let mut tx = db.begin().await?;
        let reservation = lock_reservation(&mut tx, id).await?;

        if reservation.status != ReservationStatus::Approved {
            return Err(AppError::bad_request(anyhow!(
                "Equipment can only be returned on an approved reservation"
            )));
        }

        let item = sqlx::query_as::<_, ReservationItem>(&format!(
            r#"SELECT {ITEM_COLUMNS} FROM reservation_items
               WHERE reservation_id = $1 AND equipment_id = $2
               FOR UPDATE"#
        ))
        .bind(id)
        .bind(dto.equipment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::not_found(anyhow!("Equipment is not part of this reservation"))
        })?;

        if item.returned {
            return Err(AppError::bad_request(anyhow!(
                "Equipment has already been returned"
            )));
        }

        sqlx::query(
            r#"UPDATE reservation_items
               SET returned = TRUE, returned_at = NOW(), return_condition = $1
               WHERE id = $2"#,
        )
        .bind(&dto.return_condition)
        .bind(item.id)
        .execute(&mut *tx)
        .await?;

        move_stock(&mut tx, item.equipment_id, item.quantity, false).await?;

        let items = items_of(&mut tx, id).await?;
        let reservation = if items.iter().all(|item| item.returned) {
            set_status(&mut tx, id, ReservationStatus::Completed).await?
        } else {
            reservation
        };

        tx.commit().await?;
        Ok(ReservationDetail::new(reservation, items))
    }

    #[instrument(skip(db))]
    pub async fn statistics(db: &PgPool) -> Result<ReservationStatistics, AppError> {
        let (total, upcoming) = sqlx::query_as::<_, (i64, i64)>(&format!(
            r#"SELECT COUNT(*), COUNT(*) FILTER (WHERE {HOLDING} AND starts_at > NOW())
               FROM reservations"#
        ))
        .fetch_one(db)
        .await?;

        let by_status = sqlx::query_as::<_, LabelCount>(
            "SELECT status AS label, COUNT(*) AS count FROM reservations GROUP BY status ORDER BY status",
        )
        .fetch_all(db)
        .await?;

        let by_kind = sqlx::query_as::<_, LabelCount>(
            r#"SELECT kind AS label, COUNT(*) AS count FROM reservations
               GROUP BY kind ORDER BY count DESC, kind"#,
        )
        .fetch_all(db)
        .await?;

        Ok(ReservationStatistics {
            total,
            by_status,
            by_kind,
            upcoming,
        })
    }
}

async fn ensure_room_free(
    tx: &mut Transaction<'_, Postgres>,
    room_id: RoomId,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Result<(), AppError> {
    let taken = sqlx::query_scalar::<_, bool>(&format!(
        r#"SELECT EXISTS(
               SELECT 1 FROM reservations
               WHERE room_id = $1 AND {HOLDING} AND starts_at < $3 AND ends_at > $2
           )"#
    ))
    .bind(room_id)
    .bind(starts_at)
    .bind(ends_at)
    .fetch_one(&mut **tx)
    .await?;

    if taken {
        return Err(AppError::bad_request(anyhow!(
            "Room is already reserved for this period"
        )));
    }
    Ok(())
}

async fn lock_reservation(
    tx: &mut Transaction<'_, Postgres>,
    id: ReservationId,
) -> Result<Reservation, AppError> {
    sqlx::query_as::<_, Reservation>(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("Reservation not found")))
}

fn ensure_pending(reservation: &Reservation) -> Result<(), AppError> {
    if reservation.status != ReservationStatus::Pending {
        return Err(AppError::bad_request(anyhow!(
            "Only a pending reservation can be reviewed"
        )));
    }
    Ok(())
}

async fn items_of(
    conn: &mut PgConnection,
    id: ReservationId,
) -> Result<Vec<ReservationItem>, AppError> {
    let items = sqlx::query_as::<_, ReservationItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM reservation_items WHERE reservation_id = $1 ORDER BY id"
    ))
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

async fn review(
    tx: &mut Transaction<'_, Postgres>,
    id: ReservationId,
    status: ReservationStatus,
    validated_by: UserId,
    comment: Option<String>,
) -> Result<Reservation, AppError> {
    let reservation = sqlx::query_as::<_, Reservation>(&format!(
        r#"UPDATE reservations
           SET status = $1, validated_by = $2, validated_at = NOW(),
               validation_comment = $3, updated_at = NOW()
           WHERE id = $4
           RETURNING {RESERVATION_COLUMNS}"#
    ))
    .bind(status)
    .bind(validated_by)
    .bind(comment)
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(reservation)
}

async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    id: ReservationId,
    status: ReservationStatus,
) -> Result<Reservation, AppError> {
    let reservation = sqlx::query_as::<_, Reservation>(&format!(
        r#"UPDATE reservations SET status = $1, updated_at = NOW()
           WHERE id = $2
           RETURNING {RESERVATION_COLUMNS}"#
    ))
    .bind(status)
    .bind(id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(reservation)
}

// =============================================================================
// Maintenance
// =============================================================================

pub struct MaintenanceService;

impl MaintenanceService {
    #[instrument(skip(db, dto))]
    pub async fn create(db: &PgPool, dto: CreateMaintenanceDto) -> Result<Maintenance, AppError> {
        sqlx::query_as::<_, Maintenance>(&format!(
            r#"INSERT INTO maintenances
                (equipment_id, kind, scheduled_on, technician_id, description, labour_cost,
                 parts_cost, observations)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {MAINTENANCE_COLUMNS}"#
        ))
        .bind(dto.equipment_id)
        .bind(dto.kind)
        .bind(dto.scheduled_on)
        .bind(dto.technician_id)
        .bind(&dto.description)
        .bind(dto.labour_cost)
        .bind(dto.parts_cost)
        .bind(&dto.observations)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "Maintenance already exists", "Equipment or technician not found")
        })
    }

    #[instrument(skip(db))]
    pub async fn list(
        db: &PgPool,
        filters: MaintenanceFilterParams,
    ) -> Result<PaginatedMaintenancesResponse, AppError> {
        const WHERE: &str = r#" WHERE ($1::UUID IS NULL OR equipment_id = $1)
              AND ($2::TEXT IS NULL OR kind = $2)
              AND ($3::TEXT IS NULL OR status = $3)"#;

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM maintenances{WHERE}"))
                .bind(filters.equipment_id)
                .bind(filters.kind)
                .bind(filters.status)
                .fetch_one(db)
                .await?;

        let data = sqlx::query_as::<_, Maintenance>(&format!(
            "SELECT {MAINTENANCE_COLUMNS} FROM maintenances{WHERE} ORDER BY scheduled_on DESC{}",
            filters.pagination.sql_suffix()
        ))
        .bind(filters.equipment_id)
        .bind(filters.kind)
        .bind(filters.status)
        .fetch_all(db)
        .await?;

        Ok(PaginatedMaintenancesResponse {
            data,
            meta: filters.pagination.meta(total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get(db: &PgPool, id: MaintenanceId) -> Result<Maintenance, AppError> {
        sqlx::query_as::<_, Maintenance>(&format!(
            "SELECT {MAINTENANCE_COLUMNS} FROM maintenances WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Maintenance not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update(
        db: &PgPool,
        id: MaintenanceId,
        dto: UpdateMaintenanceDto,
    ) -> Result<Maintenance, AppError> {
        sqlx::query_as::<_, Maintenance>(&format!(
            r#"UPDATE maintenances
               SET kind = COALESCE($1, kind),
                   scheduled_on = COALESCE($2, scheduled_on),
                   technician_id = COALESCE($3, technician_id),
                   description = COALESCE($4, description),
                   work_done = COALESCE($5, work_done),
                   parts_replaced = COALESCE($6, parts_replaced),
                   labour_cost = COALESCE($7, labour_cost),
                   parts_cost = COALESCE($8, parts_cost),
                   observations = COALESCE($9, observations),
                   updated_at = NOW()
               WHERE id = $10
               RETURNING {MAINTENANCE_COLUMNS}"#
        ))
        .bind(dto.kind)
        .bind(dto.scheduled_on)
        .bind(dto.technician_id)
        .bind(&dto.description)
        .bind(&dto.work_done)
        .bind(&dto.parts_replaced)
        .bind(dto.labour_cost)
        .bind(dto.parts_cost)
        .bind(&dto.observations)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(|e| AppError::from_db(e, "Maintenance already exists", "Technician not found"))?
        .ok_or_else(|| AppError::not_found(anyhow!("Maintenance not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete(db: &PgPool, id: MaintenanceId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM maintenances WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Maintenance not found")));
        }
        Ok(())
    }

    /// Takes the equipment out of service while the work is done.
    #[instrument(skip(db))]
    pub async fn start(db: &PgPool, id: MaintenanceId) -> Result<Maintenance, AppError> {
        let mut tx = db.begin().await?;
        let maintenance = lock_maintenance(&mut tx, id).await?;
        maintenance
            .status
            .ensure_startable()
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let maintenance = sqlx::query_as::<_, Maintenance>(&format!(
            r#"UPDATE maintenances
               SET status = 'IN_PROGRESS', started_at = NOW(), updated_at = NOW()
               WHERE id = $1
               RETURNING {MAINTENANCE_COLUMNS}"#
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        set_equipment_state(
            &mut tx,
            maintenance.equipment_id,
            EquipmentState::UnderMaintenance,
            false,
        )
        .await?;
        tx.commit().await?;

        info!(maintenance.id = %id, equipment.id = %maintenance.equipment_id, "Maintenance started");
        Ok(maintenance)
    }

    /// Puts the equipment back in service with today as its last service date.
    #[instrument(skip(db, dto))]
    pub async fn complete(
        db: &PgPool,
        id: MaintenanceId,
        dto: CompleteMaintenanceDto,
    ) -> Result<Maintenance, AppError> {
        let mut tx = db.begin().await?;
        let maintenance = lock_maintenance(&mut tx, id).await?;
        maintenance
            .status
            .ensure_completable()
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let maintenance = sqlx::query_as::<_, Maintenance>(&format!(
            r#"UPDATE maintenances
               SET status = 'COMPLETED',
                   started_at = COALESCE(started_at, NOW()),
                   finished_at = NOW(),
                   work_done = COALESCE($1, work_done),
                   parts_replaced = COALESCE($2, parts_replaced),
                   labour_cost = COALESCE($3, labour_cost),
                   parts_cost = COALESCE($4, parts_cost),
                   observations = COALESCE($5, observations),
                   updated_at = NOW()
               WHERE id = $6
               RETURNING {MAINTENANCE_COLUMNS}"#
        ))
        .bind(&dto.work_done)
        .bind(&dto.parts_replaced)
        .bind(dto.labour_cost)
        .bind(dto.parts_cost)
        .bind(&dto.observations)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        set_equipment_state(&mut tx, maintenance.equipment_id, EquipmentState::Available, true)
            .await?;
        tx.commit().await?;

        info!(maintenance.id = %id, total_cost = maintenance.total_cost, "Maintenance completed");
        Ok(maintenance)
    }

    /// Cancelling work in progress returns the equipment to service.
    #[instrument(skip(db))]
    pub async fn cancel(db: &PgPool, id: MaintenanceId) -> Result<Maintenance, AppError> {
        let mut tx = db.begin().await?;
        let current = lock_maintenance(&mut tx, id).await?;
        current
            .status
            .ensure_cancellable()
            .map_err(|e| AppError::bad_request(anyhow!(e)))?;

        let maintenance = sqlx::query_as::<_, Maintenance>(&format!(
            r#"UPDATE maintenances SET status = 'CANCELLED', updated_at = NOW()
               WHERE id = $1
               RETURNING {MAINTENANCE_COLUMNS}"#
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if current.status == MaintenanceStatus::InProgress {
            set_equipment_state(&mut tx, maintenance.equipment_id, EquipmentState::Available, false)
                .await?;
        }
        tx.commit().await?;
        Ok(maintenance)
    }
}

async fn lock_maintenance(
    tx: &mut Transaction<'_, Postgres>,
    id: MaintenanceId,
) -> Result<Maintenance, AppError> {
    sqlx::query_as::<_, Maintenance>(&format!(
        "SELECT {MAINTENANCE_COLUMNS} FROM maintenances WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("Maintenance not found")))
}
