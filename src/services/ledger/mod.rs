//! Учёт бронирований.
//!
//! Единственное место, которое меняет `workshops.current_bookings`. Каждая
//! операция выполняется в одной транзакции и начинается с блокировки строки
//! мастер-класса (`SELECT ... FOR UPDATE`), поэтому создание, отмена и
//! завершение броней одного мастер-класса выполняются строго по очереди:
//! счётчик всегда равен числу подтверждённых броней.
//!
//! Порядок блокировок: сначала мастер-класс, затем бронь.

pub mod error;
pub mod history;
pub mod rules;

use chrono::{NaiveDateTime, Utc};
use sqlx::{PgConnection, Postgres, Transaction};
use tracing::{debug, error, info};

pub use error::{Action, LedgerError, Resource};

use crate::database::Database;
use crate::models::{Booking, BookingDetail, BookingStatus, Principal, Workshop};
use crate::services::catalog::lock_workshop;

const BOOKING_COLUMNS: &str = "id, user_id, workshop_id, booking_date, status, notes";

#[derive(Clone)]
pub struct BookingLedger {
    db: Database,
}

impl BookingLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Создаёт подтверждённую бронь и занимает одно место.
    pub async fn create_booking(
        &self,
        user_id: i64,
        workshop_id: i64,
        notes: Option<String>,
    ) -> Result<BookingDetail, LedgerError> {
        let result = self.try_create_booking(user_id, workshop_id, notes).await;
        log_outcome("create_booking", workshop_id, &result);
        result
    }

    async fn try_create_booking(
        &self,
        user_id: i64,
        workshop_id: i64,
        notes: Option<String>,
    ) -> Result<BookingDetail, LedgerError> {
        // при раннем выходе транзакция откатывается в Drop
        let mut tx = self.db.pool.begin().await?;

        let workshop = lock_workshop(&mut tx, workshop_id)
            .await?
            .ok_or(LedgerError::NotFound(Resource::Workshop))?;
        let bookable = workshop.bookable();

        let holds_confirmed = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE user_id = $1 AND workshop_id = $2 AND status = 'confirmed'
             )"
        )
        .bind(user_id)
        .bind(workshop_id)
        .fetch_one(&mut *tx)
        .await?;
        rules::check_new_booking(&bookable, holds_confirmed, now())?;

        let booking = sqlx::query_as::<_, Booking>(&format!(
            "INSERT INTO bookings (user_id, workshop_id, notes, status)
             VALUES ($1, $2, $3, 'confirmed')
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(user_id)
        .bind(workshop_id)
        .bind(notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_violation_as_duplicate)?;

        sqlx::query(
            "UPDATE workshops SET current_bookings = current_bookings + 1 WHERE id = $1"
        )
        .bind(workshop_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(booking_id = booking.id, user_id, workshop_id, "booking confirmed");
        Ok(BookingDetail::new(booking, &workshop))
    }

    /// Отменяет бронь владельцем или администратором и освобождает место.
    pub async fn cancel_booking(
        &self,
        booking_id: i64,
        requester: &Principal,
    ) -> Result<Booking, LedgerError> {
        let result = self.try_cancel_booking(booking_id, requester).await;
        log_outcome("cancel_booking", booking_id, &result);
        result
    }

    async fn try_cancel_booking(
        &self,
        booking_id: i64,
        requester: &Principal,
    ) -> Result<Booking, LedgerError> {
        let mut tx = self.db.pool.begin().await?;

        let (workshop, booking) = lock_booking(&mut tx, booking_id).await?;
        rules::ensure_cancellable(&booking, workshop.starts_at(), requester, now())?;

        let cancelled = set_status(&mut tx, booking.id, BookingStatus::Cancelled).await?;
        if rules::holds_seat(booking.status) {
            release_seat(&mut tx, workshop.id).await?;
        }

        tx.commit().await?;

        info!(
            booking_id,
            workshop_id = workshop.id,
            requested_by = requester.user_id,
            "booking cancelled"
        );
        Ok(cancelled)
    }

    /// Администратор отмечает бронь завершённой после начала мастер-класса.
    pub async fn complete_booking(
        &self,
        booking_id: i64,
        requester: &Principal,
    ) -> Result<Booking, LedgerError> {
        let result = self.try_complete_booking(booking_id, requester).await;
        log_outcome("complete_booking", booking_id, &result);
        result
    }

    async fn try_complete_booking(
        &self,
        booking_id: i64,
        requester: &Principal,
    ) -> Result<Booking, LedgerError> {
        // проверка роли до любых чтений
        if !requester.is_admin() {
            return Err(LedgerError::Forbidden(Action::Complete));
        }

        let mut tx = self.db.pool.begin().await?;

        let (workshop, booking) = lock_booking(&mut tx, booking_id).await?;
        rules::ensure_completable(&booking, workshop.starts_at(), requester, now())?;

        let completed = set_status(&mut tx, booking.id, BookingStatus::Completed).await?;
        release_seat(&mut tx, workshop.id).await?;

        tx.commit().await?;

        info!(booking_id, workshop_id = workshop.id, "booking completed");
        Ok(completed)
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Блокирует мастер-класс брони, затем саму бронь.
async fn lock_booking(
    tx: &mut Transaction<'_, Postgres>,
    booking_id: i64,
) -> Result<(Workshop, Booking), LedgerError> {
    // workshop_id брони не меняется, его можно прочитать без блокировки
    let workshop_id = sqlx::query_scalar::<_, i64>(
        "SELECT workshop_id FROM bookings WHERE id = $1"
    )
    .bind(booking_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(LedgerError::NotFound(Resource::Booking))?;

    let workshop = lock_workshop(tx, workshop_id)
        .await?
        .ok_or(LedgerError::NotFound(Resource::Workshop))?;

    let booking = sqlx::query_as::<_, Booking>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
    ))
    .bind(booking_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok((workshop, booking))
}

async fn set_status(
    conn: &mut PgConnection,
    booking_id: i64,
    status: BookingStatus,
) -> Result<Booking, sqlx::Error> {
    sqlx::query_as::<_, Booking>(&format!(
        "UPDATE bookings SET status = $2, updated_at = NOW()
         WHERE id = $1
         RETURNING {BOOKING_COLUMNS}"
    ))
    .bind(booking_id)
    .bind(status)
    .fetch_one(conn)
    .await
}

async fn release_seat(conn: &mut PgConnection, workshop_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE workshops SET current_bookings = GREATEST(current_bookings - 1, 0) WHERE id = $1"
    )
    .bind(workshop_id)
    .execute(conn)
    .await?;
    Ok(())
}

// Частичный уникальный индекс страхует проверку дубликата
fn unique_violation_as_duplicate(err: sqlx::Error) -> LedgerError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => LedgerError::DuplicateBooking,
        _ => LedgerError::Internal(err),
    }
}

fn log_outcome<T>(operation: &'static str, id: i64, result: &Result<T, LedgerError>) {
    match result {
        Ok(_) => {}
        Err(e) if e.is_business_rule() => {
            debug!(operation, id, reason = %e, "booking rule rejected request");
        }
        Err(e) => {
            error!(operation, id, error = ?e, "booking transaction failed");
        }
    }
}
