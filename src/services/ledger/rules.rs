//! Проверки бизнес-правил бронирования.
//!
//! Функции чистые: они получают снимок строк, прочитанных под блокировкой
//! мастер-класса, и текущее время. Порядок проверок определяет, какая ошибка
//! вернётся клиенту, поэтому он зафиксирован здесь, а не в SQL.

use chrono::NaiveDateTime;

use super::error::{Action, LedgerError};
use crate::models::{BookableWorkshop, Booking, BookingStatus, Principal, WorkshopStatus};

/// Мастер-класс активен и ещё не начался.
pub fn ensure_open_for_booking(
    workshop: &BookableWorkshop,
    now: NaiveDateTime,
) -> Result<(), LedgerError> {
    if workshop.status != WorkshopStatus::Active {
        return Err(LedgerError::NotFound(super::error::Resource::Workshop));
    }
    if workshop.starts_at <= now {
        return Err(LedgerError::PastEvent(Action::Book));
    }
    Ok(())
}

/// У пользователя нет подтверждённой брони и есть свободное место.
pub fn ensure_seat_available(
    workshop: &BookableWorkshop,
    holds_confirmed_booking: bool,
) -> Result<(), LedgerError> {
    if holds_confirmed_booking {
        return Err(LedgerError::DuplicateBooking);
    }
    if workshop.is_full() {
        return Err(LedgerError::CapacityExceeded);
    }
    Ok(())
}

/// Проверки создания брони в том порядке, в каком их видит клиент.
pub fn check_new_booking(
    workshop: &BookableWorkshop,
    holds_confirmed_booking: bool,
    now: NaiveDateTime,
) -> Result<(), LedgerError> {
    ensure_open_for_booking(workshop, now)?;
    ensure_seat_available(workshop, holds_confirmed_booking)
}

pub fn ensure_cancellable(
    booking: &Booking,
    workshop_starts_at: NaiveDateTime,
    requester: &Principal,
    now: NaiveDateTime,
) -> Result<(), LedgerError> {
    if !requester.may_manage(booking.user_id) {
        return Err(LedgerError::Forbidden(Action::Cancel));
    }
    if booking.status == BookingStatus::Cancelled {
        return Err(LedgerError::AlreadyCancelled);
    }
    // окно отмены закрывается в момент начала
    if workshop_starts_at <= now {
        return Err(LedgerError::PastEvent(Action::Cancel));
    }
    Ok(())
}

pub fn ensure_completable(
    booking: &Booking,
    workshop_starts_at: NaiveDateTime,
    requester: &Principal,
    now: NaiveDateTime,
) -> Result<(), LedgerError> {
    if !requester.is_admin() {
        return Err(LedgerError::Forbidden(Action::Complete));
    }
    match booking.status {
        BookingStatus::Cancelled => return Err(LedgerError::AlreadyCancelled),
        BookingStatus::Completed => return Err(LedgerError::AlreadyCompleted),
        BookingStatus::Confirmed => {}
    }
    if workshop_starts_at > now {
        return Err(LedgerError::EventNotStarted);
    }
    Ok(())
}

/// Занимает ли бронь в этом статусе место в счётчике.
pub fn holds_seat(status: BookingStatus) -> bool {
    status == BookingStatus::Confirmed
}
