use thiserror::Error;

/// Сущность, которую не удалось найти.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Workshop,
    Booking,
}

impl Resource {
    fn not_found_message(self) -> &'static str {
        match self {
            Resource::Workshop => "Workshop not found or not available for booking",
            Resource::Booking => "Booking not found",
        }
    }
}

/// Операция над бронью, в контексте которой возникла ошибка.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Book,
    Cancel,
    Complete,
}

impl Action {
    fn past_event_message(self) -> &'static str {
        match self {
            Action::Book => "Cannot book past workshops",
            Action::Cancel | Action::Complete => "Cannot cancel bookings for past or ongoing workshops",
        }
    }

    fn forbidden_message(self) -> &'static str {
        match self {
            Action::Book | Action::Cancel => "You can only cancel your own bookings",
            Action::Complete => "Access denied. Admin privileges required.",
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{}", .0.not_found_message())]
    NotFound(Resource),

    #[error("{}", .0.past_event_message())]
    PastEvent(Action),

    #[error("You have already booked this workshop")]
    DuplicateBooking,

    #[error("Workshop is fully booked")]
    CapacityExceeded,

    #[error("{}", .0.forbidden_message())]
    Forbidden(Action),

    #[error("Booking is already cancelled")]
    AlreadyCancelled,

    #[error("Booking is already completed")]
    AlreadyCompleted,

    #[error("Cannot complete a booking before the workshop starts")]
    EventNotStarted,

    #[error("storage failure")]
    Internal(#[from] sqlx::Error),
}

impl LedgerError {
    /// Ожидаемый исход бизнес-правила (не сбой хранилища).
    pub fn is_business_rule(&self) -> bool {
        !matches!(self, LedgerError::Internal(_))
    }
}
