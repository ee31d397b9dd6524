use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "workshop_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WorkshopStatus {
    Active,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Workshop {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: String,
    pub price: Decimal,
    pub max_capacity: i32,
    pub current_bookings: i32,
    pub status: WorkshopStatus,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workshop {
    /// Момент начала (дата + время начала, UTC).
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn bookable(&self) -> BookableWorkshop {
        BookableWorkshop {
            id: self.id,
            status: self.status,
            starts_at: self.starts_at(),
            max_capacity: self.max_capacity,
            current_bookings: self.current_bookings,
        }
    }
}

/// Срез мастер-класса, которого достаточно для проверки правил бронирования.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookableWorkshop {
    pub id: i64,
    pub status: WorkshopStatus,
    pub starts_at: NaiveDateTime,
    pub max_capacity: i32,
    pub current_bookings: i32,
}

impl BookableWorkshop {
    pub fn available_seats(&self) -> i32 {
        (self.max_capacity - self.current_bookings).max(0)
    }

    pub fn is_full(&self) -> bool {
        self.current_bookings >= self.max_capacity
    }
}

// Строка каталога с производными полями
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkshopListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub workshop: Workshop,
    pub available_seats: i32,
    pub is_full: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_has_booked: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_helpers_follow_the_counter() {
        let starts_at = NaiveDate::from_ymd_opt(2030, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let mut w = BookableWorkshop {
            id: 1,
            status: WorkshopStatus::Active,
            starts_at,
            max_capacity: 5,
            current_bookings: 3,
        };
        assert_eq!(w.available_seats(), 2);
        assert!(!w.is_full());

        w.current_bookings = 5;
        assert_eq!(w.available_seats(), 0);
        assert!(w.is_full());
    }
}
