use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;

use super::Workshop;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub workshop_id: i64,
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub notes: Option<String>,
}

/// Бронь вместе с полями мастер-класса для отображения.
#[derive(Debug, Clone, Serialize)]
pub struct BookingDetail {
    pub id: i64,
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub workshop_id: i64,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: String,
    pub price: Decimal,
}

impl BookingDetail {
    pub fn new(booking: Booking, workshop: &Workshop) -> Self {
        BookingDetail {
            id: booking.id,
            booking_date: booking.booking_date,
            status: booking.status,
            notes: booking.notes,
            workshop_id: workshop.id,
            title: workshop.title.clone(),
            description: workshop.description.clone(),
            instructor: workshop.instructor.clone(),
            date: workshop.date,
            start_time: workshop.start_time,
            end_time: workshop.end_time,
            location: workshop.location.clone(),
            price: workshop.price,
        }
    }
}

// GET /bookings/my-bookings
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserBooking {
    pub id: i64,
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub workshop_id: i64,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: String,
    pub price: Decimal,
    pub can_cancel: bool,
}

// GET /bookings/all (админ)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AdminBooking {
    pub id: i64,
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub workshop_id: i64,
    pub title: String,
    pub instructor: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Participant {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub notes: Option<String>,
}
