pub mod user;
pub mod workshop;
pub mod booking;

pub use user::{Principal, Role, User};
pub use workshop::{BookableWorkshop, Workshop, WorkshopListing, WorkshopStatus};
pub use booking::{AdminBooking, Booking, BookingDetail, BookingStatus, Participant, UserBooking};

use serde::Serialize;

/// Блок пагинации в ответах со списками.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64, total_items: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total_items + per_page - 1) / per_page
        } else {
            0
        };
        Pagination {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: per_page,
        }
    }
}

/// Нормализованные page/limit из query-строки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        PageRequest {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub fn pagination(&self, total_items: i64) -> Pagination {
        Pagination::new(self.page, self.limit, total_items)
    }
}
