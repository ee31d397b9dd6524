use axum::{
    extract::State,
    routing::{delete, get, patch, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::middleware::{AdminUser, AuthUser, ValidJson, ValidPath, ValidQuery};
use crate::models::{BookingStatus, PageRequest};
use crate::response::{self, ApiResult};
use crate::services::ledger::history::BookingFilter;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/my-bookings", get(my_bookings))
        .route("/bookings/all", get(all_bookings))
        .route("/bookings/{id}", delete(cancel_booking))
        .route("/bookings/{id}/complete", patch(complete_booking))
        .route("/bookings/workshop/{id}/participants", get(participants))
}

/* ---------- БРОНИ ---------- */

#[derive(Debug, Deserialize, Validate)]
struct CreateBookingRequest {
    #[validate(range(min = 1, message = "Valid workshop ID is required"))]
    workshop_id: i64,
    #[validate(length(max = 1000, message = "Notes must be less than 1000 characters"))]
    notes: Option<String>,
}

// POST /api/bookings
async fn create_booking(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidJson(req): ValidJson<CreateBookingRequest>,
) -> ApiResult {
    let notes = req.notes.filter(|n| !n.trim().is_empty());
    let booking = state
        .ledger
        .create_booking(auth.user.id, req.workshop_id, notes)
        .await?;

    // места изменились, закешированные карточки устарели
    state.cache.invalidate_workshops().await;

    Ok(response::created("Workshop booked successfully", json!({ "booking": booking })))
}

// DELETE /api/bookings/{id}
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult {
    let booking = state.ledger.cancel_booking(id, &auth.principal()).await?;
    state.cache.invalidate_workshops().await;
    Ok(response::with_message("Booking cancelled successfully", json!({ "booking": booking })))
}

// PATCH /api/bookings/{id}/complete
async fn complete_booking(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult {
    let booking = state.ledger.complete_booking(id, &auth.principal()).await?;
    state.cache.invalidate_workshops().await;
    Ok(response::with_message("Booking marked as completed", json!({ "booking": booking })))
}

/* ---------- СПИСКИ ---------- */

#[derive(Debug, Deserialize, Validate)]
pub(super) struct MyBookingsQuery {
    status: Option<BookingStatus>,
    #[validate(range(min = 1, message = "Page must be a positive integer"))]
    page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    limit: Option<i64>,
}

// GET /api/bookings/my-bookings (и /api/users/bookings)
pub(super) async fn my_bookings(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidQuery(query): ValidQuery<MyBookingsQuery>,
) -> ApiResult {
    let page = PageRequest::new(query.page, query.limit);
    let (bookings, pagination) = state
        .ledger
        .user_bookings(auth.user.id, query.status, page)
        .await?;
    Ok(response::success(json!({ "bookings": bookings, "pagination": pagination })))
}

#[derive(Debug, Deserialize, Validate)]
struct AllBookingsQuery {
    #[validate(range(min = 1, message = "Valid workshop ID is required"))]
    workshop_id: Option<i64>,
    status: Option<BookingStatus>,
    user_email: Option<String>,
    #[validate(range(min = 1, message = "Page must be a positive integer"))]
    page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    limit: Option<i64>,
}

// GET /api/bookings/all
async fn all_bookings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidQuery(query): ValidQuery<AllBookingsQuery>,
) -> ApiResult {
    let filter = BookingFilter {
        workshop_id: query.workshop_id,
        status: query.status,
        user_email: query
            .user_email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()),
    };
    let page = PageRequest::new(query.page, query.limit);

    let (bookings, pagination) = state.ledger.all_bookings(&filter, page).await?;
    Ok(response::success(json!({ "bookings": bookings, "pagination": pagination })))
}

// GET /api/bookings/workshop/{id}/participants
async fn participants(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult {
    let list = state.ledger.participants(id).await?;
    Ok(response::success(list))
}
