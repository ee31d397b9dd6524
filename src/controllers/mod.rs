pub mod bookings;
pub mod users;
pub mod workshops;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(users::routes())
        .merge(workshops::routes())
        .merge(bookings::routes())
}
