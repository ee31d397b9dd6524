use axum::{extract::State, routing::{get, post}, Router};
use serde_json::json;
use std::sync::Arc;

use super::bookings::my_bookings;
use crate::middleware::{AuthUser, ValidJson};
use crate::response::{self, ApiResult};
use crate::services::accounts::{LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/profile", get(get_profile).put(update_profile))
        .route("/users/bookings", get(my_bookings))
}

// POST /api/users/register
async fn register(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult {
    let session = state.accounts.register(req).await?;
    Ok(response::created("User registered successfully", session))
}

// POST /api/users/login
async fn login(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult {
    let session = state.accounts.login(req).await?;
    Ok(response::with_message("Login successful", session))
}

// GET /api/users/profile
async fn get_profile(State(state): State<Arc<AppState>>, auth: AuthUser) -> ApiResult {
    let user = state.accounts.profile(auth.user.id).await?;
    Ok(response::success(json!({ "user": user })))
}

// PUT /api/users/profile
async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> ApiResult {
    let user = state.accounts.update_profile(auth.user.id, req).await?;
    Ok(response::with_message("Profile updated successfully", json!({ "user": user })))
}
