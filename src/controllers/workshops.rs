use axum::{
    extract::State,
    http::{HeaderName, HeaderValue},
    response::Response,
    routing::get,
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

use crate::cache::workshops::{detail_key, listing_key};
use crate::middleware::{AdminUser, AuthUser, ValidJson, ValidPath, ValidQuery};
use crate::models::{PageRequest, WorkshopStatus};
use crate::response::{self, ApiResult};
use crate::services::catalog::{WorkshopFilter, WorkshopInput};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/workshops", get(list_workshops).post(create_workshop))
        .route("/workshops/categories/list", get(list_categories))
        .route(
            "/workshops/{id}",
            get(get_workshop).put(update_workshop).delete(delete_workshop),
        )
}

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

fn mark_cache(mut response: Response, hit: bool) -> Response {
    let value = if hit { "HIT" } else { "MISS" };
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static(value));
    response
}

async fn cached(state: &AppState, key: Option<&str>) -> Option<Value> {
    state.cache.get_json(key?).await
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/* ---------- ЧТЕНИЕ ---------- */

#[derive(Debug, Deserialize, Validate)]
struct ListQuery {
    #[validate(range(min = 1, message = "Page must be a positive integer"))]
    page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    limit: Option<i64>,
    category: Option<String>,
    search: Option<String>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    status: Option<WorkshopStatus>,
}

impl ListQuery {
    fn into_parts(self) -> (WorkshopFilter, PageRequest) {
        let filter = WorkshopFilter {
            status: self.status.unwrap_or(WorkshopStatus::Active),
            category: non_blank(self.category),
            search: non_blank(self.search),
            date_from: self.date_from,
            date_to: self.date_to,
        };
        (filter, PageRequest::new(self.page, self.limit))
    }
}

// GET /api/workshops
async fn list_workshops(
    State(state): State<Arc<AppState>>,
    viewer: Option<AuthUser>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> ApiResult {
    let (filter, page) = query.into_parts();

    // user_has_booked зависит от пользователя, кешируем только анонимные ответы
    let Some(viewer) = viewer else {
        let key = state
            .cache
            .workshops_generation()
            .await
            .map(|generation| listing_key(generation, &filter, page));
        if let Some(data) = cached(&state, key.as_deref()).await {
            return Ok(mark_cache(response::success(data), true));
        }

        let (workshops, pagination) = state.catalog.list(&filter, page, None).await?;
        let data = json!({ "workshops": workshops, "pagination": pagination });
        if let Some(key) = &key {
            state.cache.put_json(key, &data).await;
        }
        return Ok(mark_cache(response::success(data), false));
    };

    let (workshops, pagination) = state
        .catalog
        .list(&filter, page, Some(viewer.user.id))
        .await?;
    Ok(response::success(json!({ "workshops": workshops, "pagination": pagination })))
}

// GET /api/workshops/categories/list
async fn list_categories(State(state): State<Arc<AppState>>) -> ApiResult {
    let categories = state.catalog.categories().await?;
    Ok(response::success(json!({ "categories": categories })))
}

// GET /api/workshops/{id}
async fn get_workshop(
    State(state): State<Arc<AppState>>,
    viewer: Option<AuthUser>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult {
    if let Some(viewer) = viewer {
        let workshop = state.catalog.get(id, Some(viewer.user.id)).await?;
        return Ok(response::success(json!({ "workshop": workshop })));
    }

    let key = state
        .cache
        .workshops_generation()
        .await
        .map(|generation| detail_key(generation, id));
    if let Some(data) = cached(&state, key.as_deref()).await {
        return Ok(mark_cache(response::success(data), true));
    }

    let workshop = state.catalog.get(id, None).await?;
    let data: Value = json!({ "workshop": workshop });
    if let Some(key) = &key {
        state.cache.put_json(key, &data).await;
    }
    Ok(mark_cache(response::success(data), false))
}

/* ---------- АДМИНИСТРИРОВАНИЕ ---------- */

// POST /api/workshops
async fn create_workshop(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    ValidJson(input): ValidJson<WorkshopInput>,
) -> ApiResult {
    let today = Utc::now().date_naive();
    let workshop = state.catalog.create(&input, admin.user.id, today).await?;
    state.cache.invalidate_workshops().await;
    Ok(response::created("Workshop created successfully", json!({ "workshop": workshop })))
}

// PUT /api/workshops/{id}
async fn update_workshop(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidPath(id): ValidPath<i64>,
    ValidJson(input): ValidJson<WorkshopInput>,
) -> ApiResult {
    let workshop = state.catalog.update(id, &input).await?;
    state.cache.invalidate_workshops().await;
    Ok(response::with_message("Workshop updated successfully", json!({ "workshop": workshop })))
}

// DELETE /api/workshops/{id}
async fn delete_workshop(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult {
    state.catalog.delete(id).await?;
    state.cache.invalidate_workshops().await;
    Ok(response::message("Workshop deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_defaults_to_active_first_page() {
        let query: ListQuery = serde_json::from_value(json!({})).unwrap();
        let (filter, page) = query.into_parts();
        assert_eq!(filter.status, WorkshopStatus::Active);
        assert_eq!(page, PageRequest::new(Some(1), Some(PageRequest::DEFAULT_LIMIT)));
    }

    #[test]
    fn blank_filters_are_dropped() {
        let query: ListQuery = serde_json::from_value(json!({
            "category": "  ",
            "search": " pottery ",
        }))
        .unwrap();
        let (filter, _) = query.into_parts();
        assert_eq!(filter.category, None);
        assert_eq!(filter.search.as_deref(), Some("pottery"));
    }

    #[test]
    fn limit_above_maximum_is_rejected() {
        let query: ListQuery = serde_json::from_value(json!({ "limit": 500 })).unwrap();
        assert!(query.validate().is_err());
    }
}
