pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod response;
pub mod services;

use anyhow::Context;
use axum::{body::Body, http::{HeaderValue, Request}, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::cache::CacheService;
use crate::config::Config;
use crate::database::Database;
use crate::redis_client::RedisClient;
use crate::services::{
    accounts::Accounts, catalog::WorkshopCatalog, ledger::BookingLedger, tokens::TokenService,
};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub cache: CacheService,
    pub config: Config,
    pub tokens: TokenService,
    pub catalog: WorkshopCatalog,
    pub ledger: BookingLedger,
    pub accounts: Accounts,
}

impl AppState {
    /// Подключает БД (с миграциями) и, если задан, Redis.
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let db = Database::new(&config.database)
            .await
            .context("failed to connect to database")?;
        info!("database connected");

        db.run_migrations()
            .await
            .context("failed to run migrations")?;

        let redis = RedisClient::connect_optional(config.redis.url.as_deref())
            .await
            .context("failed to connect to redis")?;
        let cache = CacheService::new(redis, config.redis.cache_ttl_seconds);
        info!(enabled = cache.is_enabled(), "catalog cache ready");

        Ok(Self::from_parts(config, db, cache))
    }

    pub fn from_parts(config: Config, db: Database, cache: CacheService) -> Arc<Self> {
        let tokens = TokenService::new(&config.jwt);
        Arc::new(Self {
            catalog: WorkshopCatalog::new(db.clone()),
            ledger: BookingLedger::new(db.clone()),
            accounts: Accounts::new(db.clone(), tokens.clone()),
            db,
            cache,
            config,
            tokens,
        })
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.app.cors_origin.as_deref());

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = Uuid::new_v4();
                info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri = %request.uri()
                )
            }),
        )
        .layer(cors)
}

// Без CORS_ORIGIN разрешаем любой источник
fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    let Some(origins) = origins else {
        return base.allow_origin(Any);
    };

    let list: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = o, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if list.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(AllowOrigin::list(list))
    }
}
