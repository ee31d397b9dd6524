//! Кеш анонимного чтения каталога в Redis.
//!
//! Источник истины всегда БД: ошибки кеша только логируются, а любая
//! зафиксированная правка мастер-классов или броней сдвигает поколение
//! ключей и чистит `workshops:*`.

use crate::redis_client::RedisClient;

pub mod workshops;

#[derive(Clone)]
pub struct CacheService {
    redis: Option<RedisClient>,
    ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: Option<RedisClient>, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    /// Кеш без Redis: все чтения промахиваются, записи игнорируются.
    pub fn disabled() -> Self {
        Self { redis: None, ttl_seconds: 0 }
    }

    pub fn is_enabled(&self) -> bool {
        self.redis.is_some()
    }
}
