use redis::{AsyncCommands, RedisResult};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::CacheService;
use crate::models::PageRequest;
use crate::services::catalog::WorkshopFilter;

const PREFIX: &str = "workshops:";
// вне PREFIX, чтобы очистка по шаблону его не задевала
const GENERATION_KEY: &str = "catalog:generation";

pub fn listing_key(generation: u64, filter: &WorkshopFilter, page: PageRequest) -> String {
    fn part<T: ToString>(value: &Option<T>) -> String {
        value.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    format!(
        "{PREFIX}{generation}:list:{:?}:{}:{}:{}:{}:{}:{}",
        filter.status,
        part(&filter.category),
        part(&filter.search),
        part(&filter.date_from),
        part(&filter.date_to),
        page.page,
        page.limit,
    )
}

pub fn detail_key(generation: u64, workshop_id: i64) -> String {
    format!("{PREFIX}{generation}:detail:{workshop_id}")
}

impl CacheService {
    /// Текущее поколение ключей каталога. `None`, если кеш выключен или
    /// Redis недоступен: тогда кеш не читается и не пишется.
    ///
    /// Читать его нужно до запроса в БД. Ответ, собранный до сброса,
    /// ляжет под старое поколение, которое больше никто не читает.
    pub async fn workshops_generation(&self) -> Option<u64> {
        let redis = self.redis.as_ref()?;
        let mut conn = redis.conn.clone();

        let generation: RedisResult<Option<u64>> = conn.get(GENERATION_KEY).await;
        match generation {
            Ok(generation) => Some(generation.unwrap_or(0)),
            Err(e) => {
                warn!(error = %e, "cache generation read failed");
                None
            }
        }
    }

    /// Закешированный JSON по ключу; при ошибке Redis считается промахом.
    pub async fn get_json(&self, key: &str) -> Option<Value> {
        let redis = self.redis.as_ref()?;
        let mut conn = redis.conn.clone();

        let raw: Option<String> = match conn.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "cache read failed");
                return None;
            }
        };

        raw.and_then(|data| match serde_json::from_str(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "cache entry is not valid json");
                None
            }
        })
    }

    pub async fn put_json(&self, key: &str, value: &Value) {
        let Some(redis) = self.redis.as_ref() else {
            return;
        };
        let mut conn = redis.conn.clone();

        let result: RedisResult<()> = conn.set_ex(key, value.to_string(), self.ttl_seconds).await;
        if let Err(e) = result {
            warn!(key, error = %e, "cache write failed");
        }
    }

    /// Сбрасывает все закешированные страницы и карточки мастер-классов:
    /// сдвигает поколение и удаляет накопленные записи.
    pub async fn invalidate_workshops(&self) {
        let Some(redis) = self.redis.as_ref() else {
            return;
        };
        let mut conn = redis.conn.clone();

        let bumped: RedisResult<u64> = conn.incr(GENERATION_KEY, 1).await;
        match bumped {
            Ok(generation) => debug!(generation, "workshop cache generation bumped"),
            Err(e) => warn!(error = %e, "cache generation bump failed"),
        }

        // старые поколения иначе дожили бы до TTL
        let keys: Vec<String> = match conn.keys(format!("{PREFIX}*")).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "cache invalidation failed");
                return;
            }
        };
        if keys.is_empty() {
            return;
        }

        let result: RedisResult<()> = conn.del(&keys).await;
        match result {
            Ok(()) => debug!(count = keys.len(), "workshop cache invalidated"),
            Err(e) => warn!(error = %e, "cache invalidation failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkshopStatus;
    use chrono::NaiveDate;

    #[test]
    fn listing_keys_differ_by_filters_and_page() {
        let base = WorkshopFilter::default();
        let first = listing_key(0, &base, PageRequest::new(Some(1), None));
        let second = listing_key(0, &base, PageRequest::new(Some(2), None));
        assert_ne!(first, second);

        let filtered = WorkshopFilter {
            category: Some("Crafts".into()),
            date_from: NaiveDate::from_ymd_opt(2030, 1, 1),
            ..WorkshopFilter::default()
        };
        assert_ne!(first, listing_key(0, &filtered, PageRequest::new(Some(1), None)));

        let cancelled = WorkshopFilter { status: WorkshopStatus::Cancelled, ..WorkshopFilter::default() };
        assert_ne!(first, listing_key(0, &cancelled, PageRequest::new(Some(1), None)));
    }

    #[test]
    fn new_generation_never_reads_old_entries() {
        let filter = WorkshopFilter::default();
        let page = PageRequest::new(None, None);
        assert_ne!(listing_key(3, &filter, page), listing_key(4, &filter, page));
        assert_ne!(detail_key(3, 5), detail_key(4, 5));
    }

    #[test]
    fn entries_share_prefix_but_generation_counter_does_not() {
        assert!(detail_key(1, 5).starts_with(PREFIX));
        assert!(listing_key(1, &WorkshopFilter::default(), PageRequest::new(None, None)).starts_with(PREFIX));
        assert!(!GENERATION_KEY.starts_with(PREFIX));
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = CacheService::disabled();
        assert_eq!(cache.workshops_generation().await, None);
        cache.put_json(&detail_key(0, 1), &serde_json::json!({"id": 1})).await;
        assert!(cache.get_json(&detail_key(0, 1)).await.is_none());
        cache.invalidate_workshops().await;
    }
}
