use redis::AsyncCommands;
use tracing::debug;

use crate::cache::CacheService;

const EVENTS_KEY: &str = "events:public";
const EVENTS_TTL_SECONDS: u64 = 300;

impl CacheService {
    // Получить закешированную витрину (сериализованный JSON)
    pub async fn get_cached_events(&self) -> Option<String> {
        let mut conn = self.conn();
        match conn.get::<_, Option<String>>(EVENTS_KEY).await {
            Ok(cached) => cached,
            Err(e) => {
                debug!("events cache read failed: {:?}", e);
                None
            }
        }
    }

    pub async fn cache_events(&self, json: &str) {
        let mut conn = self.conn();
        if let Err(e) = conn
            .set_ex::<_, _, ()>(EVENTS_KEY, json, EVENTS_TTL_SECONDS)
            .await
        {
            debug!("events cache write failed: {:?}", e);
        }
    }

    // Любое изменение события сбрасывает витрину
    pub async fn invalidate_events(&self) {
        let mut conn = self.conn();
        if let Err(e) = conn.del::<_, ()>(EVENTS_KEY).await {
            debug!("events cache invalidation failed: {:?}", e);
        }
    }
}
