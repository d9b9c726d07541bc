use crate::redis_client::RedisClient;

pub mod events;

// Кеш поверх Redis. Кешируется только публичная витрина событий;
// остатки и цены всегда читаются из БД.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
}

impl CacheService {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    pub(crate) fn conn(&self) -> redis::aio::MultiplexedConnection {
        self.redis.conn.clone()
    }
}
