use crate::config::RedisConfig;
use std::sync::Arc;

pub mod correlation_repo;
pub mod queue_repo;

pub use correlation_repo::CorrelationRepository;
pub use queue_repo::RedisQueue;

#[derive(Debug)]
pub struct RedisClient {
    connection: redis::aio::ConnectionManager,
}

impl RedisClient {
    /// Connects to Redis.
    ///
    /// # Errors
    /// Returns an error if the connection fails.
    pub async fn new(config: &RedisConfig) -> anyhow::Result<Arc<Self>> {
        let client = redis::Client::open(config.url.as_str())?;
        let connection = client.get_connection_manager().await?;
        Ok(Arc::new(Self { connection }))
    }

    /// Returns a handle on the shared, self-reconnecting connection.
    #[must_use]
    pub fn connection(&self) -> redis::aio::ConnectionManager {
        self.connection.clone()
    }

    /// Pings the Redis server to check connectivity.
    ///
    /// # Errors
    /// Returns an error if the ping fails.
    pub async fn ping(&self) -> anyhow::Result<()> {
        let mut conn = self.connection();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}
