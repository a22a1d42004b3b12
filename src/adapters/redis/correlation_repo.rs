use crate::adapters::correlation::{CorrelationStore, StoreError};
use crate::adapters::redis::RedisClient;
use crate::config::CorrelationConfig;
use crate::domain::correlation::CorrelationRecord;
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CorrelationRepository {
    redis: Arc<RedisClient>,
    key_prefix: String,
    ttl_secs: Option<u64>,
    retry: ExponentialBuilder,
}

impl CorrelationRepository {
    #[must_use]
    pub fn new(redis: Arc<RedisClient>, config: &CorrelationConfig) -> Self {
        let retry = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(config.min_backoff_ms))
            .with_max_delay(Duration::from_millis(config.max_backoff_ms))
            .with_max_times(config.max_retries);

        Self { redis, key_prefix: config.key_prefix.clone(), ttl_secs: config.record_ttl_secs, retry }
    }

    #[must_use]
    pub fn key_for(&self, provider_message_id: &str) -> String {
        correlation_key(&self.key_prefix, provider_message_id)
    }
}

#[must_use]
pub fn correlation_key(prefix: &str, provider_message_id: &str) -> String {
    format!("{prefix}:{provider_message_id}")
}

#[async_trait]
impl CorrelationStore for CorrelationRepository {
    #[tracing::instrument(level = "debug", skip(self, record), err)]
    async fn store(&self, provider_message_id: &str, record: &CorrelationRecord) -> Result<(), StoreError> {
        let key = self.key_for(provider_message_id);
        let value = serde_json::to_string(record)?;

        (|| async {
            let mut conn = self.redis.connection();
            match self.ttl_secs {
                Some(ttl) => conn.set_ex::<_, _, ()>(&key, &value, ttl).await,
                None => conn.set::<_, _, ()>(&key, &value).await,
            }
        })
        .retry(&self.retry)
        .notify(|e, delay| {
            tracing::warn!(error = %e, retry_in = ?delay, "Correlation write failed, retrying");
        })
        .await
        .map_err(|e| StoreError::Backend(e.into()))
    }
}
