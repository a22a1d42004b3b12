use crate::adapters::redis::RedisClient;
use crate::services::reassembly_service::FragmentBuffer;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Clone, Debug)]
struct Metrics {
    status: Gauge<i64>,
    pending_groups: Gauge<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("sms-submitter");
        Self {
            status: meter
                .i64_gauge("submitter_health_status")
                .with_description("Status of health checks (1 for ok, 0 for error)")
                .build(),
            pending_groups: meter
                .u64_gauge("submitter_reassembly_pending_groups")
                .with_description("Multipart groups waiting for segments at the last readiness probe")
                .build(),
        }
    }

    fn record(&self, component: &'static str, healthy: bool) {
        self.status.record(i64::from(healthy), &[KeyValue::new("component", component)]);
    }
}

/// Readiness view over the things the submitter cannot work without.
#[derive(Clone, Debug)]
pub struct HealthService {
    redis: Arc<RedisClient>,
    buffer: Arc<FragmentBuffer>,
    redis_timeout: Duration,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(redis: Arc<RedisClient>, buffer: Arc<FragmentBuffer>, redis_timeout_ms: u64) -> Self {
        Self { redis, buffer, redis_timeout: Duration::from_millis(redis_timeout_ms), metrics: Metrics::new() }
    }

    /// Pings Redis, which carries both queues and the correlation records.
    ///
    /// # Errors
    /// Returns a string describing the failure if Redis is unreachable or slow.
    pub async fn check_redis(&self) -> Result<(), String> {
        let result = match timeout(self.redis_timeout, self.redis.ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("Redis connection failed: {e:?}")),
            Err(_) => Err(format!("Redis ping exceeded {}ms", self.redis_timeout.as_millis())),
        };
        self.metrics.record("redis", result.is_ok());
        result
    }

    /// Incomplete multipart groups currently held in memory.
    #[must_use]
    pub fn pending_groups(&self) -> usize {
        let pending = self.buffer.pending();
        self.metrics.pending_groups.record(u64::try_from(pending).unwrap_or(u64::MAX), &[]);
        pending
    }
}
