use crate::adapters::queue::{InboundQueue, ReceiptPublisher};
use crate::adapters::redis::RedisClient;
use crate::config::QueueConfig;
use crate::domain::receipt::DeliveryReceipt;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::sync::Arc;

/// Redis lists standing in for the broker queues shared with the SMPP side.
#[derive(Debug, Clone)]
pub struct RedisQueue {
    redis: Arc<RedisClient>,
    inbound_key: String,
    dlr_key: String,
    dead_letter_key: Option<String>,
}

impl RedisQueue {
    #[must_use]
    pub fn new(redis: Arc<RedisClient>, config: &QueueConfig) -> Self {
        Self {
            redis,
            inbound_key: config.inbound_queue.clone(),
            dlr_key: config.dlr_queue.clone(),
            dead_letter_key: config.dead_letter_queue.clone(),
        }
    }
}

#[async_trait]
impl InboundQueue for RedisQueue {
    async fn pop_batch(&self, limit: usize) -> anyhow::Result<Vec<Vec<u8>>> {
        let mut conn = self.redis.connection();
        // LPOP with a count replies nil, not an empty array, once the list is empty
        let payloads: Option<Vec<Vec<u8>>> =
            redis::cmd("LPOP").arg(&self.inbound_key).arg(limit.max(1)).query_async(&mut conn).await?;
        Ok(payloads.unwrap_or_default())
    }

    async fn requeue(&self, payloads: Vec<Vec<u8>>) -> anyhow::Result<()> {
        if payloads.is_empty() {
            return Ok(());
        }
        // LPUSH prepends each value in turn, so the last one pushed becomes the head
        let mut cmd = redis::cmd("LPUSH");
        cmd.arg(&self.inbound_key);
        for payload in payloads.iter().rev() {
            cmd.arg(payload.as_slice());
        }
        let mut conn = self.redis.connection();
        cmd.query_async::<i64>(&mut conn).await?;
        Ok(())
    }

    async fn dead_letter(&self, payload: &[u8]) -> anyhow::Result<()> {
        if let Some(key) = &self.dead_letter_key {
            let mut conn = self.redis.connection();
            conn.rpush::<_, _, i64>(key, payload).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ReceiptPublisher for RedisQueue {
    async fn publish_receipt(&self, receipt: &DeliveryReceipt) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(receipt)?;
        let mut conn = self.redis.connection();
        conn.rpush::<_, _, i64>(&self.dlr_key, payload).await?;
        Ok(())
    }
}
