use crate::domain::receipt::DeliveryReceipt;
use async_trait::async_trait;

/// Source of raw submissions coming from the SMPP side.
#[async_trait]
pub trait InboundQueue: Send + Sync + std::fmt::Debug {
    /// Takes up to `limit` payloads off the queue without blocking. An empty vector means the queue is drained.
    ///
    /// # Errors
    /// Returns an error if the transport fails.
    async fn pop_batch(&self, limit: usize) -> anyhow::Result<Vec<Vec<u8>>>;

    /// Puts popped but unprocessed payloads back at the head of the queue, keeping their order.
    ///
    /// # Errors
    /// Returns an error if the transport fails.
    async fn requeue(&self, payloads: Vec<Vec<u8>>) -> anyhow::Result<()>;

    /// Parks a payload that could not be decoded.
    ///
    /// # Errors
    /// Returns an error if the transport fails.
    async fn dead_letter(&self, payload: &[u8]) -> anyhow::Result<()>;
}

/// Sink for receipts travelling back to the SMPP side.
#[async_trait]
pub trait ReceiptPublisher: Send + Sync + std::fmt::Debug {
    /// # Errors
    /// Returns an error if the receipt could not be encoded or published.
    async fn publish_receipt(&self, receipt: &DeliveryReceipt) -> anyhow::Result<()>;
}
