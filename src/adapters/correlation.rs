use crate::domain::correlation::CorrelationRecord;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to encode correlation record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("correlation store unavailable: {0}")]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait CorrelationStore: Send + Sync + std::fmt::Debug {
    /// Persists the record under a key derived from the carrier's message id.
    ///
    /// # Errors
    /// Returns `StoreError` if the record could not be written.
    async fn store(&self, provider_message_id: &str, record: &CorrelationRecord) -> Result<(), StoreError>;
}
