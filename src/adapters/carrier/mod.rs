use crate::domain::submission::SubmissionOutcome;
use async_trait::async_trait;
use thiserror::Error;

pub mod orange;

pub use orange::OrangeSmsProvider;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("carrier request timed out")]
    Timeout,
    #[error("carrier unreachable: {0}")]
    Connection(String),
    #[error("carrier authorization failed: {0}")]
    Authorization(String),
    #[error("unexpected carrier response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { Self::Timeout } else { Self::Connection(err.to_string()) }
    }
}

#[async_trait]
pub trait SmsProvider: Send + Sync + std::fmt::Debug {
    /// Submits one complete message to the carrier.
    ///
    /// A carrier refusal is an `Ok(SubmissionOutcome::Rejected)`; `Err` is reserved for
    /// attempts that never produced a usable carrier answer.
    ///
    /// # Errors
    /// Returns `TransportError` on network failure, timeout, token failure or an unreadable response.
    async fn send_sms(
        &self,
        sender_label: &str,
        destination_number: &str,
        text: &str,
    ) -> Result<SubmissionOutcome, TransportError>;
}
