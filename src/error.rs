use crate::domain::message::MalformedMessage;
use crate::services::reassembly_service::ReassemblyError;
use thiserror::Error;

/// Reasons a queue payload never reached the carrier.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed submission: {0}")]
    Malformed(#[from] MalformedMessage),
    #[error("Segment refused: {0}")]
    Reassembly(#[from] ReassemblyError),
    #[error("Queue error: {0}")]
    Queue(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
