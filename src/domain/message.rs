use serde::{Deserialize, Serialize};
use std::ops::Deref;
use thiserror::Error;

/// SMPP carries the segment count in a single octet.
pub const MAX_SEGMENTS: u16 = 255;

/// Multipart linkage carried by every segment of a long message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcatenationInfo {
    #[serde(rename = "ReferenceNumber", alias = "referenceNumber", alias = "reference_number")]
    pub reference_number: u16,
    #[serde(rename = "Total", alias = "total", alias = "totalSegments")]
    pub total_segments: u16,
    #[serde(rename = "SequenceNumber", alias = "sequenceNumber", alias = "sequence_number")]
    pub sequence_number: u16,
}

impl ConcatenationInfo {
    #[must_use]
    pub const fn new(reference_number: u16, total_segments: u16, sequence_number: u16) -> Self {
        Self { reference_number, total_segments, sequence_number }
    }

    /// Whether the sequence number lies in `1..=total_segments` and the total fits an SMPP octet.
    #[must_use]
    pub const fn is_in_range(&self) -> bool {
        self.total_segments >= 1
            && self.total_segments <= MAX_SEGMENTS
            && self.sequence_number >= 1
            && self.sequence_number <= self.total_segments
    }
}

/// One outbound SMS intent as published by the SMPP side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRequest {
    #[serde(rename = "message", alias = "Message")]
    pub text: String,
    #[serde(rename = "number", alias = "Number")]
    pub destination_number: String,
    #[serde(rename = "source", alias = "Source")]
    pub sender_label: String,
    #[serde(rename = "system_id", alias = "systemId", alias = "SystemId", default)]
    pub source_system_id: String,
    #[serde(rename = "messageId", alias = "MessageId", alias = "message_id", default)]
    pub local_message_id: String,
    #[serde(rename = "Concatenation", alias = "concatenation", default, skip_serializing_if = "Option::is_none")]
    pub concatenation: Option<ConcatenationInfo>,
}

#[derive(Error, Debug)]
pub enum MalformedMessage {
    #[error("payload is not a valid submission: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("required field `{0}` is empty")]
    EmptyField(&'static str),
}

impl MessageRequest {
    /// Decodes an inbound queue payload.
    ///
    /// # Errors
    /// Returns `MalformedMessage` if the JSON is invalid or a required field is missing or blank.
    pub fn from_slice(payload: &[u8]) -> Result<Self, MalformedMessage> {
        let request: Self = serde_json::from_slice(payload)?;
        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> Result<(), MalformedMessage> {
        if self.destination_number.trim().is_empty() {
            return Err(MalformedMessage::EmptyField("number"));
        }
        if self.sender_label.trim().is_empty() {
            return Err(MalformedMessage::EmptyField("source"));
        }
        Ok(())
    }

    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        self.concatenation.is_some()
    }
}

/// A message whose every segment has arrived, ready for a single send.
///
/// Only the reassembly buffer produces these, so holding one proves the text is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledMessage(MessageRequest);

impl AssembledMessage {
    pub(crate) const fn new(request: MessageRequest) -> Self {
        Self(request)
    }

    #[must_use]
    pub fn into_request(self) -> MessageRequest {
        self.0
    }
}

impl Deref for AssembledMessage {
    type Target = MessageRequest;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
