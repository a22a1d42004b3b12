use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptState {
    Failed,
}

/// Delivery receipt in the shape the SMPP side consumes.
///
/// Dates use the SMPP receipt layout `YYMMDDhhmm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    #[serde(rename = "DoneDate")]
    pub done_date: String,
    #[serde(rename = "State")]
    pub state: ReceiptState,
    #[serde(rename = "MessageId")]
    pub message_id: String,
    #[serde(rename = "ErrorCode")]
    pub error_code: String,
    #[serde(rename = "SubmitDate")]
    pub submit_date: String,
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "system_id")]
    pub system_id: String,
}
