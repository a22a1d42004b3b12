use crate::domain::message::MessageRequest;
use serde::{Deserialize, Serialize};

/// Persisted link between a carrier message id and the submission that produced it.
///
/// The receipt-ingestion path reads these back when the carrier reports delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    #[serde(rename = "message_data")]
    pub original_request: MessageRequest,
    pub provider_message_id: String,
    #[serde(rename = "response_data")]
    pub raw_response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let record = CorrelationRecord {
            original_request: MessageRequest {
                text: "Hello".to_string(),
                destination_number: "2250700000000".to_string(),
                sender_label: "BRAND".to_string(),
                source_system_id: "esme01".to_string(),
                local_message_id: "m-1".to_string(),
                concatenation: None,
            },
            provider_message_id: "abc123".to_string(),
            raw_response: "{}".to_string(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["message_data"]["message"], "Hello");
        assert_eq!(value["message_data"]["messageId"], "m-1");
        assert_eq!(value["provider_message_id"], "abc123");
        assert_eq!(value["response_data"], "{}");
        assert!(value["message_data"].get("Concatenation").is_none());
    }
}
