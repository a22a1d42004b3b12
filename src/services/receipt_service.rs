use crate::domain::message::MessageRequest;
use crate::domain::receipt::{DeliveryReceipt, ReceiptState};
use time::OffsetDateTime;
use time::macros::format_description;

/// Builds the failure receipt for a submission the carrier never accepted, stamped with the current time.
#[must_use]
pub fn synthesize(msg: &MessageRequest, error_code: &str) -> DeliveryReceipt {
    synthesize_at(msg, error_code, OffsetDateTime::now_utc())
}

/// The submission time is not carried upstream, so both dates are the synthesis time.
#[must_use]
pub fn synthesize_at(msg: &MessageRequest, error_code: &str, now: OffsetDateTime) -> DeliveryReceipt {
    let stamp = smpp_date(now);
    DeliveryReceipt {
        done_date: stamp.clone(),
        state: ReceiptState::Failed,
        message_id: msg.local_message_id.clone(),
        error_code: error_code.to_string(),
        submit_date: stamp,
        text: msg.text.clone(),
        system_id: msg.source_system_id.clone(),
    }
}

fn smpp_date(at: OffsetDateTime) -> String {
    at.format(format_description!("[year repr:last_two][month][day][hour][minute]"))
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn request() -> MessageRequest {
        MessageRequest {
            text: "Hello".to_string(),
            destination_number: "2250700000000".to_string(),
            sender_label: "BRAND".to_string(),
            source_system_id: "esme01".to_string(),
            local_message_id: "m-1".to_string(),
            concatenation: None,
        }
    }

    #[test]
    fn test_receipt_fields() {
        let receipt = synthesize_at(&request(), "201", datetime!(2026-03-04 05:06:07 UTC));

        assert_eq!(receipt.state, ReceiptState::Failed);
        assert_eq!(receipt.message_id, "m-1");
        assert_eq!(receipt.error_code, "201");
        assert_eq!(receipt.text, "Hello");
        assert_eq!(receipt.system_id, "esme01");
        assert_eq!(receipt.submit_date, "2603040506");
        assert_eq!(receipt.done_date, receipt.submit_date);
    }

    #[test]
    fn test_non_timestamp_fields_are_deterministic() {
        let msg = request();
        let mut first = synthesize(&msg, "201");
        let mut second = synthesize_at(&msg, "201", datetime!(2001-01-01 00:00 UTC));

        first.done_date.clear();
        first.submit_date.clear();
        second.done_date.clear();
        second.submit_date.clear();
        assert_eq!(first, second);
    }

    #[test]
    fn test_wire_shape() {
        let receipt = synthesize_at(&request(), "201", datetime!(2026-03-04 05:06 UTC));
        let value = serde_json::to_value(&receipt).unwrap();

        assert_eq!(value["State"], "Failed");
        assert_eq!(value["MessageId"], "m-1");
        assert_eq!(value["ErrorCode"], "201");
        assert_eq!(value["Text"], "Hello");
        assert_eq!(value["system_id"], "esme01");
        assert_eq!(value["DoneDate"], "2603040506");
        assert_eq!(value["SubmitDate"], "2603040506");
    }
}
