use crate::adapters::carrier::SmsProvider;
use crate::adapters::correlation::CorrelationStore;
use crate::adapters::queue::ReceiptPublisher;
use crate::domain::correlation::CorrelationRecord;
use crate::domain::message::AssembledMessage;
use crate::domain::submission::SubmissionOutcome;
use crate::services::receipt_service;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Metrics {
    dispatch_total: Counter<u64>,
    store_errors_total: Counter<u64>,
    receipt_errors_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("sms-submitter");
        Self {
            dispatch_total: meter
                .u64_counter("submitter_dispatch_total")
                .with_description("Send attempts against the carrier, by outcome")
                .build(),
            store_errors_total: meter
                .u64_counter("submitter_correlation_store_errors_total")
                .with_description("Accepted submissions whose correlation record could not be written")
                .build(),
            receipt_errors_total: meter
                .u64_counter("submitter_receipt_publish_errors_total")
                .with_description("Failure receipts that could not be published")
                .build(),
        }
    }
}

/// Which terminal path a dispatched message took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchReport {
    Correlated { provider_message_id: String },
    CorrelationFailed { provider_message_id: String },
    ReceiptPublished { message_id: String },
    ReceiptFailed { message_id: String },
}

/// Sends assembled messages and routes the carrier's answer.
///
/// Every call makes exactly one send attempt and then either writes a correlation record
/// or publishes a failure receipt, never both.
#[derive(Clone, Debug)]
pub struct SubmissionDispatcher {
    provider: Arc<dyn SmsProvider>,
    store: Arc<dyn CorrelationStore>,
    publisher: Arc<dyn ReceiptPublisher>,
    failure_error_code: String,
    metrics: Metrics,
}

impl SubmissionDispatcher {
    #[must_use]
    pub fn new(
        provider: Arc<dyn SmsProvider>,
        store: Arc<dyn CorrelationStore>,
        publisher: Arc<dyn ReceiptPublisher>,
        failure_error_code: String,
    ) -> Self {
        Self { provider, store, publisher, failure_error_code, metrics: Metrics::new() }
    }

    #[tracing::instrument(
        skip(self, msg),
        fields(message.id = %msg.local_message_id, destination = %msg.destination_number)
    )]
    pub async fn dispatch(&self, msg: AssembledMessage) -> DispatchReport {
        let result = self.provider.send_sms(&msg.sender_label, &msg.destination_number, &msg.text).await;

        match result {
            Ok(SubmissionOutcome::Accepted { provider_message_id, raw_response }) => {
                self.metrics.dispatch_total.add(1, &[KeyValue::new("outcome", "accepted")]);
                tracing::info!(provider_message_id = %provider_message_id, "Carrier accepted submission");
                self.correlate(msg, provider_message_id, raw_response).await
            }
            Ok(SubmissionOutcome::Rejected { reason_code }) => {
                self.metrics.dispatch_total.add(1, &[KeyValue::new("outcome", "rejected")]);
                tracing::warn!(reason_code = %reason_code, "Carrier rejected submission");
                self.report_failure(&msg).await
            }
            Err(e) => {
                self.metrics.dispatch_total.add(1, &[KeyValue::new("outcome", "transport_error")]);
                tracing::warn!(error = %e, "Submission failed before the carrier answered");
                self.report_failure(&msg).await
            }
        }
    }

    async fn correlate(&self, msg: AssembledMessage, provider_message_id: String, raw_response: String) -> DispatchReport {
        let record =
            CorrelationRecord { original_request: msg.into_request(), provider_message_id, raw_response };

        match self.store.store(&record.provider_message_id, &record).await {
            Ok(()) => DispatchReport::Correlated { provider_message_id: record.provider_message_id },
            Err(e) => {
                // The carrier already has the message; a lost record only costs receipt matching
                tracing::error!(error = %e, provider_message_id = %record.provider_message_id, "Failed to store correlation record");
                self.metrics.store_errors_total.add(1, &[]);
                DispatchReport::CorrelationFailed { provider_message_id: record.provider_message_id }
            }
        }
    }

    async fn report_failure(&self, msg: &AssembledMessage) -> DispatchReport {
        let receipt = receipt_service::synthesize(msg, &self.failure_error_code);
        let message_id = receipt.message_id.clone();

        match self.publisher.publish_receipt(&receipt).await {
            Ok(()) => {
                tracing::debug!(error_code = %receipt.error_code, "Published failure receipt");
                DispatchReport::ReceiptPublished { message_id }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to publish failure receipt");
                self.metrics.receipt_errors_total.add(1, &[]);
                DispatchReport::ReceiptFailed { message_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::carrier::TransportError;
    use crate::adapters::correlation::StoreError;
    use crate::domain::message::MessageRequest;
    use crate::domain::receipt::DeliveryReceipt;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct ScriptedProvider {
        outcome: fn() -> Result<SubmissionOutcome, TransportError>,
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl ScriptedProvider {
        fn new(outcome: fn() -> Result<SubmissionOutcome, TransportError>) -> Arc<Self> {
            Arc::new(Self { outcome, calls: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl SmsProvider for ScriptedProvider {
        async fn send_sms(
            &self,
            sender_label: &str,
            destination_number: &str,
            text: &str,
        ) -> Result<SubmissionOutcome, TransportError> {
            self.calls.lock().unwrap().push((sender_label.into(), destination_number.into(), text.into()));
            (self.outcome)()
        }
    }

    #[derive(Debug, Default)]
    struct RecordingStore {
        fail: bool,
        records: Mutex<Vec<(String, CorrelationRecord)>>,
    }

    #[async_trait]
    impl CorrelationStore for RecordingStore {
        async fn store(&self, provider_message_id: &str, record: &CorrelationRecord) -> Result<(), StoreError> {
            self.records.lock().unwrap().push((provider_message_id.to_string(), record.clone()));
            if self.fail { Err(StoreError::Backend(anyhow::anyhow!("down"))) } else { Ok(()) }
        }
    }

    #[derive(Debug, Default)]
    struct RecordingPublisher {
        receipts: Mutex<Vec<DeliveryReceipt>>,
    }

    #[async_trait]
    impl ReceiptPublisher for RecordingPublisher {
        async fn publish_receipt(&self, receipt: &DeliveryReceipt) -> anyhow::Result<()> {
            self.receipts.lock().unwrap().push(receipt.clone());
            Ok(())
        }
    }

    fn message() -> AssembledMessage {
        AssembledMessage::new(MessageRequest {
            text: "Hello".to_string(),
            destination_number: "2250700000000".to_string(),
            sender_label: "BRAND".to_string(),
            source_system_id: "esme01".to_string(),
            local_message_id: "m-1".to_string(),
            concatenation: None,
        })
    }

    fn accepted() -> Result<SubmissionOutcome, TransportError> {
        Ok(SubmissionOutcome::Accepted { provider_message_id: "abc123".to_string(), raw_response: "{}".to_string() })
    }

    fn rejected() -> Result<SubmissionOutcome, TransportError> {
        Ok(SubmissionOutcome::Rejected { reason_code: "400".to_string() })
    }

    fn timed_out() -> Result<SubmissionOutcome, TransportError> {
        Err(TransportError::Timeout)
    }

    fn dispatcher(
        provider: Arc<ScriptedProvider>,
        store: Arc<RecordingStore>,
        publisher: Arc<RecordingPublisher>,
    ) -> SubmissionDispatcher {
        SubmissionDispatcher::new(provider, store, publisher, "201".to_string())
    }

    #[tokio::test]
    async fn test_accepted_submission_is_correlated() {
        let provider = ScriptedProvider::new(accepted);
        let store = Arc::new(RecordingStore::default());
        let publisher = Arc::new(RecordingPublisher::default());

        let report = dispatcher(Arc::clone(&provider), Arc::clone(&store), Arc::clone(&publisher))
            .dispatch(message())
            .await;

        assert_eq!(report, DispatchReport::Correlated { provider_message_id: "abc123".to_string() });
        assert_eq!(
            provider.calls.lock().unwrap().as_slice(),
            &[("BRAND".to_string(), "2250700000000".to_string(), "Hello".to_string())]
        );

        let records = store.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "abc123");
        assert_eq!(records[0].1.original_request.local_message_id, "m-1");
        assert_eq!(records[0].1.raw_response, "{}");
        assert!(publisher.receipts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_submission_publishes_receipt() {
        let provider = ScriptedProvider::new(rejected);
        let store = Arc::new(RecordingStore::default());
        let publisher = Arc::new(RecordingPublisher::default());

        let report = dispatcher(provider, Arc::clone(&store), Arc::clone(&publisher)).dispatch(message()).await;

        assert_eq!(report, DispatchReport::ReceiptPublished { message_id: "m-1".to_string() });
        assert!(store.records.lock().unwrap().is_empty());

        let receipts = publisher.receipts.lock().unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].message_id, "m-1");
        assert_eq!(receipts[0].error_code, "201");
        assert_eq!(receipts[0].text, "Hello");
        assert_eq!(receipts[0].system_id, "esme01");
    }

    #[tokio::test]
    async fn test_transport_error_is_routed_like_rejection() {
        let provider = ScriptedProvider::new(timed_out);
        let store = Arc::new(RecordingStore::default());
        let publisher = Arc::new(RecordingPublisher::default());

        let report = dispatcher(provider, Arc::clone(&store), Arc::clone(&publisher)).dispatch(message()).await;

        assert_eq!(report, DispatchReport::ReceiptPublished { message_id: "m-1".to_string() });
        assert!(store.records.lock().unwrap().is_empty());
        assert_eq!(publisher.receipts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_does_not_produce_receipt() {
        let provider = ScriptedProvider::new(accepted);
        let store = Arc::new(RecordingStore { fail: true, ..RecordingStore::default() });
        let publisher = Arc::new(RecordingPublisher::default());

        let report = dispatcher(provider, Arc::clone(&store), Arc::clone(&publisher)).dispatch(message()).await;

        assert_eq!(report, DispatchReport::CorrelationFailed { provider_message_id: "abc123".to_string() });
        assert_eq!(store.records.lock().unwrap().len(), 1);
        assert!(publisher.receipts.lock().unwrap().is_empty());
    }
}
