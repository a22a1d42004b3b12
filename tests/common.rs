#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::must_use_candidate, clippy::missing_panics_doc, clippy::new_without_default, clippy::clone_on_ref_ptr, missing_debug_implementations, unreachable_pub)]
use async_trait::async_trait;
use sms_submitter::adapters::carrier::{SmsProvider, TransportError};
use sms_submitter::adapters::correlation::{CorrelationStore, StoreError};
use sms_submitter::adapters::queue::{InboundQueue, ReceiptPublisher};
use sms_submitter::adapters::redis::RedisClient;
use sms_submitter::config::{QueueConfig, ReassemblyConfig, RedisConfig};
use sms_submitter::domain::correlation::CorrelationRecord;
use sms_submitter::domain::receipt::DeliveryReceipt;
use sms_submitter::domain::submission::SubmissionOutcome;
use sms_submitter::services::dispatch_service::SubmissionDispatcher;
use sms_submitter::services::reassembly_service::FragmentBuffer;
use sms_submitter::workers::SubmitWorker;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("sms_submitter=debug".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().init();
    });
}

/// Connects to the Redis named by `SUBMITTER_REDIS_URL`, defaulting to a local instance.
pub async fn redis_client() -> Arc<RedisClient> {
    setup_tracing();
    let config = std::env::var("SUBMITTER_REDIS_URL")
        .map_or_else(|_| RedisConfig::default(), |url| RedisConfig { url });
    RedisClient::new(&config).await.expect("Failed to connect to Redis. Is it running?")
}

/// In-memory stand-in for the inbound list.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    pub pending: Mutex<VecDeque<Vec<u8>>>,
    pub dead_letters: Mutex<Vec<Vec<u8>>>,
}

impl MemoryQueue {
    pub fn push(&self, payload: serde_json::Value) {
        self.pending.lock().unwrap().push_back(serde_json::to_vec(&payload).unwrap());
    }

    pub fn push_raw(&self, payload: &[u8]) {
        self.pending.lock().unwrap().push_back(payload.to_vec());
    }

    /// Decoded `message` fields of everything still queued, head first.
    pub fn queued_texts(&self) -> Vec<String> {
        self.pending
            .lock()
            .unwrap()
            .iter()
            .map(|p| serde_json::from_slice::<serde_json::Value>(p).unwrap()["message"].as_str().unwrap().to_string())
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

#[async_trait]
impl InboundQueue for MemoryQueue {
    async fn pop_batch(&self, limit: usize) -> anyhow::Result<Vec<Vec<u8>>> {
        let mut pending = self.pending.lock().unwrap();
        let take = limit.min(pending.len());
        Ok(pending.drain(..take).collect())
    }

    async fn requeue(&self, payloads: Vec<Vec<u8>>) -> anyhow::Result<()> {
        let mut pending = self.pending.lock().unwrap();
        for payload in payloads.into_iter().rev() {
            pending.push_front(payload);
        }
        Ok(())
    }

    async fn dead_letter(&self, payload: &[u8]) -> anyhow::Result<()> {
        self.dead_letters.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryPublisher {
    pub receipts: Mutex<Vec<DeliveryReceipt>>,
}

#[async_trait]
impl ReceiptPublisher for MemoryPublisher {
    async fn publish_receipt(&self, receipt: &DeliveryReceipt) -> anyhow::Result<()> {
        self.receipts.lock().unwrap().push(receipt.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub records: Mutex<Vec<(String, CorrelationRecord)>>,
}

#[async_trait]
impl CorrelationStore for MemoryStore {
    async fn store(&self, provider_message_id: &str, record: &CorrelationRecord) -> Result<(), StoreError> {
        let key = sms_submitter::adapters::redis::correlation_repo::correlation_key("Orange", provider_message_id);
        self.records.lock().unwrap().push((key, record.clone()));
        Ok(())
    }
}

/// Carrier double that accepts or refuses based on the destination number.
#[derive(Debug, Default)]
pub struct FakeCarrier {
    pub refuse_destinations: Vec<String>,
    pub sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl SmsProvider for FakeCarrier {
    async fn send_sms(
        &self,
        sender_label: &str,
        destination_number: &str,
        text: &str,
    ) -> Result<SubmissionOutcome, TransportError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((sender_label.to_string(), destination_number.to_string(), text.to_string()));

        if self.refuse_destinations.iter().any(|d| d == destination_number) {
            return Ok(SubmissionOutcome::Rejected { reason_code: "400".to_string() });
        }

        let provider_message_id = format!("abc{}", 122 + sent.len());
        let raw_response = format!(
            r#"{{"outboundSMSMessageRequest":{{"resourceURL":"https://carrier/requests/{provider_message_id}"}}}}"#
        );
        Ok(SubmissionOutcome::Accepted { provider_message_id, raw_response })
    }
}

pub struct Harness {
    pub queue: Arc<MemoryQueue>,
    pub publisher: Arc<MemoryPublisher>,
    pub store: Arc<MemoryStore>,
    pub carrier: Arc<FakeCarrier>,
    pub buffer: Arc<FragmentBuffer>,
    pub worker: SubmitWorker,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_carrier(FakeCarrier::default())
    }

    pub fn with_carrier(carrier: FakeCarrier) -> Self {
        setup_tracing();
        let queue_config = QueueConfig { poll_interval_ms: 10, poll_batch_size: 2, ..QueueConfig::default() };

        let queue = Arc::new(MemoryQueue::default());
        let publisher = Arc::new(MemoryPublisher::default());
        let store = Arc::new(MemoryStore::default());
        let carrier = Arc::new(carrier);
        let buffer = Arc::new(FragmentBuffer::new(&ReassemblyConfig::default()));

        let dispatcher =
            SubmissionDispatcher::new(carrier.clone(), store.clone(), publisher.clone(), "201".to_string());
        let worker = SubmitWorker::new(queue.clone(), buffer.clone(), dispatcher, &queue_config);

        Self { queue, publisher, store, carrier, buffer, worker }
    }
}
