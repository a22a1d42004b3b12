use crate::adapters::queue::InboundQueue;
use crate::config::QueueConfig;
use crate::domain::message::MessageRequest;
use crate::error::{AppError, Result};
use crate::services::dispatch_service::{DispatchReport, SubmissionDispatcher};
use crate::services::reassembly_service::FragmentBuffer;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

#[derive(Clone, Debug)]
struct Metrics {
    received_total: Counter<u64>,
    dropped_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("sms-submitter");
        Self {
            received_total: meter
                .u64_counter("submitter_payloads_received_total")
                .with_description("Payloads taken off the inbound queue")
                .build(),
            dropped_total: meter
                .u64_counter("submitter_payloads_dropped_total")
                .with_description("Payloads that never reached the carrier, by reason")
                .build(),
        }
    }
}

/// The single consumer of the inbound queue.
///
/// Payloads are applied to the reassembly buffer strictly in the order they are popped, and
/// each completed message is dispatched before the next payload is looked at.
#[derive(Debug)]
pub struct SubmitWorker {
    queue: Arc<dyn InboundQueue>,
    buffer: Arc<FragmentBuffer>,
    dispatcher: SubmissionDispatcher,
    poll_interval_ms: u64,
    batch_size: usize,
    metrics: Metrics,
}

impl SubmitWorker {
    #[must_use]
    pub fn new(
        queue: Arc<dyn InboundQueue>,
        buffer: Arc<FragmentBuffer>,
        dispatcher: SubmissionDispatcher,
        config: &QueueConfig,
    ) -> Self {
        Self {
            queue,
            buffer,
            dispatcher,
            poll_interval_ms: config.poll_interval_ms,
            batch_size: config.poll_batch_size.max(1),
            metrics: Metrics::new(),
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_millis(self.poll_interval_ms.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let stopping = shutdown.clone();

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    loop {
                        match self.process_batch(&stopping).instrument(tracing::debug_span!("submit_iteration")).await {
                            // A full batch means more is probably waiting
                            Ok(count) if count >= self.batch_size && !*stopping.borrow() => {}
                            Ok(_) => break,
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to read inbound queue");
                                break;
                            }
                        }
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        tracing::info!(pending_groups = self.buffer.pending(), "Submit worker shutting down...");
    }

    /// Pops one batch and runs payloads through the pipeline until the batch is done or
    /// `stopping` flips, in which case the remainder goes back to the head of the queue.
    ///
    /// Returns the number of payloads processed.
    ///
    /// # Errors
    /// Returns `AppError::Queue` if the queue could not be read. Per-payload failures are
    /// logged and counted, not returned.
    pub async fn process_batch(&self, stopping: &watch::Receiver<bool>) -> Result<usize> {
        let mut batch = self.queue.pop_batch(self.batch_size).await.map_err(AppError::Queue)?.into_iter();
        let mut count = 0;

        while let Some(payload) = batch.next() {
            if *stopping.borrow() {
                let unprocessed: Vec<Vec<u8>> = std::iter::once(payload).chain(batch).collect();
                self.give_back(unprocessed).await;
                break;
            }

            count += 1;
            self.metrics.received_total.add(1, &[]);
            match self.handle_payload(&payload).await {
                Ok(_) => {}
                Err(AppError::Malformed(e)) => {
                    tracing::warn!(error = %e, "Rejected malformed submission");
                    self.metrics.dropped_total.add(1, &[KeyValue::new("reason", "malformed")]);
                    if let Err(e) = self.queue.dead_letter(&payload).await {
                        tracing::error!(error = %e, "Failed to dead-letter malformed submission");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Dropped submission");
                    self.metrics.dropped_total.add(1, &[KeyValue::new("reason", "reassembly")]);
                }
            }
        }

        Ok(count)
    }

    async fn give_back(&self, unprocessed: Vec<Vec<u8>>) {
        let returned = unprocessed.len();
        match self.queue.requeue(unprocessed).await {
            Ok(()) => tracing::info!(count = returned, "Returned unprocessed submissions to the queue"),
            Err(e) => {
                tracing::error!(error = %e, count = returned, "Failed to requeue unprocessed submissions");
                self.metrics
                    .dropped_total
                    .add(u64::try_from(returned).unwrap_or(u64::MAX), &[KeyValue::new("reason", "requeue_failed")]);
            }
        }
    }

    /// Decodes one payload, feeds it to the reassembly buffer and dispatches the result when complete.
    ///
    /// Returns `Ok(None)` while a multipart message is still waiting for segments.
    ///
    /// # Errors
    /// Returns `AppError::Malformed` or `AppError::Reassembly` when the payload is refused before sending.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(payload.len = payload.len(), multipart = tracing::field::Empty)
    )]
    pub async fn handle_payload(&self, payload: &[u8]) -> Result<Option<DispatchReport>> {
        let request = MessageRequest::from_slice(payload)?;
        tracing::Span::current().record("multipart", request.is_multipart());

        match self.buffer.ingest(request)? {
            Some(assembled) => Ok(Some(self.dispatcher.dispatch(assembled).await)),
            None => Ok(None),
        }
    }
}
