use crate::config::ReassemblyConfig;
use crate::domain::message::{AssembledMessage, ConcatenationInfo, MessageRequest};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Clone, Debug)]
struct Metrics {
    fragments_total: Counter<u64>,
    assembled_total: Counter<u64>,
    rejected_total: Counter<u64>,
    expired_total: Counter<u64>,
    discarded_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("sms-submitter");
        Self {
            fragments_total: meter
                .u64_counter("submitter_fragments_total")
                .with_description("Multipart segments accepted into the reassembly buffer")
                .build(),
            assembled_total: meter
                .u64_counter("submitter_messages_assembled_total")
                .with_description("Multipart groups completed and handed off for sending")
                .build(),
            rejected_total: meter
                .u64_counter("submitter_reassembly_rejected_total")
                .with_description("Segments refused by the reassembly buffer")
                .build(),
            expired_total: meter
                .u64_counter("submitter_reassembly_expired_total")
                .with_description("Incomplete groups dropped after their time-to-live")
                .build(),
            discarded_total: meter
                .u64_counter("submitter_reassembly_discarded_total")
                .with_description("Incomplete groups dropped because of reference reuse or buffer pressure")
                .build(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyError {
    #[error("segment {sequence} of {total} is out of range (reference {reference})")]
    OutOfRange { reference: u16, sequence: u16, total: u16 },
    #[error("segment {sequence} of reference {reference} was already received")]
    DuplicateSegment { reference: u16, sequence: u16 },
}

/// Reference numbers are only unique per sender session, so groups are keyed by
/// the submitting system and destination as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    system_id: String,
    destination: String,
    reference: u16,
}

impl GroupKey {
    fn of(request: &MessageRequest, reference: u16) -> Self {
        Self {
            system_id: request.source_system_id.clone(),
            destination: request.destination_number.clone(),
            reference,
        }
    }
}

enum Placement {
    Fresh,
    Duplicate,
    Conflict,
}

#[derive(Debug)]
struct ReassemblyEntry {
    template: MessageRequest,
    /// Received texts keyed by sequence number; sized by what arrived, not by the claimed total.
    segments: BTreeMap<u16, String>,
    total: u16,
    latest: ConcatenationInfo,
    created_at: Instant,
}

impl ReassemblyEntry {
    fn new(mut first: MessageRequest, info: ConcatenationInfo, now: Instant) -> Self {
        let mut segments = BTreeMap::new();
        segments.insert(info.sequence_number, std::mem::take(&mut first.text));
        Self { template: first, segments, total: info.total_segments, latest: info, created_at: now }
    }

    fn place(&self, text: &str, info: ConcatenationInfo) -> Placement {
        if info.total_segments != self.total {
            return Placement::Conflict;
        }
        match self.segments.get(&info.sequence_number) {
            None => Placement::Fresh,
            Some(existing) if existing == text => Placement::Duplicate,
            Some(_) => Placement::Conflict,
        }
    }

    fn fill(&mut self, text: String, info: ConcatenationInfo) {
        self.segments.insert(info.sequence_number, text);
        self.latest = info;
    }

    fn received(&self) -> usize {
        self.segments.len()
    }

    fn is_complete(&self) -> bool {
        self.received() == usize::from(self.total)
    }

    fn into_assembled(self) -> AssembledMessage {
        let mut request = self.template;
        request.text = self.segments.into_values().collect();
        request.concatenation = Some(self.latest);
        AssembledMessage::new(request)
    }
}

/// Holds partially received multipart messages until every segment is in.
///
/// Completion requires one distinct segment per sequence number, so neither a lost
/// middle segment nor a redelivered one can release a truncated text.
#[derive(Debug)]
pub struct FragmentBuffer {
    groups: DashMap<GroupKey, ReassemblyEntry>,
    ttl: Duration,
    max_pending: usize,
    metrics: Metrics,
}

impl FragmentBuffer {
    #[must_use]
    pub fn new(config: &ReassemblyConfig) -> Self {
        Self {
            groups: DashMap::new(),
            ttl: Duration::from_secs(config.ttl_secs),
            max_pending: config.max_pending_groups.max(1),
            metrics: Metrics::new(),
        }
    }

    /// Feeds one inbound message into the buffer.
    ///
    /// Single-segment messages pass straight through. For multipart messages this returns
    /// the assembled message once the last missing segment arrives, and `None` before that.
    ///
    /// # Errors
    /// Returns `ReassemblyError` for segments with impossible metadata or for redelivered segments.
    #[tracing::instrument(
        level = "debug",
        skip(self, msg),
        fields(message.id = %msg.local_message_id, reference = tracing::field::Empty)
    )]
    pub fn ingest(&self, msg: MessageRequest) -> Result<Option<AssembledMessage>, ReassemblyError> {
        let Some(info) = msg.concatenation else {
            return Ok(Some(AssembledMessage::new(msg)));
        };
        tracing::Span::current().record("reference", info.reference_number);

        if !info.is_in_range() {
            self.metrics.rejected_total.add(1, &[KeyValue::new("reason", "out_of_range")]);
            return Err(ReassemblyError::OutOfRange {
                reference: info.reference_number,
                sequence: info.sequence_number,
                total: info.total_segments,
            });
        }

        self.metrics.fragments_total.add(1, &[]);
        let key = GroupKey::of(&msg, info.reference_number);
        self.make_room(&key);
        let now = Instant::now();

        let completed = match self.groups.entry(key) {
            Entry::Vacant(vacant) => {
                let entry = ReassemblyEntry::new(msg, info, now);
                if entry.is_complete() {
                    Some(entry)
                } else {
                    vacant.insert(entry);
                    None
                }
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                match entry.place(&msg.text, info) {
                    Placement::Fresh => entry.fill(msg.text, info),
                    Placement::Duplicate => {
                        self.metrics.rejected_total.add(1, &[KeyValue::new("reason", "duplicate")]);
                        return Err(ReassemblyError::DuplicateSegment {
                            reference: info.reference_number,
                            sequence: info.sequence_number,
                        });
                    }
                    Placement::Conflict => {
                        tracing::warn!(
                            received = entry.received(),
                            expected = entry.total,
                            "Reference reused before its group completed, restarting group"
                        );
                        self.metrics.discarded_total.add(1, &[KeyValue::new("reason", "reference_reused")]);
                        *entry = ReassemblyEntry::new(msg, info, now);
                    }
                }

                let complete = entry.is_complete();
                if complete { Some(occupied.remove()) } else { None }
            }
        };

        Ok(completed.map(|entry| {
            self.metrics.assembled_total.add(1, &[]);
            tracing::debug!(segments = entry.total, "Multipart message assembled");
            entry.into_assembled()
        }))
    }

    /// Evicts the oldest group when a new one would exceed the bound.
    fn make_room(&self, key: &GroupKey) {
        if self.groups.len() < self.max_pending || self.groups.contains_key(key) {
            return;
        }

        let oldest = self.groups.iter().min_by_key(|entry| entry.created_at).map(|entry| entry.key().clone());
        if let Some(oldest) = oldest
            && self.groups.remove(&oldest).is_some()
        {
            tracing::warn!(reference = oldest.reference, "Reassembly buffer full, evicted oldest group");
            self.metrics.discarded_total.add(1, &[KeyValue::new("reason", "capacity")]);
        }
    }

    /// Drops groups older than the configured time-to-live and returns how many were dropped.
    pub fn reap(&self, now: Instant) -> usize {
        let mut expired = 0usize;
        self.groups.retain(|key, entry| {
            let alive = now.saturating_duration_since(entry.created_at) < self.ttl;
            if !alive {
                expired += 1;
                tracing::warn!(
                    reference = key.reference,
                    received = entry.received(),
                    expected = entry.total,
                    "Dropping incomplete multipart group"
                );
            }
            alive
        });

        if expired > 0 {
            self.metrics.expired_total.add(u64::try_from(expired).unwrap_or(u64::MAX), &[]);
        }
        expired
    }

    /// Number of groups still waiting for segments.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.groups.len()
    }
}
