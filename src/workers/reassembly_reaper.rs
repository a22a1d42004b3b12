use crate::services::reassembly_service::FragmentBuffer;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct ReassemblyReaperWorker {
    buffer: Arc<FragmentBuffer>,
    interval_secs: u64,
}

impl ReassemblyReaperWorker {
    #[must_use]
    pub const fn new(buffer: Arc<FragmentBuffer>, interval_secs: u64) -> Self {
        Self { buffer, interval_secs }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => self.sweep(),
                _ = shutdown.changed() => break,
            }
        }
        tracing::info!(pending = self.buffer.pending(), "Reassembly reaper shutting down...");
    }

    #[tracing::instrument(level = "debug", skip(self), fields(expired = tracing::field::Empty))]
    fn sweep(&self) {
        let expired = self.buffer.reap(Instant::now());
        if expired > 0 {
            tracing::info!(count = expired, pending = self.buffer.pending(), "Expired incomplete multipart groups");
            tracing::Span::current().record("expired", expired);
        }
    }
}
