#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;
pub mod workers;

use crate::adapters::carrier::SmsProvider;
use crate::adapters::redis::{CorrelationRepository, RedisClient, RedisQueue};
use crate::config::Config;
use crate::services::dispatch_service::SubmissionDispatcher;
use crate::services::health_service::HealthService;
use crate::services::reassembly_service::FragmentBuffer;
use crate::workers::{ReassemblyReaperWorker, SubmitWorker};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Background loops that make up the running service.
#[derive(Debug)]
pub struct Workers {
    submit: SubmitWorker,
    reaper: ReassemblyReaperWorker,
}

impl Workers {
    #[must_use]
    pub fn spawn_all(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(self.submit.run(shutdown.clone()).instrument(tracing::info_span!("submit_worker"))),
            tokio::spawn(self.reaper.run(shutdown).instrument(tracing::info_span!("reassembly_reaper"))),
        ]
    }
}

#[derive(Debug)]
pub struct App {
    pub workers: Workers,
    pub health_service: HealthService,
}

/// Wires adapters, services and workers together without starting anything.
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    redis: Option<Arc<RedisClient>>,
    provider: Option<Arc<dyn SmsProvider>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, redis: None, provider: None }
    }

    #[must_use]
    pub fn with_redis(mut self, redis: Arc<RedisClient>) -> Self {
        self.redis = Some(redis);
        self
    }

    #[must_use]
    pub fn with_sms_provider(mut self, provider: Arc<dyn SmsProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Builds the application graph.
    ///
    /// # Errors
    /// Returns an error if a required collaborator was not supplied.
    pub fn build(self) -> anyhow::Result<App> {
        let config = self.config;
        let redis = self.redis.ok_or_else(|| anyhow::anyhow!("Redis client is required"))?;
        let provider = self.provider.ok_or_else(|| anyhow::anyhow!("SMS provider is required"))?;

        let queue = Arc::new(RedisQueue::new(Arc::clone(&redis), &config.queue));
        let store = Arc::new(CorrelationRepository::new(Arc::clone(&redis), &config.correlation));
        let buffer = Arc::new(FragmentBuffer::new(&config.reassembly));

        let publisher = Arc::clone(&queue);
        let dispatcher = SubmissionDispatcher::new(provider, store, publisher, config.receipt.error_code.clone());
        let submit = SubmitWorker::new(queue, Arc::clone(&buffer), dispatcher, &config.queue);
        let health_service = HealthService::new(redis, Arc::clone(&buffer), config.server.health_redis_timeout_ms);
        let reaper = ReassemblyReaperWorker::new(buffer, config.reassembly.reap_interval_secs);

        Ok(App { workers: Workers { submit, reaper }, health_service })
    }
}

/// Routes panics through tracing before the default hook runs.
pub fn setup_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "Process panicked");
        default_hook(info);
    }));
}

/// Flips the shutdown flag on Ctrl-C or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });
}
