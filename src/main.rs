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

use sms_submitter::adapters::carrier::{OrangeSmsProvider, SmsProvider};
use sms_submitter::api::MgmtState;
use sms_submitter::config::Config;
use sms_submitter::{AppBuilder, adapters, telemetry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    sms_submitter::setup_panic_hook();

    let boot_span = tracing::info_span!("boot_submitter");
    let (mgmt_listener, mgmt_app, shutdown_tx, shutdown_rx, workers) = async {
        // Phase 1: Infrastructure Setup (Resources)
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        sms_submitter::spawn_signal_handler(shutdown_tx.clone());

        let redis = adapters::redis::RedisClient::new(&config.redis).await?;
        let provider: Arc<dyn SmsProvider> = Arc::new(OrangeSmsProvider::new(&config.carrier)?);

        // Phase 2: Component Wiring (Pure logic, no side effects)
        let app = AppBuilder::new(config.clone()).with_redis(redis).with_sms_provider(provider).build()?;

        // Phase 3: Runtime Setup (Listeners and Routers)
        let mgmt_app = sms_submitter::api::mgmt_router(MgmtState { health_service: app.health_service });

        let mgmt_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.mgmt_port).parse()?;
        tracing::info!(
            address = %mgmt_addr,
            inbound_queue = %config.queue.inbound_queue,
            dlr_queue = %config.queue.dlr_queue,
            "management server listening"
        );

        let mgmt_listener = tokio::net::TcpListener::bind(mgmt_addr).await?;

        Ok::<
            (
                tokio::net::TcpListener,
                axum::Router,
                watch::Sender<bool>,
                watch::Receiver<bool>,
                sms_submitter::Workers,
            ),
            anyhow::Error,
        >((mgmt_listener, mgmt_app, shutdown_tx, shutdown_rx, app.workers))
    }
    .instrument(boot_span)
    .await?;

    // Phase 4: Start Runtime (Explicit Spawning and Listening)
    let worker_tasks = workers.spawn_all(shutdown_rx.clone());

    let mut mgmt_rx = shutdown_rx.clone();
    let mgmt_server = axum::serve(mgmt_listener, mgmt_app).with_graceful_shutdown(async move {
        let _ = mgmt_rx.wait_for(|&s| s).await;
    });

    if let Err(e) = mgmt_server.await {
        tracing::error!(error = %e, "Server error");
    }

    // Phase 5: Graceful Shutdown Orchestration
    let _ = shutdown_tx.send(true);
    tokio::select! {
        () = async {
            futures::future::join_all(worker_tasks).await;
        } => {
            tracing::info!("Background tasks finished.");
        }
        () = tokio::time::sleep(std::time::Duration::from_secs(config.server.shutdown_timeout_secs)) => {
            tracing::warn!("Timeout waiting for background tasks to finish.");
        }
    }

    telemetry_guard.shutdown();
    Ok(())
}
