// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatdesk serve`: wires storage, the ingestion pipeline, the responder
//! and the sidecar transport into a session manager, starts every
//! auto-start account and runs until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chatdesk_config::ChatdeskConfig;
use chatdesk_config::model::MetricsConfig;
use chatdesk_core::{ChatdeskError, ErrorReporter, EventSink, PluginAdapter, StorageAdapter};
use chatdesk_gemini::GeminiResponder;
use chatdesk_ingest::{IngestPipeline, IngestSettings, PushHub, TracingReporter, register_metrics};
use chatdesk_session::{
    LogObserver, PushObserver, SessionManager, SessionSettings, StoreStatusObserver,
    drain_sessions, install_signal_handler,
};
use chatdesk_storage::{FsBlobStore, SqliteStore};
use chatdesk_whatsapp::SidecarFactory;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn run_serve(config: ChatdeskConfig) -> Result<(), ChatdeskError> {
    init_tracing(&config.service.log_level);
    info!(
        name = %config.service.name,
        accounts = config.accounts.len(),
        "starting chatdesk"
    );

    if config.metrics.enabled {
        install_metrics(&config.metrics)?;
    } else {
        debug!("prometheus metrics disabled by configuration");
    }

    let store = Arc::new(
        SqliteStore::new(config.storage.clone()).with_reopen_window(Duration::from_secs(
            config.ingest.reopen_window_hours * 3600,
        )),
    );
    store.initialize().await?;
    store.sync_accounts(&config.accounts).await?;
    let storage: Arc<dyn StorageAdapter> = store.clone();

    let push = Arc::new(PushHub::default());
    let reporter: Arc<dyn ErrorReporter> = Arc::new(TracingReporter);
    let responder = Arc::new(GeminiResponder::new(&config.gemini)?);
    let factory = Arc::new(SidecarFactory::new(&config.sidecar));

    let pipeline = IngestPipeline::builder(
        Arc::clone(&storage),
        Arc::new(FsBlobStore::new(config.storage.media_dir.clone())),
        push.clone(),
    )
    .responder(responder.clone())
    .reporter(Arc::clone(&reporter))
    .settings(IngestSettings::from(&config))
    .build();
    let sink: Arc<dyn EventSink> = Arc::new(pipeline);

    let manager = SessionManager::builder(factory.clone(), Arc::clone(&storage), sink)
        .settings(SessionSettings::from(&config.session))
        .observer(Arc::new(
            StoreStatusObserver::new(Arc::clone(&storage)).with_reporter(Arc::clone(&reporter)),
        ))
        .observer(Arc::new(PushObserver::new(push.clone())))
        .observer(Arc::new(LogObserver))
        .build();

    let cancel = install_signal_handler();
    spawn_push_log(&push, cancel.clone());

    for account in config.accounts.iter().filter(|a| a.auto_start) {
        let manager = manager.clone();
        let cancel = cancel.clone();
        let account_id = account.id;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = manager.start(account_id) => match result {
                    Ok(_) => info!(account_id, "session started"),
                    Err(e) => warn!(account_id, error = %e, "session failed to start"),
                },
            }
        });
    }

    cancel.cancelled().await;
    info!("shutting down");

    drain_sessions(&manager, SHUTDOWN_TIMEOUT).await;
    if let Err(e) = factory.shutdown().await {
        warn!(error = %e, "transport factory shutdown failed");
    }
    if let Err(e) = responder.shutdown().await {
        warn!(error = %e, "responder shutdown failed");
    }
    store.close().await?;

    info!("chatdesk serve shutdown complete");
    Ok(())
}

/// Installs the global Prometheus recorder with its own HTTP listener.
fn install_metrics(config: &MetricsConfig) -> Result<(), ChatdeskError> {
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        ChatdeskError::Config(format!(
            "invalid metrics.bind_address `{}`: {e}",
            config.bind_address
        ))
    })?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| {
            ChatdeskError::Internal(format!("failed to install Prometheus exporter: {e}"))
        })?;
    register_metrics();
    info!(%addr, "prometheus metrics enabled");
    Ok(())
}

/// Logs push traffic until shutdown. Stands in for a real-time consumer.
fn spawn_push_log(push: &PushHub, cancel: CancellationToken) {
    let mut rx = push.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                message = rx.recv() => match message {
                    Ok(message) => {
                        debug!(channel = %message.channel, event = ?message.event, "push")
                    }
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "push log lagged"),
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    // `chatdesk` prefixes every workspace crate's target.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatdesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
