// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session manager: starts, tracks, reconnects, and removes per-account
//! transport sessions.
//!
//! Each started account gets one driver task. The driver owns the current
//! transport's signal stream, feeds lifecycle signals through the state
//! machine, forwards content events to the [`EventSink`] once ready, and
//! rebuilds the transport from scratch after a fixed delay whenever the
//! connection drops. The driver lives until [`SessionManager::remove`] or
//! [`SessionManager::shutdown`].

use std::sync::Arc;
use std::time::Duration;

use chatdesk_config::model::SessionConfig;
use chatdesk_core::{
    Account, AccountId, ChatdeskError, EventSink, KeyedLocks, SessionHandle, StorageAdapter,
    TransportConnection, TransportFactory, TransportSignal,
};
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::observer::SessionObserver;
use crate::registry::SessionRegistry;
use crate::state::{LifecycleInput, SessionMachine, SessionState, Transition};

/// Timing knobs for the manager.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub reconnect_delay: Duration,
    pub start_timeout: Duration,
    pub sync_unread_on_ready: bool,
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
            start_timeout: Duration::from_secs(config.start_timeout_secs),
            sync_unread_on_ready: config.sync_unread_on_ready,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

/// What a pending `start` call is waiting on.
#[derive(Debug)]
enum StartStatus {
    Pending,
    Ready(SessionHandle),
    AuthFailed(String),
    Stopped,
}

struct Driver {
    cancel: CancellationToken,
    status: watch::Receiver<StartStatus>,
    task: JoinHandle<()>,
}

struct Inner {
    factory: Arc<dyn TransportFactory>,
    store: Arc<dyn StorageAdapter>,
    sink: Arc<dyn EventSink>,
    registry: SessionRegistry,
    observers: Arc<[Arc<dyn SessionObserver>]>,
    settings: SessionSettings,
    drivers: DashMap<AccountId, Driver>,
    start_locks: KeyedLocks<AccountId>,
    shutdown: CancellationToken,
}

/// Builder for [`SessionManager`].
pub struct SessionManagerBuilder {
    factory: Arc<dyn TransportFactory>,
    store: Arc<dyn StorageAdapter>,
    sink: Arc<dyn EventSink>,
    observers: Vec<Arc<dyn SessionObserver>>,
    settings: SessionSettings,
}

impl SessionManagerBuilder {
    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Adds an observer notified on every lifecycle transition, in
    /// registration order.
    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> SessionManager {
        SessionManager {
            inner: Arc::new(Inner {
                factory: self.factory,
                store: self.store,
                sink: self.sink,
                registry: SessionRegistry::new(),
                observers: self.observers.into(),
                settings: self.settings,
                drivers: DashMap::new(),
                start_locks: KeyedLocks::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }
}

/// Owns every account session in the process.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn builder(
        factory: Arc<dyn TransportFactory>,
        store: Arc<dyn StorageAdapter>,
        sink: Arc<dyn EventSink>,
    ) -> SessionManagerBuilder {
        SessionManagerBuilder {
            factory,
            store,
            sink,
            observers: Vec::new(),
            settings: SessionSettings::default(),
        }
    }

    /// Starts the session for an account and waits until it is ready.
    ///
    /// Idempotent: an already-ready session is returned as is, and a start
    /// that is still in progress (QR pending, reconnecting) is joined rather
    /// than duplicated.
    pub async fn start(&self, account_id: AccountId) -> Result<SessionHandle, ChatdeskError> {
        if let Ok(handle) = self.inner.registry.get(account_id) {
            return Ok(handle);
        }

        let status = {
            let _guard = self.inner.start_locks.lock(account_id).await;
            if self.inner.shutdown.is_cancelled() {
                return Err(ChatdeskError::SessionClosed {
                    account_id,
                    reason: "session manager is shutting down".into(),
                });
            }
            if let Ok(handle) = self.inner.registry.get(account_id) {
                return Ok(handle);
            }
            let existing = self
                .inner
                .drivers
                .get(&account_id)
                .map(|driver| driver.status.clone());
            match existing {
                Some(status) => {
                    debug!(account_id, "joining session start already in progress");
                    status
                }
                None => self.spawn_driver(account_id).await?,
            }
        };

        self.wait_ready(account_id, status).await
    }

    /// The live session for an account.
    pub fn get(&self, account_id: AccountId) -> Result<SessionHandle, ChatdeskError> {
        self.inner.registry.get(account_id)
    }

    /// Whether a driver exists for the account, ready or not.
    pub fn is_running(&self, account_id: AccountId) -> bool {
        self.inner.drivers.contains_key(&account_id)
    }

    /// Accounts with a ready session.
    pub fn ready_accounts(&self) -> Vec<AccountId> {
        self.inner.registry.account_ids()
    }

    /// Stops and forgets an account's session. Best-effort: transport
    /// teardown failures are logged, never returned.
    pub async fn remove(&self, account_id: AccountId) {
        let _guard = self.inner.start_locks.lock(account_id).await;
        let driver = self.inner.drivers.remove(&account_id).map(|(_, d)| d);
        match driver {
            Some(driver) => {
                driver.cancel.cancel();
                if let Err(e) = driver.task.await {
                    warn!(account_id, error = %e, "session driver ended abnormally");
                }
                info!(account_id, "session removed");
            }
            None => debug!(account_id, "no session to remove"),
        }
        self.inner.registry.deregister(account_id);
    }

    /// Stops every session and rejects further starts.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let ids: Vec<AccountId> = self.inner.drivers.iter().map(|e| *e.key()).collect();
        info!(count = ids.len(), "stopping sessions");
        for id in ids {
            self.remove(id).await;
        }
    }

    async fn spawn_driver(
        &self,
        account_id: AccountId,
    ) -> Result<watch::Receiver<StartStatus>, ChatdeskError> {
        let account = self
            .inner
            .store
            .get_account(account_id)
            .await?
            .ok_or_else(|| ChatdeskError::Config(format!("unknown account {account_id}")))?;

        let connection = self.inner.factory.connect(&account).await?;

        let (status_tx, status_rx) = watch::channel(StartStatus::Pending);
        let cancel = self.inner.shutdown.child_token();
        let task = tokio::spawn(drive(
            Arc::clone(&self.inner),
            account,
            connection,
            status_tx,
            cancel.clone(),
        ));
        self.inner.drivers.insert(
            account_id,
            Driver {
                cancel,
                status: status_rx.clone(),
                task,
            },
        );
        info!(account_id, "session starting");
        Ok(status_rx)
    }

    async fn wait_ready(
        &self,
        account_id: AccountId,
        mut status: watch::Receiver<StartStatus>,
    ) -> Result<SessionHandle, ChatdeskError> {
        let timeout = self.inner.settings.start_timeout;
        let waited = tokio::time::timeout(
            timeout,
            status.wait_for(|s| !matches!(s, StartStatus::Pending)),
        )
        .await;

        let closed = |reason: &str| ChatdeskError::SessionClosed {
            account_id,
            reason: reason.to_string(),
        };
        match waited {
            Err(_) => Err(ChatdeskError::Timeout { duration: timeout }),
            Ok(Err(_)) => Err(closed("session driver exited")),
            Ok(Ok(current)) => match &*current {
                StartStatus::Ready(handle) => Ok(handle.clone()),
                StartStatus::AuthFailed(reason) => Err(ChatdeskError::SessionAuthFailure {
                    account_id,
                    reason: reason.clone(),
                }),
                StartStatus::Stopped | StartStatus::Pending => Err(closed("session stopped")),
            },
        }
    }
}

/// The state machine plus the observers it notifies.
struct Lifecycle {
    machine: SessionMachine,
    observers: Arc<[Arc<dyn SessionObserver>]>,
}

impl Lifecycle {
    fn state(&self) -> SessionState {
        self.machine.state()
    }

    async fn apply(&mut self, input: LifecycleInput) -> Option<Transition> {
        let current = self.machine.state();
        let Some(transition) = self.machine.transition(input) else {
            debug!(state = %current, "lifecycle input ignored");
            return None;
        };
        let snapshot = self.machine.snapshot();
        for observer in self.observers.iter() {
            observer.on_transition(&snapshot, &transition).await;
        }
        Some(transition)
    }
}

enum ConnectionEnd {
    Cancelled,
    Dropped,
}

async fn drive(
    inner: Arc<Inner>,
    account: Account,
    first: TransportConnection,
    status: watch::Sender<StartStatus>,
    cancel: CancellationToken,
) {
    let account_id = account.id;
    let mut lifecycle = Lifecycle {
        machine: SessionMachine::new(account_id),
        observers: Arc::clone(&inner.observers),
    };
    let mut next = Some(first);

    loop {
        let connection = match next.take() {
            Some(connection) => connection,
            None => {
                let attempt = tokio::select! {
                    _ = cancel.cancelled() => break,
                    attempt = inner.factory.connect(&account) => attempt,
                };
                match attempt {
                    Ok(connection) => connection,
                    Err(e) => {
                        warn!(account_id, error = %e, "reconnect attempt failed");
                        lifecycle
                            .apply(LifecycleInput::Disconnected(e.to_string()))
                            .await;
                        if !wait_reconnect(&inner, &mut lifecycle, &status, &cancel).await {
                            break;
                        }
                        continue;
                    }
                }
            }
        };

        match run_connection(&inner, &mut lifecycle, connection, &status, &cancel).await {
            ConnectionEnd::Cancelled => {
                lifecycle
                    .apply(LifecycleInput::Disconnected("session removed".into()))
                    .await;
                break;
            }
            ConnectionEnd::Dropped => {
                if !wait_reconnect(&inner, &mut lifecycle, &status, &cancel).await {
                    break;
                }
            }
        }
    }

    status.send_replace(StartStatus::Stopped);
    debug!(account_id, "session driver exited");
}

/// Sleeps the fixed reconnect delay. Returns `false` if cancelled first.
async fn wait_reconnect(
    inner: &Inner,
    lifecycle: &mut Lifecycle,
    status: &watch::Sender<StartStatus>,
    cancel: &CancellationToken,
) -> bool {
    let delay = inner.settings.reconnect_delay;
    info!(
        account_id = lifecycle.machine.snapshot().account_id,
        delay_secs = delay.as_secs_f64(),
        "scheduling reconnect"
    );
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => {
            lifecycle.apply(LifecycleInput::Reconnect).await;
            status.send_replace(StartStatus::Pending);
            true
        }
    }
}

async fn run_connection(
    inner: &Arc<Inner>,
    lifecycle: &mut Lifecycle,
    connection: TransportConnection,
    status: &watch::Sender<StartStatus>,
    cancel: &CancellationToken,
) -> ConnectionEnd {
    let TransportConnection {
        transport,
        mut signals,
    } = connection;
    let account_id = lifecycle.machine.snapshot().account_id;
    let handle = SessionHandle {
        account_id,
        transport: Arc::clone(&transport),
    };

    let end = loop {
        let signal = tokio::select! {
            _ = cancel.cancelled() => break ConnectionEnd::Cancelled,
            signal = signals.recv() => signal,
        };
        let signal =
            signal.unwrap_or_else(|| TransportSignal::Disconnected("signal stream closed".into()));

        match signal {
            TransportSignal::Qr(qr) => {
                info!(account_id, "qr code issued, waiting for scan");
                lifecycle.apply(LifecycleInput::Qr(qr)).await;
            }
            TransportSignal::Authenticated => {
                lifecycle.apply(LifecycleInput::Authenticated).await;
            }
            TransportSignal::Ready => {
                if lifecycle.apply(LifecycleInput::Ready).await.is_some() {
                    inner.registry.register(handle.clone());
                    status.send_replace(StartStatus::Ready(handle.clone()));
                    info!(account_id, "session ready");
                    if inner.settings.sync_unread_on_ready {
                        tokio::spawn(sync_unread(Arc::clone(&inner.sink), handle.clone()));
                    }
                }
            }
            TransportSignal::AuthFailure(reason) => {
                warn!(account_id, %reason, "session authentication failed");
                inner.registry.deregister(account_id);
                lifecycle
                    .apply(LifecycleInput::AuthFailure(reason.clone()))
                    .await;
                status.send_replace(StartStatus::AuthFailed(reason));
                break ConnectionEnd::Dropped;
            }
            TransportSignal::Disconnected(reason) => {
                warn!(account_id, %reason, "session disconnected");
                inner.registry.deregister(account_id);
                lifecycle
                    .apply(LifecycleInput::Disconnected(reason))
                    .await;
                status.send_replace(StartStatus::Pending);
                break ConnectionEnd::Dropped;
            }
            TransportSignal::Message(event) => {
                if lifecycle.state() != SessionState::Ready {
                    debug!(
                        account_id,
                        event_id = %event.id,
                        state = %lifecycle.state(),
                        "message before ready dropped"
                    );
                    continue;
                }
                let sink = Arc::clone(&inner.sink);
                let session = handle.clone();
                tokio::spawn(async move { sink.on_message(&session, event).await });
            }
            TransportSignal::Ack { event_id, level } => {
                if lifecycle.state() != SessionState::Ready {
                    continue;
                }
                let sink = Arc::clone(&inner.sink);
                let session = handle.clone();
                tokio::spawn(async move { sink.on_ack(&session, event_id, level).await });
            }
        }
    };

    inner.registry.deregister(account_id);
    if let Err(e) = transport.destroy().await {
        debug!(account_id, error = %e, "transport teardown failed");
    }
    end
}

/// Replays unread chats through the sink, oldest chat order as reported by
/// the transport, then marks each chat seen.
async fn sync_unread(sink: Arc<dyn EventSink>, session: SessionHandle) {
    let account_id = session.account_id;
    let chats = match session.transport.get_chats().await {
        Ok(chats) => chats,
        Err(e) => {
            warn!(account_id, error = %e, "unread sync: listing chats failed");
            return;
        }
    };

    let mut replayed = 0usize;
    for chat in chats.into_iter().filter(|c| c.unread_count > 0) {
        let events = match session
            .transport
            .fetch_unread(&chat.id, chat.unread_count)
            .await
        {
            Ok(events) => events,
            Err(e) => {
                warn!(account_id, chat = %chat.id, error = %e, "unread sync: fetch failed");
                continue;
            }
        };
        for event in events {
            sink.on_message(&session, event).await;
            replayed += 1;
        }
        if let Err(e) = session.transport.mark_seen(&chat.id).await {
            debug!(account_id, chat = %chat.id, error = %e, "unread sync: mark seen failed");
        }
    }
    info!(account_id, replayed, "unread sync finished");
}
