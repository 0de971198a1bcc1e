// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket client for the messaging-client sidecar.
//!
//! One socket per account. A writer task drains outbound frames, a reader
//! task resolves pending requests by `request_id` and forwards events as
//! [`TransportSignal`]s.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatdesk_config::model::SidecarConfig;
use chatdesk_core::{
    Account, AccountId, ChatInfo, ChatdeskError, ContactProfile, MediaPayload, SendOptions,
    Transport, TransportConnection, TransportEvent, TransportSignal,
};
use dashmap::DashMap;
use futures::{SinkExt, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{Call, InboundFrame, RequestFrame, WireMedia};

const SIGNAL_CAPACITY: usize = 256;
const OUTBOUND_CAPACITY: usize = 64;
const CLOSED_REASON: &str = "sidecar connection closed";

type PendingMap = Arc<DashMap<String, oneshot::Sender<Result<Value, String>>>>;

/// Connection settings resolved from `[sidecar]`.
#[derive(Debug, Clone)]
pub struct SidecarSettings {
    pub url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl From<&SidecarConfig> for SidecarSettings {
    fn from(config: &SidecarConfig) -> Self {
        Self {
            url: config.url.clone(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// A messaging client living in the sidecar, addressed over one socket.
pub struct SidecarTransport {
    account_id: AccountId,
    outbound: mpsc::Sender<String>,
    pending: PendingMap,
    request_timeout: Duration,
    cancel: CancellationToken,
}

impl SidecarTransport {
    /// Opens the socket, spawns the I/O tasks and asks the sidecar to boot
    /// the client for `account`. Lifecycle events (QR, ready, ...) follow on
    /// the returned signal channel.
    pub async fn connect(
        settings: &SidecarSettings,
        account: &Account,
    ) -> Result<TransportConnection, ChatdeskError> {
        let (ws, _) = timeout(settings.connect_timeout, connect_async(settings.url.as_str()))
            .await
            .map_err(|_| ChatdeskError::Timeout {
                duration: settings.connect_timeout,
            })?
            .map_err(|e| ChatdeskError::Transport {
                message: format!("failed to connect to sidecar at {}: {e}", settings.url),
                source: Some(Box::new(e)),
            })?;
        let (mut sink, stream) = ws.split();

        let (outbound, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
        let (signals_tx, signals) = mpsc::channel(SIGNAL_CAPACITY);
        let pending: PendingMap = Arc::new(DashMap::new());
        let cancel = CancellationToken::new();

        let writer_cancel = cancel.clone();
        let account_id = account.id;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = writer_cancel.cancelled() => break,
                    frame = outbound_rx.recv() => {
                        let Some(frame) = frame else { break };
                        if let Err(e) = sink.send(Message::Text(frame.into())).await {
                            warn!(account_id, error = %e, "sidecar write failed");
                            break;
                        }
                    }
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(read_loop(
            account.id,
            stream,
            pending.clone(),
            signals_tx,
            cancel.clone(),
        ));

        let transport = Arc::new(Self {
            account_id: account.id,
            outbound,
            pending,
            request_timeout: settings.request_timeout,
            cancel,
        });
        transport
            .request(Call::Start {
                account_id: account.id,
                name: account.name.clone(),
            })
            .await?;
        info!(account_id = account.id, url = %settings.url, "sidecar client started");

        Ok(TransportConnection { transport, signals })
    }

    fn closed(&self) -> ChatdeskError {
        ChatdeskError::SessionClosed {
            account_id: self.account_id,
            reason: CLOSED_REASON.to_string(),
        }
    }

    /// Sends one request and waits for the matching response.
    async fn request(&self, call: Call) -> Result<Value, ChatdeskError> {
        if self.cancel.is_cancelled() {
            return Err(self.closed());
        }
        let request_id = Uuid::new_v4().to_string();
        let frame = serde_json::to_string(&RequestFrame::new(&request_id, &call))
            .map_err(|e| ChatdeskError::Internal(format!("failed to encode request: {e}")))?;

        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id.clone(), tx);
        if self.outbound.send(frame).await.is_err() {
            self.pending.remove(&request_id);
            return Err(self.closed());
        }
        debug!(account_id = self.account_id, method = call.name(), %request_id, "sidecar request");

        match timeout(self.request_timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(message))) => Err(ChatdeskError::transport(format!(
                "{} failed: {message}",
                call.name()
            ))),
            Ok(Err(_)) => Err(self.closed()),
            Err(_) => {
                self.pending.remove(&request_id);
                Err(ChatdeskError::Timeout {
                    duration: self.request_timeout,
                })
            }
        }
    }

    async fn call<T: DeserializeOwned>(&self, call: Call) -> Result<T, ChatdeskError> {
        let method = call.name();
        let value = self.request(call).await?;
        serde_json::from_value(value).map_err(|e| ChatdeskError::Transport {
            message: format!("unexpected {method} result: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

impl Drop for SidecarTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl Transport for SidecarTransport {
    async fn send(
        &self,
        to: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<TransportEvent, ChatdeskError> {
        self.call(Call::Send {
            to: to.to_string(),
            text: text.to_string(),
            automated: options.automated,
            quoted_id: options.quoted_id,
        })
        .await
    }

    async fn contact(&self, id: &str) -> Result<ContactProfile, ChatdeskError> {
        self.call(Call::Contact { id: id.to_string() }).await
    }

    async fn download_media(
        &self,
        event: &TransportEvent,
    ) -> Result<Option<MediaPayload>, ChatdeskError> {
        let media: Option<WireMedia> = self
            .call(Call::DownloadMedia {
                message_id: event.id.clone(),
            })
            .await?;
        media.map(WireMedia::decode).transpose()
    }

    async fn get_chats(&self) -> Result<Vec<ChatInfo>, ChatdeskError> {
        self.call(Call::GetChats).await
    }

    async fn fetch_unread(
        &self,
        chat_id: &str,
        limit: u32,
    ) -> Result<Vec<TransportEvent>, ChatdeskError> {
        self.call(Call::FetchUnread {
            chat_id: chat_id.to_string(),
            limit,
        })
        .await
    }

    async fn mark_seen(&self, chat_id: &str) -> Result<(), ChatdeskError> {
        self.request(Call::MarkSeen {
            chat_id: chat_id.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn destroy(&self) -> Result<(), ChatdeskError> {
        if self.cancel.is_cancelled() {
            return Err(self.closed());
        }
        if let Err(e) = self.request(Call::Destroy).await {
            debug!(account_id = self.account_id, error = %e, "sidecar destroy not acknowledged");
        }
        self.cancel.cancel();
        info!(account_id = self.account_id, "sidecar client destroyed");
        Ok(())
    }
}

async fn read_loop<S>(
    account_id: AccountId,
    mut stream: S,
    pending: PendingMap,
    signals: mpsc::Sender<TransportSignal>,
    cancel: CancellationToken,
) where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let reason = loop {
        tokio::select! {
            _ = cancel.cancelled() => break None,
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    dispatch(account_id, text.as_str(), &pending, &signals).await;
                }
                Some(Ok(Message::Close(_))) | None => break Some(CLOSED_REASON.to_string()),
                Some(Ok(_)) => {}
                Some(Err(e)) => break Some(format!("sidecar connection error: {e}")),
            },
        }
    };

    // Dropping the senders fails every in-flight request.
    pending.clear();
    cancel.cancel();
    if let Some(reason) = reason {
        warn!(account_id, %reason, "sidecar connection lost");
        let _ = signals.send(TransportSignal::Disconnected(reason)).await;
    }
}

async fn dispatch(
    account_id: AccountId,
    text: &str,
    pending: &PendingMap,
    signals: &mpsc::Sender<TransportSignal>,
) {
    match serde_json::from_str::<InboundFrame>(text) {
        Ok(InboundFrame::Response {
            request_id,
            result,
            error,
        }) => match pending.remove(&request_id) {
            Some((_, tx)) => {
                let _ = tx.send(error.map_or(Ok(result), Err));
            }
            None => debug!(account_id, %request_id, "response for unknown request"),
        },
        Ok(InboundFrame::Event(event)) => {
            if signals.send(event.into()).await.is_err() {
                debug!(account_id, "signal receiver dropped");
            }
        }
        Err(e) => warn!(account_id, error = %e, "unparseable sidecar frame"),
    }
}
