//! SignalR hub client (JSON protocol over WebSocket).
//!
//! Wire format: every message is a JSON record terminated by `0x1E`. After
//! the WebSocket opens, the client sends `{"protocol":"json","version":1}`
//! and the server answers `{}` (or `{"error": …}`). From then on:
//!
//! | type | meaning                                        |
//! |------|------------------------------------------------|
//! | 1    | invocation (`target`, `arguments`, optional id) |
//! | 3    | completion of an invocation we sent            |
//! | 6    | ping / keep-alive                              |
//! | 7    | close (`error`, `allowReconnect`)              |
//!
//! The connection runs in one spawned task. Inbound hub messages become
//! [`ChannelEvent`]s on the receiver returned by [`SignalRChannel::connect`];
//! join/leave go out through the task and wait for their completion.
//!
//! Pushes never wait for room on the event queue: the same reader resolves
//! completions, so a busy consumer must not hold them up. A push that finds
//! the queue full is merged into a per-symbol backlog and delivered once the
//! consumer catches up.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::traits::PushChannel;
use crate::errors::CoreError;
use crate::models::market::GlobalMetricUpdate;
use crate::models::settings::DashboardSettings;
use crate::models::update::{ChannelEvent, PriceUpdate};

pub const RECORD_SEPARATOR: char = '\u{1e}';

const HANDSHAKE_REQUEST: &str = r#"{"protocol":"json","version":1}"#;
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
const EVENT_BUFFER: usize = 1024;
const PROVIDER: &str = "SignalR";

pub const JOIN_METHOD: &str = "JoinAssetGroup";
pub const LEAVE_METHOD: &str = "LeaveAssetGroup";
pub const PRICE_TARGET: &str = "ReceiveMessage";
pub const GLOBAL_METRIC_TARGET: &str = "ReceiveGlobalMetric";

type HubSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── Protocol ────────────────────────────────────────────────────────

/// One decoded hub record.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Invocation {
        target: String,
        arguments: Vec<Value>,
    },
    Completion {
        invocation_id: String,
        error: Option<String>,
    },
    Ping,
    Close {
        error: Option<String>,
        allow_reconnect: bool,
    },
    /// Stream items and other message types this client never asks for.
    Other(u64),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHubMessage {
    #[serde(rename = "type")]
    kind: Option<u64>,
    target: Option<String>,
    #[serde(default)]
    arguments: Vec<Value>,
    invocation_id: Option<String>,
    error: Option<String>,
    #[serde(default)]
    allow_reconnect: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NegotiateResponse {
    connection_token: Option<String>,
    connection_id: Option<String>,
    error: Option<String>,
}

/// Append the record separator to a serialized message.
pub fn encode_record(message: &Value) -> String {
    format!("{message}{RECORD_SEPARATOR}")
}

/// Drain every complete record from `buffer`, leaving a trailing partial
/// record (if any) in place for the next frame.
pub fn split_records(buffer: &mut String) -> Vec<String> {
    let mut records = Vec::new();
    while let Some(pos) = buffer.find(RECORD_SEPARATOR) {
        let record: String = buffer.drain(..pos).collect();
        buffer.drain(..RECORD_SEPARATOR.len_utf8());
        if !record.trim().is_empty() {
            records.push(record);
        }
    }
    records
}

pub fn parse_hub_message(record: &str) -> Result<HubMessage, CoreError> {
    let raw: RawHubMessage = serde_json::from_str(record)?;
    match raw.kind {
        Some(1) => Ok(HubMessage::Invocation {
            target: raw
                .target
                .ok_or_else(|| CoreError::Protocol("invocation without a target".into()))?,
            arguments: raw.arguments,
        }),
        Some(3) => Ok(HubMessage::Completion {
            invocation_id: raw
                .invocation_id
                .ok_or_else(|| CoreError::Protocol("completion without an invocationId".into()))?,
            error: raw.error,
        }),
        Some(6) => Ok(HubMessage::Ping),
        Some(7) => Ok(HubMessage::Close {
            error: raw.error,
            allow_reconnect: raw.allow_reconnect,
        }),
        Some(other) => Ok(HubMessage::Other(other)),
        None => Err(CoreError::Protocol("message without a type".into())),
    }
}

/// The handshake answer is `{}` on success or `{"error": "..."}`.
pub fn parse_handshake_response(record: &str) -> Result<(), CoreError> {
    let value: Value = serde_json::from_str(record)?;
    match value.get("error").and_then(Value::as_str) {
        Some(err) => Err(CoreError::Protocol(format!("handshake rejected: {err}"))),
        None => Ok(()),
    }
}

/// Map a server invocation onto a dashboard event. Unknown targets and
/// payloads without the fields the dashboard keys on yield `None`.
pub fn decode_invocation(target: &str, arguments: &[Value]) -> Option<ChannelEvent> {
    let message = arguments.first()?;
    if target.eq_ignore_ascii_case(PRICE_TARGET) {
        PriceUpdate::from_message(message).map(ChannelEvent::Price)
    } else if target.eq_ignore_ascii_case(GLOBAL_METRIC_TARGET) {
        GlobalMetricUpdate::from_message(message).map(ChannelEvent::GlobalMetric)
    } else {
        None
    }
}

/// `https://host/pricehub` + token → `wss://host/pricehub?id=<token>`.
pub fn websocket_url(hub_url: &str, connection_token: Option<&str>) -> Result<String, CoreError> {
    let mut url = if let Some(rest) = hub_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = hub_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if hub_url.starts_with("ws://") || hub_url.starts_with("wss://") {
        hub_url.to_string()
    } else {
        return Err(CoreError::InvalidConfig(format!(
            "hub url must be http(s) or ws(s), got '{hub_url}'"
        )));
    };

    if let Some(token) = connection_token {
        let encoded = token
            .replace('%', "%25")
            .replace('+', "%2B")
            .replace('/', "%2F")
            .replace('=', "%3D");
        let sep = if url.contains('?') { '&' } else { '?' };
        url.push(sep);
        url.push_str("id=");
        url.push_str(&encoded);
    }
    Ok(url)
}

// ── Channel handle ──────────────────────────────────────────────────

type PendingMap = HashMap<String, oneshot::Sender<Result<(), String>>>;

struct Shared {
    hub_url: String,
    connected: AtomicBool,
    next_invocation: AtomicU64,
    /// Frames queued for the connection task; `None` while disconnected.
    outgoing: Mutex<Option<mpsc::UnboundedSender<String>>>,
    pending: Mutex<PendingMap>,
    shutdown: watch::Sender<bool>,
    invoke_timeout: Duration,
}

impl Shared {
    fn set_outgoing(&self, sender: Option<mpsc::UnboundedSender<String>>) {
        let mut slot = self.outgoing.lock().unwrap_or_else(|e| e.into_inner());
        *slot = sender;
    }

    fn outgoing(&self) -> Option<mpsc::UnboundedSender<String>> {
        self.outgoing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn register(&self, id: String, tx: oneshot::Sender<Result<(), String>>) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.insert(id, tx);
    }

    fn forget(&self, id: &str) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.remove(id);
    }

    fn resolve(&self, id: &str, error: Option<String>) {
        let tx = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.remove(id)
        };
        match tx {
            Some(tx) => {
                let _ = tx.send(error.map_or(Ok(()), Err));
            }
            None => debug!(component = "signalr", event = "completion.unknown", invocation_id = id),
        }
    }

    fn fail_pending(&self, reason: &str) {
        let drained: Vec<_> = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.drain().map(|(_, tx)| tx).collect()
        };
        for tx in drained {
            let _ = tx.send(Err(reason.to_string()));
        }
    }

    fn mark_down(&self, reason: &str) {
        self.connected.store(false, Ordering::SeqCst);
        self.set_outgoing(None);
        self.fail_pending(reason);
    }
}

/// Push channel backed by a SignalR hub.
pub struct SignalRChannel {
    shared: Arc<Shared>,
}

impl SignalRChannel {
    /// Start connecting to `hub_url` in the background.
    ///
    /// Returns immediately; `ChannelEvent::Connected` arrives on the receiver
    /// once the handshake completes. If the very first connection fails the
    /// receiver gets `ChannelEvent::Closed` and no retry happens. Drops after
    /// that are retried with `settings.reconnect_delays_ms`.
    pub fn connect(
        hub_url: impl Into<String>,
        settings: &DashboardSettings,
    ) -> (Self, mpsc::Receiver<ChannelEvent>) {
        let hub_url = hub_url.into().trim_end_matches('/').to_string();
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            hub_url: hub_url.clone(),
            connected: AtomicBool::new(false),
            next_invocation: AtomicU64::new(1),
            outgoing: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
            shutdown,
            invoke_timeout: settings.invoke_timeout(),
        });

        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .unwrap_or_else(|_| Client::new());

        let task = ConnectionTask {
            shared: Arc::clone(&shared),
            http,
            hub_url,
            delays: settings.reconnect_delays(),
            connect_timeout: settings.request_timeout(),
            events: events_tx,
            shutdown: shutdown_rx,
        };
        tokio::spawn(task.run());

        (Self { shared }, events_rx)
    }

    pub fn hub_url(&self) -> &str {
        &self.shared.hub_url
    }

    async fn invoke(&self, method: &str, symbol: &str) -> Result<(), CoreError> {
        let sender = self.shared.outgoing().ok_or(CoreError::ChannelNotConnected)?;

        let id = self
            .shared
            .next_invocation
            .fetch_add(1, Ordering::Relaxed)
            .to_string();
        let (tx, rx) = oneshot::channel();
        self.shared.register(id.clone(), tx);

        let frame = encode_record(&json!({
            "type": 1,
            "invocationId": id,
            "target": method,
            "arguments": [symbol],
        }));
        if sender.send(frame).is_err() {
            self.shared.forget(&id);
            return Err(CoreError::ChannelNotConnected);
        }

        let failure = |message: String| CoreError::Subscription {
            symbol: symbol.to_string(),
            message,
        };
        match tokio::time::timeout(self.shared.invoke_timeout, rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(message))) => Err(failure(format!("{method}: {message}"))),
            Ok(Err(_)) => Err(failure(format!("{method}: connection closed before completion"))),
            Err(_) => {
                self.shared.forget(&id);
                Err(failure(format!("{method}: timed out")))
            }
        }
    }
}

#[async_trait]
impl PushChannel for SignalRChannel {
    fn name(&self) -> &str {
        &self.shared.hub_url
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    async fn join(&self, symbol: &str) -> Result<(), CoreError> {
        self.invoke(JOIN_METHOD, symbol).await
    }

    async fn leave(&self, symbol: &str) -> Result<(), CoreError> {
        self.invoke(LEAVE_METHOD, symbol).await
    }

    async fn disconnect(&self) {
        info!(component = "signalr", event = "disconnect", hub = %self.shared.hub_url);
        self.shared.shutdown.send_replace(true);
        self.shared.mark_down("channel disconnected");
    }
}

// ── Push backlog ────────────────────────────────────────────────────

/// Pushes waiting for room on the event queue, newest state per key.
#[derive(Default)]
struct Backlog {
    pending: HashMap<String, ChannelEvent>,
}

impl Backlog {
    /// Price pushes key on the symbol; the global metric snapshot uses `""`,
    /// which no price push can carry.
    fn key(event: &ChannelEvent) -> Option<String> {
        match event {
            ChannelEvent::Price(update) => Some(update.asset.trim().to_ascii_uppercase()),
            ChannelEvent::GlobalMetric(_) => Some(String::new()),
            _ => None,
        }
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    /// Deliver `event` now if the queue has room, otherwise park it.
    /// Returns `false` once the consumer is gone.
    fn offer(&mut self, events: &mpsc::Sender<ChannelEvent>, event: ChannelEvent) -> bool {
        let key = Self::key(&event);

        // An older push for the same key is still parked; delivering this one
        // first would let the stale one overwrite it later.
        if let Some(queued) = key.as_ref().and_then(|k| self.pending.get_mut(k)) {
            match (queued, event) {
                (ChannelEvent::Price(older), ChannelEvent::Price(newer)) => older.merge_newer(newer),
                (slot, newer) => *slot = newer,
            }
            return true;
        }

        match events.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                match key {
                    Some(key) => {
                        self.pending.insert(key, event);
                        debug!(
                            component = "signalr",
                            event = "push.backlogged",
                            backlog = self.pending.len()
                        );
                    }
                    None => debug!(component = "signalr", event = "push.dropped"),
                }
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    fn take_one(&mut self) -> Option<ChannelEvent> {
        let key = self.pending.keys().next().cloned()?;
        self.pending.remove(&key)
    }
}

// ── Connection task ─────────────────────────────────────────────────

enum SessionEnd {
    Shutdown,
    /// The event receiver was dropped; nobody is listening any more.
    ConsumerGone,
    Dropped {
        reason: String,
        allow_reconnect: bool,
    },
}

struct ConnectionTask {
    shared: Arc<Shared>,
    http: Client,
    hub_url: String,
    delays: Vec<Duration>,
    connect_timeout: Duration,
    events: mpsc::Sender<ChannelEvent>,
    shutdown: watch::Receiver<bool>,
}

impl ConnectionTask {
    async fn run(mut self) {
        let mut ever_connected = false;
        let mut attempt = 0usize;

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let opened = match tokio::time::timeout(self.connect_timeout, self.open()).await {
                Ok(result) => result,
                Err(_) => Err(CoreError::Protocol("connect timed out".into())),
            };

            match opened {
                Ok((socket, leftover)) => {
                    attempt = 0;
                    let (out_tx, out_rx) = mpsc::unbounded_channel();
                    self.shared.set_outgoing(Some(out_tx));
                    self.shared.connected.store(true, Ordering::SeqCst);

                    let (event, label) = if ever_connected {
                        (ChannelEvent::Reconnected, "reconnected")
                    } else {
                        (ChannelEvent::Connected, "connected")
                    };
                    info!(component = "signalr", event = label, hub = %self.hub_url);
                    ever_connected = true;
                    if self.events.send(event).await.is_err() {
                        break;
                    }

                    let end = self.pump(socket, leftover, out_rx).await;
                    self.shared.mark_down("connection lost");

                    match end {
                        SessionEnd::Shutdown | SessionEnd::ConsumerGone => break,
                        SessionEnd::Dropped {
                            reason,
                            allow_reconnect,
                        } => {
                            warn!(
                                component = "signalr",
                                event = "connection.lost",
                                hub = %self.hub_url,
                                reason = %reason
                            );
                            if self
                                .events
                                .send(ChannelEvent::Disconnected { reason })
                                .await
                                .is_err()
                                || !allow_reconnect
                            {
                                break;
                            }
                        }
                    }
                }
                Err(e) if !ever_connected => {
                    error!(
                        component = "signalr",
                        event = "connect.failed",
                        hub = %self.hub_url,
                        error = %e
                    );
                    break;
                }
                Err(e) => {
                    warn!(
                        component = "signalr",
                        event = "reconnect.failed",
                        hub = %self.hub_url,
                        attempt,
                        error = %e
                    );
                }
            }

            let Some(delay) = self.delays.get(attempt).copied() else {
                warn!(component = "signalr", event = "reconnect.exhausted", hub = %self.hub_url);
                break;
            };
            attempt += 1;
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = self.shutdown.changed() => break,
            }
        }

        self.shared.mark_down("channel closed");
        let _ = self.events.send(ChannelEvent::Closed).await;
    }

    async fn negotiate(&self) -> Result<Option<String>, CoreError> {
        let url = format!("{}/negotiate?negotiateVersion=1", self.hub_url);
        let resp = self.http.post(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("negotiate returned HTTP {status}"),
            });
        }
        let body: NegotiateResponse = resp.json().await.map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse negotiate response: {e}"),
        })?;
        if let Some(err) = body.error {
            return Err(CoreError::Protocol(format!("negotiate rejected: {err}")));
        }
        Ok(body.connection_token.or(body.connection_id))
    }

    /// Negotiate, open the socket and complete the handshake. Returns the
    /// socket plus any bytes the server sent after the handshake record.
    async fn open(&self) -> Result<(HubSocket, String), CoreError> {
        let token = self.negotiate().await?;
        let url = websocket_url(&self.hub_url, token.as_deref())?;
        let (mut socket, _response) = connect_async(url.as_str()).await?;

        socket
            .send(Message::Text(
                format!("{HANDSHAKE_REQUEST}{RECORD_SEPARATOR}").into(),
            ))
            .await?;

        let mut buffer = String::new();
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    buffer.push_str(text.as_str());
                    if let Some(pos) = buffer.find(RECORD_SEPARATOR) {
                        let response: String = buffer.drain(..pos).collect();
                        buffer.drain(..RECORD_SEPARATOR.len_utf8());
                        parse_handshake_response(&response)?;
                        return Ok((socket, buffer));
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(CoreError::Protocol(
                        "connection closed during handshake".into(),
                    ))
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn pump(
        &mut self,
        socket: HubSocket,
        mut buffer: String,
        mut outgoing: mpsc::UnboundedReceiver<String>,
    ) -> SessionEnd {
        let (mut write, mut read) = socket.split();
        let mut keep_alive = tokio::time::interval(KEEP_ALIVE_INTERVAL);
        keep_alive.tick().await;
        let mut backlog = Backlog::default();

        if let Some(end) = self.dispatch(&mut buffer, &mut backlog) {
            let _ = write.send(Message::Close(None)).await;
            return end;
        }

        loop {
            tokio::select! {
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        buffer.push_str(text.as_str());
                        if let Some(end) = self.dispatch(&mut buffer, &mut backlog) {
                            let _ = write.send(Message::Close(None)).await;
                            return end;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return SessionEnd::Dropped {
                            reason: frame
                                .map(|f| f.reason.as_str().to_string())
                                .filter(|r| !r.is_empty())
                                .unwrap_or_else(|| "server closed the socket".into()),
                            allow_reconnect: true,
                        };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return SessionEnd::Dropped {
                            reason: e.to_string(),
                            allow_reconnect: true,
                        };
                    }
                    None => {
                        return SessionEnd::Dropped {
                            reason: "socket stream ended".into(),
                            allow_reconnect: true,
                        };
                    }
                },
                permit = self.events.reserve(), if !backlog.is_empty() => match permit {
                    Ok(permit) => {
                        if let Some(event) = backlog.take_one() {
                            permit.send(event);
                        }
                    }
                    Err(_) => return SessionEnd::ConsumerGone,
                },
                frame = outgoing.recv() => {
                    let Some(frame) = frame else {
                        return SessionEnd::Dropped {
                            reason: "outgoing queue closed".into(),
                            allow_reconnect: true,
                        };
                    };
                    if let Err(e) = write.send(Message::Text(frame.into())).await {
                        return SessionEnd::Dropped {
                            reason: e.to_string(),
                            allow_reconnect: true,
                        };
                    }
                }
                _ = keep_alive.tick() => {
                    let ping = encode_record(&json!({ "type": 6 }));
                    if let Err(e) = write.send(Message::Text(ping.into())).await {
                        return SessionEnd::Dropped {
                            reason: e.to_string(),
                            allow_reconnect: true,
                        };
                    }
                }
                _ = self.shutdown.changed() => {
                    if !backlog.is_empty() {
                        debug!(component = "signalr", event = "backlog.discarded", backlog = backlog.len());
                    }
                    let _ = write.send(Message::Close(None)).await;
                    return SessionEnd::Shutdown;
                }
            }
        }
    }

    /// Handle every complete record in `buffer`. Returns `Some` when the
    /// session must end.
    fn dispatch(&self, buffer: &mut String, backlog: &mut Backlog) -> Option<SessionEnd> {
        for record in split_records(buffer) {
            match parse_hub_message(&record) {
                Ok(HubMessage::Invocation { target, arguments }) => {
                    match decode_invocation(&target, &arguments) {
                        Some(event) => {
                            if !backlog.offer(&self.events, event) {
                                return Some(SessionEnd::ConsumerGone);
                            }
                        }
                        None => debug!(
                            component = "signalr",
                            event = "invocation.dropped",
                            target = %target
                        ),
                    }
                }
                Ok(HubMessage::Completion {
                    invocation_id,
                    error,
                }) => self.shared.resolve(&invocation_id, error),
                Ok(HubMessage::Ping) => {}
                Ok(HubMessage::Close {
                    error,
                    allow_reconnect,
                }) => {
                    return Some(SessionEnd::Dropped {
                        reason: error.unwrap_or_else(|| "server closed the hub".into()),
                        allow_reconnect,
                    });
                }
                Ok(HubMessage::Other(kind)) => {
                    debug!(component = "signalr", event = "message.ignored", kind);
                }
                Err(e) => {
                    debug!(component = "signalr", event = "message.malformed", error = %e);
                }
            }
        }
        None
    }
}
