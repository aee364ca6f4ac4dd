//! WebSocket bridge to the WELLDONE extension
//!
//! Lets native hosts talk to the extension through a relay that forwards
//! `request`/`on` calls over a WebSocket. Frames are JSON:
//!
//! - out: `{"id", "chain", "method", "params"}`
//! - in:  `{"id", "result"}` or `{"id", "error": {"code", "message"}}`
//! - in:  `{"event", "data"}` for extension events
//!
//! A request is only written to the socket while its caller is still
//! waiting. When a connection fails or drops, every waiting request is
//! rejected and its queued frame is discarded, so a request reported as
//! failed never reaches the extension later.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::{
    EventStream, InjectedProvider, ProviderError, ProviderEvent, ProviderEventKind, ProviderRequest,
};

/// Configuration for the bridge connection
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// URL to connect to
    pub url: String,
    /// Ping interval
    pub ping_interval: Duration,
    /// Reconnect delay on disconnect
    pub reconnect_delay: Duration,
    /// Maximum reconnection attempts
    pub max_reconnect_attempts: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:9229".to_string(),
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: 10,
        }
    }
}

impl BridgeConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, ProviderError>>>>>;

/// Serialized request waiting for the connection task
#[derive(Debug)]
struct OutgoingFrame {
    id: u64,
    text: String,
}

/// Injected provider reached over a WebSocket relay
pub struct BridgeProvider {
    outgoing: mpsc::Sender<OutgoingFrame>,
    pending: Pending,
    events: broadcast::Sender<ProviderEvent>,
    next_id: AtomicU64,
    dispatcher: JoinHandle<()>,
}

impl Drop for BridgeProvider {
    fn drop(&mut self) {
        // Releases the dispatcher's event sender so subscriber streams end
        self.dispatcher.abort();
    }
}

#[derive(Debug, Serialize)]
struct RequestFrame<'a> {
    id: u64,
    chain: &'a str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IncomingFrame {
    Event {
        event: String,
        #[serde(default)]
        data: Value,
    },
    Response {
        id: u64,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<ErrorFrame>,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorFrame {
    #[serde(default)]
    code: i64,
    message: String,
}

impl BridgeProvider {
    /// Connect to the relay and start dispatching frames
    pub async fn connect(config: BridgeConfig) -> Result<Self, ProviderError> {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (outgoing, mut incoming) = spawn_websocket(config, pending.clone());
        let (events, _) = broadcast::channel(64);

        let dispatch_pending = pending.clone();
        let dispatch_events = events.clone();
        let dispatcher = tokio::spawn(async move {
            while let Some(text) = incoming.recv().await {
                route_frame(&text, &dispatch_pending, &dispatch_events).await;
            }
            fail_pending(&dispatch_pending, ProviderError::Closed).await;
        });

        Ok(Self {
            outgoing,
            pending,
            events,
            next_id: AtomicU64::new(1),
            dispatcher,
        })
    }
}

#[async_trait]
impl InjectedProvider for BridgeProvider {
    async fn request(&self, chain: &str, request: ProviderRequest) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let text = serde_json::to_string(&RequestFrame {
            id,
            chain,
            method: &request.method,
            params: request.params.as_ref(),
        })?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        debug!("bridge request {} {}", id, request.method);
        if self.outgoing.send(OutgoingFrame { id, text }).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(ProviderError::Closed);
        }

        rx.await.map_err(|_| ProviderError::Closed)?
    }

    fn subscribe(&self, kind: ProviderEventKind) -> EventStream {
        let mut receiver = self.events.subscribe();
        Box::pin(stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) if event.kind == kind => yield event,
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("{} subscriber lagged, skipped {} events", kind, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

async fn route_frame(text: &str, pending: &Pending, events: &broadcast::Sender<ProviderEvent>) {
    let frame = match serde_json::from_str::<IncomingFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("Ignoring unparseable bridge frame: {}", e);
            return;
        }
    };

    match frame {
        IncomingFrame::Event { event, data } => match ProviderEventKind::from_name(&event) {
            Some(kind) => {
                // No subscribers yet is fine
                let _ = events.send(ProviderEvent { kind, data });
            }
            None => debug!("Ignoring unknown event {}", event),
        },
        IncomingFrame::Response { id, result, error } => {
            let Some(waiter) = pending.lock().await.remove(&id) else {
                warn!("Response for unknown request {}", id);
                return;
            };

            let outcome = match error {
                Some(e) => Err(ProviderError::Rejected {
                    code: e.code,
                    message: e.message,
                }),
                None => Ok(result.unwrap_or(Value::Null)),
            };
            let _ = waiter.send(outcome);
        }
    }
}

async fn fail_pending(pending: &Pending, err: ProviderError) {
    for (_, waiter) in pending.lock().await.drain() {
        let _ = waiter.send(Err(err.clone()));
    }
}

/// Reject one request whose frame will not be sent
async fn reject_frame(pending: &Pending, frame: OutgoingFrame, err: ProviderError) {
    debug!("dropping bridge request {}: {}", frame.id, err);
    if let Some(waiter) = pending.lock().await.remove(&frame.id) {
        let _ = waiter.send(Err(err));
    }
}

/// Reject every waiting request and discard the frames still queued
async fn drop_queued(
    outgoing_rx: &mut mpsc::Receiver<OutgoingFrame>,
    pending: &Pending,
    err: ProviderError,
) {
    fail_pending(pending, err).await;
    while let Ok(frame) = outgoing_rx.try_recv() {
        debug!("discarding queued bridge request {}", frame.id);
    }
}

/// Whether the caller of `id` is still waiting for a reply
async fn is_pending(pending: &Pending, id: u64) -> bool {
    pending.lock().await.contains_key(&id)
}

/// Spawn the connection task, returning the outgoing sender and incoming receiver.
///
/// The task stops once the outgoing sender is dropped.
fn spawn_websocket(
    config: BridgeConfig,
    pending: Pending,
) -> (mpsc::Sender<OutgoingFrame>, mpsc::Receiver<String>) {
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<OutgoingFrame>(100);
    let (incoming_tx, incoming_rx) = mpsc::channel::<String>(100);

    tokio::spawn(async move {
        let mut reconnect_attempts = 0;

        loop {
            let lost = match connect_async(&config.url).await {
                Ok((ws_stream, _response)) => {
                    reconnect_attempts = 0;
                    info!("Bridge connected to {}", config.url);

                    let (mut write, mut read) = ws_stream.split();
                    let mut ping = tokio::time::interval(config.ping_interval);

                    loop {
                        tokio::select! {
                            msg = outgoing_rx.recv() => {
                                let Some(frame) = msg else {
                                    debug!("Bridge provider dropped, closing connection");
                                    let _ = write.send(Message::Close(None)).await;
                                    return;
                                };

                                // Already rejected while a previous connection failed
                                if !is_pending(&pending, frame.id).await {
                                    debug!("skipping abandoned bridge request {}", frame.id);
                                    continue;
                                }

                                if let Err(e) = write.send(Message::Text(frame.text)).await {
                                    error!("Failed to send bridge frame: {}", e);
                                    break ProviderError::Transport(e.to_string());
                                }
                            }

                            incoming = read.next() => {
                                match incoming {
                                    None => {
                                        info!("Bridge stream ended");
                                        break ProviderError::Closed;
                                    }
                                    Some(Ok(Message::Text(text))) => {
                                        if incoming_tx.send(text).await.is_err() {
                                            warn!("Dispatcher dropped, closing bridge");
                                            return;
                                        }
                                    }
                                    Some(Ok(Message::Ping(data))) => {
                                        if let Err(e) = write.send(Message::Pong(data)).await {
                                            break ProviderError::Transport(e.to_string());
                                        }
                                    }
                                    Some(Ok(Message::Close(_))) => {
                                        info!("Bridge closed by relay");
                                        break ProviderError::Closed;
                                    }
                                    Some(Ok(_)) => {}
                                    Some(Err(e)) => {
                                        error!("Bridge error: {}", e);
                                        break ProviderError::Transport(e.to_string());
                                    }
                                }
                            }

                            _ = ping.tick() => {
                                if let Err(e) = write.send(Message::Ping(vec![])).await {
                                    break ProviderError::Transport(e.to_string());
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("Bridge connection failed: {}", e);
                    ProviderError::Transport(e.to_string())
                }
            };

            drop_queued(&mut outgoing_rx, &pending, lost).await;

            reconnect_attempts += 1;
            if reconnect_attempts >= config.max_reconnect_attempts {
                error!("Max reconnection attempts reached, giving up");
                break;
            }

            warn!(
                "Reconnecting in {:?} (attempt {}/{})",
                config.reconnect_delay, reconnect_attempts, config.max_reconnect_attempts
            );

            // Nothing is queued for a connection that does not exist yet
            let delay = tokio::time::sleep(config.reconnect_delay);
            tokio::pin!(delay);
            loop {
                tokio::select! {
                    _ = &mut delay => break,
                    msg = outgoing_rx.recv() => match msg {
                        Some(frame) => {
                            reject_frame(
                                &pending,
                                frame,
                                ProviderError::Transport("bridge disconnected".to_string()),
                            )
                            .await
                        }
                        None => return,
                    },
                }
            }
        }
    });

    (outgoing_tx, incoming_rx)
}
