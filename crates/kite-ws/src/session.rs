//! Feed session state machine.
//!
//! Owns one WebSocket connection to the broker. Drives the subscribe ->
//! mode control sequence, feeds incoming frames through the decoder into
//! the snapshot store, and forwards deltas to the alert engine in wire
//! order.
//!
//! Reconnect uses a fixed interval rather than exponential backoff: the
//! server enforces per-user rate limits that tolerate a steady retry but
//! penalize bursts. After the attempt cap the session gives up and signals
//! escalation; it never references the rotation coordinator directly.

use crate::control::{mode_message, subscribe_message, unsubscribe_message, SubscriptionMode};
use crate::error::{SessionError, SessionResult};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use kite_core::{Credentials, Token};
use kite_feed::{DecodeStats, DecodedFrame, SnapshotDelta, SnapshotStore, TickDecoder};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex as TokioMutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint, without credentials (e.g., "wss://ws.kite.trade").
    pub ws_url: String,
    /// Streaming mode requested after subscribing.
    pub mode: SubscriptionMode,
    /// Transport open timeout.
    pub connect_timeout: Duration,
    /// Fixed delay between reconnect attempts.
    pub reconnect_interval: Duration,
    /// Consecutive failed attempts before giving up and escalating.
    pub max_reconnect_attempts: u32,
    /// Pause between the subscribe frame and the mode frame.
    pub mode_set_delay: Duration,
    /// Grace period for the first data frame after subscribing.
    pub confirm_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ws_url: "wss://ws.kite.trade".to_string(),
            mode: SubscriptionMode::Full,
            connect_timeout: Duration::from_secs(10),
            reconnect_interval: Duration::from_secs(5),
            max_reconnect_attempts: 10,
            mode_set_delay: Duration::from_secs(1),
            confirm_grace: Duration::from_secs(60),
        }
    }
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    OpenUnsubscribed,
    OpenSubscribed,
    Closing,
    Backoff,
}

/// How one connection attempt ended.
enum ConnectOutcome {
    /// `stop()` was requested; do not reconnect.
    Stopped,
}

/// Runtime subscription changes, executed by the connection task.
enum Command {
    Subscribe(Vec<Token>),
    Unsubscribe(Vec<Token>),
}

/// WebSocket feed session.
pub struct FeedSession {
    config: SessionConfig,
    credentials: Arc<Credentials>,
    store: Arc<SnapshotStore>,
    decoder: TickDecoder,
    delta_tx: mpsc::Sender<SnapshotDelta>,
    /// Signalled when the retry cap is hit; the rotator listens.
    escalation: Arc<Notify>,
    /// Current subscription set, in registry order.
    tokens: RwLock<Vec<Token>>,
    state: RwLock<SessionState>,
    subscribed_tx: watch::Sender<bool>,
    subscribed_rx: watch::Receiver<bool>,
    command_tx: mpsc::Sender<Command>,
    command_rx: TokioMutex<mpsc::Receiver<Command>>,
    cancel: Mutex<CancellationToken>,
    task: Mutex<Option<JoinHandle<()>>>,
    confirmed: AtomicBool,
    transport_opened: AtomicBool,
    reconnects: AtomicU32,
    last_heartbeat: RwLock<Option<DateTime<Utc>>>,
}

impl FeedSession {
    pub fn new(
        config: SessionConfig,
        credentials: Arc<Credentials>,
        store: Arc<SnapshotStore>,
        delta_tx: mpsc::Sender<SnapshotDelta>,
        escalation: Arc<Notify>,
    ) -> Self {
        let (subscribed_tx, subscribed_rx) = watch::channel(false);
        let (command_tx, command_rx) = mpsc::channel(64);
        Self {
            config,
            credentials,
            store,
            decoder: TickDecoder::new(),
            delta_tx,
            escalation,
            tokens: RwLock::new(Vec::new()),
            state: RwLock::new(SessionState::Idle),
            subscribed_tx,
            subscribed_rx,
            command_tx,
            command_rx: TokioMutex::new(command_rx),
            cancel: Mutex::new(CancellationToken::new()),
            task: Mutex::new(None),
            confirmed: AtomicBool::new(false),
            transport_opened: AtomicBool::new(false),
            reconnects: AtomicU32::new(0),
            last_heartbeat: RwLock::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Watch channel that flips true on entering `OpenSubscribed` and false
    /// on disconnect. The view publisher keys its first fire off this.
    pub fn subscribed_watch(&self) -> watch::Receiver<bool> {
        self.subscribed_rx.clone()
    }

    /// First data frame arrived since the last subscribe.
    pub fn subscription_confirmed(&self) -> bool {
        self.confirmed.load(Ordering::Relaxed)
    }

    pub fn tokens(&self) -> Vec<Token> {
        self.tokens.read().clone()
    }

    pub fn decode_stats(&self) -> &DecodeStats {
        self.decoder.stats()
    }

    pub fn reconnect_count(&self) -> u32 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
        *self.last_heartbeat.read()
    }

    /// Start (or restart) the session with the given token set.
    pub fn start(self: &Arc<Self>, tokens: Vec<Token>) {
        *self.tokens.write() = tokens;
        let cancel = CancellationToken::new();
        *self.cancel.lock() = cancel.clone();
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.run(cancel).await });
        *self.task.lock() = Some(handle);
    }

    /// Stop the session. The frame-reading task exits promptly; in-flight
    /// control sends are abandoned. The subscription set is untouched.
    pub async fn stop(&self) {
        *self.state.write() = SessionState::Closing;
        self.cancel.lock().cancel();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        *self.state.write() = SessionState::Idle;
    }

    /// Subscribe one more token at runtime.
    pub async fn add(&self, token: Token) {
        {
            let mut tokens = self.tokens.write();
            if tokens.contains(&token) {
                return;
            }
            tokens.push(token);
        }
        let _ = self.command_tx.send(Command::Subscribe(vec![token])).await;
    }

    /// Unsubscribe a token at runtime; its snapshot state is purged.
    pub async fn remove(&self, token: Token) {
        self.tokens.write().retain(|t| *t != token);
        let _ = self
            .command_tx
            .send(Command::Unsubscribe(vec![token]))
            .await;
        self.store.purge(token);
    }

    fn set_state(&self, state: SessionState) {
        *self.state.write() = state;
    }

    async fn run(&self, cancel: CancellationToken) {
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            self.set_state(SessionState::Connecting);

            match self.try_connect(&cancel).await {
                Ok(ConnectOutcome::Stopped) => {
                    info!("Feed session stopped");
                    break;
                }
                Err(e) => {
                    if self.transport_opened.load(Ordering::Relaxed) {
                        attempt = 0;
                    }
                    warn!(%e, "Feed connection ended");
                }
            }

            let _ = self.subscribed_tx.send(false);

            if cancel.is_cancelled() {
                break;
            }

            attempt += 1;
            self.reconnects.fetch_add(1, Ordering::Relaxed);

            if attempt >= self.config.max_reconnect_attempts {
                error!(attempt, "Reconnect attempts exhausted, escalating");
                self.set_state(SessionState::Idle);
                self.escalation.notify_one();
                return;
            }

            self.set_state(SessionState::Backoff);
            debug!(
                attempt,
                delay_ms = self.config.reconnect_interval.as_millis(),
                "Reconnecting"
            );

            tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_interval) => {}
                _ = cancel.cancelled() => break,
            }
        }

        let _ = self.subscribed_tx.send(false);
        self.set_state(SessionState::Idle);
    }

    async fn try_connect(&self, cancel: &CancellationToken) -> SessionResult<ConnectOutcome> {
        self.transport_opened.store(false, Ordering::Relaxed);

        // Credentials are re-read on every attempt so a rotation takes
        // effect on the next connect.
        let url = format!(
            "{}?api_key={}&access_token={}",
            self.config.ws_url,
            self.credentials.api_key(),
            self.credentials.access_token()
        );

        info!(endpoint = %self.config.ws_url, "Connecting to feed");

        let (ws_stream, _response) = match timeout(self.config.connect_timeout, connect_async(&url))
            .await
        {
            Ok(Ok(ok)) => ok,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(SessionError::ConnectTimeout),
        };

        self.transport_opened.store(true, Ordering::Relaxed);
        self.set_state(SessionState::OpenUnsubscribed);
        info!("Feed connected");

        let (mut write, mut read) = ws_stream.split();

        // Resubscribe the full current token set as one batch.
        let tokens = self.tokens.read().clone();
        if !tokens.is_empty() {
            write
                .send(Message::Text(subscribe_message(&tokens)))
                .await?;

            // The broker needs a beat between subscribe and mode.
            tokio::select! {
                _ = tokio::time::sleep(self.config.mode_set_delay) => {}
                _ = cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(ConnectOutcome::Stopped);
                }
            }

            write
                .send(Message::Text(mode_message(self.config.mode, &tokens)))
                .await?;

            info!(
                count = tokens.len(),
                mode = %self.config.mode,
                "Subscribed token batch"
            );
        }

        self.confirmed.store(false, Ordering::Relaxed);
        self.set_state(SessionState::OpenSubscribed);
        let _ = self.subscribed_tx.send(true);

        let confirm_sleep = tokio::time::sleep(self.config.confirm_grace);
        tokio::pin!(confirm_sleep);
        let mut confirm_checked = false;

        loop {
            let command_recv = async { self.command_rx.lock().await.recv().await };

            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(ConnectOutcome::Stopped);
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Binary(data))) => {
                            self.ingest(&data).await;
                        }
                        Some(Ok(Message::Text(text))) => {
                            self.ingest(text.as_bytes()).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Feed closed by server");
                            return Err(SessionError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(?e, "Feed read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("Feed stream ended");
                            return Err(SessionError::ConnectionClosed {
                                code: 1006,
                                reason: "Stream ended".to_string(),
                            });
                        }
                        _ => {}
                    }
                }

                cmd = command_recv => {
                    if let Some(cmd) = cmd {
                        match cmd {
                            Command::Subscribe(batch) => {
                                write.send(Message::Text(subscribe_message(&batch))).await?;
                                write
                                    .send(Message::Text(mode_message(self.config.mode, &batch)))
                                    .await?;
                                debug!(?batch, "Subscribed tokens at runtime");
                            }
                            Command::Unsubscribe(batch) => {
                                write
                                    .send(Message::Text(unsubscribe_message(&batch)))
                                    .await?;
                                debug!(?batch, "Unsubscribed tokens at runtime");
                            }
                        }
                    }
                }

                _ = &mut confirm_sleep, if !confirm_checked => {
                    confirm_checked = true;
                    if !self.confirmed.load(Ordering::Relaxed) {
                        warn!(
                            grace_secs = self.config.confirm_grace.as_secs(),
                            "No data frame since subscribing"
                        );
                    }
                }
            }
        }
    }

    /// Feed one transport frame through the decoder. Ticks apply to the
    /// snapshot store in wire order; deltas forward in the same order.
    async fn ingest(&self, data: &[u8]) {
        match self.decoder.decode_frame(data) {
            DecodedFrame::Data(ticks) => {
                if ticks.is_empty() {
                    return;
                }
                if !self.confirmed.swap(true, Ordering::Relaxed) {
                    info!("Subscription confirmed by first data frame");
                }
                for tick in &ticks {
                    if let Some(delta) = self.store.apply(tick) {
                        if self.delta_tx.send(delta).await.is_err() {
                            warn!("Delta receiver dropped");
                        }
                    }
                }
            }
            DecodedFrame::Heartbeat => {
                *self.last_heartbeat.write() = Some(Utc::now());
            }
            DecodedFrame::TextControl(value) => {
                warn!(%value, "Server control frame");
                if is_credential_error(&value) {
                    warn!("Feed rejected the credential, escalating");
                    self.escalation.notify_one();
                }
            }
            DecodedFrame::Unknown => {}
        }
    }
}

/// Server error frames that indicate a rejected or expired credential.
fn is_credential_error(value: &serde_json::Value) -> bool {
    if value.get("type").and_then(|t| t.as_str()) != Some("error") {
        return false;
    }
    let data = value
        .get("data")
        .map(|d| d.to_string().to_lowercase())
        .unwrap_or_default();
    data.contains("token") || data.contains("auth") || data.contains("expire")
}
