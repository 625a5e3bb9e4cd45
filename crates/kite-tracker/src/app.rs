//! Application composition root.
//!
//! Components are owned here and initialized in dependency order:
//! Catalog -> SnapshotStore -> FeedSession -> AlertEngine -> ViewPublisher
//! -> Rotator. The rotator holds handles to the session and publisher; the
//! session only holds an escalation `Notify`, never the rotator.

use crate::config::{AppConfig, Secrets, TradingMode};
use crate::error::{AppError, AppResult};
use crate::login_cmd::CommandLoginProvider;
use kite_alerts::{run_delivery, AlertEngine};
use kite_catalog::{CatalogError, InstrumentCatalog, KiteHttpClient};
use kite_core::{Credentials, Token};
use kite_feed::{SnapshotDelta, SnapshotStore};
use kite_rotator::{CredentialRotator, LoginProvider, RotationError, RotatorConfig};
use kite_sink::{DiscordSink, MemorySink, MessageSink};
use kite_telemetry::Metrics;
use kite_view::{ViewConfig, ViewPublisher};
use kite_watchlist::{Watchlist, WatchlistError, WatchlistStore};
use kite_ws::{FeedSession, SessionConfig, SessionState};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Stats log interval.
const STATS_INTERVAL: Duration = Duration::from_secs(3600);

/// Delta channel depth; a full channel backpressures the ingest task.
const DELTA_CHANNEL_DEPTH: usize = 1024;

pub struct Application {
    secrets: Secrets,
    catalog: Arc<InstrumentCatalog>,
    watchlist: Arc<Watchlist>,
    store: Arc<SnapshotStore>,
    session: Arc<FeedSession>,
    publisher: Arc<ViewPublisher>,
    rotator: Arc<CredentialRotator>,
    sink: Arc<dyn MessageSink>,
    order: Arc<RwLock<Vec<Token>>>,
    engine: Option<AlertEngine>,
    delta_rx: Option<mpsc::Receiver<SnapshotDelta>>,
}

impl Application {
    /// Build the application with the default collaborators: the Discord
    /// sink (or the in-memory sink in paper mode) and the command-backed
    /// login provider.
    pub async fn bootstrap(config: AppConfig, secrets: Secrets) -> AppResult<Self> {
        let sink: Arc<dyn MessageSink> = match secrets.trading_mode {
            TradingMode::Live => Arc::new(DiscordSink::new(&secrets.discord_bot_token)?),
            TradingMode::Paper => {
                info!("Paper mode: publishing to the in-memory sink");
                Arc::new(MemorySink::new())
            }
        };
        let login = Arc::new(CommandLoginProvider::new(
            config.rotation.login_command.clone(),
        ));
        Self::bootstrap_with(config, secrets, sink, login).await
    }

    /// Build with explicit sink and login collaborators (tests).
    pub async fn bootstrap_with(
        config: AppConfig,
        secrets: Secrets,
        sink: Arc<dyn MessageSink>,
        login: Arc<dyn LoginProvider>,
    ) -> AppResult<Self> {
        let credentials = Arc::new(Credentials::new(&secrets.api_key, &secrets.access_token));
        let broker = Arc::new(KiteHttpClient::new(&config.api_url, credentials.clone())?);

        // A stale credential at startup is expected after a restart past
        // the daily expiry; refresh before anything touches the REST API.
        match broker.validate_profile().await {
            Ok(()) => {}
            Err(CatalogError::CredentialRejected(reason)) => {
                warn!(%reason, "Configured credential rejected, logging in");
                let outcome = timeout(
                    Duration::from_secs(config.rotation.login_timeout_secs),
                    login.login(),
                )
                .await
                .map_err(|_| AppError::Rotation(RotationError::LoginTimeout))??;
                credentials.set_access_token(&outcome.credential);
                std::env::set_var("ZERODHA_ACCESS_TOKEN", &outcome.credential);
                broker.validate_profile().await?;
                info!("Startup credential refresh succeeded");
            }
            Err(e) => return Err(e.into()),
        }

        let instruments = broker.fetch_instruments(&config.exchange).await?;
        let catalog = Arc::new(InstrumentCatalog::new(instruments));

        let watchlist = Arc::new(Watchlist::load(WatchlistStore::new(
            &config.watchlist_path,
        ))?);
        let tokens = watchlist.resolve_tokens(&catalog);
        info!(
            tracked = tokens.len(),
            catalog_size = catalog.len(),
            "Catalog and watchlist loaded"
        );

        let store = Arc::new(SnapshotStore::new());
        let (delta_tx, delta_rx) = mpsc::channel(DELTA_CHANNEL_DEPTH);
        let escalation = Arc::new(Notify::new());

        let mut session_config: SessionConfig = config.websocket.clone().into();
        session_config.ws_url = config.ws_url.clone();
        let session = Arc::new(FeedSession::new(
            session_config,
            credentials.clone(),
            store.clone(),
            delta_tx,
            escalation.clone(),
        ));

        let engine = AlertEngine::new(config.alerts.clone())?;

        let zone = config.zone.civil_zone()?;
        let order = Arc::new(RwLock::new(tokens));
        let mut view_config: ViewConfig = config.view.clone().into();
        view_config.channel_id = secrets.ticker_channel_id.clone();
        let publisher = Arc::new(ViewPublisher::new(
            view_config,
            sink.clone(),
            catalog.clone(),
            store.clone(),
            order.clone(),
            zone.clone(),
        ));

        let mut rotator_config: RotatorConfig = config.rotation.clone().into();
        rotator_config.audit_channel_id = secrets.log_channel_id.clone();
        let rotator = Arc::new(CredentialRotator::new(
            rotator_config,
            zone,
            credentials.clone(),
            login,
            broker.clone(),
            session.clone(),
            publisher.clone(),
            store.clone(),
            sink.clone(),
            escalation,
        )?);

        Ok(Self {
            secrets,
            catalog,
            watchlist,
            store,
            session,
            publisher,
            rotator,
            sink,
            order,
            engine: Some(engine),
            delta_rx: Some(delta_rx),
        })
    }

    pub fn session(&self) -> &Arc<FeedSession> {
        &self.session
    }

    pub fn watchlist(&self) -> &Arc<Watchlist> {
        &self.watchlist
    }

    /// Start tracking an instrument: registry first, then fan out to the
    /// session and view ordering. A persistence failure keeps the change
    /// and surfaces the error for the command reply.
    pub async fn track(&self, identifier: &str) -> AppResult<()> {
        let persisted = match self.watchlist.add(identifier) {
            Ok(()) => Ok(()),
            Err(e @ WatchlistError::AlreadyTracked(_)) => return Err(e.into()),
            Err(e) => Err(e),
        };

        if let Some(token) = self.catalog.resolve(identifier) {
            self.order.write().push(token);
            self.session.add(token).await;
        } else {
            warn!(identifier, "Tracked identifier is not in the catalog");
        }

        persisted.map_err(Into::into)
    }

    /// Stop tracking an instrument.
    pub async fn untrack(&self, identifier: &str) -> AppResult<()> {
        let persisted = match self.watchlist.remove(identifier) {
            Ok(()) => Ok(()),
            Err(e @ WatchlistError::NotTracked(_)) => return Err(e.into()),
            Err(e) => Err(e),
        };

        if let Some(token) = self.catalog.resolve(identifier) {
            self.order.write().retain(|t| *t != token);
            self.session.remove(token).await;
        }

        persisted.map_err(Into::into)
    }

    /// Run until SIGINT/SIGTERM.
    pub async fn run(mut self) -> AppResult<()> {
        let cancel = CancellationToken::new();

        let tokens = self.watchlist.resolve_tokens(&self.catalog);
        self.session.start(tokens);

        let engine = self
            .engine
            .take()
            .ok_or_else(|| AppError::Config("application already running".to_string()))?;
        let delta_rx = self
            .delta_rx
            .take()
            .ok_or_else(|| AppError::Config("application already running".to_string()))?;

        let delivery_task = tokio::spawn(run_delivery(
            engine,
            delta_rx,
            self.sink.clone(),
            self.catalog.clone(),
            self.secrets.log_channel_id.clone(),
            cancel.child_token(),
        ));
        let publisher_task = tokio::spawn(
            self.publisher
                .clone()
                .run(self.session.subscribed_watch(), cancel.child_token()),
        );
        let rotator_task = tokio::spawn(self.rotator.clone().run(cancel.child_token()));

        info!("Tracker running");
        self.wait_for_shutdown().await;
        info!("Shutdown signal received");

        cancel.cancel();
        self.session.stop().await;
        let _ = delivery_task.await;
        let _ = publisher_task.await;
        let _ = rotator_task.await;

        self.log_stats();
        Ok(())
    }

    async fn wait_for_shutdown(&self) {
        let mut stats_interval = tokio::time::interval(STATS_INTERVAL);
        stats_interval.tick().await; // immediate first tick

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => return,
                _ = stats_interval.tick() => self.log_stats(),
            }
        }
    }

    fn log_stats(&self) {
        let stats = self.session.decode_stats();
        Metrics::ws_connected(self.session.state() == SessionState::OpenSubscribed);
        info!(
            frames = stats.frames(),
            packets = stats.packets(),
            heartbeats = stats.heartbeats(),
            short_buffers = stats.short_buffers(),
            bad_lengths = stats.bad_lengths(),
            zlib_failures = stats.zlib_failures(),
            reconnects = self.session.reconnect_count(),
            ticks_applied = self.store.ticks_applied(),
            snapshot_size = self.store.size(),
            "Feed statistics"
        );
    }
}

/// Completes on SIGINT or, where available, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(%e, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
