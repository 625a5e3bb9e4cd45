//! Credential rotation coordinator.
//!
//! Waits for the daily boundary (or an escalation from the feed session),
//! obtains a fresh credential from the login collaborator, then tears down
//! and rebuilds the feed pipeline. The watchlist and page format never
//! change across a rotation; only the credential and transport identity do.

use crate::error::{RotationError, RotationResult};
use crate::login::LoginProvider;
use crate::schedule::until_next_rotation;
use chrono::Utc;
use kite_catalog::KiteHttpClient;
use kite_core::{CivilZone, Credentials};
use kite_feed::SnapshotStore;
use kite_sink::MessageSink;
use kite_telemetry::Metrics;
use kite_view::ViewPublisher;
use kite_ws::FeedSession;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Environment variable the fresh credential is persisted into.
const ACCESS_TOKEN_ENV: &str = "ZERODHA_ACCESS_TOKEN";

#[derive(Debug, Clone)]
pub struct RotatorConfig {
    /// Local hour of the daily rotation (credential expires at 06:00, so
    /// rotate 15 minutes early).
    pub rotate_hour: u32,
    pub rotate_minute: u32,
    /// Login collaborator timeout; a single attempt, never retried.
    pub login_timeout: Duration,
    /// Settle time between stopping and restarting the session.
    pub restart_delay: Duration,
    /// Audit channel for rotation events.
    pub audit_channel_id: String,
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self {
            rotate_hour: 5,
            rotate_minute: 45,
            login_timeout: Duration::from_secs(120),
            restart_delay: Duration::from_secs(2),
            audit_channel_id: String::new(),
        }
    }
}

impl RotatorConfig {
    pub fn validate(&self) -> RotationResult<()> {
        if self.rotate_hour > 23 || self.rotate_minute > 59 {
            return Err(RotationError::InvalidConfig(format!(
                "bad rotation time {:02}:{:02}",
                self.rotate_hour, self.rotate_minute
            )));
        }
        Ok(())
    }
}

/// Outcome summary of one completed rotation.
#[derive(Debug, Clone)]
pub struct RotationReport {
    pub duration: Duration,
    pub tracked_tokens: usize,
}

pub struct CredentialRotator {
    config: RotatorConfig,
    zone: CivilZone,
    credentials: Arc<Credentials>,
    login: Arc<dyn LoginProvider>,
    broker: Arc<KiteHttpClient>,
    session: Arc<FeedSession>,
    publisher: Arc<ViewPublisher>,
    store: Arc<SnapshotStore>,
    sink: Arc<dyn MessageSink>,
    /// Signalled by the feed session when its retry cap is hit.
    escalation: Arc<Notify>,
}

impl CredentialRotator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RotatorConfig,
        zone: CivilZone,
        credentials: Arc<Credentials>,
        login: Arc<dyn LoginProvider>,
        broker: Arc<KiteHttpClient>,
        session: Arc<FeedSession>,
        publisher: Arc<ViewPublisher>,
        store: Arc<SnapshotStore>,
        sink: Arc<dyn MessageSink>,
        escalation: Arc<Notify>,
    ) -> RotationResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            zone,
            credentials,
            login,
            broker,
            session,
            publisher,
            store,
            sink,
            escalation,
        })
    }

    /// Run the schedule loop until cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            let wait = until_next_rotation(
                Utc::now(),
                &self.zone,
                self.config.rotate_hour,
                self.config.rotate_minute,
            );
            info!(wait_secs = wait.as_secs(), "Next rotation scheduled");

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {
                    if let Err(e) = self.rotate().await {
                        error!(%e, "Scheduled rotation failed");
                    }
                }
                _ = self.escalation.notified() => {
                    warn!("Feed session escalated, rotating now");
                    if let Err(e) = self.rotate().await {
                        error!(%e, "Escalated rotation failed");
                    }
                }
            }
        }
        info!("Rotator stopped");
    }

    /// Execute one rotation.
    ///
    /// On login failure the pipeline is left in whatever state it was in;
    /// there is no automatic retry until the next trigger.
    pub async fn rotate(&self) -> RotationResult<RotationReport> {
        let started = Instant::now();
        self.audit("🔄 Rotation started").await;

        let outcome = match timeout(self.config.login_timeout, self.login.login()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                self.audit(&format!("❌ Rotation failed: {e}")).await;
                Metrics::rotation("failed");
                return Err(e);
            }
            Err(_) => {
                self.audit("❌ Rotation failed: login timed out").await;
                Metrics::rotation("failed");
                return Err(RotationError::LoginTimeout);
            }
        };

        info!(
            login_secs = outcome.obtained_in.as_secs(),
            "Login collaborator returned a credential"
        );

        // Persist, then confirm the broker accepts it before touching the
        // running pipeline.
        self.credentials.set_access_token(&outcome.credential);
        std::env::set_var(ACCESS_TOKEN_ENV, &outcome.credential);

        if let Err(e) = self.broker.validate_profile().await {
            self.audit(&format!("❌ Rotation failed: profile validation: {e}"))
                .await;
            Metrics::rotation("failed");
            return Err(e.into());
        }

        // Rebuild the pipeline. The session keeps its token set across
        // stop/start; the snapshot has no continuity with the new session.
        let tracked = self.session.tokens();
        self.session.stop().await;
        self.publisher.clear_handles();
        self.store.clear();

        tokio::time::sleep(self.config.restart_delay).await;
        self.session.start(tracked.clone());

        let report = RotationReport {
            duration: started.elapsed(),
            tracked_tokens: tracked.len(),
        };
        self.audit(&format!(
            "✅ Rotation completed in {}s, tracking {} instruments",
            report.duration.as_secs(),
            report.tracked_tokens
        ))
        .await;
        Metrics::rotation("completed");
        info!(
            duration_ms = report.duration.as_millis(),
            tracked = report.tracked_tokens,
            "Rotation completed"
        );

        Ok(report)
    }

    async fn audit(&self, text: &str) {
        if let Err(e) = self.sink.send(&self.config.audit_channel_id, text).await {
            warn!(%e, "Audit message failed");
        }
    }
}
