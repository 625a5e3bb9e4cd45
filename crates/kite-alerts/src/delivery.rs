//! Alert delivery task.
//!
//! Consumes snapshot deltas, evaluates the rules, and sends one message
//! per alert to the alert channel. Delivery is best-effort: a sink failure
//! is logged and never retried.

use crate::engine::AlertEngine;
use kite_catalog::InstrumentCatalog;
use kite_feed::SnapshotDelta;
use kite_sink::MessageSink;
use kite_telemetry::Metrics;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn run_delivery(
    engine: AlertEngine,
    mut deltas: mpsc::Receiver<SnapshotDelta>,
    sink: Arc<dyn MessageSink>,
    catalog: Arc<InstrumentCatalog>,
    channel_id: String,
    cancel: CancellationToken,
) {
    info!(channel_id, "Alert delivery started");

    loop {
        let delta = tokio::select! {
            _ = cancel.cancelled() => break,
            delta = deltas.recv() => match delta {
                Some(delta) => delta,
                None => break,
            },
        };

        for event in engine.evaluate(&delta) {
            Metrics::alert(event.kind.as_str());

            let name = catalog.display_name(event.token);
            let text = event.format(&name);
            info!(
                kind = %event.kind,
                token = %event.token,
                pct = %event.pct,
                elapsed_s = event.elapsed.num_seconds(),
                "Alert raised"
            );

            if let Err(e) = sink.send(&channel_id, &text).await {
                warn!(%e, kind = %event.kind, "Alert delivery failed");
            }
        }
    }

    info!("Alert delivery stopped");
}
