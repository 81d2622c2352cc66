//! Fixed-cadence refresh of the three dashboard snapshots.
//!
//! Each snapshot kind has its own polling task. A tick stamps a new sequence
//! number and spawns the fetch, so a slow response may still be in flight
//! when the next tick fires; [`crate::refresh::SnapshotSlot`] sorts that out
//! on arrival. Shutting down stops the timers and aborts in-flight fetches.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, info, warn};

use crate::dashboard::DashboardEvent;
use crate::refresh::{Sequencer, SnapshotKind, SnapshotPayload};
use crate::services::dashboard_api::DashboardApi;

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub issue_limit: u32,
}

/// Owns the polling tasks. Dropping it without calling
/// [`PollerHandle::shutdown`] still stops the timers on their next wakeup.
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    /// Signals every poller to stop and waits for them to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
        info!("Pollers stopped");
    }
}

/// Fetches one snapshot of `kind`.
pub async fn fetch_snapshot<A: DashboardApi + ?Sized>(
    api: &A,
    kind: SnapshotKind,
    issue_limit: u32,
) -> anyhow::Result<SnapshotPayload> {
    Ok(match kind {
        SnapshotKind::Clusters => SnapshotPayload::Clusters(api.heatmap().await?),
        SnapshotKind::Issues => SnapshotPayload::Issues(api.top_issues(issue_limit).await?),
        SnapshotKind::Statistics => SnapshotPayload::Statistics(api.statistics().await?),
    })
}

/// Turns a fetch result into the event the dashboard consumes.
pub fn snapshot_event(
    kind: SnapshotKind,
    seq: u64,
    result: anyhow::Result<SnapshotPayload>,
) -> DashboardEvent {
    match result {
        Ok(payload) => DashboardEvent::SnapshotArrived { seq, payload },
        Err(e) => DashboardEvent::SnapshotFailed {
            kind,
            seq,
            message: format!("{e:#}"),
        },
    }
}

/// Starts one polling task per snapshot kind. The first fetch of each kind
/// happens immediately.
pub fn spawn_pollers<A>(
    api: Arc<A>,
    settings: PollSettings,
    events: mpsc::UnboundedSender<DashboardEvent>,
) -> PollerHandle
where
    A: DashboardApi + 'static,
{
    let (shutdown, shutdown_rx) = watch::channel(false);

    let tasks = SnapshotKind::ALL
        .into_iter()
        .map(|kind| {
            let span = tracing::info_span!("poll", %kind);
            tokio::spawn(
                poll_loop(
                    api.clone(),
                    kind,
                    settings,
                    events.clone(),
                    shutdown_rx.clone(),
                )
                .instrument(span),
            )
        })
        .collect();

    info!(
        interval_secs = settings.interval.as_secs(),
        "Pollers started"
    );
    PollerHandle { shutdown, tasks }
}

async fn poll_loop<A>(
    api: Arc<A>,
    kind: SnapshotKind,
    settings: PollSettings,
    events: mpsc::UnboundedSender<DashboardEvent>,
    mut shutdown: watch::Receiver<bool>,
) where
    A: DashboardApi + 'static,
{
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sequencer = Sequencer::default();
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let seq = sequencer.next();
                let api = api.clone();
                let events = events.clone();
                debug!(seq, "Refresh requested");

                in_flight.spawn(
                    async move {
                        let result = fetch_snapshot(api.as_ref(), kind, settings.issue_limit).await;
                        if let Err(e) = &result {
                            warn!(seq, error = %e, "Refresh failed");
                        }
                        // Receiver gone means the dashboard is shutting down.
                        let _ = events.send(snapshot_event(kind, seq, result));
                    }
                    .in_current_span(),
                );
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }

    in_flight.abort_all();
    debug!("Poller exited");
}
