// System
use std::sync::Arc;

// Third Party
use tokio::{
    task::JoinHandle,
    time::{self, Duration, Instant},
};
use tracing::{info, Instrument, Span};

// Local
use crate::counters::Counters;

pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(10);

/// Background task that logs the counters on a fixed period until stopped.
pub struct StatusReporter {
    counters: Arc<Counters>,
    handle: JoinHandle<()>,
}

impl StatusReporter {
    /// The first report is logged one full `period` after spawning. Reports are emitted inside the
    /// caller's span.
    pub fn spawn(counters: Arc<Counters>, period: Duration) -> Self {
        let reported = counters.clone();
        let handle = tokio::spawn(
            async move {
                let mut interval = time::interval_at(Instant::now() + period, period);
                loop {
                    interval.tick().await;
                    let snapshot = reported.snapshot();
                    info!(total = snapshot.total(), "{}", snapshot);
                }
            }
            .instrument(Span::current()),
        );
        Self { counters, handle }
    }

    /// Stop reporting and log the final counts.
    pub fn stop(self) {
        self.handle.abort();
        let snapshot = self.counters.snapshot();
        info!(total = snapshot.total(), "{}", snapshot);
    }
}
