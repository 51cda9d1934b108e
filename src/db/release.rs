//! Release pipeline.
//!
//! Runs teardown scripts against a connection, then physically releases it.
//! Nothing here reports back to a caller: teardown and release failures are
//! logged and swallowed, and the physical release is always attempted.
//!
//! Deferred releases are spawned onto the runtime and counted, so shutdown
//! paths can wait until every scheduled release has finished.

use crate::db::connection::Connection;
use crate::db::registry::ScriptPhase;
use crate::models::ScriptEntry;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

/// Teardown then physical release. Never fails from the caller's point of view.
pub(crate) async fn release(mut conn: Connection, teardown: &[Arc<ScriptEntry>]) {
    let connection_id = conn.id();

    if let Err(e) = conn.run_scripts(ScriptPhase::Teardown, teardown).await {
        warn!(
            connection_id = %connection_id,
            error = %e,
            "Teardown script failed, releasing connection anyway"
        );
    }

    match conn.close().await {
        Ok(()) => debug!(connection_id = %connection_id, "Connection released"),
        Err(e) => error!(
            connection_id = %connection_id,
            error = %e,
            "Failed to release connection"
        ),
    }
}

/// Counts deferred releases that have been scheduled but not finished.
#[derive(Debug, Clone, Default)]
pub(crate) struct ReleaseTracker {
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl ReleaseTracker {
    /// Register a release about to be spawned.
    pub(crate) fn start(&self) -> ReleaseTicket {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        ReleaseTicket {
            tracker: self.clone(),
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Resolve once no release is in flight.
    pub(crate) async fn wait_idle(&self) {
        loop {
            // Register interest before checking, or a wakeup could slip between the two
            let notified = self.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Marks one deferred release as finished when dropped, even if the task panicked.
pub(crate) struct ReleaseTicket {
    tracker: ReleaseTracker,
}

impl Drop for ReleaseTicket {
    fn drop(&mut self) {
        if self.tracker.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tracker.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_idle_returns_immediately_when_nothing_in_flight() {
        let tracker = ReleaseTracker::default();
        tokio::time::timeout(Duration::from_secs(1), tracker.wait_idle())
            .await
            .expect("wait_idle should not block");
    }

    #[tokio::test]
    async fn test_wait_idle_waits_for_tickets() {
        let tracker = ReleaseTracker::default();
        let ticket = tracker.start();
        assert_eq!(tracker.in_flight(), 1);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(ticket);
        });

        tokio::time::timeout(Duration::from_secs(1), tracker.wait_idle())
            .await
            .expect("wait_idle should finish after the ticket is dropped");
        assert_eq!(tracker.in_flight(), 0);
        handle.await.unwrap();
    }
}
