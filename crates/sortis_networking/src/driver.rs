//! Async loop driver.
//!
//! The synchronizers are plain state machines advanced by `tick(now)`.
//! These helpers run them on a tokio interval for callers that live in an
//! async runtime. Time comes from tokio's clock, so paused-clock tests
//! move backoff deadlines too.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::battle::{BattlePhase, BattleSynchronizer};
use crate::draft::DraftSynchronizer;
use crate::error::{SyncResult, TransportError, TransportResult};
use crate::transport::ConnectionState;

/// Something advanced by `tick(now)`.
pub trait Synchronizer {
    /// Advances to `now`.
    ///
    /// # Errors
    ///
    /// Returns the synchronizer's fatal error.
    fn tick(&mut self, now: Instant) -> SyncResult<()>;

    /// True once ticking has no further effect.
    fn is_finished(&self) -> bool;
}

impl Synchronizer for BattleSynchronizer {
    fn tick(&mut self, now: Instant) -> SyncResult<()> {
        Self::tick(self, now)
    }

    fn is_finished(&self) -> bool {
        self.phase() == BattlePhase::Terminated
    }
}

impl Synchronizer for DraftSynchronizer {
    fn tick(&mut self, now: Instant) -> SyncResult<()> {
        Self::tick(self, now)
    }

    fn is_finished(&self) -> bool {
        self.is_closed() || self.phase().is_terminal()
    }
}

/// Current instant on tokio's clock.
#[must_use]
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Ticks `sync` every `period` until it finishes.
///
/// # Errors
///
/// Returns the first fatal error the synchronizer reports.
pub async fn drive<S: Synchronizer + ?Sized>(sync: &mut S, period: Duration) -> SyncResult<()> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0u64;
    loop {
        interval.tick().await;
        ticks += 1;
        sync.tick(now())?;
        if sync.is_finished() {
            debug!(ticks, "driver finished");
            return Ok(());
        }
    }
}

/// Resolves once the watched session reports `Connected`.
///
/// # Errors
///
/// Returns [`TransportError::Timeout`] after `timeout`, or
/// [`TransportError::ConnectionClosed`] if the session is gone.
pub async fn wait_connected(
    mut state: watch::Receiver<ConnectionState>,
    timeout: Duration,
) -> TransportResult<()> {
    let connected = state.wait_for(|s| *s == ConnectionState::Connected);
    match tokio::time::timeout(timeout, connected).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(_)) => Err(TransportError::ConnectionClosed),
        Err(_) => Err(TransportError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::BattleSyncConfig;
    use crate::draft::{DraftPhase, DraftSyncConfig};
    use crate::error::SyncError;
    use crate::transport::{loopback, TransportSession};

    #[tokio::test(start_paused = true)]
    async fn test_connect_signal_wakes_waiter() {
        let (connector, server) = loopback();
        server.set_accepting(false);
        let transport = TransportSession::new(Box::new(connector), 7).shared();
        let state = transport.lock().watch_state();
        let mut sync = BattleSynchronizer::new(transport.clone(), BattleSyncConfig::default());
        sync.activate(now()).unwrap();

        let waiter = wait_connected(state, Duration::from_secs(10));
        let pump = async {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            server.set_accepting(true);
            let _ = tokio::time::timeout(
                Duration::from_secs(3),
                drive(&mut sync, Duration::from_millis(10)),
            )
            .await;
        };
        let (waited, ()) = tokio::join!(waiter, pump);
        assert_eq!(waited, Ok(()));
        assert_eq!(sync.phase(), BattlePhase::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_connected_times_out() {
        let (connector, _server) = loopback();
        let transport = TransportSession::new(Box::new(connector), 7).shared();
        let state = transport.lock().watch_state();
        let result = wait_connected(state, Duration::from_secs(1)).await;
        assert_eq!(result, Err(TransportError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_stops_on_exhausted_budget() {
        let (connector, server) = loopback();
        server.set_accepting(false);
        let transport = TransportSession::new(Box::new(connector), 10).shared();
        let mut sync = DraftSynchronizer::new(transport, 3, DraftSyncConfig::default());
        sync.activate(now()).unwrap();

        let result = drive(&mut sync, Duration::from_millis(100)).await;
        assert_eq!(result, Err(SyncError::RetryBudgetExhausted { attempts: 5 }));
        assert_eq!(sync.phase(), DraftPhase::Error);
        assert_eq!(server.connect_attempts(), 6);
    }
}
