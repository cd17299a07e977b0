//! Periodic sweeper loop shared by the scheduler instantiations

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One periodic reconciliation pass over a queue of deferred actions.
///
/// `sweep` must contain its own failures: a single entry's resolution or
/// delivery failure never aborts the rest of the pass, and nothing escapes
/// to the loop.
#[async_trait]
pub trait Sweeper: Send + Sync {
    fn name(&self) -> &'static str;

    async fn sweep(&self, now: chrono::DateTime<chrono::Utc>);
}

/// Spawns the periodic loop for one sweeper.
///
/// The loop honors the stop channel between passes only; a sweep already in
/// progress always completes its snapshot first.
pub fn spawn_sweeper<S: Sweeper + 'static>(
    sweeper: Arc<S>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("{} sweeper running every {:?}", sweeper.name(), period);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it so a freshly restored
        // queue is not swept before setup finishes.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => sweeper.sweep(Utc::now()).await,
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("{} sweeper stopped", sweeper.name());
    })
}
