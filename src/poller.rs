//! Watch mode — runs the pipeline on a fixed interval.
//!
//! For hosts without an external scheduler. A failed run is logged and
//! retried on the next tick; runs never overlap because each tick awaits
//! the previous run.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::pipeline::PixPipeline;

/// Spawn a background task that runs `pipeline` every `interval`.
///
/// The first run starts immediately. Send `true` on the returned sender
/// (or drop it) to stop: a run already in progress finishes first, so
/// a recorded transaction is always marked before the task exits.
pub fn spawn_pix_poller(
    pipeline: Arc<PixPipeline>,
    interval: Duration,
) -> (JoinHandle<()>, watch::Sender<bool>) {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        info!("Pix poller started — checking every {}s", interval.as_secs());

        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
            }

            if *shutdown_rx.borrow() {
                break;
            }

            if let Err(e) = pipeline.run().await {
                error!(error = %e, "Pix check failed, retrying next cycle");
            }
        }

        info!("Pix poller shutting down");
    });

    (handle, shutdown_tx)
}
