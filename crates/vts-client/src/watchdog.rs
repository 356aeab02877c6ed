//! Periodic latency watchdog.
//!
//! The watchdog runs as its own task for the lifetime of an authenticated
//! session. On every wake it aggregates the shared latency window and hands
//! the mean to an [`AlertHook`] when it exceeds the configured threshold. It
//! never issues commands itself.

use crate::latency::LatencyMonitor;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{Instrument, debug, error, info, warn};

/// Receives latency alerts from the watchdog.
///
/// Implementations may forward alerts anywhere (chat, e-mail, metrics). A
/// returned error is logged and the watchdog keeps running.
#[async_trait]
pub trait AlertHook: Send + Sync {
    async fn latency_exceeded(&self, mean: Duration, threshold: Duration) -> Result<()>;
}

/// Default hook: logs a warning and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlert;

#[async_trait]
impl AlertHook for LogAlert {
    async fn latency_exceeded(&self, mean: Duration, threshold: Duration) -> Result<()> {
        warn!(
            mean_secs = mean.as_secs_f64(),
            threshold_secs = threshold.as_secs_f64(),
            "Latency {:.2}s exceeds threshold {:.2}s!",
            mean.as_secs_f64(),
            threshold.as_secs_f64()
        );
        Ok(())
    }
}

/// Handle to a running watchdog task. Dropping it cancels the loop.
pub struct Watchdog {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    _cancel_on_drop: DropGuard,
}

impl Watchdog {
    /// Spawns the watchdog loop.
    pub fn spawn(
        monitor: LatencyMonitor,
        threshold: Duration,
        interval: Duration,
        hook: Arc<dyn AlertHook>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let span = tracing::info_span!("watchdog", interval_secs = interval.as_secs_f64());
        let handle = tokio::spawn(
            async move {
                info!("Watchdog started.");
                loop {
                    tokio::select! {
                        _ = task_cancel.cancelled() => break,
                        _ = tokio::time::sleep(interval) => {
                            check_latency(&monitor, threshold, hook.as_ref()).await;
                        }
                    }
                }
                info!("Watchdog cancelled.");
            }
            .instrument(span),
        );
        Self {
            _cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
            handle,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the loop and waits for the task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                error!(error = %e, "Watchdog task panicked.");
            }
        }
    }
}

/// One watchdog wake: aggregate the window and alert if the mean is too high.
pub async fn check_latency(monitor: &LatencyMonitor, threshold: Duration, hook: &dyn AlertHook) {
    let Some(stats) = monitor.stats() else {
        debug!("No latency samples yet.");
        return;
    };
    info!(
        samples = stats.count,
        std_dev_secs = stats.std_dev.as_secs_f64(),
        "Average latency: {:.2}s",
        stats.mean.as_secs_f64()
    );
    if stats.mean > threshold {
        if let Err(e) = hook.latency_exceeded(stats.mean, threshold).await {
            error!(error = ?e, "Latency alert delivery failed.");
        }
    }
}
