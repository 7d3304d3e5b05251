//! The periodic property-upload scheduler.

use crate::client::SyncClient;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Triggers periodic property flushes for the lifetime of the process.
///
/// The scheduler is armed exactly once per initialization and ticks at a
/// fixed period, independent of whether the application is foregrounded.
/// It is owned by the composition root and can be shut down explicitly;
/// otherwise it runs until process termination.
#[derive(Debug, Default)]
pub struct UploadScheduler {
    armed: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl UploadScheduler {
    /// Creates an unarmed scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the scheduler.
    ///
    /// The first flush fires one full period after arming. Returns false
    /// if the scheduler was already armed; arming is one-shot.
    pub fn arm(&self, client: Arc<SyncClient>, period: Duration) -> bool {
        if self.armed.swap(true, Ordering::SeqCst) {
            warn!("upload scheduler is already armed");
            return false;
        }

        info!("arming upload scheduler with period {period:?}");
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = client.send_properties().await {
                    debug!("scheduled property flush failed: {e}");
                }
            }
        });
        *self.handle.lock() = Some(handle);
        true
    }

    /// Returns true if the scheduler has been armed.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Stops the periodic trigger.
    pub fn shutdown(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
            debug!("upload scheduler stopped");
        }
    }
}

impl Drop for UploadScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
