//! Quantizes transfer progress into ten-percent ticks.

use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::mpsc::UnboundedReceiver;

use crate::contract::{Reporter, TransferProgress};

/// Percentage of `done / total` rounded to the nearest ten, or `None` while
/// the total is unknown.
pub fn quantized_percent(progress: TransferProgress) -> Option<u32> {
    if progress.amount_total == 0 {
        return None;
    }
    let ratio = progress.amount_done as f64 / progress.amount_total as f64;
    let percent = ((ratio * 10.0).round() * 10.0) as u32;
    Some(percent.min(100))
}

/// Forwards one tick to the reporter each time the quantized percentage of an
/// operation strictly increases.
///
/// Create one per sync/delete invocation; the baseline starts at zero.
pub struct ProgressReporter<'a> {
    reporter: &'a dyn Reporter,
    last_percent: AtomicU32,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(reporter: &'a dyn Reporter) -> Self {
        Self {
            reporter,
            last_percent: AtomicU32::new(0),
        }
    }

    /// Returns the new percentage if this observation produced a tick.
    pub fn observe(&self, progress: TransferProgress) -> Option<u32> {
        let current = quantized_percent(progress)?;
        let previous = self.last_percent.fetch_max(current, Ordering::SeqCst);
        if current > previous {
            self.reporter.tick();
            Some(current)
        } else {
            None
        }
    }

    pub fn last_percent(&self) -> u32 {
        self.last_percent.load(Ordering::SeqCst)
    }

    /// Observe every update until the transfer drops its sender.
    pub async fn drain(&self, mut receiver: UnboundedReceiver<TransferProgress>) {
        while let Some(progress) = receiver.recv().await {
            self.observe(progress);
        }
    }
}
