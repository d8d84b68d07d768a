use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::shared::constants::LOG_TARGET;

/// Diagnostic logger gated by the process-wide `setLogEnabled` flag.
///
/// Cloning shares the flag. Reads and writes are relaxed: a message racing a
/// toggle may go either way.
#[derive(Clone, Debug, Default)]
pub struct BridgeLog {
    enabled: Arc<AtomicBool>,
}

impl BridgeLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn set_enabled(&self, value: bool) {
        self.enabled.store(value, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn info(&self, message: &str) {
        if self.is_enabled() {
            log::info!(target: LOG_TARGET, "{message}");
        }
    }
}
