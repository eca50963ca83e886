//! Cooperative stop signal for a running simulation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag asking a run to end at the next tick boundary.
///
/// Clones share the same flag, so a handle can be given to another thread
/// or kept by a test while the manager runs.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag. Called by the manager when a run ends.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
