use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

/// Progress reporting and cooperative cancellation for a run
pub trait Feedback {
    /// Called after stage `step` (1-based) completes
    fn set_current_step(&mut self, step: usize);

    fn is_canceled(&self) -> bool;
}

/// Shared cancel flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Feedback for CancellationToken {
    fn set_current_step(&mut self, step: usize) {
        debug!("Completed step {}/16", step);
    }

    fn is_canceled(&self) -> bool {
        CancellationToken::is_canceled(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancellationToken::new();
        let watcher = token.clone();
        assert!(!Feedback::is_canceled(&watcher));
        token.cancel();
        assert!(Feedback::is_canceled(&watcher));
    }
}
