//! Shared plumbing for event producers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Callback a producer hands its normalized events to.
pub type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Wrap a closure as a [`Listener`].
pub fn listener<T, F>(f: F) -> Listener<T>
where
    F: Fn(T) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Teardown handle for a producer.
///
/// Clones share the same running flag. Once stopped, the producer emits
/// nothing more; stopping again has no effect.
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    running: Arc<AtomicBool>,
}

impl TrackerHandle {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop emission. Returns true only for the call that actually stopped it.
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }
}

impl Default for TrackerHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_idempotent() {
        let handle = TrackerHandle::new();
        let clone = handle.clone();

        assert!(handle.is_running());
        assert!(clone.stop());
        assert!(!handle.stop());
        assert!(!handle.is_running());
    }
}
