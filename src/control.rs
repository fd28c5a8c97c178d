//! Cooperative cancellation and progress reporting for long-running passes

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Shared cancellation flag
///
/// Clones observe the same flag, so a caller can keep one handle and pass
/// another into an analyzer or filter.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; running loops stop at their next check
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Callback receiving the number of records handled so far
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// Cancellation token plus optional progress callback, checked at loop boundaries
#[derive(Clone, Default)]
pub struct RunControl {
    token: CancellationToken,
    progress: Option<ProgressFn>,
    interval: u64,
}

impl fmt::Debug for RunControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunControl")
            .field("token", &self.token)
            .field("progress", &self.progress.is_some())
            .field("interval", &self.interval)
            .finish()
    }
}

/// Default number of records between progress callbacks
pub const PROGRESS_INTERVAL: u64 = 100_000;

impl RunControl {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            progress: None,
            interval: PROGRESS_INTERVAL,
        }
    }

    /// Attach a progress callback, invoked every `interval` records
    pub fn with_progress(mut self, interval: u64, progress: ProgressFn) -> Self {
        self.interval = interval.max(1);
        self.progress = Some(progress);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True when cancellation has been requested
    #[inline]
    pub fn should_stop(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Report that `done` records have been handled
    #[inline]
    pub fn tick(&self, done: u64) {
        if let Some(progress) = &self.progress {
            if self.interval > 0 && done % self.interval == 0 {
                progress(done);
            }
        }
    }
}

/// Monotonic counter shared by parallel workers
#[derive(Debug, Default)]
pub(crate) struct Counter(AtomicU64);

impl Counter {
    /// Increment and return the new value
    #[inline]
    pub(crate) fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_token_clones_share_state() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_progress_interval() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let control = RunControl::default().with_progress(2, Arc::new(move |n: u64| sink.lock().unwrap().push(n)));
        for done in 1..=5 {
            control.tick(done);
        }
        assert_eq!(*seen.lock().unwrap(), vec![2, 4]);
    }

    #[test]
    fn test_counter_bump() {
        let counter = Counter::default();
        assert_eq!(counter.bump(), 1);
        assert_eq!(counter.bump(), 2);
        assert_eq!(counter.get(), 2);
    }
}
