//! Progress reporting and cancellation for long-running algorithms.
//!
//! # Example
//!
//! ```
//! use polymesh::algo::progress::{CancelToken, Progress};
//!
//! let progress = Progress::new(|current, total, message| {
//!     println!("[{}/{}] {}", current, total, message);
//! });
//! let cancel = CancelToken::new();
//! progress.report(0, 10, "relaxing");
//! assert!(!cancel.is_cancelled());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MeshError, Result};

/// A progress callback that receives updates during long-running operations.
///
/// The callback receives:
/// - `current`: Current step (0-based)
/// - `total`: Total number of steps
/// - `message`: Description of the current operation
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Report progress of a sub-step.
    ///
    /// Maps `[0, sub_total]` onto the slice `[range_current, range_current + 1]`
    /// of a `range_total`-step operation.
    #[inline]
    pub fn report_sub(
        &self,
        sub_current: usize,
        sub_total: usize,
        range_current: usize,
        range_total: usize,
        message: &str,
    ) {
        if sub_total == 0 || range_total == 0 {
            return;
        }
        let sub_fraction = (sub_current.min(sub_total) * 1000) / sub_total;
        (self.callback)(range_current * 1000 + sub_fraction, range_total * 1000, message);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

/// Shared flag a caller raises to stop a background computation.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MeshError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Report a step and bail out if the computation was cancelled.
pub fn checkpoint(
    progress: &Progress,
    cancel: &CancelToken,
    current: usize,
    total: usize,
    message: &str,
) -> Result<()> {
    cancel.check()?;
    progress.report(current, total, message);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_report_sub_scales() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |c, t, _| sink.lock().unwrap().push((c, t)));
        progress.report_sub(5, 10, 1, 4, "half of step one");
        progress.report_sub(3, 0, 1, 4, "ignored");
        assert_eq!(*seen.lock().unwrap(), vec![(1500, 4000)]);
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(MeshError::Cancelled)));
        assert!(checkpoint(&Progress::none(), &token, 0, 1, "x").is_err());
    }
}
