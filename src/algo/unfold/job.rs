//! Unfolding on a worker thread.

use std::thread::{self, JoinHandle};

use super::{unfold_with_progress, UnfoldOptions, UnfoldResult};
use crate::algo::progress::{CancelToken, Progress};
use crate::error::Result;
use crate::mesh::{MeshIndex, PolyMesh};

/// A background unfold of a private copy of a mesh.
///
/// The live mesh is never touched: the result comes back through
/// [`join`](UnfoldJob::join) and the caller decides whether to attach it.
/// Cancelling makes the relaxation stop at its next iteration and `join`
/// return [`MeshError::Cancelled`](crate::error::MeshError::Cancelled).
pub struct UnfoldJob {
    handle: JoinHandle<Result<UnfoldResult>>,
    cancel: CancelToken,
}

impl UnfoldJob {
    /// Start unfolding a duplicate of `mesh`.
    pub fn spawn<I: MeshIndex>(mesh: &PolyMesh<I>, options: UnfoldOptions, progress: Progress) -> Self {
        Self::spawn_with_cancel(mesh, options, progress, CancelToken::new())
    }

    /// Start unfolding a duplicate of `mesh`, stopping when `cancel` fires.
    pub fn spawn_with_cancel<I: MeshIndex>(
        mesh: &PolyMesh<I>,
        options: UnfoldOptions,
        progress: Progress,
        cancel: CancelToken,
    ) -> Self {
        let copy = mesh.duplicate();
        let token = cancel.clone();
        let handle = thread::spawn(move || unfold_with_progress(&copy, &options, &progress, &token));
        Self { handle, cancel }
    }

    /// Ask the worker to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that cancels this job.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Whether the worker has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and take its result.
    ///
    /// A panic on the worker is resumed on the calling thread.
    pub fn join(self) -> Result<UnfoldResult> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MeshError;
    use crate::mesh::shapes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_job_unfolds_copy() {
        let mesh: PolyMesh = shapes::grid(4, 4, 1.0);
        let version = mesh.version();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let progress = Progress::new(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let job = UnfoldJob::spawn(&mesh, UnfoldOptions::default(), progress);
        assert!(!job.cancel_token().is_cancelled());
        let result = job.join().unwrap();
        assert_eq!(result.data.pieces.len(), 1);
        assert!(calls.load(Ordering::SeqCst) > 0);
        assert_eq!(mesh.version(), version);
        assert!(mesh.mapping_data().is_none());
    }

    #[test]
    fn test_cancelled_job() {
        let mesh: PolyMesh = shapes::grid(8, 8, 1.0);
        let token = CancelToken::new();
        token.cancel();
        let job = UnfoldJob::spawn_with_cancel(&mesh, UnfoldOptions::default(), Progress::none(), token);
        let err = job.join().unwrap_err();
        assert!(matches!(err, MeshError::Cancelled));
    }
}
