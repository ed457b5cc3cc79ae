//! Interactive edits and undo.
//!
//! An edit works on a private copy of the live mesh. While the user drags,
//! the tool re-runs its operation on that copy as often as it likes; on
//! release it either commits, swapping the copy in and getting an
//! [`UndoRecord`], or aborts and leaves the live mesh untouched.
//!
//! ```
//! use polymesh::mesh::{shapes, PolyMesh};
//! use polymesh::ops::{ExtrudeOptions, Operation};
//! use polymesh::session::EditSession;
//!
//! let mut live: PolyMesh = shapes::cube(1.0);
//! let mut sel = vec![false; 6];
//! sel[1] = true;
//!
//! let mut session = EditSession::begin(&live);
//! for distance in [0.1, 0.2, 0.3] {
//!     let op = Operation::ExtrudeFaces(ExtrudeOptions::default().with_distance(distance));
//!     session.reapply(&op, &sel).unwrap();
//! }
//! let record = session.commit(&mut live).unwrap();
//! assert_eq!(live.num_faces(), 10);
//!
//! record.undo(&mut live);
//! assert_eq!(live.num_faces(), 6);
//! ```

use crate::error::{MeshError, Result};
use crate::mesh::{MeshIndex, PolyMesh};
use crate::ops::Operation;

/// A pending edit on a copy of the live mesh.
#[derive(Debug)]
pub struct EditSession<I: MeshIndex = u32> {
    original: PolyMesh<I>,
    working: PolyMesh<I>,
}

impl<I: MeshIndex> EditSession<I> {
    /// Start editing a duplicate of `live`.
    pub fn begin(live: &PolyMesh<I>) -> Self {
        Self {
            original: live.duplicate(),
            working: live.duplicate(),
        }
    }

    /// The mesh being edited.
    pub fn working(&self) -> &PolyMesh<I> {
        &self.working
    }

    /// Mutable access to the mesh being edited.
    pub fn working_mut(&mut self) -> &mut PolyMesh<I> {
        &mut self.working
    }

    /// Whether the working copy differs from the mesh the session began with.
    pub fn is_modified(&self) -> bool {
        self.working.version() != self.original.version()
    }

    /// Apply `op` on top of the current working copy.
    pub fn apply(&mut self, op: &Operation, selection: &[bool]) -> Result<Vec<bool>> {
        op.apply(&mut self.working, selection)
    }

    /// Throw away earlier changes and apply `op` to a fresh copy.
    ///
    /// `selection` refers to the mesh the session began with. On error the
    /// working copy is left as the original.
    pub fn reapply(&mut self, op: &Operation, selection: &[bool]) -> Result<Vec<bool>> {
        self.working = self.original.duplicate();
        op.apply(&mut self.working, selection)
    }

    /// Swap the working copy into `live`.
    ///
    /// Fails, leaving `live` alone, if `live` was changed by someone else
    /// since the session began.
    pub fn commit(self, live: &mut PolyMesh<I>) -> Result<UndoRecord<I>> {
        if live.version() != self.original.version() {
            return Err(MeshError::illegal(
                "commit",
                "the live mesh changed while the edit was in progress",
            ));
        }
        let before = std::mem::replace(live, self.working);
        log::debug!(
            "committed edit: {} -> {} faces",
            before.num_faces(),
            live.num_faces()
        );
        Ok(UndoRecord {
            before,
            after: live.duplicate(),
        })
    }

    /// Discard the working copy.
    pub fn abort(self) {
        log::debug!("edit aborted");
    }
}

/// Full snapshots on either side of a committed edit.
#[derive(Debug, Clone)]
pub struct UndoRecord<I: MeshIndex = u32> {
    /// The mesh before the edit.
    pub before: PolyMesh<I>,
    /// The mesh after the edit.
    pub after: PolyMesh<I>,
}

impl<I: MeshIndex> UndoRecord<I> {
    /// Restore the state before the edit.
    pub fn undo(&self, live: &mut PolyMesh<I>) {
        *live = self.before.duplicate();
    }

    /// Restore the state after the edit.
    pub fn redo(&self, live: &mut PolyMesh<I>) {
        *live = self.after.duplicate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{shapes, VertexId};
    use crate::ops::ExtrudeOptions;
    use nalgebra::Point3;

    fn top_face() -> Vec<bool> {
        let mut sel = vec![false; 6];
        sel[1] = true;
        sel
    }

    #[test]
    fn test_commit_and_undo() {
        let mut live: PolyMesh = shapes::cube(1.0);
        let snapshot = live.duplicate();
        let mut session = EditSession::begin(&live);
        assert!(!session.is_modified());
        session
            .apply(&Operation::ExtrudeFaces(ExtrudeOptions::default()), &top_face())
            .unwrap();
        assert!(session.is_modified());
        assert_eq!(live.num_faces(), 6);

        let record = session.commit(&mut live).unwrap();
        assert_eq!(live.num_faces(), 10);
        record.undo(&mut live);
        assert!(live.structurally_eq(&snapshot));
        record.redo(&mut live);
        assert_eq!(live.num_faces(), 10);
    }

    #[test]
    fn test_abort_leaves_live_alone() {
        let live: PolyMesh = shapes::cube(1.0);
        let version = live.version();
        let mut session = EditSession::begin(&live);
        session.working_mut().set_position(VertexId::new(0), Point3::new(5.0, 5.0, 5.0));
        session.abort();
        assert_eq!(live.version(), version);
        assert_eq!(*live.position(VertexId::new(0)), Point3::new(-0.5, -0.5, -0.5));
    }

    #[test]
    fn test_reapply_starts_over() {
        let live: PolyMesh = shapes::cube(1.0);
        let mut session = EditSession::begin(&live);
        let op = Operation::ExtrudeFaces(ExtrudeOptions::default());
        session.reapply(&op, &top_face()).unwrap();
        session.reapply(&op, &top_face()).unwrap();
        assert_eq!(session.working().num_faces(), 10);

        let err = session.reapply(&Operation::DeleteFaces, &vec![true; 6]).unwrap_err();
        assert!(err.is_illegal_operation());
        assert!(session.working().structurally_eq(&live));
    }

    #[test]
    fn test_stale_commit_is_rejected() {
        let mut live: PolyMesh = shapes::cube(1.0);
        let session = EditSession::begin(&live);
        live.set_position(VertexId::new(1), Point3::new(1.0, 0.0, 0.0));
        let before = live.duplicate();
        let err = session.commit(&mut live).unwrap_err();
        assert!(err.is_illegal_operation());
        assert!(live.structurally_eq(&before));
    }
}
