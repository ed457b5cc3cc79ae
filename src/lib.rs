//! # PolyMesh
//!
//! A half-edge polygon mesh kernel for interactive modelling.
//!
//! PolyMesh stores an editable control mesh of arbitrary polygons together
//! with the state a modeller attaches to it: per-edge smoothness (creases),
//! corner vertices, unfold seams, mirror planes and subdivision settings.
//! Around that store it provides:
//!
//! - **Topology operators** ([`ops`]): extrude, bevel, collapse, divide,
//!   merge, delete, mirror, stitch boundaries. Each takes a selection mask
//!   and returns the mask of what it produced.
//! - **Selection algorithms** ([`select`]): loops, strips, similar faces and
//!   edges, grow/shrink, tension falloff for soft moves.
//! - **Subdivision** ([`algo::subdivide`]): approximating and interpolating
//!   refinement honouring smoothness and corners, with a version-keyed cache.
//! - **Unfolding** ([`algo::unfold`]): seams to flat, relaxed texture layouts,
//!   optionally on a worker thread with cancellation.
//! - **Editing sessions** ([`session`]): snapshot, commit or abort, undo.
//! - **File formats** ([`io`]): native binary, OBJ, PLY, STL.
//!
//! ## Quick Start
//!
//! ```
//! use polymesh::prelude::*;
//!
//! let mut mesh: PolyMesh = shapes::cube(2.0);
//!
//! // Extrude the top face.
//! let mut top = vec![false; mesh.num_faces()];
//! top[1] = true;
//! let created = Operation::ExtrudeFaces(ExtrudeOptions::default().with_distance(0.5))
//!     .apply(&mut mesh, &top)
//!     .unwrap();
//! assert_eq!(mesh.num_faces(), 10);
//! assert_eq!(created.iter().filter(|&&s| s).count(), 1);
//!
//! // Look at the smooth surface.
//! let refined = refine(&mesh, &SubdivisionOptions::new(2)).unwrap();
//! assert_eq!(refined.mesh.num_faces(), 160);
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use polymesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(2.0, 0.5, 0.0),
//! ];
//! let faces = vec![vec![0, 1, 2, 3], vec![1, 4, 2]];
//!
//! let mesh: PolyMesh = build_from_polygons(&vertices, &faces).unwrap();
//! assert_eq!(mesh.num_edges(), 6);
//!
//! // Walk the fan around vertex 1.
//! let v = VertexId::new(1);
//! assert_eq!(mesh.vertex_neighbors(v).count(), 3);
//!
//! // Corners of the triangle.
//! let corners: Vec<_> = mesh.face_vertices(FaceId::new(1)).collect();
//! assert_eq!(corners.len(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;
pub mod ops;
pub mod select;
pub mod session;

/// Prelude module for convenient imports.
///
/// ```
/// use polymesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::subdivide::{refine, SubdivisionEvaluator, SubdivisionOptions};
    pub use crate::algo::unfold::{unfold, UnfoldOptions};
    pub use crate::algo::{CancelToken, Progress};
    pub use crate::error::{MeshError, Result, UnfoldFailure};
    pub use crate::mesh::{
        build_from_polygons, build_from_triangles, shapes, EdgeId, FaceId, HalfEdgeId, MeshIndex,
        MirrorState, PolyMesh, PolygonSoup, SmoothingMethod, VertexId,
    };
    pub use crate::ops::{ExtrudeOptions, MirrorOptions, Operation};
    pub use crate::select::{convert_selection, grow_selection, shrink_selection, SelectionMode};
    pub use crate::session::{EditSession, UndoRecord};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_tetrahedron() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];

        let faces = vec![
            [0, 2, 1], // bottom
            [0, 1, 3], // front
            [1, 2, 3], // right
            [2, 0, 3], // left
        ];

        let mesh: PolyMesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 4);
        // Closed: every half-edge has a face.
        assert_eq!(mesh.num_halfedges(), 12);
        assert!(mesh.is_valid());
        assert_eq!(mesh.check_report().euler_characteristic(), 2);

        for v in mesh.vertex_ids() {
            assert!(!mesh.is_boundary_vertex(v), "vertex {:?} should not be on boundary", v);
        }
    }

    #[test]
    fn test_edit_subdivide_unfold() {
        let mut live: PolyMesh = shapes::grid(2, 2, 1.0);
        let mut session = EditSession::begin(&live);
        let all = vec![true; 4];
        session
            .apply(&Operation::ExtrudeRegion(ExtrudeOptions::default().with_distance(0.5)), &all)
            .unwrap();
        let record = session.commit(&mut live).unwrap();
        assert!(live.is_valid());

        let mut cache = SubdivisionEvaluator::new();
        let faces = cache.evaluate(&live, &SubdivisionOptions::new(1)).unwrap().mesh.num_faces();
        assert_eq!(faces, live.num_faces() * 4);

        record.undo(&mut live);
        assert!(!cache.is_current(&live, &SubdivisionOptions::new(1)));
        let flat = unfold(&live, &UnfoldOptions::default().sequential()).unwrap();
        assert_eq!(flat.data.pieces.len(), 1);
    }
}
