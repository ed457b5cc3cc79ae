//! Mesh store.
//!
//! The primary type is [`PolyMesh`], a polygon mesh stored as half-edges with
//! per-edge smoothness, unfold seams and the editor settings that travel with
//! a mesh (mirror planes, smoothing method, subdivision levels, texture
//! layout).
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//! - [`EdgeId`] - Identifies a half-edge pair
//!
//! Selections, on the other hand, are plain `bool` masks indexed by entity
//! number, so they survive serialization and cross the operator boundary
//! without borrowing the mesh.
//!
//! # Construction
//!
//! ```
//! use polymesh::mesh::{build_from_polygons, PolyMesh};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let mesh: PolyMesh = build_from_polygons(&vertices, &[vec![0, 1, 2]]).unwrap();
//! assert_eq!(mesh.num_edges(), 3);
//! ```

mod builder;
mod check;
mod halfedge;
mod index;
pub mod shapes;

pub use builder::{
    build_from_polygons, build_from_quads, build_from_triangles, edge_key, to_face_vertex,
    EdgeAttrs, PolygonSoup, VertexAttrs,
};
pub use check::MeshReport;
pub use halfedge::{
    newell_normal, ControlledSmoothing, Face, FaceHalfEdgeIter, HalfEdge, MirrorState, PolyMesh,
    SkinWeight, SmoothingMethod, Vertex, VertexHalfEdgeIter, VertexKind,
};
pub use index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};
