//! Half-edge polygon mesh.
//!
//! # Structure
//!
//! - Every edge is stored as two **half-edges**. With `E` edges the half-edge
//!   array has length `2E` and the twin of half-edge `i < E` is `i + E`, so edge
//!   index `i` names the pair `(i, i + E)`.
//! - A half-edge records the vertex it **points to**, the **next** half-edge
//!   around its face, its **twin**, its **face** (invalid on a hole) and a
//!   **smoothness** in `[0, 1]`. Both halves of a pair always carry the same
//!   smoothness.
//! - A vertex stores one **outgoing** half-edge (its reference edge). Boundary
//!   vertices reference an outgoing boundary half-edge.
//! - A face stores the half-edge pointing at its first vertex, so walking
//!   `next` from it enumerates the face's vertices in polygon order.
//!
//! # Boundary Handling
//!
//! Half-edges bounding a hole have an invalid face. Their `next` pointers link
//! them into loops around each hole, so the vertex fan walk
//! (`next(twin(e))`) covers boundary vertices as well.
//!
//! Topology is never edited in place. Operators go through
//! [`PolygonSoup`](super::PolygonSoup) and rebuild.

use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use nalgebra::{Point3, Vector3};

use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::algo::unfold::UVMappingData;

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

fn fresh_version() -> u64 {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

/// How the subdivision evaluator treats a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexKind {
    /// Regular vertex.
    #[default]
    None,
    /// Infinitely sharp point: never moved by subdivision.
    Corner,
}

/// Skeleton binding carried per vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinWeight {
    /// Joint index.
    pub joint: i32,
    /// Binding weight.
    pub weight: f64,
}

/// A vertex of a [`PolyMesh`].
#[derive(Debug, Clone)]
pub struct Vertex<I: MeshIndex = u32> {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,

    /// One outgoing half-edge.
    /// For boundary vertices this is a boundary half-edge.
    pub edge: HalfEdgeId<I>,

    /// Corner flag for subdivision.
    pub kind: VertexKind,

    /// Optional skeleton binding.
    pub skin: Option<SkinWeight>,
}

impl<I: MeshIndex> Vertex<I> {
    /// Create a new unconnected vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            edge: HalfEdgeId::invalid(),
            kind: VertexKind::None,
            skin: None,
        }
    }
}

/// A directed half-edge.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge<I: MeshIndex = u32> {
    /// The vertex this half-edge points to.
    pub vertex: VertexId<I>,

    /// The next half-edge around the face (or hole).
    pub next: HalfEdgeId<I>,

    /// The opposite half-edge.
    pub twin: HalfEdgeId<I>,

    /// The face this half-edge belongs to, invalid on a hole.
    pub face: FaceId<I>,

    /// Crease control: 0 is fully creased, 1 fully smooth.
    pub smoothness: f32,
}

impl<I: MeshIndex> HalfEdge<I> {
    /// Create a new unlinked half-edge.
    pub fn new() -> Self {
        Self {
            vertex: VertexId::invalid(),
            next: HalfEdgeId::invalid(),
            twin: HalfEdgeId::invalid(),
            face: FaceId::invalid(),
            smoothness: 1.0,
        }
    }

    /// Check if this half-edge bounds a hole.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        !self.face.is_valid()
    }
}

impl<I: MeshIndex> Default for HalfEdge<I> {
    fn default() -> Self {
        Self::new()
    }
}

/// A face of a [`PolyMesh`].
#[derive(Debug, Clone, Copy)]
pub struct Face<I: MeshIndex = u32> {
    /// The half-edge pointing at the face's first vertex.
    pub edge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Face<I> {
    /// Create a new face with the given half-edge.
    pub fn new(edge: HalfEdgeId<I>) -> Self {
        Self { edge }
    }
}

bitflags! {
    /// Planes a live mirror reflects the mesh across.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MirrorState: u8 {
        /// Reflect across the XY plane (negate z).
        const XY = 0b001;
        /// Reflect across the XZ plane (negate y).
        const XZ = 0b010;
        /// Reflect across the YZ plane (negate x).
        const YZ = 0b100;
    }
}

impl MirrorState {
    /// Axis negated by a single-plane mirror, or `None` for combined flags.
    pub fn axis(self) -> Option<usize> {
        if self == MirrorState::XY {
            Some(2)
        } else if self == MirrorState::XZ {
            Some(1)
        } else if self == MirrorState::YZ {
            Some(0)
        } else {
            None
        }
    }
}

/// Surface the editor derives from the control mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SmoothingMethod {
    /// The control mesh is the render mesh.
    None,
    /// Flat control mesh with smoothed normals.
    Shading,
    /// Catmull-Clark style approximating subdivision.
    #[default]
    Approximating,
    /// Subdivision through the original control points.
    Interpolating,
}

/// Ranges used to derive edge smoothness from dihedral angles.
///
/// Edges whose faces meet at `min_angle` degrees or flatter get
/// `max_smoothness`; edges at `max_angle` or sharper get `min_smoothness`;
/// in between the value is interpolated linearly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlledSmoothing {
    /// Dihedral angle (degrees) up to which edges stay fully smooth.
    pub min_angle: f64,
    /// Dihedral angle (degrees) from which edges get `min_smoothness`.
    pub max_angle: f64,
    /// Smoothness assigned to sharp edges.
    pub min_smoothness: f32,
    /// Smoothness assigned to flat edges.
    pub max_smoothness: f32,
}

impl Default for ControlledSmoothing {
    fn default() -> Self {
        Self {
            min_angle: 0.0,
            max_angle: 90.0,
            min_smoothness: 0.0,
            max_smoothness: 1.0,
        }
    }
}

impl ControlledSmoothing {
    /// Set the angle range in degrees.
    pub fn with_angles(mut self, min_angle: f64, max_angle: f64) -> Self {
        self.min_angle = min_angle;
        self.max_angle = max_angle;
        self
    }

    /// Set the smoothness range.
    pub fn with_smoothness(mut self, min_smoothness: f32, max_smoothness: f32) -> Self {
        self.min_smoothness = min_smoothness;
        self.max_smoothness = max_smoothness;
        self
    }

    /// Smoothness for a dihedral angle given in degrees, clamped to `[0, 1]`.
    pub fn smoothness_for_angle(&self, angle: f64) -> f32 {
        let s = if angle <= self.min_angle {
            self.max_smoothness
        } else if angle >= self.max_angle || self.max_angle <= self.min_angle {
            self.min_smoothness
        } else {
            let t = ((angle - self.min_angle) / (self.max_angle - self.min_angle)) as f32;
            self.max_smoothness + (self.min_smoothness - self.max_smoothness) * t
        };
        s.clamp(0.0, 1.0)
    }
}

/// A half-edge polygon mesh with the editor state attached to it.
#[derive(Debug, Clone)]
pub struct PolyMesh<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Vertex<I>>,
    pub(crate) halfedges: Vec<HalfEdge<I>>,
    pub(crate) faces: Vec<Face<I>>,

    /// One flag per edge pair.
    pub(crate) seams: Vec<bool>,

    pub(crate) mirror: MirrorState,
    pub(crate) smoothing_method: SmoothingMethod,
    pub(crate) controlled: ControlledSmoothing,
    pub(crate) controlled_enabled: bool,
    pub(crate) interactive_level: usize,
    pub(crate) render_level: usize,
    pub(crate) mapping: Option<UVMappingData>,

    version: u64,
}

impl<I: MeshIndex> Default for PolyMesh<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> PolyMesh<I> {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            halfedges: Vec::new(),
            faces: Vec::new(),
            seams: Vec::new(),
            mirror: MirrorState::empty(),
            smoothing_method: SmoothingMethod::default(),
            controlled: ControlledSmoothing::default(),
            controlled_enabled: false,
            interactive_level: 1,
            render_level: 2,
            mapping: None,
            version: fresh_version(),
        }
    }

    /// Deep copy of topology, geometry and editor state.
    ///
    /// The copy shares no storage with `self` and carries the same version
    /// token, since it describes the same surface.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Token identifying the current content. Renewed by every mutation.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Mark the mesh as modified.
    pub(crate) fn touch(&mut self) {
        self.version = fresh_version();
    }

    /// Take over the topology of `rebuilt` while keeping editor settings.
    ///
    /// Mapping data refers to the old vertex numbering and is dropped.
    pub(crate) fn replace_topology(&mut self, rebuilt: PolyMesh<I>) {
        self.vertices = rebuilt.vertices;
        self.halfedges = rebuilt.halfedges;
        self.faces = rebuilt.faces;
        self.seams = rebuilt.seams;
        self.mapping = None;
        self.touch();
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of half-edges (twice the edge count).
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of edges (half-edge pairs).
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.halfedges.len() / 2
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex<I> {
        &self.vertices[id.index()]
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId<I>) -> &HalfEdge<I> {
        &self.halfedges[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    /// All vertices, indexable by `VertexId::index`.
    pub fn vertex_slice(&self) -> &[Vertex<I>] {
        &self.vertices
    }

    /// All half-edges.
    pub fn halfedge_slice(&self) -> &[HalfEdge<I>] {
        &self.halfedges
    }

    /// All faces.
    pub fn face_slice(&self) -> &[Face<I>] {
        &self.faces
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// All vertex positions in index order.
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    /// Set the position of a vertex.
    pub fn set_position(&mut self, v: VertexId<I>, pos: Point3<f64>) {
        self.vertices[v.index()].position = pos;
        self.touch();
    }

    /// Replace all vertex positions.
    ///
    /// # Panics
    /// Panics if `positions` does not have one entry per vertex.
    pub fn set_vertex_positions(&mut self, positions: &[Point3<f64>]) {
        assert_eq!(positions.len(), self.vertices.len(), "position count mismatch");
        for (v, p) in self.vertices.iter_mut().zip(positions) {
            v.position = *p;
        }
        self.touch();
    }

    /// Set the corner flag of a vertex.
    pub fn set_vertex_kind(&mut self, v: VertexId<I>, kind: VertexKind) {
        self.vertices[v.index()].kind = kind;
        self.touch();
    }

    /// Mark or clear a vertex as a subdivision corner.
    pub fn set_corner(&mut self, v: VertexId<I>, corner: bool) {
        let kind = if corner { VertexKind::Corner } else { VertexKind::None };
        self.set_vertex_kind(v, kind);
    }

    /// Attach a skin binding to a vertex.
    pub fn set_skin(&mut self, v: VertexId<I>, skin: Option<SkinWeight>) {
        self.vertices[v.index()].skin = skin;
        self.touch();
    }

    // ==================== Editor state ====================

    /// Live mirror planes.
    pub fn mirror_state(&self) -> MirrorState {
        self.mirror
    }

    /// Set the live mirror planes.
    pub fn set_mirror_state(&mut self, state: MirrorState) {
        self.mirror = state;
        self.touch();
    }

    /// Smoothing method of the derived surface.
    pub fn smoothing_method(&self) -> SmoothingMethod {
        self.smoothing_method
    }

    /// Set the smoothing method.
    pub fn set_smoothing_method(&mut self, method: SmoothingMethod) {
        self.smoothing_method = method;
        self.touch();
    }

    /// Controlled-smoothing ranges.
    pub fn controlled_smoothing(&self) -> &ControlledSmoothing {
        &self.controlled
    }

    /// Whether edge smoothness is derived from dihedral angles.
    pub fn is_controlled_smoothing(&self) -> bool {
        self.controlled_enabled
    }

    /// Configure controlled smoothing.
    pub fn set_controlled_smoothing(&mut self, params: ControlledSmoothing, enabled: bool) {
        self.controlled = params;
        self.controlled_enabled = enabled;
        self.touch();
    }

    /// Recursion depth of the live preview surface.
    pub fn interactive_smooth_level(&self) -> usize {
        self.interactive_level
    }

    /// Set the preview recursion depth.
    pub fn set_interactive_smooth_level(&mut self, level: usize) {
        self.interactive_level = level;
        self.touch();
    }

    /// Recursion depth used for final rendering.
    pub fn render_smooth_level(&self) -> usize {
        self.render_level
    }

    /// Set the render recursion depth.
    pub fn set_render_smooth_level(&mut self, level: usize) {
        self.render_level = level;
        self.touch();
    }

    /// Texture layout produced by the unfold engine, if any.
    pub fn mapping_data(&self) -> Option<&UVMappingData> {
        self.mapping.as_ref()
    }

    /// Mutable access for an external UV editor.
    pub fn mapping_data_mut(&mut self) -> Option<&mut UVMappingData> {
        self.mapping.as_mut()
    }

    /// Attach or clear texture layout data.
    pub fn set_mapping_data(&mut self, data: Option<UVMappingData>) {
        self.mapping = data;
    }

    // ==================== Topology Queries ====================

    /// Get the twin (opposite) half-edge.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).twin
    }

    /// Get the next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).next
    }

    /// Get the previous half-edge around the face by walking the loop.
    pub fn prev(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        let mut cur = he;
        loop {
            let n = self.next(cur);
            if n == he {
                return cur;
            }
            cur = n;
        }
    }

    /// Get the vertex a half-edge points to.
    #[inline]
    pub fn target(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).vertex
    }

    /// Get the vertex a half-edge leaves from.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.target(self.twin(he))
    }

    /// Get the face of a half-edge.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId<I>) -> FaceId<I> {
        self.halfedge(he).face
    }

    /// Smoothness of a half-edge.
    #[inline]
    pub fn smoothness(&self, he: HalfEdgeId<I>) -> f32 {
        self.halfedge(he).smoothness
    }

    /// Edge pair a half-edge belongs to.
    #[inline]
    pub fn edge_of(&self, he: HalfEdgeId<I>) -> EdgeId<I> {
        let e = self.num_edges();
        let i = he.index();
        EdgeId::new(if i < e { i } else { i - e })
    }

    /// Primary half-edge of an edge pair.
    #[inline]
    pub fn edge_halfedge(&self, e: EdgeId<I>) -> HalfEdgeId<I> {
        HalfEdgeId::new(e.index())
    }

    /// Both endpoints of an edge pair.
    pub fn edge_vertices(&self, e: EdgeId<I>) -> [VertexId<I>; 2] {
        let he = self.edge_halfedge(e);
        [self.origin(he), self.target(he)]
    }

    /// Set the smoothness of an edge on both halves, clamped to `[0, 1]`.
    pub fn set_smoothness(&mut self, e: EdgeId<I>, smoothness: f32) {
        let s = smoothness.clamp(0.0, 1.0);
        let he = self.edge_halfedge(e);
        let twin = self.twin(he);
        self.halfedges[he.index()].smoothness = s;
        self.halfedges[twin.index()].smoothness = s;
        self.touch();
    }

    /// Whether an edge is marked as an unfold seam.
    pub fn is_seam(&self, e: EdgeId<I>) -> bool {
        self.seams.get(e.index()).copied().unwrap_or(false)
    }

    /// Seam flags, one per edge.
    pub fn seams(&self) -> &[bool] {
        &self.seams
    }

    /// Mark or clear an unfold seam.
    pub fn set_seam(&mut self, e: EdgeId<I>, seam: bool) {
        self.seams[e.index()] = seam;
        self.touch();
    }

    /// Clear all seams.
    pub fn clear_seams(&mut self) {
        self.seams.iter_mut().for_each(|s| *s = false);
        self.touch();
    }

    /// Check if a half-edge bounds a hole.
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        self.halfedge(he).is_boundary()
    }

    /// Check if an edge lies on a hole.
    #[inline]
    pub fn is_boundary_edge(&self, e: EdgeId<I>) -> bool {
        let he = self.edge_halfedge(e);
        self.is_boundary_halfedge(he) || self.is_boundary_halfedge(self.twin(he))
    }

    /// Check if a vertex is on the boundary.
    pub fn is_boundary_vertex(&self, v: VertexId<I>) -> bool {
        self.vertex_halfedges(v).any(|he| self.is_boundary_halfedge(he))
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all half-edge IDs.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        (0..self.halfedges.len()).map(HalfEdgeId::new)
    }

    /// Iterate over all edge IDs.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId<I>> + '_ {
        (0..self.num_edges()).map(EdgeId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Iterate over the outgoing half-edges of a vertex in fan order.
    pub fn vertex_halfedges(&self, v: VertexId<I>) -> VertexHalfEdgeIter<'_, I> {
        VertexHalfEdgeIter::new(self, v)
    }

    /// Outgoing half-edges of a vertex, or `None` when the fan walk does not
    /// reach every edge incident to the vertex (non-manifold vertex).
    pub fn vertex_edges(&self, v: VertexId<I>) -> Option<Vec<HalfEdgeId<I>>> {
        let fan: Vec<HalfEdgeId<I>> = self.vertex_halfedges(v).collect();
        let incident = self
            .halfedges
            .iter()
            .filter(|he| he.vertex == v)
            .count();
        (fan.len() == incident).then_some(fan)
    }

    /// Iterate over vertices adjacent to a vertex.
    pub fn vertex_neighbors(&self, v: VertexId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertex_halfedges(v).map(|he| self.target(he))
    }

    /// Iterate over faces adjacent to a vertex.
    pub fn vertex_faces(&self, v: VertexId<I>) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.vertex_halfedges(v)
            .map(|he| self.face_of(he))
            .filter(|f| f.is_valid())
    }

    /// Iterate over half-edges around a face.
    pub fn face_halfedges(&self, f: FaceId<I>) -> FaceHalfEdgeIter<'_, I> {
        FaceHalfEdgeIter::new(self, self.face(f).edge)
    }

    /// Iterate over the vertices of a face in polygon order.
    pub fn face_vertices(&self, f: FaceId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.face_halfedges(f).map(|he| self.target(he))
    }

    /// Edge pairs around a face, in the same order as its half-edges.
    pub fn face_edges(&self, f: FaceId<I>) -> impl Iterator<Item = EdgeId<I>> + '_ {
        self.face_halfedges(f).map(|he| self.edge_of(he))
    }

    /// Number of vertices of a face.
    pub fn face_degree(&self, f: FaceId<I>) -> usize {
        self.face_halfedges(f).count()
    }

    /// Half-edge from `a` to `b`, if the two vertices are adjacent.
    pub fn find_halfedge(&self, a: VertexId<I>, b: VertexId<I>) -> Option<HalfEdgeId<I>> {
        self.vertex_halfedges(a).find(|&he| self.target(he) == b)
    }

    /// Edge between two vertices, if any.
    pub fn find_edge(&self, a: VertexId<I>, b: VertexId<I>) -> Option<EdgeId<I>> {
        self.find_halfedge(a, b).map(|he| self.edge_of(he))
    }

    /// Every hole as a loop of boundary half-edges, ordered by `next`.
    pub fn boundary_loops(&self) -> Vec<Vec<HalfEdgeId<I>>> {
        let mut visited = vec![false; self.halfedges.len()];
        let mut loops = Vec::new();
        for he in self.halfedge_ids() {
            if visited[he.index()] || !self.is_boundary_halfedge(he) {
                continue;
            }
            let mut ring = Vec::new();
            let mut cur = he;
            while !visited[cur.index()] {
                visited[cur.index()] = true;
                ring.push(cur);
                cur = self.next(cur);
            }
            loops.push(ring);
        }
        loops
    }

    // ==================== Geometry ====================

    /// Area-scaled normal of a face using Newell's method.
    pub fn face_normal_raw(&self, f: FaceId<I>) -> Vector3<f64> {
        let pts: Vec<Point3<f64>> = self.face_vertices(f).map(|v| *self.position(v)).collect();
        newell_normal(&pts)
    }

    /// Unit normal of a face. Zero for degenerate faces.
    pub fn face_normal(&self, f: FaceId<I>) -> Vector3<f64> {
        self.face_normal_raw(f)
            .try_normalize(1e-15)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Area of a (planar) face.
    pub fn face_area(&self, f: FaceId<I>) -> f64 {
        0.5 * self.face_normal_raw(f).norm()
    }

    /// Average of a face's vertex positions.
    pub fn face_centroid(&self, f: FaceId<I>) -> Point3<f64> {
        let mut sum = Vector3::zeros();
        let mut n = 0;
        for v in self.face_vertices(f) {
            sum += self.position(v).coords;
            n += 1;
        }
        Point3::from(sum / n.max(1) as f64)
    }

    /// Area-weighted normal at a vertex.
    pub fn vertex_normal(&self, v: VertexId<I>) -> Vector3<f64> {
        let mut normal = Vector3::zeros();
        for f in self.vertex_faces(v) {
            normal += self.face_normal_raw(f);
        }
        normal.try_normalize(1e-15).unwrap_or_else(Vector3::zeros)
    }

    /// Compute the length of a half-edge.
    pub fn edge_length(&self, he: HalfEdgeId<I>) -> f64 {
        self.edge_vector(he).norm()
    }

    /// Vector from origin to target.
    pub fn edge_vector(&self, he: HalfEdgeId<I>) -> Vector3<f64> {
        self.position(self.target(he)) - self.position(self.origin(he))
    }

    /// Compute the midpoint of a half-edge.
    pub fn edge_midpoint(&self, he: HalfEdgeId<I>) -> Point3<f64> {
        let p0 = self.position(self.origin(he));
        let p1 = self.position(self.target(he));
        Point3::from((p0.coords + p1.coords) * 0.5)
    }

    /// Number of edges at a vertex.
    pub fn valence(&self, v: VertexId<I>) -> usize {
        self.vertex_halfedges(v).count()
    }

    /// Dihedral angle across an edge in degrees (0 for flat), `None` on holes.
    pub fn dihedral_angle(&self, e: EdgeId<I>) -> Option<f64> {
        let he = self.edge_halfedge(e);
        let (f0, f1) = (self.face_of(he), self.face_of(self.twin(he)));
        if !f0.is_valid() || !f1.is_valid() {
            return None;
        }
        let cos = self.face_normal(f0).dot(&self.face_normal(f1)).clamp(-1.0, 1.0);
        Some(cos.acos().to_degrees())
    }

    /// Compute the bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?.position;
        let mut min = first;
        let mut max = first;
        for v in &self.vertices {
            for i in 0..3 {
                min[i] = min[i].min(v.position[i]);
                max[i] = max[i].max(v.position[i]);
            }
        }
        Some((min, max))
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    /// Check whether all faces are quads.
    pub fn is_quad_mesh(&self) -> bool {
        self.face_ids().all(|f| self.face_degree(f) == 4)
    }

    /// Check whether all faces are triangles.
    pub fn is_triangle_mesh(&self) -> bool {
        self.face_ids().all(|f| self.face_degree(f) == 3)
    }

    // ==================== Validation ====================

    /// Every violated structural invariant, as text. Empty for a sound mesh.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let nh = self.halfedges.len();
        let ne = nh / 2;
        if nh % 2 != 0 {
            problems.push(format!("odd half-edge count {}", nh));
            return problems;
        }
        if self.seams.len() != ne {
            problems.push(format!("{} seam flags for {} edges", self.seams.len(), ne));
        }

        for (i, he) in self.halfedges.iter().enumerate() {
            let twin = he.twin.index();
            let expected = if i < ne { i + ne } else { i - ne };
            if twin != expected {
                problems.push(format!("half-edge {} has twin {}, expected {}", i, twin, expected));
                continue;
            }
            if self.halfedges[twin].twin.index() != i {
                problems.push(format!("twin of half-edge {} does not point back", i));
            }
            if he.vertex.index() >= self.vertices.len() {
                problems.push(format!("half-edge {} targets missing vertex", i));
            }
            if he.next.index() >= nh {
                problems.push(format!("half-edge {} has no next", i));
            } else if self.origin(he.next) != he.vertex {
                problems.push(format!("half-edge {} is not continued by its next", i));
            }
            if he.smoothness != self.halfedges[twin].smoothness {
                problems.push(format!("edge {} has asymmetric smoothness", i.min(twin)));
            }
            if !(0.0..=1.0).contains(&he.smoothness) {
                problems.push(format!("half-edge {} smoothness out of range", i));
            }
        }
        if !problems.is_empty() {
            return problems;
        }

        for (fi, f) in self.faces.iter().enumerate() {
            let start = f.edge;
            let mut cur = start;
            let mut count = 0;
            loop {
                if self.halfedges[cur.index()].face.index() != fi {
                    problems.push(format!("face {} loop leaves the face", fi));
                    break;
                }
                count += 1;
                cur = self.next(cur);
                if cur == start || count > nh {
                    break;
                }
            }
            if count > nh {
                problems.push(format!("face {} loop does not close", fi));
            } else if count < 3 {
                problems.push(format!("face {} has {} sides", fi, count));
            }
        }

        let mut incoming = vec![0usize; self.vertices.len()];
        for he in &self.halfedges {
            incoming[he.vertex.index()] += 1;
        }
        for (vi, v) in self.vertices.iter().enumerate() {
            let vid = VertexId::new(vi);
            if !v.edge.is_valid() {
                problems.push(format!("vertex {} is isolated", vi));
                continue;
            }
            if self.origin(v.edge) != vid {
                problems.push(format!("vertex {} reference edge is not incident", vi));
                continue;
            }
            let fan = self.vertex_halfedges(vid).take(nh + 1).count();
            if fan != incoming[vi] {
                problems.push(format!("vertex {} is non-manifold", vi));
            }
        }
        problems
    }

    /// Check if the mesh satisfies all structural invariants.
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Same positions, same edge topology, same face loops.
    pub fn structurally_eq(&self, other: &PolyMesh<I>) -> bool {
        if self.vertices.len() != other.vertices.len()
            || self.halfedges.len() != other.halfedges.len()
            || self.faces.len() != other.faces.len()
        {
            return false;
        }
        let vertices_match = self
            .vertices
            .iter()
            .zip(&other.vertices)
            .all(|(a, b)| a.position == b.position && a.edge == b.edge && a.kind == b.kind);
        let edges_match = self.halfedges.iter().zip(&other.halfedges).all(|(a, b)| {
            a.vertex == b.vertex
                && a.next == b.next
                && a.twin == b.twin
                && a.face == b.face
                && a.smoothness == b.smoothness
        });
        let faces_match = self.faces.iter().zip(&other.faces).all(|(a, b)| a.edge == b.edge);
        vertices_match && edges_match && faces_match && self.seams == other.seams
    }
}

/// Area-scaled polygon normal (Newell's method).
pub fn newell_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

/// Iterator over outgoing half-edges around a vertex.
pub struct VertexHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a PolyMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> VertexHalfEdgeIter<'a, I> {
    fn new(mesh: &'a PolyMesh<I>, v: VertexId<I>) -> Self {
        let start = mesh.vertex(v).edge;
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for VertexHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;

        // twin(he) points back at the vertex; the half-edge after it leaves
        // the vertex again, in the neighbouring face or hole.
        self.current = self.mesh.next(self.mesh.twin(self.current));

        if self.current == self.start {
            self.done = true;
        }

        Some(result)
    }
}

/// Iterator over half-edges around a face or hole.
pub struct FaceHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a PolyMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> FaceHalfEdgeIter<'a, I> {
    /// Walk the `next` loop starting at `start`.
    pub fn new(mesh: &'a PolyMesh<I>, start: HalfEdgeId<I>) -> Self {
        Self {
            mesh,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for FaceHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;
        self.current = self.mesh.next(self.current);

        if self.current == self.start {
            self.done = true;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_polygons, shapes};

    #[test]
    fn test_empty_mesh() {
        let mesh = PolyMesh::<u32>::new();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_halfedges(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_twin_layout() {
        let mesh: PolyMesh = shapes::cube(1.0);
        let e = mesh.num_edges();
        assert_eq!(e, 12);
        for i in 0..e {
            let he = HalfEdgeId::new(i);
            assert_eq!(mesh.twin(he).index(), i + e);
            assert_eq!(mesh.twin(mesh.twin(he)), he);
            assert_eq!(mesh.edge_of(mesh.twin(he)).index(), i);
        }
    }

    #[test]
    fn test_face_loops_close() {
        let mesh: PolyMesh = shapes::cube(1.0);
        for f in mesh.face_ids() {
            let loop_edges: Vec<_> = mesh.face_halfedges(f).collect();
            assert_eq!(loop_edges.len(), 4);
            assert_eq!(mesh.next(*loop_edges.last().unwrap()), loop_edges[0]);
        }
    }

    #[test]
    fn test_face_vertices_keep_polygon_order() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh: PolyMesh = build_from_polygons(&positions, &[vec![2, 3, 0, 1]]).unwrap();
        let order: Vec<usize> = mesh
            .face_vertices(FaceId::new(0))
            .map(|v| v.index())
            .collect();
        assert_eq!(order, vec![2, 3, 0, 1]);
    }

    #[test]
    fn test_vertex_fan_on_boundary() {
        let mesh: PolyMesh = shapes::grid(2, 2, 1.0);
        // Corner vertex of a 2x2 grid: two edges, one face.
        let corner = VertexId::new(0);
        assert_eq!(mesh.valence(corner), 2);
        assert_eq!(mesh.vertex_faces(corner).count(), 1);
        assert!(mesh.is_boundary_vertex(corner));
        // Center vertex: four edges, interior.
        let center = VertexId::new(4);
        assert_eq!(mesh.valence(center), 4);
        assert!(!mesh.is_boundary_vertex(center));
        assert_eq!(mesh.vertex_edges(center).map(|e| e.len()), Some(4));
    }

    #[test]
    fn test_duplicate_is_structurally_equal() {
        let mesh: PolyMesh = shapes::cube(2.0);
        let copy = mesh.duplicate();
        assert!(copy.structurally_eq(&mesh));
        assert_eq!(copy.version(), mesh.version());

        let mut moved = mesh.duplicate();
        moved.set_position(VertexId::new(0), Point3::new(9.0, 9.0, 9.0));
        assert!(!moved.structurally_eq(&mesh));
        assert_ne!(moved.version(), mesh.version());
        // The original is untouched.
        assert!(mesh.position(VertexId::new(0)).x < 9.0);
    }

    #[test]
    fn test_smoothness_clamped_and_symmetric() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let e = EdgeId::new(3);
        mesh.set_smoothness(e, 1.7);
        let he = mesh.edge_halfedge(e);
        assert_eq!(mesh.smoothness(he), 1.0);
        mesh.set_smoothness(e, -0.2);
        assert_eq!(mesh.smoothness(he), 0.0);
        assert_eq!(mesh.smoothness(mesh.twin(he)), 0.0);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_find_edge_and_boundary_loops() {
        let mesh: PolyMesh = shapes::grid(3, 1, 1.0);
        let a = VertexId::new(0);
        let b = VertexId::new(1);
        let e = mesh.find_edge(a, b).unwrap();
        assert!(mesh.is_boundary_edge(e));
        let loops = mesh.boundary_loops();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 8);
    }

    #[test]
    fn test_dihedral_angle() {
        let mesh: PolyMesh = shapes::cube(1.0);
        for e in mesh.edge_ids() {
            let angle = mesh.dihedral_angle(e).unwrap();
            assert!((angle - 90.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_controlled_smoothing_ramp() {
        let params = ControlledSmoothing::default().with_angles(10.0, 50.0);
        assert_eq!(params.smoothness_for_angle(5.0), 1.0);
        assert_eq!(params.smoothness_for_angle(60.0), 0.0);
        assert!((params.smoothness_for_angle(30.0) - 0.5).abs() < 1e-6);

        let odd = ControlledSmoothing::default().with_smoothness(-1.0, 3.0);
        assert_eq!(odd.smoothness_for_angle(0.0), 1.0);
        assert_eq!(odd.smoothness_for_angle(180.0), 0.0);
    }

    #[test]
    fn test_mirror_axis() {
        assert_eq!(MirrorState::XY.axis(), Some(2));
        assert_eq!(MirrorState::YZ.axis(), Some(0));
        assert_eq!((MirrorState::XY | MirrorState::XZ).axis(), None);
    }
}
