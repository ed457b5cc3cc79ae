//! Subdivision surfaces derived from the control mesh.
//!
//! The smoothing method of a mesh decides what the editor shows:
//!
//! - [`SmoothingMethod::None`]: the control mesh itself.
//! - [`SmoothingMethod::Shading`]: the control mesh with averaged vertex
//!   normals. No new topology.
//! - [`SmoothingMethod::Approximating`]: Catmull-Clark refinement. Each level
//!   inserts a point per face and per edge and re-averages the original
//!   vertices. Per-edge smoothness blends between the smooth and the crease
//!   rules, and corner vertices never move.
//! - [`SmoothingMethod::Interpolating`]: the same refinement, but original
//!   vertices stay on their control positions.
//!
//! Each level turns an n-sided face into n quads, so after the first level
//! every face count quadruples.
//!
//! Refinement is a pure function of the control mesh and the options.
//! [`SubdivisionEvaluator`] keeps the last result around and hands it back
//! until the mesh version or the options change.
//!
//! # Example
//!
//! ```
//! use polymesh::algo::subdivide::{SubdivisionEvaluator, SubdivisionOptions};
//! use polymesh::mesh::{shapes, PolyMesh};
//!
//! let cube: PolyMesh = shapes::cube(1.0);
//! let mut evaluator = SubdivisionEvaluator::new();
//! let refined = evaluator.evaluate(&cube, &SubdivisionOptions::new(2)).unwrap();
//! assert_eq!(refined.mesh.num_faces(), 96);
//! ```
//!
//! # References
//!
//! - Catmull, E. & Clark, J. (1978). "Recursively generated B-spline surfaces
//!   on arbitrary topological meshes." Computer-Aided Design, 10(6), 350-355.
//! - DeRose, T., Kass, M. & Truong, T. (1998). "Subdivision surfaces in
//!   character animation." SIGGRAPH '98.

mod catmull_clark;

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::algo::Progress;
use crate::error::Result;
use crate::mesh::{ControlledSmoothing, EdgeId, MeshIndex, PolyMesh, SmoothingMethod, VertexId};

use catmull_clark::refine_once;

/// Options for subdivision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubdivisionOptions {
    /// Number of refinement levels.
    pub level: usize,

    /// Smoothing method to use instead of the mesh's own.
    pub method: Option<SmoothingMethod>,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for SubdivisionOptions {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SubdivisionOptions {
    /// Create options with the specified number of levels.
    pub fn new(level: usize) -> Self {
        Self {
            level,
            method: None,
            parallel: true,
        }
    }

    /// Options matching the mesh's interactive preview.
    pub fn interactive<I: MeshIndex>(mesh: &PolyMesh<I>) -> Self {
        Self::new(mesh.interactive_smooth_level())
    }

    /// Options matching the mesh's final render.
    pub fn render<I: MeshIndex>(mesh: &PolyMesh<I>) -> Self {
        Self::new(mesh.render_smooth_level())
    }

    /// Override the smoothing method.
    pub fn with_method(mut self, method: SmoothingMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// A refined surface and where its faces came from.
#[derive(Debug, Clone)]
pub struct RefinedMesh<I: MeshIndex = u32> {
    /// The refined mesh.
    pub mesh: PolyMesh<I>,
    /// Unit vertex normals of `mesh`.
    pub normals: Vec<Vector3<f64>>,
    /// For each face of `mesh`, the control face it lies on.
    pub face_parent: Vec<usize>,
}

/// Refine `mesh` according to `options`.
pub fn refine<I: MeshIndex>(mesh: &PolyMesh<I>, options: &SubdivisionOptions) -> Result<RefinedMesh<I>> {
    refine_with_progress(mesh, options, &Progress::none())
}

/// Refinement with progress reporting.
pub fn refine_with_progress<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    options: &SubdivisionOptions,
    progress: &Progress,
) -> Result<RefinedMesh<I>> {
    let method = options.method.unwrap_or_else(|| mesh.smoothing_method());
    let levels = match method {
        SmoothingMethod::None | SmoothingMethod::Shading => 0,
        SmoothingMethod::Approximating | SmoothingMethod::Interpolating => options.level,
    };
    let interpolate = method == SmoothingMethod::Interpolating;

    let mut current = mesh.duplicate();
    if mesh.is_controlled_smoothing() {
        apply_controlled_smoothing(&mut current, mesh.controlled_smoothing());
    }
    let mut face_parent: Vec<usize> = (0..mesh.num_faces()).collect();

    for level in 0..levels {
        progress.report(level, levels, "subdivision");
        let step = refine_once(&current, interpolate, options.parallel)?;
        face_parent = step.face_parent.iter().map(|&f| face_parent[f]).collect();
        current = step.mesh;
    }
    progress.report(levels, levels, "subdivision");

    let normals = vertex_normals(&current, options.parallel);
    Ok(RefinedMesh {
        mesh: current,
        normals,
        face_parent,
    })
}

fn vertex_normals<I: MeshIndex>(mesh: &PolyMesh<I>, parallel: bool) -> Vec<Vector3<f64>> {
    let n = mesh.num_vertices();
    if parallel {
        (0..n).into_par_iter().map(|v| mesh.vertex_normal(VertexId::new(v))).collect()
    } else {
        (0..n).map(|v| mesh.vertex_normal(VertexId::new(v))).collect()
    }
}

/// Caches the most recent refinement.
///
/// The cache is keyed by the mesh version and the options, so any edit to
/// the control mesh, including a settings change, forces a recompute.
#[derive(Debug)]
pub struct SubdivisionEvaluator<I: MeshIndex = u32> {
    last: Option<(u64, SubdivisionOptions, RefinedMesh<I>)>,
}

impl<I: MeshIndex> Default for SubdivisionEvaluator<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> SubdivisionEvaluator<I> {
    /// Create an evaluator with an empty cache.
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Refined surface of `mesh`, recomputed only when needed.
    pub fn evaluate(&mut self, mesh: &PolyMesh<I>, options: &SubdivisionOptions) -> Result<&RefinedMesh<I>> {
        let entry = match self.last.take() {
            Some(entry) if entry.0 == mesh.version() && entry.1 == *options => {
                log::debug!("subdivision cache hit at version {}", mesh.version());
                entry
            }
            _ => {
                log::debug!(
                    "refining {} faces to level {} at version {}",
                    mesh.num_faces(),
                    options.level,
                    mesh.version()
                );
                (mesh.version(), *options, refine(mesh, options)?)
            }
        };
        Ok(&self.last.insert(entry).2)
    }

    /// Whether the cached result matches `mesh` and `options`.
    pub fn is_current(&self, mesh: &PolyMesh<I>, options: &SubdivisionOptions) -> bool {
        matches!(&self.last, Some((version, opts, _)) if *version == mesh.version() && opts == options)
    }

    /// Drop the cached result.
    pub fn invalidate(&mut self) {
        self.last = None;
    }
}

/// Set every interior edge's smoothness from its dihedral angle.
///
/// Hole edges have no dihedral angle and keep their smoothness.
pub fn apply_controlled_smoothing<I: MeshIndex>(mesh: &mut PolyMesh<I>, params: &ControlledSmoothing) {
    let updates: Vec<(EdgeId<I>, f32)> = mesh
        .edge_ids()
        .filter_map(|e| mesh.dihedral_angle(e).map(|a| (e, params.smoothness_for_angle(a))))
        .collect();
    for (e, s) in updates {
        mesh.set_smoothness(e, s);
    }
}

/// Replace the control mesh by its refinement at `level`.
///
/// Meshes showing no subdivision are refined with the approximating rule.
/// Editor settings stay; the texture layout is dropped because the faces
/// it refers to are gone.
pub fn smooth_whole_mesh<I: MeshIndex>(mesh: &mut PolyMesh<I>, level: usize) -> Result<()> {
    if level == 0 {
        return Ok(());
    }
    let method = match mesh.smoothing_method() {
        SmoothingMethod::Interpolating => SmoothingMethod::Interpolating,
        _ => SmoothingMethod::Approximating,
    };
    let refined = refine(mesh, &SubdivisionOptions::new(level).with_method(method))?;
    log::info!(
        "smoothed mesh to {} faces ({} levels)",
        refined.mesh.num_faces(),
        level
    );
    mesh.replace_topology(refined.mesh);
    Ok(())
}
