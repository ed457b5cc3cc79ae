//! Unfolding meshes flat for texturing.
//!
//! Seams cut the mesh into pieces. Each piece is triangulated, laid flat
//! triangle by triangle using its true edge lengths, then relaxed with an
//! as-rigid-as-possible solver. The result is a [`UVMappingData`]: the
//! pieces plus one or more named layouts over them.
//!
//! A piece must be a topological disk. A closed surface, or a tube without
//! a seam along it, fails with [`UnfoldFailure::NonDiskIsland`] and can be
//! unfolded again after marking more seams.
//!
//! # Example
//!
//! ```
//! use polymesh::algo::unfold::{unfold, UnfoldOptions};
//! use polymesh::mesh::{shapes, PolyMesh};
//!
//! let sheet: PolyMesh = shapes::grid(4, 4, 0.25);
//! let result = unfold(&sheet, &UnfoldOptions::default()).unwrap();
//! assert_eq!(result.data.pieces.len(), 1);
//! assert!(result.residual < 1e-6);
//! ```
//!
//! [`UnfoldFailure::NonDiskIsland`]: crate::error::UnfoldFailure::NonDiskIsland

mod arap;
mod islands;
mod job;
mod layout;
mod mapping;

pub use job::UnfoldJob;
pub use mapping::{UVMappingData, UVMeshMapping, UnfoldedPiece};

use std::collections::HashSet;

use crate::algo::progress::{CancelToken, Progress};
use crate::error::{MeshError, Result, UnfoldFailure};
use crate::mesh::{MeshIndex, PolyMesh};

/// Options for unfolding and relaxing.
#[derive(Debug, Clone, PartialEq)]
pub struct UnfoldOptions {
    /// Maximum number of local/global iterations per piece.
    pub max_iterations: usize,

    /// Relaxation stops once the relative energy change drops below this.
    pub tolerance: f64,

    /// Maximum conjugate gradient iterations per solve.
    pub cg_iterations: usize,

    /// Relative residual at which a solve is accepted.
    pub cg_tolerance: f64,

    /// Control vertices to hold in place.
    pub pins: Vec<usize>,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for UnfoldOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            cg_iterations: 2000,
            cg_tolerance: 1e-10,
            pins: Vec::new(),
            parallel: true,
        }
    }
}

impl UnfoldOptions {
    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the pinned control vertices.
    pub fn with_pins(mut self, pins: Vec<usize>) -> Self {
        self.pins = pins;
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

/// A finished unfold.
#[derive(Debug, Clone)]
pub struct UnfoldResult {
    /// Pieces and layouts.
    pub data: UVMappingData,
    /// Largest remaining distortion of any piece, relative to its size.
    pub residual: f64,
    /// Most relaxation iterations any piece needed.
    pub iterations: usize,
}

/// Unfold `mesh` along its seams.
pub fn unfold<I: MeshIndex>(mesh: &PolyMesh<I>, options: &UnfoldOptions) -> Result<UnfoldResult> {
    unfold_with_progress(mesh, options, &Progress::none(), &CancelToken::new())
}

/// Unfold with progress reporting and cancellation.
///
/// A cancelled unfold returns [`MeshError::Cancelled`] and produces nothing.
pub fn unfold_with_progress<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    options: &UnfoldOptions,
    progress: &Progress,
    cancel: &CancelToken,
) -> Result<UnfoldResult> {
    if let Some(&bad) = options.pins.iter().find(|&&p| p >= mesh.num_vertices()) {
        return Err(UnfoldFailure::BadPin(bad).into());
    }
    let pieces = islands::find_islands(mesh)?;
    log::info!("unfolding {} islands", pieces.len());

    let pins: HashSet<usize> = options.pins.iter().copied().collect();
    let mut uv = Vec::with_capacity(pieces.len());
    let mut pinned = Vec::with_capacity(pieces.len());
    let (mut residual, mut iterations) = (0.0f64, 0usize);

    for (index, piece) in pieces.iter().enumerate() {
        let mut coords = layout::initial_layout(piece);
        let flags: Vec<bool> = piece.vertices.iter().map(|v| pins.contains(v)).collect();
        let relaxed = arap::relax_piece(piece, &mut coords, &flags, options, progress, cancel, (index, pieces.len()))?;
        log::debug!(
            "island {}: {} vertices, residual {:.3e} after {} iterations",
            index,
            piece.num_vertices(),
            relaxed.residual,
            relaxed.iterations
        );
        residual = residual.max(relaxed.residual);
        iterations = iterations.max(relaxed.iterations);
        uv.push(coords);
        pinned.push(flags);
    }
    layout::pack(&mut uv);
    progress.report(pieces.len(), pieces.len(), "unfolded");
    log::info!("unfold residual {:.3e}", residual);

    Ok(UnfoldResult {
        data: UVMappingData::new(pieces, uv, pinned),
        residual,
        iterations,
    })
}

/// Relax an existing layout again, holding its pinned vertices.
///
/// Works on a copy of `data`; only layout `mapping` changes, and pieces are
/// not repacked.
pub fn relax_mapping(
    data: &UVMappingData,
    mapping: usize,
    options: &UnfoldOptions,
    progress: &Progress,
    cancel: &CancelToken,
) -> Result<UnfoldResult> {
    if mapping >= data.mappings.len() {
        return Err(MeshError::invalid_param("mapping", mapping, "no such mapping"));
    }
    let layout = &data.mappings[mapping];
    let fits = layout.uv.len() == data.pieces.len()
        && layout.pinned.len() == data.pieces.len()
        && data.pieces.iter().enumerate().all(|(i, p)| {
            layout.uv[i].len() == p.num_vertices() && layout.pinned[i].len() == p.num_vertices()
        });
    if !fits {
        return Err(MeshError::invalid_param("mapping", mapping, "layout does not match the pieces"));
    }

    let mut data = data.clone();
    let (mut residual, mut iterations) = (0.0f64, 0usize);
    let count = data.pieces.len();
    let layout = &mut data.mappings[mapping];
    for (index, piece) in data.pieces.iter().enumerate() {
        let relaxed = arap::relax_piece(
            piece,
            &mut layout.uv[index],
            &layout.pinned[index],
            options,
            progress,
            cancel,
            (index, count),
        )?;
        residual = residual.max(relaxed.residual);
        iterations = iterations.max(relaxed.iterations);
    }
    Ok(UnfoldResult {
        data,
        residual,
        iterations,
    })
}
