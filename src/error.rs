//! Error types for polymesh.
//!
//! Errors fall into four groups. Precondition violations
//! ([`MeshError::IllegalOperation`], [`MeshError::SelectionSize`]) are detected
//! before any mutation. Topological impossibilities (incompatible boundaries,
//! unfold failures) are reported with enough detail for a message. Parse
//! failures abort the whole load. Broken internal invariants are not errors at
//! all: they panic.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Why an unfold could not produce a flat layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnfoldFailure {
    /// An island is not a topological disk and needs more seams.
    #[error("island {island} is not a disk (euler characteristic {euler}); add seams and retry")]
    NonDiskIsland {
        /// Island index.
        island: usize,
        /// Euler characteristic V - E + F of the island.
        euler: i64,
    },

    /// The mesh has no faces to unfold.
    #[error("nothing to unfold")]
    Empty,

    /// A pinned vertex does not exist in the mesh.
    #[error("pinned vertex {0} is out of range")]
    BadPin(usize),
}

/// Errors that can occur during mesh operations.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has fewer than three distinct vertices.
    #[error("face {face} is degenerate")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// The mesh has non-manifold topology.
    #[error("mesh has non-manifold topology: {details}")]
    NonManifold {
        /// Description of the non-manifold condition.
        details: String,
    },

    /// The operation's preconditions do not hold; the mesh was not modified.
    #[error("illegal operation ({operation}): {reason}")]
    IllegalOperation {
        /// Operation name.
        operation: &'static str,
        /// Human readable reason.
        reason: String,
    },

    /// A selection mask does not match the entity count of its mode.
    #[error("selection has {actual} entries, expected {expected}")]
    SelectionSize {
        /// Entity count of the selection mode.
        expected: usize,
        /// Length of the mask that was passed.
        actual: usize,
    },

    /// Two boundary loops cannot be joined.
    #[error("boundary loops have incompatible lengths ({first} and {second})")]
    IncompatibleBoundaries {
        /// Length of the first loop.
        first: usize,
        /// Length of the second loop.
        second: usize,
    },

    /// A vertex expected on a boundary is interior.
    #[error("vertex {0} is not on a boundary")]
    NotOnBoundary(usize),

    /// Both vertices given to a join lie on the same boundary loop.
    #[error("vertices {0} and {1} lie on the same boundary loop")]
    SameBoundary(usize, usize),

    /// The unfold engine could not lay the mesh flat.
    #[error("unfold failed: {0}")]
    Unfold(#[from] UnfoldFailure),

    /// A background computation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Malformed serialized data.
    #[error("format error: {message}")]
    Format {
        /// Description of the problem.
        message: String,
    },

    /// The leading type tag of a serialized mesh did not match.
    #[error("unexpected type tag: expected {expected:?}, found {found:?}")]
    UnexpectedTag {
        /// The tag this reader understands.
        expected: &'static str,
        /// The tag found in the stream.
        found: String,
    },

    /// The stream ended before the mesh was complete.
    #[error("stream truncated while reading {what}")]
    Truncated {
        /// The record being read.
        what: &'static str,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Algorithm failed to converge.
    #[error("algorithm failed to converge after {iterations} iterations")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create an illegal operation error.
    pub fn illegal(operation: &'static str, reason: impl Into<String>) -> Self {
        MeshError::IllegalOperation {
            operation,
            reason: reason.into(),
        }
    }

    /// Whether this is a precondition failure the caller should report and abort on.
    pub fn is_illegal_operation(&self) -> bool {
        matches!(
            self,
            MeshError::IllegalOperation { .. } | MeshError::SelectionSize { .. }
        )
    }

    /// Whether this error means the topology rules out the request.
    pub fn is_topological(&self) -> bool {
        matches!(
            self,
            MeshError::IncompatibleBoundaries { .. }
                | MeshError::NotOnBoundary(_)
                | MeshError::SameBoundary(..)
                | MeshError::Unfold(_)
        )
    }

    /// Whether this error came from reading malformed data.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            MeshError::Format { .. } | MeshError::UnexpectedTag { .. } | MeshError::Truncated { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(MeshError::illegal("delete", "too few faces").is_illegal_operation());
        assert!(MeshError::SelectionSize { expected: 3, actual: 2 }.is_illegal_operation());
        assert!(MeshError::IncompatibleBoundaries { first: 3, second: 4 }.is_topological());
        assert!(MeshError::Truncated { what: "edges" }.is_format_error());
        assert!(!MeshError::EmptyMesh.is_illegal_operation());
    }

    #[test]
    fn test_unfold_failure_converts() {
        let err: MeshError = UnfoldFailure::NonDiskIsland { island: 0, euler: 2 }.into();
        assert!(err.is_topological());
        assert!(err.to_string().contains("not a disk"));
    }
}
