//! Mesh processing algorithms.
//!
//! - **Subdivision**: the derived surface shown for a control mesh
//! - **Unfolding**: seam cutting, flattening and relaxation into texture
//!   layouts, optionally on a worker thread
//! - **Sparse solving**: CSR matrices and conjugate gradients for the
//!   relaxation
//!
//! Long-running entry points take a [`Progress`] callback and, where they
//! can be aborted, a [`CancelToken`].

pub mod progress;
pub mod sparse;
pub mod subdivide;
pub mod unfold;

pub use progress::{checkpoint, CancelToken, Progress};
