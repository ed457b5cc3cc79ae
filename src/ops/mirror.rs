//! Whole-mesh mirroring and orientation flips.

use crate::error::{MeshError, Result};
use crate::mesh::{MeshIndex, MirrorState, PolyMesh, VertexId};

use super::rebuild;

/// Parameters for [`mirror_whole_mesh`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MirrorOptions {
    /// Plane to reflect across. Must be a single plane.
    pub plane: MirrorState,
    /// Distance from the plane within which a vertex counts as on it.
    pub tolerance: f64,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            plane: MirrorState::XY,
            tolerance: 1e-9,
        }
    }
}

impl MirrorOptions {
    /// Reflect across `plane`.
    pub fn with_plane(mut self, plane: MirrorState) -> Self {
        self.plane = plane;
        self
    }

    /// Set the on-plane tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Append a reflected copy of the mesh and weld it along the plane.
///
/// Only the ends of hole edges lying on the plane are welded, and only when
/// the face beside the edge sticks out of the plane. A flat mesh lying in the
/// plane is therefore duplicated, not folded onto itself.
pub fn mirror_whole_mesh<I: MeshIndex>(mesh: &mut PolyMesh<I>, options: &MirrorOptions) -> Result<()> {
    let axis = options.plane.axis().ok_or_else(|| {
        MeshError::invalid_param("plane", format!("{:?}", options.plane), "must name exactly one plane")
    })?;
    let tol = options.tolerance;
    let on_plane = |v: VertexId<I>| mesh.position(v)[axis].abs() <= tol;

    let n = mesh.num_vertices();
    let mut weld = vec![false; n];
    for e in mesh.edge_ids() {
        if !mesh.is_boundary_edge(e) {
            continue;
        }
        let [a, b] = mesh.edge_vertices(e);
        if !(on_plane(a) && on_plane(b)) {
            continue;
        }
        let he = mesh.edge_halfedge(e);
        let face = if mesh.face_of(he).is_valid() { mesh.face_of(he) } else { mesh.face_of(mesh.twin(he)) };
        if mesh.face_vertices(face).all(on_plane) {
            continue;
        }
        weld[a.index()] = true;
        weld[b.index()] = true;
    }

    let mut soup = mesh.to_soup();
    let mut map = Vec::with_capacity(n);
    for v in 0..n {
        if weld[v] {
            map.push(v);
        } else {
            let mut p = soup.positions[v];
            p[axis] = -p[axis];
            let attrs = soup.attrs[v];
            map.push(soup.add_vertex(p, attrs));
        }
    }
    let reflected: Vec<Vec<usize>> = soup
        .faces
        .iter()
        .map(|face| face.iter().rev().map(|&v| map[v]).collect())
        .collect();
    soup.faces.extend(reflected);
    let mut edges: Vec<_> = soup.edges.iter().map(|(&k, &a)| (k, a)).collect();
    edges.sort_unstable_by_key(|(k, _)| *k);
    for ((a, b), attrs) in edges {
        soup.set_edge_attrs(map[a], map[b], attrs);
    }

    log::debug!("mirror: welding {} vertices", weld.iter().filter(|&&w| w).count());
    rebuild(mesh, &soup, "mirror")?;
    Ok(())
}

/// Reverse the winding of every face.
pub fn invert_normals<I: MeshIndex>(mesh: &mut PolyMesh<I>) -> Result<()> {
    let mut soup = mesh.to_soup();
    for face in &mut soup.faces {
        face.reverse();
    }
    rebuild(mesh, &soup, "invert normals")?;
    Ok(())
}

impl<I: MeshIndex> PolyMesh<I> {
    /// The mesh with every live mirror plane applied.
    ///
    /// The result is a separate mesh with an empty mirror state; the
    /// receiver is not modified.
    pub fn mirrored_mesh(&self) -> Result<PolyMesh<I>> {
        let mut out = self.duplicate();
        for plane in [MirrorState::XY, MirrorState::XZ, MirrorState::YZ] {
            if self.mirror_state().contains(plane) {
                mirror_whole_mesh(&mut out, &MirrorOptions::default().with_plane(plane))?;
            }
        }
        out.set_mirror_state(MirrorState::empty());
        Ok(out)
    }
}
