//! Human-readable structural report.

use std::fmt;

use super::halfedge::PolyMesh;
use super::index::MeshIndex;

/// Summary of a mesh's size and structural health.
#[derive(Debug, Clone, Default)]
pub struct MeshReport {
    /// Vertex count.
    pub vertices: usize,
    /// Edge (pair) count.
    pub edges: usize,
    /// Face count.
    pub faces: usize,
    /// Number of holes.
    pub boundary_loops: usize,
    /// Vertices whose edges do not form a single fan.
    pub non_manifold_vertices: Vec<usize>,
    /// Histogram of face degrees: `(degree, count)`, ascending.
    pub face_degrees: Vec<(usize, usize)>,
    /// Edges with smoothness below 1.
    pub creased_edges: usize,
    /// Seam edges.
    pub seams: usize,
    /// Every violated invariant.
    pub problems: Vec<String>,
}

impl MeshReport {
    /// No invariant is violated.
    pub fn is_sound(&self) -> bool {
        self.problems.is_empty()
    }

    /// Euler characteristic `V - E + F`.
    pub fn euler_characteristic(&self) -> i64 {
        self.vertices as i64 - self.edges as i64 + self.faces as i64
    }
}

impl fmt::Display for MeshReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "vertices:        {}", self.vertices)?;
        writeln!(f, "edges:           {}", self.edges)?;
        writeln!(f, "faces:           {}", self.faces)?;
        writeln!(f, "euler:           {}", self.euler_characteristic())?;
        writeln!(f, "boundary loops:  {}", self.boundary_loops)?;
        writeln!(f, "creased edges:   {}", self.creased_edges)?;
        writeln!(f, "seams:           {}", self.seams)?;
        let degrees: Vec<String> = self
            .face_degrees
            .iter()
            .map(|(d, n)| format!("{}x{}", n, d))
            .collect();
        writeln!(f, "face degrees:    {}", degrees.join(" "))?;
        if !self.non_manifold_vertices.is_empty() {
            writeln!(f, "non-manifold:    {:?}", self.non_manifold_vertices)?;
        }
        if self.problems.is_empty() {
            write!(f, "status:          ok")
        } else {
            writeln!(f, "status:          {} problem(s)", self.problems.len())?;
            for p in &self.problems {
                writeln!(f, "  - {}", p)?;
            }
            Ok(())
        }
    }
}

impl<I: MeshIndex> PolyMesh<I> {
    /// Collect counts and structural problems into a printable report.
    pub fn check_report(&self) -> MeshReport {
        let problems = self.validate();
        let mut report = MeshReport {
            vertices: self.num_vertices(),
            edges: self.num_edges(),
            faces: self.num_faces(),
            seams: self.seams().iter().filter(|&&s| s).count(),
            ..Default::default()
        };
        // Traversals below assume sound links.
        if !problems.is_empty() {
            report.problems = problems;
            return report;
        }

        report.boundary_loops = self.boundary_loops().len();
        let mut incoming = vec![0usize; self.num_vertices()];
        for he in self.halfedge_ids() {
            incoming[self.target(he).index()] += 1;
        }
        report.non_manifold_vertices = self
            .vertex_ids()
            .filter(|&v| self.vertex_halfedges(v).count() != incoming[v.index()])
            .map(|v| v.index())
            .collect();
        report.creased_edges = self
            .edge_ids()
            .filter(|&e| self.smoothness(self.edge_halfedge(e)) < 1.0)
            .count();

        let mut degrees = std::collections::BTreeMap::new();
        for f in self.face_ids() {
            *degrees.entry(self.face_degree(f)).or_insert(0usize) += 1;
        }
        report.face_degrees = degrees.into_iter().collect();
        report
    }
}

#[cfg(test)]
mod tests {
    use crate::mesh::{shapes, EdgeId, PolyMesh};

    #[test]
    fn test_cube_report() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        mesh.set_smoothness(EdgeId::new(0), 0.0);
        let report = mesh.check_report();
        assert!(report.is_sound());
        assert_eq!(report.euler_characteristic(), 2);
        assert_eq!(report.face_degrees, vec![(4, 6)]);
        assert_eq!(report.creased_edges, 1);
        assert!(report.to_string().contains("status:          ok"));
    }

    #[test]
    fn test_open_report() {
        let mesh: PolyMesh = shapes::cylinder(6, 1.0, 1.0, false);
        let report = mesh.check_report();
        assert_eq!(report.boundary_loops, 2);
        assert_eq!(report.euler_characteristic(), 0);
    }
}
