//! Texture layouts produced by the unfold engine.

use nalgebra::{Point2, Point3};

use crate::error::{MeshError, Result};
use crate::mesh::{MeshIndex, PolyMesh, PolygonSoup};

/// One flattened island of the mesh.
///
/// Vertices on a seam appear once per piece, and once per side of the seam
/// when the seam cuts into the piece, so the local numbering is independent
/// of the control mesh's.
#[derive(Debug, Clone, PartialEq)]
pub struct UnfoldedPiece {
    /// Control vertex behind each local vertex.
    pub vertices: Vec<usize>,
    /// Rest position of each local vertex.
    pub positions: Vec<Point3<f64>>,
    /// Triangles over local vertices, counter-clockwise.
    pub triangles: Vec<[usize; 3]>,
    /// Control face each triangle was cut from.
    pub faces: Vec<usize>,
}

impl UnfoldedPiece {
    /// Number of local vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Local edges as sorted pairs with the number of triangles using each.
    pub fn edges(&self) -> Vec<((usize, usize), usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for t in &self.triangles {
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        counts.into_iter().collect()
    }

    /// V - E + F of the triangulated piece.
    pub fn euler_characteristic(&self) -> i64 {
        self.num_vertices() as i64 - self.edges().len() as i64 + self.triangles.len() as i64
    }
}

/// A named texture layout over all pieces.
#[derive(Debug, Clone, PartialEq)]
pub struct UVMeshMapping {
    /// Display name.
    pub name: String,
    /// Colour the UV editor draws this layout's edges in.
    pub edge_color: [u8; 3],
    /// Texture coordinates, per piece and local vertex.
    pub uv: Vec<Vec<Point2<f64>>>,
    /// Pinned vertices, per piece and local vertex.
    pub pinned: Vec<Vec<bool>>,
    /// Textures drawn with this layout.
    pub textures: Vec<usize>,
}

const EDGE_COLORS: [[u8; 3]; 6] = [
    [0, 0, 0],
    [200, 40, 40],
    [40, 160, 40],
    [40, 40, 200],
    [180, 140, 0],
    [140, 0, 160],
];

impl UVMeshMapping {
    /// Bounds of every coordinate in the layout, or `None` if it is empty.
    pub fn bounding_box(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let mut all = self.uv.iter().flatten();
        let first = *all.next()?;
        Some(all.fold((first, first), |(lo, hi), p| {
            (
                Point2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }

    /// Number of pinned vertices over all pieces.
    pub fn pin_count(&self) -> usize {
        self.pinned.iter().flatten().filter(|&&p| p).count()
    }

    /// Pin or release a local vertex.
    pub fn set_pinned(&mut self, piece: usize, vertex: usize, pinned: bool) {
        self.pinned[piece][vertex] = pinned;
    }
}

/// Pieces and the layouts defined over them.
#[derive(Debug, Clone, PartialEq)]
pub struct UVMappingData {
    /// Flattened islands.
    pub pieces: Vec<UnfoldedPiece>,
    /// Layouts; there is always at least one.
    pub mappings: Vec<UVMeshMapping>,
}

impl UVMappingData {
    pub(crate) fn new(pieces: Vec<UnfoldedPiece>, uv: Vec<Vec<Point2<f64>>>, pinned: Vec<Vec<bool>>) -> Self {
        let first = UVMeshMapping {
            name: "Mapping 1".to_string(),
            edge_color: EDGE_COLORS[0],
            uv,
            pinned,
            textures: Vec::new(),
        };
        Self {
            pieces,
            mappings: vec![first],
        }
    }

    /// Add a layout copied from mapping `from` and return its index.
    pub fn add_mapping(&mut self, name: impl Into<String>, from: usize) -> Result<usize> {
        let source = self
            .mappings
            .get(from)
            .ok_or_else(|| MeshError::invalid_param("from", from, "no such mapping"))?;
        let mapping = UVMeshMapping {
            name: name.into(),
            edge_color: EDGE_COLORS[self.mappings.len() % EDGE_COLORS.len()],
            uv: source.uv.clone(),
            pinned: source.pinned.clone(),
            textures: Vec::new(),
        };
        self.mappings.push(mapping);
        Ok(self.mappings.len() - 1)
    }

    /// Remove a layout. The last remaining layout cannot be removed.
    pub fn remove_mapping(&mut self, index: usize) -> Result<UVMeshMapping> {
        if index >= self.mappings.len() {
            return Err(MeshError::invalid_param("index", index, "no such mapping"));
        }
        if self.mappings.len() == 1 {
            return Err(MeshError::illegal("remove mapping", "the last mapping must stay"));
        }
        Ok(self.mappings.remove(index))
    }

    /// Every `(piece, local vertex)` copy of control vertex `v`.
    pub fn wedges_of(&self, v: usize) -> Vec<(usize, usize)> {
        self.pieces
            .iter()
            .enumerate()
            .flat_map(|(p, piece)| {
                piece
                    .vertices
                    .iter()
                    .enumerate()
                    .filter(move |(_, &cv)| cv == v)
                    .map(move |(l, _)| (p, l))
            })
            .collect()
    }

    /// Layout `mapping` as a flat triangle mesh in the XY plane.
    ///
    /// Each piece becomes its own component, so the result can be saved in
    /// any mesh format to look at the layout.
    pub fn flattened<I: MeshIndex>(&self, mapping: usize) -> Result<PolyMesh<I>> {
        let layout = self
            .mappings
            .get(mapping)
            .ok_or_else(|| MeshError::invalid_param("mapping", mapping, "no such mapping"))?;
        let mut soup = PolygonSoup::default();
        for (piece, uv) in self.pieces.iter().zip(&layout.uv) {
            let base = soup.num_vertices();
            for p in uv {
                soup.add_vertex(Point3::new(p.x, p.y, 0.0), Default::default());
            }
            soup.faces
                .extend(piece.triangles.iter().map(|t| t.iter().map(|&l| base + l).collect()));
        }
        soup.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> UVMappingData {
        let piece = UnfoldedPiece {
            vertices: vec![0, 1, 2, 3],
            positions: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            triangles: vec![[0, 1, 2], [0, 2, 3]],
            faces: vec![0, 0],
        };
        let uv = piece.positions.iter().map(|p| Point2::new(p.x, p.y)).collect();
        UVMappingData::new(vec![piece], vec![uv], vec![vec![false; 4]])
    }

    #[test]
    fn test_piece_topology() {
        let data = square();
        assert_eq!(data.pieces[0].edges().len(), 5);
        assert_eq!(data.pieces[0].euler_characteristic(), 1);
    }

    #[test]
    fn test_add_and_remove_mapping() {
        let mut data = square();
        data.mappings[0].set_pinned(0, 2, true);
        let second = data.add_mapping("Detail", 0).unwrap();
        assert_eq!(second, 1);
        assert_eq!(data.mappings[1].pin_count(), 1);
        assert_ne!(data.mappings[1].edge_color, data.mappings[0].edge_color);
        assert!(data.add_mapping("x", 7).is_err());

        let removed = data.remove_mapping(0).unwrap();
        assert_eq!(removed.name, "Mapping 1");
        let err = data.remove_mapping(0).unwrap_err();
        assert!(err.is_illegal_operation());
    }

    #[test]
    fn test_bounds_and_wedges() {
        let data = square();
        let (lo, hi) = data.mappings[0].bounding_box().unwrap();
        assert_eq!(lo, Point2::new(0.0, 0.0));
        assert_eq!(hi, Point2::new(1.0, 1.0));
        assert_eq!(data.wedges_of(2), vec![(0, 2)]);
        assert!(data.wedges_of(9).is_empty());
    }

    #[test]
    fn test_flattened_layout() {
        let data = square();
        let flat: PolyMesh = data.flattened(0).unwrap();
        assert_eq!(flat.num_faces(), 2);
        assert_eq!(flat.num_vertices(), 4);
        assert!((flat.surface_area() - 1.0).abs() < 1e-12);
        assert!(data.flattened::<u32>(1).is_err());
    }
}
