//! Face and edge extrusion.

use std::collections::{HashMap, HashSet};

use nalgebra::{Point3, Rotation3, Unit, Vector3};

use super::{
    check_selection, dedupe_loop, edge_mask, face_components, face_mask, rebuild, selected,
    soup_normal, DisjointSet,
};
use crate::error::{MeshError, Result};
use crate::mesh::{EdgeId, FaceId, MeshIndex, PolyMesh};

/// Scale factors below this collapse the extruded loop to a point.
const COLLAPSE_SCALE: f64 = 1e-9;

/// Parameters shared by all extrusion modes.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrudeOptions {
    /// Offset length.
    pub distance: f64,
    /// Offset direction. `None` uses averaged face normals (faces) or the
    /// outward in-surface direction (edges).
    pub direction: Option<Vector3<f64>>,
    /// Scale of the new loop about its centroid.
    pub scale: f64,
    /// Rotation of the new loop about the extrusion axis, in radians.
    pub angle: f64,
}

impl Default for ExtrudeOptions {
    fn default() -> Self {
        Self {
            distance: 1.0,
            direction: None,
            scale: 1.0,
            angle: 0.0,
        }
    }
}

impl ExtrudeOptions {
    /// Set the offset length.
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    /// Extrude along a fixed direction instead of the normals.
    pub fn with_direction(mut self, direction: Vector3<f64>) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Taper the new loop.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Twist the new loop.
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    fn is_noop(&self) -> bool {
        self.distance == 0.0 && (self.scale - 1.0).abs() < 1e-12 && self.angle == 0.0
    }

    fn fixed_direction(&self) -> Result<Option<Vector3<f64>>> {
        match self.direction {
            None => Ok(None),
            Some(d) => d
                .try_normalize(1e-12)
                .map(Some)
                .ok_or_else(|| MeshError::invalid_param("direction", format!("{:?}", d), "zero length")),
        }
    }

    fn collapses(&self) -> bool {
        self.scale.abs() < COLLAPSE_SCALE
    }

    /// Apply taper and twist about `center`.
    fn shape(&self, p: Point3<f64>, center: Point3<f64>, axis: Option<Unit<Vector3<f64>>>) -> Point3<f64> {
        let mut d = (p - center) * self.scale;
        if let Some(axis) = axis {
            if self.angle != 0.0 {
                d = Rotation3::from_axis_angle(&axis, self.angle) * d;
            }
        }
        center + d
    }
}

/// Extrude each selected face separately.
///
/// Every face gets its own copy of its corners; the face itself becomes the
/// cap and keeps its index. Returns the caps as a face selection.
pub fn extrude_faces<I: MeshIndex>(
    mesh: &mut PolyMesh<I>,
    selection: &[bool],
    options: &ExtrudeOptions,
) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_faces())?;
    if options.is_noop() {
        return Ok(selection.to_vec());
    }
    let groups: Vec<Vec<usize>> = selected(selection).map(|f| vec![f]).collect();
    extrude_face_groups(mesh, &groups, options, "extrude faces")
}

/// Extrude connected groups of selected faces as single regions.
///
/// Vertices shared by selected faces are duplicated once, side walls appear
/// only along the outline of each region, and old vertices no face uses
/// any more are dropped. Each new vertex moves along the normalized average
/// of the selected face normals around it.
pub fn extrude_region<I: MeshIndex>(
    mesh: &mut PolyMesh<I>,
    selection: &[bool],
    options: &ExtrudeOptions,
) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_faces())?;
    if options.is_noop() {
        return Ok(selection.to_vec());
    }
    let groups = face_components(mesh, selection);
    extrude_face_groups(mesh, &groups, options, "extrude region")
}

fn extrude_face_groups<I: MeshIndex>(
    mesh: &mut PolyMesh<I>,
    groups: &[Vec<usize>],
    options: &ExtrudeOptions,
    operation: &'static str,
) -> Result<Vec<bool>> {
    let fixed = options.fixed_direction()?;
    let mut soup = mesh.to_soup();
    let nf = soup.faces.len();
    let normals: Vec<Vector3<f64>> = soup.faces.iter().map(|f| soup_normal(&soup, f)).collect();

    let mut owner: HashMap<(usize, usize), usize> = HashMap::new();
    for (fi, face) in soup.faces.iter().enumerate() {
        let k = face.len();
        for i in 0..k {
            owner.insert((face[i], face[(i + 1) % k]), fi);
        }
    }

    let mut removed = vec![false; nf];
    let mut caps = Vec::new();
    let mut sides: Vec<Vec<usize>> = Vec::new();

    for group in groups {
        let members: HashSet<usize> = group.iter().copied().collect();
        let mut verts = Vec::new();
        let mut normal_sum: HashMap<usize, Vector3<f64>> = HashMap::new();
        for &f in group {
            for &v in &soup.faces[f] {
                let sum = normal_sum.entry(v).or_insert_with(|| {
                    verts.push(v);
                    Vector3::zeros()
                });
                *sum += normals[f];
            }
        }

        let offset = |v: usize| -> Vector3<f64> {
            let dir = fixed.unwrap_or_else(|| {
                normal_sum[&v]
                    .try_normalize(1e-12)
                    .unwrap_or_else(Vector3::zeros)
            });
            dir * options.distance
        };
        let axis = fixed
            .or_else(|| group.iter().map(|&f| normals[f]).sum::<Vector3<f64>>().try_normalize(1e-12))
            .map(Unit::new_unchecked);

        let count = verts.len() as f64;
        let center = Point3::from(
            verts
                .iter()
                .map(|&v| soup.positions[v].coords + offset(v))
                .sum::<Vector3<f64>>()
                / count,
        );

        let mut copy: HashMap<usize, usize> = HashMap::with_capacity(verts.len());
        if options.collapses() {
            let attrs = soup.attrs[verts[0]];
            let p = soup.add_vertex(center, attrs);
            for &v in &verts {
                copy.insert(v, p);
            }
        } else {
            for &v in &verts {
                let moved = soup.positions[v] + offset(v);
                let attrs = soup.attrs[v];
                let n = soup.add_vertex(options.shape(moved, center, axis), attrs);
                copy.insert(v, n);
            }
        }

        for &f in group {
            let face = soup.faces[f].clone();
            let k = face.len();
            for i in 0..k {
                let (a, b) = (face[i], face[(i + 1) % k]);
                let outline = owner.get(&(b, a)).map_or(true, |g| !members.contains(g));
                if outline {
                    let mut side = vec![a, b, copy[&b], copy[&a]];
                    dedupe_loop(&mut side);
                    sides.push(side);
                }
                let attrs = soup.edge_attrs(a, b);
                if copy[&a] != copy[&b] {
                    soup.set_edge_attrs(copy[&a], copy[&b], attrs);
                }
            }
            if options.collapses() {
                removed[f] = true;
            } else {
                soup.faces[f] = face.iter().map(|v| copy[v]).collect();
                caps.push(f);
            }
        }
    }

    let mut new_index = vec![usize::MAX; nf];
    let mut faces = Vec::with_capacity(nf + sides.len());
    for (f, face) in soup.faces.drain(..).enumerate() {
        if !removed[f] {
            new_index[f] = faces.len();
            faces.push(face);
        }
    }
    faces.extend(sides);
    soup.faces = faces;

    rebuild(mesh, &soup, operation)?;
    Ok(face_mask(mesh.num_faces(), caps.into_iter().map(|f| new_index[f])))
}

/// Extrude the selected regions step by step through the points of `path`.
///
/// The path starts at the mean centroid of the selected faces. Each step
/// extrudes by the segment to the next point, then turns the caps to face
/// the bisector of that segment and the following one (the last step faces
/// along its own segment). With `taper` the caps shrink linearly with the
/// distance travelled and close to a point at the end of the path.
///
/// Returns the final caps as a face selection, empty when the path closes
/// them.
pub fn extrude_along_path<I: MeshIndex>(
    mesh: &mut PolyMesh<I>,
    selection: &[bool],
    path: &[Point3<f64>],
    taper: bool,
) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_faces())?;
    let picked: Vec<usize> = selected(selection).collect();
    if picked.is_empty() || path.is_empty() {
        return Ok(selection.to_vec());
    }

    let start = Point3::from(
        picked
            .iter()
            .map(|&f| mesh.face_centroid(FaceId::new(f)).coords)
            .sum::<Vector3<f64>>()
            / picked.len() as f64,
    );
    let mut points = Vec::with_capacity(path.len() + 1);
    points.push(start);
    for &p in path {
        let last = points[points.len() - 1];
        if (p - last).norm() > 1e-12 {
            points.push(p);
        }
    }
    if points.len() < 2 {
        return Ok(selection.to_vec());
    }
    let total: f64 = points.windows(2).map(|w| (w[1] - w[0]).norm()).sum();

    let mut work = mesh.duplicate();
    let mut caps = selection.to_vec();
    let mut travelled = 0.0;
    let mut size = 1.0;
    for i in 1..points.len() {
        let segment = points[i] - points[i - 1];
        let length = segment.norm();
        travelled += length;
        let next_size = if taper { (1.0 - travelled / total).max(0.0) } else { 1.0 };
        let options = ExtrudeOptions::default()
            .with_distance(length)
            .with_direction(segment)
            .with_scale(next_size / size);
        size = next_size;
        caps = extrude_region(&mut work, &caps, &options)?;
        if options.collapses() {
            break;
        }

        let heading = segment / length;
        let facing = match points.get(i + 1) {
            Some(&next) => (heading + (next - points[i]).normalize())
                .try_normalize(1e-12)
                .unwrap_or(heading),
            None => heading,
        };
        turn_caps(&mut work, &caps, &facing);
    }

    log::debug!("extruded {} faces along {} path points", picked.len(), points.len() - 1);
    *mesh = work;
    Ok(caps)
}

/// Rotate the selected faces about their common centroid so their mean
/// normal points along `facing`.
fn turn_caps<I: MeshIndex>(mesh: &mut PolyMesh<I>, caps: &[bool], facing: &Vector3<f64>) {
    let mut normal = Vector3::zeros();
    let mut verts = HashSet::new();
    for f in selected(caps) {
        normal += mesh.face_normal(FaceId::new(f));
        verts.extend(mesh.face_vertices(FaceId::new(f)).map(|v| v.index()));
    }
    let Some(rotation) = Rotation3::rotation_between(&normal, facing) else {
        return;
    };
    if verts.is_empty() {
        return;
    }
    let mut positions = mesh.positions();
    let center = Point3::from(verts.iter().map(|&v| positions[v].coords).sum::<Vector3<f64>>() / verts.len() as f64);
    for &v in &verts {
        positions[v] = center + rotation * (positions[v] - center);
    }
    mesh.set_vertex_positions(&positions);
}

/// Extrude each selected boundary edge into its own quad.
///
/// Fails if a selected edge has faces on both sides. Returns the new outer
/// edges as an edge selection.
pub fn extrude_edges<I: MeshIndex>(
    mesh: &mut PolyMesh<I>,
    selection: &[bool],
    options: &ExtrudeOptions,
) -> Result<Vec<bool>> {
    extrude_boundary_edges(mesh, selection, options, false, "extrude edges")
}

/// Extrude chains of selected boundary edges, sharing new vertices along
/// each chain.
pub fn extrude_edge_region<I: MeshIndex>(
    mesh: &mut PolyMesh<I>,
    selection: &[bool],
    options: &ExtrudeOptions,
) -> Result<Vec<bool>> {
    extrude_boundary_edges(mesh, selection, options, true, "extrude edge region")
}

/// A selected boundary edge: `a -> b` runs along the face, the hole side
/// runs `b -> a`.
struct BoundaryEdge {
    a: usize,
    b: usize,
    normal: Vector3<f64>,
    outward: Vector3<f64>,
}

fn extrude_boundary_edges<I: MeshIndex>(
    mesh: &mut PolyMesh<I>,
    selection: &[bool],
    options: &ExtrudeOptions,
    shared: bool,
    operation: &'static str,
) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_edges())?;
    let fixed = options.fixed_direction()?;

    let mut edges = Vec::new();
    for e in selected(selection) {
        let he = mesh.edge_halfedge(EdgeId::new(e));
        let twin = mesh.twin(he);
        let face_side = if !mesh.is_boundary_halfedge(he) && mesh.is_boundary_halfedge(twin) {
            he
        } else if mesh.is_boundary_halfedge(he) && !mesh.is_boundary_halfedge(twin) {
            twin
        } else {
            return Err(MeshError::illegal(operation, format!("edge {} is not on a boundary", e)));
        };
        let normal = mesh.face_normal(mesh.face_of(face_side));
        let outward = mesh
            .edge_vector(face_side)
            .cross(&normal)
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::zeros);
        edges.push(BoundaryEdge {
            a: mesh.origin(face_side).index(),
            b: mesh.target(face_side).index(),
            normal,
            outward: fixed.unwrap_or(outward),
        });
    }
    if options.is_noop() || edges.is_empty() {
        return Ok(selection.to_vec());
    }

    let mut soup = mesh.to_soup();
    let groups: Vec<Vec<usize>> = if shared {
        let mut sets = DisjointSet::new(soup.num_vertices());
        for e in &edges {
            sets.union(e.a, e.b);
        }
        let mut by_root: HashMap<usize, Vec<usize>> = HashMap::new();
        for (i, e) in edges.iter().enumerate() {
            by_root.entry(sets.find(e.a)).or_default().push(i);
        }
        let mut groups: Vec<Vec<usize>> = by_root.into_values().collect();
        groups.sort();
        groups
    } else {
        (0..edges.len()).map(|i| vec![i]).collect()
    };

    let mut outer = Vec::new();
    for group in &groups {
        // Accumulate offsets per vertex in the group.
        let mut dirs: HashMap<usize, Vector3<f64>> = HashMap::new();
        let mut order = Vec::new();
        let mut axis_sum = Vector3::zeros();
        for &i in group {
            let e = &edges[i];
            axis_sum += e.normal;
            for v in [e.a, e.b] {
                let d = dirs.entry(v).or_insert_with(|| {
                    order.push(v);
                    Vector3::zeros()
                });
                *d += e.outward;
            }
        }
        let offset = |v: usize| -> Vector3<f64> {
            dirs[&v].try_normalize(1e-12).unwrap_or_else(Vector3::zeros) * options.distance
        };
        let center = Point3::from(
            order
                .iter()
                .map(|&v| soup.positions[v].coords + offset(v))
                .sum::<Vector3<f64>>()
                / order.len() as f64,
        );
        let axis = fixed.or_else(|| axis_sum.try_normalize(1e-12)).map(Unit::new_unchecked);

        let mut copy: HashMap<usize, usize> = HashMap::new();
        if options.collapses() {
            let p = soup.add_vertex(center, soup.attrs[order[0]]);
            for &v in &order {
                copy.insert(v, p);
            }
        } else {
            for &v in &order {
                let moved = soup.positions[v] + offset(v);
                let n = soup.add_vertex(options.shape(moved, center, axis), soup.attrs[v]);
                copy.insert(v, n);
            }
        }

        for &i in group {
            let BoundaryEdge { a, b, .. } = edges[i];
            let mut quad = vec![b, a, copy[&a], copy[&b]];
            dedupe_loop(&mut quad);
            if copy[&a] != copy[&b] {
                let attrs = soup.edge_attrs(a, b);
                soup.set_edge_attrs(copy[&a], copy[&b], attrs);
                outer.push((copy[&a], copy[&b]));
            }
            soup.faces.push(quad);
        }
    }

    let remap = rebuild(mesh, &soup, operation)?;
    Ok(edge_mask(mesh, &remap, outer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{shapes, FaceId, VertexId};
    use crate::ops::{collapse_edges, MergePoint};

    fn only(n: usize, i: usize) -> Vec<bool> {
        let mut sel = vec![false; n];
        sel[i] = true;
        sel
    }

    #[test]
    fn test_extrude_single_face() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let caps = extrude_faces(&mut mesh, &only(6, 1), &ExtrudeOptions::default().with_distance(0.5)).unwrap();
        assert_eq!(mesh.num_vertices(), 12);
        assert_eq!(mesh.num_faces(), 10);
        assert!(mesh.is_valid());
        assert_eq!(caps, only(10, 1));
        // The top cap moved up by the distance.
        for v in mesh.face_vertices(FaceId::new(1)) {
            assert!((mesh.position(v).z - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_extrude_along_straight_path() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let path = [Point3::new(0.0, 0.0, 1.5), Point3::new(0.0, 0.0, 2.5), Point3::new(0.0, 0.0, 3.5)];
        let caps = extrude_along_path(&mut mesh, &only(6, 1), &path, false).unwrap();
        // Four walls per step.
        assert_eq!(mesh.num_faces(), 6 + 4 * 3);
        assert!(mesh.is_valid());
        assert!(mesh.boundary_loops().is_empty());
        assert_eq!(caps, only(18, 1));
        for v in mesh.face_vertices(FaceId::new(1)) {
            assert!((mesh.position(v).z - 3.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_extrude_along_path_tapers_to_point() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let path = [Point3::new(0.0, 0.0, 1.5), Point3::new(0.0, 0.0, 2.5), Point3::new(0.0, 0.0, 3.5)];
        let caps = extrude_along_path(&mut mesh, &only(6, 1), &path, true).unwrap();
        // The top cap is gone and the last walls are triangles.
        assert_eq!(mesh.num_faces(), 6 - 1 + 4 * 3);
        assert!(caps.iter().all(|&s| !s));
        assert!(mesh.is_valid());
        let tip = Point3::new(0.0, 0.0, 3.5);
        assert!(mesh.vertex_ids().any(|v| (mesh.position(v) - tip).norm() < 1e-9));
        // Halfway along, the section is a third of the original width.
        let widths: Vec<f64> = mesh
            .vertex_ids()
            .filter(|&v| (mesh.position(v).z - 2.5).abs() < 1e-9)
            .map(|v| mesh.position(v).x.abs())
            .collect();
        assert_eq!(widths.len(), 4);
        assert!(widths.iter().all(|w| (w - 0.5 / 3.0).abs() < 1e-9));
    }

    #[test]
    fn test_extrude_along_bent_path() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let path = [Point3::new(0.0, 0.0, 1.5), Point3::new(1.0, 0.0, 1.5)];
        let caps = extrude_along_path(&mut mesh, &only(6, 1), &path, false).unwrap();
        assert_eq!(mesh.num_faces(), 6 + 4 * 2);
        assert!(mesh.is_valid());
        // The last cap faces along the last segment.
        let cap = FaceId::new(caps.iter().position(|&s| s).unwrap());
        assert!(mesh.face_normal(cap).x > 1.0 - 1e-9);
        assert!((mesh.face_centroid(cap) - Point3::new(1.0, 0.0, 1.5)).norm() < 1e-9);
    }

    #[test]
    fn test_extrude_along_empty_path() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let before = mesh.duplicate();
        let caps = extrude_along_path(&mut mesh, &only(6, 1), &[], true).unwrap();
        assert_eq!(caps, only(6, 1));
        assert!(mesh.structurally_eq(&before));
        assert!(extrude_along_path(&mut mesh, &[true], &[Point3::origin()], false).is_err());
    }

    #[test]
    fn test_extrude_region_whole_cube() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let sel = vec![true; 6];
        let out = extrude_region(&mut mesh, &sel, &ExtrudeOptions::default()).unwrap();
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_faces(), 6);
        assert_eq!(mesh.num_halfedges(), 24);
        assert_eq!(out, vec![true; 6]);
        let shift = 1.0 / 3f64.sqrt();
        for v in mesh.vertex_ids() {
            let p = mesh.position(v);
            assert!((p.x.abs() - (0.5 + shift)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_extrude_region_two_faces() {
        let mut mesh: PolyMesh = shapes::grid(2, 1, 1.0);
        let out = extrude_region(&mut mesh, &[true, true], &ExtrudeOptions::default()).unwrap();
        // Six new vertices, six walls.
        assert_eq!(mesh.num_vertices(), 12);
        assert_eq!(mesh.num_faces(), 8);
        assert!(mesh.is_valid());
        assert_eq!(out.iter().filter(|&&s| s).count(), 2);
    }

    #[test]
    fn test_zero_extrude_is_noop() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let before = mesh.duplicate();
        let sel = only(6, 2);
        let out = extrude_faces(&mut mesh, &sel, &ExtrudeOptions::default().with_distance(0.0)).unwrap();
        assert_eq!(out, sel);
        assert!(mesh.structurally_eq(&before));
    }

    #[test]
    fn test_taper_to_point_merges() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let opts = ExtrudeOptions::default().with_scale(0.0);
        let out = extrude_faces(&mut mesh, &only(6, 1), &opts).unwrap();
        // Top face replaced by a four-sided pyramid.
        assert_eq!(mesh.num_vertices(), 9);
        assert_eq!(mesh.num_faces(), 9);
        assert!(mesh.is_valid());
        assert!(out.iter().all(|&s| !s));
    }

    #[test]
    fn test_extrude_then_collapse_round_trip() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let original = mesh.duplicate();
        extrude_faces(&mut mesh, &only(6, 1), &ExtrudeOptions::default().with_distance(0.7)).unwrap();

        let mut walls = vec![false; mesh.num_edges()];
        for v in 4..8 {
            let e = mesh.find_edge(VertexId::new(v), VertexId::new(v + 4)).unwrap();
            walls[e.index()] = true;
        }
        collapse_edges(&mut mesh, &walls, MergePoint::First).unwrap();
        assert_eq!(mesh.num_vertices(), original.num_vertices());
        assert_eq!(mesh.num_faces(), original.num_faces());
        for v in mesh.vertex_ids() {
            assert!((mesh.position(v) - original.position(v)).norm() < 1e-12);
        }
    }

    #[test]
    fn test_extrude_boundary_edge() {
        let mut mesh: PolyMesh = shapes::grid(1, 1, 1.0);
        let e = mesh.find_edge(VertexId::new(0), VertexId::new(1)).unwrap();
        let out = extrude_edges(&mut mesh, &only(4, e.index()), &ExtrudeOptions::default()).unwrap();
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_vertices(), 6);
        assert!(mesh.is_valid());
        assert_eq!(out.iter().filter(|&&s| s).count(), 1);
        // Edge 0-1 lies on y = 0 and the face is above it, so it grows toward -y.
        assert!((mesh.position(VertexId::new(4)).y + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_extrude_edge_chain_shares_vertices() {
        let mut region: PolyMesh = shapes::grid(2, 1, 1.0);
        let mut sel = vec![false; region.num_edges()];
        for (a, b) in [(0, 1), (1, 2)] {
            sel[region.find_edge(VertexId::new(a), VertexId::new(b)).unwrap().index()] = true;
        }
        let mut individual = region.duplicate();
        extrude_edge_region(&mut region, &sel, &ExtrudeOptions::default()).unwrap();
        assert_eq!(region.num_vertices(), 9);
        extrude_edges(&mut individual, &sel, &ExtrudeOptions::default()).unwrap();
        assert_eq!(individual.num_vertices(), 10);
        assert!(region.is_valid() && individual.is_valid());
    }

    #[test]
    fn test_extrude_interior_edge_is_illegal() {
        let mut mesh: PolyMesh = shapes::cube(1.0);
        let before = mesh.duplicate();
        let err = extrude_edges(&mut mesh, &only(12, 0), &ExtrudeOptions::default()).unwrap_err();
        assert!(err.is_illegal_operation());
        assert!(mesh.structurally_eq(&before));
    }
}
