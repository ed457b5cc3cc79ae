//! Polygon triangulation.

use nalgebra::{Point3, Vector2};

use super::{check_selection, face_mask, rebuild, selected};
use crate::error::Result;
use crate::mesh::{newell_normal, MeshIndex, PolyMesh};

/// Triangulate a planar-ish polygon by ear clipping.
///
/// The polygon is projected onto the plane of its Newell normal, so the
/// returned triangles keep the polygon's winding. If clipping gets stuck on a
/// degenerate outline the rest is fanned from the first remaining corner.
pub fn triangulate_polygon(points: &[Point3<f64>]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    if n == 3 {
        return vec![[0, 1, 2]];
    }

    let normal = newell_normal(points);
    let Some(normal) = normal.try_normalize(1e-15) else {
        return fan(&(0..n).collect::<Vec<_>>());
    };
    let helper = if normal.x.abs() < 0.9 { nalgebra::Vector3::x() } else { nalgebra::Vector3::y() };
    let u = normal.cross(&helper).normalize();
    let v = normal.cross(&u);
    let flat: Vec<Vector2<f64>> = points
        .iter()
        .map(|p| Vector2::new(p.coords.dot(&u), p.coords.dot(&v)))
        .collect();

    let mut triangles = Vec::with_capacity(n - 2);
    let mut remaining: Vec<usize> = (0..n).collect();
    while remaining.len() > 3 {
        let len = remaining.len();
        let ear = (0..len).find(|&i| {
            let prev = remaining[(i + len - 1) % len];
            let next = remaining[(i + 1) % len];
            is_ear(&flat, &remaining, prev, remaining[i], next)
        });
        let Some(i) = ear else {
            log::debug!("ear clipping stalled with {} corners left, fanning", len);
            triangles.extend(fan(&remaining));
            return triangles;
        };
        let prev = remaining[(i + len - 1) % len];
        let next = remaining[(i + 1) % len];
        triangles.push([prev, remaining[i], next]);
        remaining.remove(i);
    }
    triangles.push([remaining[0], remaining[1], remaining[2]]);
    triangles
}

fn fan(corners: &[usize]) -> Vec<[usize; 3]> {
    (1..corners.len().saturating_sub(1))
        .map(|i| [corners[0], corners[i], corners[i + 1]])
        .collect()
}

fn cross(o: Vector2<f64>, a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn is_ear(flat: &[Vector2<f64>], remaining: &[usize], prev: usize, curr: usize, next: usize) -> bool {
    let (a, b, c) = (flat[prev], flat[curr], flat[next]);
    if cross(a, b, c) <= 0.0 {
        return false;
    }
    remaining
        .iter()
        .filter(|&&i| i != prev && i != curr && i != next)
        .all(|&i| {
            let p = flat[i];
            if p == a || p == b || p == c {
                return true;
            }
            let (d1, d2, d3) = (cross(a, b, p), cross(b, c, p), cross(c, a, p));
            let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
            let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
            has_neg && has_pos
        })
}

/// Split each selected face into triangles.
///
/// The first triangle of a face takes its place and the rest are appended.
/// New diagonals are fully smooth. Returns every triangle that came from a
/// selected face as a face selection.
pub fn triangulate_faces<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool]) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_faces())?;
    let mut soup = mesh.to_soup();
    let mut result = Vec::new();
    let mut appended = Vec::new();
    let mut changed = false;
    let base = soup.faces.len();

    for f in selected(selection) {
        result.push(f);
        let face = soup.faces[f].clone();
        if face.len() == 3 {
            continue;
        }
        let points: Vec<Point3<f64>> = face.iter().map(|&v| soup.positions[v]).collect();
        let mut triangles = triangulate_polygon(&points)
            .into_iter()
            .map(|[a, b, c]| vec![face[a], face[b], face[c]]);
        if let Some(first) = triangles.next() {
            soup.faces[f] = first;
            changed = true;
        }
        for tri in triangles {
            result.push(base + appended.len());
            appended.push(tri);
        }
    }
    if !changed {
        return Ok(selection.to_vec());
    }
    soup.faces.extend(appended);

    rebuild(mesh, &soup, "triangulate faces")?;
    Ok(face_mask(mesh.num_faces(), result))
}
