//! First flat placement of a piece and packing of the pieces side by side.

use std::collections::{HashMap, VecDeque};

use nalgebra::{Point2, Point3, Vector2};

use super::mapping::UnfoldedPiece;

/// Lay a piece flat triangle by triangle.
///
/// The first triangle is placed with its first edge on the u axis. Each
/// neighbour reached across a shared edge puts its third vertex where the
/// true 3D edge lengths say, on the left of the shared edge. Vertices
/// already placed keep their position.
pub(crate) fn initial_layout(piece: &UnfoldedPiece) -> Vec<Point2<f64>> {
    let n = piece.num_vertices();
    let mut placed: Vec<Option<Point2<f64>>> = vec![None; n];
    let Some(&[a, b, c]) = piece.triangles.first() else {
        return vec![Point2::origin(); n];
    };

    let mut across: HashMap<(usize, usize), usize> = HashMap::new();
    for (t, tri) in piece.triangles.iter().enumerate() {
        for k in 0..3 {
            across.insert((tri[k], tri[(k + 1) % 3]), t);
        }
    }

    let rest = &piece.positions;
    let pb = Point2::new((rest[b] - rest[a]).norm(), 0.0);
    placed[a] = Some(Point2::origin());
    placed[b] = Some(pb);
    placed[c] = Some(apex(Point2::origin(), pb, rest[a], rest[b], rest[c]));

    let mut visited = vec![false; piece.triangles.len()];
    visited[0] = true;
    let mut queue = VecDeque::from([0usize]);
    while let Some(t) = queue.pop_front() {
        let tri = piece.triangles[t];
        for k in 0..3 {
            let (p, q) = (tri[k], tri[(k + 1) % 3]);
            let Some(&u) = across.get(&(q, p)) else {
                continue;
            };
            if visited[u] {
                continue;
            }
            visited[u] = true;
            queue.push_back(u);

            let other = piece.triangles[u];
            let Some(&r) = other.iter().find(|&&v| v != p && v != q) else {
                continue;
            };
            if placed[r].is_some() {
                continue;
            }
            if let (Some(q2), Some(p2)) = (placed[q], placed[p]) {
                // `u` runs q -> p, so its apex lies left of q -> p.
                placed[r] = Some(apex(q2, p2, rest[q], rest[p], rest[r]));
            }
        }
    }

    placed.into_iter().map(|p| p.unwrap_or_else(Point2::origin)).collect()
}

/// Third corner of triangle `(p, q, r)` left of `p2 -> q2`, matching the
/// 3D side lengths scaled to the placed edge.
fn apex(p2: Point2<f64>, q2: Point2<f64>, p: Point3<f64>, q: Point3<f64>, r: Point3<f64>) -> Point2<f64> {
    let len = (q - p).norm();
    if len < 1e-15 {
        return p2;
    }
    let dpr = (r - p).norm();
    let dqr = (r - q).norm();
    let x = (dpr * dpr - dqr * dqr + len * len) / (2.0 * len);
    let y = (dpr * dpr - x * x).max(0.0).sqrt();

    let edge = q2 - p2;
    let placed_len = edge.norm();
    let (dir, scale) = if placed_len < 1e-15 {
        (Vector2::x(), 1.0)
    } else {
        (edge / placed_len, placed_len / len)
    };
    let left = Vector2::new(-dir.y, dir.x);
    p2 + (dir * x + left * y) * scale
}

/// Move the pieces into a row, left to right, with a small gap.
pub(crate) fn pack(uv: &mut [Vec<Point2<f64>>]) {
    let bounds: Vec<Option<(Point2<f64>, Point2<f64>)>> = uv.iter().map(|piece| bounds(piece)).collect();
    let largest = bounds
        .iter()
        .flatten()
        .map(|(lo, hi)| (hi.x - lo.x).max(hi.y - lo.y))
        .fold(0.0, f64::max);
    let gap = largest * 0.05;

    let mut cursor = 0.0;
    for (piece, b) in uv.iter_mut().zip(bounds) {
        let Some((lo, hi)) = b else {
            continue;
        };
        let shift = Vector2::new(cursor - lo.x, -lo.y);
        for p in piece.iter_mut() {
            *p += shift;
        }
        cursor += hi.x - lo.x + gap;
    }
}

fn bounds(points: &[Point2<f64>]) -> Option<(Point2<f64>, Point2<f64>)> {
    let (first, rest) = points.split_first()?;
    Some(rest.iter().fold((*first, *first), |(lo, hi), p| {
        (
            Point2::new(lo.x.min(p.x), lo.y.min(p.y)),
            Point2::new(hi.x.max(p.x), hi.y.max(p.y)),
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_area(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
        0.5 * ((b - a).perp(&(c - a)))
    }

    fn folded_strip() -> UnfoldedPiece {
        // Two unit squares meeting at a right angle along x = 1.
        UnfoldedPiece {
            vertices: (0..6).collect(),
            positions: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(1.0, 1.0, 1.0),
            ],
            triangles: vec![[0, 1, 2], [0, 2, 3], [1, 4, 5], [1, 5, 2]],
            faces: vec![0, 0, 1, 1],
        }
    }

    #[test]
    fn test_layout_preserves_lengths() {
        let piece = folded_strip();
        let uv = initial_layout(&piece);
        for t in &piece.triangles {
            for k in 0..3 {
                let (a, b) = (t[k], t[(k + 1) % 3]);
                let flat = (uv[b] - uv[a]).norm();
                let real = (piece.positions[b] - piece.positions[a]).norm();
                assert!((flat - real).abs() < 1e-12);
            }
            assert!(signed_area(uv[t[0]], uv[t[1]], uv[t[2]]) > 0.0);
        }
        // The fold opens up into a 2 x 1 rectangle.
        assert!(((uv[4] - uv[0]).norm() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_pack_side_by_side() {
        let mut uv = vec![
            vec![Point2::new(-1.0, -1.0), Point2::new(1.0, 1.0)],
            vec![Point2::new(5.0, 5.0), Point2::new(6.0, 7.0)],
        ];
        pack(&mut uv);
        assert_eq!(uv[0][0], Point2::new(0.0, 0.0));
        assert_eq!(uv[0][1], Point2::new(2.0, 2.0));
        assert!((uv[1][0].x - 2.1).abs() < 1e-12);
        assert_eq!(uv[1][0].y, 0.0);
    }
}
