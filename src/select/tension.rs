//! Soft selection ("mesh tension").
//!
//! Dragging a selection can pull nearby vertices along with a falloff that
//! depends on how many edges separate them from the selection.

use std::collections::VecDeque;

use nalgebra::Vector3;

use crate::error::{MeshError, Result};
use crate::mesh::{MeshIndex, PolyMesh, VertexId};
use crate::ops::check_selection;

/// Falloff parameters for soft dragging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TensionOptions {
    /// Largest hop count that still moves.
    pub max_distance: usize,
    /// Falloff exponent. Larger values keep the pull closer to the selection.
    pub tension: f64,
}

impl Default for TensionOptions {
    fn default() -> Self {
        Self {
            max_distance: 3,
            tension: 2.0,
        }
    }
}

impl TensionOptions {
    /// Set the reach in edges.
    pub fn with_max_distance(mut self, max_distance: usize) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Set the falloff exponent.
    pub fn with_tension(mut self, tension: f64) -> Self {
        self.tension = tension;
        self
    }
}

/// Hop distance of every vertex from the seed vertices.
///
/// Seeds get 0; vertices further than `max_distance` edges away, or not
/// connected at all, get -1.
pub fn selection_distance<I: MeshIndex>(mesh: &PolyMesh<I>, seeds: &[bool], max_distance: usize) -> Result<Vec<i32>> {
    check_selection(seeds, mesh.num_vertices())?;
    let mut dist = vec![-1i32; mesh.num_vertices()];
    let mut queue = VecDeque::new();
    for (v, _) in seeds.iter().enumerate().filter(|(_, &s)| s) {
        dist[v] = 0;
        queue.push_back(v);
    }
    while let Some(v) = queue.pop_front() {
        let d = dist[v];
        if d as usize >= max_distance {
            continue;
        }
        for n in mesh.vertex_neighbors(VertexId::new(v)) {
            if dist[n.index()] < 0 {
                dist[n.index()] = d + 1;
                queue.push_back(n.index());
            }
        }
    }
    Ok(dist)
}

/// Falloff weight at hop distance `distance`.
///
/// `((max - d + 1) / (max + 1))^tension` inside the reach, 0 outside or for
/// unreached vertices.
pub fn tension_weight(distance: i32, max_distance: usize, tension: f64) -> f64 {
    if distance < 0 || distance as usize > max_distance {
        return 0.0;
    }
    let max = max_distance as f64;
    ((max - distance as f64 + 1.0) / (max + 1.0)).powf(tension)
}

/// Spread per-vertex drag deltas from the selected vertices to their
/// surroundings.
///
/// Selected vertices keep their own delta. Every other vertex within reach
/// takes the mean delta of its neighbours one hop closer, scaled by the
/// falloff weight of its distance.
pub fn adjust_deltas<I: MeshIndex>(
    mesh: &PolyMesh<I>,
    selection: &[bool],
    deltas: &[Vector3<f64>],
    options: &TensionOptions,
) -> Result<Vec<Vector3<f64>>> {
    check_selection(selection, mesh.num_vertices())?;
    if deltas.len() != mesh.num_vertices() {
        return Err(MeshError::invalid_param(
            "deltas",
            deltas.len(),
            "needs one delta per vertex",
        ));
    }
    let dist = selection_distance(mesh, selection, options.max_distance)?;

    let mut order: Vec<usize> = (0..dist.len()).filter(|&v| dist[v] > 0).collect();
    order.sort_by_key(|&v| dist[v]);

    // Unweighted deltas, carried outward ring by ring.
    let mut base: Vec<Vector3<f64>> = (0..dist.len())
        .map(|v| if dist[v] == 0 { deltas[v] } else { Vector3::zeros() })
        .collect();
    for v in order {
        let d = dist[v];
        let mut sum = Vector3::zeros();
        let mut count = 0;
        for n in mesh.vertex_neighbors(VertexId::new(v)) {
            if dist[n.index()] == d - 1 {
                sum += base[n.index()];
                count += 1;
            }
        }
        if count > 0 {
            base[v] = sum / count as f64;
        }
    }

    Ok((0..dist.len())
        .map(|v| base[v] * tension_weight(dist[v], options.max_distance, options.tension))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    #[test]
    fn test_distance_on_strip() {
        let mesh: PolyMesh = shapes::grid(4, 1, 1.0);
        let mut seeds = vec![false; 10];
        seeds[0] = true;
        let dist = selection_distance(&mesh, &seeds, 2).unwrap();
        assert_eq!(&dist[..5], &[0, 1, 2, -1, -1]);
        assert_eq!(dist[5], 1);
        assert_eq!(dist[6], 2);
    }

    #[test]
    fn test_tension_weight() {
        assert_eq!(tension_weight(0, 3, 2.0), 1.0);
        assert!((tension_weight(1, 3, 1.0) - 0.75).abs() < 1e-12);
        assert!((tension_weight(3, 3, 2.0) - 0.0625).abs() < 1e-12);
        assert_eq!(tension_weight(4, 3, 2.0), 0.0);
        assert_eq!(tension_weight(-1, 3, 2.0), 0.0);
    }

    #[test]
    fn test_adjust_deltas() {
        let mesh: PolyMesh = shapes::grid(4, 1, 1.0);
        let mut sel = vec![false; 10];
        sel[0] = true;
        sel[5] = true;
        let mut deltas = vec![Vector3::zeros(); 10];
        deltas[0] = Vector3::new(0.0, 0.0, 1.0);
        deltas[5] = Vector3::new(0.0, 0.0, 1.0);
        let opts = TensionOptions::default().with_max_distance(2).with_tension(1.0);
        let out = adjust_deltas(&mesh, &sel, &deltas, &opts).unwrap();
        assert_eq!(out[0].z, 1.0);
        assert!((out[1].z - 2.0 / 3.0).abs() < 1e-12);
        assert!((out[2].z - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(out[3].z, 0.0);
    }
}
