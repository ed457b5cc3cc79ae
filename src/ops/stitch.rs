//! Hole patching for soup edits.
//!
//! Several operators cut corners or vertices out of faces and then need new
//! faces to fill the gaps. A gap shows up as directed edges whose reverse is
//! used by no face. Reversing those edges and following them gives the loops
//! of the patch faces, already oriented like their neighbours.

use std::collections::{HashMap, HashSet};

use crate::error::{MeshError, Result};

/// Patch loops found among the unmatched edges of `faces`.
#[derive(Debug, Default)]
pub(crate) struct Patches {
    /// Closed loops, ready to be added as faces.
    pub closed: Vec<Vec<usize>>,
    /// Chains that run into a hole of the mesh, in patch order.
    pub open: Vec<Vec<usize>>,
}

/// Directed edges of all face loops.
pub(crate) fn directed_edges(faces: &[Vec<usize>]) -> HashSet<(usize, usize)> {
    let mut edges = HashSet::new();
    for face in faces {
        let k = face.len();
        for i in 0..k {
            edges.insert((face[i], face[(i + 1) % k]));
        }
    }
    edges
}

/// Directed edges without a reverse partner.
pub(crate) fn unmatched_edges(faces: &[Vec<usize>]) -> HashSet<(usize, usize)> {
    let edges = directed_edges(faces);
    edges
        .iter()
        .filter(|&&(a, b)| !edges.contains(&(b, a)))
        .copied()
        .collect()
}

/// Trace patch loops through the unmatched edges accepted by `keep`.
///
/// Fails when a vertex would need two outgoing patch edges, since the patch
/// faces are then ambiguous.
pub(crate) fn find_patches(
    faces: &[Vec<usize>],
    keep: impl Fn(usize, usize) -> bool,
    operation: &'static str,
) -> Result<Patches> {
    let mut succ: HashMap<usize, usize> = HashMap::new();
    let mut has_pred: HashSet<usize> = HashSet::new();
    let mut candidates: Vec<(usize, usize)> = unmatched_edges(faces)
        .into_iter()
        .filter(|&(a, b)| keep(a, b))
        .collect();
    candidates.sort_unstable();
    for (a, b) in candidates {
        // The patch runs against the face edge.
        if succ.insert(b, a).is_some() {
            return Err(MeshError::illegal(
                operation,
                format!("vertex {} borders more than one gap", b),
            ));
        }
        has_pred.insert(a);
    }

    let mut patches = Patches::default();
    let mut visited: HashSet<usize> = HashSet::new();

    // Chains first: they start at a vertex nothing leads into.
    let mut starts: Vec<usize> = succ.keys().copied().filter(|v| !has_pred.contains(v)).collect();
    starts.sort_unstable();
    for start in starts {
        let mut chain = vec![start];
        visited.insert(start);
        let mut cur = start;
        while let Some(&next) = succ.get(&cur) {
            chain.push(next);
            if !visited.insert(next) {
                break;
            }
            cur = next;
        }
        patches.open.push(chain);
    }

    let mut rest: Vec<usize> = succ.keys().copied().filter(|v| !visited.contains(v)).collect();
    rest.sort_unstable();
    for start in rest {
        if visited.contains(&start) {
            continue;
        }
        let mut ring = Vec::new();
        let mut cur = start;
        while visited.insert(cur) {
            ring.push(cur);
            match succ.get(&cur) {
                Some(&next) => cur = next,
                None => break,
            }
        }
        if ring.len() >= 3 && cur == start {
            patches.closed.push(ring);
        }
    }
    Ok(patches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_quad_hole() {
        // A 3x3 ring of quads around a missing centre.
        let faces = vec![
            vec![0, 1, 5, 4],
            vec![1, 2, 6, 5],
            vec![2, 3, 7, 6],
            vec![4, 5, 9, 8],
            vec![6, 7, 11, 10],
            vec![8, 9, 13, 12],
            vec![9, 10, 14, 13],
            vec![10, 11, 15, 14],
        ];
        let inner = [5, 6, 9, 10];
        let patches = find_patches(&faces, |a, b| inner.contains(&a) && inner.contains(&b), "test").unwrap();
        assert_eq!(patches.closed.len(), 1);
        let mut ring = patches.closed[0].clone();
        let start = ring.iter().position(|&v| v == 5).unwrap();
        ring.rotate_left(start);
        assert_eq!(ring, vec![5, 6, 10, 9]);
        assert!(patches.open.is_empty());
    }

    #[test]
    fn test_open_chain() {
        let faces = vec![vec![0, 1, 2], vec![0, 2, 3]];
        let patches = find_patches(&faces, |_, _| true, "test").unwrap();
        // The whole outline is one closed loop running against the faces.
        assert_eq!(patches.closed.len(), 1);
        assert_eq!(patches.closed[0].len(), 4);

        let patches = find_patches(&faces, |a, b| a != 3 && b != 3, "test").unwrap();
        assert_eq!(patches.closed.len(), 0);
        assert_eq!(patches.open, vec![vec![2, 1, 0]]);
    }
}
