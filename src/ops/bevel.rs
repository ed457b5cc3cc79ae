//! Vertex and edge bevelling.
//!
//! Both operators slide new points along the edges leaving a bevelled
//! element. The distance is clamped to [`BEVEL_LIMIT`] of each edge so points
//! coming from both ends of an edge never cross.

use std::collections::{HashMap, HashSet};

use nalgebra::Point3;

use super::stitch::find_patches;
use super::{check_selection, dedupe_loop, face_mask, rebuild, selected, selected_edge_keys};
use crate::error::Result;
use crate::mesh::{edge_key, EdgeAttrs, EdgeId, MeshIndex, PolyMesh, PolygonSoup};

/// Largest fraction of an edge a bevel may consume from one end.
pub const BEVEL_LIMIT: f64 = 0.49;

/// New vertices created along edges, keyed by `(from, toward)`.
struct EdgePoints {
    width: f64,
    points: HashMap<(usize, usize), usize>,
    /// Original vertex each new point was derived from.
    owner: HashMap<usize, usize>,
}

impl EdgePoints {
    fn new(width: f64) -> Self {
        Self {
            width,
            points: HashMap::new(),
            owner: HashMap::new(),
        }
    }

    /// Point on edge `v -> toward`, `width` away from `v`.
    fn slide(&mut self, soup: &mut PolygonSoup, v: usize, toward: usize) -> usize {
        if let Some(&p) = self.points.get(&(v, toward)) {
            return p;
        }
        let from = soup.positions[v];
        let d = soup.positions[toward] - from;
        let len = d.norm();
        let t = if len > 0.0 { self.width.min(BEVEL_LIMIT * len) / len } else { 0.0 };
        let attrs = soup.attrs[v];
        let p = soup.add_vertex(from + d * t, attrs);
        self.points.insert((v, toward), p);
        self.owner.insert(p, v);
        p
    }

    /// Point inside a face corner, between the two edges leaving `v`.
    fn inset(&mut self, soup: &mut PolygonSoup, v: usize, prev: usize, next: usize) -> usize {
        let from = soup.positions[v];
        let a = soup.positions[prev] - from;
        let b = soup.positions[next] - from;
        let limit = BEVEL_LIMIT * a.norm().min(b.norm());
        let t = self.width.min(limit);
        let dir = a.try_normalize(1e-15).unwrap_or(a) + b.try_normalize(1e-15).unwrap_or(b);
        let p = soup.add_vertex(Point3::from(from.coords + dir * t), soup.attrs[v]);
        self.owner.insert(p, v);
        p
    }

    fn owner_of(&self, v: usize) -> usize {
        self.owner.get(&v).copied().unwrap_or(v)
    }

    fn is_new(&self, v: usize) -> bool {
        self.owner.contains_key(&v)
    }

    /// Copy edge attributes onto the pieces of edges that were split.
    fn inherit_edge_attrs(&self, soup: &mut PolygonSoup, original: &HashMap<(usize, usize), EdgeAttrs>) {
        let mut pieces: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (&(v, toward), &p) in &self.points {
            pieces.entry(edge_key(v, toward)).or_default().push(p);
        }
        for (key, points) in pieces {
            let Some(&attrs) = original.get(&key) else {
                continue;
            };
            let mut chain = vec![key.0];
            let mut inner: Vec<usize> = points;
            inner.sort_by(|&x, &y| {
                let dx = (soup.positions[x] - soup.positions[key.0]).norm_squared();
                let dy = (soup.positions[y] - soup.positions[key.0]).norm_squared();
                dx.total_cmp(&dy)
            });
            chain.extend(inner);
            chain.push(key.1);
            for pair in chain.windows(2) {
                soup.set_edge_attrs(pair[0], pair[1], attrs);
            }
        }
    }
}

/// Cut each selected vertex off its neighbours.
///
/// Every corner at a selected vertex is replaced by two points slid `width`
/// along its edges, and the gap is capped with a new face. At a boundary
/// vertex the cap is formed only if it has at least three corners. Returns
/// the caps as a face selection.
pub fn bevel_vertices<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool], width: f64) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_vertices())?;
    if width <= 0.0 || !selection.iter().any(|&s| s) {
        return Ok(vec![false; mesh.num_faces()]);
    }

    let mut soup = mesh.to_soup();
    let original_edges = soup.edges.clone();
    let mut points = EdgePoints::new(width);
    let faces = std::mem::take(&mut soup.faces);
    let mut new_faces = Vec::with_capacity(faces.len());
    for face in &faces {
        let k = face.len();
        let mut out = Vec::with_capacity(k + 2);
        for i in 0..k {
            let v = face[i];
            if selection[v] {
                let prev = face[(i + k - 1) % k];
                let next = face[(i + 1) % k];
                out.push(points.slide(&mut soup, v, prev));
                out.push(points.slide(&mut soup, v, next));
            } else {
                out.push(v);
            }
        }
        new_faces.push(out);
    }
    soup.faces = new_faces;
    points.inherit_edge_attrs(&mut soup, &original_edges);

    let patches = find_patches(
        &soup.faces,
        |a, b| points.is_new(a) && points.is_new(b) && points.owner_of(a) == points.owner_of(b),
        "bevel vertices",
    )?;
    let first_cap = soup.faces.len();
    soup.faces.extend(patches.closed);
    soup.faces.extend(patches.open.into_iter().filter(|c| c.len() >= 3));
    let cap_count = soup.faces.len() - first_cap;

    rebuild(mesh, &soup, "bevel vertices")?;
    Ok(face_mask(mesh.num_faces(), first_cap..first_cap + cap_count))
}

/// Replace each selected edge with a strip of faces.
///
/// The faces on both sides of a selected edge pull away from it by `width`,
/// the strip fills the space between them, and small patch faces close the
/// gaps left at the ends. Edges on a hole are skipped. Returns the strips and
/// patches as a face selection.
pub fn bevel_edges<I: MeshIndex>(mesh: &mut PolyMesh<I>, selection: &[bool], width: f64) -> Result<Vec<bool>> {
    check_selection(selection, mesh.num_edges())?;
    let mut keys = selected_edge_keys(mesh, selection);
    for e in selected(selection) {
        if mesh.is_boundary_edge(EdgeId::new(e)) {
            let [a, b] = mesh.edge_vertices(EdgeId::new(e));
            log::debug!("bevel edges: skipping boundary edge {}", e);
            keys.remove(&edge_key(a.index(), b.index()));
        }
    }
    if width <= 0.0 || keys.is_empty() {
        return Ok(vec![false; mesh.num_faces()]);
    }
    let is_selected = |a: usize, b: usize| keys.contains(&edge_key(a, b));

    let mut soup = mesh.to_soup();
    let original_edges = soup.edges.clone();
    let faces = std::mem::take(&mut soup.faces);

    // An edge slides when a face beside it pulls its corner along it.
    let mut slides: HashSet<(usize, usize)> = HashSet::new();
    for face in &faces {
        let k = face.len();
        for i in 0..k {
            let (p, v, q) = (face[(i + k - 1) % k], face[i], face[(i + 1) % k]);
            match (is_selected(p, v), is_selected(v, q)) {
                (false, true) => {
                    slides.insert((v, p));
                }
                (true, false) => {
                    slides.insert((v, q));
                }
                _ => {}
            }
        }
    }

    let mut points = EdgePoints::new(width);
    let mut corner: HashMap<(usize, usize), usize> = HashMap::new();
    let mut new_faces = Vec::with_capacity(faces.len());
    for (fi, face) in faces.iter().enumerate() {
        let k = face.len();
        let mut out = Vec::with_capacity(k + 2);
        for i in 0..k {
            let (p, v, q) = (face[(i + k - 1) % k], face[i], face[(i + 1) % k]);
            match (is_selected(p, v), is_selected(v, q)) {
                (false, true) => {
                    let c = points.slide(&mut soup, v, p);
                    corner.insert((fi, v), c);
                    out.push(c);
                }
                (true, false) => {
                    let c = points.slide(&mut soup, v, q);
                    corner.insert((fi, v), c);
                    out.push(c);
                }
                (true, true) => {
                    let c = points.inset(&mut soup, v, p, q);
                    corner.insert((fi, v), c);
                    out.push(c);
                }
                (false, false) => {
                    let (sp, sq) = (slides.contains(&(v, p)), slides.contains(&(v, q)));
                    if sp {
                        out.push(points.slide(&mut soup, v, p));
                    }
                    if !(sp && sq) {
                        out.push(v);
                    }
                    if sq {
                        out.push(points.slide(&mut soup, v, q));
                    }
                }
            }
        }
        dedupe_loop(&mut out);
        new_faces.push(out);
    }

    // Strips
    let mut owner: HashMap<(usize, usize), usize> = HashMap::new();
    for (fi, face) in faces.iter().enumerate() {
        let k = face.len();
        for i in 0..k {
            owner.insert((face[i], face[(i + 1) % k]), fi);
        }
    }
    let mut strips = Vec::new();
    let mut sorted_keys: Vec<(usize, usize)> = keys.iter().copied().collect();
    sorted_keys.sort_unstable();
    for (a, b) in sorted_keys {
        let (Some(&f), Some(&g)) = (owner.get(&(a, b)), owner.get(&(b, a))) else {
            continue;
        };
        let mut strip = vec![corner[&(f, b)], corner[&(f, a)], corner[&(g, a)], corner[&(g, b)]];
        dedupe_loop(&mut strip);
        if strip.len() >= 3 {
            strips.push(strip);
        }
    }

    let dropped = new_faces.iter().filter(|f| f.len() < 3).count();
    if dropped > 0 {
        log::debug!("bevel edges: {} faces vanished", dropped);
    }
    soup.faces = new_faces.into_iter().filter(|f| f.len() >= 3).collect();
    let first_new = soup.faces.len();
    soup.faces.extend(strips);
    points.inherit_edge_attrs(&mut soup, &original_edges);

    let patches = find_patches(
        &soup.faces,
        |a, b| (points.is_new(a) || points.is_new(b)) && points.owner_of(a) == points.owner_of(b),
        "bevel edges",
    )?;
    if !patches.open.is_empty() {
        log::debug!("bevel edges: {} gaps open onto holes", patches.open.len());
    }
    soup.faces.extend(patches.closed);
    let new_count = soup.faces.len() - first_new;

    rebuild(mesh, &soup, "bevel edges")?;
    Ok(face_mask(mesh.num_faces(), first_new..first_new + new_count))
}
