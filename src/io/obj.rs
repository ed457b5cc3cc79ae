//! Wavefront OBJ format support.
//!
//! Reading understands `v`, `vn`, `f` (with `v`, `v/vt`, `v//vn` and
//! `v/vt/vn` corners, negative indices counting back from the end), `s`
//! smoothing groups and `\` line continuations. Everything else is skipped.
//!
//! Edge smoothness is derived from the file: an edge between two faces
//! becomes sharp (smoothness 0) when the faces are in different smoothing
//! groups, when either is in group 0 (`s off`), or when the two faces give
//! the shared corners different normals. All other edges stay smooth.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point3, Vector3};

use super::weld;
use crate::error::{MeshError, Result};
use crate::mesh::{edge_key, EdgeAttrs, MeshIndex, PolyMesh, PolygonSoup};

/// Normals closer than this count as equal.
const NORMAL_TOLERANCE: f64 = 1e-10;

/// Smoothing group of faces read before any `s` statement.
const NO_GROUP: i64 = -1;

/// Load a mesh from an OBJ file.
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<PolyMesh<I>> {
    let file = File::open(path.as_ref())?;
    read(BufReader::new(file))
}

/// A face as read, before welding.
struct FaceRecord {
    corners: Vec<usize>,
    normals: Vec<Option<usize>>,
    group: i64,
}

/// Read an OBJ stream.
pub fn read<R: BufRead, I: MeshIndex>(reader: R) -> Result<PolyMesh<I>> {
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut normals: Vec<Vector3<f64>> = Vec::new();
    let mut faces: Vec<FaceRecord> = Vec::new();
    let mut group = NO_GROUP;
    let mut pending = String::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = line_no + 1;
        if let Some(head) = line.strip_suffix('\\') {
            pending.push_str(head);
            pending.push(' ');
            continue;
        }
        pending.push_str(&line);
        let statement = std::mem::take(&mut pending);
        let statement = statement.split('#').next().unwrap_or("");
        let mut fields = statement.split_whitespace();
        let Some(keyword) = fields.next() else {
            continue;
        };
        let fields: Vec<&str> = fields.collect();

        match keyword {
            "v" => {
                if fields.len() < 3 {
                    return Err(parse_error(line_no, "vertex needs three coordinates"));
                }
                let c = parse_floats(&fields[..3], line_no)?;
                positions.push(Point3::new(c[0], c[1], c[2]));
            }
            "vn" => {
                if fields.len() < 3 {
                    return Err(parse_error(line_no, "normal needs three components"));
                }
                let c = parse_floats(&fields[..3], line_no)?;
                normals.push(Vector3::new(c[0], c[1], c[2]));
            }
            "f" => {
                if fields.len() < 3 {
                    return Err(parse_error(line_no, "face needs at least three corners"));
                }
                let mut record = FaceRecord {
                    corners: Vec::with_capacity(fields.len()),
                    normals: Vec::with_capacity(fields.len()),
                    group,
                };
                for corner in &fields {
                    let mut parts = corner.split('/');
                    let v = parts.next().unwrap_or("");
                    let _texture = parts.next();
                    let n = parts.next().filter(|s| !s.is_empty());
                    record.corners.push(resolve(v, positions.len(), line_no)?);
                    record
                        .normals
                        .push(n.map(|n| resolve(n, normals.len(), line_no)).transpose()?);
                }
                faces.push(record);
            }
            "s" => {
                group = match fields.first() {
                    None => 0,
                    Some(s) if s.eq_ignore_ascii_case("off") => 0,
                    Some(s) => s
                        .parse()
                        .map_err(|_| parse_error(line_no, &format!("bad smoothing group '{}'", s)))?,
                };
            }
            _ => {}
        }
    }

    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }
    build(positions, &normals, faces)
}

fn build<I: MeshIndex>(
    positions: Vec<Point3<f64>>,
    normals: &[Vector3<f64>],
    faces: Vec<FaceRecord>,
) -> Result<PolyMesh<I>> {
    let (welded, map) = weld(positions);

    let mut kept: Vec<FaceRecord> = Vec::with_capacity(faces.len());
    for mut face in faces {
        for c in face.corners.iter_mut() {
            *c = map[*c];
        }
        let distinct = face
            .corners
            .iter()
            .enumerate()
            .all(|(i, c)| !face.corners[..i].contains(c));
        if distinct {
            kept.push(face);
        } else {
            log::warn!("dropping a face that collapses after welding");
        }
    }

    // Corner normals seen on each side of every edge.
    let mut sides: HashMap<(usize, usize), Vec<(usize, Option<usize>, Option<usize>)>> = HashMap::new();
    for (fi, face) in kept.iter().enumerate() {
        let k = face.corners.len();
        for i in 0..k {
            let j = (i + 1) % k;
            let (a, b) = (face.corners[i], face.corners[j]);
            let (na, nb) = if a < b {
                (face.normals[i], face.normals[j])
            } else {
                (face.normals[j], face.normals[i])
            };
            sides.entry(edge_key(a, b)).or_default().push((fi, na, nb));
        }
    }

    let differ = |x: Option<usize>, y: Option<usize>| match (x, y) {
        (Some(x), Some(y)) if x != y => (normals[x] - normals[y]).norm() > NORMAL_TOLERANCE,
        _ => false,
    };
    let mut soup = PolygonSoup::new(
        welded,
        kept.iter().map(|f| f.corners.clone()).collect(),
    );
    let mut sharp = 0usize;
    for (&(a, b), side) in &sides {
        let [(f1, na1, nb1), (f2, na2, nb2)] = side[..] else {
            continue;
        };
        let (g1, g2) = (kept[f1].group, kept[f2].group);
        if g1 == 0 || g1 != g2 || differ(na1, na2) || differ(nb1, nb2) {
            soup.set_edge_attrs(
                a,
                b,
                EdgeAttrs {
                    smoothness: 0.0,
                    seam: false,
                },
            );
            sharp += 1;
        }
    }
    log::debug!("obj: {} faces, {} sharp edges", kept.len(), sharp);
    soup.build()
}

/// Resolve a 1-based or negative relative OBJ index.
fn resolve(field: &str, count: usize, line_no: usize) -> Result<usize> {
    let raw: i64 = field
        .parse()
        .map_err(|_| parse_error(line_no, &format!("bad index '{}'", field)))?;
    let index = if raw > 0 { raw - 1 } else { count as i64 + raw };
    if raw == 0 || index < 0 || index >= count as i64 {
        return Err(parse_error(line_no, &format!("index {} out of range", raw)));
    }
    Ok(index as usize)
}

fn parse_floats(fields: &[&str], line_no: usize) -> Result<Vec<f64>> {
    fields
        .iter()
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| parse_error(line_no, &format!("illegal value '{}'", s)))
        })
        .collect()
}

fn parse_error(line_no: usize, message: &str) -> MeshError {
    MeshError::Format {
        message: format!("line {}: {}", line_no, message),
    }
}

/// Save a mesh to an OBJ file, one polygon per face.
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &PolyMesh<I>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write(mesh, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write `mesh` as OBJ text.
pub fn write<W: Write, I: MeshIndex>(mesh: &PolyMesh<I>, w: &mut W) -> Result<()> {
    writeln!(w, "# polymesh")?;
    writeln!(w, "# {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces())?;
    for p in mesh.positions() {
        writeln!(w, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for f in mesh.face_ids() {
        write!(w, "f")?;
        for v in mesh.face_vertices(f) {
            write!(w, " {}", v.index() + 1)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{shapes, VertexId};

    fn parse(text: &str) -> Result<PolyMesh> {
        read(text.as_bytes())
    }

    fn smoothness(mesh: &PolyMesh, a: usize, b: usize) -> f32 {
        let e = mesh.find_edge(VertexId::new(a), VertexId::new(b)).unwrap();
        mesh.smoothness(mesh.edge_halfedge(e))
    }

    const TWO_QUADS: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 2 0 0
v 2 1 0
";

    #[test]
    fn test_write_then_read() {
        let mesh: PolyMesh = shapes::cube(1.0);
        let mut text = Vec::new();
        write(&mesh, &mut text).unwrap();
        let back: PolyMesh = read(text.as_slice()).unwrap();
        assert_eq!(back.num_faces(), 6);
        assert_eq!(back.positions(), mesh.positions());
        assert!(back.is_valid());
    }

    #[test]
    fn test_smoothing_groups() {
        let same = parse(&format!("{}s 1\nf 1 2 3 4\nf 2 5 6 3\n", TWO_QUADS)).unwrap();
        assert_eq!(smoothness(&same, 1, 2), 1.0);

        let split = parse(&format!("{}s 1\nf 1 2 3 4\ns 2\nf 2 5 6 3\n", TWO_QUADS)).unwrap();
        assert_eq!(smoothness(&split, 1, 2), 0.0);

        let off = parse(&format!("{}s off\nf 1 2 3 4\nf 2 5 6 3\n", TWO_QUADS)).unwrap();
        assert_eq!(smoothness(&off, 1, 2), 0.0);

        let none = parse(&format!("{}f 1 2 3 4\nf 2 5 6 3\n", TWO_QUADS)).unwrap();
        assert_eq!(smoothness(&none, 1, 2), 1.0);
        // Boundary edges are untouched.
        assert_eq!(smoothness(&off, 0, 1), 1.0);
    }

    #[test]
    fn test_normals_mark_sharp_edges() {
        let text = format!(
            "{}vn 0 0 1\nvn 0 1 0\nf 1//1 2//1 3//1 4//1\nf 2//2 5//2 6//2 3//2\n",
            TWO_QUADS
        );
        let mesh = parse(&text).unwrap();
        assert_eq!(smoothness(&mesh, 1, 2), 0.0);

        let text = format!(
            "{}vn 0 0 1\nvn 0 0 1\nf 1//1 2//1 3//1 4//1\nf 2//2 5//2 6//2 3//2\n",
            TWO_QUADS
        );
        assert_eq!(smoothness(&parse(&text).unwrap(), 1, 2), 1.0);
    }

    #[test]
    fn test_duplicate_positions_are_welded() {
        let text = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 1 0 0
v 2 0 0
v 2 1 0
v 1 1 0
f 1 2 3 4
f 5 6 7 8
";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_edges(), 7);
        assert!(!mesh.is_boundary_edge(mesh.find_edge(VertexId::new(1), VertexId::new(2)).unwrap()));
    }

    #[test]
    fn test_negative_indices_and_continuations() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 \\\n -2 -1 # tail\n";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.face_degree(crate::mesh::FaceId::new(0)), 3);
    }

    #[test]
    fn test_parse_errors() {
        let err = parse("v 0 0 zero\n").unwrap_err();
        assert!(err.is_format_error());
        assert!(err.to_string().contains("line 1"));

        let err = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n").unwrap_err();
        assert!(err.is_format_error());

        assert!(matches!(parse("v 0 0 0\n").unwrap_err(), MeshError::EmptyMesh));
    }
}
