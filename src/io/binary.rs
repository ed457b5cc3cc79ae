//! Native binary format (`.pmesh`).
//!
//! Big-endian, written with `byteorder`. The stream is the flat vertex, edge
//! and face arrays followed by the editor settings:
//!
//! ```text
//! u16 len, "PolyMesh"           class tag
//! u16                           format version
//! u32 nv, nv * vertex           f64 x y z, i32 edge, u8 kind, u8 has_skin [i32 joint, f64 weight]
//! u32 nh, nh * half-edge        i32 vertex, i32 next, i32 twin, i32 face, f32 smoothness
//! u32 nf, nf * face             i32 edge
//! nh / 2 * u8                   seam flags
//! u8                            mirror planes
//! u8                            smoothing method
//! u8, f64, f64, f32, f32        controlled smoothing: enabled, angles, smoothness range
//! u32, u32                      interactive and render levels
//! ```
//!
//! Missing indices are stored as `-1`. The whole mesh is validated before it
//! is returned; a stream that decodes but describes a broken mesh is a
//! [`MeshError::Format`] error.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::{
    ControlledSmoothing, Face, FaceId, HalfEdge, HalfEdgeId, MeshIndex, MirrorState, PolyMesh,
    SkinWeight, SmoothingMethod, Vertex, VertexId, VertexKind,
};

/// Class tag at the start of every stream.
pub const TAG: &str = "PolyMesh";

/// Current format version.
pub const VERSION: u16 = 1;

/// Load a mesh from a `.pmesh` file.
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<PolyMesh<I>> {
    let file = File::open(path.as_ref())?;
    read(&mut BufReader::new(file))
}

/// Save a mesh to a `.pmesh` file.
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &PolyMesh<I>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write(mesh, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Serialize `mesh` to `w`.
pub fn write<W: Write, I: MeshIndex>(mesh: &PolyMesh<I>, w: &mut W) -> Result<()> {
    w.write_u16::<BigEndian>(TAG.len() as u16)?;
    w.write_all(TAG.as_bytes())?;
    w.write_u16::<BigEndian>(VERSION)?;

    w.write_u32::<BigEndian>(mesh.vertices.len() as u32)?;
    for v in &mesh.vertices {
        w.write_f64::<BigEndian>(v.position.x)?;
        w.write_f64::<BigEndian>(v.position.y)?;
        w.write_f64::<BigEndian>(v.position.z)?;
        write_index(w, v.edge.is_valid().then(|| v.edge.index()))?;
        w.write_u8(match v.kind {
            VertexKind::None => 0,
            VertexKind::Corner => 1,
        })?;
        match v.skin {
            Some(skin) => {
                w.write_u8(1)?;
                w.write_i32::<BigEndian>(skin.joint)?;
                w.write_f64::<BigEndian>(skin.weight)?;
            }
            None => w.write_u8(0)?,
        }
    }

    w.write_u32::<BigEndian>(mesh.halfedges.len() as u32)?;
    for he in &mesh.halfedges {
        write_index(w, Some(he.vertex.index()))?;
        write_index(w, he.next.is_valid().then(|| he.next.index()))?;
        write_index(w, Some(he.twin.index()))?;
        write_index(w, he.face.is_valid().then(|| he.face.index()))?;
        w.write_f32::<BigEndian>(he.smoothness)?;
    }

    w.write_u32::<BigEndian>(mesh.faces.len() as u32)?;
    for f in &mesh.faces {
        write_index(w, Some(f.edge.index()))?;
    }
    for &seam in &mesh.seams {
        w.write_u8(seam as u8)?;
    }

    w.write_u8(mesh.mirror.bits())?;
    w.write_u8(match mesh.smoothing_method {
        SmoothingMethod::None => 0,
        SmoothingMethod::Shading => 1,
        SmoothingMethod::Approximating => 2,
        SmoothingMethod::Interpolating => 3,
    })?;
    let c = &mesh.controlled;
    w.write_u8(mesh.controlled_enabled as u8)?;
    w.write_f64::<BigEndian>(c.min_angle)?;
    w.write_f64::<BigEndian>(c.max_angle)?;
    w.write_f32::<BigEndian>(c.min_smoothness)?;
    w.write_f32::<BigEndian>(c.max_smoothness)?;
    w.write_u32::<BigEndian>(mesh.interactive_level as u32)?;
    w.write_u32::<BigEndian>(mesh.render_level as u32)?;
    Ok(())
}

/// Deserialize a mesh from `r`.
///
/// Fails with [`MeshError::UnexpectedTag`] if the stream is not a mesh and
/// with [`MeshError::Truncated`] if it ends early. Nothing is returned
/// unless the whole mesh decoded and validated.
pub fn read<R: Read, I: MeshIndex>(r: &mut R) -> Result<PolyMesh<I>> {
    let tag_len = r.read_u16::<BigEndian>().map_err(eof("tag"))? as usize;
    let mut tag = vec![0u8; tag_len];
    r.read_exact(&mut tag).map_err(eof("tag"))?;
    if tag != TAG.as_bytes() {
        return Err(MeshError::UnexpectedTag {
            expected: TAG,
            found: String::from_utf8_lossy(&tag).into_owned(),
        });
    }
    let version = r.read_u16::<BigEndian>().map_err(eof("version"))?;
    if version != VERSION {
        return Err(format_error(format!("unsupported format version {}", version)));
    }

    let mut mesh = PolyMesh::<I>::new();

    let nv = read_count::<_, I>(r, "vertex count")?;
    mesh.vertices.reserve(nv.min(1 << 20));
    for _ in 0..nv {
        let x = r.read_f64::<BigEndian>().map_err(eof("vertices"))?;
        let y = r.read_f64::<BigEndian>().map_err(eof("vertices"))?;
        let z = r.read_f64::<BigEndian>().map_err(eof("vertices"))?;
        let edge = read_index(r, "vertices")?;
        let kind = match r.read_u8().map_err(eof("vertices"))? {
            0 => VertexKind::None,
            1 => VertexKind::Corner,
            other => return Err(format_error(format!("unknown vertex kind {}", other))),
        };
        let skin = match r.read_u8().map_err(eof("vertices"))? {
            0 => None,
            _ => Some(SkinWeight {
                joint: r.read_i32::<BigEndian>().map_err(eof("vertices"))?,
                weight: r.read_f64::<BigEndian>().map_err(eof("vertices"))?,
            }),
        };
        let mut vertex = Vertex::new(Point3::new(x, y, z));
        vertex.edge = edge.map_or_else(HalfEdgeId::invalid, HalfEdgeId::new);
        vertex.kind = kind;
        vertex.skin = skin;
        mesh.vertices.push(vertex);
    }

    let nh = read_count::<_, I>(r, "edge count")?;
    if nh % 2 != 0 {
        return Err(format_error(format!("odd half-edge count {}", nh)));
    }
    mesh.halfedges.reserve(nh.min(1 << 20));
    for _ in 0..nh {
        let vertex = read_index(r, "edges")?;
        let next = read_index(r, "edges")?;
        let twin = read_index(r, "edges")?;
        let face = read_index(r, "edges")?;
        let smoothness = r.read_f32::<BigEndian>().map_err(eof("edges"))?;
        let (Some(vertex), Some(next), Some(twin)) = (vertex, next, twin) else {
            return Err(format_error("half-edge with a missing vertex, next or twin"));
        };
        if vertex >= nv || next >= nh || twin >= nh {
            return Err(format_error("half-edge index out of range"));
        }
        mesh.halfedges.push(HalfEdge {
            vertex: VertexId::new(vertex),
            next: HalfEdgeId::new(next),
            twin: HalfEdgeId::new(twin),
            face: face.map_or_else(FaceId::invalid, FaceId::new),
            smoothness,
        });
    }

    let nf = read_count::<_, I>(r, "face count")?;
    mesh.faces.reserve(nf.min(1 << 20));
    for _ in 0..nf {
        match read_index(r, "faces")? {
            Some(edge) if edge < nh => mesh.faces.push(Face::new(HalfEdgeId::new(edge))),
            _ => return Err(format_error("face without a valid edge")),
        }
    }
    if mesh.halfedges.iter().any(|he| he.face.is_valid() && he.face.index() >= nf) {
        return Err(format_error("half-edge references a missing face"));
    }
    if mesh.vertices.iter().any(|v| v.edge.is_valid() && v.edge.index() >= nh) {
        return Err(format_error("vertex references a missing edge"));
    }

    mesh.seams = (0..nh / 2)
        .map(|_| r.read_u8().map(|b| b != 0))
        .collect::<io::Result<_>>()
        .map_err(eof("seams"))?;

    let mirror = r.read_u8().map_err(eof("settings"))?;
    mesh.mirror = MirrorState::from_bits(mirror)
        .ok_or_else(|| format_error(format!("unknown mirror flags {:#04b}", mirror)))?;
    mesh.smoothing_method = match r.read_u8().map_err(eof("settings"))? {
        0 => SmoothingMethod::None,
        1 => SmoothingMethod::Shading,
        2 => SmoothingMethod::Approximating,
        3 => SmoothingMethod::Interpolating,
        other => return Err(format_error(format!("unknown smoothing method {}", other))),
    };
    mesh.controlled_enabled = r.read_u8().map_err(eof("settings"))? != 0;
    mesh.controlled = ControlledSmoothing {
        min_angle: r.read_f64::<BigEndian>().map_err(eof("settings"))?,
        max_angle: r.read_f64::<BigEndian>().map_err(eof("settings"))?,
        min_smoothness: r.read_f32::<BigEndian>().map_err(eof("settings"))?,
        max_smoothness: r.read_f32::<BigEndian>().map_err(eof("settings"))?,
    };
    mesh.interactive_level = r.read_u32::<BigEndian>().map_err(eof("settings"))? as usize;
    mesh.render_level = r.read_u32::<BigEndian>().map_err(eof("settings"))? as usize;

    let problems = mesh.validate();
    if let Some(first) = problems.first() {
        return Err(format_error(format!(
            "stored mesh is inconsistent: {} ({} problems)",
            first,
            problems.len()
        )));
    }
    log::debug!(
        "read mesh: {} vertices, {} edges, {} faces",
        mesh.num_vertices(),
        mesh.num_edges(),
        mesh.num_faces()
    );
    Ok(mesh)
}

fn write_index<W: Write>(w: &mut W, index: Option<usize>) -> Result<()> {
    let raw = match index {
        Some(i) => i32::try_from(i)
            .map_err(|_| MeshError::invalid_param("index", i, "too large for the binary format"))?,
        None => -1,
    };
    w.write_i32::<BigEndian>(raw)?;
    Ok(())
}

fn read_index<R: Read>(r: &mut R, what: &'static str) -> Result<Option<usize>> {
    match r.read_i32::<BigEndian>().map_err(eof(what))? {
        -1 => Ok(None),
        i if i >= 0 => Ok(Some(i as usize)),
        i => Err(format_error(format!("negative index {} in {}", i, what))),
    }
}

fn read_count<R: Read, I: MeshIndex>(r: &mut R, what: &'static str) -> Result<usize> {
    let n = r.read_u32::<BigEndian>().map_err(eof(what))? as usize;
    if n > I::MAX.to_usize() {
        return Err(format_error(format!("{} {} does not fit the index type", what, n)));
    }
    Ok(n)
}

/// Map a short read to [`MeshError::Truncated`].
fn eof(what: &'static str) -> impl Fn(io::Error) -> MeshError {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            MeshError::Truncated { what }
        } else {
            MeshError::Io(e)
        }
    }
}

fn format_error(message: impl Into<String>) -> MeshError {
    MeshError::Format {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{shapes, EdgeId};
    use std::io::Cursor;

    fn to_bytes(mesh: &PolyMesh) -> Vec<u8> {
        let mut bytes = Vec::new();
        write(mesh, &mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_settings_survive() {
        let mut mesh: PolyMesh = shapes::cylinder(6, 1.0, 2.0, false);
        mesh.set_corner(VertexId::new(2), true);
        mesh.set_skin(VertexId::new(3), Some(SkinWeight { joint: 4, weight: 0.5 }));
        mesh.set_smoothness(EdgeId::new(1), 0.25);
        mesh.set_seam(EdgeId::new(2), true);
        mesh.set_mirror_state(MirrorState::XY | MirrorState::YZ);
        mesh.set_smoothing_method(SmoothingMethod::Interpolating);
        mesh.set_controlled_smoothing(ControlledSmoothing::default().with_angles(10.0, 60.0), true);
        mesh.set_render_smooth_level(4);

        let back: PolyMesh = read(&mut Cursor::new(to_bytes(&mesh))).unwrap();
        assert!(back.structurally_eq(&mesh));
        assert_eq!(back.vertex(VertexId::new(3)).skin, mesh.vertex(VertexId::new(3)).skin);
        assert_eq!(back.mirror_state(), mesh.mirror_state());
        assert_eq!(back.smoothing_method(), SmoothingMethod::Interpolating);
        assert!(back.is_controlled_smoothing());
        assert_eq!(back.controlled_smoothing(), mesh.controlled_smoothing());
        assert_eq!(back.interactive_smooth_level(), 1);
        assert_eq!(back.render_smooth_level(), 4);
        assert!(back.mapping_data().is_none());
    }

    #[test]
    fn test_wrong_tag() {
        let mut bytes = to_bytes(&shapes::cube(1.0));
        bytes[2..10].copy_from_slice(b"TriMesh!");
        let err = read::<_, u32>(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, MeshError::UnexpectedTag { ref found, .. } if found == "TriMesh!"));
        assert!(err.is_format_error());
    }

    #[test]
    fn test_truncated_stream() {
        let bytes = to_bytes(&shapes::cube(1.0));
        for cut in [1, 12, 40, bytes.len() / 2, bytes.len() - 1] {
            let err = read::<_, u32>(&mut Cursor::new(&bytes[..cut])).unwrap_err();
            assert!(matches!(err, MeshError::Truncated { .. }), "cut at {}: {}", cut, err);
        }
    }

    #[test]
    fn test_corrupt_topology_is_rejected() {
        let mesh: PolyMesh = shapes::cube(1.0);
        let mut bytes = to_bytes(&mesh);
        // First half-edge's twin field.
        let he0 = 2 + TAG.len() + 2 + 4 + mesh.num_vertices() * (24 + 4 + 2) + 4;
        bytes[he0 + 8..he0 + 12].copy_from_slice(&1i32.to_be_bytes());
        let err = read::<_, u32>(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, MeshError::Format { .. }));
    }

    #[test]
    fn test_index_width_is_checked() {
        let mesh: PolyMesh = shapes::grid(300, 300, 1.0);
        let err = read::<_, u16>(&mut Cursor::new(to_bytes(&mesh))).unwrap_err();
        assert!(err.is_format_error());
    }
}
