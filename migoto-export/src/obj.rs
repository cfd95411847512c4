//! Wavefront OBJ loading and writing
//!
//! Minimal `v`/`vt`/`vn`/`f` support, enough to feed the export pipeline
//! and to round-trip imported meshes back to an editor. Faces are fan
//! triangulated; face corners sharing the same `(v, vt, vn)` reference are
//! deduplicated into one output vertex.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hashbrown::HashMap;
use tracing::debug;

use crate::error::ExportError;
use crate::source::MeshData;

/// Parse OBJ text into an in-memory mesh
pub fn parse_obj(name: &str, text: &str) -> Result<MeshData, ExportError> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut tex_coords: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();

    let mut mesh = MeshData {
        name: name.to_string(),
        ..Default::default()
    };
    // (v, vt, vn) triple -> output vertex id
    let mut corners: HashMap<(usize, Option<usize>, Option<usize>), u32> = HashMap::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        let bad = |message: &str| ExportError::MalformedObj {
            line: line_no + 1,
            message: message.to_string(),
        };

        match parts[0] {
            "v" if parts.len() >= 4 => {
                positions.push(parse_floats::<3>(&parts[1..4]).ok_or_else(|| bad("bad v"))?);
            }
            "vt" if parts.len() >= 3 => {
                tex_coords.push(parse_floats::<2>(&parts[1..3]).ok_or_else(|| bad("bad vt"))?);
            }
            "vn" if parts.len() >= 4 => {
                normals.push(parse_floats::<3>(&parts[1..4]).ok_or_else(|| bad("bad vn"))?);
            }
            "f" if parts.len() >= 4 => {
                let face: Vec<(usize, Option<usize>, Option<usize>)> = parts[1..]
                    .iter()
                    .map(|v| parse_face_vertex(v).ok_or_else(|| bad("bad face vertex")))
                    .collect::<Result<_, _>>()?;

                // fan triangulation for convex polygons
                for i in 1..face.len() - 1 {
                    for &corner in &[0, i, i + 1] {
                        let key = face[corner];
                        let next_id = mesh.positions.len() as u32;
                        let id = *corners.entry(key).or_insert_with(|| {
                            let (vi, vti, vni) = key;
                            mesh.positions.push(positions.get(vi).copied().unwrap_or([0.0; 3]));
                            if let Some(ti) = vti {
                                if mesh.uvs.is_empty() {
                                    mesh.uvs.push(Vec::new());
                                }
                                mesh.uvs[0].push(tex_coords.get(ti).copied().unwrap_or([0.0; 2]));
                            }
                            if let Some(ni) = vni {
                                mesh.normals
                                    .push(normals.get(ni).copied().unwrap_or([0.0, 1.0, 0.0]));
                            }
                            next_id
                        });
                        mesh.indices.push(id);
                    }
                }
            }
            _ => {}
        }
    }

    if mesh.positions.is_empty() {
        return Err(ExportError::MalformedObj {
            line: 0,
            message: "no faces found".to_string(),
        });
    }
    // partially attributed meshes would desync row counts; drop the stream
    if !mesh.uvs.is_empty() && mesh.uvs[0].len() != mesh.positions.len() {
        mesh.uvs.clear();
    }
    if !mesh.normals.is_empty() && mesh.normals.len() != mesh.positions.len() {
        mesh.normals.clear();
    }

    debug!(
        vertices = mesh.positions.len(),
        triangles = mesh.indices.len() / 3,
        "parsed OBJ"
    );
    Ok(mesh)
}

/// Load an OBJ file into an in-memory mesh
pub fn load_obj(input: &Path) -> Result<MeshData> {
    let text =
        fs::read_to_string(input).with_context(|| format!("failed to open OBJ: {input:?}"))?;
    let name = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("mesh");
    Ok(parse_obj(name, &text)?)
}

/// Render an in-memory mesh back to OBJ text
pub fn write_obj(mesh: &MeshData) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "o {}", mesh.name);
    for p in &mesh.positions {
        let _ = writeln!(out, "v {} {} {}", p[0], p[1], p[2]);
    }
    let uvs = mesh.uvs.first().filter(|uvs| uvs.len() == mesh.positions.len());
    if let Some(uvs) = uvs {
        for uv in uvs {
            let _ = writeln!(out, "vt {} {}", uv[0], uv[1]);
        }
    }
    let has_normals = mesh.normals.len() == mesh.positions.len();
    if has_normals {
        for n in &mesh.normals {
            let _ = writeln!(out, "vn {} {} {}", n[0], n[1], n[2]);
        }
    }
    for face in mesh.indices.chunks_exact(3) {
        let corner = |id: u32| {
            let i = id + 1;
            match (uvs.is_some(), has_normals) {
                (true, true) => format!("{i}/{i}/{i}"),
                (true, false) => format!("{i}/{i}"),
                (false, true) => format!("{i}//{i}"),
                (false, false) => format!("{i}"),
            }
        };
        let _ = writeln!(out, "f {} {} {}", corner(face[0]), corner(face[1]), corner(face[2]));
    }
    out
}

fn parse_floats<const N: usize>(parts: &[&str]) -> Option<[f32; N]> {
    let mut out = [0f32; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().ok()?;
    }
    Some(out)
}

/// Parse an OBJ face corner: `v`, `v/vt`, `v/vt/vn`, or `v//vn` (1-based)
fn parse_face_vertex(s: &str) -> Option<(usize, Option<usize>, Option<usize>)> {
    let parts: Vec<&str> = s.split('/').collect();

    let vi = parts.first()?.parse::<usize>().ok()?.checked_sub(1)?;
    let vti = parts
        .get(1)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<usize>().ok())
        .and_then(|i| i.checked_sub(1));
    let vni = parts
        .get(2)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<usize>().ok())
        .and_then(|i| i.checked_sub(1));

    Some((vi, vti, vni))
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# a unit quad
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn quad_fan_triangulates_and_dedups() {
        let mesh = parse_obj("quad", QUAD).unwrap();
        // 4 unique corners across 2 triangles
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.uvs[0].len(), 4);
        assert_eq!(mesh.normals.len(), 4);
    }

    #[test]
    fn face_vertex_reference_forms() {
        assert_eq!(parse_face_vertex("3"), Some((2, None, None)));
        assert_eq!(parse_face_vertex("3/7"), Some((2, Some(6), None)));
        assert_eq!(parse_face_vertex("3/7/9"), Some((2, Some(6), Some(8))));
        assert_eq!(parse_face_vertex("3//9"), Some((2, None, Some(8))));
        assert_eq!(parse_face_vertex("0"), None);
    }

    #[test]
    fn malformed_lines_carry_the_line_number() {
        let err = parse_obj("bad", "v 0 0 0\nv nope 0 0\n").unwrap_err();
        match err {
            ExportError::MalformedObj { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn round_trip_through_text() {
        let mesh = parse_obj("quad", QUAD).unwrap();
        let text = write_obj(&mesh);
        let back = parse_obj("quad", &text).unwrap();
        assert_eq!(back.positions, mesh.positions);
        assert_eq!(back.indices, mesh.indices);
        assert_eq!(back.uvs, mesh.uvs);
    }
}
