//! Mod folder reading and writing
//!
//! An export produces one `<Name>.buf` per built buffer (raw strided
//! elements, no header), a textual `fmt` descriptor of the merged vertex
//! layout, and `Metadata.json`. Files are first written under temporary
//! names and renamed into place only once everything succeeded, so a failed
//! export never leaves a partial buffer set behind.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use migoto_format::{
    write_fmt, AbstractSemantic, BufferLayout, DxgiFormat, ExtractedBuffer, ExtractedComponent,
    ExtractedObject, ExtractedShapeKeys, Metadata, Semantic, TypedBuffer, SUPPORTED_FORMAT_TYPE,
};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::model::{DataModel, ExportedMesh, MeshComponent};
use crate::source::{MeshData, BLEND_SLOTS};

pub const METADATA_FILE: &str = "Metadata.json";
pub const FMT_FILE: &str = "Merged.fmt";

/// Short content hash in the 8-hex-digit style of frame dump hashes
fn short_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(8);
    for byte in &digest[..4] {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Merged vertex layout of every built non-index, non-shape-key buffer,
/// in registry order
fn merged_vertex_layout(buffers: &IndexMap<String, TypedBuffer>) -> BufferLayout {
    let mut merged = BufferLayout::new();
    for buffer in buffers.values() {
        let layout = buffer.layout();
        if layout.has_semantic(Semantic::Index)
            || layout.has_semantic(Semantic::ShapeKey)
            || layout.has_semantic(Semantic::RawData)
        {
            continue;
        }
        merged.merge(layout);
    }
    merged
}

/// Assemble the metadata document for one export, carrying identity fields
/// over from the extraction metadata when present.
pub fn build_metadata(exported: &ExportedMesh, extracted: Option<&Metadata>) -> Metadata {
    let base = extracted.map(|m| m.data.clone());

    let components = base
        .as_ref()
        .map(|d| d.components.clone())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| {
            vec![ExtractedComponent {
                vertex_offset: 0,
                vertex_count: exported.vertex_count as u32,
                index_offset: 0,
                index_count: exported.index_count as u32,
                vg_offset: 0,
                vg_count: 0,
                vg_map: Default::default(),
            }]
        });

    let mut shapekeys = base
        .as_ref()
        .map(|d| d.shapekeys.clone())
        .unwrap_or_default();
    if let Some(built) = &exported.shapekeys {
        shapekeys.vertex_count = built.vertex_count() as u32;
        shapekeys.checksum = built.checksum();
        if shapekeys.offsets_hash.is_empty() {
            if let Some(buffer) = exported.buffers.get("ShapeKeyOffset") {
                shapekeys.offsets_hash = short_hash(buffer.get_bytes());
            }
        }
    } else {
        shapekeys = ExtractedShapeKeys::default();
    }

    let export_format: IndexMap<String, ExtractedBuffer> = exported
        .buffers
        .iter()
        .filter(|(_, buffer)| !buffer.layout().has_semantic(Semantic::RawData))
        .map(|(name, buffer)| (name.clone(), ExtractedBuffer::from_layout(buffer.layout())))
        .collect();

    Metadata::new(
        SUPPORTED_FORMAT_TYPE,
        ExtractedObject {
            vb0_hash: base.as_ref().map(|d| d.vb0_hash.clone()).unwrap_or_default(),
            cb4_hash: base.as_ref().map(|d| d.cb4_hash.clone()).unwrap_or_default(),
            vertex_count: exported.vertex_count as u32,
            index_count: exported.index_count as u32,
            mirror_mesh: exported.mirror_mesh,
            components,
            shapekeys,
            export_format,
        },
    )
}

/// Write a mod folder: every buffer, the fmt descriptor and the metadata.
/// Nothing is published unless every file was written, and a failed run
/// removes its staged temporaries.
pub fn write_mod_folder(
    output: &Path,
    exported: &ExportedMesh,
    metadata: &Metadata,
) -> Result<()> {
    fs::create_dir_all(output)
        .with_context(|| format!("failed to create output folder {output:?}"))?;

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
    let result = stage_and_publish(output, exported, metadata, &mut staged);
    if result.is_err() {
        for (tmp, _) in &staged {
            let _ = fs::remove_file(tmp);
        }
        return result;
    }
    info!(folder = %output.display(), buffers = exported.buffers.len(), "mod folder written");
    Ok(())
}

fn stage_and_publish(
    output: &Path,
    exported: &ExportedMesh,
    metadata: &Metadata,
    staged: &mut Vec<(PathBuf, PathBuf)>,
) -> Result<()> {
    // stage everything under temporary names first
    let mut stage = |name: String, bytes: &[u8]| -> Result<()> {
        let path = output.join(&name);
        let tmp = output.join(format!("{name}.tmp"));
        fs::write(&tmp, bytes).with_context(|| format!("failed to write {tmp:?}"))?;
        staged.push((tmp, path));
        Ok(())
    };

    for (name, buffer) in &exported.buffers {
        stage(format!("{name}.buf"), buffer.get_bytes())?;
    }

    let vb_layout = merged_vertex_layout(&exported.buffers);
    if !vb_layout.is_empty() {
        let fmt_text = write_fmt(&vb_layout, DxgiFormat::R32G32B32_UINT)?;
        stage(FMT_FILE.to_string(), fmt_text.as_bytes())?;
    }
    stage(METADATA_FILE.to_string(), metadata.to_json()?.as_bytes())?;

    // publish
    for (tmp, path) in staged.iter() {
        fs::rename(tmp, path).with_context(|| format!("failed to publish {path:?}"))?;
    }
    Ok(())
}

/// Read the extraction metadata of a mod folder or dump folder
pub fn read_metadata(path: &Path) -> Result<Metadata> {
    let path = if path.is_dir() {
        path.join(METADATA_FILE)
    } else {
        path.to_path_buf()
    };
    let text =
        fs::read_to_string(&path).with_context(|| format!("failed to read {path:?}"))?;
    Ok(Metadata::from_json(&text)
        .with_context(|| format!("failed to parse {path:?}"))?)
}

/// Layouts to read a folder's buffers with: the metadata export format when
/// present, the built-in registry otherwise.
fn import_layouts(metadata: Option<&Metadata>, model: &DataModel) -> IndexMap<String, BufferLayout> {
    match metadata {
        Some(metadata) if !metadata.data.export_format.is_empty() => metadata
            .data
            .export_format
            .iter()
            .map(|(name, buffer)| (name.clone(), buffer.to_layout()))
            .collect(),
        _ => model.buffers_format.clone(),
    }
}

/// Read every known `.buf` of a mod folder into typed buffers
pub fn read_buffers(
    input: &Path,
    metadata: Option<&Metadata>,
    model: &DataModel,
) -> Result<IndexMap<String, TypedBuffer>> {
    let layouts = import_layouts(metadata, model);
    let mut buffers = IndexMap::new();
    for (name, layout) in layouts {
        let path = input.join(format!("{name}.buf"));
        if !path.exists() {
            continue;
        }
        let bytes = fs::read(&path).with_context(|| format!("failed to read {path:?}"))?;
        let mut buffer = TypedBuffer::new(layout).with_name(&name);
        buffer
            .import_raw_data(&bytes)
            .with_context(|| format!("buffer {name} does not match its layout"))?;
        buffers.insert(name, buffer);
    }
    if buffers.is_empty() {
        bail!("no .buf files found in {input:?}");
    }
    Ok(buffers)
}

/// Reassemble an in-memory mesh from a mod folder, running the inverse
/// orientation conversions of the export path.
pub fn import_mesh(input: &Path, model: &DataModel) -> Result<MeshData> {
    let metadata = match read_metadata(input) {
        Ok(metadata) => Some(metadata),
        Err(_) => None,
    };
    let buffers = read_buffers(input, metadata.as_ref(), model)?;

    let mut mesh = MeshData {
        name: input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("imported")
            .to_string(),
        ..Default::default()
    };

    let position = buffers
        .get("Position")
        .context("mod folder has no Position buffer")?;
    let positions = position
        .get_field_values(&AbstractSemantic::new(Semantic::Position, 0))?
        .to_f32_vec();
    mesh.positions = positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect();

    let index = buffers
        .get("Index")
        .context("mod folder has no Index buffer")?;
    let mut faces = index.get_field(&AbstractSemantic::new(Semantic::Index, 0))?;
    // a mirrored export kept the source winding, so only un-flip when the
    // forward pass actually flipped
    let mirrored = metadata.as_ref().is_some_and(|m| m.data.mirror_mesh);
    if model.flip_winding != mirrored {
        faces.swap_triads();
    }
    mesh.indices = faces.to_i64_vec().into_iter().map(|v| v as u32).collect();

    if let Some(texcoord) = buffers.get("TexCoord") {
        let semantic = AbstractSemantic::new(Semantic::TexCoord, 0);
        if texcoord.layout().get_element(&semantic).is_some() {
            let uv = texcoord.get_field_values(&semantic)?.to_f32_vec();
            let flip = model.flip_texcoord_v;
            mesh.uvs = vec![uv
                .chunks_exact(2)
                .map(|uv| [uv[0], if flip { 1.0 - uv[1] } else { uv[1] }])
                .collect()];
        }
    }

    if let Some(vector) = buffers.get("Vector") {
        let semantic = AbstractSemantic::new(Semantic::Normal, 0);
        if vector.layout().get_element(&semantic).is_some() {
            let normals = vector.get_field_values(&semantic)?.to_f32_vec();
            mesh.normals = normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect();
        }
    }

    if let Some(blend) = buffers.get("Blend") {
        let indices = blend
            .get_field_values(&AbstractSemantic::new(Semantic::Blendindices, 0))?
            .to_i64_vec();
        let weights = blend
            .get_field_values(&AbstractSemantic::new(Semantic::Blendweight, 0))?
            .to_f32_vec();
        mesh.blend_indices = indices
            .chunks_exact(BLEND_SLOTS)
            .map(|row| [row[0] as u32, row[1] as u32, row[2] as u32, row[3] as u32])
            .collect();
        // stored as mass-255 integers
        mesh.blend_weights = weights
            .chunks_exact(BLEND_SLOTS)
            .map(|row| [row[0] / 255.0, row[1] / 255.0, row[2] / 255.0, row[3] / 255.0])
            .collect();
    }

    info!(
        vertices = mesh.positions.len(),
        triangles = mesh.indices.len() / 3,
        "mod folder imported"
    );
    Ok(mesh)
}

/// Components declared by the metadata, as export driver partitions
pub fn metadata_components(metadata: &Metadata) -> Vec<MeshComponent> {
    metadata
        .data
        .components
        .iter()
        .map(|c| MeshComponent {
            vertex_offset: c.vertex_offset as usize,
            vertex_count: c.vertex_count as usize,
            index_offset: c.index_offset as usize,
            index_count: c.index_count as usize,
        })
        .collect()
}
