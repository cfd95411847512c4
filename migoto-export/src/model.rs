//! Data model presets and the export driver
//!
//! A [`DataModel`] declares the named buffer registry of one target format
//! plus its orientation policy (winding, bitangent sign, texcoord V) and
//! baked converters. [`DataModel::export`] drains a [`MeshSource`] through
//! the converter pipeline into one [`TypedBuffer`] per registry entry,
//! quantizing bone weights, packing shape keys and building blend remap
//! tables on the way.

use indexmap::IndexMap;
use migoto_format::{
    AbstractSemantic, AttributeArray, BufferLayout, BufferSemantic, DxgiFormat, Scalars, Semantic,
    TypedBuffer,
};
use tracing::{debug, info};

use crate::convert::{transform_refs, Converter, ConverterSet};
use crate::error::ExportError;
use crate::remap::{build_blend_remap, BlendRemap};
use crate::shapekeys::{build_shapekeys, ShapeKeyBuffers};
use crate::source::MeshSource;
use crate::weights::quantize_weights;

/// Semantics carried per face corner on the host side. When every buffer
/// containing them is excluded from an export, corner data does not need to
/// be re-extracted and cached vertex ids can stand in.
pub const LOOP_SEMANTICS: [Semantic; 6] = [
    Semantic::VertexId,
    Semantic::Tangent,
    Semantic::BitangentSign,
    Semantic::Normal,
    Semantic::TexCoord,
    Semantic::Color,
];

/// One contiguous vertex/index range of a merged mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshComponent {
    pub vertex_offset: usize,
    pub vertex_count: usize,
    pub index_offset: usize,
    pub index_count: usize,
}

/// Per-run export settings
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Mirror the mesh along X (flips positions, vectors, winding and
    /// shape key deltas)
    pub mirror_mesh: bool,
    /// Registry buffers to skip entirely
    pub excluded_buffers: Vec<String>,
    /// Per-buffer layout overrides, usually from `Metadata.json`
    pub buffers_format: Option<IndexMap<String, BufferLayout>>,
    /// Mesh partitions; empty means one component spanning the whole mesh
    pub components: Vec<MeshComponent>,
}

/// Everything one export run produces, ready for file writing
#[derive(Debug, Clone)]
pub struct ExportedMesh {
    pub buffers: IndexMap<String, TypedBuffer>,
    pub vertex_count: usize,
    pub index_count: usize,
    /// Whether the run mirrored the mesh (and so kept the source winding)
    pub mirror_mesh: bool,
    pub shapekeys: Option<ShapeKeyBuffers>,
    /// Per-component remapped bone counts; empty when no remap was needed
    pub remap_counts: Vec<u32>,
}

/// Cross-call vertex id cache keyed by mesh source identity.
///
/// Purely a performance shortcut for partial re-exports: when no corner
/// data buffer is being rebuilt, the loop vertex ids from the previous run
/// can be reused instead of re-extracted. A changed identity invalidates
/// the cache.
#[derive(Debug, Clone, Default)]
pub struct ExportCache {
    identity: Option<String>,
    vertex_ids: Option<Vec<u32>>,
}

impl ExportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached vertex ids, only when `identity` matches the cached source
    pub fn vertex_ids(&self, identity: &str) -> Option<&[u32]> {
        if self.identity.as_deref() != Some(identity) {
            return None;
        }
        self.vertex_ids.as_deref()
    }

    pub fn store(&mut self, identity: String, vertex_ids: Vec<u32>) {
        self.identity = Some(identity);
        self.vertex_ids = Some(vertex_ids);
    }

    pub fn clear(&mut self) {
        self.identity = None;
        self.vertex_ids = None;
    }
}

/// Buffer registry + orientation policy of one target format
#[derive(Debug, Clone)]
pub struct DataModel {
    pub buffers_format: IndexMap<String, BufferLayout>,
    pub flip_winding: bool,
    pub flip_normal: bool,
    pub flip_tangent: bool,
    pub flip_bitangent_sign: bool,
    pub flip_texcoord_v: bool,
    base_converters: ConverterSet,
}

fn layout(semantics: impl IntoIterator<Item = BufferSemantic>) -> BufferLayout {
    BufferLayout::from_semantics(semantics)
}

fn element(semantic: Semantic, index: u32, format: DxgiFormat) -> BufferSemantic {
    BufferSemantic::new(AbstractSemantic::new(semantic, index), format)
}

fn element_with_stride(
    semantic: Semantic,
    index: u32,
    format: DxgiFormat,
    stride: u32,
) -> BufferSemantic {
    BufferSemantic::with_stride(AbstractSemantic::new(semantic, index), format, stride)
}

impl DataModel {
    /// The WWMI target: 3DMigoto-style buffer set for Wuthering Waves
    pub fn wwmi() -> Self {
        let buffers_format = IndexMap::from([
            (
                "Index".to_string(),
                layout([element_with_stride(
                    Semantic::Index,
                    0,
                    DxgiFormat::R32_UINT,
                    12,
                )]),
            ),
            (
                "Position".to_string(),
                layout([element(Semantic::Position, 0, DxgiFormat::R32G32B32_FLOAT)]),
            ),
            (
                "Blend".to_string(),
                layout([
                    element_with_stride(Semantic::Blendindices, 0, DxgiFormat::R8_UINT, 4),
                    element_with_stride(Semantic::Blendweight, 0, DxgiFormat::R8_UINT, 4),
                ]),
            ),
            (
                "Vector".to_string(),
                layout([
                    element(Semantic::Tangent, 0, DxgiFormat::R8G8B8A8_SNORM),
                    element(Semantic::Normal, 0, DxgiFormat::R8G8B8_SNORM),
                    element(Semantic::BitangentSign, 0, DxgiFormat::R8_SNORM),
                ]),
            ),
            (
                "Color".to_string(),
                layout([element(Semantic::Color, 0, DxgiFormat::R8G8B8A8_UNORM)]),
            ),
            (
                "TexCoord".to_string(),
                layout([
                    element(Semantic::TexCoord, 0, DxgiFormat::R16G16_FLOAT),
                    element(Semantic::Color, 1, DxgiFormat::R16G16_UNORM),
                    element(Semantic::TexCoord, 1, DxgiFormat::R16G16_FLOAT),
                    element(Semantic::TexCoord, 2, DxgiFormat::R16G16_FLOAT),
                ]),
            ),
            (
                "ShapeKeyOffset".to_string(),
                layout([element(Semantic::ShapeKey, 0, DxgiFormat::R32G32B32A32_UINT)]),
            ),
            (
                "ShapeKeyVertexId".to_string(),
                layout([element(Semantic::ShapeKey, 1, DxgiFormat::R32_UINT)]),
            ),
            (
                "ShapeKeyVertexOffset".to_string(),
                layout([element(Semantic::ShapeKey, 2, DxgiFormat::R16_FLOAT)]),
            ),
        ]);

        let mut base_converters = ConverterSet::new();
        // tangents arrive as xyz, the w slot is the handedness placeholder
        base_converters.add_semantic_converter(
            AbstractSemantic::new(Semantic::Tangent, 0),
            Converter::ResizeSecondDim { width: 4, fill: 1.0 },
        );
        // flat index stream becomes one face per element
        base_converters.add_format_converter(
            AbstractSemantic::new(Semantic::Index, 0),
            Converter::ReshapeSecondDim(3),
        );
        // COLOR1 rides in the TexCoord buffer with only two channels kept
        base_converters.add_format_converter(
            AbstractSemantic::new(Semantic::Color, 1),
            Converter::ResizeSecondDim { width: 2, fill: 0.0 },
        );

        Self {
            buffers_format,
            flip_winding: true,
            flip_normal: false,
            flip_tangent: false,
            flip_bitangent_sign: true,
            flip_texcoord_v: true,
            base_converters,
        }
    }

    /// Assemble the converter registries for one run
    fn make_converters(
        &self,
        buffers_format: &IndexMap<String, BufferLayout>,
        mirror_mesh: bool,
    ) -> ConverterSet {
        // mirroring flips the mesh inside-out, cancelling both corrections
        let flip_winding = self.flip_winding != mirror_mesh;
        let flip_bitangent_sign = self.flip_bitangent_sign != mirror_mesh;

        let mut converters = self.base_converters.clone();
        for buffer_layout in buffers_format.values() {
            for semantic in buffer_layout.semantics() {
                let abstract_semantic = semantic.semantic;
                match abstract_semantic.semantic {
                    Semantic::Index if flip_winding => {
                        converters.add_semantic_converter(
                            abstract_semantic,
                            Converter::FlipTriangleWinding,
                        );
                    }
                    Semantic::Normal if self.flip_normal => {
                        converters.add_semantic_converter(abstract_semantic, Converter::FlipVector);
                    }
                    Semantic::Tangent if self.flip_tangent => {
                        converters.add_semantic_converter(abstract_semantic, Converter::FlipVector);
                    }
                    Semantic::BitangentSign if flip_bitangent_sign => {
                        converters.add_semantic_converter(abstract_semantic, Converter::FlipVector);
                    }
                    Semantic::TexCoord if self.flip_texcoord_v => {
                        converters
                            .add_semantic_converter(abstract_semantic, Converter::FlipTexcoordV);
                    }
                    _ => {}
                }
                if mirror_mesh
                    && matches!(
                        abstract_semantic.semantic,
                        Semantic::Position | Semantic::Normal | Semantic::Tangent
                    )
                {
                    converters.add_semantic_converter(abstract_semantic, Converter::MirrorVector);
                }
            }
        }
        converters
    }

    /// Export one mesh into the registry's typed buffers.
    ///
    /// Buffers whose source data is unavailable are omitted, never filled
    /// with defaults. The cache lets a run that rebuilds no corner-data
    /// buffer skip loop extraction.
    pub fn export(
        &self,
        source: &dyn MeshSource,
        options: &ExportOptions,
        cache: &mut ExportCache,
    ) -> Result<ExportedMesh, ExportError> {
        let buffers_format = options
            .buffers_format
            .as_ref()
            .unwrap_or(&self.buffers_format);
        let converters = self.make_converters(buffers_format, options.mirror_mesh);

        let index_data = AttributeArray::from_u32(source.indices(), 1)?;
        let index_count = index_data.rows();
        let vertex_count = source.vertex_count();

        let components = if options.components.is_empty() {
            vec![MeshComponent {
                vertex_offset: 0,
                vertex_count,
                index_offset: 0,
                index_count,
            }]
        } else {
            options.components.clone()
        };
        // metadata-supplied partitions may describe a different mesh
        for (component_id, component) in components.iter().enumerate() {
            if component.vertex_offset + component.vertex_count > vertex_count
                || component.index_offset + component.index_count > index_count
            {
                return Err(ExportError::ComponentOutOfBounds {
                    component: component_id,
                    vertices: vertex_count,
                    indices: index_count,
                });
            }
        }

        // Bone weights and indices are prepared up front: weights are
        // quantized, and indices rewritten through the per-component remap
        // when any bone id escapes the 8-bit range.
        let blend = self.prepare_blend(source, &index_data, &components)?;

        let mut buffers: IndexMap<String, TypedBuffer> = IndexMap::new();
        for (buffer_name, buffer_layout) in buffers_format {
            if options.excluded_buffers.iter().any(|b| b == buffer_name) {
                debug!(buffer = %buffer_name, "buffer excluded");
                continue;
            }
            if buffer_layout
                .semantics()
                .iter()
                .all(|s| s.semantic.semantic == Semantic::ShapeKey)
            {
                // packed separately below
                continue;
            }

            let mut buffer: Option<TypedBuffer> = None;
            let mut missing: Option<AbstractSemantic> = None;
            for semantic in buffer_layout.semantics() {
                let abstract_semantic = semantic.semantic;
                let data = match abstract_semantic.semantic {
                    Semantic::ShapeKey => continue,
                    Semantic::Index => Some(index_data.clone()),
                    Semantic::Blendindices => blend.as_ref().map(|b| b.indices.clone()),
                    Semantic::Blendweight => blend.as_ref().map(|b| b.weights.clone()),
                    _ => source.attribute(&abstract_semantic),
                };
                let Some(data) = data else {
                    missing = Some(abstract_semantic);
                    break;
                };

                let target = buffer
                    .get_or_insert_with(|| TypedBuffer::new(buffer_layout.clone()).with_name(buffer_name));
                let semantic_transforms = converters.semantic_transforms(&abstract_semantic);
                let format_transforms = converters.format_transforms(&abstract_semantic);
                target.import_semantic_data(
                    data,
                    &abstract_semantic,
                    &transform_refs(&semantic_transforms),
                    &transform_refs(&format_transforms),
                )?;
            }
            match (buffer, missing) {
                (Some(buffer), None) => {
                    buffers.insert(buffer_name.clone(), buffer);
                }
                (_, missing) => {
                    info!(
                        buffer = %buffer_name,
                        missing = %missing.map(|s| s.name()).unwrap_or_default(),
                        "omitting buffer without source data"
                    );
                }
            }
        }

        // blend remap side buffers
        let mut remap_counts = Vec::new();
        if let Some(blend) = &blend {
            if let Some(remap) = &blend.remap {
                buffers.insert(
                    "BlendRemapForward".to_string(),
                    raw_u16_buffer("BlendRemapForward", &remap.forward)?,
                );
                buffers.insert(
                    "BlendRemapReverse".to_string(),
                    raw_u16_buffer("BlendRemapReverse", &remap.reverse)?,
                );
                remap_counts = remap.counts.clone();
            }
        }

        // shape keys, keyed by the exported loop order
        let shapekeys = self.export_shapekeys(
            source,
            options,
            buffers_format,
            cache,
            &mut buffers,
        )?;

        info!(
            buffers = buffers.len(),
            vertex_count, index_count, "mesh export complete"
        );
        Ok(ExportedMesh {
            buffers,
            vertex_count,
            index_count,
            mirror_mesh: options.mirror_mesh,
            shapekeys,
            remap_counts,
        })
    }

    fn export_shapekeys(
        &self,
        source: &dyn MeshSource,
        options: &ExportOptions,
        buffers_format: &IndexMap<String, BufferLayout>,
        cache: &mut ExportCache,
        buffers: &mut IndexMap<String, TypedBuffer>,
    ) -> Result<Option<ShapeKeyBuffers>, ExportError> {
        // collect the shape key buffer names the registry expects
        let shapekey_buffers: Vec<(&String, &BufferLayout)> = buffers_format
            .iter()
            .filter(|(name, buffer_layout)| {
                !options.excluded_buffers.iter().any(|b| &b == name)
                    && buffer_layout.has_semantic(Semantic::ShapeKey)
            })
            .collect();
        if shapekey_buffers.is_empty() || source.shapekey_groups().is_empty() {
            return Ok(None);
        }

        let identity = source.identity();
        let fetch_loop_data = buffers_format.iter().any(|(name, buffer_layout)| {
            !options.excluded_buffers.iter().any(|b| b == name)
                && buffer_layout
                    .semantics()
                    .iter()
                    .any(|s| LOOP_SEMANTICS.contains(&s.semantic.semantic))
        });

        let vertex_ids: Vec<u32> = if !fetch_loop_data {
            match cache.vertex_ids(&identity) {
                Some(cached) => {
                    debug!("reusing cached vertex ids");
                    cached.to_vec()
                }
                None => self.fetch_vertex_ids(source, cache, identity)?,
            }
        } else {
            self.fetch_vertex_ids(source, cache, identity)?
        };

        let Some(shapekeys) = build_shapekeys(source, &vertex_ids, options.mirror_mesh)? else {
            return Ok(None);
        };

        for (buffer_name, buffer_layout) in shapekey_buffers {
            let semantic = buffer_layout.semantics()[0].semantic;
            let num_values = buffer_layout.semantics()[0].num_values() as usize;
            let data = match semantic.index {
                0 => AttributeArray::from_u32(shapekeys.offsets.clone(), num_values)?,
                1 => AttributeArray::from_u32(shapekeys.vertex_ids.clone(), num_values)?,
                _ => AttributeArray::new(
                    Scalars::F16(shapekeys.vertex_offsets.clone()),
                    num_values,
                )?,
            };
            let mut buffer = TypedBuffer::new(buffer_layout.clone()).with_name(buffer_name);
            buffer.set_field(&semantic, &data)?;
            buffers.insert(buffer_name.clone(), buffer);
        }
        Ok(Some(shapekeys))
    }

    fn fetch_vertex_ids(
        &self,
        source: &dyn MeshSource,
        cache: &mut ExportCache,
        identity: String,
    ) -> Result<Vec<u32>, ExportError> {
        let ids = source
            .attribute(&AbstractSemantic::new(Semantic::VertexId, 0))
            .ok_or_else(|| ExportError::MissingAttribute("VERTEXID".to_string()))?;
        let ids: Vec<u32> = ids.to_i64_vec().into_iter().map(|v| v as u32).collect();
        cache.store(identity, ids.clone());
        Ok(ids)
    }

    /// Quantize weights and remap indices when the mesh reaches past the
    /// 8-bit bone range. Returns `None` when the source carries no skinning.
    fn prepare_blend(
        &self,
        source: &dyn MeshSource,
        index_data: &AttributeArray,
        components: &[MeshComponent],
    ) -> Result<Option<PreparedBlend>, ExportError> {
        let (Some(indices), Some(weights)) = (
            source.attribute(&AbstractSemantic::new(Semantic::Blendindices, 0)),
            source.attribute(&AbstractSemantic::new(Semantic::Blendweight, 0)),
        ) else {
            return Ok(None);
        };

        let quantized = quantize_weights(&weights)?;

        let max_bone = indices.to_i64_vec().into_iter().max().unwrap_or(0);
        if max_bone < 256 {
            return Ok(Some(PreparedBlend {
                indices,
                weights: quantized,
                remap: None,
            }));
        }

        let index_stream: Vec<u32> = index_data
            .to_i64_vec()
            .into_iter()
            .map(|v| v as u32)
            .collect();
        let ranges: Vec<std::ops::Range<usize>> = components
            .iter()
            .map(|c| c.index_offset..c.index_offset + c.index_count)
            .collect();
        let remap = build_blend_remap(&index_stream, &ranges, &indices, &weights)?;
        if !remap.is_needed() {
            return Ok(Some(PreparedBlend {
                indices,
                weights: quantized,
                remap: None,
            }));
        }

        let indices = apply_reverse_remap(&indices, &remap, components);
        Ok(Some(PreparedBlend {
            indices,
            weights: quantized,
            remap: Some(remap),
        }))
    }
}

struct PreparedBlend {
    indices: AttributeArray,
    weights: AttributeArray,
    remap: Option<BlendRemap>,
}

/// Rewrite global bone ids to component-local ones through the reverse
/// tables, walking components in order. Components without a table keep
/// their global ids.
fn apply_reverse_remap(
    indices: &AttributeArray,
    remap: &BlendRemap,
    components: &[MeshComponent],
) -> AttributeArray {
    let width = indices.width();
    let mut values: Vec<u32> = indices.to_i64_vec().into_iter().map(|v| v as u32).collect();

    let mut table = 0usize;
    for (component, &count) in components.iter().zip(&remap.counts) {
        if count == 0 {
            continue;
        }
        let reverse = &remap.reverse[table * crate::remap::REMAP_TABLE_LEN..];
        let start = component.vertex_offset * width;
        let end = (component.vertex_offset + component.vertex_count) * width;
        for value in &mut values[start..end] {
            *value = reverse
                .get(*value as usize)
                .copied()
                .unwrap_or_default() as u32;
        }
        table += 1;
    }
    // infallible: same shape as the input
    AttributeArray::from_u32(values, width).unwrap_or_else(|_| unreachable!())
}

fn raw_u16_buffer(name: &str, values: &[u16]) -> Result<TypedBuffer, ExportError> {
    let buffer_layout = layout([element(Semantic::RawData, 0, DxgiFormat::R16_UINT)]);
    let mut buffer = TypedBuffer::new(buffer_layout).with_name(name);
    let data = AttributeArray::new(Scalars::U16(values.to_vec()), 1)?;
    buffer.set_field(&AbstractSemantic::new(Semantic::RawData, 0), &data)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MeshData;
    use migoto_format::ScalarType;

    fn skinned_quad() -> MeshData {
        MeshData {
            name: "quad".into(),
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            tangents: vec![[1.0, 0.0, 0.0]; 4],
            bitangent_signs: vec![1.0; 4],
            uvs: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]],
            colors: vec![[1.0, 1.0, 1.0, 1.0]; 4],
            blend_indices: vec![[0, 1, 0, 0]; 4],
            blend_weights: vec![[0.75, 0.25, 0.0, 0.0]; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
            ..Default::default()
        }
    }

    fn full_uv_channels(mesh: &mut MeshData) {
        mesh.uvs.push(vec![[0.0, 0.0]; 4]);
        mesh.uvs.push(vec![[0.0, 0.0]; 4]);
    }

    #[test]
    fn export_builds_the_expected_buffers() {
        let mut mesh = skinned_quad();
        full_uv_channels(&mut mesh);
        let model = DataModel::wwmi();
        let exported = model
            .export(&mesh, &ExportOptions::default(), &mut ExportCache::new())
            .unwrap();

        assert_eq!(exported.vertex_count, 4);
        assert_eq!(exported.index_count, 6);
        for name in ["Index", "Position", "Blend", "Vector"] {
            assert!(exported.buffers.contains_key(name), "missing {name}");
        }
        // TexCoord needs a COLOR1 stream this mesh does not have
        assert!(!exported.buffers.contains_key("TexCoord"));

        let index = &exported.buffers["Index"];
        assert_eq!(index.len(), 2);
        assert_eq!(index.layout().stride(), 12);

        let blend = &exported.buffers["Blend"];
        assert_eq!(blend.len(), 4);
        assert_eq!(blend.layout().stride(), 8);
    }

    #[test]
    fn default_winding_flip_swaps_triads() {
        let mesh = skinned_quad();
        let model = DataModel::wwmi();
        let exported = model
            .export(&mesh, &ExportOptions::default(), &mut ExportCache::new())
            .unwrap();

        let faces = exported.buffers["Index"]
            .get_field(&AbstractSemantic::new(Semantic::Index, 0))
            .unwrap();
        assert_eq!(faces.to_i64_vec(), vec![2, 1, 0, 3, 2, 0]);
    }

    #[test]
    fn mirroring_cancels_the_winding_flip() {
        let mesh = skinned_quad();
        let model = DataModel::wwmi();
        let options = ExportOptions {
            mirror_mesh: true,
            ..Default::default()
        };
        let exported = model
            .export(&mesh, &options, &mut ExportCache::new())
            .unwrap();

        let faces = exported.buffers["Index"]
            .get_field(&AbstractSemantic::new(Semantic::Index, 0))
            .unwrap();
        assert_eq!(faces.to_i64_vec(), vec![0, 1, 2, 0, 2, 3]);

        let positions = exported.buffers["Position"]
            .get_field_values(&AbstractSemantic::new(Semantic::Position, 0))
            .unwrap()
            .to_f32_vec();
        assert_eq!(positions[3], -1.0);
    }

    #[test]
    fn weights_are_quantized_to_mass_255() {
        let mesh = skinned_quad();
        let model = DataModel::wwmi();
        let exported = model
            .export(&mesh, &ExportOptions::default(), &mut ExportCache::new())
            .unwrap();

        let weights = exported.buffers["Blend"]
            .get_field(&AbstractSemantic::new(Semantic::Blendweight, 0))
            .unwrap();
        assert_eq!(weights.scalar_type(), ScalarType::U8);
        for row in weights.to_i64_vec().chunks_exact(4) {
            assert_eq!(row.iter().sum::<i64>(), 255);
        }
    }

    #[test]
    fn excluded_buffers_are_skipped() {
        let mesh = skinned_quad();
        let model = DataModel::wwmi();
        let options = ExportOptions {
            excluded_buffers: vec!["Blend".to_string(), "Vector".to_string()],
            ..Default::default()
        };
        let exported = model
            .export(&mesh, &options, &mut ExportCache::new())
            .unwrap();
        assert!(!exported.buffers.contains_key("Blend"));
        assert!(!exported.buffers.contains_key("Vector"));
        assert!(exported.buffers.contains_key("Position"));
    }

    #[test]
    fn component_past_the_mesh_is_an_error() {
        let mut mesh = skinned_quad();
        mesh.blend_indices = vec![[300, 1, 0, 0]; 4];
        let model = DataModel::wwmi();
        let options = ExportOptions {
            components: vec![MeshComponent {
                vertex_offset: 0,
                vertex_count: 4,
                index_offset: 0,
                index_count: 12,
            }],
            ..Default::default()
        };
        let err = model
            .export(&mesh, &options, &mut ExportCache::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::ComponentOutOfBounds { component: 0, .. }
        ));
    }

    #[test]
    fn high_bone_ids_produce_remap_buffers() {
        let mut mesh = skinned_quad();
        mesh.blend_indices = vec![[300, 1, 0, 0]; 4];
        mesh.blend_weights = vec![[0.5, 0.5, 0.0, 0.0]; 4];
        let model = DataModel::wwmi();
        let exported = model
            .export(&mesh, &ExportOptions::default(), &mut ExportCache::new())
            .unwrap();

        assert_eq!(exported.remap_counts, vec![2]);
        assert!(exported.buffers.contains_key("BlendRemapForward"));
        assert!(exported.buffers.contains_key("BlendRemapReverse"));

        // indices in the Blend buffer are component-local now
        let local = exported.buffers["Blend"]
            .get_field(&AbstractSemantic::new(Semantic::Blendindices, 0))
            .unwrap()
            .to_i64_vec();
        assert_eq!(&local[..4], &[1, 0, 0, 0]);
    }

    #[test]
    fn shapekey_buffers_follow_the_registry_layouts() {
        let mut mesh = skinned_quad();
        mesh.shapekeys.insert(
            0,
            vec![[0.1, 0.0, 0.0], [0.0; 3], [0.0; 3], [0.0; 3]],
        );
        let model = DataModel::wwmi();
        let exported = model
            .export(&mesh, &ExportOptions::default(), &mut ExportCache::new())
            .unwrap();

        let offsets = &exported.buffers["ShapeKeyOffset"];
        // 128 u32 offsets at 4 per element
        assert_eq!(offsets.len(), 32);
        let ids = &exported.buffers["ShapeKeyVertexId"];
        assert_eq!(ids.len(), 1);
        let deltas = &exported.buffers["ShapeKeyVertexOffset"];
        assert_eq!(deltas.len(), 6);
        assert_eq!(exported.shapekeys.as_ref().unwrap().vertex_count(), 1);
    }

    #[test]
    fn cache_is_keyed_by_identity() {
        let mut cache = ExportCache::new();
        cache.store("mesh-a".into(), vec![0, 1, 2]);
        assert_eq!(cache.vertex_ids("mesh-a"), Some(&[0u32, 1, 2][..]));
        assert_eq!(cache.vertex_ids("mesh-b"), None);
        cache.clear();
        assert_eq!(cache.vertex_ids("mesh-a"), None);
    }
}
