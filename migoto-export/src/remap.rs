//! Per-component blend index remapping
//!
//! A draw call can address 256 bones, but a merged mesh routinely references
//! more. For every mesh component whose vertices reach bone ids past 255,
//! a local renumbering is generated: `forward[local] = global` and
//! `reverse[global] = local`, both fixed 512-entry zero-padded u16 tables.
//! Local ids are assigned in ascending global-id order so the output is
//! reproducible. Components that stay under the limit emit no table and a
//! zero remap size.

use std::ops::Range;

use hashbrown::HashSet;
use migoto_format::AttributeArray;
use tracing::debug;

use crate::error::ExportError;

/// Entries per forward/reverse table
pub const REMAP_TABLE_LEN: usize = 512;

/// Most bones one component may reference with positive weight
pub const MAX_COMPONENT_BONES: usize = 256;

/// Concatenated remap tables for all components, in component order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlendRemap {
    /// `forward[local] = global`, one 512-entry table per remapped component
    pub forward: Vec<u16>,
    /// `reverse[global] = local`, one 512-entry table per remapped component
    pub reverse: Vec<u16>,
    /// Per-component remapped bone count; 0 for components left unmapped
    pub counts: Vec<u32>,
}

impl BlendRemap {
    /// Whether any component needed a remap
    pub fn is_needed(&self) -> bool {
        self.counts.iter().any(|&c| c > 0)
    }
}

/// Build remap tables for every component, given the flat index stream,
/// each component's index range, and per-vertex blend indices/weights.
pub fn build_blend_remap(
    indices: &[u32],
    components: &[Range<usize>],
    blend_indices: &AttributeArray,
    blend_weights: &AttributeArray,
) -> Result<BlendRemap, ExportError> {
    if blend_indices.rows() != blend_weights.rows()
        || blend_indices.width() != blend_weights.width()
    {
        return Err(ExportError::MismatchedBlendArrays {
            indices: (blend_indices.rows(), blend_indices.width()),
            weights: (blend_weights.rows(), blend_weights.width()),
        });
    }
    let slots = blend_indices.width();
    let rows = blend_indices.rows();
    let bones = blend_indices.to_i64_vec();
    let weights = blend_weights.to_f32_vec();

    let mut remap = BlendRemap::default();

    for (component_id, range) in components.iter().enumerate() {
        // component ranges come from metadata and may not describe this mesh
        if range.end > indices.len() || range.start > range.end {
            return Err(ExportError::ComponentOutOfBounds {
                component: component_id,
                vertices: rows,
                indices: indices.len(),
            });
        }
        let mut vertex_ids: HashSet<u32> = HashSet::with_capacity(range.len());
        for &vertex in &indices[range.clone()] {
            if vertex as usize >= rows {
                return Err(ExportError::IndexOutOfRange {
                    vertex,
                    vertices: rows,
                });
            }
            vertex_ids.insert(vertex);
        }

        // first pass over every referenced slot, zero-weight included
        let max_bone = vertex_ids
            .iter()
            .flat_map(|&v| &bones[v as usize * slots..(v as usize + 1) * slots])
            .copied()
            .max()
            .unwrap_or(0);
        if max_bone < 256 {
            remap.counts.push(0);
            continue;
        }

        // only strictly positive weights force a remap
        let mut referenced: Vec<i64> = vertex_ids
            .iter()
            .flat_map(|&v| {
                let row = v as usize * slots..(v as usize + 1) * slots;
                bones[row.clone()]
                    .iter()
                    .zip(&weights[row])
                    .filter(|(_, &w)| w > 0.0)
                    .map(|(&b, _)| b)
                    .collect::<Vec<_>>()
            })
            .collect();
        referenced.sort_unstable();
        referenced.dedup();

        if referenced.last().copied().unwrap_or(0) < 256 {
            remap.counts.push(0);
            continue;
        }
        if referenced.len() > MAX_COMPONENT_BONES {
            return Err(ExportError::BlendRemapCapacity {
                component: component_id,
                count: referenced.len(),
            });
        }

        let mut forward = vec![0u16; REMAP_TABLE_LEN];
        let mut reverse = vec![0u16; REMAP_TABLE_LEN];
        for (local, &global) in referenced.iter().enumerate() {
            if !(0..REMAP_TABLE_LEN as i64).contains(&global) {
                return Err(ExportError::BoneIdOutOfRange {
                    component: component_id,
                    bone: global,
                });
            }
            forward[local] = global as u16;
            reverse[global as usize] = local as u16;
        }
        debug!(component_id, bones = referenced.len(), "built blend remap");

        remap.forward.extend_from_slice(&forward);
        remap.reverse.extend_from_slice(&reverse);
        remap.counts.push(referenced.len() as u32);
    }

    Ok(remap)
}
