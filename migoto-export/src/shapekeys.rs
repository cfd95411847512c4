//! Shape key packing
//!
//! Shape keys are exported as three compact buffers sharing one running
//! vertex counter: per-group start offsets (128 groups), the loop ids of
//! affected vertices, and their position deltas as f16 rows padded to 6
//! components. Groups with no key or with near-zero deltas advance no
//! offset and emit no rows.

use half::f16;
use tracing::{debug, info};

use crate::error::ExportError;
use crate::source::MeshSource;

/// Shape key group ids addressable by the runtime
pub const SHAPEKEY_GROUPS: u32 = 128;

/// Deltas this small are treated as "no deformation"
const DELTA_EPSILON: f32 = 1e-8;

/// Scalars per ShapeKeyVertexOffset row (xyz delta + 3 spare)
pub const OFFSET_ROW_WIDTH: usize = 6;

/// Packed shape key data for one mesh
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeKeyBuffers {
    /// Running start offset per group, `SHAPEKEY_GROUPS` entries
    pub offsets: Vec<u32>,
    /// Loop ids of deformed vertices, all groups concatenated
    pub vertex_ids: Vec<u32>,
    /// f16 rows of [`OFFSET_ROW_WIDTH`], one per entry of `vertex_ids`
    pub vertex_offsets: Vec<f16>,
}

impl ShapeKeyBuffers {
    /// Total deformed vertex entries across all groups
    pub fn vertex_count(&self) -> usize {
        self.vertex_ids.len()
    }

    /// Runtime consistency checksum: sum of the first four group offsets
    pub fn checksum(&self) -> u32 {
        self.offsets.iter().take(4).sum()
    }
}

/// Pack the shape keys of `source` against the exported loop order.
///
/// `loop_vertex_ids` maps every exported loop back to its source vertex;
/// deltas are gathered through it so the output rows line up with the
/// vertex buffers. Returns `None` when no group deforms any vertex.
pub fn build_shapekeys(
    source: &dyn MeshSource,
    loop_vertex_ids: &[u32],
    mirror_mesh: bool,
) -> Result<Option<ShapeKeyBuffers>, ExportError> {
    let mut offsets: Vec<u32> = Vec::with_capacity(SHAPEKEY_GROUPS as usize);
    let mut vertex_ids: Vec<u32> = Vec::new();
    let mut vertex_offsets: Vec<f16> = Vec::new();

    for group in 0..SHAPEKEY_GROUPS {
        offsets.push(vertex_ids.len() as u32);

        let Some(deltas) = source.shapekey_deltas(group) else {
            continue;
        };
        let values = deltas.to_f32_vec();
        if values.iter().all(|d| d.abs() <= DELTA_EPSILON) {
            debug!(group, "skipping near-zero shape key");
            continue;
        }

        let per_loop = deltas.take_rows(loop_vertex_ids);
        let width = per_loop.width();
        if width != 3 {
            return Err(ExportError::Format(
                migoto_format::FormatError::VectorWidth { expected: 3, got: width },
            ));
        }
        let per_loop = per_loop.to_f32_vec();
        for (loop_id, row) in per_loop.chunks_exact(width).enumerate() {
            if row.iter().all(|&d| d == 0.0) {
                continue;
            }
            vertex_ids.push(loop_id as u32);
            let sign = if mirror_mesh { -1.0 } else { 1.0 };
            vertex_offsets.extend([
                f16::from_f32(row[0] * sign),
                f16::from_f32(row[1]),
                f16::from_f32(row[2]),
                f16::ZERO,
                f16::ZERO,
                f16::ZERO,
            ]);
        }
    }

    if vertex_ids.is_empty() {
        return Ok(None);
    }
    info!(deformed = vertex_ids.len(), "packed shape keys");
    Ok(Some(ShapeKeyBuffers {
        offsets,
        vertex_ids,
        vertex_offsets,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MeshData;

    fn keyed_mesh() -> MeshData {
        let mut mesh = MeshData {
            name: "keyed".into(),
            positions: vec![[0.0; 3]; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
            ..Default::default()
        };
        // group 2 moves vertices 1 and 3, group 5 is numerically dead
        mesh.shapekeys.insert(
            2,
            vec![[0.0; 3], [0.5, 0.0, 0.0], [0.0; 3], [0.0, -0.25, 0.0]],
        );
        mesh.shapekeys.insert(5, vec![[1e-9, 0.0, 0.0]; 4]);
        mesh
    }

    #[test]
    fn offsets_track_the_running_count() {
        let mesh = keyed_mesh();
        let keys = build_shapekeys(&mesh, &[0, 1, 2, 3], false).unwrap().unwrap();

        assert_eq!(keys.offsets.len(), SHAPEKEY_GROUPS as usize);
        assert_eq!(keys.offsets[2], 0);
        // both deformed vertices precede every later group's offset
        assert!(keys.offsets[3..].iter().all(|&o| o == 2));
        assert_eq!(keys.vertex_ids, vec![1, 3]);
        assert_eq!(keys.vertex_count(), 2);
        assert_eq!(keys.vertex_offsets.len(), 2 * OFFSET_ROW_WIDTH);
    }

    #[test]
    fn near_zero_groups_are_skipped() {
        let mesh = keyed_mesh();
        let keys = build_shapekeys(&mesh, &[0, 1, 2, 3], false).unwrap().unwrap();
        // group 5 added no entries
        assert_eq!(keys.offsets[5], 2);
        assert_eq!(keys.offsets[6], 2);
    }

    #[test]
    fn mirror_flips_the_x_delta() {
        let mesh = keyed_mesh();
        let keys = build_shapekeys(&mesh, &[0, 1, 2, 3], true).unwrap().unwrap();
        assert_eq!(keys.vertex_offsets[0], f16::from_f32(-0.5));
        // y delta of the second entry is untouched
        assert_eq!(keys.vertex_offsets[OFFSET_ROW_WIDTH + 1], f16::from_f32(-0.25));
    }

    #[test]
    fn keyless_mesh_yields_none() {
        let mesh = MeshData {
            positions: vec![[0.0; 3]; 3],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        assert!(build_shapekeys(&mesh, &[0, 1, 2], false).unwrap().is_none());
    }

    #[test]
    fn checksum_sums_the_first_four_offsets() {
        let keys = ShapeKeyBuffers {
            offsets: vec![0, 3, 7, 7, 9],
            vertex_ids: vec![0; 9],
            vertex_offsets: vec![f16::ZERO; 9 * OFFSET_ROW_WIDTH],
        };
        assert_eq!(keys.checksum(), 17);
    }
}
