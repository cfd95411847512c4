//! Mesh source boundary
//!
//! The export driver pulls attribute data through the [`MeshSource`] trait
//! instead of talking to any host application directly. [`MeshData`] is the
//! in-memory implementation used by the OBJ loader, the import path, and
//! the tests.

use std::collections::BTreeMap;

use migoto_format::{AbstractSemantic, AttributeArray, Semantic};

/// Fixed bone slot count per vertex
pub const BLEND_SLOTS: usize = 4;

/// Read-only view of one mesh the export driver can drain
pub trait MeshSource {
    /// Identity used by the export cache; a changed identity invalidates
    /// cached loop data
    fn identity(&self) -> String;

    /// Vertex count (attribute arrays are rows of this count)
    fn vertex_count(&self) -> usize;

    /// Attribute array for one semantic channel, `None` when the mesh does
    /// not carry it. Absence is not an error; the corresponding buffer is
    /// omitted from the export.
    fn attribute(&self, semantic: &AbstractSemantic) -> Option<AttributeArray>;

    /// Flat triangle index stream
    fn indices(&self) -> Vec<u32>;

    /// Per-vertex position deltas of one shape key group, `None` when the
    /// group is absent
    fn shapekey_deltas(&self, group: u32) -> Option<AttributeArray>;

    /// Shape key group ids present on this mesh, ascending
    fn shapekey_groups(&self) -> Vec<u32>;
}

/// Plain in-memory mesh
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 3]>,
    pub bitangent_signs: Vec<f32>,
    /// One list per TEXCOORD channel
    pub uvs: Vec<Vec<[f32; 2]>>,
    pub colors: Vec<[f32; 4]>,
    pub blend_indices: Vec<[u32; BLEND_SLOTS]>,
    pub blend_weights: Vec<[f32; BLEND_SLOTS]>,
    pub indices: Vec<u32>,
    /// Shape key group id -> per-vertex position deltas
    pub shapekeys: BTreeMap<u32, Vec<[f32; 3]>>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn rows_match(&self, rows: usize) -> bool {
        rows == self.positions.len() && rows > 0
    }
}

fn flatten<const N: usize>(rows: &[[f32; N]]) -> AttributeArray {
    let values: Vec<f32> = rows.iter().flatten().copied().collect();
    // rows of N scalars by construction
    AttributeArray::from_f32(values, N).unwrap_or_else(|_| unreachable!())
}

impl MeshSource for MeshData {
    fn identity(&self) -> String {
        format!("{}:{}:{}", self.name, self.positions.len(), self.indices.len())
    }

    fn vertex_count(&self) -> usize {
        MeshData::vertex_count(self)
    }

    fn attribute(&self, semantic: &AbstractSemantic) -> Option<AttributeArray> {
        match (semantic.semantic, semantic.index) {
            (Semantic::Position, 0) if !self.positions.is_empty() => {
                Some(flatten(&self.positions))
            }
            (Semantic::Normal, 0) if self.rows_match(self.normals.len()) => {
                Some(flatten(&self.normals))
            }
            (Semantic::Tangent, 0) if self.rows_match(self.tangents.len()) => {
                Some(flatten(&self.tangents))
            }
            (Semantic::BitangentSign, 0) if self.rows_match(self.bitangent_signs.len()) => {
                AttributeArray::from_f32(self.bitangent_signs.clone(), 1).ok()
            }
            (Semantic::TexCoord, channel) => {
                let uvs = self.uvs.get(channel as usize)?;
                if !self.rows_match(uvs.len()) {
                    return None;
                }
                Some(flatten(uvs))
            }
            (Semantic::Color, 0) if self.rows_match(self.colors.len()) => {
                Some(flatten(&self.colors))
            }
            (Semantic::Blendindices, 0) if self.rows_match(self.blend_indices.len()) => {
                let values: Vec<u32> = self.blend_indices.iter().flatten().copied().collect();
                AttributeArray::from_u32(values, BLEND_SLOTS).ok()
            }
            (Semantic::Blendweight, 0) if self.rows_match(self.blend_weights.len()) => {
                Some(flatten(&self.blend_weights))
            }
            (Semantic::VertexId, 0) if !self.positions.is_empty() => {
                let ids: Vec<u32> = (0..self.positions.len() as u32).collect();
                AttributeArray::from_u32(ids, 1).ok()
            }
            _ => None,
        }
    }

    fn indices(&self) -> Vec<u32> {
        self.indices.clone()
    }

    fn shapekey_deltas(&self, group: u32) -> Option<AttributeArray> {
        let deltas = self.shapekeys.get(&group)?;
        if deltas.len() != self.positions.len() {
            return None;
        }
        Some(flatten(deltas))
    }

    fn shapekey_groups(&self) -> Vec<u32> {
        self.shapekeys.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh() -> MeshData {
        MeshData {
            name: "quad".into(),
            positions: vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            uvs: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]],
            indices: vec![0, 1, 2, 0, 2, 3],
            ..Default::default()
        }
    }

    #[test]
    fn present_attributes_have_vertex_count_rows() {
        let mesh = mesh();
        let positions = mesh
            .attribute(&AbstractSemantic::new(Semantic::Position, 0))
            .unwrap();
        assert_eq!(positions.rows(), 4);
        assert_eq!(positions.width(), 3);

        let uv = mesh
            .attribute(&AbstractSemantic::new(Semantic::TexCoord, 0))
            .unwrap();
        assert_eq!(uv.rows(), 4);
    }

    #[test]
    fn absent_attributes_are_none() {
        let mesh = mesh();
        assert!(mesh.attribute(&AbstractSemantic::new(Semantic::Color, 0)).is_none());
        assert!(mesh.attribute(&AbstractSemantic::new(Semantic::TexCoord, 1)).is_none());
    }

    #[test]
    fn vertex_ids_are_sequential() {
        let ids = mesh()
            .attribute(&AbstractSemantic::new(Semantic::VertexId, 0))
            .unwrap();
        assert_eq!(ids.to_i64_vec(), vec![0, 1, 2, 3]);
    }
}
