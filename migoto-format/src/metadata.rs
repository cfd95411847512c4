//! JSON metadata interchange
//!
//! The `Metadata.json` document produced next to an extracted object's
//! buffer files and consumed on export. The envelope carries `format_type`
//! and `format_version`; the payload describes the extracted mesh
//! partitions, shape-key block and the per-buffer export format overrides.
//!
//! Version policy is deliberately a plain string comparison: `"1.0"` and
//! anything lexically smaller is accepted, anything greater is rejected as
//! unsupported so the user upgrades the tool instead of patching data.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dxgi::DxgiFormat;
use crate::error::{FormatError, SUPPORTED_FORMAT_TYPE, SUPPORTED_FORMAT_VERSION};
use crate::layout::{BufferLayout, BufferSemantic};
use crate::semantic::{AbstractSemantic, Semantic};

/// Envelope of the interchange document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub format_type: String,
    pub format_version: String,
    pub data: ExtractedObject,
}

/// One extracted mesh object: partition table plus export format overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedObject {
    pub vb0_hash: String,
    pub cb4_hash: String,
    pub vertex_count: u32,
    pub index_count: u32,
    /// Whether the buffers were exported mirrored along X; a mirrored
    /// export keeps the source winding instead of flipping it
    #[serde(default)]
    pub mirror_mesh: bool,
    pub components: Vec<ExtractedComponent>,
    #[serde(default)]
    pub shapekeys: ExtractedShapeKeys,
    /// Optional per-buffer export format override; replaces the built-in
    /// buffer layouts when present
    #[serde(default)]
    pub export_format: IndexMap<String, ExtractedBuffer>,
}

/// One mesh partition: a contiguous vertex/index range of a merged mesh
/// belonging to one original sub-object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedComponent {
    pub vertex_offset: u32,
    pub vertex_count: u32,
    pub index_offset: u32,
    pub index_count: u32,
    pub vg_offset: u32,
    pub vg_count: u32,
    /// global bone index -> component-local bone index
    #[serde(default)]
    pub vg_map: BTreeMap<u32, u32>,
}

/// Shape-key block of the extracted object
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedShapeKeys {
    #[serde(default)]
    pub offsets_hash: String,
    #[serde(default)]
    pub scale_hash: String,
    #[serde(default)]
    pub vertex_count: u32,
    #[serde(default)]
    pub dispatch_y: u32,
    #[serde(default)]
    pub checksum: u32,
}

/// Declarative form of one buffer layout in the interchange document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedBuffer {
    pub semantics: Vec<ExtractedSemantic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedSemantic {
    pub name: Semantic,
    pub index: u32,
    pub format: DxgiFormat,
    #[serde(default)]
    pub stride: u32,
}

impl ExtractedSemantic {
    pub fn to_buffer_semantic(&self) -> BufferSemantic {
        let stride = if self.stride == 0 {
            self.format.byte_width()
        } else {
            self.stride
        };
        BufferSemantic::with_stride(AbstractSemantic::new(self.name, self.index), self.format, stride)
    }
}

impl ExtractedBuffer {
    pub fn to_layout(&self) -> BufferLayout {
        BufferLayout::from_semantics(self.semantics.iter().map(|s| s.to_buffer_semantic()))
    }

    pub fn from_layout(layout: &BufferLayout) -> Self {
        Self {
            semantics: layout
                .semantics()
                .iter()
                .map(|s| ExtractedSemantic {
                    name: s.semantic.semantic,
                    index: s.semantic.index,
                    format: s.format,
                    stride: s.stride,
                })
                .collect(),
        }
    }
}

impl Metadata {
    pub fn new(format_type: impl Into<String>, data: ExtractedObject) -> Self {
        Self {
            format_type: format_type.into(),
            format_version: SUPPORTED_FORMAT_VERSION.to_string(),
            data,
        }
    }

    /// Parse and gate an interchange document on format type and version
    pub fn from_json(text: &str) -> Result<Self, FormatError> {
        let metadata: Metadata = serde_json::from_str(text)?;
        if metadata.format_type != SUPPORTED_FORMAT_TYPE {
            return Err(FormatError::UnsupportedFormatType {
                found: metadata.format_type,
            });
        }
        // lexical comparison on purpose: exact "1.0" support only, older
        // documents pass, newer ones ask for a tool upgrade
        if metadata.format_version.as_str() > SUPPORTED_FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: metadata.format_version,
            });
        }
        Ok(metadata)
    }

    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_object() -> ExtractedObject {
        ExtractedObject {
            vb0_hash: "0b02a5f3".into(),
            cb4_hash: "d3a45cf1".into(),
            vertex_count: 6,
            index_count: 6,
            mirror_mesh: false,
            components: vec![ExtractedComponent {
                vertex_offset: 0,
                vertex_count: 6,
                index_offset: 0,
                index_count: 6,
                vg_offset: 0,
                vg_count: 2,
                vg_map: BTreeMap::from([(0, 0), (1, 1)]),
            }],
            shapekeys: ExtractedShapeKeys::default(),
            export_format: IndexMap::from([(
                "Position".to_string(),
                ExtractedBuffer {
                    semantics: vec![ExtractedSemantic {
                        name: Semantic::Position,
                        index: 0,
                        format: DxgiFormat::R32G32B32_FLOAT,
                        stride: 0,
                    }],
                },
            )]),
        }
    }

    #[test]
    fn json_round_trip() {
        let metadata = Metadata::new("WWMI", sample_object());
        let text = metadata.to_json().unwrap();
        let back = Metadata::from_json(&text).unwrap();
        assert_eq!(back.format_version, "1.0");
        assert_eq!(back.data.vertex_count, 6);
        assert_eq!(back.data.components[0].vg_map.get(&1), Some(&1));
        let layout = back.data.export_format["Position"].to_layout();
        assert_eq!(layout.stride(), 12);
    }

    #[test]
    fn newer_version_is_rejected_older_is_accepted() {
        let mut metadata = Metadata::new("WWMI", sample_object());

        metadata.format_version = "1.1".into();
        let text = metadata.to_json().unwrap();
        assert!(matches!(
            Metadata::from_json(&text),
            Err(FormatError::UnsupportedVersion { .. })
        ));

        metadata.format_version = "0.9".into();
        let text = metadata.to_json().unwrap();
        assert!(Metadata::from_json(&text).is_ok());
    }

    #[test]
    fn unknown_format_type_is_rejected() {
        let mut metadata = Metadata::new("WWMI", sample_object());
        metadata.format_type = "GIMI".into();
        let text = metadata.to_json().unwrap();
        assert!(matches!(
            Metadata::from_json(&text),
            Err(FormatError::UnsupportedFormatType { found }) if found == "GIMI"
        ));
    }

    #[test]
    fn zero_stride_defaults_to_format_width() {
        let semantic = ExtractedSemantic {
            name: Semantic::Blendindices,
            index: 0,
            format: DxgiFormat::R8_UINT,
            stride: 4,
        };
        assert_eq!(semantic.to_buffer_semantic().num_values(), 4);

        let semantic = ExtractedSemantic {
            name: Semantic::TexCoord,
            index: 0,
            format: DxgiFormat::R16G16_FLOAT,
            stride: 0,
        };
        assert_eq!(semantic.to_buffer_semantic().stride, 4);
    }
}
