//! Buffer layouts
//!
//! A [`BufferLayout`] is the ordered list of (semantic, format, stride,
//! offset) fields making up one fixed-stride binary record. Offsets and the
//! total stride are derived from declaration order unless a layout opts
//! into a forced stride (padding to a hardware-required multiple).

use crate::dxgi::DxgiFormat;
use crate::semantic::{AbstractSemantic, Semantic};

/// One field of a buffer element: an abstract semantic bound to a format,
/// a byte stride and an offset inside the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSemantic {
    pub semantic: AbstractSemantic,
    pub format: DxgiFormat,
    pub stride: u32,
    pub offset: u32,
}

impl BufferSemantic {
    /// Stride defaults to the format's byte width
    pub fn new(semantic: AbstractSemantic, format: DxgiFormat) -> Self {
        Self::with_stride(semantic, format, format.byte_width())
    }

    /// Explicit stride for padded fields (a field may occupy more bytes
    /// than its format strictly needs; padding is extra components)
    pub fn with_stride(semantic: AbstractSemantic, format: DxgiFormat, stride: u32) -> Self {
        Self {
            semantic,
            format,
            stride,
            offset: 0,
        }
    }

    /// Number of scalar values in one element of this field
    pub fn num_values(&self) -> u32 {
        self.format.num_values(self.stride)
    }

    /// fmt descriptor element block
    pub fn to_fmt_string(&self) -> String {
        format!(
            "  SemanticName: {}\n  SemanticIndex: {}\n  Format: {}\n  InputSlot: 0\n  \
             AlignedByteOffset: {}\n  InputSlotClass: per-vertex\n  InstanceDataStepRate: 0\n",
            self.semantic.semantic,
            self.semantic.index,
            self.format.format_token(),
            self.offset,
        )
    }
}

/// Ordered collection of [`BufferSemantic`]s plus the computed element stride
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferLayout {
    semantics: Vec<BufferSemantic>,
    stride: u32,
    force_stride: Option<u32>,
}

impl BufferLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a layout from fields in declaration order, assigning offsets.
    /// A repeated abstract semantic declared without an explicit channel
    /// auto-increments its channel (second `TEXCOORD` becomes `TEXCOORD1`).
    pub fn from_semantics(semantics: impl IntoIterator<Item = BufferSemantic>) -> Self {
        let mut layout = Self::new();
        for mut semantic in semantics {
            if semantic.semantic.index == 0 && layout.get_element(&semantic.semantic).is_some() {
                semantic.semantic.index = layout
                    .semantics
                    .iter()
                    .filter(|s| s.semantic.semantic == semantic.semantic.semantic)
                    .map(|s| s.semantic.index + 1)
                    .max()
                    .unwrap_or(0);
            }
            layout.add_element(semantic);
        }
        layout
    }

    /// Force raw imports to be padded to a multiple of `stride` bytes
    pub fn with_forced_stride(mut self, stride: u32) -> Self {
        self.force_stride = Some(stride);
        self
    }

    /// Element stride in bytes
    pub fn stride(&self) -> u32 {
        match self.force_stride {
            Some(forced) => forced.max(self.stride),
            None => self.stride,
        }
    }

    pub fn forced_stride(&self) -> Option<u32> {
        self.force_stride
    }

    pub fn semantics(&self) -> &[BufferSemantic] {
        &self.semantics
    }

    pub fn is_empty(&self) -> bool {
        self.semantics.is_empty()
    }

    /// Exact `(semantic, index)` match. Absence means "this buffer does not
    /// carry this attribute", not an error.
    pub fn get_element(&self, semantic: &AbstractSemantic) -> Option<&BufferSemantic> {
        self.semantics.iter().find(|s| s.semantic == *semantic)
    }

    /// Whether the layout carries any field of the given semantic kind
    pub fn has_semantic(&self, semantic: Semantic) -> bool {
        self.semantics.iter().any(|s| s.semantic.semantic == semantic)
    }

    /// Append a field, assigning its offset at the current end of the
    /// element. No-op if an equal abstract semantic is already present.
    pub fn add_element(&mut self, mut semantic: BufferSemantic) {
        if self.get_element(&semantic.semantic).is_some() {
            return;
        }
        semantic.offset = self.stride;
        self.stride += semantic.stride;
        self.semantics.push(semantic);
    }

    /// Add any element of `other` missing from self, keeping own offsets
    /// for the fields already present.
    pub fn merge(&mut self, other: &BufferLayout) {
        for semantic in &other.semantics {
            if self.get_element(&semantic.semantic).is_none() {
                self.add_element(*semantic);
            }
        }
    }

    /// fmt descriptor element list
    pub fn to_fmt_string(&self) -> String {
        let mut out = String::new();
        for (i, semantic) in self.semantics.iter().enumerate() {
            out.push_str(&format!("element[{i}]:\n"));
            out.push_str(&semantic.to_fmt_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn semantic(kind: Semantic, index: u32, format: DxgiFormat) -> BufferSemantic {
        BufferSemantic::new(AbstractSemantic::new(kind, index), format)
    }

    #[test]
    fn offsets_follow_declaration_order() {
        let layout = BufferLayout::from_semantics([
            semantic(Semantic::Tangent, 0, DxgiFormat::R8G8B8A8_SNORM),
            semantic(Semantic::Normal, 0, DxgiFormat::R8G8B8_SNORM),
            semantic(Semantic::BitangentSign, 0, DxgiFormat::R8_SNORM),
        ]);
        let offsets: Vec<u32> = layout.semantics().iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0, 4, 7]);
        assert_eq!(layout.stride(), 8);
    }

    #[test]
    fn duplicate_semantic_is_a_noop() {
        let mut layout = BufferLayout::from_semantics([semantic(
            Semantic::Position,
            0,
            DxgiFormat::R32G32B32_FLOAT,
        )]);
        layout.add_element(semantic(Semantic::Position, 0, DxgiFormat::R32G32B32_FLOAT));
        assert_eq!(layout.semantics().len(), 1);
        assert_eq!(layout.stride(), 12);
    }

    #[test]
    fn repeated_channel_zero_auto_increments() {
        let layout = BufferLayout::from_semantics([
            semantic(Semantic::TexCoord, 0, DxgiFormat::R16G16_FLOAT),
            semantic(Semantic::TexCoord, 0, DxgiFormat::R16G16_FLOAT),
            semantic(Semantic::TexCoord, 0, DxgiFormat::R16G16_FLOAT),
        ]);
        let channels: Vec<u32> = layout
            .semantics()
            .iter()
            .map(|s| s.semantic.index)
            .collect();
        assert_eq!(channels, vec![0, 1, 2]);
    }

    #[test]
    fn merge_keeps_own_offsets() {
        let mut a = BufferLayout::from_semantics([semantic(
            Semantic::Position,
            0,
            DxgiFormat::R32G32B32_FLOAT,
        )]);
        let b = BufferLayout::from_semantics([
            semantic(Semantic::Position, 0, DxgiFormat::R32G32B32_FLOAT),
            semantic(Semantic::Normal, 0, DxgiFormat::R32G32B32_FLOAT),
        ]);
        a.merge(&b);
        assert_eq!(a.semantics().len(), 2);
        assert_eq!(a.get_element(&AbstractSemantic::new(Semantic::Position, 0)).unwrap().offset, 0);
        assert_eq!(a.get_element(&AbstractSemantic::new(Semantic::Normal, 0)).unwrap().offset, 12);
    }

    #[test]
    fn padded_field_extends_stride() {
        let layout = BufferLayout::from_semantics([
            BufferSemantic::with_stride(
                AbstractSemantic::new(Semantic::Blendindices, 0),
                DxgiFormat::R8_UINT,
                4,
            ),
            BufferSemantic::with_stride(
                AbstractSemantic::new(Semantic::Blendweight, 0),
                DxgiFormat::R8_UINT,
                4,
            ),
        ]);
        assert_eq!(layout.stride(), 8);
        assert_eq!(layout.semantics()[0].num_values(), 4);
    }
}
