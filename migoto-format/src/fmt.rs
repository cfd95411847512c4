//! Textual `fmt` buffer descriptors
//!
//! The companion text format that describes one vertex buffer layout plus
//! its index buffer format, used to regenerate a [`BufferLayout`] from a
//! dumped buffer file. Index formats are single-component on the wire
//! (`DXGI_FORMAT_R16_UINT`) but promoted to the 3-component triad form in
//! memory, matching the one-face-per-element index buffer convention.

use crate::dxgi::{DxgiFormat, DxgiType};
use crate::error::FormatError;
use crate::layout::{BufferLayout, BufferSemantic};
use crate::semantic::{AbstractSemantic, Semantic};

/// Parsed fmt descriptor: vertex buffer layout + index buffer layout
#[derive(Debug, Clone)]
pub struct FmtFile {
    pub vb_layout: BufferLayout,
    pub ib_layout: BufferLayout,
    pub topology: String,
}

/// Promote a single-component index format to its triad form
fn promote_index_format(format: DxgiFormat) -> DxgiFormat {
    if format.components == 1 {
        DxgiFormat::new(format.dxgi_type, 3)
    } else {
        format
    }
}

/// Demote a triad index format back to the single-component wire token
fn demote_index_format(format: DxgiFormat) -> Result<DxgiFormat, FormatError> {
    match format.dxgi_type {
        DxgiType::Uint8 | DxgiType::Uint16 | DxgiType::Uint32 => {
            Ok(DxgiFormat::new(format.dxgi_type, 1))
        }
        _ => Err(FormatError::UnknownFormat(format.name())),
    }
}

/// Parse a fmt descriptor
pub fn parse_fmt(text: &str) -> Result<FmtFile, FormatError> {
    #[derive(Default)]
    struct Element {
        name: Option<Semantic>,
        index: Option<u32>,
        format: Option<DxgiFormat>,
        offset: Option<u32>,
    }

    let mut declared_stride: Option<u32> = None;
    let mut topology = String::new();
    let mut ib_layout: Option<BufferLayout> = None;
    let mut elements: Vec<Element> = Vec::new();
    let mut in_elements = false;

    for line in text.lines().map(str::trim) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        if key.starts_with("element[") || key == "element" {
            elements.push(Element::default());
            in_elements = true;
            continue;
        }

        if !in_elements {
            match key {
                "stride" => {
                    declared_stride = Some(value.parse().map_err(|_| {
                        FormatError::MalformedFmt(format!("bad stride value {value:?}"))
                    })?);
                }
                "topology" => {
                    if value != "trianglelist" {
                        return Err(FormatError::MalformedFmt(format!(
                            "topology {value:?} is not supported"
                        )));
                    }
                    topology = value.to_string();
                }
                "format" => {
                    let format = promote_index_format(value.parse()?);
                    ib_layout = Some(BufferLayout::from_semantics([BufferSemantic::new(
                        AbstractSemantic::new(Semantic::Index, 0),
                        format,
                    )]));
                }
                _ => {}
            }
            continue;
        }

        let element = elements
            .last_mut()
            .ok_or_else(|| FormatError::MalformedFmt("element field before element[0]".into()))?;
        match key {
            "SemanticName" => element.name = Some(value.parse()?),
            "SemanticIndex" => {
                element.index = Some(value.parse().map_err(|_| {
                    FormatError::MalformedFmt(format!("bad semantic index {value:?}"))
                })?)
            }
            "Format" => element.format = Some(value.parse()?),
            "AlignedByteOffset" => {
                element.offset = Some(value.parse().map_err(|_| {
                    FormatError::MalformedFmt(format!("bad byte offset {value:?}"))
                })?)
            }
            _ => {}
        }
    }

    let declared_stride = declared_stride
        .ok_or_else(|| FormatError::MalformedFmt("missing stride declaration".into()))?;

    // Per-element stride comes from the offset deltas; the last element
    // runs to the declared stride.
    let mut vb_layout = BufferLayout::new();
    for (i, element) in elements.iter().enumerate() {
        let (Some(name), Some(index), Some(format), Some(offset)) =
            (element.name, element.index, element.format, element.offset)
        else {
            return Err(FormatError::MalformedFmt(format!(
                "element[{i}] is missing one of SemanticName/SemanticIndex/Format/AlignedByteOffset"
            )));
        };
        let next_offset = elements
            .get(i + 1)
            .and_then(|e| e.offset)
            .unwrap_or(declared_stride);
        let stride = next_offset.checked_sub(offset).ok_or_else(|| {
            FormatError::MalformedFmt(format!("element[{i}] offsets are not monotonic"))
        })?;
        if stride < format.byte_width() {
            return Err(FormatError::DeclaredStrideMismatch {
                declared: declared_stride,
                computed: offset + format.byte_width(),
            });
        }
        vb_layout.add_element(BufferSemantic::with_stride(
            AbstractSemantic::new(name, index),
            format,
            stride,
        ));
    }

    if !vb_layout.is_empty() && vb_layout.stride() != declared_stride {
        return Err(FormatError::DeclaredStrideMismatch {
            declared: declared_stride,
            computed: vb_layout.stride(),
        });
    }

    Ok(FmtFile {
        vb_layout,
        ib_layout: ib_layout.unwrap_or_default(),
        topology,
    })
}

/// Render a fmt descriptor for a vertex buffer layout + index format
pub fn write_fmt(vb_layout: &BufferLayout, ib_format: DxgiFormat) -> Result<String, FormatError> {
    let ib_token = demote_index_format(ib_format)?.format_token();
    let mut out = String::new();
    out.push_str(&format!("stride: {}\n", vb_layout.stride()));
    out.push_str("topology: trianglelist\n");
    out.push_str(&format!("format: {ib_token}\n"));
    out.push_str(&vb_layout.to_fmt_string());
    Ok(out)
}
