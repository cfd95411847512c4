//! Shared types for 3dmigoto-style mesh buffer formats
//!
//! This crate provides the format layer shared between:
//! - `migoto-export` (mesh export pipeline)
//! - external tools reading or writing dumped buffer files
//!
//! # Modules
//!
//! - [`semantic`] - Abstract vertex attribute semantics (POSITION, BLENDWEIGHT, ...)
//! - [`dxgi`] - DXGI format descriptors and value encode/decode
//! - [`array`] - Tagged 2-D attribute arrays over scalar element types
//! - [`layout`] - Buffer layouts (semantic, format, stride, offset)
//! - [`buffer`] - Typed strided buffers over raw bytes
//! - [`fmt`] - Textual `fmt` buffer descriptors
//! - [`metadata`] - JSON metadata interchange (`Metadata.json`)

pub mod array;
pub mod buffer;
pub mod dxgi;
pub mod error;
pub mod fmt;
pub mod layout;
pub mod metadata;
pub mod semantic;

pub use array::{AttributeArray, ScalarType, Scalars};
pub use buffer::{Transform, TypedBuffer};
pub use dxgi::{DxgiFormat, DxgiType};
pub use error::{FormatError, SUPPORTED_FORMAT_TYPE, SUPPORTED_FORMAT_VERSION};
pub use fmt::{parse_fmt, write_fmt, FmtFile};
pub use layout::{BufferLayout, BufferSemantic};
pub use metadata::{
    ExtractedBuffer, ExtractedComponent, ExtractedObject, ExtractedSemantic, ExtractedShapeKeys,
    Metadata,
};
pub use semantic::{AbstractSemantic, Semantic};
