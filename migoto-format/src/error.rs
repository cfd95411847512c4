//! Error taxonomy for the format library

use crate::array::ScalarType;
use crate::semantic::AbstractSemantic;

/// Interchange format version accepted by this build
pub const SUPPORTED_FORMAT_VERSION: &str = "1.0";

/// Interchange format type accepted by this build
pub const SUPPORTED_FORMAT_TYPE: &str = "WWMI";

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("unknown semantic name: {0}")]
    UnknownSemantic(String),

    #[error("unknown DXGI format token: {0}")]
    UnknownFormat(String),

    #[error("byte length {len} is not a multiple of element stride {stride}")]
    StrideMismatch { len: usize, stride: u32 },

    #[error("declared stride {declared} does not match computed layout stride {computed}")]
    DeclaredStrideMismatch { declared: u32, computed: u32 },

    #[error("buffer {buffer:?} is missing mandatory {semantic} semantic data")]
    MissingSemantic {
        buffer: String,
        semantic: AbstractSemantic,
    },

    #[error(
        "field {semantic} expects {expected} rows of {values} values, got {rows} rows of {got}"
    )]
    FieldShape {
        semantic: AbstractSemantic,
        expected: usize,
        values: usize,
        rows: usize,
        got: usize,
    },

    #[error("scalar type mismatch: expected {expected:?}, got {got:?}")]
    ScalarMismatch { expected: ScalarType, got: ScalarType },

    #[error("array length {len} is not a multiple of row width {width}")]
    RaggedArray { len: usize, width: usize },

    #[error("transform expects {expected}-component rows, got width {got}")]
    VectorWidth { expected: usize, got: usize },

    #[error("malformed fmt descriptor: {0}")]
    MalformedFmt(String),

    #[error(
        "metadata format version {found:?} is newer than supported {SUPPORTED_FORMAT_VERSION:?}, \
         update the tool to import this object"
    )]
    UnsupportedVersion { found: String },

    #[error("metadata format type {found:?} is not {SUPPORTED_FORMAT_TYPE:?}")]
    UnsupportedFormatType { found: String },

    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),
}
