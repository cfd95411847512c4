//! Error taxonomy for the export pipeline

use migoto_format::FormatError;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(
        "component {component} references {count} bones with positive weight, \
         over the 256 addressable per draw call; split the geometry"
    )]
    BlendRemapCapacity { component: usize, count: usize },

    #[error("component {component} references bone id {bone}, over the 512 remap table size")]
    BoneIdOutOfRange { component: usize, bone: i64 },

    #[error(
        "component {component} spans past the mesh ({vertices} vertices, {indices} indices); \
         the metadata does not describe this mesh"
    )]
    ComponentOutOfBounds {
        component: usize,
        vertices: usize,
        indices: usize,
    },

    #[error("index stream references vertex {vertex}, past the {vertices} skinned vertices")]
    IndexOutOfRange { vertex: u32, vertices: usize },

    #[error(
        "blend indices shape {indices:?} does not match blend weights shape {weights:?}"
    )]
    MismatchedBlendArrays {
        indices: (usize, usize),
        weights: (usize, usize),
    },

    // internal invariant, not a user input error
    #[error("weight quantization deficit {deficit} exceeds {slots} weight slots")]
    QuantizerInvariant { deficit: i32, slots: usize },

    #[error("malformed OBJ at line {line}: {message}")]
    MalformedObj { line: usize, message: String },

    #[error("mesh source has no {0} data")]
    MissingAttribute(String),
}
