//! migoto-export library
//!
//! Converts in-memory meshes to 3DMigoto-style buffer sets (and back) for
//! use by the `migoto-export` binary and other tools.

pub mod convert;
pub mod error;
pub mod files;
pub mod model;
pub mod obj;
pub mod remap;
pub mod shapekeys;
pub mod source;
pub mod weights;

pub use convert::{Converter, ConverterSet};
pub use error::ExportError;
pub use files::{build_metadata, import_mesh, read_metadata, write_mod_folder};
pub use model::{DataModel, ExportCache, ExportOptions, ExportedMesh, MeshComponent};
pub use obj::{load_obj, parse_obj, write_obj};
pub use remap::{build_blend_remap, BlendRemap};
pub use shapekeys::{build_shapekeys, ShapeKeyBuffers};
pub use source::{MeshData, MeshSource};
pub use weights::quantize_weights;
