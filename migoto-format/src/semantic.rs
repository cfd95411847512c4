//! Logical vertex attribute identities
//!
//! A [`Semantic`] names what an attribute stream *means* (position, normal,
//! blend weight, ...) independently of how it is encoded. Paired with a
//! channel number it forms an [`AbstractSemantic`], the key every buffer
//! layout and converter registry is indexed by.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// Logical role of a vertex attribute stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Semantic {
    VertexId,
    Index,
    Tangent,
    BitangentSign,
    Normal,
    TexCoord,
    Color,
    Position,
    Blendindices,
    Blendweight,
    ShapeKey,
    RawData,
}

impl Semantic {
    /// Wire name used in fmt descriptors and metadata (`POSITION`, `TEXCOORD`, ...)
    pub const fn as_str(self) -> &'static str {
        match self {
            Semantic::VertexId => "VERTEXID",
            Semantic::Index => "INDEX",
            Semantic::Tangent => "TANGENT",
            Semantic::BitangentSign => "BITANGENTSIGN",
            Semantic::Normal => "NORMAL",
            Semantic::TexCoord => "TEXCOORD",
            Semantic::Color => "COLOR",
            Semantic::Position => "POSITION",
            Semantic::Blendindices => "BLENDINDICES",
            Semantic::Blendweight => "BLENDWEIGHT",
            Semantic::ShapeKey => "SHAPEKEY",
            Semantic::RawData => "RAWDATA",
        }
    }
}

impl fmt::Display for Semantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Semantic {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VERTEXID" => Ok(Semantic::VertexId),
            "INDEX" => Ok(Semantic::Index),
            "TANGENT" => Ok(Semantic::Tangent),
            "BITANGENTSIGN" => Ok(Semantic::BitangentSign),
            "NORMAL" => Ok(Semantic::Normal),
            "TEXCOORD" => Ok(Semantic::TexCoord),
            "COLOR" => Ok(Semantic::Color),
            "POSITION" => Ok(Semantic::Position),
            "BLENDINDICES" => Ok(Semantic::Blendindices),
            "BLENDWEIGHT" => Ok(Semantic::Blendweight),
            "SHAPEKEY" => Ok(Semantic::ShapeKey),
            "RAWDATA" => Ok(Semantic::RawData),
            other => Err(FormatError::UnknownSemantic(other.to_string())),
        }
    }
}

impl TryFrom<String> for Semantic {
    type Error = FormatError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Semantic> for String {
    fn from(s: Semantic) -> Self {
        s.as_str().to_string()
    }
}

/// A semantic plus its channel number (e.g. the second UV set)
///
/// Equality and hashing are on the `(semantic, index)` pair; within one
/// [`BufferLayout`](crate::BufferLayout) the pair is unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbstractSemantic {
    pub semantic: Semantic,
    pub index: u32,
}

impl AbstractSemantic {
    pub const fn new(semantic: Semantic, index: u32) -> Self {
        Self { semantic, index }
    }

    /// Field name: the wire name with the channel appended when non-zero
    /// (`NORMAL`, `TEXCOORD1`, ...)
    pub fn name(&self) -> String {
        if self.index > 0 {
            format!("{}{}", self.semantic, self.index)
        } else {
            self.semantic.to_string()
        }
    }
}

impl fmt::Display for AbstractSemantic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.semantic, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for semantic in [
            Semantic::VertexId,
            Semantic::Index,
            Semantic::Tangent,
            Semantic::BitangentSign,
            Semantic::Normal,
            Semantic::TexCoord,
            Semantic::Color,
            Semantic::Position,
            Semantic::Blendindices,
            Semantic::Blendweight,
            Semantic::ShapeKey,
            Semantic::RawData,
        ] {
            assert_eq!(semantic.as_str().parse::<Semantic>().unwrap(), semantic);
        }
    }

    #[test]
    fn channel_suffix_only_when_nonzero() {
        assert_eq!(AbstractSemantic::new(Semantic::TexCoord, 0).name(), "TEXCOORD");
        assert_eq!(AbstractSemantic::new(Semantic::TexCoord, 2).name(), "TEXCOORD2");
    }

    #[test]
    fn equality_is_on_semantic_and_index() {
        let a = AbstractSemantic::new(Semantic::Color, 1);
        let b = AbstractSemantic::new(Semantic::Color, 1);
        let c = AbstractSemantic::new(Semantic::Color, 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
