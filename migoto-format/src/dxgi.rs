//! DXGI-style numeric format registry
//!
//! A [`DxgiFormat`] describes how one buffer field is encoded: a scalar
//! encoding ([`DxgiType`]) times a component count. Formats convert between
//! numeric value space (f32 for float and normalized encodings, native
//! integers otherwise) and their storage scalars; the byte form is always
//! little-endian.

use std::fmt;
use std::str::FromStr;

use half::f16;
use serde::{Deserialize, Serialize};

use crate::array::{AttributeArray, ScalarType, Scalars};
use crate::error::FormatError;

/// Scalar encoding of one format component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DxgiType {
    Float32,
    Float16,
    Unorm16,
    Unorm8,
    Snorm16,
    Snorm8,
    Uint32,
    Uint16,
    Uint8,
    Sint32,
    Sint16,
    Sint8,
}

impl DxgiType {
    /// Byte width of one component
    pub const fn byte_width(self) -> u32 {
        self.storage_type().byte_width() as u32
    }

    /// Scalar type the component is stored as
    pub const fn storage_type(self) -> ScalarType {
        match self {
            DxgiType::Float32 => ScalarType::F32,
            DxgiType::Float16 => ScalarType::F16,
            DxgiType::Unorm16 => ScalarType::U16,
            DxgiType::Unorm8 => ScalarType::U8,
            DxgiType::Snorm16 => ScalarType::I16,
            DxgiType::Snorm8 => ScalarType::I8,
            DxgiType::Uint32 => ScalarType::U32,
            DxgiType::Uint16 => ScalarType::U16,
            DxgiType::Uint8 => ScalarType::U8,
            DxgiType::Sint32 => ScalarType::I32,
            DxgiType::Sint16 => ScalarType::I16,
            DxgiType::Sint8 => ScalarType::I8,
        }
    }

    const fn bits(self) -> u32 {
        self.byte_width() * 8
    }

    const fn suffix(self) -> &'static str {
        match self {
            DxgiType::Float32 | DxgiType::Float16 => "FLOAT",
            DxgiType::Unorm16 | DxgiType::Unorm8 => "UNORM",
            DxgiType::Snorm16 | DxgiType::Snorm8 => "SNORM",
            DxgiType::Uint32 | DxgiType::Uint16 | DxgiType::Uint8 => "UINT",
            DxgiType::Sint32 | DxgiType::Sint16 | DxgiType::Sint8 => "SINT",
        }
    }

    fn from_parts(bits: u32, suffix: &str) -> Result<Self, FormatError> {
        match (bits, suffix) {
            (32, "FLOAT") => Ok(DxgiType::Float32),
            (16, "FLOAT") => Ok(DxgiType::Float16),
            (16, "UNORM") => Ok(DxgiType::Unorm16),
            (8, "UNORM") => Ok(DxgiType::Unorm8),
            (16, "SNORM") => Ok(DxgiType::Snorm16),
            (8, "SNORM") => Ok(DxgiType::Snorm8),
            (32, "UINT") => Ok(DxgiType::Uint32),
            (16, "UINT") => Ok(DxgiType::Uint16),
            (8, "UINT") => Ok(DxgiType::Uint8),
            (32, "SINT") => Ok(DxgiType::Sint32),
            (16, "SINT") => Ok(DxgiType::Sint16),
            (8, "SINT") => Ok(DxgiType::Sint8),
            _ => Err(FormatError::UnknownFormat(format!("R{bits}_{suffix}"))),
        }
    }
}

/// One buffer field encoding: scalar type x component count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DxgiFormat {
    pub dxgi_type: DxgiType,
    pub components: u32,
}

#[allow(non_upper_case_globals)]
impl DxgiFormat {
    pub const R32G32B32A32_FLOAT: Self = Self::new(DxgiType::Float32, 4);
    pub const R32G32B32_FLOAT: Self = Self::new(DxgiType::Float32, 3);
    pub const R32G32_FLOAT: Self = Self::new(DxgiType::Float32, 2);
    pub const R32_FLOAT: Self = Self::new(DxgiType::Float32, 1);
    pub const R16G16B16A16_FLOAT: Self = Self::new(DxgiType::Float16, 4);
    pub const R16G16_FLOAT: Self = Self::new(DxgiType::Float16, 2);
    pub const R16_FLOAT: Self = Self::new(DxgiType::Float16, 1);
    pub const R16G16_UNORM: Self = Self::new(DxgiType::Unorm16, 2);
    pub const R8G8B8A8_UNORM: Self = Self::new(DxgiType::Unorm8, 4);
    pub const R8_UNORM: Self = Self::new(DxgiType::Unorm8, 1);
    pub const R8G8B8A8_SNORM: Self = Self::new(DxgiType::Snorm8, 4);
    pub const R8G8B8_SNORM: Self = Self::new(DxgiType::Snorm8, 3);
    pub const R8_SNORM: Self = Self::new(DxgiType::Snorm8, 1);
    pub const R32G32B32A32_UINT: Self = Self::new(DxgiType::Uint32, 4);
    pub const R32G32B32_UINT: Self = Self::new(DxgiType::Uint32, 3);
    pub const R32_UINT: Self = Self::new(DxgiType::Uint32, 1);
    pub const R16G16B16_UINT: Self = Self::new(DxgiType::Uint16, 3);
    pub const R16_UINT: Self = Self::new(DxgiType::Uint16, 1);
    pub const R8G8B8_UINT: Self = Self::new(DxgiType::Uint8, 3);
    pub const R8_UINT: Self = Self::new(DxgiType::Uint8, 1);

    pub const fn new(dxgi_type: DxgiType, components: u32) -> Self {
        Self {
            dxgi_type,
            components,
        }
    }

    /// Total byte width of one element
    pub const fn byte_width(self) -> u32 {
        self.dxgi_type.byte_width() * self.components
    }

    /// Scalar type elements are stored as
    pub const fn storage_type(self) -> ScalarType {
        self.dxgi_type.storage_type()
    }

    /// Number of scalar values a field of `stride` bytes holds. Padding
    /// beyond the format's own width occupies extra components.
    pub const fn num_values(self, stride: u32) -> u32 {
        stride / self.dxgi_type.byte_width()
    }

    /// Short token (`R32G32B32_FLOAT`)
    pub fn name(self) -> String {
        const CHANNELS: [&str; 4] = ["R", "G", "B", "A"];
        let bits = self.dxgi_type.bits();
        let mut out = String::new();
        for channel in CHANNELS.iter().take(self.components as usize) {
            out.push_str(channel);
            out.push_str(&bits.to_string());
        }
        out.push('_');
        out.push_str(self.dxgi_type.suffix());
        out
    }

    /// Full token (`DXGI_FORMAT_R32G32B32_FLOAT`)
    pub fn format_token(self) -> String {
        format!("DXGI_FORMAT_{}", self.name())
    }

    /// Decode storage scalars into numeric value space: float and
    /// normalized formats become f32, integer formats stay integral.
    pub fn decode_values(self, data: &AttributeArray) -> Result<AttributeArray, FormatError> {
        let expected = self.storage_type();
        if data.scalar_type() != expected {
            return Err(FormatError::ScalarMismatch {
                expected,
                got: data.scalar_type(),
            });
        }
        let width = data.width();
        let decoded = match (self.dxgi_type, data.values()) {
            (DxgiType::Float16, Scalars::F16(v)) => {
                Scalars::F32(v.iter().map(|x| x.to_f32()).collect())
            }
            (DxgiType::Unorm16, Scalars::U16(v)) => {
                Scalars::F32(v.iter().map(|&x| x as f32 / 65535.0).collect())
            }
            (DxgiType::Unorm8, Scalars::U8(v)) => {
                Scalars::F32(v.iter().map(|&x| x as f32 / 255.0).collect())
            }
            (DxgiType::Snorm16, Scalars::I16(v)) => {
                Scalars::F32(v.iter().map(|&x| (x as f32 / 32767.0).max(-1.0)).collect())
            }
            (DxgiType::Snorm8, Scalars::I8(v)) => {
                Scalars::F32(v.iter().map(|&x| (x as f32 / 127.0).max(-1.0)).collect())
            }
            _ => return Ok(data.clone()),
        };
        AttributeArray::new(decoded, width)
    }

    /// Encode numeric values into this format's storage scalars. Lossy only
    /// by the format's own quantization (clamp + scale for normalized
    /// types, f16 rounding, integer narrowing).
    pub fn encode_values(self, data: &AttributeArray) -> Result<AttributeArray, FormatError> {
        let width = data.width();
        let encoded = match self.dxgi_type {
            DxgiType::Float32 => Scalars::F32(data.to_f32_vec()),
            DxgiType::Float16 => Scalars::F16(
                data.to_f32_vec()
                    .into_iter()
                    .map(f16::from_f32)
                    .collect(),
            ),
            DxgiType::Unorm16 => Scalars::U16(
                data.to_f32_vec()
                    .into_iter()
                    .map(|x| (x.clamp(0.0, 1.0) * 65535.0) as u16)
                    .collect(),
            ),
            DxgiType::Unorm8 => Scalars::U8(
                data.to_f32_vec()
                    .into_iter()
                    .map(|x| (x.clamp(0.0, 1.0) * 255.0) as u8)
                    .collect(),
            ),
            DxgiType::Snorm16 => Scalars::I16(
                data.to_f32_vec()
                    .into_iter()
                    .map(|x| (x.clamp(-1.0, 1.0) * 32767.0) as i16)
                    .collect(),
            ),
            DxgiType::Snorm8 => Scalars::I8(
                data.to_f32_vec()
                    .into_iter()
                    .map(|x| (x.clamp(-1.0, 1.0) * 127.0) as i8)
                    .collect(),
            ),
            DxgiType::Uint32 => {
                Scalars::U32(data.to_i64_vec().into_iter().map(|x| x as u32).collect())
            }
            DxgiType::Uint16 => {
                Scalars::U16(data.to_i64_vec().into_iter().map(|x| x as u16).collect())
            }
            DxgiType::Uint8 => {
                Scalars::U8(data.to_i64_vec().into_iter().map(|x| x as u8).collect())
            }
            DxgiType::Sint32 => {
                Scalars::I32(data.to_i64_vec().into_iter().map(|x| x as i32).collect())
            }
            DxgiType::Sint16 => {
                Scalars::I16(data.to_i64_vec().into_iter().map(|x| x as i16).collect())
            }
            DxgiType::Sint8 => {
                Scalars::I8(data.to_i64_vec().into_iter().map(|x| x as i8).collect())
            }
        };
        AttributeArray::new(encoded, width)
    }
}

impl fmt::Display for DxgiFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for DxgiFormat {
    type Err = FormatError;

    /// Accepts both the short (`R16G16_FLOAT`) and the prefixed
    /// (`DXGI_FORMAT_R16G16_FLOAT`) token forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_uppercase();
        let token = token.strip_prefix("DXGI_FORMAT_").unwrap_or(&token);
        let (channels, suffix) = token
            .split_once('_')
            .ok_or_else(|| FormatError::UnknownFormat(s.to_string()))?;

        let mut components = 0u32;
        let mut bits: Option<u32> = None;
        let mut rest = channels;
        while !rest.is_empty() {
            let Some(stripped) = rest
                .strip_prefix(['R', 'G', 'B', 'A'][components.min(3) as usize])
            else {
                return Err(FormatError::UnknownFormat(s.to_string()));
            };
            let digits: String = stripped.chars().take_while(|c| c.is_ascii_digit()).collect();
            let width: u32 = digits
                .parse()
                .map_err(|_| FormatError::UnknownFormat(s.to_string()))?;
            if *bits.get_or_insert(width) != width {
                // mixed component widths are not supported
                return Err(FormatError::UnknownFormat(s.to_string()));
            }
            components += 1;
            rest = &stripped[digits.len()..];
        }
        let bits = bits.ok_or_else(|| FormatError::UnknownFormat(s.to_string()))?;
        if components > 4 {
            return Err(FormatError::UnknownFormat(s.to_string()));
        }
        Ok(Self::new(DxgiType::from_parts(bits, suffix)?, components))
    }
}

impl TryFrom<String> for DxgiFormat {
    type Error = FormatError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DxgiFormat> for String {
    fn from(f: DxgiFormat) -> Self {
        f.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        for format in [
            DxgiFormat::R32G32B32A32_FLOAT,
            DxgiFormat::R32G32B32_FLOAT,
            DxgiFormat::R16G16_FLOAT,
            DxgiFormat::R16_FLOAT,
            DxgiFormat::R16G16_UNORM,
            DxgiFormat::R8G8B8A8_UNORM,
            DxgiFormat::R8G8B8A8_SNORM,
            DxgiFormat::R8G8B8_SNORM,
            DxgiFormat::R8_SNORM,
            DxgiFormat::R32_UINT,
            DxgiFormat::R16G16B16_UINT,
            DxgiFormat::R8_UINT,
        ] {
            assert_eq!(format.name().parse::<DxgiFormat>().unwrap(), format);
            assert_eq!(format.format_token().parse::<DxgiFormat>().unwrap(), format);
        }
    }

    #[test]
    fn padded_stride_adds_components() {
        // Blend indices: R8_UINT with stride 4 carries 4 bone slots
        assert_eq!(DxgiFormat::R8_UINT.num_values(4), 4);
        // Index triads: R32_UINT with stride 12 carries 3 indices
        assert_eq!(DxgiFormat::R32_UINT.num_values(12), 3);
        assert_eq!(DxgiFormat::R16G16_FLOAT.num_values(4), 2);
    }

    #[test]
    fn unorm8_encode_decode() {
        let values = AttributeArray::from_f32(vec![0.0, 0.5, 1.0, 2.0], 4).unwrap();
        let encoded = DxgiFormat::R8G8B8A8_UNORM.encode_values(&values).unwrap();
        assert_eq!(encoded.values(), &Scalars::U8(vec![0, 127, 255, 255]));
        let decoded = DxgiFormat::R8G8B8A8_UNORM.decode_values(&encoded).unwrap();
        let back = decoded.to_f32_vec();
        assert_eq!(back[0], 0.0);
        assert_eq!(back[2], 1.0);
        assert_eq!(back[3], 1.0);
    }

    #[test]
    fn snorm8_clamps_lower_bound() {
        let encoded = AttributeArray::new(Scalars::I8(vec![-128, -127, 0, 127]), 4).unwrap();
        let decoded = DxgiFormat::R8G8B8A8_SNORM.decode_values(&encoded).unwrap();
        let values = decoded.to_f32_vec();
        assert_eq!(values[0], -1.0);
        assert_eq!(values[1], -1.0);
        assert_eq!(values[2], 0.0);
        assert_eq!(values[3], 1.0);
    }

    #[test]
    fn integer_encode_avoids_float_precision_loss() {
        let big = 16_777_217u32; // 2^24 + 1, not representable in f32
        let values = AttributeArray::from_u32(vec![big], 1).unwrap();
        let encoded = DxgiFormat::R32_UINT.encode_values(&values).unwrap();
        assert_eq!(encoded.values(), &Scalars::U32(vec![big]));
    }
}
