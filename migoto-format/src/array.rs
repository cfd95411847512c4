//! Tagged 2-D attribute arrays
//!
//! [`AttributeArray`] is the unit of data moved through the conversion
//! pipeline: an owned rows x width array over one scalar type, with
//! byte-exact serialization via `bytemuck` casts. It stands in for the
//! loosely typed ndarrays the pipeline shuffles between mesh attributes
//! and strided GPU buffers.

use half::f16;

use crate::error::FormatError;

/// Scalar storage types an attribute array can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    F32,
    F16,
    U32,
    U16,
    U8,
    I32,
    I16,
    I8,
}

impl ScalarType {
    pub const fn byte_width(self) -> usize {
        match self {
            ScalarType::F32 | ScalarType::U32 | ScalarType::I32 => 4,
            ScalarType::F16 | ScalarType::U16 | ScalarType::I16 => 2,
            ScalarType::U8 | ScalarType::I8 => 1,
        }
    }
}

/// Scalar payload of an [`AttributeArray`]
#[derive(Debug, Clone, PartialEq)]
pub enum Scalars {
    F32(Vec<f32>),
    F16(Vec<f16>),
    U32(Vec<u32>),
    U16(Vec<u16>),
    U8(Vec<u8>),
    I32(Vec<i32>),
    I16(Vec<i16>),
    I8(Vec<i8>),
}

macro_rules! scalars_dispatch {
    ($scalars:expr, $v:ident => $body:expr) => {
        match $scalars {
            Scalars::F32($v) => Scalars::F32($body),
            Scalars::F16($v) => Scalars::F16($body),
            Scalars::U32($v) => Scalars::U32($body),
            Scalars::U16($v) => Scalars::U16($body),
            Scalars::U8($v) => Scalars::U8($body),
            Scalars::I32($v) => Scalars::I32($body),
            Scalars::I16($v) => Scalars::I16($body),
            Scalars::I8($v) => Scalars::I8($body),
        }
    };
}

impl Scalars {
    pub fn len(&self) -> usize {
        match self {
            Scalars::F32(v) => v.len(),
            Scalars::F16(v) => v.len(),
            Scalars::U32(v) => v.len(),
            Scalars::U16(v) => v.len(),
            Scalars::U8(v) => v.len(),
            Scalars::I32(v) => v.len(),
            Scalars::I16(v) => v.len(),
            Scalars::I8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Scalars::F32(_) => ScalarType::F32,
            Scalars::F16(_) => ScalarType::F16,
            Scalars::U32(_) => ScalarType::U32,
            Scalars::U16(_) => ScalarType::U16,
            Scalars::U8(_) => ScalarType::U8,
            Scalars::I32(_) => ScalarType::I32,
            Scalars::I16(_) => ScalarType::I16,
            Scalars::I8(_) => ScalarType::I8,
        }
    }
}

/// An owned 2-D array: `rows()` rows of `width()` scalars
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeArray {
    values: Scalars,
    width: usize,
}

impl AttributeArray {
    /// Wrap a scalar payload as rows of `width` values
    pub fn new(values: Scalars, width: usize) -> Result<Self, FormatError> {
        if width == 0 || values.len() % width != 0 {
            return Err(FormatError::RaggedArray {
                len: values.len(),
                width,
            });
        }
        Ok(Self { values, width })
    }

    pub fn from_f32(values: Vec<f32>, width: usize) -> Result<Self, FormatError> {
        Self::new(Scalars::F32(values), width)
    }

    pub fn from_u32(values: Vec<u32>, width: usize) -> Result<Self, FormatError> {
        Self::new(Scalars::U32(values), width)
    }

    pub fn from_u16(values: Vec<u16>, width: usize) -> Result<Self, FormatError> {
        Self::new(Scalars::U16(values), width)
    }

    pub fn from_u8(values: Vec<u8>, width: usize) -> Result<Self, FormatError> {
        Self::new(Scalars::U8(values), width)
    }

    pub fn rows(&self) -> usize {
        self.values.len() / self.width
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.values.scalar_type()
    }

    pub fn values(&self) -> &Scalars {
        &self.values
    }

    pub fn into_values(self) -> Scalars {
        self.values
    }

    /// Copy out as `f32`, casting numerically
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match &self.values {
            Scalars::F32(v) => v.clone(),
            Scalars::F16(v) => v.iter().map(|x| x.to_f32()).collect(),
            Scalars::U32(v) => v.iter().map(|&x| x as f32).collect(),
            Scalars::U16(v) => v.iter().map(|&x| x as f32).collect(),
            Scalars::U8(v) => v.iter().map(|&x| x as f32).collect(),
            Scalars::I32(v) => v.iter().map(|&x| x as f32).collect(),
            Scalars::I16(v) => v.iter().map(|&x| x as f32).collect(),
            Scalars::I8(v) => v.iter().map(|&x| x as f32).collect(),
        }
    }

    /// Copy out as `i64` without a float round trip (exact for all integer types)
    pub fn to_i64_vec(&self) -> Vec<i64> {
        match &self.values {
            Scalars::F32(v) => v.iter().map(|&x| x as i64).collect(),
            Scalars::F16(v) => v.iter().map(|x| x.to_f32() as i64).collect(),
            Scalars::U32(v) => v.iter().map(|&x| x as i64).collect(),
            Scalars::U16(v) => v.iter().map(|&x| x as i64).collect(),
            Scalars::U8(v) => v.iter().map(|&x| x as i64).collect(),
            Scalars::I32(v) => v.iter().map(|&x| x as i64).collect(),
            Scalars::I16(v) => v.iter().map(|&x| x as i64).collect(),
            Scalars::I8(v) => v.iter().map(|&x| x as i64).collect(),
        }
    }

    /// Upcast to an f32 array of the same shape
    pub fn to_f32(&self) -> AttributeArray {
        AttributeArray {
            values: Scalars::F32(self.to_f32_vec()),
            width: self.width,
        }
    }

    /// Reinterpret the flat scalar stream as rows of `width` values
    pub fn reshape(self, width: usize) -> Result<Self, FormatError> {
        Self::new(self.values, width)
    }

    /// Pad (with `fill`) or truncate every row to exactly `width` columns.
    /// 1-D input is treated as a single-column array.
    pub fn resize_width(self, width: usize, fill: f64) -> Result<Self, FormatError> {
        let rows = self.rows();
        let old = self.width;
        if old == width {
            return Ok(self);
        }
        macro_rules! resize {
            ($v:expr, $t:ty) => {{
                let mut out: Vec<$t> = Vec::with_capacity(rows * width);
                for row in $v.chunks_exact(old) {
                    for col in 0..width {
                        out.push(if col < old { row[col] } else { fill as $t });
                    }
                }
                out
            }};
        }
        let values = match self.values {
            Scalars::F32(v) => Scalars::F32(resize!(v, f32)),
            Scalars::F16(v) => {
                let mut out: Vec<f16> = Vec::with_capacity(rows * width);
                for row in v.chunks_exact(old) {
                    for col in 0..width {
                        out.push(if col < old {
                            row[col]
                        } else {
                            f16::from_f64(fill)
                        });
                    }
                }
                Scalars::F16(out)
            }
            Scalars::U32(v) => Scalars::U32(resize!(v, u32)),
            Scalars::U16(v) => Scalars::U16(resize!(v, u16)),
            Scalars::U8(v) => Scalars::U8(resize!(v, u8)),
            Scalars::I32(v) => Scalars::I32(resize!(v, i32)),
            Scalars::I16(v) => Scalars::I16(resize!(v, i16)),
            Scalars::I8(v) => Scalars::I8(resize!(v, i8)),
        };
        Ok(Self { values, width })
    }

    /// Gather rows by index, in the given order
    pub fn take_rows(&self, ids: &[u32]) -> AttributeArray {
        let width = self.width;
        let values = scalars_dispatch!(&self.values, v => {
            let mut out = Vec::with_capacity(ids.len() * width);
            for &id in ids {
                let start = id as usize * width;
                out.extend_from_slice(&v[start..start + width]);
            }
            out
        });
        AttributeArray { values, width }
    }

    /// Swap the 1st and 3rd scalar of every 3-scalar group of the flat
    /// stream (triangle winding flip on an index buffer)
    pub fn swap_triads(&mut self) {
        macro_rules! swap {
            ($v:expr) => {
                for chunk in $v.chunks_exact_mut(3) {
                    chunk.swap(0, 2);
                }
            };
        }
        match &mut self.values {
            Scalars::F32(v) => swap!(v),
            Scalars::F16(v) => swap!(v),
            Scalars::U32(v) => swap!(v),
            Scalars::U16(v) => swap!(v),
            Scalars::U8(v) => swap!(v),
            Scalars::I32(v) => swap!(v),
            Scalars::I16(v) => swap!(v),
            Scalars::I8(v) => swap!(v),
        }
    }

    /// Serialize the flat scalar stream as raw buffer bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.values {
            Scalars::F32(v) => bytemuck::cast_slice(v).to_vec(),
            Scalars::F16(v) => bytemuck::cast_slice(v).to_vec(),
            Scalars::U32(v) => bytemuck::cast_slice(v).to_vec(),
            Scalars::U16(v) => bytemuck::cast_slice(v).to_vec(),
            Scalars::U8(v) => v.clone(),
            Scalars::I32(v) => bytemuck::cast_slice(v).to_vec(),
            Scalars::I16(v) => bytemuck::cast_slice(v).to_vec(),
            Scalars::I8(v) => bytemuck::cast_slice(v).to_vec(),
        }
    }

    /// Deserialize raw buffer bytes into rows of `width` scalars
    pub fn from_bytes(
        scalar: ScalarType,
        bytes: &[u8],
        width: usize,
    ) -> Result<Self, FormatError> {
        let elem = scalar.byte_width();
        if bytes.len() % elem != 0 {
            return Err(FormatError::StrideMismatch {
                len: bytes.len(),
                stride: elem as u32,
            });
        }
        // pod_collect_to_vec copies, so unaligned input is fine
        let values = match scalar {
            ScalarType::F32 => Scalars::F32(bytemuck::pod_collect_to_vec(bytes)),
            ScalarType::F16 => Scalars::F16(bytemuck::pod_collect_to_vec(bytes)),
            ScalarType::U32 => Scalars::U32(bytemuck::pod_collect_to_vec(bytes)),
            ScalarType::U16 => Scalars::U16(bytemuck::pod_collect_to_vec(bytes)),
            ScalarType::U8 => Scalars::U8(bytes.to_vec()),
            ScalarType::I32 => Scalars::I32(bytemuck::pod_collect_to_vec(bytes)),
            ScalarType::I16 => Scalars::I16(bytemuck::pod_collect_to_vec(bytes)),
            ScalarType::I8 => Scalars::I8(bytemuck::pod_collect_to_vec(bytes)),
        };
        Self::new(values, width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip_exactly() {
        let arr = AttributeArray::from_f32(vec![1.0, -2.5, 0.0, 42.0], 2).unwrap();
        let bytes = arr.to_bytes();
        let back = AttributeArray::from_bytes(ScalarType::F32, &bytes, 2).unwrap();
        assert_eq!(arr, back);
        assert_eq!(back.to_bytes(), bytes);
    }

    #[test]
    fn bytes_are_packed_in_buffer_order() {
        let arr = AttributeArray::from_u16(vec![0x0102, 0x0304], 1).unwrap();
        assert_eq!(arr.to_bytes(), vec![0x02, 0x01, 0x04, 0x03]);

        let back = AttributeArray::from_bytes(ScalarType::U16, &[0x02, 0x01, 0x04, 0x03], 1)
            .unwrap();
        assert_eq!(back.values(), &Scalars::U16(vec![0x0102, 0x0304]));
    }

    #[test]
    fn resize_pads_and_truncates() {
        let arr = AttributeArray::from_f32(vec![0.5, 0.25], 1).unwrap();
        let arr = arr.resize_width(4, 1.0).unwrap();
        assert_eq!(arr.to_f32_vec(), vec![0.5, 1.0, 1.0, 1.0, 0.25, 1.0, 1.0, 1.0]);

        let arr = arr.resize_width(2, 0.0).unwrap();
        assert_eq!(arr.to_f32_vec(), vec![0.5, 1.0, 0.25, 1.0]);
    }

    #[test]
    fn take_rows_gathers_in_order() {
        let arr = AttributeArray::from_u32(vec![10, 11, 20, 21, 30, 31], 2).unwrap();
        let picked = arr.take_rows(&[2, 0]);
        assert_eq!(picked.values(), &Scalars::U32(vec![30, 31, 10, 11]));
    }

    #[test]
    fn swap_triads_flips_winding() {
        let mut arr = AttributeArray::from_u32(vec![0, 1, 2, 3, 4, 5], 1).unwrap();
        arr.swap_triads();
        assert_eq!(arr.values(), &Scalars::U32(vec![2, 1, 0, 5, 4, 3]));
    }

    #[test]
    fn ragged_shapes_rejected() {
        assert!(AttributeArray::from_f32(vec![1.0, 2.0, 3.0], 2).is_err());
    }
}
