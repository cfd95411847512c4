//! Typed strided buffers
//!
//! A [`TypedBuffer`] owns the raw bytes of one binary buffer, shaped by a
//! [`BufferLayout`]: `len` elements of `layout.stride()` bytes, each holding
//! one field per layout semantic. Fields are read and written as
//! [`AttributeArray`]s; the raw byte form round-trips exactly.

use crate::array::AttributeArray;
use crate::error::FormatError;
use crate::layout::{BufferLayout, BufferSemantic};
use crate::semantic::AbstractSemantic;

/// Pure per-array transformation applied while importing semantic data
pub type Transform<'a> = &'a dyn Fn(AttributeArray) -> Result<AttributeArray, FormatError>;

#[derive(Debug, Clone)]
pub struct TypedBuffer {
    name: String,
    layout: BufferLayout,
    data: Vec<u8>,
    len: usize,
}

impl TypedBuffer {
    /// Empty buffer over a layout
    pub fn new(layout: BufferLayout) -> Self {
        Self {
            name: String::new(),
            layout,
            data: Vec::new(),
            len: 0,
        }
    }

    /// Zero-filled buffer of `len` elements
    pub fn with_len(layout: BufferLayout, len: usize) -> Self {
        let stride = layout.stride() as usize;
        Self {
            name: String::new(),
            layout,
            data: vec![0; len * stride],
            len,
        }
    }

    /// Name used in error context (the buffer file name, e.g. `Position`)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw strided bytes; byte-exact counterpart of [`import_raw_data`](Self::import_raw_data)
    pub fn get_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Reinterpret a flat byte sequence as elements of the layout's stride.
    /// With a forced stride the input is zero-padded up to the next stride
    /// multiple first; otherwise a non-multiple length is an error.
    pub fn import_raw_data(&mut self, bytes: &[u8]) -> Result<(), FormatError> {
        let stride = self.layout.stride() as usize;
        let mut data = bytes.to_vec();
        if self.layout.forced_stride().is_some() {
            let rem = data.len() % stride;
            if rem != 0 {
                data.resize(data.len() + stride - rem, 0);
            }
        }
        if data.len() % stride != 0 {
            return Err(FormatError::StrideMismatch {
                len: data.len(),
                stride: stride as u32,
            });
        }
        self.len = data.len() / stride;
        self.data = data;
        Ok(())
    }

    fn element(&self, semantic: &AbstractSemantic) -> Result<BufferSemantic, FormatError> {
        self.layout
            .get_element(semantic)
            .copied()
            .ok_or_else(|| FormatError::MissingSemantic {
                buffer: self.name.clone(),
                semantic: *semantic,
            })
    }

    /// Write one field from a storage-typed array of shape (len, num_values)
    pub fn set_field(
        &mut self,
        semantic: &AbstractSemantic,
        data: &AttributeArray,
    ) -> Result<(), FormatError> {
        let element = self.element(semantic)?;
        let values = element.num_values() as usize;
        if self.data.is_empty() {
            // first field write sizes the buffer
            let stride = self.layout.stride() as usize;
            self.len = data.rows();
            self.data = vec![0; self.len * stride];
        }
        if data.rows() != self.len || data.width() != values {
            return Err(FormatError::FieldShape {
                semantic: *semantic,
                expected: self.len,
                values,
                rows: data.rows(),
                got: data.width(),
            });
        }
        if data.scalar_type() != element.format.storage_type() {
            return Err(FormatError::ScalarMismatch {
                expected: element.format.storage_type(),
                got: data.scalar_type(),
            });
        }
        let stride = self.layout.stride() as usize;
        let field_bytes = element.stride as usize;
        let raw = data.to_bytes();
        for (row, chunk) in raw.chunks_exact(field_bytes).enumerate() {
            let start = row * stride + element.offset as usize;
            self.data[start..start + field_bytes].copy_from_slice(chunk);
        }
        Ok(())
    }

    /// Read one field as its storage-typed array
    pub fn get_field(&self, semantic: &AbstractSemantic) -> Result<AttributeArray, FormatError> {
        let element = self.element(semantic)?;
        let stride = self.layout.stride() as usize;
        let field_bytes = element.stride as usize;
        let mut raw = Vec::with_capacity(self.len * field_bytes);
        for row in 0..self.len {
            let start = row * stride + element.offset as usize;
            raw.extend_from_slice(&self.data[start..start + field_bytes]);
        }
        AttributeArray::from_bytes(
            element.format.storage_type(),
            &raw,
            element.num_values() as usize,
        )
    }

    /// Read one field decoded to numeric value space (f32 for float and
    /// normalized formats, native integers otherwise)
    pub fn get_field_values(
        &self,
        semantic: &AbstractSemantic,
    ) -> Result<AttributeArray, FormatError> {
        let element = self.element(semantic)?;
        let storage = self.get_field(semantic)?;
        element.format.decode_values(&storage)
    }

    /// Import one semantic's data: semantic converters run on the numeric
    /// array, then the data is re-encoded to this field's storage scalars,
    /// then format converters run on the storage array, then the field is
    /// written.
    pub fn import_semantic_data(
        &mut self,
        data: AttributeArray,
        semantic: &AbstractSemantic,
        semantic_converters: &[Transform],
        format_converters: &[Transform],
    ) -> Result<(), FormatError> {
        let element = self.element(semantic)?;
        let mut data = data;
        for converter in semantic_converters {
            data = converter(data)?;
        }
        if data.scalar_type() != element.format.storage_type() {
            data = element.format.encode_values(&data)?;
        }
        for converter in format_converters {
            data = converter(data)?;
        }
        self.set_field(semantic, &data)
    }
}
