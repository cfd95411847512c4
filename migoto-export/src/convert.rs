//! Converter pipeline
//!
//! Pure `array -> array` transforms applied while moving attribute data
//! between the mesh source and typed buffers. Converters are registered per
//! [`AbstractSemantic`] in two stages: semantic converters run on decoded
//! numeric arrays before re-encoding, format converters run on the
//! storage-typed array afterwards. New registrations are pushed to the
//! front of a semantic's list, so the most recently added converter runs
//! first and composition order stays caller-controlled.

use glam::{EulerRot, Mat3, Vec3};
use hashbrown::HashMap;
use migoto_format::{AbstractSemantic, AttributeArray, FormatError, Transform};

/// One tagged transform over an attribute array
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Converter {
    /// Negate every component (handedness correction)
    FlipVector,
    /// Negate the X component only (mesh mirroring)
    MirrorVector,
    /// Rotate 3-component rows by XYZ Euler angles, in degrees, intrinsic
    /// X then Y then Z
    RotateVector([f32; 3]),
    /// Multiply every component by a uniform scalar
    ScaleVector(f32),
    /// Replace the V texcoord component with `1 - v`, upcasting to f32
    FlipTexcoordV,
    /// Reinterpret the flat scalar stream as rows of `width` values
    ReshapeSecondDim(usize),
    /// Pad with `fill` or truncate every row to exactly `width` columns
    ResizeSecondDim { width: usize, fill: f64 },
    /// Swap the 1st and 3rd index of every 3-index face on the flat stream
    FlipTriangleWinding,
}

impl Converter {
    pub fn apply(&self, data: AttributeArray) -> Result<AttributeArray, FormatError> {
        match *self {
            Converter::FlipVector => {
                let width = data.width();
                let mut values = data.to_f32_vec();
                for x in &mut values {
                    *x = -*x;
                }
                AttributeArray::from_f32(values, width)
            }
            Converter::MirrorVector => {
                let width = data.width();
                let mut values = data.to_f32_vec();
                for row in values.chunks_exact_mut(width) {
                    row[0] = -row[0];
                }
                AttributeArray::from_f32(values, width)
            }
            Converter::RotateVector(degrees) => {
                if data.width() != 3 {
                    return Err(FormatError::VectorWidth {
                        expected: 3,
                        got: data.width(),
                    });
                }
                let rotation = Mat3::from_euler(
                    EulerRot::XYZ,
                    degrees[0].to_radians(),
                    degrees[1].to_radians(),
                    degrees[2].to_radians(),
                );
                let mut values = data.to_f32_vec();
                for row in values.chunks_exact_mut(3) {
                    let rotated = rotation * Vec3::new(row[0], row[1], row[2]);
                    row.copy_from_slice(&rotated.to_array());
                }
                AttributeArray::from_f32(values, 3)
            }
            Converter::ScaleVector(factor) => {
                let width = data.width();
                let mut values = data.to_f32_vec();
                for x in &mut values {
                    *x *= factor;
                }
                AttributeArray::from_f32(values, width)
            }
            Converter::FlipTexcoordV => {
                let width = data.width();
                if width < 2 {
                    return Err(FormatError::VectorWidth {
                        expected: 2,
                        got: width,
                    });
                }
                let mut values = data.to_f32_vec();
                for row in values.chunks_exact_mut(width) {
                    row[1] = 1.0 - row[1];
                }
                AttributeArray::from_f32(values, width)
            }
            Converter::ReshapeSecondDim(width) => data.reshape(width),
            Converter::ResizeSecondDim { width, fill } => data.resize_width(width, fill),
            Converter::FlipTriangleWinding => {
                let mut data = data;
                data.swap_triads();
                Ok(data)
            }
        }
    }
}

/// Boxed form of a converter application, usable as a buffer [`Transform`]
pub type BoxedTransform = Box<dyn Fn(AttributeArray) -> Result<AttributeArray, FormatError>>;

/// Per-semantic converter registries for one export or import run
#[derive(Debug, Default, Clone)]
pub struct ConverterSet {
    semantic: HashMap<AbstractSemantic, Vec<Converter>>,
    format: HashMap<AbstractSemantic, Vec<Converter>>,
}

impl ConverterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a converter over the decoded numeric array. Runs before any
    /// previously registered semantic converter.
    pub fn add_semantic_converter(&mut self, semantic: AbstractSemantic, converter: Converter) {
        self.semantic.entry(semantic).or_default().insert(0, converter);
    }

    /// Register a converter over the storage-typed array. Runs before any
    /// previously registered format converter.
    pub fn add_format_converter(&mut self, semantic: AbstractSemantic, converter: Converter) {
        self.format.entry(semantic).or_default().insert(0, converter);
    }

    pub fn semantic_converters(&self, semantic: &AbstractSemantic) -> &[Converter] {
        self.semantic.get(semantic).map_or(&[], Vec::as_slice)
    }

    pub fn format_converters(&self, semantic: &AbstractSemantic) -> &[Converter] {
        self.format.get(semantic).map_or(&[], Vec::as_slice)
    }

    pub fn semantic_transforms(&self, semantic: &AbstractSemantic) -> Vec<BoxedTransform> {
        boxed(self.semantic_converters(semantic))
    }

    pub fn format_transforms(&self, semantic: &AbstractSemantic) -> Vec<BoxedTransform> {
        boxed(self.format_converters(semantic))
    }
}

fn boxed(converters: &[Converter]) -> Vec<BoxedTransform> {
    converters
        .iter()
        .copied()
        .map(|c| Box::new(move |a: AttributeArray| c.apply(a)) as BoxedTransform)
        .collect()
}

/// Borrow boxed transforms in the form [`TypedBuffer::import_semantic_data`]
/// takes them.
///
/// [`TypedBuffer::import_semantic_data`]: migoto_format::TypedBuffer::import_semantic_data
pub fn transform_refs(transforms: &[BoxedTransform]) -> Vec<Transform<'_>> {
    transforms.iter().map(|t| t.as_ref()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use migoto_format::Semantic;

    fn vec3(values: Vec<f32>) -> AttributeArray {
        AttributeArray::from_f32(values, 3).unwrap()
    }

    #[test]
    fn flip_and_mirror_commute() {
        let input = vec![1.0, 2.0, 3.0];
        let a = Converter::MirrorVector
            .apply(Converter::FlipVector.apply(vec3(input.clone())).unwrap())
            .unwrap();
        let b = Converter::FlipVector
            .apply(Converter::MirrorVector.apply(vec3(input)).unwrap())
            .unwrap();
        assert_eq!(a.to_f32_vec(), vec![1.0, -2.0, -3.0]);
        assert_eq!(a, b);
    }

    #[test]
    fn rotate_and_mirror_do_not_commute() {
        let rotate = Converter::RotateVector([0.0, 0.0, 90.0]);
        let input = vec![1.0, 0.0, 0.0];
        let a = Converter::MirrorVector
            .apply(rotate.apply(vec3(input.clone())).unwrap())
            .unwrap();
        let b = rotate
            .apply(Converter::MirrorVector.apply(vec3(input)).unwrap())
            .unwrap();
        let diff: f32 = a
            .to_f32_vec()
            .iter()
            .zip(b.to_f32_vec())
            .map(|(x, y)| (x - y).abs())
            .sum();
        assert!(diff > 1.0);
    }

    #[test]
    fn texcoord_v_flip_upcasts() {
        let uv = AttributeArray::new(
            migoto_format::Scalars::F16(vec![
                half::f16::from_f32(0.25),
                half::f16::from_f32(0.25),
            ]),
            2,
        )
        .unwrap();
        let flipped = Converter::FlipTexcoordV.apply(uv).unwrap();
        assert_eq!(flipped.scalar_type(), migoto_format::ScalarType::F32);
        assert_eq!(flipped.to_f32_vec(), vec![0.25, 0.75]);
    }

    #[test]
    fn winding_flip_swaps_triads() {
        let indices = AttributeArray::from_u32(vec![0, 1, 2, 3, 4, 5], 1).unwrap();
        let flipped = Converter::FlipTriangleWinding.apply(indices).unwrap();
        assert_eq!(flipped.to_i64_vec(), vec![2, 1, 0, 5, 4, 3]);
    }

    #[test]
    fn most_recent_registration_runs_first() {
        let mut set = ConverterSet::new();
        let semantic = AbstractSemantic::new(Semantic::Tangent, 0);
        // registered second, runs first: resize before flip
        set.add_semantic_converter(semantic, Converter::FlipVector);
        set.add_semantic_converter(semantic, Converter::ResizeSecondDim { width: 4, fill: 1.0 });

        let mut data = AttributeArray::from_f32(vec![1.0, 2.0, 3.0], 3).unwrap();
        for converter in set.semantic_converters(&semantic) {
            data = converter.apply(data).unwrap();
        }
        // fill happened before negation
        assert_eq!(data.to_f32_vec(), vec![-1.0, -2.0, -3.0, -1.0]);
    }

    #[test]
    fn rotate_rejects_non_vec3() {
        let flat = AttributeArray::from_f32(vec![1.0, 2.0], 2).unwrap();
        assert!(Converter::RotateVector([90.0, 0.0, 0.0]).apply(flat).is_err());
    }
}
