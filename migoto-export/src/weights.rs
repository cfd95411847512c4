//! 8-bit bone weight quantization
//!
//! Converts per-vertex float weight rows into u8 rows that each sum to
//! exactly 255. Naive scale-and-floor leaves every row short by a small
//! integer deficit; the missing units are handed back to the slots that
//! lost the most relative precision to truncation, so total weight mass is
//! conserved and the output is deterministic for a given input.

use migoto_format::AttributeArray;

use crate::error::ExportError;

/// Smallest weight representable in 8 bits; anything below carries no
/// visual influence
pub const MIN_WEIGHT: f32 = 1.0 / 255.0;

/// Quantize a (rows x slots) float weight array to u8 rows summing to 255.
///
/// Non-finite weights are treated as zero. A row whose weights are all zero
/// (or sub-representable) falls back to binding slot 0 at full weight, so
/// every vertex keeps a deterministic binding.
pub fn quantize_weights(weights: &AttributeArray) -> Result<AttributeArray, ExportError> {
    let slots = weights.width();
    let rows = weights.rows();
    let mut values = weights.to_f32_vec();

    let mut out = vec![0u8; rows * slots];
    let mut ints = vec![0u32; slots];
    let mut loss = vec![(0f32, 0usize); slots];

    for (row, out_row) in values
        .chunks_exact_mut(slots)
        .zip(out.chunks_exact_mut(slots))
    {
        for weight in row.iter_mut() {
            if !weight.is_finite() || *weight < MIN_WEIGHT {
                *weight = 0.0;
            }
        }

        let mut sum: f32 = row.iter().sum();
        if sum <= 0.0 {
            row[0] = 1.0;
            sum = 1.0;
        }

        let mut int_sum = 0u32;
        for (slot, weight) in row.iter().enumerate() {
            let scaled = *weight / sum * 255.0;
            let int = scaled as u32;
            ints[slot] = int;
            int_sum += int;
            // relative precision lost to truncation; ranks who gets the
            // deficit back
            let factor = if int == 0 {
                0.0
            } else {
                (scaled - int as f32) / int as f32
            };
            loss[slot] = (factor, slot);
        }

        let deficit = 255i32 - int_sum as i32;
        if deficit < 0 || deficit as usize > slots {
            return Err(ExportError::QuantizerInvariant { deficit, slots });
        }

        // stable sort: equal loss factors resolve to the lower slot index
        loss.sort_by(|a, b| b.0.total_cmp(&a.0));
        for &(_, slot) in loss.iter().take(deficit as usize) {
            ints[slot] += 1;
        }

        for (slot, int) in ints.iter().enumerate() {
            out_row[slot] = *int as u8;
        }
    }

    Ok(AttributeArray::from_u8(out, slots)?)
}
