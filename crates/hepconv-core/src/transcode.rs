//! Field-level transcoding rules shared by the converters.
//!
//! These are fixed formats, not tuning knobs:
//! - cell identifiers are split as `cell_id0 = low 32 bits`,
//!   `cell_id1 = high 32 bits` (the word order a little-endian reinterpretation
//!   of the 64-bit value produces, made explicit with shift and mask);
//! - per-subdetector hit numbers are zero-padded to [`HIT_NUMBER_MIN_LEN`];
//! - bitmask fields are decomposed into one flag per bit, 32 bits wide.

/// Minimum length of a converted subdetector hit-number sequence.
pub const HIT_NUMBER_MIN_LEN: usize = 50;

/// Width of a decomposed bitmask field.
pub const BIT_FIELD_WIDTH: usize = 32;

/// Split a 64-bit cell identifier into `(low, high)` 32-bit words.
pub fn split_cell_id(cell_id: u64) -> (i32, i32) {
    let low = (cell_id & 0xFFFF_FFFF) as u32;
    let high = (cell_id >> 32) as u32;
    (low as i32, high as i32)
}

/// Inverse of [`split_cell_id`].
pub fn join_cell_id(low: i32, high: i32) -> u64 {
    (u64::from(high as u32) << 32) | u64::from(low as u32)
}

/// Copy hit numbers, zero-padding up to [`HIT_NUMBER_MIN_LEN`]. Longer
/// sequences are kept whole.
pub fn pad_hit_numbers(numbers: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(numbers.len().max(HIT_NUMBER_MIN_LEN));
    out.extend_from_slice(numbers);
    if out.len() < HIT_NUMBER_MIN_LEN {
        out.resize(HIT_NUMBER_MIN_LEN, 0);
    }
    out
}

/// Decompose a bitmask into one flag per bit position, least significant
/// first.
pub fn bit_flags(value: i32) -> [bool; BIT_FIELD_WIDTH] {
    let bits = value as u32;
    std::array::from_fn(|i| bits & (1u32 << i) != 0)
}
