//! Time constants and value conversions shared across the control core.

use core::f32::consts::PI;

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;
/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Convert a joystick-style byte in `0..=254` to `-1.0..=1.0` (127 is centre).
/// Values of 255 and above map to 0.
#[inline]
pub fn byte_to_norm(value: u32) -> f32 {
    if value < 255 {
        (value as f32 - 127.0) / 127.0
    } else {
        0.0
    }
}

/// Convert `-1.0..=1.0` to a byte in `0..=254`; out-of-range inputs clamp and
/// non-finite inputs map to the centre.
#[inline]
pub fn norm_to_byte(value: f32) -> u32 {
    if !value.is_finite() {
        return 127;
    }
    let scaled = (127.0 * value).round().clamp(-127.0, 127.0) as i32;
    (127 + scaled) as u32
}

/// Carry an `f32` in a command value (IEEE-754 single bits).
#[inline]
pub fn pack_f32(value: f32) -> u32 {
    value.to_bits()
}

/// Inverse of [`pack_f32`].
#[inline]
pub fn unpack_f32(bits: u32) -> f32 {
    f32::from_bits(bits)
}

/// Wheel surface speed (m/s) for a rotation rate (rev/s) and diameter (m).
#[inline]
pub fn rev_s_to_mps(rev_s: f32, diameter_m: f32) -> f32 {
    rev_s * PI * diameter_m
}
