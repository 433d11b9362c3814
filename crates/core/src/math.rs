//! Scalar helpers shared by subsystems and controllers
//!
//! Pure `no_std` helpers built on `libm`.

/// Default deadzone applied to operator axes
pub const DEFAULT_INPUT_THRESHOLD: f64 = 0.1;

/// Absolute value
#[inline]
pub fn abs(value: f64) -> f64 {
    libm::fabs(value)
}

/// Zero out `value` when its magnitude does not exceed `threshold`
#[inline]
pub fn threshold(value: f64, threshold: f64) -> f64 {
    if abs(value) > threshold {
        value
    } else {
        0.0
    }
}

/// Whether `value` is beyond the deadzone
#[inline]
pub fn exceeds(value: f64, threshold: f64) -> bool {
    abs(value) > threshold
}

/// Clamp `value` into `[min, max]`
#[inline]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Integer clamp used for encoder set points
#[inline]
pub fn clamp_i32(value: i32, min: i32, max: i32) -> i32 {
    value.max(min).min(max)
}

/// Whether `value` lies within `tolerance` of `target`
#[inline]
pub fn within_range(value: f64, target: f64, tolerance: f64) -> bool {
    abs(value - target) <= tolerance
}

/// Linear map of `value` from `[in_min, in_max]` onto `[out_min, out_max]`
///
/// Returns `out_min` for a degenerate input range.
#[inline]
pub fn map(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    let span = in_max - in_min;
    if span == 0.0 {
        return out_min;
    }
    (value - in_min) * (out_max - out_min) / span + out_min
}

/// Signed square keeping the direction of `value`
#[inline]
pub fn signed_square(value: f64) -> f64 {
    if value < 0.0 {
        -(value * value)
    } else {
        value * value
    }
}

/// Degrees to radians
#[inline]
pub fn to_radians(degrees: f64) -> f64 {
    degrees * core::f64::consts::PI / 180.0
}

/// Cosine
#[inline]
pub fn cos(radians: f64) -> f64 {
    libm::cos(radians)
}
