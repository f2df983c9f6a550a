//! C1: clamp, linear map, and the slew-rate smoother shared by the gear
//! machine and the waiting-wheel handshake.

use num_traits::float::FloatCore;

/// Clamps `x` to `[min, max]`. Assumes `min <= max`; no validation.
pub fn clamp(x: f32, min: f32, max: f32) -> f32 {
    if x < min {
        min
    } else if x > max {
        max
    } else {
        x
    }
}

/// Maps `x` from `[in_min, in_max]` onto `[out_min, out_max]`, linearly.
/// Extrapolates outside the input range rather than clamping.
pub fn map_value(x: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let in_span = in_max - in_min;
    let out_span = out_max - out_min;
    out_min + ((x - in_min) / in_span) * out_span
}

/// Moves `current` toward `target` by at most `max_step` (a non-negative
/// per-call slew limit), never overshooting.
pub fn slew_toward(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_step {
        target
    } else if delta > 0.0 {
        current + max_step
    } else {
        current - max_step
    }
}

/// Rounds `x` to the nearest integer, ties away from zero. `core` has no
/// inherent `f32::round`; this is the `no_std` equivalent via `FloatCore`.
pub fn round(x: f32) -> f32 {
    FloatCore::round(x)
}
