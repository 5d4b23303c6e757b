//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Convert a millisecond count to seconds, allowing precision loss in one place.
#[must_use]
pub fn ms_to_secs(ms: u64) -> f64 {
    u64_to_f64(ms) / 1_000.0
}

/// Round a f64 millisecond delay to a u64, returning 0 for negative or non-finite values.
#[must_use]
pub fn round_ms(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let max = cast::<u64, f64>(u64::MAX).unwrap_or(f64::MAX);
    cast::<f64, u64>(value.min(max).round()).unwrap_or(u64::MAX)
}

#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Convert a usize to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Map a unit roll in `[0, 1)` onto an index below `len`; `len` must be non-zero.
#[must_use]
pub fn unit_to_index(unit: f64, len: usize) -> usize {
    let scaled = (unit.clamp(0.0, 1.0) * usize_to_f64(len)).floor();
    cast::<f64, usize>(scaled)
        .unwrap_or(0)
        .min(len.saturating_sub(1))
}
