//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value into the range `[min, max]`.
///
/// Unlike `f64::clamp` a NaN value does not propagate: it is mapped onto
/// `max`, matching the behaviour of chaining `fmin` then `fmax`.
pub fn clamp<T>(value: T, min: T, max: T) -> T 
where
    T: Float
{
    value.min(max).max(min)
}

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}
