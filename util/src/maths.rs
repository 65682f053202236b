//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Limit a value to the range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Arithmetic mean of the values, or `None` if there are none.
pub fn mean<T, I>(values: I) -> Option<T>
where
    T: Float,
    I: IntoIterator<Item = T>,
{
    let mut sum = T::zero();
    let mut count = 0usize;

    for v in values {
        sum = sum + v;
        count += 1;
    }

    if count == 0 {
        None
    } else {
        T::from(count).map(|n| sum / n)
    }
}
