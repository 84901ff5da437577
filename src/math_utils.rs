//! Numeric helpers shared by the volume and sieve accounting.

/// Assert that the deviation between two values is less than a threshold
///
/// Calculates the percentage deviation between `actual` and `expected`, then
/// asserts that this deviation is less than `max_deviation` (in percent).
#[macro_export]
macro_rules! assert_deviation {
    ($actual:expr, $expected:expr, $max_deviation:expr) => {
        {
            let actual_val = $actual;
            let expected_val = $expected;
            let max_dev = $max_deviation;
            let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

            if actual_deviation >= max_dev {
                panic!(
                    "assertion failed: deviation {:.2}% >= {:.2}%\n  actual: {:?},\n  expected: {:?}",
                    actual_deviation, max_dev, actual_val, expected_val
                );
            }
        }
    };
    ($actual:expr, $expected:expr, $max_deviation:expr, $($arg:tt)+) => {
        {
            let actual_val = $actual;
            let expected_val = $expected;
            let max_dev = $max_deviation;
            let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

            if actual_deviation >= max_dev {
                panic!(
                    "assertion failed: deviation {:.2}% >= {:.2}%: {}\n  actual: {:?},\n  expected: {:?}",
                    actual_deviation, max_dev, format_args!($($arg)+), actual_val, expected_val
                );
            }
        }
    };
}

/// Percentage deviation of `actual` from `expected`, always positive.
///
/// ```
/// use cement_microgen::math_utils::deviation;
///
/// assert_eq!(deviation(105.0, 100.0), 5.0);
/// assert_eq!(deviation(95.0, 100.0), 5.0);
/// ```
pub fn deviation(actual: f64, expected: f64) -> f64 {
    if expected == 0.0 {
        if actual == 0.0 { 0.0 } else { f64::INFINITY }
    } else {
        ((actual - expected) / expected).abs() * 100.0
    }
}

/// Volume-weighted mean of two diameters: the diameter of the sphere whose
/// volume is the average of the two spheres' volumes.
///
/// ```
/// use cement_microgen::math_utils::volume_weighted_mean_diameter;
///
/// assert!((volume_weighted_mean_diameter(4.0, 4.0) - 4.0).abs() < 1e-12);
/// assert!(volume_weighted_mean_diameter(2.0, 10.0) > 6.0);
/// ```
pub fn volume_weighted_mean_diameter(d1: f64, d2: f64) -> f64 {
    (0.5 * (d1.powi(3) + d2.powi(3))).cbrt()
}

/// True when `value` is finite and inside the closed interval.
pub fn in_range(value: f64, min: f64, max: f64) -> bool {
    value.is_finite() && value >= min && value <= max
}
