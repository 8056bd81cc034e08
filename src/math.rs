use std::cmp::Ordering;

use itertools::Itertools;
use num_traits::Float;

fn from_count<F: Float>(n: usize) -> F {
    F::from(n).expect("usize must fit in `F`")
}

/// Arithmetic mean of `values`, `None` when there are none
///
/// # Examples
///
/// ```
/// use gas_characterisation::math::mean;
///
/// assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
/// assert_eq!(mean::<f64>(&[]), None);
/// ```
pub fn mean<F: Float>(values: &[F]) -> Option<F> {
    if values.is_empty() {
        return None;
    }
    let sum = values.iter().fold(F::zero(), |a, &b| a + b);
    Some(sum / from_count(values.len()))
}

/// Unbiased sample variance, with divisor `n - 1`
///
/// Undefined for fewer than two values, in which case `None` is returned.
pub fn sample_variance<F: Float>(values: &[F]) -> Option<F> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let summed = values
        .iter()
        .fold(F::zero(), |a, &b| a + (b - mean).powi(2));
    Some(summed / from_count(values.len() - 1))
}

/// Sample standard deviation, the square root of [`sample_variance`]
///
/// # Examples
///
/// ```
/// use gas_characterisation::math::sample_standard_deviation;
///
/// let std: f64 = sample_standard_deviation(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
/// assert!((std - 2.138_089_935).abs() < 1e-9);
/// assert_eq!(sample_standard_deviation(&[1.0]), None);
/// ```
pub fn sample_standard_deviation<F: Float>(values: &[F]) -> Option<F> {
    sample_variance(values).map(Float::sqrt)
}

/// Round `value` to `places` decimal places, halves away from zero
///
/// Only for presentation: computations keep full precision.
pub fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(i32::try_from(places).unwrap_or(i32::MAX));
    (value * factor).round() / factor
}

/// Index of the element of `values` closest to `target`
///
/// Ties resolve to the earliest index. Elements which are not comparable to `target` (NaN)
/// are never selected unless nothing else is available.
pub fn nearest_index<F: Float>(values: impl IntoIterator<Item = F>, target: F) -> Option<usize> {
    values
        .into_iter()
        .map(|value| {
            let distance = (value - target).abs();
            if distance.is_nan() {
                F::infinity()
            } else {
                distance
            }
        })
        .position_min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
}
