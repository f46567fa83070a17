//! Whole-grid reductions.
//!
//! All reductions are associative and run as rayon tree reductions, so the
//! order of summation is unspecified. Sums accumulate in `f64`; compare
//! results with a tolerance.

use rayon::prelude::*;

/// Sum of all values.
pub fn sum(values: &[f32]) -> f32 {
    values.par_iter().map(|&v| v as f64).sum::<f64>() as f32
}

/// Smallest value, `f32::INFINITY` for an empty slice.
pub fn min(values: &[f32]) -> f32 {
    values
        .par_iter()
        .copied()
        .reduce(|| f32::INFINITY, f32::min)
}

/// Largest value, `f32::NEG_INFINITY` for an empty slice.
pub fn max(values: &[f32]) -> f32 {
    values
        .par_iter()
        .copied()
        .reduce(|| f32::NEG_INFINITY, f32::max)
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    sum(values) / values.len() as f32
}

/// `Σ values[i] * mask[i]` over the common length of both slices.
pub fn masked_sum(values: &[f32], mask: &[f32]) -> f32 {
    values
        .par_iter()
        .zip(mask.par_iter())
        .map(|(&v, &m)| (v * m) as f64)
        .sum::<f64>() as f32
}

/// Number of values for which `pred` holds.
pub fn count_where<F>(values: &[f32], pred: F) -> usize
where
    F: Fn(f32) -> bool + Sync,
{
    values.par_iter().filter(|&&v| pred(v)).count()
}

/// Population standard deviation.
pub fn std_dev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values) as f64;
    let var = values
        .par_iter()
        .map(|&v| {
            let d = v as f64 - m;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    var.sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_min_max() {
        let values: Vec<f32> = (0..1000).map(|i| i as f32 * 0.5).collect();
        assert!((sum(&values) - 249_750.0).abs() < 1e-2);
        assert_eq!(min(&values), 0.0);
        assert_eq!(max(&values), 499.5);
    }

    #[test]
    fn test_masked_sum_and_count() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let mask = [1.0, 0.0, 1.0, 0.0];
        assert!((masked_sum(&values, &mask) - 4.0).abs() < 1e-6);
        assert_eq!(count_where(&mask, |m| m > 0.5), 2);
    }

    #[test]
    fn test_empty_slices() {
        assert_eq!(sum(&[]), 0.0);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(min(&[]), f32::INFINITY);
        assert_eq!(max(&[]), f32::NEG_INFINITY);
    }

    #[test]
    fn test_std_dev_constant_is_zero() {
        assert!(std_dev(&[3.0; 64]).abs() < 1e-6);
        assert!((std_dev(&[1.0, -1.0]) - 1.0).abs() < 1e-6);
    }
}
