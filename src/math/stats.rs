//! Aggregate statistics over boundary samples.
//!
//! `reduce` is the only place that knows how an `ObjectiveKind` turns samples
//! into a cost. New kinds are added here; the optimizer only sees the scalar.

use crate::domain::ObjectiveKind;

/// Reduce samples to the scalar the optimizer minimizes.
///
/// Returns NaN for an empty slice.
pub fn reduce(kind: ObjectiveKind, samples: &mut [f64]) -> f64 {
    match kind {
        ObjectiveKind::Mean => -mean(samples),
        ObjectiveKind::MinusMean => mean(samples),
        ObjectiveKind::Median => -median_mut(samples).unwrap_or(f64::NAN),
        ObjectiveKind::Variance => variance(samples),
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Median; sorts `values` in place.
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_applies_sign_convention() {
        let mut s = [1.0, 2.0, 3.0, 10.0];
        assert_eq!(reduce(ObjectiveKind::Mean, &mut s.clone()), -4.0);
        assert_eq!(reduce(ObjectiveKind::MinusMean, &mut s.clone()), 4.0);
        assert_eq!(reduce(ObjectiveKind::Median, &mut s), -2.5);
    }

    #[test]
    fn variance_of_constant_is_zero() {
        let mut s = [3.0; 5];
        assert_eq!(reduce(ObjectiveKind::Variance, &mut s), 0.0);
        assert!((variance(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_samples_are_nan() {
        assert!(reduce(ObjectiveKind::Mean, &mut []).is_nan());
        assert!(reduce(ObjectiveKind::Median, &mut []).is_nan());
        assert!(reduce(ObjectiveKind::Variance, &mut []).is_nan());
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median_mut(&mut [5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median_mut(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median_mut(&mut []), None);
    }
}
