//! Sample statistics for repeated readings.

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Population standard deviation (divides by `n`), or `None` for an empty slice.
pub fn population_std(samples: &[f64]) -> Option<f64> {
    let m = mean(samples)?;
    let variance =
        samples.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / samples.len() as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_undefined() {
        assert_eq!(mean(&[]), None);
        assert_eq!(population_std(&[]), None);
    }

    #[test]
    fn test_population_not_sample_std() {
        // n = 8, mean 5, population variance 4
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&xs), Some(5.0));
        let std = population_std(&xs).unwrap_or(f64::NAN);
        assert!((std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_samples_have_zero_spread() {
        assert_eq!(population_std(&[0.5, 0.5, 0.5]), Some(0.0));
    }
}
