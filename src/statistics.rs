/// A simple statistics module with utility functions shared by the fitting and
/// aggregation code.
use statrs::statistics::Statistics;

/// Two-sided 95% quantile of the standard normal distribution.
pub(crate) const Z_95: f64 = 1.959963984540054;

pub(crate) fn mean(numbers: &[f64]) -> f64 {
    numbers.iter().copied().mean()
}

/// Sample variance (n - 1 denominator). Returns 0 for fewer than two values.
pub(crate) fn sample_variance(numbers: &[f64]) -> f64 {
    if numbers.len() < 2 {
        return 0.;
    }
    numbers.iter().copied().variance()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::*;

    #[fixture]
    fn numbers() -> [f64; 6] {
        [2.0, 4.0, 4.0, 4.0, 5.0, 5.0]
    }

    #[rstest]
    fn test_mean(numbers: [f64; 6]) {
        assert_relative_eq!(mean(&numbers), 4.0);
    }

    #[rstest]
    fn test_sample_variance(numbers: [f64; 6]) {
        assert_relative_eq!(sample_variance(&numbers), 1.2);
    }

    #[rstest]
    fn test_sample_variance_degenerate_lengths() {
        assert_eq!(sample_variance(&[]), 0.);
        assert_eq!(sample_variance(&[3.0]), 0.);
    }
}
