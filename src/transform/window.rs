use serde::Deserialize;

/// Weights applied to each block before it is transformed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    /// No weighting (all ones).
    #[default]
    Rectangular,
    /// w[i] = 0.5 * (1 - cos(2πi / (N-1)))
    Hann,
}

impl WindowFunction {
    pub fn coefficients(self, size: usize) -> Vec<f64> {
        match self {
            WindowFunction::Rectangular => vec![1.0; size],
            WindowFunction::Hann => hann_window(size),
        }
    }

    pub fn is_rectangular(self) -> bool {
        self == WindowFunction::Rectangular
    }
}

fn hann_window(size: usize) -> Vec<f64> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rectangular_is_all_ones() {
        let w = WindowFunction::Rectangular.coefficients(64);
        assert_eq!(w.len(), 64);
        assert!(w.iter().all(|&x| x == 1.0));
    }

    #[test]
    fn hann_endpoints_and_peak() {
        let w = WindowFunction::Hann.coefficients(65);
        assert_abs_diff_eq!(w[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[64], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[32], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn hann_is_symmetric() {
        let w = WindowFunction::Hann.coefficients(128);
        for i in 0..64 {
            assert_abs_diff_eq!(w[i], w[127 - i], epsilon = 1e-12);
        }
    }
}
