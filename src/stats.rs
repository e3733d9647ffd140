use serde::{Deserialize, Serialize};

/// Online mean and variance accumulator (Welford).
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub n_vals: usize,
    pub mean: f64,
    pub std_dev: Option<f64>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            n_vals: self.n_vals,
            mean: self.mean,
            std_dev: if self.n_vals > 1 {
                Some((self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt())
            } else {
                None
            },
        }
    }
}

/// Trailing mean over fixed-size windows.
///
/// The result has one entry per value; positions before the window fills are `None`.
pub fn rolling_mean(vals: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut means = vec![None; vals.len()];
    if window == 0 || vals.len() < window {
        return means;
    }
    for (idx, win) in vals.windows(window).enumerate() {
        means[idx + window - 1] = Some(win.iter().sum::<f64>() / window as f64);
    }
    means
}

/// Quantile of sorted values using linear interpolation between closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn accumulator_matches_two_pass_formula() {
        let vals = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mut acc = Accumulator::new();
        vals.iter().for_each(|&val| acc.add(val));
        let report = acc.report();

        assert_eq!(report.n_vals, 8);
        assert_abs_diff_eq!(report.mean, 5.0, epsilon = 1e-12);
        // Sample variance: 32 / 7.
        assert_abs_diff_eq!(report.std_dev.unwrap(), (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn accumulator_std_undefined_for_single_value() {
        let mut acc = Accumulator::new();
        acc.add(3.5);
        let report = acc.report();
        assert_eq!(report.mean, 3.5);
        assert_eq!(report.std_dev, None);
    }

    #[test]
    fn rolling_mean_leaves_leading_positions_undefined() {
        let vals: Vec<f64> = (1..=5).map(f64::from).collect();
        let means = rolling_mean(&vals, 3);
        assert_eq!(means, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn rolling_mean_short_series_is_all_undefined() {
        let means = rolling_mean(&[1.0; 10], 30);
        assert!(means.iter().all(Option::is_none));
        assert_eq!(means.len(), 10);
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile(&sorted, 0.25), Some(1.75));
        assert_eq!(quantile(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
    }
}
