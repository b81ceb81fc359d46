use serde::{Deserialize, Serialize};

/// Running mean, spread and extremes of a stream of values.
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
    min: f64,
    max: f64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        // Welford update.
        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;
        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;

        self.min = self.min.min(val);
        self.max = self.max.max(val);
    }

    pub fn report(&self) -> AccumulatorReport {
        if self.n_vals == 0 {
            return AccumulatorReport {
                mean: f64::NAN,
                std_dev: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }
        AccumulatorReport {
            mean: self.mean,
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals - 1) as f64).sqrt()
            } else {
                f64::NAN
            },
            min: self.min,
            max: self.max,
        }
    }
}

/// Daily series of a quantity, kept whole for correlated-error estimates.
pub struct TimeSeries {
    vals: Vec<f64>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesReport {
    pub mean: f64,
    pub sem: f64,
    pub last: f64,
    /// Index of the value with the largest magnitude.
    pub i_peak: usize,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self { vals: Vec::new() }
    }

    pub fn push(&mut self, val: f64) {
        self.vals.push(val);
    }

    pub fn report(&self) -> TimeSeriesReport {
        let i_peak = self
            .vals
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(i_best, best), (i, &val)| {
                if val.abs() > best { (i, val.abs()) } else { (i_best, best) }
            })
            .0;
        TimeSeriesReport {
            mean: mean(&self.vals),
            sem: blocked_sem(&self.vals),
            last: self.vals.last().copied().unwrap_or(f64::NAN),
            i_peak,
        }
    }
}

fn mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

fn sample_var(vals: &[f64]) -> f64 {
    let n_vals = vals.len();
    if n_vals < 2 {
        return f64::NAN;
    }
    let mean = mean(vals);
    vals.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / (n_vals - 1) as f64
}

/// Standard error of the mean of a correlated series.
///
/// Repeatedly averages neighbouring pairs (Flyvbjerg-Petersen blocking) and
/// returns the largest estimate over the levels with at least four blocks.
fn blocked_sem(vals: &[f64]) -> f64 {
    let mut blocks = vals.to_vec();
    let mut sem: f64 = f64::NAN;
    while blocks.len() >= 4 {
        let est = (sample_var(&blocks) / blocks.len() as f64).sqrt();
        if sem.is_nan() || est > sem {
            sem = est;
        }
        blocks = blocks
            .chunks_exact(2)
            .map(|pair| 0.5 * (pair[0] + pair[1]))
            .collect();
    }
    sem
}
