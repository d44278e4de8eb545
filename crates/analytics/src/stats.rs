//! Descriptive statistics over value series
//!
//! Pure, stateless functions over `&[f64]`. Every function returns a finite
//! neutral value for empty or degenerate input; nothing here panics or
//! produces NaN. Non-finite input values are treated as 0.

use forum_pulse_types::{Quartiles, RegressionFit, SummaryStatistics};

/// Replace non-finite values with 0 so they cannot poison downstream math
pub fn sanitize(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|v| if v.is_finite() { *v } else { 0.0 })
        .collect()
}

/// Arithmetic mean; 0 for empty input
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median; average of the two middle values for even-length input
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Population variance; 0 for fewer than two values
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Standard deviation divided by mean magnitude; 0 for a zero-mean series
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values).abs();
    if m < f64::EPSILON {
        return 0.0;
    }
    std_dev(values) / m
}

/// Linear-interpolated percentile of already-sorted data, p in [0, 100]
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let index = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let fraction = index - lower as f64;
        sorted[lower] * (1.0 - fraction) + sorted[upper] * fraction
    }
}

/// Linear-interpolated percentile of unsorted data
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    percentile_sorted(&sorted, p)
}

/// Quartile boundaries via linear-interpolated rank; q2 matches [`median`]
pub fn quartiles(values: &[f64]) -> Quartiles {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Quartiles {
        q1: percentile_sorted(&sorted, 25.0),
        q2: percentile_sorted(&sorted, 50.0),
        q3: percentile_sorted(&sorted, 75.0),
    }
}

/// Third standardized moment; 0 for constant or short series
pub fn skewness(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let m = mean(values);
    let sd = std_dev(values);
    if sd < f64::EPSILON {
        return 0.0;
    }
    values.iter().map(|x| ((x - m) / sd).powi(3)).sum::<f64>() / values.len() as f64
}

/// Excess kurtosis (fourth standardized moment minus 3); 0 for degenerate input
pub fn kurtosis(values: &[f64]) -> f64 {
    if values.len() < 4 {
        return 0.0;
    }
    let m = mean(values);
    let sd = std_dev(values);
    if sd < f64::EPSILON {
        return 0.0;
    }
    values.iter().map(|x| ((x - m) / sd).powi(4)).sum::<f64>() / values.len() as f64 - 3.0
}

/// Ordinary least squares of y against x
///
/// Degenerate input (length mismatch, fewer than two points, zero x-variance)
/// yields a flat fit through the mean of y instead of NaN.
pub fn linear_regression(x: &[f64], y: &[f64]) -> RegressionFit {
    if x.len() != y.len() || x.len() < 2 {
        return RegressionFit::flat(mean(y));
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        sxx += (xi - mean_x) * (xi - mean_x);
        sxy += (xi - mean_x) * (yi - mean_y);
    }

    if sxx < f64::EPSILON {
        return RegressionFit::flat(mean_y);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let fitted = slope * xi + intercept;
        ss_res += (yi - fitted).powi(2);
        ss_tot += (yi - mean_y).powi(2);
    }

    let r_squared = if ss_tot < f64::EPSILON {
        // All y identical and perfectly fitted by the flat line
        1.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    RegressionFit {
        slope,
        intercept,
        r_squared,
    }
}

/// Pearson correlation; 0 when either series has zero variance
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        sxy += (xi - mean_x) * (yi - mean_y);
        sxx += (xi - mean_x) * (xi - mean_x);
        syy += (yi - mean_y) * (yi - mean_y);
    }

    let denom = (sxx * syy).sqrt();
    if denom < f64::EPSILON {
        return 0.0;
    }
    (sxy / denom).clamp(-1.0, 1.0)
}

/// Full descriptive summary; all fields zero for empty input
pub fn summary(values: &[f64]) -> SummaryStatistics {
    let values = sanitize(values);
    if values.is_empty() {
        return SummaryStatistics::empty();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    SummaryStatistics {
        count: values.len(),
        mean: mean(&values),
        median: median(&values),
        standard_deviation: std_dev(&values),
        min,
        max,
        quartiles: quartiles(&values),
        skewness: skewness(&values),
        kurtosis: kurtosis(&values),
    }
}
