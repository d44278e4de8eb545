//! Trend analysis
//!
//! Directional trend classification via linear regression, the Mann-Kendall
//! nonparametric test, additive seasonal decomposition, breakpoint detection
//! and an autocorrelation-based seasonality scan.

use chrono::{DateTime, Utc};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use forum_pulse_types::{SeasonalDecomposition, TrendDirection, TrendMethod, TrendResult};

use crate::errors::{AnalyticsError, Result};
use crate::stats;

/// Seconds per day, used to convert timestamps into regression x-values
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Configuration for trend analysis
#[derive(Debug, Clone)]
pub struct TrendConfig {
    /// Significance level for p-value based tests (default 0.05)
    pub significance_level: f64,
    /// Confidence above which a regression trend counts as significant
    /// (default 0.95)
    pub confidence_threshold: f64,
    /// Minimum points before any test runs (default 4)
    pub min_data_points: usize,
    /// Slope magnitude relative to the series mean below which the trend is
    /// classified as stable (default 0.01)
    pub stable_slope_ratio: f64,
    /// Chow F statistic a candidate split must exceed to count as a
    /// breakpoint (default 15.0)
    pub breakpoint_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            confidence_threshold: 0.95,
            min_data_points: 4,
            stable_slope_ratio: 0.01,
            breakpoint_threshold: 15.0,
        }
    }
}

/// Trend analyzer over ordered value series
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    /// Create an analyzer with the default configuration
    pub fn new() -> Self {
        Self {
            config: TrendConfig::default(),
        }
    }

    /// Create an analyzer with a custom configuration, validated up front
    pub fn with_config(config: TrendConfig) -> Result<Self> {
        if config.significance_level <= 0.0 || config.significance_level >= 1.0 {
            return Err(AnalyticsError::InvalidConfig(
                "Significance level must be in (0, 1)".to_string(),
            ));
        }
        if config.confidence_threshold <= 0.0 || config.confidence_threshold >= 1.0 {
            return Err(AnalyticsError::InvalidConfig(
                "Confidence threshold must be in (0, 1)".to_string(),
            ));
        }
        if config.min_data_points < 3 {
            return Err(AnalyticsError::InvalidConfig(
                "Minimum data points must be at least 3".to_string(),
            ));
        }
        if config.breakpoint_threshold <= 0.0 {
            return Err(AnalyticsError::InvalidConfig(
                "Breakpoint threshold must be positive".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Classify the directional trend of a series with a linear fit
    ///
    /// The fit runs against the point index, or against elapsed days when
    /// timestamps are supplied. Confidence is the regression R² clamped to
    /// [0, 1].
    pub fn analyze_trend(
        &self,
        values: &[f64],
        timestamps: Option<&[DateTime<Utc>]>,
    ) -> TrendResult {
        let values = stats::sanitize(values);
        debug!(points = values.len(), "analyzing trend");

        if values.len() < self.config.min_data_points {
            return TrendResult::insufficient_data(TrendMethod::LinearRegression);
        }

        let x: Vec<f64> = match timestamps {
            Some(ts) if ts.len() == values.len() => {
                let t0 = ts[0];
                ts.iter()
                    .map(|t| (*t - t0).num_seconds() as f64 / SECONDS_PER_DAY)
                    .collect()
            }
            _ => (0..values.len()).map(|i| i as f64).collect(),
        };

        let fit = stats::linear_regression(&x, &values);
        let confidence = fit.r_squared.clamp(0.0, 1.0);

        // Slope is measured relative to the series mean so the stability
        // threshold scales with the data.
        let scale = stats::mean(&values).abs().max(f64::EPSILON);
        let trend = if fit.slope.abs() / scale < self.config.stable_slope_ratio {
            TrendDirection::Stable
        } else if fit.slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        };

        TrendResult {
            method: TrendMethod::LinearRegression,
            trend,
            slope: Some(fit.slope),
            r_squared: Some(fit.r_squared),
            statistic: None,
            p_value: None,
            confidence: Some(confidence),
            significant: confidence > self.config.confidence_threshold,
            breakpoints: Vec::new(),
        }
    }

    /// Mann-Kendall nonparametric test for a monotonic trend
    ///
    /// Uses the tie-corrected variance formula and a two-sided p-value from
    /// the standard normal CDF. Series shorter than the configured minimum
    /// yield a neutral result.
    pub fn mann_kendall(&self, values: &[f64]) -> Result<TrendResult> {
        let values = stats::sanitize(values);
        let n = values.len();

        if n < self.config.min_data_points {
            return Ok(TrendResult::insufficient_data(TrendMethod::MannKendall));
        }

        // S = sum over i < j of sign(v[j] - v[i])
        let mut s: i64 = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                let diff = values[j] - values[i];
                if diff > 0.0 {
                    s += 1;
                } else if diff < 0.0 {
                    s -= 1;
                }
            }
        }

        let var_s = mann_kendall_variance(&values);
        if var_s <= 0.0 {
            // All values tied
            return Ok(TrendResult {
                method: TrendMethod::MannKendall,
                trend: TrendDirection::Stable,
                slope: None,
                r_squared: None,
                statistic: Some(s as f64),
                p_value: Some(1.0),
                confidence: Some(0.0),
                significant: false,
                breakpoints: Vec::new(),
            });
        }

        // Standardized Z with continuity correction
        let z = if s > 0 {
            (s as f64 - 1.0) / var_s.sqrt()
        } else if s < 0 {
            (s as f64 + 1.0) / var_s.sqrt()
        } else {
            0.0
        };

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| AnalyticsError::StatisticalError(e.to_string()))?;
        let p_value = (2.0 * (1.0 - normal.cdf(z.abs()))).clamp(0.0, 1.0);

        let trend = if s > 0 {
            TrendDirection::Increasing
        } else if s < 0 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        Ok(TrendResult {
            method: TrendMethod::MannKendall,
            trend,
            slope: None,
            r_squared: None,
            statistic: Some(s as f64),
            p_value: Some(p_value),
            confidence: Some((1.0 - p_value).clamp(0.0, 1.0)),
            significant: p_value < self.config.significance_level,
            breakpoints: Vec::new(),
        })
    }

    /// Additive seasonal decomposition with a centered moving-average trend
    ///
    /// Requires at least two full periods; with less, the raw series is
    /// returned as the trend with a zero seasonal component.
    pub fn seasonal_decomposition(
        &self,
        values: &[f64],
        period: usize,
    ) -> Result<SeasonalDecomposition> {
        if period < 2 {
            return Err(AnalyticsError::InvalidParameter(
                "Seasonal period must be at least 2".to_string(),
            ));
        }

        let values = stats::sanitize(values);
        let n = values.len();

        if n < 2 * period {
            debug!(points = n, period, "not enough data for decomposition");
            return Ok(SeasonalDecomposition {
                trend: values.clone(),
                seasonal: vec![0.0; period],
                residual: vec![0.0; n],
                period,
            });
        }

        let trend = centered_moving_average(&values, period);

        // Seasonal component: mean detrended value per position, centered so
        // one period sums to ~0.
        let mut sums = vec![0.0; period];
        let mut counts = vec![0usize; period];
        for i in 0..n {
            sums[i % period] += values[i] - trend[i];
            counts[i % period] += 1;
        }
        let mut seasonal: Vec<f64> = sums
            .iter()
            .zip(counts.iter())
            .map(|(s, c)| if *c > 0 { s / *c as f64 } else { 0.0 })
            .collect();
        let seasonal_mean = stats::mean(&seasonal);
        for s in &mut seasonal {
            *s -= seasonal_mean;
        }

        let residual: Vec<f64> = (0..n)
            .map(|i| values[i] - trend[i] - seasonal[i % period])
            .collect();

        Ok(SeasonalDecomposition {
            trend,
            seasonal,
            residual,
            period,
        })
    }

    /// Flag indices where the series changes regime
    ///
    /// Binary segmentation with a Chow-style test: for each candidate split
    /// the series is fitted with two separate lines, and the split with the
    /// largest F statistic against the single-line fit is kept when it
    /// exceeds the configured threshold. Accepted segments are searched
    /// recursively, so each dominant regime change yields one index.
    /// Returned indices are ascending.
    pub fn detect_breakpoints(&self, values: &[f64]) -> Vec<usize> {
        let values = stats::sanitize(values);
        let mut found = Vec::new();
        self.segment_breakpoints(&values, 0, &mut found);
        found.sort_unstable();
        found
    }

    fn segment_breakpoints(&self, segment: &[f64], offset: usize, found: &mut Vec<usize>) {
        let margin = self.config.min_data_points.max(5);
        let n = segment.len();
        if n < 2 * margin {
            return;
        }

        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let pooled = fit_sse(&x, segment);

        let mut best: Option<(usize, f64)> = None;
        for split in margin..=(n - margin) {
            let sse = fit_sse(&x[..split], &segment[..split])
                + fit_sse(&x[split..], &segment[split..]);
            // F for the two extra parameters of the piecewise fit
            let df = (n.saturating_sub(4)) as f64;
            let f = ((pooled - sse) / 2.0) / (sse / df).max(f64::EPSILON);
            if best.map_or(true, |(_, b)| f > b) {
                best = Some((split, f));
            }
        }

        if let Some((split, f)) = best {
            if f > self.config.breakpoint_threshold {
                found.push(offset + split);
                self.segment_breakpoints(&segment[..split], offset, found);
                self.segment_breakpoints(&segment[split..], offset + split, found);
            }
        }
    }

    /// Detect the dominant seasonal period via autocorrelation
    ///
    /// Scans lags `2..=max_period` and returns the lag with the strongest
    /// autocorrelation above 0.3, together with that correlation.
    pub fn detect_seasonality(&self, values: &[f64], max_period: usize) -> Option<(usize, f64)> {
        let values = stats::sanitize(values);
        let n = values.len();
        if n < 2 * self.config.min_data_points {
            return None;
        }

        let mean = stats::mean(&values);
        let var: f64 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        if var < f64::EPSILON {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        let upper = max_period.min(n / 2);
        for lag in 2..=upper {
            let mut acf = 0.0;
            for i in 0..(n - lag) {
                acf += (values[i] - mean) * (values[i + lag] - mean);
            }
            acf /= (n - lag) as f64 * var;

            if acf > 0.3 && best.map_or(true, |(_, b)| acf > b) {
                best = Some((lag, acf));
            }
        }

        best
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Tie-corrected Mann-Kendall variance:
/// `[n(n-1)(2n+5) - sum_t t(t-1)(2t+5)] / 18` over tied groups of size t
fn mann_kendall_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mut var = n * (n - 1.0) * (2.0 * n + 5.0);

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        let t = (j - i) as f64;
        if t > 1.0 {
            var -= t * (t - 1.0) * (2.0 * t + 5.0);
        }
        i = j;
    }

    var / 18.0
}

/// Centered moving average of width `period`, edges filled with the nearest
/// interior value so the result covers the full series
fn centered_moving_average(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut trend = vec![0.0; n];

    if period % 2 == 1 {
        let half = period / 2;
        for i in half..(n - half) {
            trend[i] = stats::mean(&values[i - half..=i + half]);
        }
        fill_edges(&mut trend, half, n - half - 1);
    } else {
        // Even period: 2 x period moving average so the window stays centered
        let half = period / 2;
        for i in half..(n - half) {
            let first: f64 = values[i - half..i + half].iter().sum();
            let second: f64 = values[i - half + 1..=i + half].iter().sum();
            trend[i] = (first + second) / (2.0 * period as f64);
        }
        fill_edges(&mut trend, half, n - half - 1);
    }

    trend
}

/// Replicate the first/last computed trend value into the uncovered edges
fn fill_edges(trend: &mut [f64], first: usize, last: usize) {
    for i in 0..first {
        trend[i] = trend[first];
    }
    for i in (last + 1)..trend.len() {
        trend[i] = trend[last];
    }
}

/// Residual sum of squares of a linear fit of y against x
fn fit_sse(x: &[f64], y: &[f64]) -> f64 {
    let fit = stats::linear_regression(x, y);
    x.iter()
        .zip(y.iter())
        .map(|(xi, yi)| (yi - fit.predict(*xi)).powi(2))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn analyzer() -> TrendAnalyzer {
        TrendAnalyzer::new()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = TrendConfig::default();
        config.significance_level = 1.5;
        assert!(TrendAnalyzer::with_config(config).is_err());

        let mut config = TrendConfig::default();
        config.min_data_points = 1;
        assert!(TrendAnalyzer::with_config(config).is_err());
    }

    #[test]
    fn test_analyze_trend_increasing() {
        let values: Vec<f64> = (0..30).map(|i| 50.0 + 3.0 * i as f64).collect();
        let result = analyzer().analyze_trend(&values, None);

        assert_eq!(result.trend, TrendDirection::Increasing);
        assert!(result.confidence.unwrap() > 0.99);
        assert!(result.significant);
        assert_relative_eq!(result.slope.unwrap(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_analyze_trend_noisy_increasing() {
        // 50 + 3i with deterministic "noise"
        let values: Vec<f64> = (0..30)
            .map(|i| 50.0 + 3.0 * i as f64 + ((i * 7) % 5) as f64 - 2.0)
            .collect();
        let result = analyzer().analyze_trend(&values, None);

        assert_eq!(result.trend, TrendDirection::Increasing);
        assert!(result.confidence.unwrap() > 0.7);
    }

    #[test]
    fn test_analyze_trend_stable() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + ((i % 3) as f64) * 0.1).collect();
        let result = analyzer().analyze_trend(&values, None);
        assert_eq!(result.trend, TrendDirection::Stable);
    }

    #[test]
    fn test_analyze_trend_insufficient_data() {
        let result = analyzer().analyze_trend(&[1.0, 2.0], None);
        assert_eq!(result.trend, TrendDirection::Stable);
        assert!(!result.significant);
        assert_eq!(result.confidence, Some(0.0));
    }

    #[test]
    fn test_mann_kendall_increasing() {
        let values: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let result = analyzer().mann_kendall(&values).unwrap();

        assert_eq!(result.trend, TrendDirection::Increasing);
        assert!(result.p_value.unwrap() < 0.05);
        assert!(result.significant);
        assert!(result.statistic.unwrap() > 0.0);
    }

    #[test]
    fn test_mann_kendall_decreasing() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let result = analyzer().mann_kendall(&values).unwrap();

        assert_eq!(result.trend, TrendDirection::Decreasing);
        assert!(result.p_value.unwrap() < 0.05);
    }

    #[test]
    fn test_mann_kendall_constant() {
        let values = vec![5.0; 20];
        let result = analyzer().mann_kendall(&values).unwrap();

        assert_eq!(result.trend, TrendDirection::Stable);
        assert!(!result.significant);
        assert_eq!(result.p_value, Some(1.0));
    }

    #[test]
    fn test_mann_kendall_handles_ties() {
        let values = vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0, 5.0, 5.0];
        let result = analyzer().mann_kendall(&values).unwrap();

        assert_eq!(result.trend, TrendDirection::Increasing);
        assert!(result.p_value.unwrap() < 0.05);
    }

    #[test]
    fn test_tie_corrected_variance_smaller() {
        let no_ties: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ties = vec![1.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0];
        assert!(mann_kendall_variance(&ties) < mann_kendall_variance(&no_ties));
    }

    #[test]
    fn test_decomposition_reconstructs() {
        // Ramp plus a period-7 weekly pattern
        let values: Vec<f64> = (0..42)
            .map(|i| 10.0 + 0.5 * i as f64 + [3.0, 1.0, -1.0, -3.0, -1.0, 0.0, 1.0][i % 7])
            .collect();
        let d = analyzer().seasonal_decomposition(&values, 7).unwrap();

        assert_eq!(d.trend.len(), values.len());
        assert_eq!(d.seasonal.len(), 7);
        for (i, v) in values.iter().enumerate() {
            assert_relative_eq!(d.reconstruct(i), *v, epsilon = 1e-9);
        }
        // Seasonal component is centered
        assert_relative_eq!(d.seasonal.iter().sum::<f64>(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_decomposition_even_period() {
        let values: Vec<f64> = (0..24)
            .map(|i| 5.0 + [2.0, -2.0, 1.0, -1.0][i % 4])
            .collect();
        let d = analyzer().seasonal_decomposition(&values, 4).unwrap();
        for (i, v) in values.iter().enumerate() {
            assert_relative_eq!(d.reconstruct(i), *v, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_decomposition_short_series_passthrough() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let d = analyzer().seasonal_decomposition(&values, 7).unwrap();

        assert_eq!(d.trend, values);
        assert!(d.seasonal.iter().all(|s| *s == 0.0));
        assert!(d.residual.iter().all(|r| *r == 0.0));
    }

    #[test]
    fn test_decomposition_rejects_bad_period() {
        assert!(analyzer().seasonal_decomposition(&[1.0, 2.0], 1).is_err());
    }

    #[test]
    fn test_breakpoint_at_regime_change() {
        // Flat for 30 points, then a ramp
        let values: Vec<f64> = (0..60)
            .map(|i| {
                if i < 30 {
                    10.0 + ((i % 3) as f64) * 0.1
                } else {
                    10.0 + 2.0 * (i - 30) as f64
                }
            })
            .collect();
        let breakpoints = analyzer().detect_breakpoints(&values);

        assert_eq!(breakpoints.len(), 1);
        let bp = breakpoints[0] as i64;
        assert!((bp - 30).abs() <= 5, "breakpoint {} not near 30", bp);
    }

    #[test]
    fn test_no_breakpoint_in_smooth_series() {
        let values: Vec<f64> = (0..40).map(|i| 10.0 + ((i % 4) as f64) * 0.2).collect();
        assert!(analyzer().detect_breakpoints(&values).is_empty());
    }

    #[test]
    fn test_breakpoints_short_series_empty() {
        assert!(analyzer().detect_breakpoints(&[1.0, 2.0, 3.0]).is_empty());
    }

    #[test]
    fn test_detect_seasonality_finds_period() {
        let values: Vec<f64> = (0..70)
            .map(|i| 20.0 + [5.0, 3.0, 0.0, -3.0, -5.0, -3.0, 3.0][i % 7])
            .collect();
        let (period, strength) = analyzer().detect_seasonality(&values, 14).unwrap();
        assert_eq!(period, 7);
        assert!(strength > 0.5);
    }

    #[test]
    fn test_detect_seasonality_none_for_flat() {
        let values = vec![5.0; 50];
        assert!(analyzer().detect_seasonality(&values, 14).is_none());
    }
}
