//! Forecasting
//!
//! Horizon forecasts with prediction intervals. Models: linear OLS
//! extrapolation, simple exponential smoothing, Holt double smoothing,
//! additive Holt-Winters and decomposition-based seasonal extrapolation.
//! `auto` selection and the downgrade chain for short series are explicit
//! decision functions so the policy is testable on its own.

use chrono::{DateTime, Duration, Utc};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, warn};

use forum_pulse_types::{
    CrossValidationReport, ForecastAccuracy, ForecastModel, ForecastPoint, ForecastResult,
    ModelAccuracy,
};

use crate::errors::{AnalyticsError, Result};
use crate::stats;
use crate::trend::TrendAnalyzer;

/// Smoothing factor for the level component
const ALPHA: f64 = 0.3;
/// Smoothing factor for the trend component
const BETA: f64 = 0.1;
/// Smoothing factor for the seasonal component
const GAMMA: f64 = 0.2;

/// Autocorrelation at the seasonal lag above which a series counts as seasonal
const SEASONALITY_CUTOFF: f64 = 0.4;
/// Regression R² above which a series counts as trending
const TREND_CUTOFF: f64 = 0.4;
/// Coefficient of variation below which a series counts as flat
const FLAT_CV_CUTOFF: f64 = 0.01;
/// Minimum points before accuracy estimation makes sense
const MIN_VALIDATION_POINTS: usize = 10;

/// Configuration for forecasting
#[derive(Debug, Clone)]
pub struct ForecastConfig {
    /// Model to use; `Auto` picks from series characteristics (default)
    pub model: ForecastModel,
    /// Future points to produce (default 7)
    pub horizon: usize,
    /// Prediction-interval confidence level (default 0.95)
    pub confidence: f64,
    /// Period assumed by seasonal models (default 7)
    pub seasonal_period: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            model: ForecastModel::Auto,
            horizon: 7,
            confidence: 0.95,
            seasonal_period: 7,
        }
    }
}

/// Forecasting engine over ordered value series
pub struct ForecastingEngine {
    config: ForecastConfig,
}

impl ForecastingEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self {
            config: ForecastConfig::default(),
        }
    }

    /// Create an engine with a custom configuration, validated up front
    pub fn with_config(config: ForecastConfig) -> Result<Self> {
        if config.horizon == 0 {
            return Err(AnalyticsError::InvalidConfig(
                "Horizon must be at least 1".to_string(),
            ));
        }
        if config.confidence <= 0.0 || config.confidence >= 1.0 {
            return Err(AnalyticsError::InvalidConfig(
                "Confidence must be in (0, 1)".to_string(),
            ));
        }
        if config.seasonal_period < 2 {
            return Err(AnalyticsError::InvalidConfig(
                "Seasonal period must be at least 2".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Produce `horizon` future points with prediction intervals
    ///
    /// Interval half-width is the in-sample residual standard deviation
    /// scaled by the z-value for the configured confidence, widening with
    /// the square root of forecast distance. Series too short for the chosen
    /// model downgrade along `holt_winters -> holt -> linear` instead of
    /// failing; an empty series yields an empty forecast.
    pub fn forecast(
        &self,
        values: &[f64],
        timestamps: Option<&[DateTime<Utc>]>,
    ) -> Result<ForecastResult> {
        let values = stats::sanitize(values);
        let n = values.len();
        debug!(points = n, horizon = self.config.horizon, "forecasting");

        if n == 0 {
            return Ok(ForecastResult {
                model: ForecastModel::Linear,
                forecast: Vec::new(),
                accuracy: None,
            });
        }

        let requested = match self.config.model {
            ForecastModel::Auto => select_model(&values, self.config.seasonal_period),
            model => model,
        };
        let model = self.downgrade_for_length(requested, n);

        let (fitted, predictions) = self.run_model(model, &values, self.config.horizon)?;

        let residuals: Vec<f64> = values
            .iter()
            .zip(fitted.iter())
            .map(|(v, f)| v - f)
            .collect();
        let residual_std = stats::std_dev(&residuals);
        let z = z_value(self.config.confidence)?;

        let cadence = timestamps.and_then(median_cadence);
        let last_timestamp = timestamps.and_then(|ts| ts.last().copied());

        let forecast = predictions
            .iter()
            .enumerate()
            .map(|(k, value)| {
                let half_width = z * residual_std * ((k + 1) as f64).sqrt();
                let timestamp = match (last_timestamp, cadence) {
                    (Some(last), Some(step)) => Some(last + step * (k as i32 + 1)),
                    _ => None,
                };
                ForecastPoint {
                    index: n + k,
                    timestamp,
                    value: *value,
                    lower: value - half_width,
                    upper: value + half_width,
                }
            })
            .collect();

        let accuracy = if n >= MIN_VALIDATION_POINTS {
            self.holdout_accuracy(model, &values)?
        } else {
            None
        };

        Ok(ForecastResult {
            model,
            forecast,
            accuracy,
        })
    }

    /// Hold out a trailing fraction, fit each candidate on the head and
    /// report per-model accuracy against the held-out actuals
    ///
    /// Series shorter than the validation minimum yield an empty report.
    pub fn cross_validate(&self, values: &[f64]) -> Result<CrossValidationReport> {
        let values = stats::sanitize(values);
        let n = values.len();

        if n < MIN_VALIDATION_POINTS {
            return Ok(CrossValidationReport {
                holdout_len: 0,
                results: Vec::new(),
                best_model: None,
            });
        }

        let holdout_len = ((n as f64 * 0.2).round() as usize).clamp(3, n - 5);
        let (train, actual) = values.split_at(n - holdout_len);

        let candidates = [
            ForecastModel::Linear,
            ForecastModel::Smoothing,
            ForecastModel::Holt,
            ForecastModel::HoltWinters,
            ForecastModel::Seasonal,
        ];

        let mut results = Vec::new();
        for model in candidates {
            if train.len() < self.minimum_points(model) {
                continue;
            }
            let (_, predictions) = self.run_model(model, train, holdout_len)?;
            results.push(ModelAccuracy {
                model,
                accuracy: accuracy_against(actual, &predictions),
            });
        }

        let best_model = results
            .iter()
            .min_by(|a, b| {
                a.accuracy
                    .rmse
                    .partial_cmp(&b.accuracy.rmse)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|r| r.model);

        Ok(CrossValidationReport {
            holdout_len,
            results,
            best_model,
        })
    }

    /// Accuracy of one model on a trailing holdout of the same series
    fn holdout_accuracy(&self, model: ForecastModel, values: &[f64]) -> Result<Option<ForecastAccuracy>> {
        let n = values.len();
        let holdout_len = ((n as f64 * 0.2).round() as usize).clamp(3, n - 5);
        let (train, actual) = values.split_at(n - holdout_len);

        if train.len() < self.minimum_points(model) {
            return Ok(None);
        }
        let (_, predictions) = self.run_model(model, train, holdout_len)?;
        Ok(Some(accuracy_against(actual, &predictions)))
    }

    /// Fall back to a simpler model when the series is too short
    fn downgrade_for_length(&self, model: ForecastModel, n: usize) -> ForecastModel {
        let mut current = model;
        loop {
            if n >= self.minimum_points(current) {
                return current;
            }
            let simpler = match current {
                ForecastModel::HoltWinters => ForecastModel::Holt,
                ForecastModel::Seasonal => ForecastModel::Linear,
                ForecastModel::Holt | ForecastModel::Smoothing => ForecastModel::Linear,
                ForecastModel::Linear | ForecastModel::Auto => return ForecastModel::Linear,
            };
            warn!(
                from = current.as_str(),
                to = simpler.as_str(),
                points = n,
                "series too short for requested model, downgrading"
            );
            current = simpler;
        }
    }

    /// Shortest series each model can fit
    fn minimum_points(&self, model: ForecastModel) -> usize {
        match model {
            ForecastModel::Linear | ForecastModel::Auto => 1,
            ForecastModel::Smoothing => 2,
            ForecastModel::Holt => 3,
            ForecastModel::Seasonal | ForecastModel::HoltWinters => 2 * self.config.seasonal_period,
        }
    }

    /// Produce in-sample fitted values and `horizon` predictions
    fn run_model(
        &self,
        model: ForecastModel,
        values: &[f64],
        horizon: usize,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        match model {
            ForecastModel::Linear | ForecastModel::Auto => Ok(linear_forecast(values, horizon)),
            ForecastModel::Smoothing => Ok(smoothing_forecast(values, horizon)),
            ForecastModel::Holt => Ok(holt_forecast(values, horizon)),
            ForecastModel::HoltWinters => {
                Ok(holt_winters_forecast(values, horizon, self.config.seasonal_period))
            }
            ForecastModel::Seasonal => self.seasonal_forecast(values, horizon),
        }
    }

    /// Decomposition-based forecast: linear extrapolation of the trend
    /// component plus the repeating seasonal component
    fn seasonal_forecast(&self, values: &[f64], horizon: usize) -> Result<(Vec<f64>, Vec<f64>)> {
        let period = self.config.seasonal_period;
        let decomposition = TrendAnalyzer::new().seasonal_decomposition(values, period)?;

        let n = values.len();
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let trend_fit = stats::linear_regression(&x, &decomposition.trend);

        let fitted: Vec<f64> = (0..n)
            .map(|i| decomposition.trend[i] + decomposition.seasonal_at(i))
            .collect();
        let predictions: Vec<f64> = (0..horizon)
            .map(|k| trend_fit.predict((n + k) as f64) + decomposition.seasonal_at(n + k))
            .collect();

        Ok((fitted, predictions))
    }
}

impl Default for ForecastingEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick a model from series characteristics
///
/// Seasonal when the autocorrelation at the seasonal lag is strong, Holt
/// when a linear fit explains much of the variance, simple smoothing
/// otherwise. Very short series always get the linear model.
pub fn select_model(values: &[f64], seasonal_period: usize) -> ForecastModel {
    let n = values.len();
    if n < 4 {
        return ForecastModel::Linear;
    }

    // Relative variation too small to carry trend or season signal
    if stats::mean(values).abs() > f64::EPSILON
        && stats::coefficient_of_variation(values) < FLAT_CV_CUTOFF
    {
        return ForecastModel::Smoothing;
    }

    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let fit = stats::linear_regression(&x, values);

    // Check seasonality on residuals; a raw trend inflates the
    // autocorrelation at every lag.
    let residuals: Vec<f64> = values
        .iter()
        .enumerate()
        .map(|(i, v)| v - fit.predict(i as f64))
        .collect();
    if n >= 2 * seasonal_period
        && autocorrelation_at(&residuals, seasonal_period) > SEASONALITY_CUTOFF
    {
        return ForecastModel::HoltWinters;
    }

    if fit.r_squared > TREND_CUTOFF {
        ForecastModel::Holt
    } else {
        ForecastModel::Smoothing
    }
}

/// Autocorrelation of a series with itself at `lag`
fn autocorrelation_at(values: &[f64], lag: usize) -> f64 {
    let n = values.len();
    if lag == 0 || n <= lag {
        return 0.0;
    }

    let mean = stats::mean(values);
    let var: f64 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    if var < f64::EPSILON {
        return 0.0;
    }

    let mut acf = 0.0;
    for i in 0..(n - lag) {
        acf += (values[i] - mean) * (values[i + lag] - mean);
    }
    acf / ((n - lag) as f64 * var)
}

fn linear_forecast(values: &[f64], horizon: usize) -> (Vec<f64>, Vec<f64>) {
    let n = values.len();
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let fit = stats::linear_regression(&x, values);

    let fitted = x.iter().map(|xi| fit.predict(*xi)).collect();
    let predictions = (0..horizon).map(|k| fit.predict((n + k) as f64)).collect();
    (fitted, predictions)
}

fn smoothing_forecast(values: &[f64], horizon: usize) -> (Vec<f64>, Vec<f64>) {
    let mut level = values[0];
    let mut fitted = Vec::with_capacity(values.len());
    fitted.push(values[0]);

    for v in &values[1..] {
        fitted.push(level);
        level = ALPHA * v + (1.0 - ALPHA) * level;
    }

    (fitted, vec![level; horizon])
}

fn holt_forecast(values: &[f64], horizon: usize) -> (Vec<f64>, Vec<f64>) {
    let mut level = values[0];
    let mut trend = values[1] - values[0];

    let mut fitted = Vec::with_capacity(values.len());
    fitted.push(values[0]);

    for v in &values[1..] {
        let one_step = level + trend;
        fitted.push(one_step);

        let prev_level = level;
        level = ALPHA * v + (1.0 - ALPHA) * (level + trend);
        trend = BETA * (level - prev_level) + (1.0 - BETA) * trend;
    }

    let predictions = (0..horizon)
        .map(|k| level + trend * (k + 1) as f64)
        .collect();
    (fitted, predictions)
}

/// Additive Holt-Winters; assumes `values.len() >= 2 * period`
fn holt_winters_forecast(values: &[f64], horizon: usize, period: usize) -> (Vec<f64>, Vec<f64>) {
    let n = values.len();

    // Initialize level and trend from the first two periods, seasonal
    // indices from deviations within the first period.
    let first_mean = stats::mean(&values[..period]);
    let second_mean = stats::mean(&values[period..2 * period]);
    let mut level = first_mean;
    let mut trend = (second_mean - first_mean) / period as f64;
    let mut seasonal: Vec<f64> = values[..period].iter().map(|v| v - first_mean).collect();

    let mut fitted = Vec::with_capacity(n);
    for (i, v) in values.iter().enumerate() {
        let pos = i % period;
        fitted.push(level + trend + seasonal[pos]);

        let prev_level = level;
        level = ALPHA * (v - seasonal[pos]) + (1.0 - ALPHA) * (level + trend);
        trend = BETA * (level - prev_level) + (1.0 - BETA) * trend;
        seasonal[pos] = GAMMA * (v - level) + (1.0 - GAMMA) * seasonal[pos];
    }

    let predictions = (0..horizon)
        .map(|k| level + trend * (k + 1) as f64 + seasonal[(n + k) % period])
        .collect();
    (fitted, predictions)
}

/// MAE, RMSE and MAPE of predictions against actuals (zero actuals are
/// skipped for MAPE)
fn accuracy_against(actual: &[f64], predictions: &[f64]) -> ForecastAccuracy {
    let pairs: Vec<(f64, f64)> = actual
        .iter()
        .zip(predictions.iter())
        .map(|(a, p)| (*a, *p))
        .collect();
    if pairs.is_empty() {
        return ForecastAccuracy {
            mae: 0.0,
            rmse: 0.0,
            mape: 0.0,
        };
    }

    let n = pairs.len() as f64;
    let mae = pairs.iter().map(|(a, p)| (a - p).abs()).sum::<f64>() / n;
    let rmse = (pairs.iter().map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n).sqrt();

    let nonzero: Vec<&(f64, f64)> = pairs.iter().filter(|(a, _)| a.abs() > f64::EPSILON).collect();
    let mape = if nonzero.is_empty() {
        0.0
    } else {
        nonzero
            .iter()
            .map(|(a, p)| ((a - p) / a).abs())
            .sum::<f64>()
            / nonzero.len() as f64
            * 100.0
    };

    ForecastAccuracy { mae, rmse, mape }
}

/// Z-value for a two-sided interval at the given confidence level
fn z_value(confidence: f64) -> Result<f64> {
    Ok(match confidence {
        c if (c - 0.90).abs() < 0.001 => 1.645,
        c if (c - 0.95).abs() < 0.001 => 1.96,
        c if (c - 0.99).abs() < 0.001 => 2.576,
        _ => {
            let normal = Normal::new(0.0, 1.0)
                .map_err(|e| AnalyticsError::StatisticalError(e.to_string()))?;
            let alpha = 1.0 - confidence;
            normal.inverse_cdf(1.0 - alpha / 2.0)
        }
    })
}

/// Median spacing between consecutive timestamps
fn median_cadence(timestamps: &[DateTime<Utc>]) -> Option<Duration> {
    if timestamps.len() < 2 {
        return None;
    }
    let mut deltas: Vec<i64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds())
        .collect();
    deltas.sort_unstable();
    Some(Duration::seconds(deltas[deltas.len() / 2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn engine() -> ForecastingEngine {
        ForecastingEngine::new()
    }

    fn engine_with(model: ForecastModel) -> ForecastingEngine {
        ForecastingEngine::with_config(ForecastConfig {
            model,
            ..ForecastConfig::default()
        })
        .unwrap()
    }

    fn weekly_series(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 0.5 * i as f64 + [10.0, 6.0, 0.0, -6.0, -10.0, -4.0, 4.0][i % 7])
            .collect()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ForecastConfig::default();
        config.horizon = 0;
        assert!(ForecastingEngine::with_config(config).is_err());

        let mut config = ForecastConfig::default();
        config.confidence = 1.0;
        assert!(ForecastingEngine::with_config(config).is_err());
    }

    #[test]
    fn test_forecast_shape_and_bounds() {
        let values: Vec<f64> = (0..30).map(|i| 50.0 + 3.0 * i as f64 + ((i % 4) as f64)).collect();
        let result = engine().forecast(&values, None).unwrap();

        assert_eq!(result.forecast.len(), 7);
        let mut prev_width = 0.0;
        for (k, point) in result.forecast.iter().enumerate() {
            assert_eq!(point.index, 30 + k);
            assert!(point.lower <= point.value);
            assert!(point.value <= point.upper);
            let width = point.upper - point.lower;
            assert!(width >= prev_width - 1e-9, "interval width shrank at step {}", k);
            prev_width = width;
        }
    }

    #[test]
    fn test_linear_forecast_extends_trend() {
        let values: Vec<f64> = (0..20).map(|i| 10.0 + 2.0 * i as f64).collect();
        let result = engine_with(ForecastModel::Linear).forecast(&values, None).unwrap();

        assert_eq!(result.model, ForecastModel::Linear);
        // Next point continues y = 10 + 2x
        assert_relative_eq!(result.forecast[0].value, 50.0, epsilon = 1e-9);
        assert_relative_eq!(result.forecast[6].value, 62.0, epsilon = 1e-9);
        // Perfect fit -> degenerate intervals
        assert_relative_eq!(result.forecast[0].upper - result.forecast[0].lower, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_smoothing_forecast_is_flat() {
        let values = vec![10.0, 12.0, 11.0, 13.0, 12.0, 11.0, 12.0, 13.0, 11.0, 12.0];
        let result = engine_with(ForecastModel::Smoothing).forecast(&values, None).unwrap();

        let first = result.forecast[0].value;
        assert!(result.forecast.iter().all(|p| (p.value - first).abs() < 1e-12));
        assert!(first > 10.0 && first < 13.0);
    }

    #[test]
    fn test_holt_tracks_trend() {
        let values: Vec<f64> = (0..40).map(|i| 5.0 + 1.5 * i as f64).collect();
        let result = engine_with(ForecastModel::Holt).forecast(&values, None).unwrap();

        // Pure linear input: Holt should continue climbing
        assert!(result.forecast[0].value > values[39]);
        assert!(result.forecast[6].value > result.forecast[0].value);
    }

    #[test]
    fn test_holt_winters_repeats_season() {
        let values = weekly_series(70);
        let result = engine_with(ForecastModel::HoltWinters).forecast(&values, None).unwrap();

        assert_eq!(result.model, ForecastModel::HoltWinters);
        // Positions 70..76 cover one full week; the within-week shape must
        // survive into the forecast (position 70 % 7 == 0 is a peak day).
        let week: Vec<f64> = result.forecast.iter().map(|p| p.value).collect();
        let peak = week[0];
        let trough = week[4];
        assert!(peak > trough, "peak {} not above trough {}", peak, trough);
        assert!(peak - trough > 10.0);
    }

    #[test]
    fn test_seasonal_model_runs() {
        let values = weekly_series(42);
        let result = engine_with(ForecastModel::Seasonal).forecast(&values, None).unwrap();
        assert_eq!(result.model, ForecastModel::Seasonal);
        assert_eq!(result.forecast.len(), 7);
        assert!(result.forecast.iter().all(|p| p.value.is_finite()));
    }

    #[test]
    fn test_auto_picks_seasonal_for_weekly_pattern() {
        assert_eq!(select_model(&weekly_series(56), 7), ForecastModel::HoltWinters);
    }

    #[test]
    fn test_auto_picks_trend_aware_for_ramp() {
        let values: Vec<f64> = (0..30).map(|i| 10.0 + 2.0 * i as f64 + ((i % 3) as f64)).collect();
        assert_eq!(select_model(&values, 7), ForecastModel::Holt);
    }

    #[test]
    fn test_auto_picks_smoothing_for_noise() {
        let values: Vec<f64> = (0..30).map(|i| 50.0 + (((i * 37) % 11) as f64 - 5.0)).collect();
        assert_eq!(select_model(&values, 7), ForecastModel::Smoothing);
    }

    #[test]
    fn test_auto_picks_smoothing_for_near_constant() {
        let values: Vec<f64> = (0..30).map(|i| 1000.0 + ((i % 2) as f64)).collect();
        assert_eq!(select_model(&values, 7), ForecastModel::Smoothing);
    }

    #[test]
    fn test_auto_short_series_is_linear() {
        assert_eq!(select_model(&[1.0, 2.0, 3.0], 7), ForecastModel::Linear);
    }

    #[test]
    fn test_short_series_downgrades_instead_of_failing() {
        let values = vec![5.0, 6.0, 7.0, 8.0];
        let result = engine_with(ForecastModel::HoltWinters).forecast(&values, None).unwrap();

        // Not enough data for two weekly periods; Holt fits four points
        assert_eq!(result.model, ForecastModel::Holt);
        assert_eq!(result.forecast.len(), 7);
    }

    #[test]
    fn test_single_point_series() {
        let result = engine().forecast(&[42.0], None).unwrap();
        assert_eq!(result.model, ForecastModel::Linear);
        assert!(result.forecast.iter().all(|p| p.value == 42.0));
    }

    #[test]
    fn test_empty_series_yields_empty_forecast() {
        let result = engine().forecast(&[], None).unwrap();
        assert!(result.forecast.is_empty());
    }

    #[test]
    fn test_forecast_projects_timestamps() {
        let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let timestamps: Vec<_> = (0..20).map(|i| base + Duration::days(i)).collect();
        let values: Vec<f64> = (0..20).map(|i| i as f64).collect();

        let result = engine().forecast(&values, Some(&timestamps)).unwrap();
        let first = result.forecast[0].timestamp.unwrap();
        assert_eq!(first, base + Duration::days(20));
        let last = result.forecast[6].timestamp.unwrap();
        assert_eq!(last, base + Duration::days(26));
    }

    #[test]
    fn test_cross_validate_ranks_models() {
        let values = weekly_series(70);
        let report = engine().cross_validate(&values).unwrap();

        assert!(report.holdout_len >= 3);
        assert!(!report.results.is_empty());
        let best = report.best_model.unwrap();
        let best_rmse = report
            .results
            .iter()
            .find(|r| r.model == best)
            .unwrap()
            .accuracy
            .rmse;
        for r in &report.results {
            assert!(best_rmse <= r.accuracy.rmse + 1e-9);
        }
        // The strongly seasonal series should favor a seasonal model
        assert!(matches!(best, ForecastModel::HoltWinters | ForecastModel::Seasonal));
    }

    #[test]
    fn test_cross_validate_short_series_is_empty() {
        let report = engine().cross_validate(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(report.holdout_len, 0);
        assert!(report.results.is_empty());
        assert!(report.best_model.is_none());
    }

    #[test]
    fn test_accuracy_attached_for_long_series() {
        let values: Vec<f64> = (0..40).map(|i| 10.0 + i as f64).collect();
        let result = engine_with(ForecastModel::Linear).forecast(&values, None).unwrap();

        let accuracy = result.accuracy.unwrap();
        assert!(accuracy.mae < 1e-6);
        assert!(accuracy.rmse < 1e-6);
    }

    #[test]
    fn test_accuracy_mape_skips_zero_actuals() {
        let accuracy = accuracy_against(&[0.0, 10.0, 20.0], &[1.0, 11.0, 19.0]);
        assert_relative_eq!(accuracy.mae, 1.0, epsilon = 1e-12);
        // MAPE over the two nonzero actuals: (10% + 5%) / 2
        assert_relative_eq!(accuracy.mape, 7.5, epsilon = 1e-9);
    }

    #[test]
    fn test_z_value_known_levels() {
        assert_relative_eq!(z_value(0.95).unwrap(), 1.96, epsilon = 1e-9);
        assert_relative_eq!(z_value(0.99).unwrap(), 2.576, epsilon = 1e-9);
        // Uncommon level goes through the inverse CDF
        let z80 = z_value(0.80).unwrap();
        assert!(z80 > 1.27 && z80 < 1.29);
    }

    #[test]
    fn test_constant_series_zero_width_intervals() {
        let values = vec![7.0; 30];
        let result = engine().forecast(&values, None).unwrap();
        for point in &result.forecast {
            assert_relative_eq!(point.value, 7.0, epsilon = 1e-9);
            assert_relative_eq!(point.upper - point.lower, 0.0, epsilon = 1e-9);
        }
    }
}
