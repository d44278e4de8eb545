//! Forecasting result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Forecast model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastModel {
    /// Pick a model from series characteristics
    Auto,
    /// Ordinary-least-squares extrapolation
    Linear,
    /// Decomposition-based trend plus repeating seasonal component
    Seasonal,
    /// Simple exponential smoothing (level only)
    Smoothing,
    /// Holt double exponential smoothing (level and trend)
    Holt,
    /// Holt-Winters additive triple exponential smoothing
    HoltWinters,
}

impl ForecastModel {
    /// Stable string name used in reports and cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastModel::Auto => "auto",
            ForecastModel::Linear => "linear",
            ForecastModel::Seasonal => "seasonal",
            ForecastModel::Smoothing => "smoothing",
            ForecastModel::Holt => "holt",
            ForecastModel::HoltWinters => "holt_winters",
        }
    }
}

/// One forecasted point with its prediction interval
///
/// Bounds satisfy `lower <= value <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Position past the end of the input series (input length + offset)
    pub index: usize,
    /// Projected timestamp, when the input carried timestamps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Point forecast
    pub value: f64,
    /// Lower interval bound
    pub lower: f64,
    /// Upper interval bound
    pub upper: f64,
}

/// Forecast error measures against held-out actuals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute percentage error (zero actuals skipped)
    pub mape: f64,
}

/// Result of a forecast run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Concrete model that produced the forecast (never `Auto`)
    pub model: ForecastModel,
    /// Forecasted points, one per horizon step
    pub forecast: Vec<ForecastPoint>,
    /// Cross-validated accuracy, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<ForecastAccuracy>,
}

/// Accuracy of one candidate model during cross-validation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelAccuracy {
    /// Candidate model
    pub model: ForecastModel,
    /// Error measures on the held-out tail
    pub accuracy: ForecastAccuracy,
}

/// Per-model accuracy report from a cross-validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationReport {
    /// Points held out for evaluation
    pub holdout_len: usize,
    /// One entry per candidate model that could fit the training head
    pub results: Vec<ModelAccuracy>,
    /// Candidate with the lowest RMSE, when any candidate fit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_model: Option<ForecastModel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_serializes_snake_case() {
        let json = serde_json::to_string(&ForecastModel::HoltWinters).unwrap();
        assert_eq!(json, "\"holt_winters\"");
    }

    #[test]
    fn test_model_names_round_trip() {
        for model in [
            ForecastModel::Auto,
            ForecastModel::Linear,
            ForecastModel::Seasonal,
            ForecastModel::Smoothing,
            ForecastModel::Holt,
            ForecastModel::HoltWinters,
        ] {
            let json = format!("\"{}\"", model.as_str());
            let parsed: ForecastModel = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, model);
        }
    }
}
