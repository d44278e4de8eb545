//! Trend-analysis result types

use serde::{Deserialize, Serialize};

/// Trend direction classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    /// Stable string name used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        }
    }
}

/// Method that produced a [`TrendResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMethod {
    LinearRegression,
    MannKendall,
}

/// Result of a trend analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    /// Method used
    pub method: TrendMethod,
    /// Direction classification
    pub trend: TrendDirection,
    /// Fitted slope (regression methods only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slope: Option<f64>,
    /// Fit quality (regression methods only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_squared: Option<f64>,
    /// Test statistic (Mann-Kendall S)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistic: Option<f64>,
    /// Two-sided p-value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
    /// Confidence in the classification, in [0, 1]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Whether the trend passed the caller-supplied significance threshold
    pub significant: bool,
    /// Indices where the series changes regime, ascending
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakpoints: Vec<usize>,
}

impl TrendResult {
    /// Neutral result for series shorter than the method minimum
    pub fn insufficient_data(method: TrendMethod) -> Self {
        Self {
            method,
            trend: TrendDirection::Stable,
            slope: None,
            r_squared: None,
            statistic: None,
            p_value: None,
            confidence: Some(0.0),
            significant: false,
            breakpoints: Vec::new(),
        }
    }
}

/// Additive decomposition of a series into trend, seasonal and residual parts
///
/// `trend` and `residual` have the input length; `seasonal` holds one value
/// per seasonal position and is centered so it sums to ~0 over a period.
/// `trend[i] + seasonal[i % period] + residual[i]` reconstructs the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalDecomposition {
    /// Smoothed trend component, one value per input point
    pub trend: Vec<f64>,
    /// Centered seasonal component, one value per seasonal position
    pub seasonal: Vec<f64>,
    /// Remainder after removing trend and seasonality
    pub residual: Vec<f64>,
    /// Period the decomposition was computed for
    pub period: usize,
}

impl SeasonalDecomposition {
    /// Seasonal component for input index `i`
    pub fn seasonal_at(&self, i: usize) -> f64 {
        if self.seasonal.is_empty() {
            0.0
        } else {
            self.seasonal[i % self.seasonal.len()]
        }
    }

    /// Reconstructed value at input index `i`
    pub fn reconstruct(&self, i: usize) -> f64 {
        self.trend[i] + self.seasonal_at(i) + self.residual[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_serializes_snake_case() {
        let json = serde_json::to_string(&TrendDirection::Increasing).unwrap();
        assert_eq!(json, "\"increasing\"");
    }

    #[test]
    fn test_insufficient_data_is_neutral() {
        let result = TrendResult::insufficient_data(TrendMethod::MannKendall);
        assert_eq!(result.trend, TrendDirection::Stable);
        assert!(!result.significant);
        assert_eq!(result.confidence, Some(0.0));
    }
}
