//! Descriptive-statistics result types

use serde::{Deserialize, Serialize};

/// Quartile boundaries of a distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    /// 25th percentile
    pub q1: f64,
    /// 50th percentile (median)
    pub q2: f64,
    /// 75th percentile
    pub q3: f64,
}

impl Quartiles {
    /// Interquartile range (Q3 - Q1)
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Full descriptive summary of a value series
///
/// Recomputed fresh on every call; all fields are zero for empty input,
/// never NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Number of observations
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Median (average of middle pair for even counts)
    pub median: f64,
    /// Population standard deviation
    pub standard_deviation: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Quartile boundaries
    pub quartiles: Quartiles,
    /// Third standardized moment
    pub skewness: f64,
    /// Excess kurtosis (normal distribution -> 0)
    pub kurtosis: f64,
}

impl SummaryStatistics {
    /// Neutral summary for an empty series
    pub fn empty() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            median: 0.0,
            standard_deviation: 0.0,
            min: 0.0,
            max: 0.0,
            quartiles: Quartiles {
                q1: 0.0,
                q2: 0.0,
                q3: 0.0,
            },
            skewness: 0.0,
            kurtosis: 0.0,
        }
    }
}

/// Ordinary-least-squares fit of y against x
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionFit {
    /// Slope of the fitted line
    pub slope: f64,
    /// Y-intercept of the fitted line
    pub intercept: f64,
    /// Coefficient of determination, in [0, 1]
    pub r_squared: f64,
}

impl RegressionFit {
    /// Fitted value at x
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Degenerate fit used when x has zero variance or too few points
    pub fn flat(intercept: f64) -> Self {
        Self {
            slope: 0.0,
            intercept,
            r_squared: 0.0,
        }
    }
}
