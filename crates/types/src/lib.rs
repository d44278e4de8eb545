//! Core types and data models for Forum Pulse
//!
//! This crate provides the data structures shared between the analytics
//! kernel and its consumers (CLI formatters, report generators, dashboards).
//! Everything here is plain data: serde-serializable, no behavior beyond
//! small constructors and accessors.

pub mod anomaly;
pub mod forecast;
pub mod series;
pub mod statistics;
pub mod trend;

pub use anomaly::{
    Anomaly, AnomalyContext, AnomalyDetectionResult, AnomalySeverity, AnomalyType,
    DetectionMethod, DetectionStatistics, EngagementAnomalyReport,
};
pub use forecast::{
    CrossValidationReport, ForecastAccuracy, ForecastModel, ForecastPoint, ForecastResult,
    ModelAccuracy,
};
pub use series::{EngagementMetric, EngagementMetrics, TimeSeriesPoint};
pub use statistics::{Quartiles, RegressionFit, SummaryStatistics};
pub use trend::{SeasonalDecomposition, TrendDirection, TrendMethod, TrendResult};
