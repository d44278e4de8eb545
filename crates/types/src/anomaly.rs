//! Anomaly-detection result types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shape of a flagged point relative to its neighbors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    /// Local maximum followed by a drop
    Spike,
    /// Local minimum followed by a rise
    Dip,
    /// Slope changes sign at the point
    TrendBreak,
    /// Cross-metric correlation divergence
    UnusualPattern,
    /// Out of distribution without a clearer local shape
    Outlier,
}

/// Severity bucket derived from the score-to-threshold ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AnomalySeverity {
    /// Numeric rank used when aggregating severities
    pub fn rank(&self) -> f64 {
        match self {
            AnomalySeverity::Low => 0.25,
            AnomalySeverity::Medium => 0.5,
            AnomalySeverity::High => 0.75,
            AnomalySeverity::Critical => 1.0,
        }
    }
}

/// Detection method that flagged an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    #[serde(rename = "zscore")]
    ZScore,
    Iqr,
    Mad,
    IsolationForest,
    Ensemble,
}

impl DetectionMethod {
    /// Stable string name used in reports and threshold maps
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::ZScore => "zscore",
            DetectionMethod::Iqr => "iqr",
            DetectionMethod::Mad => "mad",
            DetectionMethod::IsolationForest => "isolation_forest",
            DetectionMethod::Ensemble => "ensemble",
        }
    }
}

/// Local context around a flagged point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyContext {
    /// Expected value from the surrounding window
    pub expected: f64,
    /// Observed minus expected
    pub deviation: f64,
    /// Percentile rank of the value within the full series, in [0, 100]
    pub percentile: f64,
}

/// One flagged point
///
/// `index` refers into the input array the detection ran on; it is the join
/// key back to source data, not an independent identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Position in the analyzed series
    pub index: usize,
    /// Observed value at that position
    pub value: f64,
    /// Timestamp, when the caller supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Shape classification
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    /// Severity bucket
    pub severity: AnomalySeverity,
    /// Raw method score (method-specific scale)
    pub score: f64,
    /// Method that flagged the point
    pub method: DetectionMethod,
    /// Metric (or metric pair) the anomaly belongs to, for multi-metric scans
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    /// Local context, when computable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<AnomalyContext>,
}

/// Aggregate statistics of one detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionStatistics {
    /// Points analyzed
    pub total_points: usize,
    /// Fraction of distinct indices flagged, in [0, 1]
    pub anomaly_rate: f64,
    /// Methods that ran
    pub methods: Vec<DetectionMethod>,
    /// Effective threshold per method name
    pub thresholds: HashMap<String, f64>,
}

/// Result of an anomaly detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDetectionResult {
    /// Flagged points, ascending by index
    pub anomalies: Vec<Anomaly>,
    /// Run statistics
    pub statistics: DetectionStatistics,
    /// Overall confidence in the run, in [0, 1]
    pub confidence: f64,
}

impl AnomalyDetectionResult {
    /// Neutral result for series shorter than the configured minimum
    pub fn insufficient_data(total_points: usize, methods: Vec<DetectionMethod>) -> Self {
        Self {
            anomalies: Vec::new(),
            statistics: DetectionStatistics {
                total_points,
                anomaly_rate: 0.0,
                methods,
                thresholds: HashMap::new(),
            },
            confidence: 0.0,
        }
    }
}

/// Combined per-metric and cross-metric engagement scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementAnomalyReport {
    /// Detection result per metric name
    pub per_metric: HashMap<String, AnomalyDetectionResult>,
    /// Correlation-divergence anomalies across metric pairs
    pub cross_metric: Vec<Anomaly>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(AnomalySeverity::Low < AnomalySeverity::Critical);
        assert!(AnomalySeverity::Medium.rank() < AnomalySeverity::High.rank());
    }

    #[test]
    fn test_anomaly_type_field_renamed() {
        let anomaly = Anomaly {
            index: 3,
            value: 42.0,
            timestamp: None,
            anomaly_type: AnomalyType::Spike,
            severity: AnomalySeverity::High,
            score: 4.2,
            method: DetectionMethod::ZScore,
            metric: None,
            context: None,
        };

        let json = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(json["type"], "spike");
        assert_eq!(json["method"], "zscore");
    }
}
