//! Anomaly detection
//!
//! Multi-method anomaly detection over value series: z-score, IQR, MAD, an
//! isolation forest, and majority-vote ensembling. Supports seasonal
//! adjustment before detection and multi-metric engagement scans with a
//! cross-metric correlation pass.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use forum_pulse_types::{
    Anomaly, AnomalyContext, AnomalyDetectionResult, AnomalySeverity, AnomalyType,
    DetectionMethod, DetectionStatistics, EngagementAnomalyReport, EngagementMetric,
    EngagementMetrics, TimeSeriesPoint,
};

use crate::errors::{AnalyticsError, Result};
use crate::stats;
use crate::trend::TrendAnalyzer;

/// Correlation divergence above which a metric pair is flagged
const CROSS_METRIC_DIVERGENCE: f64 = 0.5;

/// Euler-Mascheroni constant, used in the isolation-forest path normalizer
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Configuration for anomaly detection
#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    /// Detection sensitivity in [0, 1]; higher flags more points (default 0.5)
    pub sensitivity: f64,
    /// Methods to run (default z-score and IQR)
    pub methods: Vec<DetectionMethod>,
    /// Window used for local context and cross-metric correlation (default 10)
    pub context_window: usize,
    /// Minimum points before detection runs (default 5)
    pub min_data_points: usize,
    /// Scale thresholds by sensitivity; disabled, the classic fixed
    /// thresholds (3.0 / 1.5 / 3.5) apply (default true)
    pub adaptive_threshold: bool,
    /// Period used when removing seasonality (default 7)
    pub seasonal_period: usize,
    /// Trees in the isolation forest (default 100)
    pub num_trees: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.5,
            methods: vec![DetectionMethod::ZScore, DetectionMethod::Iqr],
            context_window: 10,
            min_data_points: 5,
            adaptive_threshold: true,
            seasonal_period: 7,
            num_trees: 100,
        }
    }
}

/// Multi-method anomaly detector
pub struct AnomalyDetector {
    config: AnomalyConfig,
    /// Fixed RNG seed for reproducible forests; entropy-seeded when unset
    seed: Option<u64>,
}

impl AnomalyDetector {
    /// Create a detector with the default configuration
    pub fn new() -> Self {
        Self {
            config: AnomalyConfig::default(),
            seed: None,
        }
    }

    /// Create a detector with a custom configuration, validated up front
    pub fn with_config(config: AnomalyConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.sensitivity) {
            return Err(AnalyticsError::InvalidConfig(
                "Sensitivity must be in [0, 1]".to_string(),
            ));
        }
        if config.methods.is_empty() {
            return Err(AnalyticsError::InvalidConfig(
                "At least one detection method is required".to_string(),
            ));
        }
        if config.context_window < 2 {
            return Err(AnalyticsError::InvalidConfig(
                "Context window must be at least 2".to_string(),
            ));
        }
        if config.min_data_points < 4 {
            return Err(AnalyticsError::InvalidConfig(
                "Minimum data points must be at least 4".to_string(),
            ));
        }
        if config.seasonal_period < 2 {
            return Err(AnalyticsError::InvalidConfig(
                "Seasonal period must be at least 2".to_string(),
            ));
        }
        if config.num_trees == 0 {
            return Err(AnalyticsError::InvalidConfig(
                "Isolation forest needs at least one tree".to_string(),
            ));
        }
        Ok(Self { config, seed: None })
    }

    /// Fix the RNG seed so isolation-forest scores are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Run the configured methods over a bare value series
    pub fn detect(&self, values: &[f64]) -> Result<AnomalyDetectionResult> {
        self.detect_inner(values, None, None)
    }

    /// Like [`detect`](Self::detect), aborting with
    /// [`AnalyticsError::DeadlineExceeded`] once `deadline` passes
    ///
    /// The deadline is checked between isolation-forest trees, the one
    /// operation whose cost scales unpredictably with configuration.
    pub fn detect_with_deadline(
        &self,
        values: &[f64],
        deadline: Instant,
    ) -> Result<AnomalyDetectionResult> {
        self.detect_inner(values, None, Some(deadline))
    }

    /// Detect over a timestamped series, removing seasonality first when at
    /// least two full periods are available
    pub fn detect_time_series(&self, points: &[TimeSeriesPoint]) -> Result<AnomalyDetectionResult> {
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let timestamps: Vec<DateTime<Utc>> = points.iter().map(|p| p.timestamp).collect();
        let values = stats::sanitize(&values);

        let period = self.config.seasonal_period;
        if values.len() >= 2 * period {
            let decomposition = TrendAnalyzer::new().seasonal_decomposition(&values, period)?;
            let adjusted: Vec<f64> = values
                .iter()
                .enumerate()
                .map(|(i, v)| v - decomposition.seasonal_at(i))
                .collect();

            let mut result = self.detect_inner(&adjusted, Some(&timestamps), None)?;
            // Anomalies point back into the caller's series; report the
            // observed value, not the seasonally adjusted one.
            for anomaly in &mut result.anomalies {
                anomaly.value = values[anomaly.index];
            }
            Ok(result)
        } else {
            self.detect_inner(&values, Some(&timestamps), None)
        }
    }

    /// Per-metric detection across engagement fields plus a cross-metric
    /// correlation-divergence pass
    pub fn detect_engagement_anomalies(
        &self,
        metrics: &[EngagementMetrics],
    ) -> Result<EngagementAnomalyReport> {
        let timestamps: Vec<DateTime<Utc>> = metrics.iter().map(|m| m.timestamp).collect();

        let mut per_metric = HashMap::new();
        let mut series: HashMap<EngagementMetric, Vec<f64>> = HashMap::new();

        for metric in EngagementMetric::ALL {
            let values: Vec<f64> =
                stats::sanitize(&metrics.iter().map(|m| m.metric(metric)).collect::<Vec<_>>());

            let mut result = self.detect_inner(&values, Some(&timestamps), None)?;
            for anomaly in &mut result.anomalies {
                anomaly.metric = Some(metric.as_str().to_string());
            }
            per_metric.insert(metric.as_str().to_string(), result);
            series.insert(metric, values);
        }

        let cross_metric = self.cross_metric_scan(&series, &timestamps);

        Ok(EngagementAnomalyReport {
            per_metric,
            cross_metric,
        })
    }

    /// Compare baseline and windowed correlation for each metric pair and
    /// flag windows where the relationship diverges
    fn cross_metric_scan(
        &self,
        series: &HashMap<EngagementMetric, Vec<f64>>,
        timestamps: &[DateTime<Utc>],
    ) -> Vec<Anomaly> {
        let window = self.config.context_window;
        let n = timestamps.len();
        let mut anomalies = Vec::new();

        if n < window + 1 {
            return anomalies;
        }

        for (a_pos, a) in EngagementMetric::ALL.iter().enumerate() {
            for b in &EngagementMetric::ALL[a_pos + 1..] {
                let xa = &series[a];
                let xb = &series[b];
                let baseline = stats::correlation(xa, xb);

                let mut in_divergence = false;
                for end in window..=n {
                    let windowed = stats::correlation(&xa[end - window..end], &xb[end - window..end]);
                    let divergence = (baseline - windowed).abs();

                    if divergence > CROSS_METRIC_DIVERGENCE {
                        // Report the onset of each divergent stretch once
                        if !in_divergence {
                            let index = end - 1;
                            anomalies.push(Anomaly {
                                index,
                                value: windowed,
                                timestamp: Some(timestamps[index]),
                                anomaly_type: AnomalyType::UnusualPattern,
                                severity: classify_severity(divergence, CROSS_METRIC_DIVERGENCE),
                                score: divergence,
                                method: DetectionMethod::Ensemble,
                                metric: Some(format!("{}~{}", a.as_str(), b.as_str())),
                                context: Some(AnomalyContext {
                                    expected: baseline,
                                    deviation: windowed - baseline,
                                    percentile: 0.0,
                                }),
                            });
                        }
                        in_divergence = true;
                    } else {
                        in_divergence = false;
                    }
                }
            }
        }

        anomalies.sort_by_key(|a| a.index);
        anomalies
    }

    fn detect_inner(
        &self,
        values: &[f64],
        timestamps: Option<&[DateTime<Utc>]>,
        deadline: Option<Instant>,
    ) -> Result<AnomalyDetectionResult> {
        let values = stats::sanitize(values);
        let n = values.len();
        debug!(points = n, methods = self.config.methods.len(), "running anomaly detection");

        if n < self.config.min_data_points {
            return Ok(AnomalyDetectionResult::insufficient_data(
                n,
                self.config.methods.clone(),
            ));
        }

        let mut anomalies: Vec<Anomaly> = Vec::new();
        let mut thresholds = HashMap::new();
        let mut flagged_indices: HashSet<usize> = HashSet::new();

        for method in &self.config.methods {
            let (flags, threshold) = self.run_method(*method, &values, deadline)?;
            thresholds.insert(method.as_str().to_string(), threshold);

            for flag in flags {
                flagged_indices.insert(flag.index);
                anomalies.push(Anomaly {
                    index: flag.index,
                    value: values[flag.index],
                    timestamp: timestamps.and_then(|ts| ts.get(flag.index).copied()),
                    anomaly_type: classify_type(&values, flag.index),
                    severity: classify_severity(flag.score, threshold),
                    score: flag.score,
                    method: *method,
                    metric: None,
                    context: Some(local_context(
                        &values,
                        flag.index,
                        self.config.context_window,
                    )),
                });
            }
        }

        anomalies.sort_by_key(|a| a.index);

        let anomaly_rate = flagged_indices.len() as f64 / n as f64;
        let confidence = detection_confidence(anomaly_rate, &anomalies);

        Ok(AnomalyDetectionResult {
            anomalies,
            statistics: DetectionStatistics {
                total_points: n,
                anomaly_rate,
                methods: self.config.methods.clone(),
                thresholds,
            },
            confidence,
        })
    }

    fn run_method(
        &self,
        method: DetectionMethod,
        values: &[f64],
        deadline: Option<Instant>,
    ) -> Result<(Vec<RawFlag>, f64)> {
        match method {
            DetectionMethod::ZScore => {
                let threshold = self.zscore_threshold();
                Ok((zscore_flags(values, threshold), threshold))
            }
            DetectionMethod::Iqr => {
                let multiplier = self.iqr_multiplier();
                Ok((iqr_flags(values, multiplier), multiplier))
            }
            DetectionMethod::Mad => {
                let threshold = self.mad_threshold();
                Ok((mad_flags(values, threshold), threshold))
            }
            DetectionMethod::IsolationForest => {
                let threshold = self.forest_threshold();
                let forest = IsolationForest::new(
                    self.config.num_trees,
                    values.len().min(IsolationForest::DEFAULT_SAMPLE_SIZE),
                );
                let mut rng = match self.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                let scores = forest.score_all(values, &mut rng, deadline)?;
                let flags = scores
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| **s > threshold)
                    .map(|(index, s)| RawFlag { index, score: *s })
                    .collect();
                Ok((flags, threshold))
            }
            DetectionMethod::Ensemble => {
                let flags = self.ensemble_flags(values);
                Ok((flags, ENSEMBLE_THRESHOLD))
            }
        }
    }

    /// Majority vote over z-score, IQR and MAD
    fn ensemble_flags(&self, values: &[f64]) -> Vec<RawFlag> {
        let members = [
            zscore_flags(values, self.zscore_threshold()),
            iqr_flags(values, self.iqr_multiplier()),
            mad_flags(values, self.mad_threshold()),
        ];
        let method_count = members.len();
        let needed = method_count / 2 + 1;

        let mut votes: HashMap<usize, usize> = HashMap::new();
        for flags in &members {
            for flag in flags {
                *votes.entry(flag.index).or_insert(0) += 1;
            }
        }

        let mut flags: Vec<RawFlag> = votes
            .into_iter()
            .filter(|(_, v)| *v >= needed)
            .map(|(index, v)| RawFlag {
                index,
                score: v as f64 / method_count as f64,
            })
            .collect();
        flags.sort_by_key(|f| f.index);
        flags
    }

    fn zscore_threshold(&self) -> f64 {
        if self.config.adaptive_threshold {
            3.0 - self.config.sensitivity * 1.5
        } else {
            3.0
        }
    }

    fn iqr_multiplier(&self) -> f64 {
        if self.config.adaptive_threshold {
            2.5 - self.config.sensitivity
        } else {
            1.5
        }
    }

    fn mad_threshold(&self) -> f64 {
        if self.config.adaptive_threshold {
            3.5 - self.config.sensitivity * 1.5
        } else {
            3.5
        }
    }

    fn forest_threshold(&self) -> f64 {
        0.5 + 0.2 * (1.0 - self.config.sensitivity)
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Ensemble scores are vote fractions; half the vote is the flag boundary
const ENSEMBLE_THRESHOLD: f64 = 0.5;

/// Index flagged by a single method, before classification
struct RawFlag {
    index: usize,
    score: f64,
}

fn zscore_flags(values: &[f64], threshold: f64) -> Vec<RawFlag> {
    let mean = stats::mean(values);
    let sd = stats::std_dev(values);
    if sd < f64::EPSILON {
        return Vec::new();
    }

    values
        .iter()
        .enumerate()
        .filter_map(|(index, v)| {
            let z = ((v - mean) / sd).abs();
            (z > threshold).then_some(RawFlag { index, score: z })
        })
        .collect()
}

fn iqr_flags(values: &[f64], multiplier: f64) -> Vec<RawFlag> {
    let q = stats::quartiles(values);
    let iqr = q.iqr();
    if iqr < f64::EPSILON {
        return Vec::new();
    }

    let lower = q.q1 - multiplier * iqr;
    let upper = q.q3 + multiplier * iqr;

    values
        .iter()
        .enumerate()
        .filter_map(|(index, v)| {
            if *v < lower || *v > upper {
                let distance = if *v < lower { lower - v } else { v - upper };
                Some(RawFlag {
                    index,
                    score: multiplier + distance / iqr,
                })
            } else {
                None
            }
        })
        .collect()
}

fn mad_flags(values: &[f64], threshold: f64) -> Vec<RawFlag> {
    let median = stats::median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
    let mad = stats::median(&deviations);
    if mad < f64::EPSILON {
        return Vec::new();
    }

    values
        .iter()
        .enumerate()
        .filter_map(|(index, v)| {
            // Modified z-score
            let score = 0.6745 * (v - median).abs() / mad;
            (score > threshold).then_some(RawFlag { index, score })
        })
        .collect()
}

/// Compare a flagged point to its immediate neighbors
fn classify_type(values: &[f64], index: usize) -> AnomalyType {
    let n = values.len();
    if index == 0 || index + 1 >= n {
        return AnomalyType::Outlier;
    }

    let before = values[index] - values[index - 1];
    let after = values[index + 1] - values[index];

    if before > 0.0 && after < 0.0 {
        AnomalyType::Spike
    } else if before < 0.0 && after > 0.0 {
        AnomalyType::Dip
    } else if before.signum() != after.signum() {
        AnomalyType::TrendBreak
    } else {
        AnomalyType::Outlier
    }
}

/// Bucket severity by how far the score exceeds the method threshold
fn classify_severity(score: f64, threshold: f64) -> AnomalySeverity {
    let ratio = score / threshold.max(f64::EPSILON);
    if ratio < 1.5 {
        AnomalySeverity::Low
    } else if ratio < 2.5 {
        AnomalySeverity::Medium
    } else if ratio < 4.0 {
        AnomalySeverity::High
    } else {
        AnomalySeverity::Critical
    }
}

/// Expected value, deviation and percentile rank around one index
fn local_context(values: &[f64], index: usize, window: usize) -> AnomalyContext {
    let n = values.len();
    let lo = index.saturating_sub(window);
    let hi = (index + window + 1).min(n);

    let neighborhood: Vec<f64> = values[lo..hi]
        .iter()
        .enumerate()
        .filter(|(i, _)| lo + i != index)
        .map(|(_, v)| *v)
        .collect();
    let expected = stats::mean(&neighborhood);

    let value = values[index];
    let less = values.iter().filter(|v| **v < value).count() as f64;
    let equal = values.iter().filter(|v| **v == value).count() as f64;
    let percentile = (less + 0.5 * equal) / n as f64 * 100.0;

    AnomalyContext {
        expected,
        deviation: value - expected,
        percentile,
    }
}

/// Rate term and severity-consistency term, averaged
fn detection_confidence(anomaly_rate: f64, anomalies: &[Anomaly]) -> f64 {
    let rate_term = (1.0 - anomaly_rate * 10.0).max(0.0);

    let consistency = if anomalies.is_empty() {
        1.0
    } else {
        let ranks: Vec<f64> = anomalies.iter().map(|a| a.severity.rank()).collect();
        (1.0 - 2.0 * stats::std_dev(&ranks)).max(0.0)
    };

    ((rate_term + consistency) / 2.0).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Isolation forest
// ---------------------------------------------------------------------------

/// Isolation forest over a one-dimensional series
///
/// Trees are flat arrays of nodes addressed by index rather than boxed
/// recursive structures, so building a forest is a handful of contiguous
/// allocations.
pub struct IsolationForest {
    num_trees: usize,
    sample_size: usize,
    max_depth: usize,
}

/// Sentinel child index marking a leaf
const NO_CHILD: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct ForestNode {
    split: f64,
    left: u32,
    right: u32,
    /// Points that reached this node during building (used at leaves)
    size: u32,
}

struct ForestTree {
    nodes: Vec<ForestNode>,
}

impl IsolationForest {
    /// Standard subsample size from the isolation-forest paper
    pub const DEFAULT_SAMPLE_SIZE: usize = 256;

    /// Create a forest; `sample_size` is clamped to at least 2
    pub fn new(num_trees: usize, sample_size: usize) -> Self {
        let sample_size = sample_size.max(2);
        Self {
            num_trees,
            sample_size,
            max_depth: (sample_size as f64).log2().ceil() as usize,
        }
    }

    /// Score every point in [0, 1]; higher means easier to isolate
    ///
    /// Checks `deadline` between trees and aborts with
    /// [`AnalyticsError::DeadlineExceeded`] when it passes.
    pub fn score_all(
        &self,
        values: &[f64],
        rng: &mut StdRng,
        deadline: Option<Instant>,
    ) -> Result<Vec<f64>> {
        let n = values.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut path_sums = vec![0.0; n];
        for tree_index in 0..self.num_trees {
            if let Some(deadline) = deadline {
                if Instant::now() > deadline {
                    return Err(AnalyticsError::DeadlineExceeded(format!(
                        "isolation forest aborted after {} of {} trees",
                        tree_index, self.num_trees
                    )));
                }
            }

            let tree = self.build_tree(values, rng);
            for (value, sum) in values.iter().zip(path_sums.iter_mut()) {
                *sum += tree.path_length(*value, self.max_depth);
            }
        }

        let normalizer = average_path_length(self.sample_size);
        Ok(path_sums
            .iter()
            .map(|sum| {
                let avg = sum / self.num_trees as f64;
                2.0_f64.powf(-avg / normalizer)
            })
            .collect())
    }

    /// Build one tree over a bootstrap sample
    fn build_tree(&self, values: &[f64], rng: &mut StdRng) -> ForestTree {
        let mut sample: Vec<f64> = (0..self.sample_size)
            .map(|_| values[rng.gen_range(0..values.len())])
            .collect();
        sample.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut nodes = Vec::with_capacity(2 * self.sample_size);
        build_node(&mut nodes, &sample, 0, self.max_depth, rng);
        ForestTree { nodes }
    }
}

/// Recursively split a sorted partition at a uniform random value, appending
/// nodes to the arena and returning the new node's index
fn build_node(
    nodes: &mut Vec<ForestNode>,
    partition: &[f64],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> u32 {
    let index = nodes.len() as u32;
    let min = partition.first().copied().unwrap_or(0.0);
    let max = partition.last().copied().unwrap_or(0.0);

    if depth >= max_depth || partition.len() <= 1 || (max - min) < f64::EPSILON {
        nodes.push(ForestNode {
            split: 0.0,
            left: NO_CHILD,
            right: NO_CHILD,
            size: partition.len() as u32,
        });
        return index;
    }

    let split = rng.gen_range(min..max);
    let split_at = partition.partition_point(|v| *v < split);
    if split_at == 0 || split_at == partition.len() {
        // Random split landed on the partition edge; treat as isolated
        nodes.push(ForestNode {
            split: 0.0,
            left: NO_CHILD,
            right: NO_CHILD,
            size: partition.len() as u32,
        });
        return index;
    }

    nodes.push(ForestNode {
        split,
        left: NO_CHILD,
        right: NO_CHILD,
        size: partition.len() as u32,
    });
    let left = build_node(nodes, &partition[..split_at], depth + 1, max_depth, rng);
    let right = build_node(nodes, &partition[split_at..], depth + 1, max_depth, rng);
    nodes[index as usize].left = left;
    nodes[index as usize].right = right;
    index
}

impl ForestTree {
    /// Path length for a value: traversal depth plus the expected remaining
    /// depth for the leaf's partition size
    fn path_length(&self, value: f64, max_depth: usize) -> f64 {
        let mut index = 0usize;
        let mut depth = 0usize;

        loop {
            let node = self.nodes[index];
            if node.left == NO_CHILD || depth >= max_depth {
                return depth as f64 + average_path_length(node.size as usize);
            }
            index = if value < node.split {
                node.left as usize
            } else {
                node.right as usize
            };
            depth += 1;
        }
    }
}

/// Expected path length of an unsuccessful search in a binary search tree of
/// `n` points: `c(n) = 2(ln(n-1) + gamma) - 2(n-1)/n`
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
