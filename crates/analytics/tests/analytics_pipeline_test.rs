//! Integration tests for the analytics pipeline
//!
//! End-to-end scenarios over realistic engagement series: statistics, trend
//! analysis, anomaly detection, forecasting and result caching working
//! together the way the report layer drives them.

use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, TimeZone, Utc};

use forum_pulse_analytics::{
    stats, AnalyticsCache, AnalyticsError, AnomalyConfig, AnomalyDetector, CacheKey,
    ForecastingEngine, TrendAnalyzer, TrendConfig,
};
use forum_pulse_types::{
    DetectionMethod, EngagementMetrics, ForecastModel, ForecastResult, TimeSeriesPoint,
    TrendDirection,
};

const WEEKLY: [f64; 7] = [20.0, 12.0, 0.0, -12.0, -20.0, -8.0, 8.0];

/// Eight weeks of daily post counts: upward trend, weekly rhythm and one
/// viral day at index 40
fn growing_forum_posts() -> Vec<TimeSeriesPoint> {
    let start = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
    (0..56)
        .map(|i| {
            let mut value = 200.0 + 1.5 * i as f64 + WEEKLY[i % 7];
            if i == 40 {
                value += 100.0;
            }
            TimeSeriesPoint::new(start + Duration::days(i as i64), value)
        })
        .collect()
}

#[test]
fn test_growing_forum_full_pipeline() {
    let points = growing_forum_posts();
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let timestamps: Vec<_> = points.iter().map(|p| p.timestamp).collect();

    // Descriptive statistics
    let summary = stats::summary(&values);
    assert_eq!(summary.count, 56);
    assert!(summary.mean > 200.0 && summary.mean < 300.0);
    assert!(summary.min >= 180.0);
    assert!(summary.max >= 340.0); // the viral day
    assert!(summary.quartiles.q1 < summary.median);
    assert!(summary.median < summary.quartiles.q3);

    // Linear trend with a tightened stability band: 0.6% growth per day
    // matters for an engagement report even though the weekly rhythm and
    // the spike keep R-squared well below the significance bar
    let analyzer = TrendAnalyzer::with_config(TrendConfig {
        stable_slope_ratio: 0.002,
        ..TrendConfig::default()
    })
    .unwrap();
    let trend = analyzer.analyze_trend(&values, Some(&timestamps));
    assert_eq!(trend.trend, TrendDirection::Increasing);
    assert!(trend.slope.unwrap() > 0.0);

    // Mann-Kendall sees through the seasonality
    let mk = analyzer.mann_kendall(&values).unwrap();
    assert_eq!(mk.trend, TrendDirection::Increasing);
    assert!(mk.p_value.unwrap() < 0.05);
    assert!(mk.significant);

    // Anomaly detection on the timestamped series removes the weekly
    // rhythm first, so only the viral day is flagged
    let detector = AnomalyDetector::new();
    let report = detector.detect_time_series(&points).unwrap();
    assert!(!report.anomalies.is_empty());
    assert!(report.anomalies.iter().all(|a| a.index == 40));
    assert!(report.anomalies.iter().all(|a| a.value > 340.0));
    assert!(report.anomalies[0].timestamp.is_some());

    // Forecast one week ahead with daily timestamps projected forward
    let engine = ForecastingEngine::new();
    let forecast = engine.forecast(&values, Some(&timestamps)).unwrap();
    assert_ne!(forecast.model, ForecastModel::Auto);
    assert_eq!(forecast.forecast.len(), 7);
    for (k, point) in forecast.forecast.iter().enumerate() {
        assert_eq!(point.index, 56 + k);
        assert!(point.lower <= point.value && point.value <= point.upper);
        assert!(point.value > 150.0 && point.value < 500.0);
        assert_eq!(
            point.timestamp.unwrap(),
            timestamps[55] + Duration::days(k as i64 + 1)
        );
    }

    // Cache the forecast for the report layer and read it back typed
    let cache = AnalyticsCache::new();
    let key = CacheKey::new("forecast")
        .platform("reddit")
        .range("2026-06-01", "2026-07-26")
        .param("metric", "posts")
        .param("horizon", 7)
        .build();
    cache.set(&key, &forecast);

    let cached: ForecastResult = cache.get(&key).unwrap();
    assert_eq!(cached, forecast);
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn test_declining_community_agrees_across_methods() {
    // Steady decline with minor day-to-day texture
    let values: Vec<f64> = (0..45)
        .map(|i| 500.0 - 4.0 * i as f64 + ((i % 5) as f64))
        .collect();

    let analyzer = TrendAnalyzer::new();

    let linear = analyzer.analyze_trend(&values, None);
    assert_eq!(linear.trend, TrendDirection::Decreasing);
    assert!(linear.significant, "near-perfect line should be significant");

    let mk = analyzer.mann_kendall(&values).unwrap();
    assert_eq!(mk.trend, TrendDirection::Decreasing);
    assert!(mk.significant);
}

#[test]
fn test_sparse_history_degrades_gracefully() {
    let values = [42.0, 40.0, 44.0];

    // Too short for everything; nothing errors
    let trend = TrendAnalyzer::new().analyze_trend(&values, None);
    assert_eq!(trend.trend, TrendDirection::Stable);
    assert!(!trend.significant);
    assert_eq!(trend.confidence, Some(0.0));

    let detection = AnomalyDetector::new().detect(&values).unwrap();
    assert!(detection.anomalies.is_empty());
    assert_eq!(detection.confidence, 0.0);

    let forecast = ForecastingEngine::new().forecast(&values, None).unwrap();
    assert_eq!(forecast.model, ForecastModel::Linear);
    assert_eq!(forecast.forecast.len(), 7);
}

#[test]
fn test_engagement_report_names_the_broken_metric() {
    let start = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
    let metrics: Vec<EngagementMetrics> = (0..45)
        .map(|i| {
            let wave = WEEKLY[i % 7] / 2.0;
            let mut comments = 240.0 + 2.0 * wave;
            if i == 30 {
                comments = 1000.0; // moderation incident thread
            }
            EngagementMetrics {
                timestamp: start + Duration::days(i as i64),
                posts: 120.0 + wave,
                comments,
                likes: 800.0 + 3.0 * wave,
                shares: 40.0 + wave / 2.0,
                active_users: 300.0 + 2.0 * wave,
                new_users: 25.0 + wave / 4.0,
            }
        })
        .collect();

    let report = AnomalyDetector::new()
        .detect_engagement_anomalies(&metrics)
        .unwrap();

    assert_eq!(report.per_metric.len(), 6);

    let comments = &report.per_metric["comments"];
    assert!(!comments.anomalies.is_empty());
    assert!(comments.anomalies.iter().all(|a| a.index == 30));
    assert_eq!(comments.anomalies[0].metric.as_deref(), Some("comments"));

    let posts = &report.per_metric["posts"];
    assert!(posts.anomalies.is_empty(), "steady metric should stay clean");
}

#[test]
fn test_detection_deadline_is_enforced() {
    let values: Vec<f64> = (0..300).map(|i| ((i * 37) % 100) as f64).collect();
    let config = AnomalyConfig {
        methods: vec![DetectionMethod::IsolationForest],
        ..AnomalyConfig::default()
    };
    let detector = AnomalyDetector::with_config(config).unwrap().with_seed(7);

    let expired = Instant::now() - StdDuration::from_millis(1);
    match detector.detect_with_deadline(&values, expired) {
        Err(AnalyticsError::DeadlineExceeded(_)) => {}
        other => panic!("expected deadline error, got {:?}", other.map(|r| r.anomalies.len())),
    }

    let generous = Instant::now() + StdDuration::from_secs(30);
    assert!(detector.detect_with_deadline(&values, generous).is_ok());
}

#[test]
fn test_cache_expiry_forces_recompute() {
    let cache = AnalyticsCache::with_ttl(StdDuration::from_millis(0));
    let summary = stats::summary(&[1.0, 2.0, 3.0, 4.0]);
    let key = CacheKey::new("summary").platform("hackernews").build();

    cache.set(&key, &summary);
    assert!(cache
        .get::<forum_pulse_types::SummaryStatistics>(&key)
        .is_none());

    let stats = cache.stats();
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.entries, 0);
}
