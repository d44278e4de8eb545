//! Analytics kernel for Forum Pulse
//!
//! This crate provides the computation layer over scraped-forum engagement
//! series: summary statistics, trend analysis with Mann-Kendall significance
//! testing and seasonal decomposition, multi-method anomaly detection with
//! an isolation-forest ensemble, horizon forecasting with prediction
//! intervals, and a TTL cache for computed results.

pub mod anomaly;
pub mod cache;
pub mod errors;
pub mod forecast;
pub mod stats;
pub mod trend;

pub use anomaly::{AnomalyConfig, AnomalyDetector};
pub use cache::{AnalyticsCache, CacheKey, CacheStats};
pub use errors::{AnalyticsError, Result};
pub use forecast::{select_model, ForecastConfig, ForecastingEngine};
pub use trend::{TrendAnalyzer, TrendConfig};
