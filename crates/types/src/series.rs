//! Time-series input types
//!
//! Input contract for every engine: an ordered sequence of observations,
//! pre-aligned to a fixed cadence (one value per day) by the storage layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Single observation in a time series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Observation timestamp
    pub timestamp: DateTime<Utc>,
    /// Observed value
    pub value: f64,
}

impl TimeSeriesPoint {
    /// Create a new point
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One day of engagement counts for a platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    /// Day the counts were aggregated for
    pub timestamp: DateTime<Utc>,
    /// Posts created
    pub posts: f64,
    /// Comments created
    pub comments: f64,
    /// Likes / upvotes received
    pub likes: f64,
    /// Shares / crossposts
    pub shares: f64,
    /// Distinct users active
    pub active_users: f64,
    /// First-seen users
    pub new_users: f64,
}

/// Named engagement metric, used to address one field of [`EngagementMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementMetric {
    Posts,
    Comments,
    Likes,
    Shares,
    ActiveUsers,
    NewUsers,
}

impl EngagementMetric {
    /// All metrics, in reporting order
    pub const ALL: [EngagementMetric; 6] = [
        EngagementMetric::Posts,
        EngagementMetric::Comments,
        EngagementMetric::Likes,
        EngagementMetric::Shares,
        EngagementMetric::ActiveUsers,
        EngagementMetric::NewUsers,
    ];

    /// Stable string name used in reports and cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementMetric::Posts => "posts",
            EngagementMetric::Comments => "comments",
            EngagementMetric::Likes => "likes",
            EngagementMetric::Shares => "shares",
            EngagementMetric::ActiveUsers => "active_users",
            EngagementMetric::NewUsers => "new_users",
        }
    }
}

impl EngagementMetrics {
    /// Read one field by name
    pub fn metric(&self, metric: EngagementMetric) -> f64 {
        match metric {
            EngagementMetric::Posts => self.posts,
            EngagementMetric::Comments => self.comments,
            EngagementMetric::Likes => self.likes,
            EngagementMetric::Shares => self.shares,
            EngagementMetric::ActiveUsers => self.active_users,
            EngagementMetric::NewUsers => self.new_users,
        }
    }
}
