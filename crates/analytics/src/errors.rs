//! Error types for the analytics kernel

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Statistical error: {0}")]
    StatisticalError(String),

    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
