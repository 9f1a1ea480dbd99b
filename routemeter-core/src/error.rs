use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid bucket list: {0}")]
    InvalidBuckets(String),

    #[error("Metric already registered: {name}")]
    DuplicateMetric { name: String },

    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
