//! Request latency histogram with bounded `path` label cardinality.
//!
//! Pieces, in call order:
//! - [`labeler`] turns a route template or a raw request path into a `path` label
//! - [`context::RequestTimerContext`] holds the single timer of one request
//! - [`registry::RequestHistogram`] is the shared `(path, method)` histogram

pub mod config;
pub mod context;
pub mod error;
pub mod labeler;
pub mod logging;
pub mod registry;

pub use config::{Config, LoggingConfig, MetricsConfig};
pub use context::{RequestTimerContext, StopOnDrop, TimerState};
pub use error::{Error, Result};
pub use labeler::{route_template_label, truncate_path, PathDepth, PathLabelPolicy};
pub use registry::{HistogramSpec, LabeledTimer, RequestHistogram, DEFAULT_BUCKETS};
