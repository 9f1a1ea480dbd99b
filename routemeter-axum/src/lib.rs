//! Axum integration for `routemeter`
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use routemeter_axum::{RequestTiming, RouteTimingExt};
//! use routemeter_core::MetricsConfig;
//!
//! let timing = RequestTiming::from_config(&MetricsConfig::default())?;
//! let app = Router::new()
//!     .route("/users/{id}", get(handler))
//!     .with_request_timing(timing);
//! ```

mod middleware;

pub use middleware::{track_request_timing, RequestTiming, RouteTimingExt};
