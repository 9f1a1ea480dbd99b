//! Request duration histogram
//!
//! A single `HistogramVec` labeled `(path, method)`. Label tuples are opened on
//! first use and live as long as the histogram, so the set of distinct paths
//! only ever grows.

use prometheus::{Histogram, HistogramOpts, HistogramVec, Registry};
use std::fmt;
use std::sync::{LazyLock, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Upper bounds in seconds used when no valid bucket list is configured
pub const DEFAULT_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Label dimensions, in order
pub const LABEL_NAMES: [&str; 2] = ["path", "method"];

/// Process-wide metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static GLOBAL: OnceLock<RequestHistogram> = OnceLock::new();

/// Immutable definition of the request histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSpec {
    name: String,
    help: String,
    buckets: Vec<f64>,
}

impl HistogramSpec {
    /// Invalid bucket lists (empty, non-positive, not strictly increasing) are
    /// replaced by [`DEFAULT_BUCKETS`].
    pub fn new(name: impl Into<String>, help: impl Into<String>, buckets: Vec<f64>) -> Self {
        let name = name.into();
        let buckets = match validate_buckets(&buckets) {
            Ok(()) => buckets,
            Err(e) => {
                warn!(metric = %name, error = %e, "Falling back to default histogram buckets");
                DEFAULT_BUCKETS.to_vec()
            }
        };

        Self {
            name,
            help: help.into(),
            buckets,
        }
    }

    pub fn with_default_buckets(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self::new(name, help, DEFAULT_BUCKETS.to_vec())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn help(&self) -> &str {
        &self.help
    }

    #[must_use]
    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }
}

pub(crate) fn validate_buckets(buckets: &[f64]) -> Result<()> {
    if buckets.is_empty() {
        return Err(Error::InvalidBuckets("empty bucket list".to_string()));
    }
    if let Some(bound) = buckets.iter().find(|b| !b.is_finite() || **b <= 0.0) {
        return Err(Error::InvalidBuckets(format!(
            "{bound} is not a positive finite bound"
        )));
    }
    if let Some(pair) = buckets.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(Error::InvalidBuckets(format!(
            "{} does not increase on {}",
            pair[1], pair[0]
        )));
    }
    Ok(())
}

/// Handle to the registered `(path, method)` histogram.
///
/// Cheap to clone; all clones observe into the same storage. The prometheus
/// collector does its own synchronization, so a handle can be shared freely
/// across request tasks.
#[derive(Clone)]
pub struct RequestHistogram {
    name: String,
    vec: HistogramVec,
}

impl RequestHistogram {
    /// Register a new histogram in `registry`.
    ///
    /// A name that is already registered there is rejected with
    /// [`Error::DuplicateMetric`]; the existing collector is left untouched.
    pub fn register(spec: &HistogramSpec, registry: &Registry) -> Result<Self> {
        let opts = HistogramOpts::new(spec.name(), spec.help()).buckets(spec.buckets().to_vec());
        let vec = HistogramVec::new(opts, &LABEL_NAMES)?;

        // The name was validated by `HistogramVec::new` and the collector has a
        // single descriptor, so any rejection here is a clash with an existing name.
        registry.register(Box::new(vec.clone())).map_err(|e| {
            debug!(metric = spec.name(), error = %e, "Histogram registration rejected");
            Error::DuplicateMetric {
                name: spec.name().to_string(),
            }
        })?;

        Ok(Self {
            name: spec.name().to_string(),
            vec,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start timing a request under the given labels.
    pub fn timer(&self, path: &str, method: &str) -> LabeledTimer {
        LabeledTimer {
            histogram: self.vec.with_label_values(&[path, method]),
            path: path.to_string(),
            method: method.to_string(),
            start: Instant::now(),
        }
    }

    /// Number of observations recorded for a label pair.
    ///
    /// Opens the label pair if it was never used.
    #[must_use]
    pub fn sample_count(&self, path: &str, method: &str) -> u64 {
        self.vec.with_label_values(&[path, method]).get_sample_count()
    }

    /// Sum of observed seconds for a label pair.
    #[must_use]
    pub fn sample_sum(&self, path: &str, method: &str) -> f64 {
        self.vec.with_label_values(&[path, method]).get_sample_sum()
    }
}

impl fmt::Debug for RequestHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHistogram")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Register the process-wide histogram in [`REGISTRY`].
///
/// Only the first call succeeds; later calls fail with
/// [`Error::DuplicateMetric`] whatever name they carry.
pub fn install(spec: &HistogramSpec) -> Result<&'static RequestHistogram> {
    if let Some(existing) = GLOBAL.get() {
        return Err(Error::DuplicateMetric {
            name: existing.name().to_string(),
        });
    }

    let histogram = RequestHistogram::register(spec, &REGISTRY)?;
    if let Err(rejected) = GLOBAL.set(histogram) {
        // Lost a race with a concurrent install
        if let Err(e) = REGISTRY.unregister(Box::new(rejected.vec)) {
            warn!(metric = spec.name(), error = %e, "Failed to unregister rejected histogram");
        }
        return Err(Error::DuplicateMetric {
            name: spec.name().to_string(),
        });
    }

    info!(
        metric = spec.name(),
        buckets = ?spec.buckets(),
        "Request timing histogram installed"
    );
    GLOBAL.get().ok_or_else(|| Error::DuplicateMetric {
        name: spec.name().to_string(),
    })
}

/// The histogram registered by [`install`], if any.
#[must_use]
pub fn global() -> Option<&'static RequestHistogram> {
    GLOBAL.get()
}

/// A running measurement bound to one `(path, method)` pair.
///
/// Dropping a timer without calling [`observe`](Self::observe) records nothing.
#[must_use = "a timer records nothing unless observed"]
pub struct LabeledTimer {
    histogram: Histogram,
    path: String,
    method: String,
    start: Instant,
}

impl LabeledTimer {
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record the elapsed time into the histogram and consume the timer.
    pub fn observe(self) -> Duration {
        let elapsed = self.start.elapsed();
        self.histogram.observe(elapsed.as_secs_f64());
        elapsed
    }
}

impl fmt::Debug for LabeledTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabeledTimer")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}
