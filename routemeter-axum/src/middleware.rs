//! Axum middleware that times each request into the `(path, method)` histogram.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tracing::warn;

use routemeter_core::{
    registry, route_template_label, truncate_path, MetricsConfig, PathDepth, PathLabelPolicy,
    RequestHistogram, RequestTimerContext, Result, StopOnDrop,
};

/// Middleware state: the shared histogram and how `path` labels are derived.
#[derive(Debug, Clone)]
pub struct RequestTiming {
    histogram: RequestHistogram,
    policy: PathLabelPolicy,
}

impl RequestTiming {
    pub fn new(histogram: RequestHistogram, policy: PathLabelPolicy) -> Self {
        if policy == PathLabelPolicy::DepthTruncated(PathDepth::Unbounded) {
            warn!(
                metric = histogram.name(),
                "Path labels keep the full request path; label cardinality is unbounded"
            );
        }
        Self { histogram, policy }
    }

    /// Install the process-wide histogram described by `config` and label by
    /// truncated request path.
    ///
    /// Fails with `DuplicateMetric` if the process-wide histogram already exists.
    pub fn from_config(config: &MetricsConfig) -> Result<Self> {
        let histogram = registry::install(&config.histogram_spec())?;
        Ok(Self::new(
            histogram.clone(),
            PathLabelPolicy::DepthTruncated(config.path_depth()),
        ))
    }

    /// Same histogram, different labelling policy.
    #[must_use]
    pub fn with_policy(&self, policy: PathLabelPolicy) -> Self {
        Self::new(self.histogram.clone(), policy)
    }

    #[must_use]
    pub const fn histogram(&self) -> &RequestHistogram {
        &self.histogram
    }

    #[must_use]
    pub const fn policy(&self) -> PathLabelPolicy {
        self.policy
    }

    /// Derive the `path` label for a request.
    ///
    /// Route templates come from [`MatchedPath`], which only exists once the
    /// router has matched; requests without one are labelled `/`.
    pub fn path_label(&self, request: &Request) -> String {
        match self.policy {
            PathLabelPolicy::RouteTemplate => route_template_label(
                None,
                request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str),
            ),
            PathLabelPolicy::DepthTruncated(depth) => {
                truncate_path(request.uri().path(), depth).into_owned()
            }
        }
    }
}

/// Time one request: start before the inner service, stop once the response
/// exists. A request whose future is dropped early is still observed.
pub async fn track_request_timing(
    State(timing): State<RequestTiming>,
    request: Request,
    next: Next,
) -> Response {
    let path = timing.path_label(&request);
    let mut context = StopOnDrop::new(RequestTimerContext::new(timing.histogram.clone()));
    context.start(&path, request.method().as_str());

    let response = next.run(request).await;

    context.stop();
    response
}

/// Attach request timing to a router.
pub trait RouteTimingExt {
    /// Route-template timing is added with `route_layer`, so only matched
    /// routes are timed and the router must already have its routes. Depth
    /// truncation wraps the whole router, fallback included.
    #[must_use]
    fn with_request_timing(self, timing: RequestTiming) -> Self;
}

impl<S> RouteTimingExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_request_timing(self, timing: RequestTiming) -> Self {
        let policy = timing.policy;
        let layer = middleware::from_fn_with_state(timing, track_request_timing);
        match policy {
            PathLabelPolicy::RouteTemplate => self.route_layer(layer),
            PathLabelPolicy::DepthTruncated(_) => self.layer(layer),
        }
    }
}
