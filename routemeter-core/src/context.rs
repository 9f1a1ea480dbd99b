//! Per-request timer state
//!
//! A [`RequestTimerContext`] is created when request handling begins and
//! dropped with the request. It owns at most one running [`LabeledTimer`], so
//! no locking is needed at this level; only the shared histogram behind it is
//! synchronized.

use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tracing::debug;

use crate::registry::{LabeledTimer, RequestHistogram};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
}

/// Holds the timer of one in-flight request.
#[derive(Debug)]
pub struct RequestTimerContext {
    histogram: RequestHistogram,
    active: Option<LabeledTimer>,
}

impl RequestTimerContext {
    #[must_use]
    pub fn new(histogram: RequestHistogram) -> Self {
        Self {
            histogram,
            active: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> TimerState {
        if self.active.is_some() {
            TimerState::Running
        } else {
            TimerState::Idle
        }
    }

    /// Path label of the running timer
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.active.as_ref().map(LabeledTimer::path)
    }

    /// Start timing under `(path, method)`.
    ///
    /// A timer that is already running is abandoned without being observed.
    pub fn start(&mut self, path: &str, method: &str) {
        let timer = self.histogram.timer(path, method);
        if let Some(replaced) = self.active.replace(timer) {
            debug!(
                path = replaced.path(),
                method = replaced.method(),
                "Discarding unobserved request timer"
            );
        }
    }

    /// Observe the running timer, if any, and return to idle.
    ///
    /// Returns the recorded duration, or `None` when nothing was running.
    pub fn stop(&mut self) -> Option<Duration> {
        let timer = self.active.take()?;
        debug!(
            path = timer.path(),
            method = timer.method(),
            elapsed_secs = timer.elapsed().as_secs_f64(),
            "Request timed"
        );
        Some(timer.observe())
    }
}

/// Stops the wrapped context when dropped.
///
/// Lets an adapter guarantee the observation even when the request future is
/// cancelled before it reaches its normal end hook.
#[derive(Debug)]
pub struct StopOnDrop(RequestTimerContext);

impl StopOnDrop {
    #[must_use]
    pub fn new(context: RequestTimerContext) -> Self {
        Self(context)
    }
}

impl Deref for StopOnDrop {
    type Target = RequestTimerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for StopOnDrop {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HistogramSpec;
    use prometheus::Registry;

    fn histogram() -> RequestHistogram {
        let spec = HistogramSpec::with_default_buckets("context_test", "test");
        RequestHistogram::register(&spec, &Registry::new()).unwrap()
    }

    #[test]
    fn test_stop_on_fresh_context_is_noop() {
        let histogram = histogram();
        let mut context = RequestTimerContext::new(histogram.clone());

        assert_eq!(context.state(), TimerState::Idle);
        assert_eq!(context.stop(), None);
        assert_eq!(context.stop(), None);
        assert_eq!(context.state(), TimerState::Idle);
        assert_eq!(histogram.sample_count("/", "GET"), 0);
    }

    #[test]
    fn test_start_stop_observes_once() {
        let histogram = histogram();
        let mut context = RequestTimerContext::new(histogram.clone());

        context.start("/users", "GET");
        assert_eq!(context.state(), TimerState::Running);
        assert_eq!(context.path(), Some("/users"));

        let elapsed = context.stop().unwrap();
        assert!(elapsed >= Duration::ZERO);
        assert_eq!(context.state(), TimerState::Idle);
        assert_eq!(context.path(), None);
        assert_eq!(histogram.sample_count("/users", "GET"), 1);

        // A second stop does not double count
        assert_eq!(context.stop(), None);
        assert_eq!(histogram.sample_count("/users", "GET"), 1);
    }

    #[test]
    fn test_restart_replaces_timer() {
        let histogram = histogram();
        let mut context = RequestTimerContext::new(histogram.clone());

        context.start("/first", "GET");
        context.start("/second", "POST");
        assert_eq!(context.path(), Some("/second"));
        context.stop().unwrap();

        assert_eq!(histogram.sample_count("/first", "GET"), 0);
        assert_eq!(histogram.sample_count("/second", "POST"), 1);
    }

    #[test]
    fn test_context_is_reusable_after_stop() {
        let histogram = histogram();
        let mut context = RequestTimerContext::new(histogram.clone());

        for _ in 0..3 {
            context.start("/users", "GET");
            context.stop();
        }
        assert_eq!(histogram.sample_count("/users", "GET"), 3);
    }

    #[test]
    fn test_dropping_running_context_records_nothing() {
        let histogram = histogram();
        let mut context = RequestTimerContext::new(histogram.clone());
        context.start("/users", "GET");
        drop(context);
        assert_eq!(histogram.sample_count("/users", "GET"), 0);
    }

    #[test]
    fn test_stop_on_drop_observes_running_timer() {
        let histogram = histogram();
        {
            let mut guard = StopOnDrop::new(RequestTimerContext::new(histogram.clone()));
            guard.start("/users", "DELETE");
        }
        assert_eq!(histogram.sample_count("/users", "DELETE"), 1);

        // Already stopped: drop adds nothing
        {
            let mut guard = StopOnDrop::new(RequestTimerContext::new(histogram.clone()));
            guard.start("/users", "DELETE");
            guard.stop();
        }
        assert_eq!(histogram.sample_count("/users", "DELETE"), 2);
    }
}
