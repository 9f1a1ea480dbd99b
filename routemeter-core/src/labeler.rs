//! Path label derivation
//!
//! Reduces a request to a low-cardinality `path` label. Two policies exist:
//! joining the declared route template fragments, or truncating the raw request
//! path to a fixed number of segments. The latter bounds the label set to
//! whatever the first N segments can produce, no matter how many IDs appear
//! deeper in the URI.

use std::borrow::Cow;
use std::fmt;
use std::num::NonZeroUsize;

/// How many leading path segments a depth-truncated label keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDepth {
    Limited(NonZeroUsize),
    /// Full request path. Cardinality is bounded only by the URI space.
    Unbounded,
}

impl PathDepth {
    /// Interpret a configured `path-components` value. Anything below 1 is unbounded.
    #[must_use]
    pub fn from_components(components: i64) -> Self {
        usize::try_from(components)
            .ok()
            .and_then(NonZeroUsize::new)
            .map_or(Self::Unbounded, Self::Limited)
    }

    #[must_use]
    pub const fn is_unbounded(self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

impl Default for PathDepth {
    fn default() -> Self {
        Self::Limited(NonZeroUsize::MIN)
    }
}

impl fmt::Display for PathDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{n}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Which request attribute the `path` label is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathLabelPolicy {
    /// Declared route template, e.g. `/users/{id}`.
    RouteTemplate,
    /// Raw request path cut down to a fixed depth.
    DepthTruncated(PathDepth),
}

impl Default for PathLabelPolicy {
    fn default() -> Self {
        Self::DepthTruncated(PathDepth::default())
    }
}

/// Join a resource's route fragment and a handler's route fragment into one label.
///
/// Missing fragments count as empty. The result is always absolute, never has
/// repeated separators, and only ends with `/` when it is the root itself.
#[must_use]
pub fn route_template_label(resource: Option<&str>, method: Option<&str>) -> String {
    let fragments = [resource.unwrap_or_default(), method.unwrap_or_default()];
    let mut label = String::with_capacity(fragments.iter().map(|f| f.len() + 1).sum());

    for segment in fragments
        .iter()
        .flat_map(|f| f.split('/'))
        .filter(|s| !s.is_empty())
    {
        label.push('/');
        label.push_str(segment);
    }

    if label.is_empty() {
        label.push('/');
    }
    label
}

/// Cut a raw request path down to at most `depth` segments.
///
/// Paths that already fit are returned untouched (borrowed), including any
/// trailing slash. Longer paths are rebuilt from their first `depth` non-empty
/// segments. An empty path is treated as `/`.
#[must_use]
pub fn truncate_path(raw: &str, depth: PathDepth) -> Cow<'_, str> {
    if raw.is_empty() {
        return Cow::Borrowed("/");
    }
    let PathDepth::Limited(limit) = depth else {
        return Cow::Borrowed(raw);
    };

    let mut segments = raw.split('/').filter(|s| !s.is_empty());
    let kept: Vec<&str> = segments.by_ref().take(limit.get()).collect();
    if segments.next().is_none() {
        return Cow::Borrowed(raw);
    }

    let mut label = String::with_capacity(raw.len());
    for segment in kept {
        label.push('/');
        label.push_str(segment);
    }
    Cow::Owned(label)
}

/// Number of non-empty segments in a path.
#[must_use]
pub fn segment_count(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}
