//! Cast configuration and cancellation.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::fields::DEFAULT_TAGS;
use crate::{CastError, CastErrorKind, Result};

/// Default bound on structural nesting.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Cooperative cancellation flag shared between a caller and running casts.
///
/// Cancellation is observed at public entry points only; a cast already in
/// progress runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Settings for a cast: tag candidates, depth cap, recursion and cancellation.
///
/// A `Context` is immutable during a cast and can be shared across threads.
#[derive(Debug, Clone)]
pub struct Context {
    tags: Vec<String>,
    max_depth: usize,
    recursive: bool,
    cancel: CancelToken,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            recursive: false,
            cancel: CancelToken::new(),
        }
    }
}

impl Context {
    /// Declared names only, depth cap [`DEFAULT_MAX_DEPTH`], not recursive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use these tag keys, in order, to resolve field names.
    ///
    /// Each entry may itself be a comma-separated list, so `["json,yaml"]`
    /// and `["json", "yaml"]` are equivalent.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .flat_map(|entry| {
                entry
                    .as_ref()
                    .split(',')
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .collect();
        self
    }

    /// Use [`DEFAULT_TAGS`].
    pub fn with_default_tags(self) -> Self {
        self.with_tags(DEFAULT_TAGS)
    }

    /// Bound structural nesting; deeper casts fail with
    /// [`CastErrorKind::DepthLimitExceeded`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Whether records and maps reaching a dynamic
    /// ([`Shape::Any`](crate::Shape::Any)) target are rebuilt as maps of
    /// dynamic values (`true`) or deep-copied as they are (`false`).
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Observe `token` at entry points.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Tag keys, in resolution order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Depth cap.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Whether dynamic targets rebuild records as maps.
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// The cancellation token.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(CastError::new(CastErrorKind::Cancelled));
        }
        Ok(())
    }
}
