//! Fetch-dedupe error types.

use std::sync::Arc;

/// A clonable trait-object source error carried by an upstream failure.
#[derive(Clone, Default)]
pub struct UpstreamSource(
    pub Option<Arc<dyn std::error::Error + 'static + Send + Sync>>,
);

impl std::fmt::Debug for UpstreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for UpstreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            None => f.write_str("None"),
            Some(s) => s.fmt(f),
        }
    }
}

impl std::error::Error for UpstreamSource {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.as_ref().map(|s| {
            let out: &(dyn std::error::Error + 'static) = &**s;
            out
        })
    }
}

impl UpstreamSource {
    /// Construct a new UpstreamSource from a source error.
    pub fn new<E: std::error::Error + 'static + Send + Sync>(e: E) -> Self {
        Self(Some(Arc::new(e)))
    }
}

/// The core fetch-dedupe error type.
///
/// A settled result fans out to every waiter attached to an in-flight
/// record, so the whole `Result` is required to implement `Clone`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DedupeError {
    /// The supplied value is not a valid request descriptor. Raised
    /// before any registry interaction; the next stage is never invoked.
    #[error("invalid request: {ctx}")]
    InvalidRequest {
        /// What failed validation.
        ctx: Arc<str>,
    },

    /// The caller's own abort signal fired before the shared call
    /// settled. Only that caller observes this error.
    #[error("request was aborted")]
    Aborted,

    /// A body access operation that cannot be served from a shared
    /// (captured-text) response body.
    #[error("dedupe middleware cannot be used with {access} response bodies")]
    UnsupportedBodyAccess {
        /// The attempted access operation.
        access: crate::response::BodyAccess,
    },

    /// The single-read response body has already been consumed.
    #[error("response body has already been consumed")]
    BodyConsumed,

    /// A response body could not be decoded as requested.
    #[error("{ctx} (src: {src})")]
    Decode {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: UpstreamSource,
    },

    /// The shared downstream call failed. Passed through unchanged to
    /// every waiter attached at settlement time.
    #[error("{ctx} (src: {src})")]
    Upstream {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: UpstreamSource,
    },
}

impl DedupeError {
    /// Construct an invalid-request error.
    pub fn invalid_request<C: std::fmt::Display>(ctx: C) -> Self {
        Self::InvalidRequest {
            ctx: ctx.to_string().into_boxed_str().into(),
        }
    }

    /// Construct a decode error with an inner source error.
    pub fn decode_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::Decode {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: UpstreamSource::new(src),
        }
    }

    /// Construct an upstream error.
    pub fn upstream<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Upstream {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: UpstreamSource::default(),
        }
    }

    /// Construct an upstream error with an inner source error.
    pub fn upstream_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::Upstream {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: UpstreamSource::new(src),
        }
    }
}

/// The core fetch-dedupe result type.
pub type DedupeResult<T> = Result<T, DedupeError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn upstream_error_is_clone_with_source() {
        let src = std::io::Error::other("connection reset");
        let err = DedupeError::upstream_src("shared call failed", src);
        let clone = err.clone();
        assert_eq!(err.to_string(), clone.to_string());
        assert!(std::error::Error::source(&clone).is_some());
    }

    #[test]
    fn unsupported_body_access_message() {
        let err = DedupeError::UnsupportedBodyAccess {
            access: crate::response::BodyAccess::Blob,
        };
        assert_eq!(
            "dedupe middleware cannot be used with blob response bodies",
            err.to_string()
        );
    }
}
