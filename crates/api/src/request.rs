//! Request descriptor types.

use crate::*;
use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use http::Method;

/// Transport mode for a request.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Cross-origin requests allowed, subject to CORS.
    #[default]
    Cors,
    /// Only same-origin requests allowed.
    SameOrigin,
    /// Cross-origin requests allowed, response opaque.
    NoCors,
}

/// Cache directive for a request.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CacheDirective {
    /// Follow standard cache rules.
    #[default]
    Default,
    /// Never read from or write to the cache.
    NoStore,
    /// Bypass the cache on read, update it on response.
    Reload,
    /// Revalidate with the origin before using a cached response.
    NoCache,
    /// Use any cached response regardless of freshness.
    ForceCache,
    /// Fail unless a cached response exists.
    OnlyIfCached,
}

/// Credential policy for a request.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialsPolicy {
    /// Send credentials for same-origin requests only.
    #[default]
    SameOrigin,
    /// Never send credentials.
    Omit,
    /// Always send credentials.
    Include,
}

/// Redirect policy for a request.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum RedirectPolicy {
    /// Follow redirects transparently.
    #[default]
    Follow,
    /// Treat a redirect response as an error.
    Error,
    /// Return redirect responses to the caller untouched.
    Manual,
}

/// Transport options carried on a request descriptor.
///
/// The deduplication core never interprets these; it only copies them
/// verbatim onto the canonical request sent downstream.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestOptions {
    /// Transport mode.
    pub mode: RequestMode,
    /// Cache directive.
    pub cache: CacheDirective,
    /// Credential policy.
    pub credentials: CredentialsPolicy,
    /// Redirect policy.
    pub redirect: RedirectPolicy,
    /// Request referrer.
    pub referrer: Option<String>,
    /// Referrer policy.
    pub referrer_policy: Option<String>,
    /// Keep the connection alive past the caller's lifetime.
    pub keepalive: bool,
    /// Subresource integrity hash.
    pub integrity: Option<String>,
}

/// A request descriptor submitted to the dedupe middleware.
///
/// The url is carried as raw text and validated when the request is
/// dispatched, so that an invalid descriptor fails the dedupe call
/// rather than request construction.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    url: String,
    method: Method,
    headers: HeaderMap,
    signal: Option<AbortSignal>,
    options: RequestOptions,
}

impl FetchRequest {
    /// Construct a new request descriptor.
    pub fn new<U: Into<String>>(method: Method, url: U) -> Self {
        Self {
            url: url.into(),
            method,
            headers: HeaderMap::new(),
            signal: None,
            options: RequestOptions::default(),
        }
    }

    /// Construct a GET request descriptor.
    pub fn get<U: Into<String>>(url: U) -> Self {
        Self::new(Method::GET, url)
    }

    /// Construct a HEAD request descriptor.
    pub fn head<U: Into<String>>(url: U) -> Self {
        Self::new(Method::HEAD, url)
    }

    /// Construct a POST request descriptor.
    pub fn post<U: Into<String>>(url: U) -> Self {
        Self::new(Method::POST, url)
    }

    /// Append a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Attach the caller's own abort signal.
    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Set the transport options.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// The raw url text.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The `Authorization` header value, if present.
    pub fn authorization(&self) -> Option<&HeaderValue> {
        self.headers.get(AUTHORIZATION)
    }

    /// The caller's own abort signal, if any.
    pub fn signal(&self) -> Option<&AbortSignal> {
        self.signal.as_ref()
    }

    /// The transport options.
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// The canonical copy sent on the single shared downstream call:
    /// same url, method, headers and options, with the caller's signal
    /// replaced by the given registry-owned one.
    pub fn for_upstream(&self, signal: AbortSignal) -> Self {
        Self {
            url: self.url.clone(),
            method: self.method.clone(),
            headers: self.headers.clone(),
            signal: Some(signal),
            options: self.options.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn happy_options_serialize() {
        let options = RequestOptions {
            mode: RequestMode::SameOrigin,
            cache: CacheDirective::NoStore,
            credentials: CredentialsPolicy::Include,
            ..Default::default()
        };
        let e = serde_json::to_string(&options).unwrap();
        assert!(e.contains("\"mode\":\"same-origin\""), "{e}");
        assert!(e.contains("\"cache\":\"no-store\""), "{e}");
        assert!(e.contains("\"credentials\":\"include\""), "{e}");
        let d: RequestOptions = serde_json::from_str(&e).unwrap();
        assert_eq!(options, d);
    }

    #[test]
    fn for_upstream_swaps_signal_only() {
        let caller = AbortController::new();
        let registry = AbortController::new();

        let req = FetchRequest::get("http://localhost:8000/path/to/data")
            .with_header(AUTHORIZATION, "Bearer foo".parse().unwrap())
            .with_header(
                "x-other-header".parse().unwrap(),
                "some value".parse().unwrap(),
            )
            .with_signal(caller.signal())
            .with_options(RequestOptions {
                cache: CacheDirective::NoStore,
                ..Default::default()
            });

        let canonical = req.for_upstream(registry.signal());
        assert_eq!(req.url(), canonical.url());
        assert_eq!(req.method(), canonical.method());
        assert_eq!(req.headers(), canonical.headers());
        assert_eq!(req.options(), canonical.options());

        // the canonical signal tracks the registry controller, not the
        // caller's
        caller.abort();
        assert!(!canonical.signal().unwrap().is_aborted());
        registry.abort();
        assert!(canonical.signal().unwrap().is_aborted());
    }
}
