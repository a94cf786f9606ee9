#![deny(missing_docs)]
//! Request-deduplication middleware for an HTTP fetch pipeline.
//!
//! When multiple concurrent callers issue logically-identical idempotent
//! requests (same url plus same authorization credential), only one
//! downstream call is made; every caller receives the settled result.
//! See [CoreDedupe] for the semantics.

mod dedupe;
pub use dedupe::*;
