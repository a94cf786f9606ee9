#![deny(missing_docs)]
//! Fetch-dedupe API contains the dedupe middleware traits and the basic
//! types required to define the api of those traits.
//!
//! If you want to use the middleware itself, please see the
//! fetch_dedupe_core crate.

/// Boxed future type.
pub type BoxFut<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

mod error;
pub use error::*;

mod url;
pub use url::Url;

pub mod abort;
pub use abort::*;

pub mod request;
pub use request::*;

pub mod response;
pub use response::*;

pub mod dedupe;
pub use dedupe::*;
