//! Url-related types.

use crate::*;

/// A validated fetch url.
///
/// Construction parses the text with the `url` crate and requires an
/// `http` or `https` scheme with a host. The original text is kept
/// verbatim, since deduplication keys are derived from the literal url
/// string rather than any normalized form.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Url(String);

impl serde::Serialize for Url {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Url {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = serde::Deserialize::deserialize(deserializer)?;
        Url::new(s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for Url {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::convert::TryFrom<String> for Url {
    type Error = DedupeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl std::fmt::Display for Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::str::FromStr for Url {
    type Err = DedupeError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        Self::from_str(src)
    }
}

impl Url {
    /// Construct a new validated fetch Url.
    pub fn new(src: String) -> DedupeResult<Self> {
        let parsed = ::url::Url::parse(&src).map_err(|err| {
            DedupeError::invalid_request(format!(
                "could not parse url {src:?}: {err}"
            ))
        })?;

        match parsed.scheme() {
            "http" | "https" => (),
            oth => {
                return Err(DedupeError::invalid_request(format!(
                    "unsupported url scheme: {oth}"
                )));
            }
        }

        if parsed.host_str().is_none() {
            return Err(DedupeError::invalid_request("url is missing a host"));
        }

        Ok(Self(src))
    }

    /// Construct a new validated fetch Url from a str.
    // We *do* also implement the trait. But it's not as usable,
    // so implement a better local version as well.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str<S: AsRef<str>>(src: S) -> DedupeResult<Self> {
        Self::new(src.as_ref().to_string())
    }

    /// Get this url as a str.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the scheme is `https`.
    pub fn uses_tls(&self) -> bool {
        self.0.starts_with("https:")
    }
}
