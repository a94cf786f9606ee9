use fetch_dedupe_api::FetchRequest;

/// The key an in-flight record is registered under.
///
/// Derived deterministically and purely from the literal request url
/// plus the `Authorization` header value when one is present. Other
/// headers, the method and the body never participate: only idempotent,
/// url/credential-identified requests reach the registry at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupeKey(String);

impl DedupeKey {
    /// Derive the key for a request.
    pub fn derive(request: &FetchRequest) -> Self {
        match request.authorization() {
            Some(auth) => Self(format!(
                "{}{}",
                request.url(),
                String::from_utf8_lossy(auth.as_bytes())
            )),
            None => Self(request.url().to_string()),
        }
    }
}

impl std::fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use fetch_dedupe_api::FetchRequest;
    use http::header::AUTHORIZATION;

    const URL: &str = "http://localhost:8000/path/to/data";

    #[test]
    fn fixture_key_equivalence() {
        let plain = DedupeKey::derive(&FetchRequest::get(URL));
        let auth = DedupeKey::derive(
            &FetchRequest::get(URL)
                .with_header(AUTHORIZATION, "let-me-in".parse().unwrap()),
        );
        let other_auth = DedupeKey::derive(
            &FetchRequest::get(URL)
                .with_header(AUTHORIZATION, "knock-knock".parse().unwrap()),
        );
        let other_url = DedupeKey::derive(&FetchRequest::get(
            "http://localhost:8000/different/path",
        ));

        assert_eq!(plain, DedupeKey::derive(&FetchRequest::get(URL)));
        assert_ne!(plain, auth);
        assert_ne!(auth, other_auth);
        assert_ne!(plain, other_url);
    }

    #[test]
    fn method_and_other_headers_never_participate() {
        let get = DedupeKey::derive(&FetchRequest::get(URL));
        let head = DedupeKey::derive(&FetchRequest::head(URL));
        let post = DedupeKey::derive(&FetchRequest::post(URL));
        let extra = DedupeKey::derive(&FetchRequest::get(URL).with_header(
            "x-other-header".parse().unwrap(),
            "some value".parse().unwrap(),
        ));

        assert_eq!(get, head);
        assert_eq!(get, post);
        assert_eq!(get, extra);
    }
}
