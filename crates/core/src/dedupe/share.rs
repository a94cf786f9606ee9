use fetch_dedupe_api::*;

/// Produce a replayable facade over a response that more than one
/// waiter has to read.
///
/// The body is drained as text exactly once; the returned response
/// keeps the original status and headers but serves `text` and `json`
/// repeatably from the capture, and refuses binary access. Invoked at
/// most once per settled record, and never for a single waiter, which
/// keeps normal single-read semantics for the common case.
pub(crate) async fn share(
    response: FetchResponse,
) -> DedupeResult<FetchResponse> {
    let text = response.text().await?;
    let (status, headers, _) = response.into_parts();
    Ok(FetchResponse::new(status, headers, Body::shared(text)))
}

#[cfg(test)]
mod test {
    use super::*;
    use http::header::CONTENT_TYPE;
    use http::{HeaderMap, StatusCode};

    #[tokio::test]
    async fn happy_share_keeps_status_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        let response = FetchResponse::new(
            StatusCode::CREATED,
            headers.clone(),
            Body::once("{\"dataprop\":\"sweet sweet data\"}"),
        );

        let shared = share(response).await.unwrap();
        assert_eq!(StatusCode::CREATED, shared.status());
        assert_eq!(&headers, shared.headers());
        assert!(shared.body().is_shared());
        assert_eq!(
            "sweet sweet data",
            shared.json().await.unwrap()["dataprop"]
        );
    }

    #[tokio::test]
    async fn consumed_body_cannot_be_shared() {
        let response = FetchResponse::ok("drained");
        response.text().await.unwrap();
        assert!(matches!(
            share(response).await,
            Err(DedupeError::BodyConsumed)
        ));
    }
}
