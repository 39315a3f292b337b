use axum::{extract::Request, http::header, middleware::Next, response::IntoResponse};

/// Baseline hardening headers for every response.
///
/// Responses that carry access decisions or cookies must never be cached by
/// intermediaries, so `Cache-Control: no-store` is applied everywhere except
/// the metrics scrape.
pub async fn security_headers_middleware(req: Request, next: Next) -> impl IntoResponse {
    let is_metrics_route = req.uri().path() == "/metrics";

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        header::HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        header::HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        header::HeaderValue::from_static("DENY"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        header::HeaderValue::from_static("same-origin"),
    );

    if !is_metrics_route {
        headers.insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-store"),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http, middleware::from_fn, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn sets_hardening_headers() {
        let app = Router::new()
            .route("/verify", get(|| async { "ok" }))
            .route("/metrics", get(|| async { "# metrics" }))
            .layer(from_fn(security_headers_middleware));

        let response = app
            .clone()
            .oneshot(http::Request::builder().uri("/verify").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");

        let response = app
            .oneshot(http::Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().get(header::CACHE_CONTROL).is_none());
    }
}
