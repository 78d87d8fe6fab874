use axum::{extract::Request, http::header, middleware::Next, response::IntoResponse};

/// Browser-facing security headers for server-rendered pages.
///
/// Listing images are served by the backend's storage host, so `img-src`
/// allows https sources in addition to the page origin. htmx loads from unpkg.
pub async fn security_headers_middleware(req: Request, next: Next) -> impl IntoResponse {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        header::HeaderValue::from_static("DENY"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        header::HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        header::HeaderValue::from_static(
            "default-src 'self'; \
             script-src 'self' https://unpkg.com; \
             style-src 'self'; \
             img-src 'self' https: data:; \
             form-action 'self'; \
             frame-ancestors 'none'",
        ),
    );

    response
}
