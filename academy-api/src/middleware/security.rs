/// Security headers middleware
///
/// Adds OWASP-recommended headers to every response. The API only serves
/// JSON and uploaded images, so the content security policy blocks
/// everything else.
///
/// # Headers Applied
///
/// - `X-Content-Type-Options: nosniff`
/// - `X-Frame-Options: DENY`
/// - `Referrer-Policy: no-referrer`
/// - `Permissions-Policy` with every sensitive feature disabled
/// - `Content-Security-Policy: default-src 'none'; img-src 'self'; frame-ancestors 'none'`
/// - `Strict-Transport-Security` (production only)
///
/// # Example
///
/// ```no_run
/// use axum::Router;
/// use academy_api::middleware::security::SecurityHeadersLayer;
///
/// let app: Router = Router::new()
///     .layer(SecurityHeadersLayer::new(true)); // true = production mode
/// ```

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    response::Response,
};
use std::task::{Context, Poll};
use tower::{Layer, Service};

const BASE_HEADERS: [(HeaderName, &str); 5] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::REFERRER_POLICY, "no-referrer"),
    (
        HeaderName::from_static("permissions-policy"),
        "geolocation=(), microphone=(), camera=(), payment=(), usb=()",
    ),
    (
        header::CONTENT_SECURITY_POLICY,
        "default-src 'none'; img-src 'self'; frame-ancestors 'none'",
    ),
];

const HSTS: &str = "max-age=31536000; includeSubDomains";

/// Security headers middleware layer
#[derive(Debug, Clone, Copy)]
pub struct SecurityHeadersLayer {
    /// HSTS is only sent in production, where the API sits behind HTTPS
    enable_hsts: bool,
}

impl SecurityHeadersLayer {
    pub fn new(enable_hsts: bool) -> Self {
        Self { enable_hsts }
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersMiddleware {
            inner,
            enable_hsts: self.enable_hsts,
        }
    }
}

/// Security headers middleware service
#[derive(Debug, Clone)]
pub struct SecurityHeadersMiddleware<S> {
    inner: S,
    enable_hsts: bool,
}

impl<S> Service<Request> for SecurityHeadersMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let future = self.inner.call(request);
        let enable_hsts = self.enable_hsts;

        Box::pin(async move {
            let mut response = future.await?;
            let headers = response.headers_mut();

            for (name, value) in BASE_HEADERS {
                headers.insert(name, HeaderValue::from_static(value));
            }

            if enable_hsts {
                headers.insert(
                    header::STRICT_TRANSPORT_SECURITY,
                    HeaderValue::from_static(HSTS),
                );
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::Service as _;

    async fn call(enable_hsts: bool) -> Response {
        let mut app = Router::new()
            .route("/test", get(|| async { StatusCode::OK }))
            .layer(SecurityHeadersLayer::new(enable_hsts));

        app.call(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_security_headers_applied() {
        let response = call(false).await;
        let headers = response.headers();

        assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
        assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
        assert_eq!(headers.get("Referrer-Policy").unwrap(), "no-referrer");
        assert!(headers.get("Content-Security-Policy").is_some());
        assert!(headers.get("Permissions-Policy").is_some());
    }

    #[tokio::test]
    async fn test_hsts_only_in_production() {
        assert!(call(true)
            .await
            .headers()
            .get("Strict-Transport-Security")
            .is_some());
        assert!(call(false)
            .await
            .headers()
            .get("Strict-Transport-Security")
            .is_none());
    }
}
