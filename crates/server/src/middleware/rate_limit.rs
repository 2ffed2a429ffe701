//! Per-IP rate limiting for the public claim endpoint.
//!
//! Each claim sends up to two emails, so the limit bounds how much mail a
//! single client can trigger. Clients can set proxy headers themselves, so
//! they are only read when the server is configured to sit behind a proxy.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

/// Key extractor for the client IP.
///
/// With `trust_proxy_headers`, prefers proxy headers (Cloudflare,
/// `X-Forwarded-For`, `X-Real-IP`, Fly.io) over the socket peer address.
/// Without it, only the peer address is used.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor {
    pub trust_proxy_headers: bool,
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let ip = if self.trust_proxy_headers {
            proxy_client_ip(req).or_else(|| peer_ip(req))
        } else {
            peer_ip(req)
        };
        ip.ok_or(GovernorError::UnableToExtractKey)
    }
}

fn peer_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn proxy_client_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    let headers = req.headers();
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };
    // First hop of X-Forwarded-For
    let forwarded_for = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    header_ip("cf-connecting-ip")
        .or_else(forwarded_for)
        .or_else(|| header_ip("x-real-ip"))
        .or_else(|| header_ip("fly-client-ip"))
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create the claim rate limiter: ~6 requests per minute per IP.
///
/// `trust_proxy_headers` selects how the client IP is found, see
/// [`ClientIpKeyExtractor`].
///
/// Configuration: 1 request every 10 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. `per_second(10)` and `burst_size(5)` are
/// both non-zero, which is all `GovernorConfigBuilder` checks.
#[must_use]
pub fn claim_rate_limiter(trust_proxy_headers: bool) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor {
            trust_proxy_headers,
        })
        .per_second(10)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(10) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Rewrite a governor 429 into the standard JSON error body.
///
/// Rate limit headers set by the limiter are kept.
pub async fn rate_limited_response(response: Response) -> Response {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return response;
    }

    tracing::warn!("Claim rate limit exceeded");
    let mut rewritten = AppError::RateLimited.into_response();
    for (name, value) in response.headers() {
        if name != axum::http::header::CONTENT_TYPE && name != axum::http::header::CONTENT_LENGTH
        {
            rewritten.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rewritten
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/claim");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    fn key(trust_proxy_headers: bool, req: &Request<()>) -> Option<IpAddr> {
        use tower_governor::key_extractor::KeyExtractor;
        ClientIpKeyExtractor {
            trust_proxy_headers,
        }
        .extract(req)
        .ok()
    }

    fn with_peer(mut req: Request<()>, peer: &str) -> Request<()> {
        req.extensions_mut()
            .insert(ConnectInfo::<SocketAddr>(peer.parse().unwrap()));
        req
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let req = request(&[
            ("x-forwarded-for", "10.0.0.1"),
            ("cf-connecting-ip", "203.0.113.9"),
        ]);
        assert_eq!(key(true, &req), Some("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let req = request(&[("x-forwarded-for", "198.51.100.4, 10.0.0.1")]);
        assert_eq!(key(true, &req), Some("198.51.100.4".parse().unwrap()));
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let req = with_peer(request(&[]), "192.0.2.7:5555");
        assert_eq!(key(true, &req), Some("192.0.2.7".parse().unwrap()));
    }

    #[test]
    fn test_proxy_headers_ignored_unless_trusted() {
        let req = with_peer(
            request(&[
                ("cf-connecting-ip", "203.0.113.9"),
                ("x-forwarded-for", "198.51.100.4"),
                ("x-real-ip", "198.51.100.5"),
            ]),
            "192.0.2.7:5555",
        );
        assert_eq!(key(false, &req), Some("192.0.2.7".parse().unwrap()));
    }

    #[test]
    fn test_no_ip_available() {
        assert_eq!(key(true, &request(&[])), None);
        let spoofed = request(&[("x-forwarded-for", "198.51.100.4")]);
        assert_eq!(key(false, &spoofed), None);
    }

    #[tokio::test]
    async fn test_rewrites_too_many_requests() {
        let limited = (
            StatusCode::TOO_MANY_REQUESTS,
            [("retry-after", "10")],
            "Too Many Requests! Wait for 10s",
        )
            .into_response();
        let rewritten = rate_limited_response(limited).await;
        assert_eq!(rewritten.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(rewritten.headers()["retry-after"], "10");
        assert_eq!(rewritten.headers()["content-type"], "application/json");
    }

    #[tokio::test]
    async fn test_passes_other_responses() {
        let ok = StatusCode::OK.into_response();
        assert_eq!(rate_limited_response(ok).await.status(), StatusCode::OK);
    }
}
