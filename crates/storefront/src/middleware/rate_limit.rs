//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Account endpoints (login, signup) are limited per client IP to slow down
//! password guessing.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor for the client IP.
///
/// The peer address of the connection is the key. Forwarding headers are
/// client-controlled, so they are read only when `trust_proxy_headers` is
/// set, i.e. when a reverse proxy in front of the server rewrites them.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor {
    trust_proxy_headers: bool,
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req, self.trust_proxy_headers).ok_or(GovernorError::UnableToExtractKey)
    }
}

fn client_ip<T>(req: &Request<T>, trust_proxy_headers: bool) -> Option<IpAddr> {
    if trust_proxy_headers && let Some(ip) = forwarded_ip(req) {
        return Some(ip);
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Client IP as reported by a reverse proxy.
fn forwarded_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    let headers = req.headers();

    // X-Forwarded-For (first IP in the chain)
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter(trust_proxy_headers: bool) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor {
            trust_proxy_headers,
        })
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request_from(peer: &str, forwarded_for: &str) -> Request<()> {
        let mut req = Request::builder()
            .header("x-forwarded-for", forwarded_for)
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        req
    }

    #[test]
    fn test_forwarded_for_ignored_without_proxy() {
        let req = request_from("198.51.100.4:5000", "203.0.113.7");
        assert_eq!(client_ip(&req, false), Some("198.51.100.4".parse().unwrap()));
    }

    #[test]
    fn test_rotating_forwarded_for_keeps_one_key() {
        let first = request_from("198.51.100.4:5000", "203.0.113.7");
        let second = request_from("198.51.100.4:5001", "203.0.113.8");
        assert_eq!(client_ip(&first, false), client_ip(&second, false));
    }

    #[test]
    fn test_forwarded_for_trusted_behind_proxy() {
        let req = request_from("127.0.0.1:5000", "203.0.113.7, 10.0.0.1");
        assert_eq!(client_ip(&req, true), Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_real_ip_then_peer_behind_proxy() {
        let mut req = Request::builder()
            .header("x-real-ip", "192.0.2.9")
            .body(())
            .unwrap();
        assert_eq!(client_ip(&req, true), Some("192.0.2.9".parse().unwrap()));

        req.headers_mut().remove("x-real-ip");
        assert_eq!(client_ip(&req, true), None);
        req.extensions_mut()
            .insert(ConnectInfo("192.0.2.1:443".parse::<SocketAddr>().unwrap()));
        assert_eq!(client_ip(&req, true), Some("192.0.2.1".parse().unwrap()));
    }
}
