//! Client identity resolution for rate limiting.

use axum::http::HeaderMap;
use std::net::SocketAddr;

pub const UNKNOWN_CLIENT: &str = "unknown-client";
const MAX_KEY_CHARS: usize = 64;

/// Where the client identity is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Trust `X-Forwarded-For` / `X-Real-IP` set by a reverse proxy, then the peer address
    ForwardedHeaders,
    /// Use the socket peer address only
    PeerAddress,
}

/// Derives rate-limit keys from inbound requests
#[derive(Debug, Clone)]
pub struct ClientKeyResolver {
    strategy: KeyStrategy,
}

impl ClientKeyResolver {
    pub fn new(strategy: KeyStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> KeyStrategy {
        self.strategy
    }

    /// Resolve the client key for a request
    pub fn resolve(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        let key = match self.strategy {
            KeyStrategy::ForwardedHeaders => {
                Self::forwarded_ip(headers).or_else(|| peer.map(|addr| addr.ip().to_string()))
            }
            KeyStrategy::PeerAddress => peer.map(|addr| addr.ip().to_string()),
        };

        match key {
            Some(key) => Self::sanitize_key(&key),
            None => UNKNOWN_CLIENT.to_string(),
        }
    }

    /// Extract client IP from proxy headers
    pub fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
        let from_header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        from_header("x-forwarded-for").or_else(|| from_header("x-real-ip"))
    }

    /// Keep keys short and free of unexpected characters
    pub fn sanitize_key(key: &str) -> String {
        key.chars()
            .take(MAX_KEY_CHARS)
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl Default for ClientKeyResolver {
    fn default() -> Self {
        Self::new(KeyStrategy::ForwardedHeaders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("198.51.100.7:54321".parse().unwrap())
    }

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("192.168.1.1, 10.0.0.1"));

        let key = ClientKeyResolver::default().resolve(&headers, peer());
        assert_eq!(key, "192.168.1.1");
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  ,10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.1"));

        let key = ClientKeyResolver::default().resolve(&headers, peer());
        assert_eq!(key, "203.0.113.1");
    }

    #[test]
    fn test_peer_address_fallback() {
        let key = ClientKeyResolver::default().resolve(&HeaderMap::new(), peer());
        assert_eq!(key, "198.51.100.7");
    }

    #[test]
    fn test_unknown_client() {
        let key = ClientKeyResolver::default().resolve(&HeaderMap::new(), None);
        assert_eq!(key, UNKNOWN_CLIENT);
    }

    #[test]
    fn test_peer_strategy_ignores_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("192.168.1.1"));

        let resolver = ClientKeyResolver::new(KeyStrategy::PeerAddress);
        assert_eq!(resolver.resolve(&headers, peer()), "198.51.100.7");
        assert_eq!(resolver.resolve(&headers, None), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(ClientKeyResolver::sanitize_key("2001:db8::1"), "2001:db8::1");
        assert_eq!(ClientKeyResolver::sanitize_key("evil key$"), "evil_key_");
        assert_eq!(ClientKeyResolver::sanitize_key(&"a".repeat(500)).len(), 64);
    }
}
