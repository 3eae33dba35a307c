//! Public IP resolution.

use crate::error::{DdnsError, Result};
use crate::http::HttpPolicy;
use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Source of the caller's current public IPv4 address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Look up the current public address, returned in the textual form
    /// the service reported it in.
    async fn resolve(&self) -> Result<String>;
}

/// Resolver backed by a plaintext "what is my IP" HTTP service.
pub struct HttpIpResolver {
    http: HttpPolicy,
    url: String,
}

impl HttpIpResolver {
    pub fn new(http: HttpPolicy, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> Result<String> {
        let response = self
            .http
            .send(self.http.client().get(&self.url))
            .await
            .map_err(|e| DdnsError::Resolution(format!("{} unreachable: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(DdnsError::Resolution(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| DdnsError::Resolution(format!("Unreadable response: {}", e)))?;
        let ip = text.trim();

        if ip.parse::<Ipv4Addr>().is_err() {
            return Err(DdnsError::Resolution(format!(
                "Invalid IPv4 response from {}: {:?}",
                self.url, ip
            )));
        }

        tracing::debug!(ip, service = %self.url, "Resolved public IP");
        Ok(ip.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn resolver_for(body: ResponseTemplate) -> (MockServer, HttpIpResolver) {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(body)
            .expect(1)
            .mount(&mock_server)
            .await;

        let resolver =
            HttpIpResolver::new(HttpPolicy::default(), format!("{}/ip", mock_server.uri()));
        (mock_server, resolver)
    }

    #[tokio::test]
    async fn test_resolve_plain_ip() {
        let (_server, resolver) =
            resolver_for(ResponseTemplate::new(200).set_body_string("203.0.113.7\n")).await;

        assert_eq!(resolver.resolve().await.unwrap(), "203.0.113.7");
    }

    #[tokio::test]
    async fn test_resolve_rejects_garbage() {
        let (_server, resolver) =
            resolver_for(ResponseTemplate::new(200).set_body_string("<html>busy</html>")).await;

        let result = resolver.resolve().await;
        assert!(matches!(result, Err(DdnsError::Resolution(_))));
    }

    #[tokio::test]
    async fn test_resolve_rejects_ipv6() {
        let (_server, resolver) =
            resolver_for(ResponseTemplate::new(200).set_body_string("2001:db8::1")).await;

        assert!(resolver.resolve().await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_rejects_error_status() {
        let (_server, resolver) =
            resolver_for(ResponseTemplate::new(503).set_body_string("1.2.3.4")).await;

        let err = resolver.resolve().await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_resolve_unreachable() {
        let resolver = HttpIpResolver::new(HttpPolicy::default(), "http://127.0.0.1:1/ip");

        let result = resolver.resolve().await;
        assert!(matches!(result, Err(DdnsError::Resolution(_))));
    }
}
