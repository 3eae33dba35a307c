//! Shared HTTP transport with an explicit timeout and retry policy.

use crate::config::HttpConfig;
use crate::error::{DdnsError, Result};
use std::time::Duration;

/// Outbound HTTP client used by the resolver, provider and notifier.
#[derive(Debug, Clone)]
pub struct HttpPolicy {
    client: reqwest::Client,
    timeout: Duration,
    retries: u32,
}

impl HttpPolicy {
    /// Build a client honouring the given timeout and retry count.
    pub fn new(timeout: Duration, retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("flare-ddns/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DdnsError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout,
            retries,
        })
    }

    /// Build the policy described by the `[HTTP]` config table.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Self::new(Duration::from_secs(config.timeout_secs), config.retries)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Send a request, retrying transport failures up to `retries` times.
    ///
    /// Any HTTP status counts as a delivered response and is never retried.
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            let pending = request
                .try_clone()
                .ok_or_else(|| DdnsError::Network("Request body cannot be retried".to_string()))?;

            match pending.send().await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    tracing::debug!(attempt, error = %e, "Request failed, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
impl Default for HttpPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default()).expect("default HTTP client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_from_config() {
        let policy = HttpPolicy::from_config(&HttpConfig {
            timeout_secs: 3,
            retries: 2,
        })
        .unwrap();
        assert_eq!(policy.timeout(), Duration::from_secs(3));
        assert_eq!(policy.retries(), 2);
    }

    #[test]
    fn test_default_policy_uses_configured_timeout() {
        let policy = HttpPolicy::default();
        assert_eq!(policy.timeout(), Duration::from_secs(10));
        assert_eq!(policy.retries(), 0);
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let policy = HttpPolicy::new(Duration::from_secs(5), 3).unwrap();
        let response = policy
            .send(policy.client().get(mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 500);
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_network_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let policy = HttpPolicy::new(Duration::from_millis(50), 1).unwrap();
        let result = policy.send(policy.client().get(mock_server.uri())).await;

        assert!(matches!(result, Err(DdnsError::Network(_))));
    }
}
