//! Cloudflare DNS provider.

use super::{DnsProvider, ProviderResponse, RECORD_TTL};
use crate::config::Site;
use crate::error::{DdnsError, Result};
use crate::http::HttpPolicy;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com";

/// Cloudflare DNS provider.
pub struct CloudflareProvider {
    http: HttpPolicy,
    api_token: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CloudflareResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<CloudflareError>,
}

#[derive(Debug, Deserialize)]
struct CloudflareError {
    message: String,
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider.
    pub fn new(http: HttpPolicy, api_token: String) -> Self {
        Self::with_base_url(http, api_token, DEFAULT_BASE_URL.to_string())
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(http: HttpPolicy, api_token: String, base_url: String) -> Self {
        Self {
            http,
            api_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn record_url(&self, site: &Site) -> String {
        format!(
            "{}/client/v4/zones/{}/dns_records/{}",
            self.base_url, site.zone_id, site.dns_record_id
        )
    }

    /// Check that the API token is valid and active.
    pub async fn verify_token(&self) -> Result<()> {
        let url = format!("{}/client/v4/user/tokens/verify", self.base_url);

        let request = self.http.client().get(&url).bearer_auth(&self.api_token);
        let response: CloudflareResponse = self.http.send(request).await?.json().await?;

        if response.success {
            return Ok(());
        }

        let msg = response
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "Unknown error".to_string());
        Err(DdnsError::Config(format!("Cloudflare token rejected: {}", msg)))
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    fn name(&self) -> &'static str {
        "cloudflare"
    }

    async fn update_record(&self, site: &Site, ip: &str) -> Result<ProviderResponse> {
        let request = UpdateRequest {
            record_type: "A",
            name: &site.name,
            content: ip,
            ttl: RECORD_TTL,
            proxied: site.proxied,
        };

        tracing::debug!(site = %site.name, zone = %site.zone_id, "Sending Cloudflare update");

        let request = self
            .http
            .client()
            .put(self.record_url(site))
            .bearer_auth(&self.api_token)
            .json(&request);
        let response = self.http.send(request).await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(ProviderResponse { status, body })
    }
}
