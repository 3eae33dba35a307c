//! DNS provider boundary.

mod cloudflare;

#[cfg(test)]
mod tests;

pub use cloudflare::CloudflareProvider;

use crate::config::Site;
use crate::error::Result;
use async_trait::async_trait;

/// TTL in seconds applied to every address record.
pub const RECORD_TTL: u32 = 120;

/// Raw answer of the provider to an update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    /// HTTP status code.
    pub status: u16,
    /// Provider diagnostic body, kept verbatim.
    pub body: String,
}

impl ProviderResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the provider accepted the update (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for DNS providers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &'static str;

    /// Point the site's address record at `ip`.
    ///
    /// Any HTTP answer is returned as `Ok`; only transport failures are
    /// errors.
    async fn update_record(&self, site: &Site, ip: &str) -> Result<ProviderResponse>;
}
