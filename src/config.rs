//! Configuration management for flare-ddns.
//!
//! The configuration is read once at startup and handed to each component
//! by reference. Keys are upper-case to stay compatible with existing
//! `config.json` files:
//!
//! ```toml
//! CLOUDFLARE_API_KEY = "$CF_API_TOKEN"
//! NTFY_HOST = "ntfy.sh"
//! NTFY_PATH = "my-ddns"
//!
//! [[PROJECTS]]
//! zone_id = "85fa5a3e1d87143f27dff1ce75096d06"
//! dns_record_id = "e9047de14c4bcccc1e29ff046a52240a"
//! name = "home.example.com"
//! proxied = false
//! ```

use crate::error::{DdnsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_IP_SERVICE: &str = "https://ifconfig.me/ip";
const DEFAULT_CLOUDFLARE_API_URL: &str = "https://api.cloudflare.com";
const DEFAULT_STATE_PATH: &str = "cloudflare.db.jsonl";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cloudflare API token (or environment variable name if prefixed with $).
    #[serde(rename = "CLOUDFLARE_API_KEY")]
    pub cloudflare_api_key: String,

    /// Accepted for compatibility with older config files, never used.
    #[serde(
        rename = "CLOUDFLARE_EMAIL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cloudflare_email: Option<String>,

    /// Cloudflare API base URL.
    #[serde(rename = "CLOUDFLARE_API_URL", default = "default_cloudflare_api_url")]
    pub cloudflare_api_url: String,

    /// ntfy server host (e.g. "ntfy.sh"). Notifications are off when empty.
    #[serde(rename = "NTFY_HOST", default, skip_serializing_if = "Option::is_none")]
    pub ntfy_host: Option<String>,

    /// ntfy topic path.
    #[serde(rename = "NTFY_PATH", default, skip_serializing_if = "Option::is_none")]
    pub ntfy_path: Option<String>,

    /// ntfy bearer token.
    #[serde(
        rename = "NTFY_PASSWORD",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ntfy_password: Option<String>,

    /// "What is my IP" service returning a plaintext IPv4 address.
    #[serde(rename = "IP_SERVICE", default = "default_ip_service")]
    pub ip_service: String,

    /// Location of the IP history file.
    #[serde(rename = "STATE_PATH", default = "default_state_path")]
    pub state_path: PathBuf,

    /// When the new baseline is written relative to provider updates.
    #[serde(rename = "BASELINE", default)]
    pub baseline: BaselinePolicy,

    /// Timeout and retry policy shared by every outbound request.
    #[serde(rename = "HTTP", default)]
    pub http: HttpConfig,

    /// DNS records to keep in sync, in notification order.
    #[serde(rename = "PROJECTS", default)]
    pub projects: Vec<Site>,
}

fn default_cloudflare_api_url() -> String {
    DEFAULT_CLOUDFLARE_API_URL.to_string()
}

fn default_ip_service() -> String {
    DEFAULT_IP_SERVICE.to_string()
}

fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_PATH)
}

/// A DNS address record to maintain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Cloudflare zone identifier.
    pub zone_id: String,
    /// Identifier of the A record inside the zone.
    pub dns_record_id: String,
    /// Fully-qualified hostname the record answers for.
    pub name: String,
    /// Whether Cloudflare should proxy traffic for this record.
    #[serde(default)]
    pub proxied: bool,
}

impl Site {
    pub fn new(
        zone_id: impl Into<String>,
        dns_record_id: impl Into<String>,
        name: impl Into<String>,
        proxied: bool,
    ) -> Self {
        Self {
            zone_id: zone_id.into(),
            dns_record_id: dns_record_id.into(),
            name: name.into(),
            proxied,
        }
    }
}

/// Ordering of the baseline write against the provider updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePolicy {
    /// Record the new IP before touching any site. A crash mid-run leaves
    /// the remaining sites stale until the next IP change.
    #[default]
    BeforeApply,
    /// Record the new IP only once every site accepted it. A site that
    /// keeps failing makes every later run retry all sites.
    AfterSuccess,
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts after a transport failure (0 = single attempt).
    #[serde(default)]
    pub retries: u32,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: 0,
        }
    }
}

impl Config {
    /// Create a configuration with defaults for everything but the API key.
    pub fn new(cloudflare_api_key: impl Into<String>) -> Self {
        Self {
            cloudflare_api_key: cloudflare_api_key.into(),
            cloudflare_email: None,
            cloudflare_api_url: default_cloudflare_api_url(),
            ntfy_host: None,
            ntfy_path: None,
            ntfy_password: None,
            ip_service: default_ip_service(),
            state_path: default_state_path(),
            baseline: BaselinePolicy::default(),
            http: HttpConfig::default(),
            projects: Vec::new(),
        }
    }

    /// Candidate config locations, in lookup order.
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("flare-ddns").join("config.toml"));
        }
        paths.push(PathBuf::from("/etc/flare-ddns/config.toml"));
        paths.push(PathBuf::from("config.json"));
        paths.push(PathBuf::from("config.toml"));
        paths
    }

    /// Load configuration from the first existing default location.
    pub fn load() -> Result<Self> {
        let path = Self::default_paths()
            .into_iter()
            .find(|p| p.exists())
            .ok_or_else(|| DdnsError::Config("No configuration file found".to_string()))?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// `.json` files are parsed as JSON, everything else as TOML.
    /// Credentials are resolved from the environment afterwards.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DdnsError::Config(format!(
                "Configuration file {} does not exist",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content, is_json(path))?;
        config.resolve_secrets();
        tracing::debug!(
            path = %path.display(),
            sites = config.projects.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse a configuration document.
    pub fn parse(content: &str, json: bool) -> Result<Self> {
        if json {
            serde_json::from_str(content)
                .map_err(|e| DdnsError::Config(format!("Invalid JSON config: {}", e)))
        } else {
            Ok(toml::from_str(content)?)
        }
    }

    /// Replace `$VAR` credential references with their environment values.
    fn resolve_secrets(&mut self) {
        self.cloudflare_api_key = resolve_env(&self.cloudflare_api_key);
        if let Some(password) = self.ntfy_password.as_mut() {
            *password = resolve_env(password);
        }
    }

    /// Check the configuration for values that would make every run fail.
    pub fn validate(&self) -> Result<()> {
        if self.cloudflare_api_key.trim().is_empty() {
            return Err(DdnsError::Config(
                "CLOUDFLARE_API_KEY must not be empty".to_string(),
            ));
        }

        if self.http.timeout_secs == 0 {
            return Err(DdnsError::Config(
                "HTTP.timeout_secs must be greater than zero".to_string(),
            ));
        }

        for (index, site) in self.projects.iter().enumerate() {
            let missing = [
                ("zone_id", &site.zone_id),
                ("dns_record_id", &site.dns_record_id),
                ("name", &site.name),
            ]
            .into_iter()
            .find(|(_, value)| value.trim().is_empty());

            if let Some((field, _)) = missing {
                return Err(DdnsError::Config(format!(
                    "PROJECTS[{}]: {} must not be empty",
                    index, field
                )));
            }
        }

        Ok(())
    }

    /// Whether enough ntfy settings are present to send anything.
    pub fn notifications_enabled(&self) -> bool {
        self.ntfy_host
            .as_deref()
            .is_some_and(|host| !host.trim().is_empty())
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Generate example configuration.
    pub fn example() -> Self {
        Self {
            ntfy_host: Some("ntfy.sh".to_string()),
            ntfy_path: Some("my-ddns-topic".to_string()),
            ntfy_password: Some("$NTFY_TOKEN".to_string()),
            projects: vec![
                Site::new("your-zone-id", "your-record-id", "home.example.com", false),
                Site::new("other-zone-id", "other-record-id", "www.example.org", true),
            ],
            ..Self::new("$CF_API_TOKEN")
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Resolve environment variable references (values starting with $).
pub(crate) fn resolve_env(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_else(|_| {
            tracing::warn!("Environment variable {} not set", var_name);
            value.to_string()
        })
    } else {
        value.to_string()
    }
}
