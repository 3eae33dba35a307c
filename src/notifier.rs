//! Best-effort push notifications through ntfy.

use crate::config::Config;
use crate::error::{DdnsError, Result};
use crate::http::HttpPolicy;
use async_trait::async_trait;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// A human-readable status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: Level,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: Level::Info,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: Level::Error,
        }
    }
}

/// Delivery channel for status messages.
///
/// Delivery is fire-and-forget: implementations log their failures and
/// never report them back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification);
}

/// Notifier posting to an ntfy topic.
pub struct NtfyNotifier {
    http: HttpPolicy,
    endpoint: Option<String>,
    token: Option<String>,
}

impl NtfyNotifier {
    /// Create a notifier for `host`/`path`. A host without a scheme is
    /// reached over HTTPS.
    pub fn new(http: HttpPolicy, host: &str, path: &str, token: Option<String>) -> Self {
        let host = host.trim().trim_end_matches('/');
        let endpoint = if host.is_empty() {
            None
        } else if host.starts_with("http://") || host.starts_with("https://") {
            Some(format!("{}/{}", host, path.trim_start_matches('/')))
        } else {
            Some(format!("https://{}/{}", host, path.trim_start_matches('/')))
        };

        Self {
            http,
            endpoint,
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// A notifier that drops every message.
    pub fn disabled(http: HttpPolicy) -> Self {
        Self {
            http,
            endpoint: None,
            token: None,
        }
    }

    pub fn from_config(http: HttpPolicy, config: &Config) -> Self {
        if !config.notifications_enabled() {
            return Self::disabled(http);
        }

        Self::new(
            http,
            config.ntfy_host.as_deref().unwrap_or_default(),
            config.ntfy_path.as_deref().unwrap_or_default(),
            config.ntfy_password.clone(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn deliver(&self, endpoint: &str, notification: &Notification) -> Result<()> {
        let mut request = self
            .http
            .client()
            .post(endpoint)
            .form(&[("message", notification.message.as_str())]);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        if notification.level == Level::Error {
            request = request.header("Priority", "high").header("Tags", "warning");
        }

        let response = self.http.send(request).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DdnsError::Notification(format!("HTTP {}: {}", status, body)));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for NtfyNotifier {
    async fn notify(&self, notification: &Notification) {
        let Some(endpoint) = &self.endpoint else {
            tracing::info!(
                message = %notification.message,
                "Notifications not configured, skipping"
            );
            return;
        };

        match self.deliver(endpoint, notification).await {
            Ok(()) => tracing::debug!(endpoint = %endpoint, "Notification delivered"),
            Err(e) => tracing::warn!(endpoint = %endpoint, error = %e, "Notification failed"),
        }
    }
}
