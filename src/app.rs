//! Wiring of the concrete components described by a [`Config`].

use crate::config::Config;
use crate::engine::{RunReport, SyncEngine};
use crate::error::Result;
use crate::http::HttpPolicy;
use crate::notifier::NtfyNotifier;
use crate::providers::CloudflareProvider;
use crate::resolver::{HttpIpResolver, IpResolver};
use crate::store::{FileStateStore, IpObservation, StateStore};

/// Current IP next to the stored baseline.
#[derive(Debug, Clone)]
pub struct Status {
    pub current_ip: String,
    pub baseline: Option<IpObservation>,
}

impl Status {
    pub fn changed(&self) -> bool {
        self.baseline.as_ref().map(|b| b.ip.as_str()) != Some(self.current_ip.as_str())
    }
}

/// A fully wired updater.
pub struct App {
    config: Config,
    resolver: HttpIpResolver,
    store: FileStateStore,
    provider: CloudflareProvider,
    notifier: NtfyNotifier,
}

impl App {
    /// Validate the configuration and build every component from it.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let http = HttpPolicy::from_config(&config.http)?;
        let resolver = HttpIpResolver::new(http.clone(), config.ip_service.clone());
        let store = FileStateStore::new(config.state_path.clone());
        let provider = CloudflareProvider::with_base_url(
            http.clone(),
            config.cloudflare_api_key.clone(),
            config.cloudflare_api_url.clone(),
        );
        let notifier = NtfyNotifier::from_config(http, &config);

        if !notifier.is_enabled() {
            tracing::info!("NTFY_HOST not set, notifications disabled");
        }

        Ok(Self {
            config,
            resolver,
            store,
            provider,
            notifier,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one sync pass over every configured site.
    pub async fn run(&self, force: bool) -> Result<RunReport> {
        SyncEngine::new(
            &self.resolver,
            &self.store,
            &self.provider,
            &self.notifier,
            &self.config.projects,
        )
        .with_baseline(self.config.baseline)
        .run(force)
        .await
    }

    /// Resolve the current IP without touching DNS or state.
    pub async fn status(&self) -> Result<Status> {
        let current_ip = self.resolver.resolve().await?;
        let baseline = self.store.latest().await?;
        Ok(Status {
            current_ip,
            baseline,
        })
    }

    /// Stored observations, oldest first.
    pub async fn history(&self) -> Result<Vec<IpObservation>> {
        self.store.history().await
    }

    /// Check the Cloudflare token against the API.
    pub async fn verify_credentials(&self) -> Result<()> {
        self.provider.verify_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Site;
    use crate::error::DdnsError;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, state: &std::path::Path) -> Config {
        let mut config = Config::new("cf-token");
        config.ip_service = format!("{}/ip", server.uri());
        config.cloudflare_api_url = server.uri();
        config.ntfy_host = Some(server.uri());
        config.ntfy_path = Some("ddns".to_string());
        config.ntfy_password = Some("ntfy-token".to_string());
        config.state_path = state.join("history.jsonl");
        config.projects = vec![Site::new("zone-a", "record-a", "a.example", false)];
        config
    }

    #[tokio::test]
    async fn test_first_run_end_to_end() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string("10.0.0.1"))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/client/v4/zones/zone-a/dns_records/record-a"))
            .and(header("Authorization", "Bearer cf-token"))
            .and(body_string_contains(r#""content":"10.0.0.1""#))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/ddns"))
            .and(header("Authorization", "Bearer ntfy-token"))
            .and(body_string_contains("updated+a.example"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let app = App::from_config(config_for(&server, dir.path())).unwrap();
        let report = app.run(false).await.unwrap();

        assert!(report.changed);
        assert_eq!(report.applied(), 1);

        let history = app.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].ip, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string("10.0.0.1"))
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let app = App::from_config(config_for(&server, dir.path())).unwrap();
        app.run(false).await.unwrap();
        let report = app.run(false).await.unwrap();

        assert!(!report.changed);
        assert_eq!(report.skipped(), 1);
        assert_eq!(app.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolution_failure_leaves_no_state() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let app = App::from_config(config_for(&server, dir.path())).unwrap();
        let result = app.run(false).await;

        assert!(matches!(result, Err(DdnsError::Resolution(_))));
        assert!(!dir.path().join("history.jsonl").exists());
    }

    #[tokio::test]
    async fn test_status_reports_change() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string("198.51.100.4"))
            .mount(&server)
            .await;

        let app = App::from_config(config_for(&server, dir.path())).unwrap();
        let status = app.status().await.unwrap();

        assert_eq!(status.current_ip, "198.51.100.4");
        assert!(status.baseline.is_none());
        assert!(status.changed());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config::new("");
        assert!(matches!(App::from_config(config), Err(DdnsError::Config(_))));
    }
}
