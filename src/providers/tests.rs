//! Provider tests with HTTP mocking.

#[cfg(test)]
mod cloudflare_tests {
    use crate::config::Site;
    use crate::http::HttpPolicy;
    use crate::providers::{CloudflareProvider, DnsProvider};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(mock_server: &MockServer, token: &str) -> CloudflareProvider {
        CloudflareProvider::with_base_url(
            HttpPolicy::default(),
            token.to_string(),
            mock_server.uri(),
        )
    }

    #[tokio::test]
    async fn test_cloudflare_update_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/client/v4/zones/zone-123/dns_records/record-456"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({
                "type": "A",
                "name": "vpn.example.com",
                "content": "2.2.2.2",
                "ttl": 120,
                "proxied": true
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"success":true,"errors":[],"result":{}}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let site = Site::new("zone-123", "record-456", "vpn.example.com", true);
        let response = provider(&mock_server, "test-token")
            .update_record(&site, "2.2.2.2")
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_cloudflare_rejection_keeps_body() {
        let mock_server = MockServer::start().await;
        let body = r#"{"success":false,"errors":[{"code":9109,"message":"Invalid access token"}]}"#;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_string(body))
            .mount(&mock_server)
            .await;

        let site = Site::new("zone-123", "record-456", "vpn.example.com", false);
        let response = provider(&mock_server, "bad-token")
            .update_record(&site, "2.2.2.2")
            .await
            .unwrap();

        assert!(!response.is_success());
        assert_eq!(response.status, 403);
        assert_eq!(response.body, body);
    }

    #[tokio::test]
    async fn test_cloudflare_unreachable() {
        let provider = CloudflareProvider::with_base_url(
            HttpPolicy::default(),
            "token".to_string(),
            "http://127.0.0.1:1".to_string(),
        );

        let site = Site::new("zone", "record", "vpn.example.com", false);
        assert!(provider.update_record(&site, "2.2.2.2").await.is_err());
    }

    #[tokio::test]
    async fn test_cloudflare_verify_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/client/v4/user/tokens/verify"))
            .and(header("Authorization", "Bearer good-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"success":true,"errors":[],"result":{"status":"active"}}"#,
            ))
            .mount(&mock_server)
            .await;

        assert!(provider(&mock_server, "good-token").verify_token().await.is_ok());
    }

    #[tokio::test]
    async fn test_cloudflare_verify_token_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/client/v4/user/tokens/verify"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"success":false,"errors":[{"code":1000,"message":"Invalid API Token"}]}"#,
            ))
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server, "bad-token")
            .verify_token()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid API Token"));
    }
}

#[cfg(test)]
mod response_tests {
    use crate::providers::ProviderResponse;

    #[test]
    fn test_success_range() {
        assert!(ProviderResponse::new(200, "").is_success());
        assert!(ProviderResponse::new(204, "").is_success());
        assert!(!ProviderResponse::new(304, "").is_success());
        assert!(!ProviderResponse::new(429, "").is_success());
    }
}
