//! Enrichment client
//!
//! Looks a key up against the external phrase API and hands back the raw
//! response body. The body is never parsed; it is stored verbatim.

use crate::config::{EnrichmentConfig, DATE_FORMAT};
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

#[async_trait]
pub trait Enricher: Send + Sync {
    /// Fetch the enrichment document for `key`
    async fn lookup(&self, key: &str) -> Result<Vec<u8>>;
}

/// HTTP enrichment client
pub struct HttpEnricher {
    client: Client,
    url: String,
    api_key: String,
    per_page: u32,
    start_date: String,
    end_date: String,
}

impl HttpEnricher {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IngestError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            per_page: config.per_page,
            start_date: config.start_date.format(DATE_FORMAT).to_string(),
            end_date: config.end_date.format(DATE_FORMAT).to_string(),
        })
    }

    /// Query parameters sent with every lookup
    fn query(&self, key: &str) -> [(&'static str, String); 5] {
        [
            ("phrase", key.to_string()),
            ("per_page", self.per_page.to_string()),
            ("apikey", self.api_key.clone()),
            ("start_date", self.start_date.clone()),
            ("end_date", self.end_date.clone()),
        ]
    }
}

#[async_trait]
impl Enricher for HttpEnricher {
    #[instrument(skip(self))]
    async fn lookup(&self, key: &str) -> Result<Vec<u8>> {
        let unreachable = |e: reqwest::Error| IngestError::EnrichmentUnreachable {
            key: key.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(&self.url)
            .query(&self.query(key))
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::EnrichmentRequestFailed {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(unreachable)?;
        debug!(bytes = body.len(), "Enrichment response received");

        Ok(body.to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> EnrichmentConfig {
        let mut config = PipelineConfig::default().enrichment;
        config.url = format!("{}/api/1/phrases/legislator.json", server.uri());
        config.api_key = "secret".to_string();
        config.timeout_secs = 5;
        config
    }

    #[tokio::test]
    async fn test_lookup_sends_fixed_parameters() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/1/phrases/legislator.json"))
            .and(query_param("phrase", "United States"))
            .and(query_param("per_page", "20"))
            .and(query_param("apikey", "secret"))
            .and(query_param("start_date", "2014-01-01"))
            .and(query_param("end_date", "2015-04-01"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let enricher = HttpEnricher::new(&config_for(&server)).unwrap();
        let body = enricher.lookup("United States").await.unwrap();
        assert_eq!(body, br#"{"results":[]}"#);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let enricher = HttpEnricher::new(&config_for(&server)).unwrap();
        let err = enricher.lookup("Mali").await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::EnrichmentRequestFailed { status: 403, ref key } if key == "Mali"
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let mut config = PipelineConfig::default().enrichment;
        // Port 9 (discard) is not expected to accept HTTP connections.
        config.url = "http://127.0.0.1:9/lookup".to_string();
        config.timeout_secs = 2;

        let enricher = HttpEnricher::new(&config).unwrap();
        let err = enricher.lookup("Peru").await.unwrap_err();
        assert!(matches!(err, IngestError::EnrichmentUnreachable { .. }));
    }
}
