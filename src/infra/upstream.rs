//! Client for the upstream CMS content API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::UpstreamSettings;
use crate::domain::entities::{PostRecord, TagRecord};

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status code: {status}")]
    Status { status: StatusCode },
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// JSON envelope wrapping every upstream collection response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub total: u64,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// Seam between the poller and the upstream transport.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// All blog tags, including soft-deleted ones.
    async fn fetch_tags(&self) -> Result<Vec<TagRecord>, UpstreamError>;

    /// Published posts carrying the given tag ID.
    async fn fetch_posts(&self, tag_id: &str) -> Result<Vec<PostRecord>, UpstreamError>;
}

pub struct CmsClient {
    client: Client,
    base: Url,
    api_key: String,
}

impl CmsClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(concat!("feedrelay/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout)
            .build()?;
        // A trailing slash keeps Url::join from replacing the last path segment.
        let base = Url::parse(&format!("{}/", settings.base_url.trim_end_matches('/')))?;
        Ok(Self {
            client,
            base,
            api_key: settings.api_key.clone(),
        })
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Envelope<T>, UpstreamError> {
        let mut url = self.base.join(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UpstreamError::Status { status });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ContentApi for CmsClient {
    async fn fetch_tags(&self) -> Result<Vec<TagRecord>, UpstreamError> {
        let envelope: Envelope<TagRecord> = self.get_envelope("blogs/tags", &[]).await?;
        debug!(
            target = "feedrelay::upstream",
            total = envelope.total,
            "tags retrieved"
        );
        Ok(envelope.results)
    }

    async fn fetch_posts(&self, tag_id: &str) -> Result<Vec<PostRecord>, UpstreamError> {
        let envelope: Envelope<PostRecord> = self
            .get_envelope("blogs/posts", &[("tagId__in", tag_id), ("state", "PUBLISHED")])
            .await?;
        debug!(
            target = "feedrelay::upstream",
            tag_id,
            total = envelope.total,
            "posts retrieved"
        );
        Ok(envelope.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_decodes_results_and_total() {
        let envelope: Envelope<TagRecord> = serde_json::from_str(
            r#"{"total": 2, "results": [{"id": "1", "name": "launch"}, {"id": "2", "name": "press"}]}"#,
        )
        .expect("valid envelope");
        assert_eq!(envelope.total, 2);
        assert_eq!(envelope.results.len(), 2);
        assert_eq!(envelope.results[0].name, "launch");
    }

    #[test]
    fn envelope_tolerates_missing_fields() {
        let envelope: Envelope<PostRecord> = serde_json::from_str("{}").expect("valid envelope");
        assert_eq!(envelope.total, 0);
        assert!(envelope.results.is_empty());
    }

    #[test]
    fn status_error_reports_the_observed_code() {
        let err = UpstreamError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert_eq!(err.to_string(), "unexpected status code: 500 Internal Server Error");
    }
}
