use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Response, StatusCode,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ImageServiceConfig;

/// Header carrying the service-wide credential for the image service.
const ACCESS_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-api-private-token");

/// Image bytes as sent to the image service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPayload {
    /// Base64 encoded image data, passed through untouched.
    pub data: String,
    pub content_type: String,
}

/// The fields of a remote image this service mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteImage {
    pub id: String,
    pub image_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Transport level: refused, reset, timed out.
    #[error("image service unreachable: {0}")]
    Network(#[source] reqwest::Error),
    #[error("image service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected image service response: {0}")]
    Decode(String),
    #[error("cannot build image service url: {0}")]
    InvalidUrl(String),
}

impl UpstreamError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::Status { status: 404, .. })
    }
}

/// One call per verb on the remote image service. No retries.
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Expects 201 and the created image.
    async fn create(&self, payload: &ContentPayload) -> Result<RemoteImage, UpstreamError>;
    /// Expects 204; the response carries no body.
    async fn replace(&self, id: &str, payload: &ContentPayload) -> Result<(), UpstreamError>;
    /// Expects 204.
    async fn delete(&self, id: &str) -> Result<(), UpstreamError>;
    /// Expects 200 and the canonical image.
    async fn fetch(&self, id: &str) -> Result<RemoteImage, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct HttpContentClient {
    base: Url,
    client: Client,
}

impl HttpContentClient {
    pub fn new(cfg: &ImageServiceConfig) -> anyhow::Result<Self> {
        let base = Url::parse(&cfg.base_url).context("parse IMAGE_SERVICE_URL")?;
        anyhow::ensure!(!base.cannot_be_a_base(), "IMAGE_SERVICE_URL must be a base url");

        let mut token =
            HeaderValue::from_str(&cfg.access_token).context("IMAGE_SERVICE_TOKEN is not a valid header")?;
        token.set_sensitive(true);
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCESS_TOKEN_HEADER, token);

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build image service client")?;

        Ok(Self { base, client })
    }

    /// `<base>/images` or `<base>/images/<id>`, with `id` escaped as one segment.
    fn endpoint(&self, id: Option<&str>) -> Result<Url, UpstreamError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| UpstreamError::InvalidUrl(self.base.to_string()))?;
            segments.pop_if_empty().push("images");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn expect(resp: Response, expected: StatusCode) -> Result<Response, UpstreamError> {
        if resp.status() == expected {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        debug!(status, "image service rejected call");
        Err(UpstreamError::Status { status, body })
    }

    async fn decode(resp: Response) -> Result<RemoteImage, UpstreamError> {
        let body = resp.text().await.map_err(UpstreamError::Network)?;
        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ContentClient for HttpContentClient {
    #[instrument(skip(self, payload), fields(content_type = %payload.content_type))]
    async fn create(&self, payload: &ContentPayload) -> Result<RemoteImage, UpstreamError> {
        let resp = self
            .client
            .post(self.endpoint(None)?)
            .json(payload)
            .send()
            .await
            .map_err(UpstreamError::Network)?;
        Self::decode(Self::expect(resp, StatusCode::CREATED).await?).await
    }

    #[instrument(skip(self, payload))]
    async fn replace(&self, id: &str, payload: &ContentPayload) -> Result<(), UpstreamError> {
        let resp = self
            .client
            .put(self.endpoint(Some(id))?)
            .json(payload)
            .send()
            .await
            .map_err(UpstreamError::Network)?;
        Self::expect(resp, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), UpstreamError> {
        let resp = self
            .client
            .delete(self.endpoint(Some(id))?)
            .send()
            .await
            .map_err(UpstreamError::Network)?;
        Self::expect(resp, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch(&self, id: &str) -> Result<RemoteImage, UpstreamError> {
        let resp = self
            .client
            .get(self.endpoint(Some(id))?)
            .send()
            .await
            .map_err(UpstreamError::Network)?;
        Self::decode(Self::expect(resp, StatusCode::OK).await?).await
    }
}
