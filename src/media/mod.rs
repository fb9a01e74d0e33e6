//! Media library lookups
//!
//! Resolves a feed image URL into a product image reference: an existing
//! media asset when one with the same file stem is already uploaded, the raw
//! URL when the image is reachable but unknown, or nothing when the URL does
//! not answer.

use crate::error::{Result, ResultExt};
use crate::http::{RequestConfig, Transport};
use crate::model::RemoteImage;
use crate::retry::{classify_status, retry, Attempt, StatusClass};
use crate::types::RemoteId;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Media search endpoint
pub const MEDIA_PATH: &str = "/wp-json/wp/v2/media";

#[derive(Debug, Deserialize)]
struct MediaItem {
    id: RemoteId,
}

/// Search term for an image URL: file name without directory or extension
pub fn file_stem(source: &str) -> String {
    let name = match url::Url::parse(source) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => source.rsplit('/').next().unwrap_or(source).to_string(),
    };
    match name.rfind('.') {
        Some(dot) if dot > 0 => name[..dot].to_string(),
        _ => name,
    }
}

/// Client for the media library API
#[derive(Debug, Clone)]
pub struct MediaClient {
    transport: Arc<dyn Transport>,
}

impl MediaClient {
    /// Create a client over `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// ID of an uploaded asset whose name matches `source`'s file stem.
    ///
    /// 429 is retried with a doubling delay; no match is `Ok(None)`.
    pub async fn find_image_id(&self, source: &str) -> Result<Option<RemoteId>> {
        let stem = file_stem(source);
        if stem.is_empty() {
            return Ok(None);
        }

        let transport = self.transport.as_ref();
        let url = transport.url(MEDIA_PATH);
        let url = url.as_str();
        let policy = transport.policy();
        let stem = stem.as_str();

        let items: Vec<MediaItem> = retry(
            transport.sleeper(),
            policy.max_rate_limit_retries,
            |attempt| async move {
                let request = RequestConfig::new()
                    .query("search", stem)
                    .with_network_retry();
                let response = match transport.request(Method::GET, url, request).await {
                    Ok(response) => response,
                    Err(e) => return Attempt::Fatal(e),
                };
                match classify_status(response.status, &[StatusCode::OK]) {
                    StatusClass::Success => match response.json() {
                        Ok(items) => Attempt::Success(items),
                        Err(e) => Attempt::Fatal(e),
                    },
                    StatusClass::RateLimited => {
                        let delay = policy.escalated_base(attempt);
                        debug!(stem, ?delay, "media search rate limited");
                        Attempt::Retry(delay)
                    }
                    _ => Attempt::Fatal(response.status_error()),
                }
            },
        )
        .await?;

        Ok(items.first().map(|item| item.id))
    }

    /// Resolve a feed image URL into an image reference.
    ///
    /// The URL is checked with an anonymous `HEAD`; only a 200 is considered
    /// reachable.
    pub async fn resolve_image(&self, source: &str) -> Result<Option<RemoteImage>> {
        let source = source.trim();
        if source.is_empty() {
            return Ok(None);
        }

        let head = self
            .transport
            .request(
                Method::HEAD,
                source,
                RequestConfig::new().anonymous().with_network_retry(),
            )
            .await
            .with_context(|| format!("failed to verify image URL {source}"))?;

        if head.status != StatusCode::OK {
            warn!(url = source, status = head.status.as_u16(), "image not reachable");
            return Ok(None);
        }

        match self.find_image_id(source).await? {
            Some(id) => {
                debug!(url = source, id, "image already uploaded");
                if let Some(delay) = self.transport.policy().pacing_delay() {
                    self.transport.sleeper().sleep(delay).await;
                }
                Ok(Some(RemoteImage::asset(id)))
            }
            None => Ok(Some(RemoteImage::url(source))),
        }
    }

    /// Delay to wait before checking whether an interrupted upload landed
    pub fn settle_delay(&self) -> Duration {
        self.transport.policy().pause_delay()
    }
}
