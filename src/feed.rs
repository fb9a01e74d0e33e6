//! Supplier feed loading
//!
//! The feed is either read from a local file or fetched from the supplier API
//! with a bearer token. A fetched feed is backed up to disk before parsing so
//! a bad document can be inspected afterwards.

use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig, Transport};
use crate::model::SourceFeed;
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default supplier endpoint
pub const DEFAULT_FEED_URL: &str =
    "https://feedgen.tarsusonline.co.za/api/DataFeed/Customer-ProductCatalogue";

/// Default feed file (read source, and backup target for the API source)
pub const DEFAULT_FEED_FILE: &str = "data.json";

/// Where the product feed comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// Local JSON document
    File(PathBuf),
    /// Supplier API
    Api {
        /// Feed URL
        url: String,
        /// Bearer token
        token: String,
        /// Copy of the fetched document, written before parsing
        backup: Option<PathBuf>,
    },
}

impl FeedSource {
    /// Fetch (or read) and parse the feed
    pub async fn load(&self) -> Result<SourceFeed> {
        let bytes = match self {
            Self::File(path) => read_file(path)?,
            Self::Api { url, token, backup } => {
                let bytes = fetch(url, token).await?;
                if let Some(path) = backup {
                    if let Err(e) = fs::write(path, &bytes) {
                        warn!(path = %path.display(), error = %e, "failed to back up feed");
                    }
                }
                bytes
            }
        };

        let feed = SourceFeed::from_slice(&bytes)?;
        info!(
            products = feed.products.len(),
            rejected = feed.rejected,
            source = %self,
            "feed loaded"
        );
        Ok(feed)
    }
}

impl std::fmt::Display for FeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Api { url, .. } => f.write_str(url),
        }
    }
}

fn read_file(path: &Path) -> Result<Bytes> {
    match fs::read(path) {
        Ok(bytes) => Ok(Bytes::from(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::FileNotFound {
            path: path.display().to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

async fn fetch(url: &str, token: &str) -> Result<Bytes> {
    let client = HttpClient::with_auth(HttpClientConfig::default(), AuthConfig::bearer(token))?;
    let response = client
        .request(Method::GET, url, RequestConfig::new().with_network_retry())
        .await?;

    if response.status != StatusCode::OK {
        return Err(response.status_error());
    }
    Ok(response.body)
}
