//! Pagination types

use crate::error::Error;
use crate::http::RequestConfig;
use tokio::sync::mpsc;

/// A paginated collection endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Collection path or URL
    pub path: String,
    /// Extra query parameters sent with every page
    pub query: Vec<(String, String)>,
}

impl Listing {
    /// Listing at `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// Add a query parameter sent with every page
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Request for one page, ordered by ID with a cache-busting stamp.
    ///
    /// Network errors are retried per the transport's policy.
    pub fn page_request(&self, page: u32, per_page: u32) -> RequestConfig {
        let stamp = chrono::Utc::now().timestamp_millis();
        let mut config = RequestConfig::new()
            .query("page", page.to_string())
            .query("per_page", per_page.to_string())
            .query("orderby", "id")
            .query("order", "asc")
            .query("_", stamp.to_string())
            .with_network_retry();
        for (key, value) in &self.query {
            config = config.query(key, value);
        }
        config
    }
}

/// Number of pages needed to cover `total` items
pub fn page_count(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size)) as u32
}

/// Items and fatal errors of one collection read.
///
/// Both receivers close once every worker has exited. Consumers should drain
/// them concurrently.
#[derive(Debug)]
pub struct CollectionStream<T> {
    /// Decoded records, in no particular order
    pub items: mpsc::Receiver<T>,
    /// Fatal errors of the probe or of individual workers
    pub errors: mpsc::Receiver<Error>,
}

impl<T> CollectionStream<T> {
    /// Drain both streams concurrently
    pub async fn collect(self) -> (Vec<T>, Vec<Error>) {
        let Self {
            mut items,
            mut errors,
        } = self;

        let drain_items = async {
            let mut out = Vec::new();
            while let Some(item) = items.recv().await {
                out.push(item);
            }
            out
        };
        let drain_errors = async {
            let mut out = Vec::new();
            while let Some(err) = errors.recv().await {
                out.push(err);
            }
            out
        };

        tokio::join!(drain_items, drain_errors)
    }
}
