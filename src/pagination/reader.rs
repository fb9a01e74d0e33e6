//! Concurrent page reader

use super::types::{page_count, CollectionStream, Listing};
use crate::error::{Error, Result};
use crate::http::Transport;
use crate::queue::WorkQueue;
use crate::retry::{classify_status, retry, Attempt, StatusClass};
use futures::future::join_all;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Header carrying the collection size
pub const TOTAL_HEADER: &str = "X-WP-Total";

/// Reads a remote collection page by page with a fixed pool of workers
#[derive(Debug, Clone)]
pub struct CollectionReader {
    transport: Arc<dyn Transport>,
}

impl CollectionReader {
    /// Create a reader over `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Probe the collection size.
    ///
    /// 429 is retried with rate-limited backoff; anything else that is not a
    /// 200 carrying a numeric total fails the probe.
    pub async fn count(&self, listing: &Listing) -> Result<u64> {
        probe_total(self.transport.as_ref(), listing).await
    }

    /// Stream every item of `listing` using `workers` concurrent fetchers.
    ///
    /// Returns immediately; the probe and page fetches run on spawned tasks.
    pub fn stream_collection<T>(
        &self,
        listing: Listing,
        page_size: u32,
        workers: usize,
    ) -> CollectionStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let workers = workers.max(1);
        let page_size = page_size.max(1);
        let (item_tx, item_rx) = mpsc::channel(page_size as usize * workers);
        // one probe error plus at most one error per worker
        let (error_tx, error_rx) = mpsc::channel(workers + 1);
        let transport = Arc::clone(&self.transport);

        tokio::spawn(supervise(
            transport, listing, page_size, workers, item_tx, error_tx,
        ));

        CollectionStream {
            items: item_rx,
            errors: error_rx,
        }
    }
}

/// Probe, fan pages out to workers, and close the streams after all exit
async fn supervise<T>(
    transport: Arc<dyn Transport>,
    listing: Listing,
    page_size: u32,
    workers: usize,
    items: mpsc::Sender<T>,
    errors: mpsc::Sender<Error>,
) where
    T: DeserializeOwned + Send + 'static,
{
    let total = match probe_total(transport.as_ref(), &listing).await {
        Ok(total) => total,
        Err(e) => {
            warn!(path = %listing.path, error = %e, "count probe failed");
            let _ = errors.send(e).await;
            return;
        }
    };

    let pages = page_count(total, page_size);
    info!(path = %listing.path, total, pages, workers, "reading collection");

    let queue = WorkQueue::spawn(1..pages + 1, workers);
    let listing = Arc::new(listing);

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            tokio::spawn(run_worker(
                worker,
                Arc::clone(&transport),
                Arc::clone(&listing),
                page_size,
                queue.clone(),
                items.clone(),
                errors.clone(),
            ))
        })
        .collect();

    for (worker, joined) in join_all(handles).await.into_iter().enumerate() {
        if let Err(e) = joined {
            let _ = errors
                .send(Error::worker(worker, Error::Other(e.to_string())))
                .await;
        }
    }

    debug!(
        path = %listing.path,
        claimed = queue.claimed(),
        total = queue.total(),
        "all page workers exited"
    );
}

async fn run_worker<T>(
    worker: usize,
    transport: Arc<dyn Transport>,
    listing: Arc<Listing>,
    page_size: u32,
    queue: WorkQueue<u32>,
    items: mpsc::Sender<T>,
    errors: mpsc::Sender<Error>,
) where
    T: DeserializeOwned + Send + 'static,
{
    while let Some(page) = queue.next().await {
        let records: Vec<T> = match fetch_page(transport.as_ref(), &listing, page, page_size).await
        {
            Ok(records) => records,
            Err(e) => {
                warn!(worker, page, error = %e, "page worker stopped");
                let _ = errors.send(Error::worker(worker, e)).await;
                return;
            }
        };

        debug!(worker, page, count = records.len(), "fetched page");
        for record in records {
            if items.send(record).await.is_err() {
                // consumer went away
                return;
            }
        }

        if let Some(delay) = transport.policy().pacing_delay() {
            transport.sleeper().sleep(delay).await;
        }
    }
}

async fn probe_total(transport: &dyn Transport, listing: &Listing) -> Result<u64> {
    let url = transport.url(&listing.path);
    let policy = transport.policy();

    retry(
        transport.sleeper(),
        policy.max_rate_limit_retries,
        |attempt| {
            let request = listing.page_request(1, 1);
            let url = url.as_str();
            async move {
                let response = match transport.request(Method::GET, url, request).await {
                    Ok(response) => response,
                    Err(e) => return Attempt::Fatal(Error::count_probe(url, e.to_string())),
                };
                match classify_status(response.status, &[StatusCode::OK]) {
                    StatusClass::Success => match response
                        .header(TOTAL_HEADER)
                        .and_then(|v| v.trim().parse::<u64>().ok())
                    {
                        Some(total) => Attempt::Success(total),
                        None => Attempt::Fatal(Error::count_probe(
                            url,
                            format!("missing or invalid {TOTAL_HEADER} header"),
                        )),
                    },
                    StatusClass::RateLimited => {
                        Attempt::Retry(policy.rate_limited_delay(attempt))
                    }
                    _ => Attempt::Fatal(Error::count_probe(
                        url,
                        response.status_error().to_string(),
                    )),
                }
            }
        },
    )
    .await
    .map_err(|e| match e {
        e @ Error::CountProbe { .. } => e,
        other => Error::count_probe(&url, other.to_string()),
    })
}

async fn fetch_page<T: DeserializeOwned>(
    transport: &dyn Transport,
    listing: &Listing,
    page: u32,
    page_size: u32,
) -> Result<Vec<T>> {
    let url = transport.url(&listing.path);
    let policy = transport.policy();

    retry(
        transport.sleeper(),
        policy.max_rate_limit_retries,
        |attempt| {
            let request = listing.page_request(page, page_size);
            let url = url.as_str();
            async move {
                let response = match transport.request(Method::GET, url, request).await {
                    Ok(response) => response,
                    Err(e) => return Attempt::Fatal(e),
                };
                match classify_status(response.status, &[StatusCode::OK]) {
                    StatusClass::Success => match response.json::<Vec<T>>() {
                        Ok(records) => Attempt::Success(records),
                        Err(e) => Attempt::Fatal(e),
                    },
                    StatusClass::RateLimited => {
                        debug!(page, attempt, "rate limited");
                        Attempt::Retry(policy.rate_limited_delay(attempt))
                    }
                    _ => Attempt::Fatal(response.status_error()),
                }
            }
        },
    )
    .await
}
