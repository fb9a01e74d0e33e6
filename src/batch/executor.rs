//! Chunked batch executor

use super::types::{BatchOperation, BatchRun, ChunkAck};
use crate::error::{Error, Result};
use crate::http::{HttpResponse, RequestConfig, Transport};
use crate::queue::WorkQueue;
use crate::retry::{classify_status, retry, Attempt, StatusClass};
use futures::future::join_all;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One unit of batch work
#[derive(Debug)]
struct Chunk {
    index: usize,
    offset: usize,
    entities: Vec<Value>,
}

/// Applies create/update/delete mutations in bounded chunks
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    transport: Arc<dyn Transport>,
}

impl BatchExecutor {
    /// Create an executor over `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Apply `operation` to `entities` at the batch endpoint `url`.
    ///
    /// Entities are split into contiguous chunks of at most `max_batch`,
    /// keeping input order, and posted by `workers` concurrent workers. A 429
    /// retries the same chunk; any other failure stops that worker. Chunks
    /// already applied stay applied.
    pub fn apply<T: Serialize>(
        &self,
        url: &str,
        operation: BatchOperation,
        entities: Vec<T>,
        max_batch: usize,
        workers: usize,
    ) -> BatchRun {
        let total = entities.len();
        let workers = workers.max(1);
        let (ack_tx, ack_rx) = mpsc::channel(total.max(1));
        // worker failures plus at most one item error per entity
        let (error_tx, error_rx) = mpsc::channel(total + workers + 1);

        let run = BatchRun {
            acks: ack_rx,
            errors: error_rx,
            total,
        };
        if total == 0 {
            return run;
        }

        let chunks = match chunk_entities(entities, max_batch.max(1)) {
            Ok(chunks) => chunks,
            Err(e) => {
                let _ = error_tx.try_send(e);
                return run;
            }
        };

        info!(%operation, total, chunks = chunks.len(), workers, "starting batch");
        tokio::spawn(supervise(
            Arc::clone(&self.transport),
            url.to_string(),
            operation,
            chunks,
            workers,
            ack_tx,
            error_tx,
        ));

        run
    }
}

fn chunk_entities<T: Serialize>(entities: Vec<T>, max_batch: usize) -> Result<Vec<Chunk>> {
    let values = entities
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(values
        .chunks(max_batch)
        .enumerate()
        .map(|(index, slice)| Chunk {
            index,
            offset: index * max_batch,
            entities: slice.to_vec(),
        })
        .collect())
}

async fn supervise(
    transport: Arc<dyn Transport>,
    url: String,
    operation: BatchOperation,
    chunks: Vec<Chunk>,
    workers: usize,
    acks: mpsc::Sender<ChunkAck>,
    errors: mpsc::Sender<Error>,
) {
    let queue = WorkQueue::spawn(chunks, workers);
    let url = Arc::new(url);

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            tokio::spawn(run_worker(
                worker,
                Arc::clone(&transport),
                Arc::clone(&url),
                operation,
                queue.clone(),
                acks.clone(),
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

    debug!(%operation, claimed = queue.claimed(), total = queue.total(), "batch workers exited");
}

async fn run_worker(
    worker: usize,
    transport: Arc<dyn Transport>,
    url: Arc<String>,
    operation: BatchOperation,
    queue: WorkQueue<Chunk>,
    acks: mpsc::Sender<ChunkAck>,
    errors: mpsc::Sender<Error>,
) {
    while let Some(chunk) = queue.next().await {
        let response = match post_chunk(transport.as_ref(), &url, operation, &chunk).await {
            Ok(response) => response,
            Err(e) => {
                warn!(worker, chunk = chunk.index, %operation, error = %e, "batch worker stopped");
                let _ = errors.send(Error::worker(worker, e)).await;
                return;
            }
        };

        let (items, item_errors) = item_results(&response, operation);
        let failed: Vec<usize> = item_errors.iter().map(|(position, _)| *position).collect();
        for (position, err) in item_errors {
            debug!(chunk = chunk.index, position, error = %err, "batch item failed");
            let _ = errors.send(err).await;
        }

        let ack = ChunkAck {
            index: chunk.index,
            offset: chunk.offset,
            entities: chunk.entities.len(),
            items,
            failed,
        };
        debug!(worker, chunk = ack.index, confirmed = ack.confirmed(), %operation, "chunk applied");
        if acks.send(ack).await.is_err() {
            return;
        }

        if let Some(delay) = transport.policy().pacing_delay() {
            transport.sleeper().sleep(delay).await;
        }
    }
}

async fn post_chunk(
    transport: &dyn Transport,
    url: &str,
    operation: BatchOperation,
    chunk: &Chunk,
) -> Result<HttpResponse> {
    let mut body = Map::new();
    body.insert(
        operation.key().to_string(),
        Value::Array(chunk.entities.clone()),
    );
    let body = Value::Object(body);
    let policy = transport.policy();

    retry(
        transport.sleeper(),
        policy.max_rate_limit_retries,
        |attempt| {
            let request = RequestConfig::new().json(body.clone()).with_network_retry();
            async move {
                let response = match transport.request(Method::POST, url, request).await {
                    Ok(response) => response,
                    Err(e) => return Attempt::Fatal(e),
                };
                match classify_status(response.status, &[StatusCode::OK, StatusCode::CREATED]) {
                    StatusClass::Success => Attempt::Success(response),
                    StatusClass::RateLimited => {
                        debug!(chunk = chunk.index, attempt, "batch rate limited");
                        Attempt::Retry(policy.rate_limited_delay(attempt))
                    }
                    _ => Attempt::Fatal(response.status_error()),
                }
            }
        },
    )
    .await
}

/// Split a batch response into per-entity results and item errors
fn item_results(
    response: &HttpResponse,
    operation: BatchOperation,
) -> (Vec<Value>, Vec<(usize, Error)>) {
    let items = response
        .json::<Value>()
        .ok()
        .and_then(|mut body| body.get_mut(operation.key()).map(Value::take))
        .and_then(|items| match items {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .unwrap_or_default();

    let errors = items
        .iter()
        .enumerate()
        .filter_map(|(position, item)| {
            let error = item.get("error")?;
            let field = |name: &str| {
                error
                    .get(name)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Some((
                position,
                Error::BatchItem {
                    operation: operation.key().to_string(),
                    code: field("code"),
                    message: field("message"),
                },
            ))
        })
        .collect();

    (items, errors)
}
