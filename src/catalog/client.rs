//! Catalog REST client

use super::types::{
    batch_path, collection_path, entity_path, CreateOutcome, IMAGE_UPLOAD_ERROR,
    INVALID_SKU_ERROR, PRODUCTS_PATH,
};
use crate::batch::{BatchExecutor, BatchOperation, BatchRun};
use crate::error::{Error, Result};
use crate::http::{HttpResponse, RequestConfig, Transport};
use crate::media::MediaClient;
use crate::model::{CategoryPatch, ProductPatch, RemoteCategory, RemoteImage, RemoteProduct};
use crate::pagination::{CollectionReader, CollectionStream, Listing};
use crate::retry::{classify_status, retry, Attempt, StatusClass};
use crate::types::{EntityKind, RemoteId};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
}

/// Typed access to the remote catalog
#[derive(Debug, Clone)]
pub struct CatalogClient {
    transport: Arc<dyn Transport>,
    media: MediaClient,
    reader: CollectionReader,
    batch: BatchExecutor,
}

impl CatalogClient {
    /// Create a client; `media` may use different credentials than `transport`
    pub fn new(transport: Arc<dyn Transport>, media: MediaClient) -> Self {
        Self {
            reader: CollectionReader::new(Arc::clone(&transport)),
            batch: BatchExecutor::new(Arc::clone(&transport)),
            transport,
            media,
        }
    }

    /// Media client used for image resolution
    pub fn media(&self) -> &MediaClient {
        &self.media
    }

    /// Pause between sequential requests when pacing is enabled
    pub async fn pace(&self) {
        if let Some(delay) = self.transport.policy().pacing_delay() {
            self.transport.sleeper().sleep(delay).await;
        }
    }

    /// Listing for `kind`
    pub fn listing(&self, kind: EntityKind) -> Listing {
        Listing::new(collection_path(kind))
    }

    /// Number of `kind` entities in the remote catalog
    pub async fn item_count(&self, kind: EntityKind) -> Result<u64> {
        self.reader.count(&self.listing(kind)).await
    }

    /// Stream every remote product
    pub fn stream_products(
        &self,
        page_size: u32,
        workers: usize,
    ) -> CollectionStream<RemoteProduct> {
        self.reader
            .stream_collection(self.listing(EntityKind::Product), page_size, workers)
    }

    /// Stream every remote category
    pub fn stream_categories(
        &self,
        page_size: u32,
        workers: usize,
    ) -> CollectionStream<RemoteCategory> {
        self.reader
            .stream_collection(self.listing(EntityKind::Category), page_size, workers)
    }

    /// Apply a batch mutation to `kind`
    pub fn batch<T: Serialize>(
        &self,
        kind: EntityKind,
        operation: BatchOperation,
        entities: Vec<T>,
        max_batch: usize,
        workers: usize,
    ) -> BatchRun {
        self.batch
            .apply(&batch_path(kind), operation, entities, max_batch, workers)
    }

    /// Check whether a product with `sku` exists
    pub async fn sku_exists(&self, sku: &str) -> Result<bool> {
        let transport = self.transport.as_ref();
        let policy = transport.policy();

        let found: Vec<Value> = retry(
            transport.sleeper(),
            policy.max_rate_limit_retries,
            |attempt| async move {
                let request = RequestConfig::new().query("sku", sku).with_network_retry();
                let response = match transport.request(Method::GET, PRODUCTS_PATH, request).await
                {
                    Ok(response) => response,
                    Err(e) => return Attempt::Fatal(e),
                };
                match classify_status(response.status, &[StatusCode::OK]) {
                    StatusClass::Success => match response.json() {
                        Ok(found) => Attempt::Success(found),
                        Err(e) => Attempt::Fatal(e),
                    },
                    StatusClass::RateLimited => {
                        debug!(sku, "rate limited while checking SKU");
                        Attempt::Retry(policy.rate_limited_delay(attempt))
                    }
                    _ => Attempt::Fatal(response.status_error()),
                }
            },
        )
        .await?;

        Ok(!found.is_empty())
    }

    /// Create a single product, recovering from the catalog's known failures.
    ///
    /// - 400 image upload error: resend without images
    /// - 400 invalid SKU: [`CreateOutcome::AlreadyExists`] if the SKU is found
    /// - 429: rate-limited backoff
    /// - 504: wait, reference the image by ID if the upload landed, retry
    pub async fn create_product(&self, product: RemoteProduct) -> Result<CreateOutcome> {
        let sku = product.sku.clone();
        let sku = sku.as_str();
        let payload = Mutex::new(product);
        let payload = &payload;
        let transport = self.transport.as_ref();
        let policy = transport.policy();

        info!(sku, "creating product");
        retry(
            transport.sleeper(),
            policy.max_rate_limit_retries,
            |attempt| async move {
                let body = {
                    let product = payload.lock().unwrap_or_else(PoisonError::into_inner);
                    serde_json::to_value(&*product)
                };
                let body = match body {
                    Ok(body) => body,
                    Err(e) => return Attempt::Fatal(e.into()),
                };
                let request = RequestConfig::new().json(body).with_network_retry();
                let response = match transport.request(Method::POST, PRODUCTS_PATH, request).await
                {
                    Ok(response) => response,
                    Err(e) => return Attempt::Fatal(e),
                };

                match classify_status(response.status, &[StatusCode::CREATED, StatusCode::OK]) {
                    StatusClass::Success => {
                        Attempt::Success(CreateOutcome::Created(created_id(&response)))
                    }
                    StatusClass::RateLimited => {
                        debug!(sku, attempt, "rate limited while creating product");
                        Attempt::Retry(policy.rate_limited_delay(attempt))
                    }
                    StatusClass::GatewayTimeout => {
                        warn!(sku, "gateway timeout, checking whether the image landed");
                        match self.recover_image(payload).await {
                            Ok(()) => Attempt::Retry(policy.rate_limited_delay(attempt)),
                            Err(e) => Attempt::Fatal(e),
                        }
                    }
                    StatusClass::Fatal if response.status == StatusCode::BAD_REQUEST => {
                        self.interpret_bad_request(payload, &response, sku).await
                    }
                    StatusClass::Fatal => Attempt::Fatal(response.status_error()),
                }
            },
        )
        .await
    }

    /// After a 504, point the first image at its uploaded asset if it exists
    async fn recover_image(&self, payload: &Mutex<RemoteProduct>) -> Result<()> {
        self.transport.sleeper().sleep(self.media.settle_delay()).await;

        let href = {
            let product = payload.lock().unwrap_or_else(PoisonError::into_inner);
            product
                .images
                .first()
                .map(|image| image.href.clone())
                .filter(|href| !href.is_empty())
        };
        let Some(href) = href else {
            return Ok(());
        };

        match self.media.find_image_id(&href).await? {
            Some(id) => {
                info!(id, "image already uploaded, retrying with its ID");
                let mut product = payload.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(first) = product.images.first_mut() {
                    *first = RemoteImage::asset(id);
                }
            }
            None => debug!("image not uploaded yet, retrying"),
        }
        Ok(())
    }

    async fn interpret_bad_request(
        &self,
        payload: &Mutex<RemoteProduct>,
        response: &HttpResponse,
        sku: &str,
    ) -> Attempt<CreateOutcome> {
        let code = response.json::<ErrorBody>().unwrap_or_default().code;

        if code == IMAGE_UPLOAD_ERROR {
            let mut product = payload.lock().unwrap_or_else(PoisonError::into_inner);
            if !product.images.is_empty() {
                warn!(sku, "image upload failed, resending without images");
                product.images.clear();
                return Attempt::Retry(Duration::ZERO);
            }
        } else if code == INVALID_SKU_ERROR {
            debug!(sku, "invalid SKU, checking whether the product already exists");
            return match self.sku_exists(sku).await {
                Ok(true) => Attempt::Success(CreateOutcome::AlreadyExists),
                Ok(false) => Attempt::Fatal(Error::conversion(
                    sku,
                    format!("invalid SKU: {}", response.status_error()),
                )),
                Err(e) => Attempt::Fatal(e),
            };
        }

        Attempt::Fatal(response.status_error())
    }

    /// Apply `patch` to product `id`
    pub async fn update_product(&self, id: RemoteId, patch: &ProductPatch) -> Result<()> {
        self.put(entity_path(EntityKind::Product, id), serde_json::to_value(patch)?)
            .await
    }

    /// Apply `patch` to category `id`
    pub async fn update_category(&self, id: RemoteId, patch: &CategoryPatch) -> Result<()> {
        self.put(entity_path(EntityKind::Category, id), serde_json::to_value(patch)?)
            .await
    }

    async fn put(&self, path: String, body: Value) -> Result<()> {
        let transport = self.transport.as_ref();
        let policy = transport.policy();
        let path = path.as_str();
        let body = &body;

        retry(
            transport.sleeper(),
            policy.max_rate_limit_retries,
            |attempt| async move {
                let request = RequestConfig::new().json(body.clone()).with_network_retry();
                let response = match transport.request(Method::PUT, path, request).await {
                    Ok(response) => response,
                    Err(e) => return Attempt::Fatal(e),
                };
                match classify_status(response.status, &[StatusCode::OK]) {
                    StatusClass::Success => Attempt::Success(()),
                    StatusClass::RateLimited => Attempt::Retry(policy.rate_limited_delay(attempt)),
                    _ => Attempt::Fatal(response.status_error()),
                }
            },
        )
        .await
    }
}

fn created_id(response: &HttpResponse) -> Option<RemoteId> {
    response
        .json::<Value>()
        .ok()
        .and_then(|body| body.get("id").and_then(Value::as_u64))
        .filter(|id| *id != 0)
}
