//! Catalog API module
//!
//! Endpoints and status handling of the remote e-commerce catalog:
//! collection listing, single-entity create/update, batch mutations and SKU
//! lookups.

mod client;
mod types;

pub use client::CatalogClient;
pub use types::{
    batch_path, collection_path, entity_path, CreateOutcome, CATEGORIES_PATH,
    IMAGE_UPLOAD_ERROR, INVALID_SKU_ERROR, PRODUCTS_PATH,
};
