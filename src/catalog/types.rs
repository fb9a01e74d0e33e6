//! Catalog API types

use crate::types::{EntityKind, RemoteId};

/// Product collection
pub const PRODUCTS_PATH: &str = "/wp-json/wc/v3/products";

/// Category collection
pub const CATEGORIES_PATH: &str = "/wp-json/wc/v3/products/categories";

/// Collection path for `kind`
pub fn collection_path(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Category => CATEGORIES_PATH,
        EntityKind::Product => PRODUCTS_PATH,
    }
}

/// Batch endpoint for `kind`
pub fn batch_path(kind: EntityKind) -> String {
    format!("{}/batch", collection_path(kind))
}

/// Entity endpoint for `kind` and `id`
pub fn entity_path(kind: EntityKind, id: RemoteId) -> String {
    format!("{}/{id}", collection_path(kind))
}

/// Error code: the remote failed to fetch the product image
pub const IMAGE_UPLOAD_ERROR: &str = "woocommerce_product_image_upload_error";

/// Error code: the SKU is invalid or already taken
pub const INVALID_SKU_ERROR: &str = "product_invalid_sku";

/// Result of a single-product create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The product was created, with its new ID when the response carried one
    Created(Option<RemoteId>),
    /// A product with the same SKU already existed
    AlreadyExists,
}
