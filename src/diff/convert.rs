//! Source to remote conversion

use crate::error::{Error, Result};
use crate::model::{CategoryRef, Dimensions, RemoteImage, RemoteProduct, SourceProduct, TermRef};
use crate::types::CategoryIds;
use tracing::warn;

/// A converted product plus the category it could not resolve to an ID
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedProduct {
    /// Create payload for the remote catalog
    pub product: RemoteProduct,
    /// Product type referenced by name because its ID was unknown
    pub unresolved_category: Option<String>,
}

/// Shortest decimal text that round-trips `value` (`10.0` becomes `"10"`)
pub fn format_decimal(value: f64) -> String {
    value.to_string()
}

/// Tag names every product must carry: manufacturer and top-level category
pub fn required_tags(source: &SourceProduct) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(2);
    for name in [source.manufacturer.trim(), source.category.trim()] {
        if !name.is_empty() && !tags.iter().any(|t| t == name) {
            tags.push(name.to_string());
        }
    }
    tags
}

/// Category reference for the product type: by ID when known, else by name
pub fn category_ref(source: &SourceProduct, category_ids: &CategoryIds) -> (CategoryRef, bool) {
    let name = source.product_type.trim();
    match category_ids.get(name) {
        Some(id) => (TermRef::by_id(*id), true),
        None => (TermRef::by_name(name), false),
    }
}

/// Reject source records whose numeric fields cannot be represented remotely
pub fn validate_source(source: &SourceProduct) -> Result<()> {
    if source.key().trim().is_empty() {
        return Err(Error::conversion("<blank>", "product number is empty"));
    }
    let measures = [
        ("width", source.width),
        ("height", source.height),
        ("length", source.length),
        ("weight", source.weight),
    ];
    for (field, value) in measures {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::conversion(
                source.key(),
                format!("{field} must be a non-negative number, got {value}"),
            ));
        }
    }
    Ok(())
}

/// Map every source field into the remote schema
pub fn convert_product(
    source: &SourceProduct,
    category_ids: &CategoryIds,
    image: Option<RemoteImage>,
) -> ConvertedProduct {
    let (category, resolved) = category_ref(source, category_ids);
    let unresolved_category = if resolved {
        None
    } else {
        warn!(
            sku = source.key(),
            category = %source.product_type,
            "product needs a category with an unknown ID"
        );
        Some(source.product_type.trim().to_string())
    };

    let product = RemoteProduct {
        sku: source.product_number.clone(),
        name: source.short_description.clone(),
        description: source.description.clone(),
        tags: required_tags(source)
            .into_iter()
            .map(TermRef::by_name)
            .collect(),
        categories: vec![category],
        manage_stock: Some(true),
        stock_quantity: Some(source.stock),
        regular_price: source.price.as_str().to_string(),
        images: image.into_iter().collect(),
        dimensions: Some(Dimensions {
            length: format_decimal(source.length),
            width: format_decimal(source.width),
            height: format_decimal(source.height),
        }),
        weight: format_decimal(source.weight),
        ..RemoteProduct::default()
    };

    ConvertedProduct {
        product,
        unresolved_category,
    }
}
