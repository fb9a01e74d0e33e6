//! Patch computation and strict comparison

use super::convert::{category_ref, format_decimal, required_tags};
use crate::model::{
    Dimensions, DimensionsPatch, ProductPatch, RemoteImage, RemoteProduct, SourceProduct, TermRef,
};
use crate::types::CategoryIds;

/// Numeric difference at which a dimension or weight counts as changed
pub const PATCH_TOLERANCE: f64 = 0.001;

/// Numeric difference tolerated by [`equals`]
pub const EQUALS_TOLERANCE: f64 = 1e-5;

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// New text for a measure stored remotely as `current`, if it must change
fn measure_patch(current: &str, wanted: f64) -> Option<String> {
    match parse_number(current) {
        Some(value) if (value - wanted).abs() < PATCH_TOLERANCE => None,
        _ => Some(format_decimal(wanted)),
    }
}

fn price_changed(current: &str, source: &SourceProduct) -> bool {
    if current == source.price.as_str() {
        return false;
    }
    match parse_number(current) {
        #[allow(clippy::float_cmp)]
        Some(value) => value != source.price.value(),
        None => true,
    }
}

fn image_present(existing: &[RemoteImage], image: &RemoteImage) -> bool {
    match image.id {
        Some(id) => existing.iter().any(|i| i.id == Some(id)),
        None => existing.iter().any(|i| !i.href.is_empty() && i.href == image.href),
    }
}

fn dimensions_patch(current: Option<&Dimensions>, source: &SourceProduct) -> Option<DimensionsPatch> {
    let patch = match current {
        None => DimensionsPatch {
            length: Some(format_decimal(source.length)),
            width: Some(format_decimal(source.width)),
            height: Some(format_decimal(source.height)),
        },
        Some(current) => DimensionsPatch {
            length: measure_patch(&current.length, source.length),
            width: measure_patch(&current.width, source.width),
            height: measure_patch(&current.height, source.height),
        },
    };
    (!patch.is_empty()).then_some(patch)
}

/// Minimal patch moving `remote` towards `source`; `None` when nothing differs.
///
/// `image` is the resolved source image, if any.
pub fn diff_product(
    source: &SourceProduct,
    remote: &RemoteProduct,
    category_ids: &CategoryIds,
    image: Option<&RemoteImage>,
) -> Option<ProductPatch> {
    let mut patch = ProductPatch::default();

    if remote.sku != source.product_number {
        patch.sku = Some(source.product_number.clone());
    }
    if remote.name != source.short_description {
        patch.name = Some(source.short_description.clone());
    }
    if remote.description != source.description {
        patch.description = Some(source.description.clone());
    }

    if remote.stock_quantity != Some(source.stock) {
        patch.stock_quantity = Some(source.stock);
        patch.manage_stock = Some(true);
    }

    if price_changed(&remote.regular_price, source) {
        patch.regular_price = Some(source.price.as_str().to_string());
    }

    let missing_tags: Vec<String> = required_tags(source)
        .into_iter()
        .filter(|name| !remote.tags.iter().any(|t| &t.name == name))
        .collect();
    if !missing_tags.is_empty() {
        let mut tags = remote.tags.clone();
        tags.extend(missing_tags.into_iter().map(TermRef::by_name));
        patch.tags = Some(tags);
    }

    let (required, _) = category_ref(source, category_ids);
    let wanted_name = source.product_type.trim();
    let has_category = remote.categories.iter().any(|c| {
        (required.id.is_some() && c.id == required.id) || c.name == wanted_name
    });
    if !has_category {
        patch.categories = Some(vec![required]);
    }

    if let Some(image) = image {
        if !image_present(&remote.images, image) {
            let mut images = remote.images.clone();
            images.push(image.clone());
            patch.images = Some(images);
        }
    }

    patch.dimensions = dimensions_patch(remote.dimensions.as_ref(), source);
    patch.weight = measure_patch(&remote.weight, source.weight);

    patch.into_option()
}

fn within(current: &str, wanted: f64) -> bool {
    parse_number(current).is_some_and(|value| (value - wanted).abs() <= EQUALS_TOLERANCE)
}

/// Strict full-record comparison of a remote product against its source
pub fn equals(remote: &RemoteProduct, source: &SourceProduct) -> bool {
    if remote.name != source.short_description
        || remote.description != source.description
        || remote.sku != source.product_number
        || remote.stock_quantity != Some(source.stock)
    {
        return false;
    }

    #[allow(clippy::float_cmp)]
    let price_equal = parse_number(&remote.regular_price) == Some(source.price.value());
    if !price_equal {
        return false;
    }

    let dimensions_equal = remote.dimensions.as_ref().is_some_and(|d| {
        within(&d.length, source.length)
            && within(&d.width, source.width)
            && within(&d.height, source.height)
    });
    if !dimensions_equal || !within(&remote.weight, source.weight) {
        return false;
    }

    let tags = required_tags(source);
    if remote.tags.len() != 2
        || tags.len() != 2
        || !tags.iter().all(|name| remote.tags.iter().any(|t| &t.name == name))
    {
        return false;
    }

    if remote.categories.len() != 1 || remote.categories[0].name != source.product_type.trim() {
        return false;
    }

    match source.image() {
        Some(url) => remote.images.len() == 1 && remote.images[0].href == url,
        None => remote.images.is_empty(),
    }
}
