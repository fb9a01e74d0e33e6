//! Tests for the diff engine

use super::*;
use crate::model::{
    CategoryRef, Dimensions, Price, RemoteImage, RemoteProduct, SourceProduct, TermRef,
};
use crate::types::CategoryIds;
use test_case::test_case;

fn source() -> SourceProduct {
    SourceProduct {
        product_number: "P-100".to_string(),
        short_description: "Laptop".to_string(),
        description: "A small laptop".to_string(),
        product_type: "Laptops".to_string(),
        manufacturer: "Acme".to_string(),
        category: "Computers".to_string(),
        stock: 7,
        price: Price::parse("1299.90").unwrap(),
        image_url: "https://cdn.example.com/p100.jpg".to_string(),
        width: 10.0,
        height: 2.0,
        length: 22.25,
        weight: 1.4,
        ..SourceProduct::default()
    }
}

fn category_ids() -> CategoryIds {
    CategoryIds::from([("Laptops".to_string(), 9), ("Computers".to_string(), 1)])
}

/// Remote product that already matches [`source`]
fn synced() -> RemoteProduct {
    RemoteProduct {
        id: Some(42),
        sku: "P-100".to_string(),
        name: "Laptop".to_string(),
        description: "A small laptop".to_string(),
        tags: vec![TermRef::by_name("Acme"), TermRef::by_name("Computers")],
        categories: vec![CategoryRef {
            id: Some(9),
            name: "Laptops".to_string(),
            slug: "laptops".to_string(),
        }],
        stock_quantity: Some(7),
        regular_price: "1299.90".to_string(),
        images: vec![RemoteImage {
            id: Some(11),
            href: "https://cdn.example.com/p100.jpg".to_string(),
            name: String::new(),
        }],
        dimensions: Some(Dimensions {
            length: "22.25".to_string(),
            width: "10".to_string(),
            height: "2".to_string(),
        }),
        weight: "1.4".to_string(),
        ..RemoteProduct::default()
    }
}

// ============================================================================
// Conversion
// ============================================================================

#[test]
fn test_convert_maps_every_field() {
    let converted = convert_product(&source(), &category_ids(), Some(RemoteImage::asset(11)));
    let product = converted.product;

    assert_eq!(converted.unresolved_category, None);
    assert_eq!(product.id, None);
    assert_eq!(product.sku, "P-100");
    assert_eq!(product.name, "Laptop");
    assert_eq!(product.categories, vec![TermRef::by_id(9)]);
    assert_eq!(
        product.tags,
        vec![TermRef::by_name("Acme"), TermRef::by_name("Computers")]
    );
    assert_eq!(product.stock_quantity, Some(7));
    assert_eq!(product.regular_price, "1299.90");
    assert_eq!(product.images, vec![RemoteImage::asset(11)]);
    assert_eq!(
        product.dimensions,
        Some(Dimensions {
            length: "22.25".to_string(),
            width: "10".to_string(),
            height: "2".to_string(),
        })
    );
    assert_eq!(product.weight, "1.4");
}

#[test]
fn test_convert_falls_back_to_category_name() {
    let converted = convert_product(&source(), &CategoryIds::new(), None);
    assert_eq!(converted.unresolved_category.as_deref(), Some("Laptops"));
    assert_eq!(converted.product.categories, vec![TermRef::by_name("Laptops")]);
    assert!(converted.product.images.is_empty());
}

#[test_case(10.0 => "10"; "whole number")]
#[test_case(22.25 => "22.25"; "fraction")]
#[test_case(0.1 => "0.1"; "short round trip")]
fn test_format_decimal(value: f64) -> String {
    format_decimal(value)
}

#[test]
fn test_required_tags_dedup() {
    let mut product = source();
    product.manufacturer = "Computers".to_string();
    assert_eq!(required_tags(&product), vec!["Computers".to_string()]);
}

#[test]
fn test_validate_source() {
    assert!(validate_source(&source()).is_ok());

    let mut blank = source();
    blank.product_number = " ".to_string();
    assert!(validate_source(&blank).is_err());

    let mut negative = source();
    negative.weight = -1.0;
    assert!(validate_source(&negative).is_err());

    let mut nan = source();
    nan.width = f64::NAN;
    assert!(validate_source(&nan).is_err());
}

// ============================================================================
// Patch minimality
// ============================================================================

#[test]
fn test_synced_product_needs_no_patch() {
    let image = RemoteImage::asset(11);
    assert_eq!(
        diff_product(&source(), &synced(), &category_ids(), Some(&image)),
        None
    );
}

#[test]
fn test_patch_contains_only_changed_fields() {
    let mut remote = synced();
    remote.name = "Old laptop".to_string();
    remote.stock_quantity = Some(3);

    let patch = diff_product(&source(), &remote, &category_ids(), None).unwrap();
    assert_eq!(patch.changed_fields(), vec!["name", "stock_quantity"]);
    assert_eq!(patch.name.as_deref(), Some("Laptop"));
    assert_eq!(patch.stock_quantity, Some(7));
    assert_eq!(patch.manage_stock, Some(true));
}

#[test]
fn test_absent_stock_is_patched() {
    let mut remote = synced();
    remote.stock_quantity = None;
    let patch = diff_product(&source(), &remote, &category_ids(), None).unwrap();
    assert_eq!(patch.changed_fields(), vec!["stock_quantity"]);
}

#[test_case("22.2501" => None; "within tolerance")]
#[test_case("22.26" => Some("22.25".to_string()); "outside tolerance")]
#[test_case("" => Some("22.25".to_string()); "empty")]
#[test_case("n/a" => Some("22.25".to_string()); "unparseable")]
fn test_length_tolerance(remote_length: &str) -> Option<String> {
    let mut remote = synced();
    if let Some(d) = remote.dimensions.as_mut() {
        d.length = remote_length.to_string();
    }
    diff_product(&source(), &remote, &category_ids(), None)
        .and_then(|p| p.dimensions)
        .and_then(|d| d.length)
}

#[test_case("10.0001", 10.0 => false; "tiny drift unchanged")]
#[test_case("10.01", 10.0 => true; "real change")]
fn test_weight_tolerance(remote_weight: &str, source_weight: f64) -> bool {
    let mut remote = synced();
    remote.weight = remote_weight.to_string();
    let mut product = source();
    product.weight = source_weight;
    diff_product(&product, &remote, &category_ids(), None).is_some_and(|p| p.weight.is_some())
}

#[test_case("1299.9" => false; "same number different text")]
#[test_case("1299.91" => true; "different number")]
#[test_case("" => true; "unparseable")]
fn test_price_comparison(remote_price: &str) -> bool {
    let mut remote = synced();
    remote.regular_price = remote_price.to_string();
    diff_product(&source(), &remote, &category_ids(), None)
        .is_some_and(|p| p.regular_price.is_some())
}

#[test]
fn test_missing_dimensions_send_full_object() {
    let mut remote = synced();
    remote.dimensions = None;
    let patch = diff_product(&source(), &remote, &category_ids(), None).unwrap();
    let dimensions = patch.dimensions.unwrap();
    assert_eq!(dimensions.length.as_deref(), Some("22.25"));
    assert_eq!(dimensions.width.as_deref(), Some("10"));
    assert_eq!(dimensions.height.as_deref(), Some("2"));
}

#[test]
fn test_missing_tag_appends_to_existing() {
    let mut remote = synced();
    remote.tags = vec![TermRef::by_name("Clearance"), TermRef::by_name("Acme")];

    let patch = diff_product(&source(), &remote, &category_ids(), None).unwrap();
    assert_eq!(
        patch.tags,
        Some(vec![
            TermRef::by_name("Clearance"),
            TermRef::by_name("Acme"),
            TermRef::by_name("Computers"),
        ])
    );
}

#[test]
fn test_category_matched_by_name_or_id() {
    let mut by_name = synced();
    by_name.categories = vec![TermRef::by_name("Laptops")];
    assert_eq!(
        diff_product(&source(), &by_name, &category_ids(), None),
        None
    );

    let mut by_id = synced();
    by_id.categories = vec![TermRef::by_id(9)];
    assert_eq!(diff_product(&source(), &by_id, &category_ids(), None), None);

    let mut wrong = synced();
    wrong.categories = vec![TermRef::by_id(3)];
    let patch = diff_product(&source(), &wrong, &category_ids(), None).unwrap();
    assert_eq!(patch.categories, Some(vec![TermRef::by_id(9)]));
}

#[test]
fn test_new_image_is_appended() {
    let existing = synced();

    let asset = RemoteImage::asset(12);
    let patch = diff_product(&source(), &existing, &category_ids(), Some(&asset)).unwrap();
    let images = patch.images.unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[1], asset);

    let url = RemoteImage::url("https://cdn.example.com/other.jpg");
    let patch = diff_product(&source(), &existing, &category_ids(), Some(&url)).unwrap();
    assert_eq!(patch.images.unwrap()[1], url);

    let same_url = RemoteImage::url("https://cdn.example.com/p100.jpg");
    assert_eq!(
        diff_product(&source(), &existing, &category_ids(), Some(&same_url)),
        None
    );
}

// ============================================================================
// Strict equality
// ============================================================================

#[test]
fn test_equals_synced_product() {
    assert!(equals(&synced(), &source()));
}

#[test]
fn test_equals_tolerates_float_drift() {
    let mut remote = synced();
    remote.weight = "1.400001".to_string();
    assert!(equals(&remote, &source()));

    remote.weight = "1.4001".to_string();
    assert!(!equals(&remote, &source()));
}

#[test]
fn test_equals_requires_exact_membership() {
    let mut extra_tag = synced();
    extra_tag.tags.push(TermRef::by_name("Clearance"));
    assert!(!equals(&extra_tag, &source()));

    let mut two_images = synced();
    two_images.images.push(RemoteImage::asset(99));
    assert!(!equals(&two_images, &source()));

    let mut other_category = synced();
    other_category.categories[0].name = "Desktops".to_string();
    assert!(!equals(&other_category, &source()));

    let mut price = synced();
    price.regular_price = "1299.91".to_string();
    assert!(!equals(&price, &source()));
}
