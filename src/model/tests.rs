//! Tests for the data model

use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use serde_json::value::RawValue;

const FEED: &str = r#"{
  "products": [
    {
      "Product_Number": "P-100",
      "Manufacturing_Part_Number": "MPN-1",
      "Short_Advertising_Description": "Laptop 14\"",
      "Product_Description": "A small laptop",
      "BarCode": "600123",
      "Product_Type": "Laptops",
      "Manufacturer": "Acme",
      "Category": "Computers",
      "Available_Stock": 7,
      "Price_ex_Vat": 1299.90,
      "Date_Added": "2024-05-01T10:30:00.25",
      "Image_URL": "https://cdn.example.com/p100.jpg",
      "Export_Date": "2024-06-01T00:00:00",
      "Serialized": "Y",
      "ETA_Date": null,
      "Non_Discount_Price_ex_Vat": 1399,
      "Discount_Quantity": 0,
      "Product_Discounted": "yes",
      "Each_Width": 32.5,
      "Each_Height": 2,
      "Each_Length": 22.25,
      "Each_Weight": 1.4
    }
  ]
}"#;

#[test]
fn test_feed_parses_all_fields() {
    let feed = SourceFeed::from_slice(FEED.as_bytes()).unwrap();
    assert_eq!(feed.products.len(), 1);

    let product = &feed.products[0];
    assert_eq!(product.key(), "P-100");
    assert_eq!(product.short_description, "Laptop 14\"");
    assert_eq!(product.stock, 7);
    assert_eq!(product.price.as_str(), "1299.90");
    assert_eq!(product.list_price.as_str(), "1399");
    assert!(product.discounted);
    assert!(product.eta_date.is_none());
    assert_eq!(
        product.date_added.map(|d| d.to_string()),
        Some("2024-05-01 10:30:00.250".to_string())
    );
    assert_eq!(product.image(), Some("https://cdn.example.com/p100.jpg"));
    assert_eq!(product.length, 22.25);
}

#[test]
fn test_price_keeps_digits() {
    let price = Price::parse("10.10").unwrap();
    assert_eq!(price.as_str(), "10.10");
    assert_eq!(price.value(), 10.1);
    assert_eq!(serde_json::to_string(&price).unwrap(), "10.10");
}

#[test]
fn test_price_rejects_strings_and_garbage() {
    assert!(Price::parse("abc").is_err());
    assert!(Price::parse("inf").is_err());

    let quoted = r#"{"products": [{"Price_ex_Vat": "12.00"}]}"#;
    let feed = SourceFeed::from_slice(quoted.as_bytes()).unwrap();
    assert!(feed.products.is_empty());
    assert_eq!(feed.rejected, 1);
}

#[test]
fn test_unreadable_record_leaves_siblings_intact() {
    let document = r#"{"products": [
        {"Product_Number": "GOOD", "Price_ex_Vat": 10.5},
        {"Product_Number": "BAD", "Price_ex_Vat": "n/a"},
        {"Product_Number": "WIDE", "Each_Width": "thirty"},
        "not a record",
        {"Product_Number": "ALSO-GOOD", "Price_ex_Vat": 3}
    ]}"#;

    let feed = SourceFeed::from_slice(document.as_bytes()).unwrap();
    let keys: Vec<_> = feed.products.iter().map(SourceProduct::key).collect();
    assert_eq!(keys, vec!["GOOD", "ALSO-GOOD"]);
    assert_eq!(feed.rejected, 3);
    assert_eq!(feed.products[0].price.as_str(), "10.5");
}

#[test]
fn test_malformed_document_is_an_error() {
    assert!(SourceFeed::from_slice(b"{\"products\": [").is_err());
    assert!(SourceFeed::from_slice(b"{\"products\": {}}").is_err());
}

#[test]
fn test_record_key_of_unreadable_record() {
    let text = r#"{"Product_Number": "BAD", "Available_Stock": "x"}"#;
    let record = RawValue::from_string(text.to_string()).unwrap();
    assert_eq!(source::record_key(&record), Some("BAD".to_string()));

    let record = RawValue::from_string("[1, 2]".to_string()).unwrap();
    assert_eq!(source::record_key(&record), None);
}

#[test]
fn test_missing_image_is_none() {
    let product = SourceProduct {
        image_url: "  ".to_string(),
        ..SourceProduct::default()
    };
    assert_eq!(product.image(), None);
}

#[test]
fn test_remote_product_omits_empty_fields() {
    let product = RemoteProduct {
        sku: "P-100".to_string(),
        categories: vec![CategoryRef::by_name("Laptops")],
        ..RemoteProduct::default()
    };

    let value = serde_json::to_value(&product).unwrap();
    assert_eq!(
        value,
        json!({"sku": "P-100", "categories": [{"name": "Laptops"}]})
    );
}

#[test]
fn test_remote_product_decodes_api_shape() {
    let body = r#"{
        "id": 42,
        "sku": "P-100",
        "name": "Laptop",
        "type": "simple",
        "stock_quantity": null,
        "regular_price": "1299.90",
        "tags": [{"id": 3, "name": "Acme", "slug": "acme"}],
        "categories": [{"id": 9, "name": "Laptops", "slug": "laptops"}],
        "images": [{"id": 11, "src": "https://shop.example.com/p100.jpg", "name": "p100"}],
        "dimensions": {"length": "22.25", "width": "", "height": "2"},
        "weight": "1.4",
        "meta_data": []
    }"#;

    let product: RemoteProduct = serde_json::from_str(body).unwrap();
    assert_eq!(product.id, Some(42));
    assert_eq!(product.key(), "P-100");
    assert_eq!(product.product_type, "simple");
    assert_eq!(product.stock_quantity, None);
    assert_eq!(product.tags[0].name, "Acme");
    assert_eq!(product.images[0].id, Some(11));
    assert_eq!(product.dimensions.unwrap().width, "");
}

#[test]
fn test_remote_category_root_marker() {
    let root: RemoteCategory =
        serde_json::from_str(r#"{"id": 1, "name": "Computers", "parent": 0}"#).unwrap();
    let child: RemoteCategory =
        serde_json::from_str(r#"{"id": 2, "name": "Laptops", "parent": 1}"#).unwrap();

    assert_eq!(root.parent_id(), None);
    assert_eq!(child.parent_id(), Some(1));
    assert_eq!(child.key(), "Laptops");
}

#[test]
fn test_patch_emptiness_is_structural() {
    let mut patch = ProductPatch::default();
    assert!(patch.is_empty());
    assert_eq!(patch.clone().into_option(), None);

    patch.dimensions = Some(DimensionsPatch {
        width: Some("3".to_string()),
        ..DimensionsPatch::default()
    });
    assert!(!patch.is_empty());
    assert_eq!(patch.changed_fields(), vec!["dimensions"]);

    assert_eq!(
        serde_json::to_value(&patch).unwrap(),
        json!({"dimensions": {"width": "3"}})
    );
}

#[test]
fn test_category_patch() {
    assert!(CategoryPatch::default().is_empty());
    let patch = CategoryPatch { parent: Some(5) };
    assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"parent": 5}));
}
