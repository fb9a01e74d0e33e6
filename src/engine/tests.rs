//! Tests for engine module

use super::*;
use crate::http::{HttpClient, HttpClientConfig, Transport};
use crate::media::MediaClient;
use crate::model::{Price, SourceProduct};
use crate::retry::{RecordingSleeper, RetryPolicy};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRODUCTS: &str = "/wp-json/wc/v3/products";
const CATEGORIES: &str = "/wp-json/wc/v3/products/categories";
const PAGE_SIZE: u32 = 50;

fn engine(server: &MockServer) -> SyncEngine {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .no_rate_limit()
        .build();
    let transport: Arc<dyn Transport> = Arc::new(
        HttpClient::with_config(config)
            .unwrap()
            .with_policy(RetryPolicy::immediate())
            .with_sleeper(Arc::new(RecordingSleeper::new())),
    );
    let catalog = CatalogClient::new(Arc::clone(&transport), MediaClient::new(transport));
    SyncEngine::new(catalog).with_config(SyncConfig::new().with_reading(PAGE_SIZE, 2))
}

/// Serve `items` as a single-page listing at `listing`
async fn mount_listing(server: &MockServer, listing: &str, items: Value) {
    let total = items.as_array().map_or(0, Vec::len);
    Mock::given(method("GET"))
        .and(path(listing))
        .and(query_param("per_page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-WP-Total", total.to_string().as_str())
                .set_body_json(json!([])),
        )
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(listing))
        .and(query_param("page", "1"))
        .and(query_param("per_page", PAGE_SIZE.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

async fn mount_sku_missing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(PRODUCTS))
        .and(query_param("sku", "C"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

fn source(sku: &str) -> SourceProduct {
    SourceProduct {
        product_number: sku.to_string(),
        short_description: format!("Product {sku}"),
        product_type: "Laptops".to_string(),
        manufacturer: "Acme".to_string(),
        category: "Computers".to_string(),
        stock: 4,
        price: Price::parse("100").unwrap(),
        ..SourceProduct::default()
    }
}

fn products_only() -> Phases {
    Phases {
        categories: false,
        products: true,
    }
}

fn categories_only() -> Phases {
    Phases {
        categories: true,
        products: false,
    }
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
async fn test_products_are_deleted_updated_and_created() {
    let server = MockServer::start().await;
    mount_listing(&server, CATEGORIES, json!([{"id": 6, "name": "Laptops"}])).await;
    mount_listing(
        &server,
        PRODUCTS,
        json!([{"id": 1, "sku": "A", "name": "Old name"}, {"id": 2, "sku": "X"}]),
    )
    .await;
    mount_sku_missing(&server).await;

    Mock::given(method("POST"))
        .and(path("/wp-json/wc/v3/products/batch"))
        .and(body_json(json!({"delete": [2]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"delete": [{"id": 2}]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/wp-json/wc/v3/products/1"))
        .and(body_partial_json(json!({"name": "Product A"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wc/v3/products/batch"))
        .and(body_partial_json(
            json!({"create": [{"sku": "C", "categories": [{"id": 6}]}]}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"create": [{"id": 10}]})))
        .expect(1)
        .mount(&server)
        .await;

    let stats = engine(&server)
        .run(&[source("A"), source("C")], products_only())
        .await;

    let report = stats.report(EntityKind::Product).unwrap();
    assert_eq!(report.errors, Vec::<String>::new());
    assert_eq!(
        (report.created, report.updated, report.deleted, report.skipped),
        (1, 1, 1, 0)
    );
    assert!(stats.report(EntityKind::Category).is_none());
}

#[tokio::test]
async fn test_dry_run_sends_no_mutations() {
    let server = MockServer::start().await;
    mount_listing(&server, CATEGORIES, json!([])).await;
    mount_listing(
        &server,
        PRODUCTS,
        json!([{"id": 1, "sku": "A"}, {"id": 2, "sku": "X"}]),
    )
    .await;
    mount_sku_missing(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let config = SyncConfig::new()
        .with_reading(PAGE_SIZE, 2)
        .with_dry_run(true);
    let stats = engine(&server)
        .with_config(config)
        .run(&[source("A"), source("C")], Phases::default())
        .await;

    let products = stats.report(EntityKind::Product).unwrap();
    assert_eq!(
        (products.created, products.updated, products.deleted),
        (1, 1, 1)
    );
    let categories = stats.report(EntityKind::Category).unwrap();
    assert_eq!(categories.created, 2);
    assert!(!stats.has_errors());
}

#[tokio::test]
async fn test_failed_count_probe_aborts_only_that_kind() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        CATEGORIES,
        json!([
            {"id": 6, "name": "Laptops", "parent": 5},
            {"id": 5, "name": "Computers"}
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(PRODUCTS))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let stats = engine(&server).run(&[source("A")], Phases::default()).await;

    let categories = stats.report(EntityKind::Category).unwrap();
    assert!(!categories.aborted);
    assert!(!categories.has_errors());

    let products = stats.report(EntityKind::Product).unwrap();
    assert!(products.aborted);
    assert_eq!(products.errors.len(), 1);
    assert_eq!(stats.error_count(), 1);
}

#[tokio::test]
async fn test_existing_sku_is_skipped() {
    let server = MockServer::start().await;
    mount_listing(&server, CATEGORIES, json!([])).await;
    mount_listing(&server, PRODUCTS, json!([])).await;
    Mock::given(method("GET"))
        .and(path(PRODUCTS))
        .and(query_param("sku", "A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let stats = engine(&server).run(&[source("A")], products_only()).await;
    let report = stats.report(EntityKind::Product).unwrap();
    assert_eq!((report.created, report.skipped), (0, 1));
}

#[tokio::test]
async fn test_failed_batch_item_is_created_singly() {
    let server = MockServer::start().await;
    mount_listing(&server, CATEGORIES, json!([])).await;
    mount_listing(&server, PRODUCTS, json!([])).await;
    mount_sku_missing(&server).await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wc/v3/products/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "create": [{"id": 0, "error": {"code": "term_exists", "message": "busy"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PRODUCTS))
        .and(body_partial_json(json!({"sku": "C"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 11})))
        .expect(1)
        .mount(&server)
        .await;

    let stats = engine(&server).run(&[source("C")], products_only()).await;
    let report = stats.report(EntityKind::Product).unwrap();
    assert_eq!(report.created, 1);
    assert!(!report.has_errors());
}

// ============================================================================
// Categories
// ============================================================================

#[tokio::test]
async fn test_categories_are_created_in_two_tiers() {
    let server = MockServer::start().await;
    mount_listing(&server, CATEGORIES, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wc/v3/products/categories/batch"))
        .and(body_json(json!({"create": [{"name": "Computers"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"create": [{"id": 5}]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wc/v3/products/categories/batch"))
        .and(body_json(json!({"create": [{"name": "Laptops", "parent": 5}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"create": [{"id": 6}]})))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine(&server);
    let (report, ids) = engine.sync_categories(&[source("A")]).await;

    assert_eq!(report.created, 2);
    assert!(!report.has_errors());
    assert_eq!(ids.get("Computers"), Some(&5));
    assert_eq!(ids.get("Laptops"), Some(&6));
}

#[tokio::test]
async fn test_misplaced_category_is_moved_and_unknown_deleted() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        CATEGORIES,
        json!([
            {"id": 1, "name": "Computers", "parent": 0},
            {"id": 2, "name": "Laptops", "parent": 0},
            {"id": 3, "name": "Discontinued", "parent": 0}
        ]),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/wp-json/wc/v3/products/categories/2"))
        .and(body_json(json!({"parent": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wc/v3/products/categories/batch"))
        .and(body_json(json!({"delete": [3]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"delete": [{"id": 3}]})))
        .expect(1)
        .mount(&server)
        .await;

    let stats = engine(&server).run(&[source("A")], categories_only()).await;
    let report = stats.report(EntityKind::Category).unwrap();
    assert_eq!(
        (report.created, report.updated, report.deleted),
        (0, 1, 1)
    );
    assert!(stats.report(EntityKind::Product).is_none());
}

#[tokio::test]
async fn test_existing_child_is_moved_under_created_parent() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        CATEGORIES,
        json!([{"id": 6, "name": "Laptops", "parent": 0}]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wc/v3/products/categories/batch"))
        .and(body_json(json!({"create": [{"name": "Computers"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"create": [{"id": 9}]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/wp-json/wc/v3/products/categories/6"))
        .and(body_json(json!({"parent": 9})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 6})))
        .expect(1)
        .mount(&server)
        .await;

    let (report, ids) = engine(&server).sync_categories(&[source("A")]).await;

    assert!(!report.has_errors(), "{:?}", report.errors);
    assert_eq!((report.created, report.updated, report.deleted), (1, 1, 0));
    assert_eq!(ids.get("Computers"), Some(&9));
    assert_eq!(ids.get("Laptops"), Some(&6));
}

#[tokio::test]
async fn test_dry_run_counts_move_under_parent_to_be_created() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        CATEGORIES,
        json!([{"id": 6, "name": "Laptops", "parent": 0}]),
    )
    .await;
    for verb in ["POST", "PUT"] {
        Mock::given(method(verb))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
    }

    let config = SyncConfig::new()
        .with_reading(PAGE_SIZE, 2)
        .with_dry_run(true);
    let (report, _) = engine(&server)
        .with_config(config)
        .sync_categories(&[source("A")])
        .await;

    assert_eq!((report.created, report.updated), (1, 1));
}

#[tokio::test]
async fn test_unreadable_feed_records_count_as_skipped() {
    let server = MockServer::start().await;
    mount_listing(&server, CATEGORIES, json!([{"id": 6, "name": "Laptops"}])).await;
    mount_listing(&server, PRODUCTS, json!([])).await;
    mount_sku_missing(&server).await;
    Mock::given(method("POST"))
        .and(path("/wp-json/wc/v3/products/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"create": [{"id": 10}]})))
        .expect(1)
        .mount(&server)
        .await;

    let feed = SourceFeed {
        products: vec![source("C")],
        rejected: 2,
    };
    let stats = engine(&server).run_feed(&feed, products_only()).await;

    let report = stats.report(EntityKind::Product).unwrap();
    assert_eq!((report.created, report.skipped), (1, 2));
    assert!(!report.has_errors(), "{:?}", report.errors);
}

// ============================================================================
// Reports
// ============================================================================

#[test]
fn test_report_display() {
    let mut report = SyncReport::new(EntityKind::Product);
    report.created = 3;
    report.record_error("boom");
    assert_eq!(
        report.to_string(),
        "products: created 3, updated 0, deleted 0, skipped 0, errors 1"
    );

    report.aborted = true;
    assert!(report.to_string().ends_with("(aborted)"));
}

#[test]
fn test_absorb_stream_errors_flags_probe_failure() {
    let mut report = SyncReport::new(EntityKind::Category);
    let aborted = absorb_stream_errors(
        &mut report,
        vec![
            Error::Other("page 3 failed".to_string()),
            Error::count_probe("http://x", "down"),
        ],
    );
    assert!(aborted);
    assert!(report.aborted);
    assert_eq!(report.errors.len(), 2);
}

#[test]
fn test_sync_config_defaults() {
    let config = SyncConfig::default();
    assert_eq!(config.page_size, 100);
    assert_eq!(config.read_workers, 10);
    assert_eq!(config.delete, WorkerPlan::new(3, 40));
    assert_eq!(config.product_create, WorkerPlan::new(1, 10));
    assert!(!config.dry_run);
}
