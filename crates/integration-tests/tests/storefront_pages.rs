//! Integration tests for public storefront pages.

#![allow(clippy::unwrap_used)]

use atelier_core::Category;
use atelier_integration_tests::{ALICE, Marketplace, TestContext, item};
use reqwest::StatusCode;

fn catalog() -> Marketplace {
    let mut market = Marketplace::default();
    market.set_profile(ALICE, "Alice Moreau");
    market.items.push(item("1-a", "Harbor at Dusk", Category::Paintings, ALICE, 12_000));
    market.items.push(item("2-b", "Night Songs", Category::Music, ALICE, 900));
    market
}

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = TestContext::start(Marketplace::default()).await;
    let client = TestContext::client();

    let response = client.get(ctx.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");

    let response = client.get(ctx.url("/health/ready")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_home_lists_items_with_creator_names() {
    let ctx = TestContext::start(catalog()).await;
    let client = TestContext::client();

    let response = client.get(ctx.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert!(headers.contains_key("content-security-policy"));
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.contains_key("x-request-id"));

    let body = response.text().await.unwrap();
    assert!(body.contains("Featured Works"));
    assert!(body.contains("Harbor at Dusk"));
    assert!(body.contains("Alice Moreau"));
    assert!(body.contains("Login"));
}

#[tokio::test]
async fn test_guest_pages_skip_caller_queries() {
    let ctx = TestContext::start(catalog()).await;
    let client = TestContext::client();

    client.get(ctx.url("/browse")).send().await.unwrap();

    let market = ctx.market();
    assert_eq!(market.count("getCallerUserProfile"), 0);
    assert_eq!(market.count("isCallerAdmin"), 0);
}

#[tokio::test]
async fn test_browse_filters_by_category() {
    let ctx = TestContext::start(catalog()).await;
    let client = TestContext::client();

    let body = client
        .get(ctx.url("/browse?category=music"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Browse Marketplace"));
    assert!(body.contains("Night Songs"));
    assert!(!body.contains("Harbor at Dusk"));

    // Unknown categories fall back to everything
    let body = client
        .get(ctx.url("/browse?category=sculpture"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Night Songs"));
    assert!(body.contains("Harbor at Dusk"));
}

#[tokio::test]
async fn test_empty_catalog_message() {
    let ctx = TestContext::start(Marketplace::default()).await;
    let client = TestContext::client();

    let body = client
        .get(ctx.url("/browse"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("No items found. Be the first to list something!"));
}

#[tokio::test]
async fn test_item_detail_and_not_found() {
    let ctx = TestContext::start(catalog()).await;
    let client = TestContext::client();

    let response = client.get(ctx.url("/item/1-a")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Harbor at Dusk"));
    assert!(body.contains("$120.00"));
    assert!(body.contains("Buy Now"));

    let response = client.get(ctx.url("/item/missing")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().contains("Item Not Found"));
}

#[tokio::test]
async fn test_brand_stylesheet_uses_configured_color() {
    let mut market = Marketplace::default();
    market.brand.primary_color = "#aa3300".to_string();
    let ctx = TestContext::start(market).await;
    let client = TestContext::client();

    let response = client.get(ctx.url("/brand.css")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/css")
    );
    assert!(response.text().await.unwrap().contains("#aa3300"));
}

#[tokio::test]
async fn test_guest_is_denied_member_pages() {
    let ctx = TestContext::start(Marketplace::default()).await;
    let client = TestContext::client();

    for path in ["/create-item", "/settings", "/admin"] {
        let response = client.get(ctx.url(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{path}");
        assert!(response.text().await.unwrap().contains("Access Denied"));
    }
}

#[tokio::test]
async fn test_payment_return_pages() {
    let ctx = TestContext::start(Marketplace::default()).await;
    let client = TestContext::client();

    let body = client
        .get(ctx.url("/payment-success?session_id=cs_test_1"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Payment Successful!"));

    let body = client
        .get(ctx.url("/payment-success?session_id=cs_failed"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Payment Not Completed"));
    assert!(body.contains("Card declined"));

    let body = client
        .get(ctx.url("/payment-failure"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Payment Cancelled"));
}
