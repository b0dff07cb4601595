//! Integration tests for listing, editing, deleting and buying items.

#![allow(clippy::unwrap_used)]

use atelier_core::Category;
use atelier_integration_tests::{
    ADMIN, ALICE, BOB, CHECKOUT_URL, Marketplace, TestContext, item, location,
};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

fn with_listing() -> Marketplace {
    let mut market = Marketplace::default();
    market.set_profile(ALICE, "Alice Moreau");
    market.set_profile(BOB, "Bob Hale");
    market.items.push(item("1-a", "Harbor at Dusk", Category::Paintings, ALICE, 12_000));
    market
}

fn create_form(title: &str, with_image: bool) -> Form {
    let form = Form::new()
        .text("title", title.to_string())
        .text("category", "ceramics")
        .text("price", "40.50")
        .text("description", "Wheel-thrown stoneware bowl.")
        .text("action", "submit");
    if with_image {
        let png = Part::bytes(vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a])
            .file_name("bowl.png")
            .mime_str("image/png")
            .unwrap();
        form.part("images", png)
    } else {
        form
    }
}

#[tokio::test]
async fn test_guest_purchase_redirects_to_checkout() {
    let ctx = TestContext::start(with_listing()).await;
    let client = TestContext::client();

    let response = client.post(ctx.url("/item/1-a/purchase")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), CHECKOUT_URL);

    let market = ctx.market();
    let args = market.checkout_requests.first().unwrap();
    let line_items = args.first().unwrap().as_array().unwrap();
    assert_eq!(line_items.len(), 1);
    assert_eq!(
        line_items.first().unwrap().get("priceInCents").and_then(Value::as_u64),
        Some(12_000)
    );

    let success_url = args.get(1).and_then(Value::as_str).unwrap();
    assert!(success_url.starts_with(&ctx.base_url));
    assert!(success_url.ends_with("/payment-success?session_id={CHECKOUT_SESSION_ID}"));
    assert_eq!(
        args.get(2).and_then(Value::as_str).unwrap(),
        ctx.url("/payment-failure")
    );
}

#[tokio::test]
async fn test_checkout_without_url_shows_error() {
    let mut market = with_listing();
    market.checkout_url = None;
    let ctx = TestContext::start(market).await;
    let client = TestContext::client();

    let response = client.post(ctx.url("/item/1-a/purchase")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Stripe session missing url"));
    assert!(body.contains("Harbor at Dusk"));
}

#[tokio::test]
async fn test_creator_cannot_buy_own_item() {
    let ctx = TestContext::start(with_listing()).await;
    let client = TestContext::client();
    ctx.login(&client, ALICE).await;

    let body = client
        .get(ctx.url("/item/1-a"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!body.contains("Buy Now"));
    assert!(body.contains("/edit-item/1-a"));

    let response = client.post(ctx.url("/item/1-a/purchase")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(ctx.market().checkout_requests.is_empty());
}

#[tokio::test]
async fn test_only_creator_can_edit() {
    let ctx = TestContext::start(with_listing()).await;

    let bob = TestContext::client();
    ctx.login(&bob, BOB).await;
    let response = bob.get(ctx.url("/edit-item/1-a")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let alice = TestContext::client();
    ctx.login(&alice, ALICE).await;
    let response = alice.get(ctx.url("/edit-item/1-a")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Edit Item"));
    assert!(body.contains("120.00"));

    let response = alice
        .post(ctx.url("/edit-item/1-a"))
        .form(&[
            ("title", "Harbor at Dawn"),
            ("category", "paintings"),
            ("price", "150"),
            ("description", "Oil on linen."),
            ("action", "submit"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/item/1-a");

    let market = ctx.market();
    let updated = market.items.first().unwrap();
    assert_eq!(updated.title, "Harbor at Dawn");
    assert_eq!(updated.price.cents(), 15_000);
    assert_eq!(updated.creator.as_str(), ALICE);
}

#[tokio::test]
async fn test_edit_validation_keeps_input() {
    let ctx = TestContext::start(with_listing()).await;
    let client = TestContext::client();
    ctx.login(&client, ALICE).await;

    let response = client
        .post(ctx.url("/edit-item/1-a"))
        .form(&[
            ("title", "Kept Title"),
            ("category", "paintings"),
            ("price", "free"),
            ("description", ""),
            ("action", "submit"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Kept Title"));
    assert!(body.contains("Description is required"));
    assert_eq!(ctx.market().count("updateItem"), 0);
}

#[tokio::test]
async fn test_generate_description_falls_back() {
    let ctx = TestContext::start(with_listing()).await;
    let client = TestContext::client();
    ctx.login(&client, ALICE).await;

    let response = client
        .post(ctx.url("/edit-item/1-a"))
        .form(&[
            ("title", "Harbor at Dusk"),
            ("category", "paintings"),
            ("price", "120"),
            ("description", ""),
            ("action", "generate"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("exceptional craftsmanship"));
    assert_eq!(ctx.market().count("generateItemDescription"), 1);
    assert_eq!(ctx.market().count("updateItem"), 0);
}

#[tokio::test]
async fn test_admin_can_delete_any_item() {
    let ctx = TestContext::start(with_listing()).await;

    let bob = TestContext::client();
    ctx.login(&bob, BOB).await;
    let response = bob.post(ctx.url("/item/1-a/delete")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.market().items.len(), 1);

    let admin = TestContext::client();
    ctx.login(&admin, ADMIN).await;
    let response = admin.post(ctx.url("/item/1-a/delete")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/browse");
    assert!(ctx.market().items.is_empty());

    let response = admin.get(ctx.url("/item/1-a")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_requires_artist_and_stripe() {
    let ctx = TestContext::start(with_listing()).await;
    let client = TestContext::client();
    ctx.login(&client, BOB).await;

    let body = client
        .get(ctx.url("/create-item"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("List a New Item"));
    assert!(body.contains("href=\"/settings\""));

    let response = client
        .post(ctx.url("/create-item"))
        .multipart(create_form("Blue Bowl", true))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.market().count("addItem"), 0);
}

#[tokio::test]
async fn test_artist_creates_item_with_upload() {
    let mut market = with_listing();
    market.make_seller(BOB);
    let ctx = TestContext::start(market).await;
    let client = TestContext::client();
    ctx.login(&client, BOB).await;

    let response = client
        .post(ctx.url("/create-item"))
        .multipart(create_form("Blue Bowl", true))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/browse");

    {
        let market = ctx.market();
        let created = market.items.iter().find(|i| i.title == "Blue Bowl").unwrap();
        assert_eq!(created.creator.as_str(), BOB);
        assert_eq!(created.category, Category::Ceramics);
        assert_eq!(created.price.cents(), 4_050);
        assert_eq!(created.images.len(), 1);
        assert!(created.images.first().unwrap().starts_with("data:image/png;base64,"));
    }

    let body = client
        .get(ctx.url("/browse?category=ceramics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Blue Bowl"));
}

#[tokio::test]
async fn test_create_reports_missing_fields() {
    let mut market = Marketplace::default();
    market.make_seller(BOB);
    let ctx = TestContext::start(market).await;
    let client = TestContext::client();
    ctx.login(&client, BOB).await;

    let response = client
        .post(ctx.url("/create-item"))
        .multipart(create_form("", false))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Title is required"));
    assert!(body.contains("Upload at least one image"));
    assert!(body.contains("Wheel-thrown stoneware bowl."));
    assert_eq!(ctx.market().count("addItem"), 0);
}
