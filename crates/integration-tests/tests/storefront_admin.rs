//! Integration tests for the admin dashboard.

#![allow(clippy::unwrap_used)]

use atelier_core::UserRole;
use atelier_integration_tests::{ADMIN, ALICE, BOB, Marketplace, TestContext, location};
use reqwest::StatusCode;

#[tokio::test]
async fn test_dashboard_requires_admin_role() {
    let ctx = TestContext::start(Marketplace::default()).await;

    let bob = TestContext::client();
    ctx.login(&bob, BOB).await;
    let response = bob.get(ctx.url("/admin")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response.text().await.unwrap();
    assert!(body.contains("Access Denied"));
    assert!(!body.contains("href=\"/admin\""));

    let admin = TestContext::client();
    ctx.login(&admin, ADMIN).await;
    let response = admin.get(ctx.url("/admin")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Admin Dashboard"));
    assert!(body.contains("href=\"/admin\""));
    assert!(body.contains("Creator receives 90% of each sale"));
}

#[tokio::test]
async fn test_member_cannot_post_admin_forms() {
    let ctx = TestContext::start(Marketplace::default()).await;
    let client = TestContext::client();
    ctx.login(&client, BOB).await;

    let response = client
        .post(ctx.url("/admin/fees"))
        .form(&[("fee_percentage", "50")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let market = ctx.market();
    assert_eq!(market.brand.fee_percentage, 10);
    assert_eq!(market.count("updateBrandConfig"), 0);
}

#[tokio::test]
async fn test_fee_update_keeps_branding() {
    let mut market = Marketplace::default();
    market.brand.platform_name = "Kiln".to_string();
    market.brand.primary_color = "#aa3300".to_string();
    let ctx = TestContext::start(market).await;
    let client = TestContext::client();
    ctx.login(&client, ADMIN).await;

    let response = client
        .post(ctx.url("/admin/fees"))
        .form(&[("fee_percentage", "15")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin");

    {
        let market = ctx.market();
        assert_eq!(market.brand.fee_percentage, 15);
        assert_eq!(market.brand.platform_name, "Kiln");
        assert_eq!(market.brand.primary_color, "#aa3300");
    }

    let response = client
        .post(ctx.url("/admin/fees"))
        .form(&[("fee_percentage", "101")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().await.unwrap().contains("between 0 and 100"));
    assert_eq!(ctx.market().brand.fee_percentage, 15);
}

#[tokio::test]
async fn test_branding_update_and_validation() {
    let ctx = TestContext::start(Marketplace::default()).await;
    let client = TestContext::client();
    ctx.login(&client, ADMIN).await;

    let response = client
        .post(ctx.url("/admin/branding"))
        .form(&[
            ("platform_name", "Kiln & Canvas"),
            ("logo_url", ""),
            ("primary_color", "red"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Primary color must look like"));
    assert!(body.contains("Kiln &amp; Canvas") || body.contains("Kiln &#38; Canvas"));
    assert_eq!(ctx.market().count("updateBrandConfig"), 0);

    let response = client
        .post(ctx.url("/admin/branding"))
        .form(&[
            ("platform_name", "Kiln & Canvas"),
            ("logo_url", "https://cdn.example.org/logo.png"),
            ("primary_color", "#1a2b3c"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    {
        let market = ctx.market();
        assert_eq!(market.brand.platform_name, "Kiln & Canvas");
        assert_eq!(market.brand.fee_percentage, 10);
    }

    // Every page picks up the new branding
    let body = TestContext::client()
        .get(ctx.url("/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("https://cdn.example.org/logo.png"));

    let css = client
        .get(ctx.url("/brand.css"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(css.contains("#1a2b3c"));
}

#[tokio::test]
async fn test_role_assignment_grants_admin() {
    let ctx = TestContext::start(Marketplace::default()).await;

    let admin = TestContext::client();
    ctx.login(&admin, ADMIN).await;

    let response = admin
        .post(ctx.url("/admin/roles"))
        .form(&[("principal", "not a principal"), ("role", "admin")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = admin
        .post(ctx.url("/admin/roles"))
        .form(&[("principal", ALICE), ("role", "admin")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .text()
            .await
            .unwrap()
            .contains(&format!("{ALICE} is now admin"))
    );
    assert_eq!(ctx.market().roles.get(ALICE), Some(&UserRole::Admin));

    let alice = TestContext::client();
    ctx.login(&alice, ALICE).await;
    let response = alice.get(ctx.url("/admin")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stripe_form_hidden_once_configured() {
    let mut market = Marketplace::default();
    market.stripe_configured = true;
    let ctx = TestContext::start(market).await;
    let client = TestContext::client();
    ctx.login(&client, ADMIN).await;

    let body = client
        .get(ctx.url("/admin"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!body.contains("name=\"secret_key\""));
    assert!(body.contains("/admin?stripe=edit"));

    let body = client
        .get(ctx.url("/admin?stripe=edit"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("name=\"secret_key\""));

    let response = client
        .post(ctx.url("/admin/stripe"))
        .form(&[("secret_key", ""), ("allowed_countries", "US")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.market().count("setStripeConfiguration"), 0);
}
