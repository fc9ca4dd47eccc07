//! End-to-end cart scenarios: catalog setup, sign-in, add and remove.

use reqwest::StatusCode;
use serde_json::{Value, json};

use cartwheel_integration_tests::TestApp;

/// Create an owner, a company, and a product; return the product id.
async fn seed_product(app: &TestApp) -> String {
    let owner = app.create("owners", &json!({ "name": "Ada" })).await;
    let company = app
        .create(
            "companies",
            &json!({
                "title": "Analytical Engines",
                "description": "Difference and analytical engines",
                "owner": owner["id"],
                "image": "engine.png",
            }),
        )
        .await;
    let product = app
        .create(
            "products",
            &json!({
                "title": "Engine No. 2",
                "description": "Brass, hand-cranked",
                "company": company["id"],
                "price": 1500,
                "image": "engine-2.png",
            }),
        )
        .await;

    assert_eq!(product["company"], company["id"]);
    product["id"].as_str().expect("product id").to_string()
}

async fn cart_call(
    app: &TestApp,
    method: reqwest::Method,
    path: &str,
    token: &str,
    pid: &str,
) -> reqwest::Response {
    app.client
        .request(method, app.url(path))
        .bearer_auth(token)
        .query(&[("product_id", pid)])
        .send()
        .await
        .expect("cart request failed")
}

#[tokio::test]
async fn test_add_twice_remove_once_leaves_one() {
    let app = TestApp::spawn().await;
    let pid = seed_product(&app).await;

    let registered = app.register("ada@example.com").await;
    assert_eq!(registered["cart"], json!({}));
    let token = app.token("ada@example.com").await;

    for _ in 0..2 {
        let resp = cart_call(&app, reqwest::Method::POST, "/add_to_bucket", &token, &pid).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = cart_call(&app, reqwest::Method::DELETE, "/remove_product", &token, &pid).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let user: Value = resp.json().await.expect("user body");
    assert_eq!(user["cart"], json!({ pid.clone(): 1 }));

    let me: Value = app
        .client
        .get(app.url("/users/me"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("me request failed")
        .json()
        .await
        .expect("me body");
    assert_eq!(me["cart"], json!({ pid: 1 }));
    assert_eq!(me["email"], "ada@example.com");
    assert!(me.get("cart_version").is_none());
}

#[tokio::test]
async fn test_remove_last_unit_drops_product() {
    let app = TestApp::spawn().await;
    app.register("grace@example.com").await;
    let token = app.token("grace@example.com").await;

    cart_call(&app, reqwest::Method::POST, "/add_to_bucket", &token, "p-1").await;
    let resp = cart_call(&app, reqwest::Method::DELETE, "/remove_product", &token, "p-1").await;
    let user: Value = resp.json().await.expect("user body");
    assert_eq!(user["cart"], json!({}));
}

#[tokio::test]
async fn test_remove_absent_product_is_not_found() {
    let app = TestApp::spawn().await;
    app.register("linus@example.com").await;
    let token = app.token("linus@example.com").await;
    cart_call(&app, reqwest::Method::POST, "/add_to_bucket", &token, "kept").await;

    let resp = cart_call(&app, reqwest::Method::DELETE, "/remove_product", &token, "missing").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let me: Value = app
        .client
        .get(app.url("/users/me"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("me request failed")
        .json()
        .await
        .expect("me body");
    assert_eq!(me["cart"], json!({ "kept": 1 }));
}

#[tokio::test]
async fn test_cart_requires_token_and_product_id() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/add_to_bucket"))
        .query(&[("product_id", "p-1")])
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    app.register("ken@example.com").await;
    let token = app.token("ken@example.com").await;
    let resp = app
        .client
        .post(app.url("/add_to_bucket"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_adds_are_all_counted() {
    let app = TestApp::spawn().await;
    app.register("barbara@example.com").await;
    let token = app.token("barbara@example.com").await;

    let (a, b) = tokio::join!(
        cart_call(&app, reqwest::Method::POST, "/add_to_bucket", &token, "p-9"),
        cart_call(&app, reqwest::Method::POST, "/add_to_bucket", &token, "p-9"),
    );
    assert_eq!(a.status(), StatusCode::OK);
    assert_eq!(b.status(), StatusCode::OK);

    let me: Value = app
        .client
        .get(app.url("/users/me"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("me request failed")
        .json()
        .await
        .expect("me body");
    assert_eq!(me["cart"], json!({ "p-9": 2 }));
}
