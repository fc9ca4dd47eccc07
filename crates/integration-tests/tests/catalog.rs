//! End-to-end catalog CRUD tests.

use reqwest::StatusCode;
use serde_json::{Value, json};

use cartwheel_integration_tests::TestApp;

fn product_body(title: &str, price: i64) -> Value {
    json!({
        "title": title,
        "description": "A thing",
        "company": "c-unknown",
        "price": price,
        "image": "thing.png",
    })
}

async fn list(app: &TestApp, collection: &str) -> Vec<Value> {
    app.client
        .get(app.url(&format!("/{collection}")))
        .send()
        .await
        .expect("list request failed")
        .json()
        .await
        .expect("list body")
}

#[tokio::test]
async fn test_created_ids_are_unique() {
    let app = TestApp::spawn().await;

    let a = app.create("owners", &json!({ "name": "A" })).await;
    let b = app.create("owners", &json!({ "name": "A" })).await;
    assert_ne!(a["id"], b["id"]);

    let owners = list(&app, "owners").await;
    assert_eq!(owners.len(), 2);
    assert_eq!(owners[0]["id"], a["id"]);
}

#[tokio::test]
async fn test_product_lifecycle() {
    let app = TestApp::spawn().await;
    let created = app.create("products", &product_body("Lamp", 1200)).await;
    let id = created["id"].as_str().expect("id").to_string();
    let path = app.url(&format!("/products/{id}"));

    let fetched: Value = app
        .client
        .get(&path)
        .send()
        .await
        .expect("get failed")
        .json()
        .await
        .expect("get body");
    assert_eq!(fetched, created);

    let resp = app
        .client
        .put(&path)
        .json(&product_body("Desk lamp", 1500))
        .send()
        .await
        .expect("put failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.expect("put body");
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["title"], "Desk lamp");
    assert_eq!(updated["price"], 1500);

    let resp = app.client.delete(&path).send().await.expect("delete failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("delete body");
    assert_eq!(body, json!({ "message": "Item deleted successfully" }));

    let resp = app.client.get(&path).send().await.expect("get failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_unknown_product_changes_nothing() {
    let app = TestApp::spawn().await;
    app.create("products", &product_body("Lamp", 1200)).await;
    let before = list(&app, "products").await;

    let resp = app
        .client
        .put(app.url("/products/does-not-exist"))
        .json(&product_body("Ghost", 1))
        .send()
        .await
        .expect("put failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    assert_eq!(list(&app, "products").await, before);
}

#[tokio::test]
async fn test_delete_unknown_is_not_found() {
    let app = TestApp::spawn().await;
    let resp = app
        .client
        .delete(app.url("/companies/nope"))
        .send()
        .await
        .expect("delete failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_payloads_are_rejected() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/products"))
        .json(&product_body("Lamp", -1))
        .send()
        .await
        .expect("post failed");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = app
        .client
        .post(app.url("/companies"))
        .json(&json!({ "title": "No owner" }))
        .send()
        .await
        .expect("post failed");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    assert!(list(&app, "products").await.is_empty());
    assert!(list(&app, "companies").await.is_empty());
}
