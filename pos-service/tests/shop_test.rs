mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn shop_profile_starts_blank() {
    let app = TestApp::spawn().await;

    let (status, body) = app.call_json(Method::GET, "/user-details", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shopName"], "");
    assert_eq!(body["phone"], "");
    assert_eq!(body["address"], "");
}

#[tokio::test]
async fn shop_profile_updates_merge() {
    let app = TestApp::spawn().await;

    app.call_json(
        Method::PUT,
        "/user-details",
        Some(json!({"shopName": "Annapoorna", "phone": "0422 255 1234"})),
    )
    .await;
    let (status, body) = app
        .call_json(
            Method::PUT,
            "/user-details",
            Some(json!({"address": "12 Cross Cut Road"})),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shopName"], "Annapoorna");
    assert_eq!(body["phone"], "0422 255 1234");
    assert_eq!(body["address"], "12 Cross Cut Road");

    let (_, fetched) = app.call_json(Method::GET, "/user-details", None).await;
    assert_eq!(fetched, body);
}

#[tokio::test]
async fn customers_are_unique_by_phone() {
    let app = TestApp::spawn().await;

    let (status, created) = app
        .call_json(
            Method::POST,
            "/customers",
            Some(json!({"name": "Meena", "phone": "9876543210"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["id"].is_string());

    let (status, _) = app
        .call_json(
            Method::POST,
            "/customers",
            Some(json!({"name": "Someone Else", "phone": "9876543210"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, found) = app
        .call_json(Method::GET, "/customers/phone/9876543210", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["name"], "Meena");

    let (_, all) = app.call_json(Method::GET, "/customers", None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let app = TestApp::spawn().await;

    let (status, body) = app
        .call_json(Method::GET, "/customers/phone/000", None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Customer not found");
}
