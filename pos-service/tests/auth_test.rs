mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{body_json, TestApp, JWT_SECRET, PASSWORD, USERNAME};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"username": username, "password": password}).to_string(),
        ))
        .unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn login_issues_bearer_token() {
    let app = TestApp::spawn().await;

    let response = app.send(login_request(USERNAME, PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 12 * 3600);
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app.send(login_request(USERNAME, "guess")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Invalid credentials");

    let response = app.send(login_request("someone", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app
        .send(Request::builder().uri("/bill-items").body(Body::empty()).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Authentication required");
}

#[tokio::test]
async fn garbage_token_is_forbidden() {
    let app = TestApp::spawn().await;

    let response = app.send(get_with_token("/menu-items", "not.a.jwt")).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["message"], "Invalid or expired token");
}

#[tokio::test]
async fn expired_token_is_forbidden() {
    let app = TestApp::spawn().await;
    let now = chrono::Utc::now().timestamp();
    let token = encode(
        &Header::default(),
        &json!({"sub": USERNAME, "iat": now - 7200, "exp": now - 3600}),
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let response = app.send(get_with_token("/bill-items", &token)).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_forbidden() {
    let app = TestApp::spawn().await;
    let now = chrono::Utc::now().timestamp();
    let token = encode(
        &Header::default(),
        &json!({"sub": USERNAME, "iat": now, "exp": now + 3600}),
        &EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();

    let response = app.send(get_with_token("/bill-items", &token)).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn issued_token_opens_protected_routes() {
    let app = TestApp::spawn().await;

    let response = app.send(get_with_token("/bill-items", &app.token)).await;

    assert_eq!(response.status(), StatusCode::OK);
}
