#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use pos_service::build_router;
use pos_service::config::{
    AuthConfig, MongoConfig, PosConfig, ReportConfig, ShopConfig, StoreBackend,
};
use pos_service::services::{InMemoryStore, PosStore};
use pos_service::startup::build_state;
use rust_decimal::Decimal;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const USERNAME: &str = "counter";
pub const PASSWORD: &str = "till-password";
pub const JWT_SECRET: &str = "integration-test-secret";

pub fn test_config() -> PosConfig {
    PosConfig {
        common: CoreConfig {
            port: 0,
            log_level: "error".to_string(),
            otlp_endpoint: None,
        },
        mongodb: MongoConfig {
            uri: std::env::var("TEST_MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database: format!("pos_test_{}", uuid::Uuid::new_v4().simple()),
        },
        store: StoreBackend::Memory,
        auth: AuthConfig {
            username: USERNAME.to_string(),
            password: Secret::new(PASSWORD.to_string()),
            jwt_secret: Secret::new(JWT_SECRET.to_string()),
            jwt_expiry_hours: 12,
        },
        report: ReportConfig {
            tax_rate: Decimal::new(10, 2),
            storage_limit_mb: 512,
        },
        shop: ShopConfig {
            utc_offset_minutes: Some(330),
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub token: String,
}

impl TestApp {
    /// Router over a fresh in-memory store, already logged in.
    pub async fn spawn() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let dyn_store: Arc<dyn PosStore> = store.clone();
        let state = build_state(&test_config(), dyn_store)
            .await
            .expect("Failed to build test state");
        let router = build_router(state);

        let mut app = Self {
            router,
            store,
            token: String::new(),
        };
        app.token = app.login().await;
        app
    }

    async fn login(&self) -> String {
        let response = self
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri("/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({"username": USERNAME, "password": PASSWORD}).to_string(),
                    ))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "test login failed");
        let body = body_json(response).await;
        body["token"].as_str().expect("token missing").to_string()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request")
    }

    /// Authenticated request with an optional JSON body.
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token));

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.send(request).await
    }

    pub async fn call_json(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.call(method, uri, body).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn create_bill(&self, items: Value, total: f64) -> Value {
        let (status, body) = self
            .call_json(
                Method::POST,
                "/bill-items",
                Some(json!({"items": items, "total": total})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create bill failed: {}", body);
        body
    }

    pub async fn create_menu_item(&self, item: Value) -> Value {
        let (status, body) = self.call_json(Method::POST, "/menu-items", Some(item)).await;
        assert_eq!(status, StatusCode::CREATED, "create menu item failed: {}", body);
        body
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = body_bytes(response).await;
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}

pub fn tea() -> Value {
    json!([{"name": "Tea", "quantity": 2, "price": 10, "total": 20}])
}
