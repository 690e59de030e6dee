//! Shared HTTP harness: a router over the seeded Roof Repair scenario.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use pagewright_api::{create_api_router, ApiConfig, AppState, RenderConfig};
use pagewright_storage::MemoryCacheStore;
use pagewright_test_utils::fixtures::{seeded_store, Scenario};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub scenario: Scenario,
    pub cache: Arc<MemoryCacheStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Result<serde_json::Value, String> {
        serde_json::from_slice(&self.body).map_err(|e| e.to_string())
    }

    pub fn header(&self, name: header::HeaderName) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

pub fn test_app() -> Result<TestApp, String> {
    test_app_with(RenderConfig::default())
}

pub fn test_app_with(config: RenderConfig) -> Result<TestApp, String> {
    let scenario = seeded_store();
    let cache = Arc::new(MemoryCacheStore::default());
    let state = AppState::new(Arc::new(scenario.store.clone()), cache.clone(), config);
    let router = create_api_router(state, &ApiConfig::default()).map_err(|e| e.to_string())?;
    Ok(TestApp {
        router,
        scenario,
        cache,
    })
}

impl TestApp {
    pub async fn request(&self, request: Request<Body>) -> Result<TestResponse, String> {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse, String> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .map_err(|e| e.to_string())?;
        self.request(request).await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Result<TestResponse, String> {
        self.post_raw(uri, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, body: String) -> Result<TestResponse, String> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|e| e.to_string())?;
        self.request(request).await
    }
}
