//! Shared utilities for the end-to-end tests

#![allow(dead_code)]

pub mod upstream;

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use http::{HeaderMap, Method, Request, StatusCode};
use tempfile::TempDir;
use tower::ServiceExt;

use docs_edge::app::EdgeServices;
use docs_edge::config::SiteConfig;
use docs_edge::site::server;
use docs_edge::store::SqliteStore;

pub use upstream::FakeGitHub;

/// Services backed by a file database in a temporary directory
pub fn create_services(config: &SiteConfig) -> (TempDir, EdgeServices) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteStore::new(&temp_dir.path().join("edge.db")).unwrap();
    let services = EdgeServices::from_config(config, Arc::new(store));
    (temp_dir, services)
}

pub fn create_app(services: &EdgeServices) -> Router {
    server::app(Arc::new(services.router()))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub async fn send(app: &Router, method: Method, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    send(app, Method::GET, uri, &[]).await
}
