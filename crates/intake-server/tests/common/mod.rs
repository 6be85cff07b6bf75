//! Shared helpers for router tests over in-memory stores

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use intake_common::RecordKind;
use intake_server::{
    api::create_router,
    config::{Config, IngestConfig},
    features::FeatureState,
    ingest::{FileStatusTracker, MemoryRecordSink, MemorySchemaStore, PersistenceError, RecordSink},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const BOUNDARY: &str = "intake-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub sink: Arc<MemoryRecordSink>,
    pub tracker: Arc<FileStatusTracker>,
}

/// Sink that refuses every batch
pub struct FailingSink;

#[async_trait]
impl RecordSink for FailingSink {
    async fn persist(
        &self,
        _kind: RecordKind,
        _name: &str,
        _records: Vec<Value>,
    ) -> Result<u64, PersistenceError> {
        Err(PersistenceError::Unavailable("connection refused".to_string()))
    }
}

fn schema(kind: RecordKind, required: &[&str]) -> Value {
    json!({
        "input": {
            "type": "object",
            "required": [kind.name_field(), kind.records_field()],
            "properties": {
                kind.name_field(): {"type": "string"},
                kind.records_field(): {
                    "type": "array",
                    "items": {"type": "object", "required": required}
                }
            }
        }
    })
}

pub fn schema_store() -> MemorySchemaStore {
    MemorySchemaStore::new()
        .with_schema(
            RecordKind::Dimension,
            "district",
            schema(RecordKind::Dimension, &["name", "district_id"]),
        )
        .with_schema(
            RecordKind::Event,
            "student_attendance",
            schema(RecordKind::Event, &["school_id", "grade", "count"]),
        )
        .with_schema(
            RecordKind::Dataset,
            "enrolment",
            schema(RecordKind::Dataset, &["school_id", "enrolled"]),
        )
}

pub fn ingest_config(expected_kinds: &[RecordKind]) -> IngestConfig {
    IngestConfig {
        expected_kinds: expected_kinds.to_vec(),
        ..IngestConfig::default()
    }
}

pub fn test_app_with(sink: Arc<dyn RecordSink>, config: IngestConfig) -> (Router, Arc<FileStatusTracker>) {
    let state = FeatureState::new(Arc::new(schema_store()), sink, &config);
    let tracker = state.tracker.clone();
    let app_config = Config {
        ingest: config,
        ..Config::default()
    };

    (create_router(state, &app_config), tracker)
}

pub fn test_app() -> TestApp {
    let sink = Arc::new(MemoryRecordSink::new());
    let (router, tracker) = test_app_with(sink.clone(), IngestConfig::default());

    TestApp {
        router,
        sink,
        tracker,
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// A multipart part: field name, optional content type, value
pub type Part<'a> = (&'a str, Option<&'a str>, &'a str);

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = String::new();
    for (name, content_type, value) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match content_type {
            Some(content_type) => {
                body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}.csv\"\r\n"
                ));
                body.push_str(&format!("Content-Type: {content_type}\r\n\r\n"));
            },
            None => {
                body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"));
            },
        }
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Send a request and decode the JSON response body
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    (status, body)
}
