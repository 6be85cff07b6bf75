//! Router tests for file registration, CSV uploads and status tracking

use axum::http::{Method, StatusCode};
use serde_json::json;
use std::sync::Arc;

mod common;

use common::{
    get_request, ingest_config, json_request, multipart_request, send, test_app, test_app_with,
};
use intake_common::{FileState, RecordKind};
use intake_server::ingest::MemoryRecordSink;

const DISTRICTS: &str = "name,district_id\njhaha,SH123\nbelur,SH124\n";

#[tokio::test]
async fn test_register_and_get() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        json_request(Method::POST, "/api/v1/file-status", json!({"file_id": "f1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["response"]["current_state"], "received");
    assert_eq!(body["response"]["ready_to_archive"], false);

    let (status, body) = send(&app.router, get_request("/api/v1/file-status?file_id=f1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"]["file_id"], "f1");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = test_app();
    let request = || json_request(Method::POST, "/api/v1/file-status", json!({"file_id": "f1"}));

    send(&app.router, request()).await;
    let (status, body) = send(&app.router, request()).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"message": "File f1 is already registered"}));
}

#[tokio::test]
async fn test_get_unknown_or_missing_file() {
    let app = test_app();

    let (status, body) = send(&app.router, get_request("/api/v1/file-status?file_id=nope")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"message": "No file status found"}));

    let (status, body) = send(&app.router, get_request("/api/v1/file-status")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"message": "File id is missing"}));
}

#[tokio::test]
async fn test_status_updates_follow_state_machine() {
    let app = test_app();
    app.tracker.register("f1").unwrap();

    let (status, body) = send(
        &app.router,
        json_request(
            Method::PUT,
            "/api/v1/file-status",
            json!({"file_id": "f1", "status": "archived"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("received"));

    for (next, ready) in [("processing", false), ("validated", true), ("archived", false)] {
        let (status, body) = send(
            &app.router,
            json_request(
                Method::PUT,
                "/api/v1/file-status",
                json!({"file_id": "f1", "status": next}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready_to_archive"], ready);
    }

    assert_eq!(app.tracker.get_status("f1").unwrap().current_state, FileState::Archived);
}

#[tokio::test]
async fn test_unknown_status_value() {
    let app = test_app();
    app.tracker.register("f1").unwrap();

    let (status, _) = send(
        &app.router,
        json_request(
            Method::PUT,
            "/api/v1/file-status",
            json!({"file_id": "f1", "status": "deleted"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_csv_upload() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        multipart_request(
            "/api/v1/csv",
            &[
                ("kind", None, "dimension"),
                ("name", None, "district"),
                ("file", Some("text/csv"), DISTRICTS),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid_record_count"], 2);
    assert_eq!(body["invalid_record_count"], 0);
    assert_eq!(app.sink.records()[1], json!({"name": "belur", "district_id": "SH124"}));
}

#[tokio::test]
async fn test_csv_short_row_is_an_invalid_record() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        multipart_request(
            "/api/v1/csv",
            &[
                ("kind", None, "dimension"),
                ("name", None, "district"),
                ("file", Some("text/csv"), "name,district_id\njhaha,SH123\nbelur\nsonbarsa,SH125\n"),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid_record_count"], 2);
    assert_eq!(body["invalid_record_count"], 1);
    assert_eq!(app.sink.records().len(), 2);
}

#[tokio::test]
async fn test_csv_wrong_content_type() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        multipart_request(
            "/api/v1/csv",
            &[
                ("kind", None, "dimension"),
                ("name", None, "district"),
                ("file", Some("application/json"), DISTRICTS),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"message": "File must be uploaded as text/csv"}));
    assert!(app.sink.batches().is_empty());
}

#[tokio::test]
async fn test_csv_missing_fields() {
    let app = test_app();

    let (status, body) = send(
        &app.router,
        multipart_request("/api/v1/csv", &[("kind", None, "dimension")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"message": "CSV file is missing"}));

    let (status, body) = send(
        &app.router,
        multipart_request(
            "/api/v1/csv",
            &[("kind", None, "metric"), ("file", Some("text/csv"), DISTRICTS)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"message": "Unknown record kind: metric"}));
}

#[tokio::test]
async fn test_tracked_uploads_reach_archive_readiness() {
    let (router, tracker) = test_app_with(
        Arc::new(MemoryRecordSink::new()),
        ingest_config(&[RecordKind::Dimension, RecordKind::Event]),
    );

    send(
        &router,
        multipart_request(
            "/api/v1/csv",
            &[
                ("kind", None, "dimension"),
                ("name", None, "district"),
                ("file_id", None, "upload-7"),
                ("file", Some("text/csv"), DISTRICTS),
            ],
        ),
    )
    .await;

    let (_, body) = send(&router, get_request("/api/v1/file-status?file_id=upload-7")).await;
    assert_eq!(body["response"]["current_state"], "processing");
    assert_eq!(body["response"]["per_kind_counts"]["dimension"]["valid"], 2);

    send(
        &router,
        multipart_request(
            "/api/v1/csv",
            &[
                ("kind", None, "event"),
                ("name", None, "student_attendance"),
                ("file_id", None, "upload-7"),
                ("file", Some("text/csv"), "school_id,grade,count\n6677,1,10\n"),
            ],
        ),
    )
    .await;

    let record = tracker.get_status("upload-7").unwrap();
    assert_eq!(record.current_state, FileState::Validated);
    assert!(record.ready_to_archive);
}

#[tokio::test]
async fn test_tracked_upload_with_errors_fails_file() {
    let app = test_app();

    let (status, _) = send(
        &app.router,
        multipart_request(
            "/api/v1/csv",
            &[
                ("kind", None, "dimension"),
                ("name", None, "district"),
                ("file_id", None, "upload-8"),
                ("file", Some("text/csv"), "name,district_id\njhaha,\n"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.tracker.get_status("upload-8").unwrap().current_state, FileState::Failed);

    let (status, _) = send(
        &app.router,
        multipart_request(
            "/api/v1/csv",
            &[
                ("kind", None, "dimension"),
                ("name", None, "district"),
                ("file_id", None, "upload-8"),
                ("file", Some("text/csv"), DISTRICTS),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
