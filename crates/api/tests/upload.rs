//! Integration tests for result uploads.

mod common;

use axum::http::StatusCode;
use common::{body_json, post_multipart, Part, PNG_BYTES};

#[tokio::test]
async fn upload_stores_images_by_channel_and_ordinal() {
    let t = common::build_test_app().await;

    let response = post_multipart(
        &t.app,
        "/api/upload?channel=chan-42&job_id=J-1",
        &[
            Part { name: "worker_id", file_name: None, data: b"worker_3" },
            Part { name: "images", file_name: Some("cfa_00001_.png"), data: PNG_BYTES },
            Part { name: "images", file_name: Some("cfa_00002_.png"), data: PNG_BYTES },
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Images uploaded");
    assert_eq!(json["files"], serde_json::json!(["cfa_00001_.png", "cfa_00002_.png"]));

    assert_eq!(std::fs::read(t.upload_dir.join("chan-42_0.png")).unwrap(), PNG_BYTES);
    assert!(t.upload_dir.join("chan-42_1.png").exists());

    let logged = cfa_db::repositories::UploadRepo::list_for_channel(&t.pool, "chan-42")
        .await
        .unwrap();
    assert_eq!(logged.len(), 2);
    assert_eq!(logged[0].worker_id.as_deref(), Some("worker_3"));
    assert_eq!(logged[0].job_id.as_deref(), Some("J-1"));
}

#[tokio::test]
async fn upload_without_channel_still_stores() {
    let t = common::build_test_app().await;

    let response = post_multipart(
        &t.app,
        "/api/upload",
        &[Part { name: "images", file_name: Some("out.png"), data: PNG_BYTES }],
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(t.upload_dir.join("unknown_0.png").exists());
}

#[tokio::test]
async fn upload_without_images_field_is_400() {
    let t = common::build_test_app().await;

    let response = post_multipart(
        &t.app,
        "/api/upload?channel=c",
        &[Part { name: "other", file_name: Some("x.png"), data: PNG_BYTES }],
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No 'images' field in request");
}

#[tokio::test]
async fn non_png_upload_is_rejected_before_writing() {
    let t = common::build_test_app().await;

    let response = post_multipart(
        &t.app,
        "/api/upload?channel=c",
        &[
            Part { name: "images", file_name: Some("ok.png"), data: PNG_BYTES },
            Part { name: "images", file_name: Some("notes.txt"), data: b"hello" },
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!t.upload_dir.join("c_0.png").exists());
}

#[tokio::test]
async fn unnamed_parts_do_not_consume_an_ordinal() {
    let t = common::build_test_app().await;

    let response = post_multipart(
        &t.app,
        "/api/upload?channel=c",
        &[
            Part { name: "images", file_name: Some(""), data: b"" },
            Part { name: "images", file_name: Some("real.png"), data: PNG_BYTES },
        ],
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["files"], serde_json::json!(["real.png"]));
    assert!(t.upload_dir.join("c_0.png").exists());
    assert!(!t.upload_dir.join("c_1.png").exists());
}
