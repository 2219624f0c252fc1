//! API integration tests through the in-process router.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use common::{fixtures, TestConfig, TestFixture};

// ============================================================================
// Health & config
// ============================================================================

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "status", json!("ok"));
}

#[tokio::test]
async fn test_config_endpoint() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["server"]["max_upload_mb"], 64);
    assert_eq!(response.body["pipeline"]["format"], "webp");
    assert_eq!(response.body["processor"]["cleanup_on_shutdown"], true);
}

// ============================================================================
// Items
// ============================================================================

#[tokio::test]
async fn test_upload_and_list_items() {
    let fixture = TestFixture::new();
    let ids = fixture.upload_images(3).await;
    assert_eq!(ids.len(), 3);

    let response = fixture.get("/api/v1/items").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["total"], 3);

    let items = response.body["items"].as_array().unwrap();
    assert_eq!(items[0]["id"], ids[0].as_str());
    assert_eq!(items[0]["file_name"], "image-0.png");
    assert_eq!(items[0]["status"], "idle");
    assert_eq!(items[0]["selected"], false);
    assert!(items[0]["processed"].is_null());
}

#[tokio::test]
async fn test_upload_without_files_is_rejected() {
    let fixture = TestFixture::new();
    let response = fixture.upload(&[]).await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(fixture.store.is_empty());
}

#[tokio::test]
async fn test_remove_and_clear_items() {
    let fixture = TestFixture::new();
    let ids = fixture.upload_images(3).await;

    let response = fixture.delete(&format!("/api/v1/items/{}", ids[0])).await;
    assert_status!(response, StatusCode::OK);

    let response = fixture.delete(&format!("/api/v1/items/{}", ids[0])).await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture.delete("/api/v1/items").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "removed", json!(2));
    assert!(fixture.store.is_empty());
}

#[tokio::test]
async fn test_artifact_of_unprocessed_item_is_not_found() {
    let fixture = TestFixture::new();
    let ids = fixture.upload_images(1).await;

    let response = fixture
        .get(&format!("/api/v1/items/{}/artifact", ids[0]))
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);

    let response = fixture.get("/api/v1/items/unknown/artifact").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_item_metadata() {
    let fixture = TestFixture::new();
    let response = fixture
        .upload(&[
            ("camera.jpg", fixtures::jpeg_with_exif("Canon").unwrap()),
            ("plain.jpg", fixtures::jpeg_bytes(16, 16).unwrap()),
        ])
        .await;
    assert_status!(response, StatusCode::CREATED);
    let ids: Vec<String> = response.body["ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|id| id.as_str().unwrap().to_string())
        .collect();

    let response = fixture
        .get(&format!("/api/v1/items/{}/metadata", ids[0]))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "has_metadata", json!(true));
    assert_eq!(response.body["fields"][0]["tag"], "Make");
    assert!(response.body["fields"][0]["value"]
        .as_str()
        .unwrap()
        .contains("Canon"));

    let response = fixture
        .get(&format!("/api/v1/items/{}/metadata", ids[1]))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "has_metadata", json!(false));
    assert_json_path!(response.body, "fields", json!([]));

    let response = fixture.get("/api/v1/items/unknown/metadata").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

// ============================================================================
// Selection
// ============================================================================

#[tokio::test]
async fn test_selection_lifecycle() {
    let fixture = TestFixture::new();
    let ids = fixture.upload_images(3).await;

    let response = fixture
        .post_empty(&format!("/api/v1/items/{}/select", ids[1]))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "selected", json!(true));

    let response = fixture.get("/api/v1/selection").await;
    assert_json_path!(response.body, "selected", json!([ids[1]]));

    let response = fixture.post_empty("/api/v1/selection/all").await;
    assert_eq!(response.body["selected"].as_array().unwrap().len(), 3);

    let response = fixture.delete("/api/v1/selection").await;
    assert_json_path!(response.body, "selected", json!([]));

    let response = fixture.post_empty("/api/v1/items/unknown/select").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

// ============================================================================
// Pipeline configuration
// ============================================================================

#[tokio::test]
async fn test_pipeline_patch() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/pipeline").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "quality", json!(80));

    let response = fixture
        .patch(
            "/api/v1/pipeline",
            json!({
                "format": "jpeg",
                "quality": 65,
                "resize_enabled": true,
                "resize": { "mode": "explicit", "width": 800, "height": 600 }
            }),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "format", json!("jpeg"));
    assert_json_path!(response.body, "quality", json!(65));
    assert_eq!(response.body["resize"]["width"], 800);

    // Unpatched fields keep their values
    let response = fixture
        .patch("/api/v1/pipeline", json!({ "remove_background": true }))
        .await;
    assert_json_path!(response.body, "format", json!("jpeg"));
    assert_json_path!(response.body, "remove_background", json!(true));
}

#[tokio::test]
async fn test_pipeline_patch_rejects_invalid_values() {
    let fixture = TestFixture::new();

    let response = fixture
        .patch("/api/v1/pipeline", json!({ "quality": 0 }))
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    let response = fixture
        .patch("/api/v1/pipeline", json!({ "format": "gif" }))
        .await;
    assert_status!(response, StatusCode::UNPROCESSABLE_ENTITY);

    let response = fixture.get("/api/v1/pipeline").await;
    assert_json_path!(response.body, "quality", json!(80));
}

// ============================================================================
// Runs
// ============================================================================

#[tokio::test]
async fn test_start_run_without_items_is_rejected() {
    let fixture = TestFixture::new();
    let response = fixture.post_empty("/api/v1/runs").await;
    assert_status!(response, StatusCode::BAD_REQUEST);

    let response = fixture
        .post("/api/v1/runs", json!({ "item_ids": [] }))
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_processes_every_item() {
    let fixture = TestFixture::new();
    fixture.upload_images(4).await;

    let response = fixture.post_empty("/api/v1/runs").await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_json_path!(response.body, "generation", json!(1));

    fixture.wait_until_idle().await;

    let response = fixture.get("/api/v1/items").await;
    for item in response.body["items"].as_array().unwrap() {
        assert_eq!(item["status"], "done");
        assert_eq!(item["processed"]["format"], "webp");
    }

    let response = fixture.get("/api/v1/export").await;
    assert_status!(response, StatusCode::OK);
    let entries = response.body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0]["file_name"], "image-0.webp");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_explicit_item_ids() {
    let fixture = TestFixture::new();
    let ids = fixture.upload_images(3).await;

    let response = fixture
        .post("/api/v1/runs", json!({ "item_ids": [ids[2]] }))
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    fixture.wait_until_idle().await;

    assert_eq!(fixture.store.get(&ids[2]).unwrap().status.as_str(), "done");
    assert_eq!(fixture.store.get(&ids[0]).unwrap().status.as_str(), "idle");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_busy_and_cancel() {
    let fixture = TestFixture::new();
    fixture.mock().close_gate();
    fixture.upload_images(2).await;

    let response = fixture.post_empty("/api/v1/runs").await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert!(fixture.mock().wait_for_calls(2, Duration::from_secs(2)).await);

    let response = fixture.post_empty("/api/v1/runs").await;
    assert_status!(response, StatusCode::CONFLICT);

    let response = fixture.get("/api/v1/runs/status").await;
    assert_json_path!(response.body, "busy", json!(true));
    assert_eq!(response.body["counts"]["processing"], 2);

    let response = fixture.delete("/api/v1/runs/current").await;
    assert_json_path!(response.body, "cancelled", json!(true));

    let response = fixture.get("/api/v1/runs/status").await;
    assert_json_path!(response.body, "busy", json!(false));
    assert_json_path!(response.body, "cancelled", json!(true));
    assert_eq!(response.body["counts"]["idle"], 2);

    let response = fixture.delete("/api/v1/runs/current").await;
    assert_json_path!(response.body, "cancelled", json!(false));

    fixture.mock().open_gate();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let response = fixture.get("/api/v1/items").await;
    for item in response.body["items"].as_array().unwrap() {
        assert_eq!(item["status"], "idle");
        assert!(item["processed"].is_null());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_item_reports_error() {
    let fixture = TestFixture::new();
    fixture
        .mock()
        .fail_on(fixtures::image_bytes(0), "error: unsupported color type");
    let ids = fixture.upload_images(1).await;

    fixture.post_empty("/api/v1/runs").await;
    fixture.wait_until_idle().await;

    let item = fixture.store.get(&ids[0]).unwrap();
    assert_eq!(item.error.as_deref(), Some("unsupported color type"));

    let response = fixture.get("/api/v1/export").await;
    assert_eq!(response.body["entries"].as_array().unwrap().len(), 0);
}

// ============================================================================
// Real transformer
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_artifact_download_with_real_transformer() {
    let fixture = TestFixture::with_config(TestConfig::with_real_transformer());
    let png = fixtures::png_bytes(64, 48).unwrap();
    let response = fixture.upload(&[("photo.jpeg", png)]).await;
    assert_status!(response, StatusCode::CREATED);
    let id = response.body["ids"][0].as_str().unwrap().to_string();

    fixture
        .patch(
            "/api/v1/pipeline",
            json!({ "format": "png", "resize_enabled": true, "resize": { "mode": "max_edge", "max_px": 32 } }),
        )
        .await;

    let response = fixture.post_empty("/api/v1/runs").await;
    assert_status!(response, StatusCode::ACCEPTED);
    fixture.wait_until_idle().await;

    let item = fixture.store.get(&id).unwrap();
    let processed = item.processed.expect("item processed");
    assert_eq!((processed.width, processed.height), (32, 24));
    assert_eq!(
        processed.preview,
        Some(format!("/api/v1/items/{}/artifact", id))
    );
    assert_eq!(fixture.artifacts.tracked_count(), 1);

    let response = fixture.get(&format!("/api/v1/items/{}/artifact", id)).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some("image/png"));
    assert!(response.raw.starts_with(&[0x89, b'P', b'N', b'G']));

    // Removing the item deletes its artifact from disk
    fixture.delete(&format!("/api/v1/items/{}", id)).await;
    assert_eq!(fixture.artifacts.tracked_count(), 0);
    let path = processed.handle.path().to_path_buf();
    let mut removed = false;
    for _ in 0..100 {
        if !path.exists() {
            removed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(removed, "artifact file still on disk");
}

// ============================================================================
// System & metrics
// ============================================================================

#[tokio::test]
async fn test_system_snapshot() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/system").await;
    assert_status!(response, StatusCode::OK);
    assert_json_path!(response.body, "sampled", json!(false));
    assert_json_path!(response.body, "recommended_concurrency", json!(5));
    assert_eq!(response.body["snapshot"]["core_count"], 8);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture.upload_images(1).await;

    let response = fixture.get("/metrics").await;
    assert_status!(response, StatusCode::OK);
    let text = String::from_utf8(response.raw).unwrap();
    assert!(text.contains("pixbatch_items_by_status"));
    assert!(text.contains("pixbatch_http_requests_total"));
}
