mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tower::ServiceExt;

use comfyui_prompt_relay::api::{router, AppState};

use common::*;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, headers, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_as(uri: &str, user: &str, pass: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass))))
        .body(Body::empty())
        .unwrap()
}

struct Harness {
    app: Router,
    upstream: FakeUpstream,
    dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    let upstream = spawn_upstream(None).await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("out")).unwrap();
    write_template(dir.path(), "smoke_test.json", &template());
    let conf = config(&upstream.url(), dir.path(), &dir.path().join("out"));
    let app = router(Arc::new(AppState::from_config(&conf)));
    Harness { app, upstream, dir }
}

#[tokio::test]
async fn root_banner() {
    let h = harness().await;
    let (status, _, body) = send(&h.app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ComfyUI Prompt Relay");
}

#[tokio::test]
async fn generate_prompt_from_form() {
    let h = harness().await;
    let request = Request::builder()
        .method("POST")
        .uri("/generate_prompt")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("subject=cat&pose=sitting&setting=garden&other=sunset"))
        .unwrap();

    let (status, body) = send_json(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prompt"], COMPLETION);
    assert_eq!(h.upstream.chats().len(), 1);
}

#[tokio::test]
async fn generate_prompt_names_missing_field() {
    let h = harness().await;
    let request = Request::builder()
        .method("POST")
        .uri("/generate_prompt")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("subject=cat&pose=sitting&setting=garden"))
        .unwrap();

    let (status, body) = send_json(&h.app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_FIELD");
    assert!(body["error"].as_str().unwrap().contains("other"));
    assert!(h.upstream.chats().is_empty());
}

#[tokio::test]
async fn generate_image_queues_and_shows_in_history() {
    let h = harness().await;
    let (status, body) = send_json(
        &h.app,
        post_json(
            "/generate_image",
            json!({"prompt": "cat, garden", "realism_lora": 0.8, "detail_lora": 0.6, "workflow_type": "smoke", "seed": 42, "executions": 2}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let job_id = body["job_id"].as_str().unwrap().to_string();
    assert_eq!(body["executions"], 2);
    assert_eq!(body["workflow_seed"], 42);
    assert_eq!(body["receipt"]["submissions"].as_array().unwrap().len(), 2);
    assert_eq!(h.upstream.prompts().len(), 2);
    assert!(h.dir.path().join("smoke_updated.json").exists());

    let (status, history) = send_json(&h.app, get("/history")).await;
    assert_eq!(status, StatusCode::OK);
    let records = history["history"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["batch_id"], job_id.as_str());
    assert_eq!(records[0]["workflow_type"], "smoke");
    assert_eq!(records[0]["executions"], 2);
}

#[tokio::test]
async fn generate_runs_the_whole_pipeline() {
    let h = harness().await;
    let (status, body) = send_json(
        &h.app,
        post_json(
            "/generate",
            json!({
                "subject": "cat", "pose": "sitting", "setting": "garden", "other": "sunset",
                "realism_lora": 0.8, "detail_lora": 0.6, "workflow_type": "smoke", "seed": "42"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prompt"], COMPLETION);
    let prompts = h.upstream.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0]["client_id"].as_str().unwrap().ends_with("_1"));
    assert_eq!(prompts[0]["prompt"]["6"]["inputs"]["text"], COMPLETION);
}

#[tokio::test]
async fn missing_template_node_is_reported_by_title() {
    let h = harness().await;
    let mut broken = template();
    broken.as_object_mut().unwrap().remove("10");
    write_template(h.dir.path(), "final_image.json", &broken);

    let (status, body) = send_json(
        &h.app,
        post_json(
            "/generate_image",
            json!({"prompt": "x", "realism_lora": 0.8, "detail_lora": 0.6, "workflow_type": "final"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "WORKFLOW_ERROR");
    assert!(body["error"].as_str().unwrap().contains("Realism_LORA"));
    assert!(h.upstream.prompts().is_empty());
}

#[tokio::test]
async fn invalid_workflow_type_is_a_bad_request() {
    let h = harness().await;
    let (status, body) = send_json(
        &h.app,
        post_json(
            "/generate_image",
            json!({"prompt": "x", "realism_lora": 0.8, "detail_lora": 0.6, "workflow_type": "draft"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_FIELD");
}

#[tokio::test]
async fn queue_status_is_proxied() {
    let h = harness().await;
    let (status, body) = send_json(&h.app, get("/queue_status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queue_pending"][0][1], "pid-0");
}

#[tokio::test]
async fn queue_status_upstream_down_is_bad_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let conf = config(&dead_url(), dir.path(), dir.path());
    let app = router(Arc::new(AppState::from_config(&conf)));

    let (status, body) = send_json(&app, get("/queue_status")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn gallery_requires_basic_auth() {
    let h = harness().await;
    let (status, headers, _) = send(&h.app, get("/gallery")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(headers.get(header::WWW_AUTHENTICATE).is_some());

    let (status, _, _) = send(&h.app, get_as("/gallery", "admin", "wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn gallery_lists_and_serves_images() {
    let h = harness().await;
    let out = h.dir.path().join("out");
    std::fs::write(out.join("batch_00001_.png"), b"\x89PNG").unwrap();
    std::fs::write(out.join("notes.txt"), b"skip").unwrap();

    let (status, body) = send_json(&h.app, get_as("/gallery", "admin", "hunter2")).await;
    assert_eq!(status, StatusCode::OK);
    let images = body["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["name"], "batch_00001_.png");

    let (status, headers, bytes) = send(&h.app, get_as("/gallery/batch_00001_.png", "admin", "hunter2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(bytes, b"\x89PNG");

    let (status, _, _) = send(&h.app, get_as("/gallery/missing.png", "admin", "hunter2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
