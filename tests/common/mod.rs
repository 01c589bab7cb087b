//! Fake ComfyUI + chat-completion upstream and workflow fixtures.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use comfyui_prompt_relay::Config;

pub const COMPLETION: &str = "cat, sitting, garden, sunset, golden hour";

#[derive(Default)]
pub struct Recorded {
    pub chats: Mutex<Vec<Value>>,
    pub prompts: Mutex<Vec<Value>>,
    pub auth_headers: Mutex<Vec<String>>,
}

struct FakeState {
    recorded: Arc<Recorded>,
    completion: String,
    /// `/prompt` calls with this 0-based index or later answer 500.
    fail_from: Option<usize>,
}

pub struct FakeUpstream {
    pub addr: SocketAddr,
    pub recorded: Arc<Recorded>,
}

impl FakeUpstream {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn prompts(&self) -> Vec<Value> {
        self.recorded.prompts.lock().unwrap().clone()
    }

    pub fn chats(&self) -> Vec<Value> {
        self.recorded.chats.lock().unwrap().clone()
    }
}

async fn chat(State(state): State<Arc<FakeState>>, headers: axum::http::HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        state.recorded.auth_headers.lock().unwrap().push(auth.to_string());
    }
    state.recorded.chats.lock().unwrap().push(body);
    Json(json!({
        "id": "chatcmpl-test",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": format!("  {}\n", state.completion)}}]
    }))
}

async fn prompt(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let index = {
        let mut prompts = state.recorded.prompts.lock().unwrap();
        prompts.push(body);
        prompts.len() - 1
    };
    if state.fail_from.map(|k| index >= k).unwrap_or(false) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "queue exploded"})));
    }
    (StatusCode::OK, Json(json!({"prompt_id": format!("pid-{}", index), "number": index})))
}

async fn queue() -> Json<Value> {
    Json(json!({"queue_running": [], "queue_pending": [[0, "pid-0", {}]]}))
}

pub async fn spawn_upstream(fail_from: Option<usize>) -> FakeUpstream {
    let recorded = Arc::new(Recorded::default());
    let state = Arc::new(FakeState { recorded: recorded.clone(), completion: COMPLETION.to_string(), fail_from });
    let app = Router::new()
        .route("/v1/chat/completions", post(chat))
        .route("/prompt", post(prompt))
        .route("/queue", get(queue))
        .with_state(state);

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener).unwrap().serve(app.into_make_service());
    tokio::spawn(async move {
        server.await.unwrap();
    });
    FakeUpstream { addr, recorded }
}

/// An address nothing listens on.
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn config(upstream_url: &str, workflows_dir: &Path, output_dir: &Path) -> Config {
    Config {
        comfyui_url: upstream_url.to_string(),
        openai_api_key: Some("sk-test".to_string()),
        openai_base_url: format!("{}/v1", upstream_url),
        openai_model: "gpt-4o-mini".to_string(),
        openai_max_tokens: 300,
        prompt_prefix: String::new(),
        prompt_suffix: String::new(),
        workflows_dir: workflows_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        admin_user: Some("admin".to_string()),
        admin_pass: Some("hunter2".to_string()),
        history_capacity: 50,
        queue_timeout: Duration::from_secs(5),
        api_host: "127.0.0.1".to_string(),
        api_port: "0".to_string(),
    }
}

pub fn template() -> Value {
    json!({
        "3": {"class_type": "KSampler", "inputs": {"seed": 0, "steps": 8, "positive": ["6", 0], "negative": ["7", 0]}, "_meta": {"title": "KSampler"}},
        "4": {"class_type": "CheckpointLoaderSimple", "inputs": {"ckpt_name": "sdxl.safetensors"}, "_meta": {"title": "Load Checkpoint"}},
        "6": {"class_type": "CLIPTextEncode", "inputs": {"text": "placeholder"}, "_meta": {"title": "POS"}},
        "7": {"class_type": "CLIPTextEncode", "inputs": {"text": "blurry"}, "_meta": {"title": "NEG"}},
        "9": {"class_type": "SaveImage", "inputs": {"filename_prefix": "ComfyUI"}, "_meta": {"title": "SAVE"}},
        "10": {"class_type": "LoraLoader", "inputs": {"strength_model": 1.0, "strength_clip": 1.0}, "_meta": {"title": "Realism_LORA"}},
        "11": {"class_type": "LoraLoaderModelOnly", "inputs": {"strength": 1.0}, "_meta": {"title": "Detail_LORA"}},
        "15": {"class_type": "KSampler", "inputs": {"seed": 0, "steps": 20}, "_meta": {"title": "Refiner"}}
    })
}

pub fn write_template(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

pub fn sampler_seeds(graph: &Value) -> Vec<Value> {
    graph
        .as_object()
        .unwrap()
        .values()
        .filter(|n| n["class_type"] == "KSampler")
        .map(|n| n["inputs"]["seed"].clone())
        .collect()
}
