//! Axum request handlers for the HTTP API.
use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Form, Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::api::auth::require_basic;
use crate::api::gallery;
use crate::api::routes::AppState;
use crate::error::{AppError, AppResult};
use crate::pipeline::{ImageOptions, ImageResult};
use crate::prompt::PromptParts;
use crate::workflow::WorkflowType;

pub const MAX_EXECUTIONS: u32 = 100;

pub async fn root() -> &'static str {
    "ComfyUI Prompt Relay"
}

/// Form fields `subject`, `pose`, `setting`, `other` → `{"prompt": ...}`.
pub async fn generate_prompt(
    State(state): State<Arc<AppState>>,
    Form(form): Form<HashMap<String, String>>,
) -> AppResult<Json<Value>> {
    let field = |name: &str| form.get(name).cloned().ok_or_else(|| AppError::MissingField(name.to_string()));
    let parts = PromptParts {
        subject: field("subject")?,
        pose: field("pose")?,
        setting: field("setting")?,
        other: field("other")?,
    };
    let prompt = state.pipeline.generate_prompt(&parts).await?;
    Ok(Json(json!({ "prompt": prompt })))
}

/// Patch and queue an already-written prompt.
pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> AppResult<Json<ImageResult>> {
    let prompt = required_str(&payload, "prompt")?;
    let options = image_options(&payload)?;
    state.pipeline.generate_image(prompt, &options).await.map(Json)
}

/// Fragments in, queued jobs out.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> AppResult<Json<ImageResult>> {
    let parts = PromptParts {
        subject: required_str(&payload, "subject")?,
        pose: required_str(&payload, "pose")?,
        setting: required_str(&payload, "setting")?,
        other: required_str(&payload, "other")?,
    };
    let options = image_options(&payload)?;
    state.pipeline.generate(&parts, &options).await.map(Json)
}

pub async fn queue_status(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    state.pipeline.comfyui().get_queue().await.map(Json)
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Value>> {
    let limit = match params.get("limit") {
        Some(raw) => Some(raw.parse::<usize>().map_err(|_| AppError::invalid("limit", "expected a non-negative integer"))?),
        None => None,
    };
    let records = state.pipeline.history(limit).await;
    Ok(Json(json!({ "history": records })))
}

pub async fn gallery_list(State(state): State<Arc<AppState>>, headers: HeaderMap) -> AppResult<Json<Value>> {
    require_basic(&headers, state.gallery_credentials.as_ref())?;
    let images = gallery::list_images(&state.output_dir).await?;
    Ok(Json(json!({ "images": images })))
}

pub async fn gallery_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    require_basic(&headers, state.gallery_credentials.as_ref())?;
    let (content_type, bytes) = gallery::read_image(&state.output_dir, &filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

// Payload helpers. Fields arrive from HTML forms as often as from scripts, so
// numbers are also accepted as numeric strings.

fn image_options(payload: &Value) -> AppResult<ImageOptions> {
    let workflow_type = required_str(payload, "workflow_type")?
        .parse::<WorkflowType>()
        .map_err(|reason| AppError::invalid("workflow_type", reason))?;
    let executions = match optional_u64(payload, "executions")? {
        None => 1,
        Some(n) if n >= 1 && n <= MAX_EXECUTIONS as u64 => n as u32,
        Some(_) => {
            return Err(AppError::invalid("executions", format!("must be between 1 and {}", MAX_EXECUTIONS)));
        }
    };
    Ok(ImageOptions {
        realism_lora: required_f64(payload, "realism_lora")?,
        detail_lora: required_f64(payload, "detail_lora")?,
        workflow_type,
        seed: optional_u64(payload, "seed")?,
        filename_prefix: optional_str(payload, "filename_prefix")?,
        executions,
    })
}

fn present<'a>(payload: &'a Value, field: &str) -> Option<&'a Value> {
    payload.get(field).filter(|v| !v.is_null())
}

fn required_str(payload: &Value, field: &str) -> AppResult<String> {
    match present(payload, field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(AppError::invalid(field, "expected a string")),
        None => Err(AppError::MissingField(field.to_string())),
    }
}

fn optional_str(payload: &Value, field: &str) -> AppResult<Option<String>> {
    match present(payload, field) {
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(AppError::invalid(field, "expected a string")),
        None => Ok(None),
    }
}

fn required_f64(payload: &Value, field: &str) -> AppResult<f64> {
    let value = match present(payload, field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
        None => return Err(AppError::MissingField(field.to_string())),
    };
    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::invalid(field, "expected a number"))
}

fn optional_u64(payload: &Value, field: &str) -> AppResult<Option<u64>> {
    match present(payload, field) {
        None => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| AppError::invalid(field, "expected a non-negative integer")),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| AppError::invalid(field, "expected a non-negative integer")),
        Some(_) => Err(AppError::invalid(field, "expected a non-negative integer")),
    }
}
