//! Thin HTTP client for the ComfyUI endpoints the relay uses.
//!
//! - `queue_prompt` posts a submission envelope to `/prompt`.
//! - `get_queue` fetches `/queue` as JSON for the status proxy.
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::config::DEFAULT_QUEUE_TIMEOUT_SECS;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct ComfyUIClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ComfyUIClient {
    pub fn new(base_url: String) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        ComfyUIClient {
            client: Client::new(),
            base_url: base,
            timeout: Duration::from_secs(DEFAULT_QUEUE_TIMEOUT_SECS),
        }
    }

    /// Bound every request to ComfyUI by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Queue a prompt with ComfyUI.
    ///
    /// `envelope` is the `/prompt` body: `{"prompt": <graph>, "client_id", ...}`.
    /// Returns ComfyUI's JSON response (it carries the assigned `prompt_id`).
    pub async fn queue_prompt(&self, envelope: &Value) -> AppResult<Value> {
        let url = format!("{}/prompt", self.base_url);
        tracing::info!("Sending prompt to ComfyUI at URL: {}", url);
        tracing::debug!("Prompt payload: {:?}", envelope);

        let response = self.client.post(&url)
            .timeout(self.timeout)
            .json(envelope)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        if response.status().is_success() {
            let json = response.json().await.map_err(AppError::HttpClient)?;
            tracing::info!("Successfully queued prompt. Response: {:?}", json);
            Ok(json)
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_else(|_| "Unable to read error body".to_string());
            let error_message = format!("Failed to queue prompt. Status: {}, Body: {}", status, error_body);
            tracing::error!("{}", error_message);
            Err(AppError::ComfyUI(error_message))
        }
    }

    /// Current running/pending queue from `/queue`.
    pub async fn get_queue(&self) -> AppResult<Value> {
        let url = format!("{}/queue", self.base_url);
        let response = self.client.get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        if response.status().is_success() {
            response.json().await.map_err(AppError::HttpClient)
        } else {
            Err(AppError::ComfyUI(format!("Failed to get queue: {:?}", response.status())))
        }
    }
}
