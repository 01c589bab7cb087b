//! Repeats one patched workflow onto the ComfyUI queue.
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::client::ComfyUIClient;
use crate::error::AppResult;
use crate::workflow::{random_seed, WorkflowDocument};

#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub graph: WorkflowDocument,
    pub executions: u32,
    /// Reused for every repetition when set; otherwise each one draws its own.
    pub seed: Option<u64>,
    pub filename_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub client_id: String,
    pub seed: u64,
    pub response: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReceipt {
    pub batch_id: String,
    pub filename_prefix: String,
    pub submissions: Vec<Submission>,
}

/// `/prompt` request body.
pub fn build_envelope(graph: Value, client_id: &str, filename_prefix: &str) -> Value {
    json!({
        "prompt": graph,
        "client_id": client_id,
        "filename_prefix": filename_prefix,
    })
}

#[derive(Clone)]
pub struct JobSubmitter {
    client: ComfyUIClient,
}

impl JobSubmitter {
    pub fn new(client: ComfyUIClient) -> Self {
        JobSubmitter { client }
    }

    pub fn client(&self) -> &ComfyUIClient {
        &self.client
    }

    /// Post `request.graph` once per execution, sequentially.
    ///
    /// The first failing post aborts the batch and its error is returned;
    /// repetitions already queued stay queued.
    pub async fn submit_batch(&self, request: &SubmitRequest) -> AppResult<BatchReceipt> {
        let batch_id = Uuid::new_v4().to_string();
        let filename_prefix = request.filename_prefix.clone().unwrap_or_else(|| batch_id.clone());
        let executions = request.executions.max(1);
        let mut submissions = Vec::with_capacity(executions as usize);

        for n in 1..=executions {
            let seed = request.seed.unwrap_or_else(random_seed);
            let mut graph = request.graph.clone();
            graph.set_sampler_seed(seed);

            let client_id = format!("{}_{}", batch_id, n);
            let envelope = build_envelope(graph.into_value(), &client_id, &filename_prefix);
            tracing::info!(%batch_id, repetition = n, of = executions, seed, "Queueing repetition");
            let response = self.client.queue_prompt(&envelope).await.map_err(|e| {
                tracing::error!(%batch_id, repetition = n, "Batch aborted: {}", e);
                e
            })?;
            submissions.push(Submission { client_id, seed, response });
        }

        Ok(BatchReceipt { batch_id, filename_prefix, submissions })
    }
}
