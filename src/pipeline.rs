//! The relay pipeline: assemble, rewrite, patch, submit, record.
//!
//! Each step runs once per call, in order, with no retry. Handlers and the CLI
//! both drive this type so they share one behavior.
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::comfyui::{BatchReceipt, ComfyUIClient, JobSubmitter, SubmitRequest};
use crate::config::Config;
use crate::error::AppResult;
use crate::history::{HistoryLedger, HistoryRecord};
use crate::prompt::{PromptParts, PromptTransformer};
use crate::workflow::{patch_workflow, PatchRequest, WorkflowType};

/// Everything needed to render an image besides the prompt text.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    pub realism_lora: f64,
    pub detail_lora: f64,
    pub workflow_type: WorkflowType,
    pub seed: Option<u64>,
    pub filename_prefix: Option<String>,
    pub executions: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageResult {
    pub job_id: String,
    pub prompt: String,
    pub workflow_type: WorkflowType,
    pub output_path: PathBuf,
    /// Seed written into the saved workflow file.
    pub workflow_seed: u64,
    pub executions: u32,
    pub receipt: BatchReceipt,
}

#[derive(Clone)]
pub struct Pipeline {
    transformer: PromptTransformer,
    submitter: JobSubmitter,
    workflows_dir: PathBuf,
    ledger: Arc<RwLock<HistoryLedger>>,
}

impl Pipeline {
    pub fn new(transformer: PromptTransformer, submitter: JobSubmitter, workflows_dir: PathBuf, history_capacity: usize) -> Self {
        Pipeline {
            transformer,
            submitter,
            workflows_dir,
            ledger: Arc::new(RwLock::new(HistoryLedger::new(history_capacity))),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let client = ComfyUIClient::new(config.comfyui_url.clone()).with_timeout(config.queue_timeout);
        Self::new(
            PromptTransformer::from_config(config),
            JobSubmitter::new(client),
            config.workflows_dir.clone(),
            config.history_capacity,
        )
    }

    pub fn comfyui(&self) -> &ComfyUIClient {
        self.submitter.client()
    }

    pub async fn generate_prompt(&self, parts: &PromptParts) -> AppResult<String> {
        let raw = parts.assemble();
        self.transformer.transform(&raw).await
    }

    /// Patch the template for `options.workflow_type`, queue it
    /// `options.executions` times and record the batch.
    pub async fn generate_image(&self, prompt: String, options: &ImageOptions) -> AppResult<ImageResult> {
        let template = options.workflow_type.template_path(&self.workflows_dir);
        let output = options.workflow_type.output_path(&self.workflows_dir);
        let patch = PatchRequest {
            prompt: prompt.clone(),
            realism_lora: options.realism_lora,
            detail_lora: options.detail_lora,
            seed: options.seed,
            filename_prefix: options.filename_prefix.clone(),
        };
        let outcome = patch_workflow(&template, &output, &patch).await?;

        let executions = options.executions.max(1);
        let receipt = self
            .submitter
            .submit_batch(&SubmitRequest {
                graph: outcome.document,
                executions,
                seed: options.seed,
                filename_prefix: options.filename_prefix.clone(),
            })
            .await?;

        self.ledger.write().await.append(HistoryRecord {
            timestamp: Utc::now(),
            prompt: prompt.clone(),
            realism_lora: options.realism_lora,
            detail_lora: options.detail_lora,
            workflow_type: options.workflow_type,
            seed: options.seed,
            executions,
            filename_prefix: receipt.filename_prefix.clone(),
            batch_id: receipt.batch_id.clone(),
        });
        tracing::info!(batch_id = %receipt.batch_id, executions, workflow = %options.workflow_type, "Batch submitted");

        Ok(ImageResult {
            job_id: receipt.batch_id.clone(),
            prompt,
            workflow_type: options.workflow_type,
            output_path: outcome.output_path,
            workflow_seed: outcome.seed,
            executions,
            receipt,
        })
    }

    /// Full run from raw fragments to queued jobs.
    pub async fn generate(&self, parts: &PromptParts, options: &ImageOptions) -> AppResult<ImageResult> {
        let prompt = self.generate_prompt(parts).await?;
        self.generate_image(prompt, options).await
    }

    pub async fn history(&self, limit: Option<usize>) -> Vec<HistoryRecord> {
        self.ledger.read().await.list(limit)
    }
}
