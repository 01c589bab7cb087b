//! ComfyUI workflow documents and the patch applied before each submission.
//!
//! A workflow is the API-format node graph: `{"<id>": {"class_type", "inputs", "_meta": {"title"}}}`.
//! Templates live in the workflows directory and are never modified; patched
//! copies are written next to them as `<type>_updated.json`.
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod document;
pub mod patcher;

pub use document::{LabelIndex, WorkflowDocument};
pub use patcher::{apply_patch, patch_workflow, random_seed, PatchOutcome, PatchRequest};

pub const POS_TITLE: &str = "POS";
pub const REALISM_LORA_TITLE: &str = "Realism_LORA";
pub const DETAIL_LORA_TITLE: &str = "Detail_LORA";
pub const SAVE_TITLE: &str = "SAVE";

pub const SAMPLER_CLASS: &str = "KSampler";
pub const SAVE_CLASS: &str = "SaveImage";

/// Exclusive upper bound for generated seeds (2^53, the largest range a JSON
/// number survives without losing precision in a browser).
pub const SEED_LIMIT: u64 = 1 << 53;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Workflow is missing required node(s) titled: {}", .titles.join(", "))]
    MissingNodes { titles: Vec<String> },

    #[error("Workflow has more than one node titled: {}", .titles.join(", "))]
    AmbiguousNodes { titles: Vec<String> },

    #[error("Node '{node_id}' is malformed: {reason}")]
    MalformedNode { node_id: String, reason: String },

    #[error("Workflow document must be a JSON object of nodes")]
    NotAnObject,

    #[error("Failed to read workflow file {}: {source}", .path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Failed to write workflow file {}: {source}", .path.display())]
    Write { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse workflow JSON {}: {source}", .path.display())]
    Parse { path: PathBuf, source: serde_json::Error },
}

/// Which template a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowType {
    /// Quick low-step preview.
    Smoke,
    Final,
}

impl WorkflowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::Smoke => "smoke",
            WorkflowType::Final => "final",
        }
    }

    pub fn template_file_name(&self) -> &'static str {
        match self {
            WorkflowType::Smoke => "smoke_test.json",
            WorkflowType::Final => "final_image.json",
        }
    }

    pub fn output_file_name(&self) -> String {
        format!("{}_updated.json", self.as_str())
    }

    pub fn template_path(&self, workflows_dir: &Path) -> PathBuf {
        workflows_dir.join(self.template_file_name())
    }

    pub fn output_path(&self, workflows_dir: &Path) -> PathBuf {
        workflows_dir.join(self.output_file_name())
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smoke" => Ok(WorkflowType::Smoke),
            "final" => Ok(WorkflowType::Final),
            other => Err(format!("unknown workflow type '{}', expected 'smoke' or 'final'", other)),
        }
    }
}
