//! Injects prompt text, LoRA strengths, seed and filename prefix into a workflow.
use std::path::{Path, PathBuf};

use rand::Rng;
use serde_json::Value;

use super::{
    WorkflowDocument, WorkflowError, DETAIL_LORA_TITLE, POS_TITLE, REALISM_LORA_TITLE, SAVE_CLASS, SAVE_TITLE,
    SEED_LIMIT,
};

/// Everything that changes between two runs of the same template.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchRequest {
    pub prompt: String,
    pub realism_lora: f64,
    pub detail_lora: f64,
    pub seed: Option<u64>,
    pub filename_prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub document: WorkflowDocument,
    /// Seed written to every sampler, drawn once when none was requested.
    pub seed: u64,
    pub samplers: usize,
    pub save_node: Option<String>,
    pub output_path: PathBuf,
}

/// Uniform draw in `[0, 2^53)`.
pub fn random_seed() -> u64 {
    rand::rng().random_range(0..SEED_LIMIT)
}

/// Apply `request` to `doc` in memory.
///
/// Required titles are resolved before anything is touched, so a missing
/// `POS`/LoRA node leaves the document unchanged. Returns the seed used, the
/// number of samplers updated and the SAVE node id when a prefix was applied.
pub fn apply_patch(
    doc: &mut WorkflowDocument,
    request: &PatchRequest,
) -> Result<(u64, usize, Option<String>), WorkflowError> {
    let index = doc.label_index();
    let [pos_id, realism_id, detail_id] = index.require_all([POS_TITLE, REALISM_LORA_TITLE, DETAIL_LORA_TITLE])?;

    doc.set_input(&pos_id, "text", Value::String(request.prompt.clone()))?;
    set_lora_strength(doc, &realism_id, request.realism_lora)?;
    set_lora_strength(doc, &detail_id, request.detail_lora)?;

    let seed = request.seed.unwrap_or_else(random_seed);
    let samplers = doc.set_sampler_seed(seed);
    if samplers == 0 {
        tracing::warn!("Workflow has no KSampler node; seed {} not applied", seed);
    }

    let mut save_node = None;
    if let Some(prefix) = request.filename_prefix.as_deref() {
        let target = index
            .lookup(SAVE_TITLE)
            .iter()
            .find(|id| doc.class_of(id) == Some(SAVE_CLASS))
            .cloned();
        match target {
            Some(id) => {
                doc.set_input(&id, "filename_prefix", Value::String(prefix.to_string()))?;
                save_node = Some(id);
            }
            None => tracing::warn!(
                "No {} node titled '{}' found; filename prefix '{}' not applied",
                SAVE_CLASS,
                SAVE_TITLE,
                prefix
            ),
        }
    }

    Ok((seed, samplers, save_node))
}

/// LoRA loaders expose `strength_model`/`strength_clip`; simpler loaders take
/// a single `strength`.
fn set_lora_strength(doc: &mut WorkflowDocument, node_id: &str, strength: f64) -> Result<(), WorkflowError> {
    let value = Value::from(strength);
    if doc.has_input(node_id, "strength_model") {
        doc.set_input(node_id, "strength_model", value.clone())?;
        if doc.has_input(node_id, "strength_clip") {
            doc.set_input(node_id, "strength_clip", value)?;
        }
        Ok(())
    } else {
        doc.set_input(node_id, "strength", value)
    }
}

/// Load `template`, patch it, write the result to `output` and return it.
///
/// The output file is only written once every patch step has succeeded.
pub async fn patch_workflow(template: &Path, output: &Path, request: &PatchRequest) -> Result<PatchOutcome, WorkflowError> {
    let mut document = WorkflowDocument::load(template).await?;
    let (seed, samplers, save_node) = apply_patch(&mut document, request)?;
    document.save(output).await?;
    tracing::info!(
        template = %template.display(),
        output = %output.display(),
        seed,
        samplers,
        "Workflow patched"
    );
    Ok(PatchOutcome { document, seed, samplers, save_node, output_path: output.to_path_buf() })
}
