//! In-memory workflow graph with a title index built once per load.
use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value};
use tokio::fs;

use super::{WorkflowError, SAMPLER_CLASS};

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDocument {
    nodes: Map<String, Value>,
}

impl WorkflowDocument {
    /// Accepts either a bare node map or the `{"prompt": {...}}` body shape
    /// that ComfyUI's `/prompt` endpoint takes.
    pub fn from_value(value: Value) -> Result<Self, WorkflowError> {
        let graph = match value {
            Value::Object(mut obj) if is_wrapped(&obj) => obj.remove("prompt").unwrap_or(Value::Null),
            other => other,
        };
        match graph {
            Value::Object(nodes) => Ok(WorkflowDocument { nodes }),
            _ => Err(WorkflowError::NotAnObject),
        }
    }

    pub async fn load(path: &Path) -> Result<Self, WorkflowError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| WorkflowError::Read { path: path.to_path_buf(), source })?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|source| WorkflowError::Parse { path: path.to_path_buf(), source })?;
        let doc = Self::from_value(value)?;
        tracing::debug!(path = %path.display(), nodes = doc.nodes.len(), "Loaded workflow");
        Ok(doc)
    }

    /// Write the graph pretty-printed, creating the parent directory if needed.
    pub async fn save(&self, path: &Path) -> Result<(), WorkflowError> {
        let write_err = |source: std::io::Error| WorkflowError::Write { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let body = serde_json::to_string_pretty(&self.nodes)
            .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        fs::write(path, body).await.map_err(write_err)?;
        tracing::info!(path = %path.display(), "Saved updated workflow");
        Ok(())
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.nodes.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.nodes)
    }

    pub fn class_of(&self, node_id: &str) -> Option<&str> {
        self.nodes.get(node_id)?.get("class_type")?.as_str()
    }

    pub fn input(&self, node_id: &str, key: &str) -> Option<&Value> {
        self.nodes.get(node_id)?.get("inputs")?.get(key)
    }

    pub fn has_input(&self, node_id: &str, key: &str) -> bool {
        self.input(node_id, key).is_some()
    }

    pub fn label_index(&self) -> LabelIndex {
        LabelIndex::build(&self.nodes)
    }

    pub fn ids_by_class(&self, class_type: &str) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.get("class_type").and_then(|ct| ct.as_str()) == Some(class_type))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Overwrite (or insert) one input on a node. The node must exist and its
    /// `inputs` must be an object; a missing `inputs` key is created.
    pub fn set_input(&mut self, node_id: &str, key: &str, value: Value) -> Result<(), WorkflowError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .and_then(|n| n.as_object_mut())
            .ok_or_else(|| WorkflowError::MalformedNode {
                node_id: node_id.to_string(),
                reason: "node is missing or not an object".to_string(),
            })?;
        let inputs = node
            .entry("inputs")
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| WorkflowError::MalformedNode {
                node_id: node_id.to_string(),
                reason: "'inputs' is not an object".to_string(),
            })?;
        inputs.insert(key.to_string(), value);
        Ok(())
    }

    /// Set `inputs.seed` on every sampler node; returns how many were touched.
    /// A missing `inputs` key is created, as in [`set_input`](Self::set_input).
    pub fn set_sampler_seed(&mut self, seed: u64) -> usize {
        let mut touched = 0;
        for (id, node) in self.nodes.iter_mut() {
            if node.get("class_type").and_then(|v| v.as_str()) != Some(SAMPLER_CLASS) {
                continue;
            }
            let inputs = node
                .as_object_mut()
                .and_then(|n| n.entry("inputs").or_insert_with(|| Value::Object(Map::new())).as_object_mut());
            match inputs {
                Some(inputs) => {
                    inputs.insert("seed".to_string(), Value::from(seed));
                    touched += 1;
                }
                None => tracing::warn!(node_id = %id, "Sampler has non-object inputs, seed not set"),
            }
        }
        touched
    }
}

fn is_wrapped(obj: &Map<String, Value>) -> bool {
    obj.get("prompt").map(|p| p.is_object()).unwrap_or(false)
        && !obj.values().any(|v| v.get("class_type").is_some())
}

/// Title (`_meta.title`) to node ids, in node id order.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    by_title: HashMap<String, Vec<String>>,
}

/// Why a title could not be resolved to a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelLookup {
    Missing,
    Ambiguous(usize),
}

impl LabelIndex {
    pub fn build(nodes: &Map<String, Value>) -> Self {
        let mut by_title: HashMap<String, Vec<String>> = HashMap::new();
        for (id, node) in nodes.iter() {
            if let Some(title) = node.get("_meta").and_then(|m| m.get("title")).and_then(|t| t.as_str()) {
                by_title.entry(title.to_string()).or_default().push(id.clone());
            }
        }
        LabelIndex { by_title }
    }

    pub fn lookup(&self, title: &str) -> &[String] {
        self.by_title.get(title).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The single node carrying `title`.
    pub fn require(&self, title: &str) -> Result<&str, LabelLookup> {
        match self.lookup(title) {
            [] => Err(LabelLookup::Missing),
            [only] => Ok(only.as_str()),
            many => Err(LabelLookup::Ambiguous(many.len())),
        }
    }

    /// Resolve every title or report all the ones that failed at once.
    pub fn require_all<const N: usize>(&self, titles: [&str; N]) -> Result<[String; N], WorkflowError> {
        let mut missing = Vec::new();
        let mut ambiguous = Vec::new();
        let mut resolved: [String; N] = std::array::from_fn(|_| String::new());
        for (slot, title) in resolved.iter_mut().zip(titles) {
            match self.require(title) {
                Ok(id) => *slot = id.to_string(),
                Err(LabelLookup::Missing) => missing.push(title.to_string()),
                Err(LabelLookup::Ambiguous(_)) => ambiguous.push(title.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(WorkflowError::MissingNodes { titles: missing });
        }
        if !ambiguous.is_empty() {
            return Err(WorkflowError::AmbiguousNodes { titles: ambiguous });
        }
        Ok(resolved)
    }
}
