//! ComfyUI prompt relay library
//!
//! Modules:
//! - `api`: Axum HTTP handlers, router setup, basic auth and gallery.
//! - `comfyui`: Thin client for ComfyUI REST endpoints and batch submission.
//! - `prompt`: Fragment assembly and language-model rewriting.
//! - `workflow`: Workflow documents, title index and the patch routine.
//! - `history`: Bounded in-memory ledger of submitted batches.
//! - `pipeline`: The end-to-end relay used by the server and the CLI.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `ComfyUIClient`,
//! `PromptTransformer`, `Pipeline` and `WorkflowDocument`.
pub mod api;
pub mod comfyui;
pub mod prompt;
pub mod workflow;
pub mod history;
pub mod pipeline;
pub mod config;
pub mod error;

pub use config::Config;
pub use comfyui::client::ComfyUIClient;
pub use prompt::transformer::PromptTransformer;
pub use pipeline::Pipeline;
pub use workflow::document::WorkflowDocument;
