//! Prompt assembly and language-model rewriting.
pub mod assembler;
pub mod transformer;

pub use assembler::{assemble_raw_prompt, PromptParts};
pub use transformer::{PromptTransformer, PromptWrap};
