//! ComfyUI HTTP client and batch submission.
pub mod client;
pub mod submitter;

pub use client::ComfyUIClient;
pub use submitter::{build_envelope, BatchReceipt, JobSubmitter, SubmitRequest, Submission};
