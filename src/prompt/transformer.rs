//! Rewrites an assembled prompt into ComfyUI tag style via a chat-completion API.
//!
//! Any OpenAI-compatible `/chat/completions` endpoint works; the base URL, model
//! and token budget come from [`Config`]. Sampling parameters are fixed.
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub const TEMPERATURE: f64 = 0.7;

pub const SYSTEM_INSTRUCTION: &str = "You write prompts for a Stable Diffusion workflow running in ComfyUI. \
Rewrite the user's description into one positive prompt made of short, comma-separated tags \
(subject, pose, setting, lighting, style, quality). Reply with the prompt only, no commentary.";

/// Literal text placed around every rewritten prompt, e.g. trigger words for a LoRA.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptWrap {
    pub prefix: String,
    pub suffix: String,
}

impl PromptWrap {
    pub fn apply(&self, text: &str) -> String {
        format!("{}{}{}", self.prefix, text, self.suffix)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct PromptTransformer {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    wrap: PromptWrap,
}

impl PromptTransformer {
    pub fn new(base_url: String, api_key: Option<String>, model: String, max_tokens: u32) -> Self {
        PromptTransformer {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            max_tokens,
            wrap: PromptWrap::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            config.openai_max_tokens,
        )
        .with_wrap(PromptWrap {
            prefix: config.prompt_prefix.clone(),
            suffix: config.prompt_suffix.clone(),
        })
    }

    pub fn with_wrap(mut self, wrap: PromptWrap) -> Self {
        self.wrap = wrap;
        self
    }

    /// Send `raw_prompt` to the language model and return the trimmed first
    /// choice with the configured prefix/suffix applied.
    ///
    /// One request, no retry, no timeout beyond the transport default.
    pub async fn transform(&self, raw_prompt: &str) -> AppResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let user_message = format!("Description:\n\n{}\n\nReturn only the rewritten prompt.", raw_prompt);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: SYSTEM_INSTRUCTION },
                ChatMessage { role: "user", content: &user_message },
            ],
            temperature: TEMPERATURE,
            max_tokens: self.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::info!(model = %self.model, "Requesting prompt rewrite");
        tracing::debug!(raw_prompt, "Raw prompt");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(AppError::Llm(format!("Status: {}, Body: {}", status, error_body)));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| AppError::Llm(e.to_string()))?;
        let text = first_choice_text(parsed)?;
        let prompt = self.wrap.apply(&text);
        tracing::info!(prompt = %prompt, "Prompt rewritten");
        Ok(prompt)
    }
}

fn first_choice_text(response: ChatResponse) -> AppResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| AppError::Llm("response contained no completion text".to_string()))
}
