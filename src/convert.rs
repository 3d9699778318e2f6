use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ReaderConfig;
use crate::error::ConversionError;

pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str = "You are a web content extractor. Your task is to convert HTML content to clean, well-formatted Markdown. \
Extract only the main content, removing ads, navigation, scripts, and other non-essential elements. \
Preserve the structure with proper Markdown headings, lists, links, and formatting. \
Keep all image references in Markdown format: ![alt text](image_url). \
Keep all links in Markdown format: [link text](url). \
Return ONLY the Markdown content without any explanations or additional text.";

const USER_PREFIX: &str = "Please convert the following HTML content to Markdown:\n\n";

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CompletionRequest {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub messages: Vec<ChatMessage>,
    pub model: String,
    #[serde(rename = "maxTokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Per-call generation overrides; `None` selects the default.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Client for the chat-completions service that turns HTML into Markdown.
pub struct MarkdownConverter {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    default_model: String,
}

impl MarkdownConverter {
    pub fn new(config: &ReaderConfig) -> Result<Self, ConversionError> {
        let client = reqwest::ClientBuilder::new()
            .timeout(COMPLETION_TIMEOUT)
            .build()
            .map_err(|e| ConversionError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            default_model: config.default_model.clone(),
        })
    }

    pub fn build_request(&self, html: &str, params: &GenerationParams) -> CompletionRequest {
        CompletionRequest {
            temperature: params.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_k: 0,
            top_p: 0.0,
            frequency_penalty: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("{}{}", USER_PREFIX, html),
                },
            ],
            model: params
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }

    /// Convert `html` to Markdown. Returns the trimmed completion text.
    pub async fn convert(&self, html: &str, params: &GenerationParams) -> Result<String, ConversionError> {
        let request = self.build_request(html, params);
        tracing::debug!(model = %request.model, max_tokens = request.max_tokens, "requesting completion");

        let body = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ConversionError::Transport(e.to_string()))?
            .text()
            .await
            .map_err(|e| ConversionError::Transport(e.to_string()))?;

        let response: CompletionResponse =
            serde_json::from_str(&body).map_err(|e| ConversionError::Decode(e.to_string()))?;

        extract_completion(response)
    }
}

fn extract_completion(response: CompletionResponse) -> Result<String, ConversionError> {
    if let Some(err) = response.error {
        return Err(ConversionError::Service {
            message: err.message,
            kind: err.kind,
        });
    }

    let choice = response
        .choices
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or(ConversionError::NoChoices)?;

    let content = choice.message.content.unwrap_or_default();
    let content = content.trim();
    if content.is_empty() {
        return Err(ConversionError::EmptyCompletion);
    }
    Ok(content.to_string())
}
