use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use crate::error::ReadError;

/// Validated input for one read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    pub url: Url,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub retain_images: bool,
    pub keep_image_data_url: bool,
    pub with_images_summary: bool,
    pub with_links_summary: bool,
}

impl ReadRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            model: None,
            max_tokens: None,
            temperature: None,
            retain_images: false,
            keep_image_data_url: false,
            with_images_summary: false,
            with_links_summary: false,
        }
    }

    /// Coerce a loosely-typed tool argument object. Only `url` is required;
    /// optional values of the wrong JSON type are ignored.
    pub fn from_arguments(args: &Value) -> Result<Self, ReadError> {
        let args = args.as_object().ok_or_else(|| {
            ReadError::InvalidInput("arguments must be a JSON object".to_string())
        })?;

        let raw_url = string_arg(args, &["url"]).ok_or_else(|| {
            ReadError::InvalidInput("missing required parameter: url".to_string())
        })?;
        let url = Url::parse(raw_url.trim())
            .map_err(|e| ReadError::InvalidInput(format!("invalid URL format: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ReadError::InvalidInput(
                "Only http and https URLs are allowed".to_string(),
            ));
        }

        let mut request = Self::new(url);
        request.model = string_arg(args, &["model"])
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        request.max_tokens = args
            .get("maxTokens")
            .or_else(|| args.get("max_tokens"))
            .and_then(positive_int);
        request.temperature = args.get("temperature").and_then(Value::as_f64);
        request.retain_images = bool_arg(args, &["retain_images", "retainImages"]);
        request.keep_image_data_url = bool_arg(
            args,
            &["keep_img_data_url", "keepImageDataURL", "keep_image_data_url"],
        );
        request.with_images_summary =
            bool_arg(args, &["with_images_summary", "withImagesSummary"]);
        request.with_links_summary = bool_arg(args, &["with_links_summary", "withLinksSummary"]);
        Ok(request)
    }

    pub fn wants_images(&self) -> bool {
        self.retain_images || self.with_images_summary
    }
}

fn string_arg<'a>(args: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| args.get(*k).and_then(Value::as_str))
}

fn bool_arg(args: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter()
        .find_map(|k| args.get(*k).and_then(Value::as_bool))
        .unwrap_or(false)
}

fn positive_int(value: &Value) -> Option<u32> {
    let n = value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite() && *f >= 1.0).map(|f| f as u64))?;
    u32::try_from(n).ok().filter(|n| *n > 0)
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct ImageInfo {
    pub original_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
    pub alt: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LinkInfo {
    pub url: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Successful outcome of one read.
#[derive(Debug, Clone)]
pub struct ReadResult {
    pub markdown: String,
    pub source_url: String,
    pub title: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub processing_time_ms: f64,
    pub images: Vec<ImageInfo>,
    pub links: Vec<LinkInfo>,
}

// ── HTTP response shapes ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ReadMetadata {
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub processing_time_ms: f64,
    pub word_count: usize,
    pub image_count: usize,
    pub link_count: usize,
    pub images: Vec<ImageInfo>,
    pub links: Vec<LinkInfo>,
}

#[derive(Debug, Serialize)]
pub struct ReadResponse {
    pub markdown: String,
    pub metadata: ReadMetadata,
}
