use std::time::Instant;

use chrono::Utc;
use serde_json::Value;

use crate::config::ReaderConfig;
use crate::convert::{GenerationParams, MarkdownConverter};
use crate::download::embed_images;
use crate::error::{ConversionError, FetchError, ReadError};
use crate::extract::{extract_images, extract_links, extract_title};
use crate::fetch::{build_web_client, fetch_html};
use crate::models::{ImageInfo, ReadRequest, ReadResult};
use crate::rewrite::inline_image_references;

/// Runs the fetch → extract → convert → rewrite → assemble sequence.
/// Holds no per-request state; one instance serves every caller.
pub struct Reader {
    web: reqwest::Client,
    converter: MarkdownConverter,
    download_concurrency: usize,
}

impl Reader {
    pub fn new(config: &ReaderConfig) -> Result<Self, ReadError> {
        let web = build_web_client(config.verify_tls)
            .map_err(|e| ReadError::Fetch(FetchError::Transport(e.to_string())))?;
        let converter = MarkdownConverter::new(config)?;

        Ok(Self {
            web,
            converter,
            download_concurrency: config.download_concurrency,
        })
    }

    /// Entry point for loosely-typed tool arguments.
    pub async fn read_arguments(&self, args: &Value) -> Result<ReadResult, ReadError> {
        let request = ReadRequest::from_arguments(args)?;
        self.read(&request).await
    }

    pub async fn read(&self, request: &ReadRequest) -> Result<ReadResult, ReadError> {
        let started = Instant::now();
        let url = &request.url;

        tracing::info!(url = %url, "fetching");
        let html = fetch_html(&self.web, url).await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "fetch failed");
            ReadError::from(e)
        })?;
        let fetched_at = Utc::now();

        let mut images = Vec::new();
        if request.wants_images() {
            images = extract_images(&html, url);
            tracing::info!(url = %url, count = images.len(), "extracted images");
            if request.keep_image_data_url && !images.is_empty() {
                embed_images(&self.web, &mut images, self.download_concurrency).await;
            }
        }

        let mut links = Vec::new();
        if request.with_links_summary {
            links = extract_links(&html, url);
            tracing::info!(url = %url, count = links.len(), "extracted links");
        }

        tracing::info!(url = %url, bytes = html.len(), "converting to markdown");
        let params = GenerationParams {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        let markdown = self
            .converter
            .convert(&html, &params)
            .await
            .map_err(|e: ConversionError| {
                tracing::warn!(url = %url, error = %e, "conversion failed");
                ReadError::from(e)
            })?;

        let retained: &[ImageInfo] = if request.retain_images { &images } else { &[] };
        let markdown = inline_image_references(&markdown, retained);

        Ok(ReadResult {
            markdown,
            source_url: url.to_string(),
            title: extract_title(&html),
            fetched_at,
            processing_time_ms: started.elapsed().as_micros() as f64 / 1000.0,
            images,
            links,
        })
    }
}
