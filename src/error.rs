use axum::http::StatusCode;

// ── Pipeline errors ──────────────────────────────────────────────────────────

/// Terminal failure of one read. Each variant aborts the pipeline and is
/// reported to the caller as a single message.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Failed to fetch web content: {0}")]
    Fetch(#[from] FetchError),
    #[error("Failed to convert content: {0}")]
    Conversion(#[from] ConversionError),
}

impl ReadError {
    /// JSON-RPC error code for this failure.
    pub fn code(&self) -> i64 {
        match self {
            ReadError::InvalidInput(_) => -32602,
            ReadError::Fetch(_) => -1,
            ReadError::Conversion(_) => -2,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ReadError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ReadError::Fetch(_) | ReadError::Conversion(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("TimeoutError: {0}")]
    Timeout(String),
    #[error("failed to fetch URL: {0}")]
    Transport(String),
    #[error("failed to read response body: {0}")]
    Body(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("failed to call AI API: {0}")]
    Transport(String),
    #[error("failed to parse response: {0}")]
    Decode(String),
    #[error("AI API error: {message}{}", kind.as_deref().map(|k| format!(" ({k})")).unwrap_or_default())]
    Service { message: String, kind: Option<String> },
    #[error("no response from AI API")]
    NoChoices,
    #[error("empty response from AI API")]
    EmptyCompletion,
}

// ── Per-image errors ─────────────────────────────────────────────────────────

/// Failure to inline one image. Absorbed by the extractor; the image is
/// kept as metadata only.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
    #[error("image too large: {size} bytes")]
    Oversized { size: u64 },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if e.is_connect() {
            FetchError::Transport(format!("ConnectError: {}", e))
        } else {
            FetchError::Transport(format!("RequestError: {}", e))
        }
    }
}

impl From<reqwest::Error> for AssetError {
    fn from(e: reqwest::Error) -> Self {
        AssetError::Transport(e.to_string())
    }
}
