//! Gateway error types.

use thiserror::Error;

/// Errors that can occur when talking to the Telegram Bot API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The bot token was rejected (HTTP 401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Too many requests (HTTP 429).
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The API answered with `ok: false`.
    #[error("Telegram API error {code}: {description}")]
    Api { code: i64, description: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The response body was not what the API documents.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
