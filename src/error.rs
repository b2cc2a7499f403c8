//! Error types for XREST API operations.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur during XREST API operations.
#[derive(Debug, Error)]
pub enum NuageError {
    /// Configuration is missing or incomplete.
    #[error("Nuage configuration required: {0}")]
    ConfigMissing(String),

    /// The server answered with a non-success status code.
    #[error("API error {code}: {message}")]
    Api { code: u16, message: &'static str },

    /// The server rejected the request with a structured conflict.
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error.
    #[error("Failed to encode request body: {0}")]
    Json(#[from] serde_json::Error),

    /// The server sent a body that is neither empty nor valid JSON.
    #[error("Malformed response payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// An object needs an ID for the requested operation.
    #[error("{rest_name} has no ID set")]
    MissingIdentifier { rest_name: &'static str },

    /// An object carries no resource identity, so no URL can be derived for it.
    #[error("Object has no resource identity")]
    MissingIdentity,

    /// The push center was started twice.
    #[error("Push center is already running")]
    PushCenterRunning,
}

impl NuageError {
    /// Build the API error for a status code that has no special handling.
    pub fn from_status(code: u16) -> Self {
        let message = match code {
            400 => "Bad request",
            401 => "Unauthorized",
            403 => "Permission denied",
            404 => "Not found",
            405 => "Not allowed",
            408 => "Timeout",
            412 => "Precondition failed",
            419 => "Authentication expired",
            500 => "Internal server error",
            503 => "Service unavailable",
            _ => "Unknown error",
        };
        NuageError::Api { code, message }
    }

    /// HTTP status code carried by the error, if it came from the server.
    pub fn code(&self) -> Option<u16> {
        match self {
            NuageError::Api { code, .. } => Some(*code),
            NuageError::Conflict(conflict) => Some(conflict.code),
            NuageError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// One entry of a conflict error's `descriptions` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorDescription {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Structured error returned by the server along with a 409.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Conflict {code}: {message}")]
pub struct ConflictError {
    pub code: u16,
    pub message: String,
    pub property: String,
    pub descriptions: Vec<ErrorDescription>,
}

#[derive(Deserialize)]
struct ConflictBody {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    property: String,
    #[serde(default)]
    descriptions: Vec<ErrorDescription>,
}

impl ConflictError {
    /// Decode a conflict body. Bodies that are not JSON keep their raw text
    /// as the message.
    pub fn from_body(code: u16, body: &[u8]) -> Self {
        let raw = String::from_utf8_lossy(body).into_owned();

        match serde_json::from_slice::<ConflictBody>(body) {
            Ok(parsed) => Self {
                code,
                message: parsed.kind.unwrap_or(raw),
                property: parsed.property,
                descriptions: parsed.descriptions,
            },
            Err(_) => Self {
                code,
                message: raw,
                property: String::new(),
                descriptions: Vec::new(),
            },
        }
    }
}

/// Result type alias for XREST operations.
pub type Result<T> = core::result::Result<T, NuageError>;
