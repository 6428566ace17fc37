use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// HTTP-analog code carried by a failed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum ResolutionErrorCode {
    InvalidUri,
    NotFound,
}

impl ResolutionErrorCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            ResolutionErrorCode::InvalidUri => 400,
            ResolutionErrorCode::NotFound => 404,
        }
    }
}

impl From<ResolutionErrorCode> for u16 {
    fn from(code: ResolutionErrorCode) -> Self {
        code.as_u16()
    }
}

impl TryFrom<u16> for ResolutionErrorCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            400 => Ok(ResolutionErrorCode::InvalidUri),
            404 => Ok(ResolutionErrorCode::NotFound),
            other => Err(format!("unsupported resolution error code {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionError {
    pub error: String,
    pub code: ResolutionErrorCode,
    pub message: String,
    pub agent_uri: String,
}

impl ResolutionError {
    pub fn invalid_uri(agent_uri: &str) -> Self {
        Self {
            error: "invalid_uri".to_string(),
            code: ResolutionErrorCode::InvalidUri,
            message: format!(
                "'{}' is not a valid agent URI; expected agent://name[.service].organization.tld",
                agent_uri
            ),
            agent_uri: agent_uri.to_string(),
        }
    }

    pub fn not_found(agent_uri: &str, attempted: &[&str]) -> Self {
        let message = if attempted.is_empty() {
            format!("no resolver produced a record for '{}'", agent_uri)
        } else {
            format!(
                "no resolver produced a record for '{}' (tried: {})",
                agent_uri,
                attempted.join(", ")
            )
        };
        Self {
            error: "agent_not_found".to_string(),
            code: ResolutionErrorCode::NotFound,
            message,
            agent_uri: agent_uri.to_string(),
        }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.error, self.code.as_u16(), self.message)
    }
}

impl std::error::Error for ResolutionError {}

/// Recoverable failure of a single source. Never fatal to a resolution or query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("{url} responded with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("malformed document from {url}: {message}")]
    MalformedBody { url: String, message: String },

    #[error("store lookup failed: {0}")]
    Store(String),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}
