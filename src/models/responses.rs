use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned for every failed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Usually a string. Upstream rejections may relay structured detail.
    pub error: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: Value::String(error.into()),
            details: None,
            suggestion: None,
            status: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Health check response when the backend answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend: Value,
    pub api_url: String,
}

/// Health check response when the backend is down or misbehaving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnhealthyResponse {
    pub status: String,
    pub message: String,
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Service info served at the root path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
