use crate::models::PredictionRequest;
use reqwest::{header, Client};
use serde_json::Value;
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Message used when a rejection carries neither `detail` nor `error`
pub const DEFAULT_REJECTION_MESSAGE: &str = "Prediction failed";
/// Message used when a rejection body is not JSON
pub const UNPARSABLE_REJECTION_MESSAGE: &str = "Backend service error";

/// Errors that can occur when talking to the prediction backend
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Backend returned {status}: {message}")]
    Rejected { status: u16, message: Value },

    #[error("Could not connect to {0}")]
    Unreachable(String),

    #[error("Backend health check returned {0}")]
    Unhealthy(u16),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Prediction backend client
///
/// One attempt per call, no retries. Responses are returned as raw JSON so
/// the caller can relay them untouched.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    /// As configured, reported back to callers
    api_url: String,
    /// Trailing slashes trimmed, used to build endpoint URLs
    base_url: String,
    client: Client,
}

impl UpstreamClient {
    /// Create a new client for `api_url`
    ///
    /// `timeout` of `None` keeps reqwest's default behaviour.
    pub fn new(api_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, UpstreamError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let api_url = api_url.into();
        Ok(Self {
            base_url: normalize_base_url(&api_url),
            api_url,
            client: builder.build()?,
        })
    }

    /// Base URL exactly as configured
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Full URL of a backend endpoint, e.g. `endpoint("predict")`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Forward a patient record to `<base>/predict`
    pub async fn predict(&self, record: &PredictionRequest) -> Result<Value, UpstreamError> {
        let url = self.endpoint("predict");

        let response = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.ok();
            return Err(UpstreamError::Rejected {
                status: status.as_u16(),
                message: rejection_message(body),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(format!("Failed to parse prediction: {}", e)))
    }

    /// Fetch `<base>/health`
    pub async fn health(&self) -> Result<Value, UpstreamError> {
        let url = self.endpoint("health");

        let response = self
            .client
            .get(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Unhealthy(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::InvalidResponse(format!("Failed to parse health payload: {}", e)))
    }

    fn transport_error(&self, e: reqwest::Error) -> UpstreamError {
        if is_connection_refused(&e) {
            UpstreamError::Unreachable(self.api_url.clone())
        } else {
            UpstreamError::Request(e)
        }
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// True only when the backend actively refused the connection. DNS failures
/// and connect timeouts are not refusals.
fn is_connection_refused(e: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(e as &(dyn StdError + 'static));
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = err.source();
    }
    false
}

/// Pick the message out of a rejection body: `detail`, then `error`, skipping
/// falsy values the way the form's client code does.
pub fn rejection_message(body: Option<Value>) -> Value {
    let body = body.unwrap_or_else(|| {
        serde_json::json!({ "error": UNPARSABLE_REJECTION_MESSAGE })
    });

    ["detail", "error"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find(|value| is_truthy(value))
        .cloned()
        .unwrap_or_else(|| Value::String(DEFAULT_REJECTION_MESSAGE.to_string()))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_join_ignores_trailing_slash() {
        let client = UpstreamClient::new("http://localhost:8000//", None).unwrap();
        assert_eq!(client.api_url(), "http://localhost:8000//");
        assert_eq!(client.endpoint("predict"), "http://localhost:8000/predict");
        assert_eq!(client.endpoint("/health"), "http://localhost:8000/health");
    }

    #[test]
    fn test_client_creation_with_timeout() {
        let client = UpstreamClient::new("http://backend:8000", Some(Duration::from_secs(5))).unwrap();
        assert_eq!(client.api_url(), "http://backend:8000");
    }

    #[test]
    fn test_rejection_prefers_detail() {
        let message = rejection_message(Some(json!({"detail": "bad input", "error": "other"})));
        assert_eq!(message, json!("bad input"));
    }

    #[test]
    fn test_rejection_falls_back_to_error() {
        let message = rejection_message(Some(json!({"detail": "", "error": "model not loaded"})));
        assert_eq!(message, json!("model not loaded"));
    }

    #[test]
    fn test_rejection_keeps_structured_detail() {
        let detail = json!([{"loc": ["body", "age"], "msg": "field required"}]);
        let message = rejection_message(Some(json!({ "detail": detail.clone() })));
        assert_eq!(message, detail);
    }

    #[test]
    fn test_rejection_generic_fallbacks() {
        assert_eq!(rejection_message(None), json!(UNPARSABLE_REJECTION_MESSAGE));
        assert_eq!(rejection_message(Some(json!({}))), json!(DEFAULT_REJECTION_MESSAGE));
        assert_eq!(rejection_message(Some(json!({"detail": null, "error": 0}))), json!(DEFAULT_REJECTION_MESSAGE));
        assert_eq!(rejection_message(Some(json!("plain string"))), json!(DEFAULT_REJECTION_MESSAGE));
    }

    #[test]
    fn test_unreachable_display_names_base_url() {
        let err = UpstreamError::Unreachable("http://localhost:8000".to_string());
        assert_eq!(err.to_string(), "Could not connect to http://localhost:8000");
    }

    #[tokio::test]
    async fn test_predict_against_closed_port_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = UpstreamClient::new(format!("http://127.0.0.1:{}", port), None).unwrap();
        let record = PredictionRequest::parse(br#"{"age": 50}"#).unwrap();

        match client.predict(&record).await {
            Err(UpstreamError::Unreachable(url)) => assert_eq!(url, format!("http://127.0.0.1:{}", port)),
            other => panic!("expected unreachable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_predict_against_unresolvable_host_is_not_unreachable() {
        let client = UpstreamClient::new("http://no-such-host.invalid:8000", None).unwrap();
        let record = PredictionRequest::parse(br#"{"age": 50}"#).unwrap();

        match client.predict(&record).await {
            Err(UpstreamError::Request(_)) => {}
            other => panic!("expected request error, got {:?}", other),
        }
    }
}
