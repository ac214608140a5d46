use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Clinical parameters every prediction request must carry, in canonical order
pub const REQUIRED_FIELDS: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs",
    "restecg", "thalach", "exang", "oldpeak", "slope", "ca", "thal",
];

/// Errors decoding an inbound request body
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Request body must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Failed to read request body: {0}")]
    Payload(String),
}

/// Patient record submitted by the form
///
/// Only key presence is checked here. Values are forwarded as received, in
/// the order they were received, including any extra keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionRequest {
    fields: Map<String, Value>,
}

impl PredictionRequest {
    /// Decode a raw request body
    pub fn parse(body: &[u8]) -> Result<Self, RequestError> {
        match serde_json::from_slice::<Value>(body)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(RequestError::NotAnObject(json_type_name(&other))),
        }
    }

    /// Required keys absent from the record, in canonical order
    pub fn missing_fields(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| !self.fields.contains_key(*field))
            .collect()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for PredictionRequest {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
