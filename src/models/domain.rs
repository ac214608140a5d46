use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Typed view over a backend prediction body
///
/// The body itself is relayed untouched; this view only feeds logging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    #[serde(default)]
    pub prediction: Option<Label>,
    #[serde(default)]
    pub probability: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<String>,
}

/// Prediction label, "Positive"/"Negative" or a raw class number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Text(String),
    Class(f64),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Text(s) => f.write_str(s),
            Label::Class(n) => write!(f, "{}", n),
        }
    }
}

impl PredictionSummary {
    /// Read the summary out of a backend body, tolerating any shape
    pub fn from_body(body: &Value) -> Self {
        // serde would read a struct out of an array by position
        if !body.is_object() {
            return Self::default();
        }
        serde_json::from_value(body.clone()).unwrap_or_default()
    }
}

impl fmt::Display for PredictionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prediction {
            Some(label) => write!(f, "Result: {}", label)?,
            None => f.write_str("Result: <none>")?,
        }
        match self.probability {
            Some(p) => write!(f, ", Probability: {}", p)?,
            None => f.write_str(", Probability: <none>")?,
        }
        if let Some(risk) = &self.risk_level {
            write!(f, ", Risk: {}", risk)?;
        }
        Ok(())
    }
}
