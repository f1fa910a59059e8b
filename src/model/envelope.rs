//! Uniform answer shape returned by every dispatched operation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of executing a [`super::QueryAnalysis`].
///
/// `success = false` always carries a human-readable `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub message: String,
    /// Serialized chart payload for an external renderer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,
}

impl ResultEnvelope {
    pub fn ok(data: Value, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            chart: None,
        }
    }

    /// Successful envelope from any serializable payload.
    ///
    /// A payload that fails to serialize becomes a failure envelope.
    pub fn from_data<T: Serialize>(data: &T, message: impl Into<String>) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self::ok(value, message),
            Err(e) => Self::fail(format!("Error: could not encode result: {e}")),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
            chart: None,
        }
    }

    #[must_use]
    pub fn with_chart(mut self, chart: Option<String>) -> Self {
        self.chart = chart.filter(|c| !c.is_empty());
        self
    }
}
