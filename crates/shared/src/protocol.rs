use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Review body as sent by a client.
///
/// The three known keys are kept as raw JSON so each can be type-checked and reported on
/// its own. Any other key is collected into `unsupported`. `null` reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Value>,
    #[serde(default, alias = "review", skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<Value>,
    #[serde(flatten)]
    pub unsupported: Map<String, Value>,
}

impl ReviewPayload {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none()
            && self.text.is_none()
            && self.reviewed_by.is_none()
            && self.unsupported.is_empty()
    }

    pub fn unsupported_keys(&self) -> Vec<&str> {
        self.unsupported.keys().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn acknowledged(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
            data: None,
        }
    }
}
