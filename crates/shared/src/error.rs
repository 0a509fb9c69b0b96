use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Identifier is not a well-formed key.
    InvalidReference,
    /// Well-formed identifier with no matching active entity.
    NotFound,
    EmptyBody,
    MissingField,
    /// Wrong type, out-of-range value or malformed name.
    Validation,
    UnsupportedField,
    /// Unexpected failure from a store. The only server-side fault.
    StoreFailure,
}

impl ErrorCode {
    pub fn is_server_fault(self) -> bool {
        matches!(self, Self::StoreFailure)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn for_field(code: ErrorCode, field: &str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: Some(field.to_string()),
        }
    }
}
