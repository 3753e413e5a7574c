//! Structured error body, serialized to JSON and then encrypted.

use serde::{Deserialize, Serialize};

/// Machine-readable code plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseStatus {
    /// Stable error identifier (e.g. `NonceSeen`)
    #[serde(rename = "ErrorCode")]
    pub error_code: String,

    /// Description safe to show the caller
    #[serde(rename = "Message")]
    pub message: String,
}

/// Error DTO returned, encrypted, in place of a success result.
///
/// ```json
/// { "ResponseStatus": { "ErrorCode": "RequestTooOld", "Message": "Request too old" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error details
    #[serde(rename = "ResponseStatus")]
    pub response_status: ResponseStatus,
}

impl ErrorResponse {
    /// Build an error response.
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            response_status: ResponseStatus {
                error_code: error_code.into(),
                message: message.into(),
            },
        }
    }

    /// Error code shortcut.
    pub fn error_code(&self) -> &str {
        &self.response_status.error_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_wire_names() {
        let error = ErrorResponse::new("NonceSeen", "Nonce already seen");

        insta::assert_snapshot!(
            serde_json::to_string(&error).unwrap(),
            @r#"{"ResponseStatus":{"ErrorCode":"NonceSeen","Message":"Nonce already seen"}}"#
        );
    }

    #[test]
    fn parses_back() {
        let json = r#"{"ResponseStatus":{"ErrorCode":"RequestTooOld","Message":"Request too old"}}"#;
        let error: ErrorResponse = serde_json::from_str(json).unwrap();

        assert_eq!(error.error_code(), "RequestTooOld");
        assert_eq!(error.response_status.message, "Request too old");
    }
}
