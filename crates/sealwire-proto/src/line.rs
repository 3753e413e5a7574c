//! Plaintext request line carried inside `EncryptedBody`.
//!
//! ```text
//! <unixTimestampSeconds> <verb> <operationName> <jsonRequestBody>
//! ```
//!
//! Only the first three spaces are delimiters. The JSON body is taken
//! verbatim and may itself contain spaces (or be empty).

use crate::errors::{ProtocolError, Result};

/// A decrypted request: who to call, how, and with what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// Client clock at send time, Unix seconds
    pub timestamp: i64,
    /// HTTP-style verb the operation is invoked with (e.g. `GET`, `POST`)
    pub verb: String,
    /// Operation (request DTO) name
    pub operation: String,
    /// JSON request body, verbatim
    pub body: String,
}

impl RequestLine {
    /// Build a request line, rejecting verb/operation tokens that would not
    /// survive parsing.
    ///
    /// # Errors
    ///
    /// - `MalformedLine`: verb or operation is empty or contains whitespace
    pub fn new(
        timestamp: i64,
        verb: impl Into<String>,
        operation: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self> {
        let verb = verb.into();
        let operation = operation.into();

        if !is_token(&verb) {
            return Err(ProtocolError::MalformedLine("verb must be a single non-empty token"));
        }
        if !is_token(&operation) {
            return Err(ProtocolError::MalformedLine(
                "operation must be a single non-empty token",
            ));
        }

        Ok(Self { timestamp, verb, operation, body: body.into() })
    }

    /// Parse a decrypted request line.
    ///
    /// # Errors
    ///
    /// - `MalformedLine`: fewer than four fields, or a non-integer timestamp
    pub fn parse(line: &str) -> Result<Self> {
        if line.is_empty() {
            return Err(ProtocolError::MalformedLine("request line is empty"));
        }

        let mut parts = line.splitn(4, ' ');

        let timestamp = parts
            .next()
            .and_then(|t| t.parse::<i64>().ok())
            .ok_or(ProtocolError::MalformedLine("timestamp is not an integer"))?;
        let verb = parts
            .next()
            .filter(|v| !v.is_empty())
            .ok_or(ProtocolError::MalformedLine("missing verb"))?;
        let operation = parts
            .next()
            .filter(|o| !o.is_empty())
            .ok_or(ProtocolError::MalformedLine("missing operation"))?;
        let body = parts.next().ok_or(ProtocolError::MalformedLine("missing request body"))?;

        Ok(Self {
            timestamp,
            verb: verb.to_string(),
            operation: operation.to_string(),
            body: body.to_string(),
        })
    }

    /// Render as a single line.
    pub fn encode(&self) -> String {
        format!("{} {} {} {}", self.timestamp, self.verb, self.operation, self.body)
    }
}

fn is_token(value: &str) -> bool {
    !value.is_empty() && !value.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_json_spaces_verbatim() {
        let line = RequestLine::parse(r#"1700000000 POST CreateUser {"name": "Ada Lovelace", "age": 36}"#)
            .unwrap();

        assert_eq!(line.timestamp, 1_700_000_000);
        assert_eq!(line.verb, "POST");
        assert_eq!(line.operation, "CreateUser");
        assert_eq!(line.body, r#"{"name": "Ada Lovelace", "age": 36}"#);
    }

    #[test]
    fn encode_parse_roundtrip() {
        let line = RequestLine::new(42, "GET", "Hello", r#"{"name":"World"}"#).unwrap();
        assert_eq!(line.encode(), r#"42 GET Hello {"name":"World"}"#);
        assert_eq!(RequestLine::parse(&line.encode()).unwrap(), line);
    }

    #[test]
    fn empty_body_is_allowed() {
        let line = RequestLine::parse("42 GET Ping ").unwrap();
        assert_eq!(line.body, "");
    }

    #[test]
    fn missing_body_is_rejected() {
        assert_eq!(
            RequestLine::parse("42 GET Ping"),
            Err(ProtocolError::MalformedLine("missing request body"))
        );
    }

    #[test]
    fn empty_line_is_rejected() {
        assert_eq!(
            RequestLine::parse(""),
            Err(ProtocolError::MalformedLine("request line is empty"))
        );
    }

    #[test]
    fn non_numeric_timestamp_is_rejected() {
        assert_eq!(
            RequestLine::parse("yesterday GET Hello {}"),
            Err(ProtocolError::MalformedLine("timestamp is not an integer"))
        );
    }

    #[test]
    fn doubled_delimiter_is_rejected() {
        // "42  GET" yields an empty verb token
        assert_eq!(
            RequestLine::parse("42  GET Hello {}"),
            Err(ProtocolError::MalformedLine("missing verb"))
        );
    }

    #[test]
    fn new_rejects_spaces_in_tokens() {
        assert!(RequestLine::new(1, "GET ALL", "Hello", "{}").is_err());
        assert!(RequestLine::new(1, "GET", "", "{}").is_err());
    }
}
