//! The boundary between the channel and the services behind it.
//!
//! Once a request is decrypted the host hands `(verb, operation, body)` to a
//! [`Dispatcher`] and encrypts whatever comes back. The channel does not care
//! how operations are resolved; [`ServiceRegistry`] is a minimal
//! name-to-handler map that is enough to serve the demo `Hello` operation.

use std::{collections::HashMap, fmt};

use async_trait::async_trait;
use sealwire_proto::ErrorResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error raised by a service, returned to the client encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// HTTP status of the response
    pub status: u16,
    /// `ResponseStatus.ErrorCode`
    pub code: String,
    /// `ResponseStatus.Message`
    pub message: String,
}

impl ServiceError {
    /// Build a service error.
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { status, code: code.into(), message: message.into() }
    }

    /// No handler is registered for `operation`.
    pub fn not_found(operation: &str) -> Self {
        Self::new(404, "NotFound", format!("Unknown operation {operation}"))
    }

    /// Request body could not be read as the operation's request type.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, "SerializationException", message)
    }

    /// Error body to encrypt back to the caller.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.code.clone(), self.message.clone())
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ServiceError {}

/// Executes a decrypted operation.
#[async_trait]
pub trait Dispatcher: Send + Sync + 'static {
    /// Run `operation` with the raw JSON `body`.
    async fn dispatch(&self, verb: &str, operation: &str, body: &str)
    -> Result<Value, ServiceError>;
}

type Handler = Box<dyn Fn(&str, &str) -> Result<Value, ServiceError> + Send + Sync>;

/// Operations keyed by name.
#[derive(Default)]
pub struct ServiceRegistry {
    handlers: HashMap<String, Handler>,
}

impl ServiceRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the demo `Hello` operation.
    pub fn with_demo_services() -> Self {
        Self::new().register("Hello", hello)
    }

    /// Add a handler. It receives the verb and the raw JSON body.
    #[must_use]
    pub fn register<F>(mut self, operation: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str, &str) -> Result<Value, ServiceError> + Send + Sync + 'static,
    {
        self.handlers.insert(operation.into(), Box::new(handler));
        self
    }

    /// Registered operation names.
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

#[async_trait]
impl Dispatcher for ServiceRegistry {
    async fn dispatch(
        &self,
        verb: &str,
        operation: &str,
        body: &str,
    ) -> Result<Value, ServiceError> {
        let handler =
            self.handlers.get(operation).ok_or_else(|| ServiceError::not_found(operation))?;
        handler(verb, body)
    }
}

/// `Hello` request DTO.
#[derive(Debug, Deserialize)]
pub struct HelloRequest {
    /// Who to greet
    pub name: String,
}

/// `Hello` response DTO.
#[derive(Debug, Serialize)]
pub struct HelloResponse {
    /// Greeting
    pub result: String,
}

/// Demo operation: `{"name":"World"}` → `{"result":"Hello, World"}`.
pub fn hello(_verb: &str, body: &str) -> Result<Value, ServiceError> {
    let request: HelloRequest =
        serde_json::from_str(body).map_err(|e| ServiceError::bad_request(e.to_string()))?;
    let response = HelloResponse { result: format!("Hello, {}", request.name) };
    serde_json::to_value(response).map_err(|e| ServiceError::new(500, "InternalServerError", e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn hello_greets_by_name() {
        let registry = ServiceRegistry::with_demo_services();
        let result = registry.dispatch("GET", "Hello", r#"{"name":"World"}"#).await.unwrap();
        assert_eq!(result, json!({ "result": "Hello, World" }));
    }

    #[tokio::test]
    async fn registered_operations_are_listed_and_dispatchable() {
        let registry = ServiceRegistry::with_demo_services()
            .register("Echo", |_verb, body| Ok(json!({ "echo": body })));

        let mut operations: Vec<_> = registry.operations().collect();
        operations.sort_unstable();
        assert_eq!(operations, ["Echo", "Hello"]);

        let result = registry.dispatch("POST", "Echo", "{}").await.unwrap();
        assert_eq!(result, json!({ "echo": "{}" }));
    }

    #[tokio::test]
    async fn unknown_operation_is_not_found() {
        let registry = ServiceRegistry::with_demo_services();
        let err = registry.dispatch("GET", "Missing", "{}").await.unwrap_err();
        assert_eq!(err.status, 404);
        assert_eq!(err.code, "NotFound");
    }

    #[tokio::test]
    async fn bad_body_is_bad_request() {
        let registry = ServiceRegistry::with_demo_services();
        let err = registry.dispatch("GET", "Hello", "not json").await.unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[test]
    fn service_error_response_shape() {
        let response = ServiceError::not_found("Missing").to_response();
        assert_eq!(response.error_code(), "NotFound");
        assert_eq!(response.response_status.message, "Unknown operation Missing");
    }
}
