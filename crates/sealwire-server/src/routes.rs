//! HTTP bindings for the channel.
//!
//! Two routes: the public key endpoint and the envelope endpoint. Every
//! response on the envelope route is an encrypted `EncryptedMessageResponse`,
//! whether the request succeeded, was rejected, or was not an envelope at
//! all.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use sealwire_core::{DecodeError, Environment, InvalidPart, MessageEngine, RequestStage};
use sealwire_crypto::{ExportedPublicKey, SessionKeys};
use sealwire_proto::{EncryptedMessage, EncryptedMessageResponse, ErrorResponse};
use tracing::{debug, error};

use crate::dispatch::Dispatcher;

/// Header carrying the published key's fingerprint.
pub const FINGERPRINT_HEADER: &str = "x-public-key-fingerprint";

/// Everything the handlers share.
pub struct ChannelState<E: Environment> {
    /// Protocol engine
    pub engine: MessageEngine<E>,
    /// Service dispatcher
    pub dispatcher: Arc<dyn Dispatcher>,
    /// Public key as published, computed once
    pub public_key: ExportedPublicKey,
    /// `public_key.fingerprint` as a header value
    pub fingerprint: HeaderValue,
}

/// Build the router with both channel routes installed.
pub fn router<E: Environment>(
    state: Arc<ChannelState<E>>,
    public_key_path: &str,
    message_path: &str,
) -> Router {
    Router::new()
        .route(public_key_path, get(public_key::<E>))
        .route(message_path, post(encrypted_message::<E>))
        .with_state(state)
}

async fn public_key<E: Environment>(State(state): State<Arc<ChannelState<E>>>) -> Response {
    let mut response = state.public_key.encoded.clone().into_response();
    response
        .headers_mut()
        .insert(HeaderName::from_static(FINGERPRINT_HEADER), state.fingerprint.clone());
    response
}

async fn encrypted_message<E: Environment>(
    State(state): State<Arc<ChannelState<E>>>,
    body: Bytes,
) -> Response {
    let engine = &state.engine;

    let message = match EncryptedMessage::from_json(&body) {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, "request body is not an envelope");
            let error = DecodeError::InvalidMessage(InvalidPart::Envelope).to_response();
            let response = engine.encode_error(&SessionKeys::zeroed(None), &error);
            return encrypted(StatusCode::BAD_REQUEST, response);
        },
    };

    let request = match engine.decode_request(&message) {
        Ok(request) => request,
        Err(rejection) => {
            let status = status_code(rejection.status_code());
            return encrypted(status, engine.encode_rejection(&rejection));
        },
    };

    let line = &request.line;
    debug!(
        stage = ?RequestStage::Dispatched,
        verb = %line.verb,
        operation = %line.operation,
        "dispatching"
    );

    match state.dispatcher.dispatch(&line.verb, &line.operation, &line.body).await {
        Ok(result) => match engine.encode_response(&request.keys, &result) {
            Ok(response) => encrypted(StatusCode::OK, response),
            Err(e) => {
                error!(error = %e, operation = %line.operation, "failed to encode result");
                let error = ErrorResponse::new("InternalServerError", "Failed to encode response");
                let response = engine.encode_error(&request.keys, &error);
                encrypted(StatusCode::INTERNAL_SERVER_ERROR, response)
            },
        },
        Err(service_error) => {
            debug!(error = %service_error, operation = %line.operation, "service error");
            let response = engine.encode_error(&request.keys, &service_error.to_response());
            encrypted(status_code(service_error.status), response)
        },
    }
}

fn encrypted(status: StatusCode, response: EncryptedMessageResponse) -> Response {
    (status, Json(response)).into_response()
}

fn status_code(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
