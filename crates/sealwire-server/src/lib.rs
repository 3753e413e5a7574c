//! Sealwire HTTP server.
//!
//! Production host for the encrypted message channel: axum for HTTP, Tokio
//! for the runtime, system time and the OS RNG for the environment.
//!
//! # Architecture
//!
//! This crate is glue around [`sealwire_core`]'s Sans-IO engine. The
//! [`EncryptedMessagesFeature`] builds the engine and router once at startup;
//! each envelope is decoded, handed to a [`Dispatcher`], and the result is
//! sealed back under the request's keys.
//!
//! # Components
//!
//! - [`Server`]: binds a listener and serves the router
//! - [`EncryptedMessagesFeature`]: one-time key setup and route registration
//! - [`ServiceRegistry`]: minimal operation dispatcher with a demo `Hello`
//! - [`SystemEnv`]: Production environment (wall clock, crypto RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod dispatch;
mod error;
mod feature;
pub mod routes;
mod system_env;

use std::{net::SocketAddr, sync::Arc};

use axum::Router;
pub use config::{DEFAULT_MESSAGE_PATH, DEFAULT_PUBLIC_KEY_PATH, ServerRuntimeConfig};
pub use dispatch::{Dispatcher, ServiceError, ServiceRegistry};
pub use error::ServerError;
pub use feature::EncryptedMessagesFeature;
pub use routes::FINGERPRINT_HEADER;
pub use system_env::SystemEnv;
use tokio::net::TcpListener;

/// Production Sealwire server.
pub struct Server {
    listener: TcpListener,
    router: Router,
}

impl Server {
    /// Register the channel and bind the listener.
    ///
    /// # Errors
    ///
    /// - `Config` / `Key`: the server key cannot be set up
    /// - `Transport`: the bind address is unusable
    pub async fn bind(
        config: ServerRuntimeConfig,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Result<Self, ServerError> {
        let bind_address = config.bind_address.clone();
        let router = EncryptedMessagesFeature::new(config).register(SystemEnv::new(), dispatcher)?;
        let listener = TcpListener::bind(&bind_address).await?;

        Ok(Self { listener, router })
    }

    /// Run the server until it is shut down or an error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.listener.local_addr()?);
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }
}
