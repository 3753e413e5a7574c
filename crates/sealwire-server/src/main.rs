//! Sealwire server binary.
//!
//! # Usage
//!
//! ```bash
//! # Generate a key at startup (development)
//! sealwire-server --bind 0.0.0.0:8080
//!
//! # Serve an operator-supplied key, published as XML
//! sealwire-server --private-key server.pem --public-key-format xml
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, ValueEnum};
use sealwire_core::EngineConfig;
use sealwire_crypto::{KeyLength, PublicKeyFormat};
use sealwire_server::{
    DEFAULT_MESSAGE_PATH, DEFAULT_PUBLIC_KEY_PATH, Server, ServerRuntimeConfig, ServiceRegistry,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Public key encoding on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum KeyFormatArg {
    /// SubjectPublicKeyInfo PEM
    Pem,
    /// `RSAKeyValue` XML
    Xml,
}

impl From<KeyFormatArg> for PublicKeyFormat {
    fn from(arg: KeyFormatArg) -> Self {
        match arg {
            KeyFormatArg::Pem => Self::Pem,
            KeyFormatArg::Xml => Self::Xml,
        }
    }
}

/// Sealwire encrypted message server
#[derive(Parser, Debug)]
#[command(name = "sealwire-server")]
#[command(about = "Encrypted message channel over HTTP")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Private key file (PEM or RSAKeyValue XML); generated if omitted
    #[arg(short = 'k', long)]
    private_key: Option<PathBuf>,

    /// RSA modulus size for a generated key (1024, 2048, 4096)
    #[arg(long, default_value = "2048")]
    key_length: usize,

    /// Encoding of the published public key
    #[arg(long, value_enum, default_value = "pem")]
    public_key_format: KeyFormatArg,

    /// Route serving the public key
    #[arg(long, default_value = DEFAULT_PUBLIC_KEY_PATH)]
    public_key_path: String,

    /// Route accepting encrypted envelopes
    #[arg(long, default_value = DEFAULT_MESSAGE_PATH)]
    message_path: String,

    /// Oldest accepted request timestamp, in seconds before now
    #[arg(long, default_value = "1200")]
    max_request_age_secs: u64,

    /// Reject timestamps more than this many seconds in the future
    #[arg(long)]
    max_clock_skew_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Sealwire server starting");
    tracing::info!("Binding to {}", args.bind);

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        private_key_path: args.private_key,
        key_length: KeyLength::try_from(args.key_length)?,
        public_key_format: args.public_key_format.into(),
        public_key_path: args.public_key_path,
        message_path: args.message_path,
        engine: EngineConfig {
            max_request_age: Duration::from_secs(args.max_request_age_secs),
            max_clock_skew: args.max_clock_skew_secs.map(Duration::from_secs),
        },
    };

    let registry = ServiceRegistry::with_demo_services();
    let mut operations: Vec<_> = registry.operations().collect();
    operations.sort_unstable();
    tracing::info!(?operations, "registered operations");

    let server = Server::bind(config, Arc::new(registry)).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
