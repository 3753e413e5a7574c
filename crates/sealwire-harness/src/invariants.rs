//! Invariant checking over a log of processed requests.
//!
//! Tests feed every engine outcome into an [`ExchangeLog`] and then run an
//! [`InvariantRegistry`] over it. Invariants state what must hold for any
//! interleaving of requests, not what one scenario should return.
//!
//! # Usage
//!
//! ```ignore
//! let mut log = ExchangeLog::new(engine.config().nonce_ttl());
//! log.record(env.wall_clock_secs(), &engine.decode_request(&message));
//! InvariantRegistry::standard().assert_all(&log, "after replay burst");
//! ```

use std::{collections::HashMap, time::Duration};

use sealwire_core::{DecodeError, DecryptedRequest, Rejection, RequestStage};
use sealwire_crypto::{IV_SIZE, KEY_SIZE};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// What the engine decided for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Passed every check
    Accepted,
    /// Refused
    Rejected {
        /// Last stage completed
        stage: RequestStage,
        /// Rejection reason
        error: DecodeError,
        /// Whether the error would be sealed under all-zero keys
        zero_keys: bool,
    },
}

/// One processed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Request IV as the engine saw it (zero if the key blob was undecodable)
    pub iv: [u8; IV_SIZE],
    /// Server clock when processed, Unix seconds
    pub at_secs: i64,
    /// Result
    pub outcome: Outcome,
}

/// Ordered record of engine outcomes.
#[derive(Debug, Clone)]
pub struct ExchangeLog {
    /// Exchanges in processing order
    pub exchanges: Vec<Exchange>,
    /// Lifetime of a nonce entry
    pub nonce_ttl: Duration,
}

impl ExchangeLog {
    /// Empty log for an engine with the given nonce lifetime.
    pub fn new(nonce_ttl: Duration) -> Self {
        Self { exchanges: Vec::new(), nonce_ttl }
    }

    /// Record the result of `MessageEngine::decode_request`.
    pub fn record(&mut self, at_secs: i64, result: &Result<DecryptedRequest, Rejection>) {
        let exchange = match result {
            Ok(request) => Exchange { iv: *request.keys.iv(), at_secs, outcome: Outcome::Accepted },
            Err(rejection) => Exchange {
                iv: *rejection.keys.iv(),
                at_secs,
                outcome: Outcome::Rejected {
                    stage: rejection.stage,
                    error: rejection.error.clone(),
                    zero_keys: rejection.keys.crypt_key() == &[0u8; KEY_SIZE]
                        && rejection.keys.auth_key() == &[0u8; KEY_SIZE],
                },
            },
        };
        self.exchanges.push(exchange);
    }

    /// Number of accepted requests.
    pub fn accepted(&self) -> usize {
        self.exchanges.iter().filter(|e| e.outcome == Outcome::Accepted).count()
    }
}

/// An invariant that can be checked against an exchange log.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against the log.
    fn check(&self, log: &ExchangeLog) -> InvariantResult;
}

/// An IV is accepted at most once per nonce lifetime.
pub struct NoReplayAccepted;

impl Invariant for NoReplayAccepted {
    fn name(&self) -> &'static str {
        "NoReplayAccepted"
    }

    fn check(&self, log: &ExchangeLog) -> InvariantResult {
        let ttl = log.nonce_ttl.as_secs() as i64;
        let mut last_accepted: HashMap<[u8; IV_SIZE], i64> = HashMap::new();

        for exchange in log.exchanges.iter().filter(|e| e.outcome == Outcome::Accepted) {
            if let Some(previous) = last_accepted.insert(exchange.iv, exchange.at_secs)
                && exchange.at_secs - previous <= ttl
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "IV {:02x?} accepted at {previous} and again at {}",
                        &exchange.iv[..4],
                        exchange.at_secs
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Rejections before key recovery are sealed under zero keys, later ones
/// under the client's keys.
pub struct ZeroKeysBeforeRecovery;

impl Invariant for ZeroKeysBeforeRecovery {
    fn name(&self) -> &'static str {
        "ZeroKeysBeforeRecovery"
    }

    fn check(&self, log: &ExchangeLog) -> InvariantResult {
        for exchange in &log.exchanges {
            if let Outcome::Rejected { stage, zero_keys, .. } = &exchange.outcome
                && stage.has_session_keys() == *zero_keys
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("rejection at {stage:?} sealed with zero_keys={zero_keys}"),
                });
            }
        }
        Ok(())
    }
}

/// Malformed input maps to 400, refusals of well-formed input to 403.
pub struct StatusMatchesReason;

impl Invariant for StatusMatchesReason {
    fn name(&self) -> &'static str {
        "StatusMatchesReason"
    }

    fn check(&self, log: &ExchangeLog) -> InvariantResult {
        for exchange in &log.exchanges {
            if let Outcome::Rejected { error, .. } = &exchange.outcome {
                let expected = if matches!(error, DecodeError::InvalidMessage(_)) { 400 } else { 403 };
                if error.status_code() != expected {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("{error:?} reported as {}", error.status_code()),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Registry with every channel invariant.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(NoReplayAccepted);
        registry.add(ZeroKeysBeforeRecovery);
        registry.add(StatusMatchesReason);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants, returning every violation found.
    pub fn check_all(&self, log: &ExchangeLog) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(log).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking on violation.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, log: &ExchangeLog, context: &str) {
        if let Err(violations) = self.check_all(log) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
