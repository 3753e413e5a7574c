//! Deterministic test harness for the Sealwire channel.
//!
//! A manual-clock [`SimEnv`], shared RSA fixtures, and invariant checks over
//! logs of engine outcomes. Freshness and replay scenarios become
//! reproducible: the clock only moves when the test moves it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod invariants;
pub mod sim_env;

pub use fixtures::{test_client, test_engine, test_key_pair};
pub use invariants::{
    Exchange, ExchangeLog, Invariant, InvariantRegistry, InvariantResult, NoReplayAccepted,
    Outcome, StatusMatchesReason, Violation, ZeroKeysBeforeRecovery,
};
pub use sim_env::{SIM_EPOCH_SECS, SimEnv};
