//! SHURIUM consensus core.
//!
//! A standalone consensus library implementing three coupled systems:
//!
//! 1. **Chain consensus** (`consensus`) — compact-target difficulty
//!    retargeting, block subsidy and its five-way split, and
//!    Proof-of-Useful-Work coinbase-commitment validation.
//! 2. **Useful-work verification** (`verify`) — a pluggable registry of
//!    per-problem-type solution verifiers behind a bounded async
//!    submission queue.
//! 3. **Privacy-preserving UBI distribution** (`ubi`) — epoch-scoped
//!    reward pools, nullifier-based anti-double-claim, and ZK
//!    identity-membership claims.
//!
//! This crate implements the consensus rules and data structures only; it
//! does not run a network, a mempool, or a wallet.

pub mod config;
pub mod consensus;
pub mod error;
pub mod logging;
pub mod types;
pub mod ubi;
pub mod verify;

pub use config::{Network, NetworkParams};
pub use error::{Result, ShuriumError};
pub use types::{Amount, Hash160, Hash256};
