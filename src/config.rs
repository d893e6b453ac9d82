//! Per-network consensus constants (spec.md §6 "Network parameters").
//!
//! Mirrors the teacher's `ZVaultConfig`/`Network` shape: an enum with
//! per-variant default methods, plus an `from_env_overrides` loader in the
//! same `env::var(...).unwrap_or(...)` idiom, for the handful of values an
//! operator legitimately wants to override on a private test network.

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::types::Amount;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}

/// Network environment. Two profiles differ only in numerics (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            other => Err(ConfigError::UnknownNetwork(other.to_string())),
        }
    }
}

/// All consensus constants the core reads, per spec.md §6.
#[derive(Debug, Clone)]
pub struct NetworkParams {
    pub network: Network,

    /// Initial block reward, in base units.
    pub initial_reward: Amount,
    /// Halving interval, in blocks.
    pub halving_interval: u64,

    /// Target spacing between blocks, in seconds.
    pub target_spacing: u32,
    /// Target timespan for a full retarget window, in seconds.
    pub target_timespan: u32,
    /// `powLimit`, the easiest allowed 256-bit target.
    pub pow_limit: [u8; 32],

    /// Disables retargeting entirely (regtest-style networks).
    pub no_retargeting: bool,
    /// Allows min-difficulty blocks after a long time gap (testnets).
    pub allow_min_difficulty_blocks: bool,

    /// Five subsidy split percentages; need not sum to 100 (spec.md §4.B
    /// allows the sum to be at most the subsidy, any remainder is
    /// implicitly unassigned).
    pub ubi_split_pct: u32,
    pub work_split_pct: u32,
    pub contribution_split_pct: u32,
    pub ecosystem_split_pct: u32,
    pub reserve_split_pct: u32,

    /// Height interval at which `IsUBIDistributionBlock` fires.
    pub ubi_distribution_interval: u64,
    /// Blocks per UBI epoch.
    pub epoch_blocks: u64,
    /// Extra blocks after `endHeight` during which a pool still accepts
    /// claims, before grace epochs kick in.
    pub ubi_claim_window: u64,
    /// Extra epochs retained after the claim window for re-orgs/late
    /// claimants before pruning.
    pub ubi_grace_epochs: u64,
    /// Minimum identity count for a pool to pay out anything.
    pub min_identities_for_ubi: u32,
    /// Hard cap on `amountPerPerson`.
    pub max_ubi_per_person: Amount,

    /// Whether a block may omit a PoUW commitment entirely (test/regression
    /// networks only, per spec.md §4.D).
    pub pouw_optional: bool,
    /// Height at which PoUW commitment checking activates.
    pub pouw_activation_height: u64,
}

impl NetworkParams {
    /// `0x1d00ffff` expanded: Bitcoin-style maximum target (spec.md S2).
    /// byte_offset = size - 3 = 0x1d - 3 = 26 (spec.md §4.A).
    pub const MAINNET_POW_LIMIT: [u8; 32] = {
        let mut t = [0u8; 32];
        t[26] = 0xff;
        t[27] = 0xff;
        t
    };

    pub fn mainnet() -> Self {
        NetworkParams {
            network: Network::Mainnet,
            initial_reward: Amount::from_sats(50 * crate::types::amount::SATS_PER_COIN),
            halving_interval: 210_000,
            target_spacing: 600,
            target_timespan: 14 * 24 * 60 * 60,
            pow_limit: Self::MAINNET_POW_LIMIT,
            no_retargeting: false,
            allow_min_difficulty_blocks: false,
            ubi_split_pct: 30,
            work_split_pct: 30,
            contribution_split_pct: 15,
            ecosystem_split_pct: 15,
            reserve_split_pct: 10,
            ubi_distribution_interval: 1,
            epoch_blocks: 4 * 24 * 6 * 30, // ~30 days at 10-min blocks
            ubi_claim_window: 4 * 24 * 6 * 14, // ~14 days
            ubi_grace_epochs: 2,
            min_identities_for_ubi: 1_000,
            max_ubi_per_person: Amount::from_sats(10 * crate::types::amount::SATS_PER_COIN),
            pouw_optional: false,
            pouw_activation_height: 0,
        }
    }

    pub fn testnet() -> Self {
        let mut p = Self::mainnet();
        p.network = Network::Testnet;
        // Halving interval ~1 week at 10-minute blocks.
        p.halving_interval = 1_008;
        p.allow_min_difficulty_blocks = true;
        p.min_identities_for_ubi = 3;
        p
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::mainnet(),
            Network::Testnet => Self::testnet(),
        }
    }

    /// Apply the small set of overrides an operator might legitimately
    /// want to flip on a private test network, from environment variables.
    pub fn from_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(v) = env::var("SHURIUM_NO_RETARGETING") {
            self.no_retargeting = parse_bool("SHURIUM_NO_RETARGETING", &v)?;
        }
        if let Ok(v) = env::var("SHURIUM_ALLOW_MIN_DIFFICULTY") {
            self.allow_min_difficulty_blocks = parse_bool("SHURIUM_ALLOW_MIN_DIFFICULTY", &v)?;
        }
        if let Ok(v) = env::var("SHURIUM_POUW_OPTIONAL") {
            self.pouw_optional = parse_bool("SHURIUM_POUW_OPTIONAL", &v)?;
        }
        Ok(self)
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(ConfigError::InvalidValue(
            var.to_string(),
            other.to_string(),
        )),
    }
}
