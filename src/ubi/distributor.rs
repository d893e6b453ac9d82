//! `UBIDistributor` (spec.md §4.G, Component G).
//!
//! Guarded by a single `std::sync::Mutex` covering every public operation's
//! entire body, including query-only calls — never `tokio::sync::RwLock`.
//! Spec.md §5 requires synchronous, non-suspending, whole-body locking with
//! no lock-held callbacks and no other lock acquired while holding this
//! one (strictly leaf). The teacher's async `RwLock`-guarded services
//! (`WithdrawalQueue`, `StealthDepositStore`) are the right shape for
//! I/O-driven work; this component intentionally departs from that
//! tokio-everywhere default as an explicit, spec-mandated exception.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::config::NetworkParams;
use crate::logging::log_claim_event;
use crate::types::{Amount, Hash256};
use crate::ubi::claim::{ClaimStatus, UBIClaim};
use crate::ubi::identity::ZkProver;
use crate::ubi::pool::EpochUBIPool;

/// Distributor errors. Structural/contract violations distinct from the
/// per-claim policy outcomes recorded in `ClaimStatus`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("AddBlockReward saw height {got} after already having seen {previous}")]
    NonMonotonicHeight { previous: u64, got: u64 },

    #[error("epoch {epoch} already finalized with identity count {prior}, cannot re-finalize with {attempted}")]
    AlreadyFinalized {
        epoch: u64,
        prior: u32,
        attempted: u32,
    },

    #[error("malformed persisted distributor state: {0}")]
    Malformed(String),

    #[error("persisted pool count {0} exceeds the sanity cap of 10000")]
    PoolCountExceeded(u32),

    #[error("persisted nullifier count {0} exceeds the sanity cap of 1000000")]
    NullifierCountExceeded(u32),
}

/// Read-only snapshot of an epoch's distribution progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochStats {
    pub claim_count: u32,
    pub amount_claimed: Amount,
    pub total_pool: Amount,
    pub amount_per_person: Amount,
    pub is_finalized: bool,
}

struct DistributorState {
    pools: HashMap<u64, EpochUBIPool>,
    current_epoch: u64,
    last_height_seen: Option<u64>,
    total_distributed: Amount,
    total_claims: u64,
}

/// Coordinates per-epoch UBI pools: funding from block subsidies,
/// finalization, and claim processing, all behind one mutex.
pub struct UBIDistributor {
    state: Mutex<DistributorState>,
    params: NetworkParams,
    zk_prover: Arc<dyn ZkProver>,
}

impl UBIDistributor {
    pub fn new(params: NetworkParams, zk_prover: Arc<dyn ZkProver>) -> Self {
        UBIDistributor {
            state: Mutex::new(DistributorState {
                pools: HashMap::new(),
                current_epoch: 0,
                last_height_seen: None,
                total_distributed: Amount::ZERO,
                total_claims: 0,
            }),
            params,
            zk_prover,
        }
    }

    fn end_height_for(&self, epoch: u64) -> i32 {
        ((epoch + 1) * self.params.epoch_blocks).saturating_sub(1) as i32
    }

    fn claim_deadline_for(&self, end_height: i32) -> i32 {
        end_height
            + self.params.ubi_claim_window as i32
            + (self.params.ubi_grace_epochs * self.params.epoch_blocks) as i32
    }

    /// Route a block's UBI-split subsidy into the pool for its epoch.
    pub fn add_block_reward(&self, height: u64, amount: Amount) -> Result<(), PoolError> {
        let mut state = self.state.lock().expect("distributor mutex poisoned");

        if let Some(last) = state.last_height_seen {
            if height < last {
                return Err(PoolError::NonMonotonicHeight {
                    previous: last,
                    got: height,
                });
            }
        }
        state.last_height_seen = Some(height);

        let epoch = height / self.params.epoch_blocks;
        if epoch > state.current_epoch {
            for e in state.current_epoch..epoch {
                if let Some(prior) = state.pools.get(&e) {
                    if !prior.is_finalized {
                        tracing::warn!(
                            target: "shurium::ubi",
                            epoch = e,
                            "crossed into a new epoch with a prior epoch still unfinalized"
                        );
                    }
                }
            }
            state.current_epoch = epoch;
        }

        let end_height = self.end_height_for(epoch);
        let pool = state
            .pools
            .entry(epoch)
            .or_insert_with(|| EpochUBIPool::new(epoch, end_height));
        pool.total_pool = pool.total_pool + amount;
        Ok(())
    }

    /// No-op if the pool is absent. Re-finalizing an already-finalized
    /// epoch with a *different* `identity_count` is a caller bug, rejected
    /// as `PoolError::AlreadyFinalized` rather than silently ignored.
    pub fn finalize_epoch(&self, epoch: u64, identity_count: u32) -> Result<(), PoolError> {
        let mut state = self.state.lock().expect("distributor mutex poisoned");
        let end_height = self.end_height_for(epoch);
        let claim_deadline = self.claim_deadline_for(end_height);
        let params = self.params.clone();
        if let Some(pool) = state.pools.get_mut(&epoch) {
            if pool.is_finalized && pool.eligible_count != identity_count {
                return Err(PoolError::AlreadyFinalized {
                    epoch,
                    prior: pool.eligible_count,
                    attempted: identity_count,
                });
            }
            pool.end_height = end_height;
            pool.claim_deadline = claim_deadline;
            pool.finalize(identity_count, &params);
        }
        Ok(())
    }

    /// Evaluate `claim` against the pool for `claim.epoch`, in the strict
    /// spec.md §4.G order, optionally mutating distributor state.
    fn evaluate(
        &self,
        state: &mut DistributorState,
        claim: &UBIClaim,
        identity_tree_root: Hash256,
        current_height: i32,
        mutate: bool,
    ) -> ClaimStatus {
        let epoch = claim.epoch;
        let pool_exists_and_finalized = state
            .pools
            .get(&epoch)
            .map(|p| p.is_finalized)
            .unwrap_or(false);
        if !pool_exists_and_finalized {
            return ClaimStatus::EpochNotComplete;
        }

        let claim_deadline = state.pools[&epoch].claim_deadline;
        if current_height > claim_deadline {
            return ClaimStatus::EpochExpired;
        }

        let amount_per_person = state.pools[&epoch].amount_per_person;
        if amount_per_person.sats() == 0 {
            return ClaimStatus::PoolEmpty;
        }

        if state.pools[&epoch].has_claimed(&claim.nullifier) {
            return ClaimStatus::DoubleClaim;
        }

        if !self.proof_is_valid(claim, identity_tree_root, epoch) {
            return ClaimStatus::InvalidProof;
        }

        if mutate {
            let pool = state.pools.get_mut(&epoch).expect("checked above");
            pool.record_claim(claim.nullifier, amount_per_person);
            state.total_distributed = state.total_distributed + amount_per_person;
            state.total_claims += 1;
        }

        ClaimStatus::Valid
    }

    fn proof_is_valid(&self, claim: &UBIClaim, identity_tree_root: Hash256, epoch: u64) -> bool {
        if !claim.proof.is_structurally_valid() {
            return false;
        }
        if claim.proof.proof_type != crate::ubi::identity::ProofType::UbiClaim {
            return false;
        }
        if claim.proof.public_inputs.len() < 3 {
            return false;
        }
        if claim.proof.public_inputs[0] != identity_tree_root {
            return false;
        }
        let epoch_as_field = {
            let mut bytes = [0u8; 32];
            bytes[0..8].copy_from_slice(&epoch.to_le_bytes());
            Hash256::from_bytes(bytes)
        };
        if claim.proof.public_inputs[2] != epoch_as_field {
            return false;
        }
        self.zk_prover.verify(&claim.proof, "ubi_claim")
    }

    /// Stamps `submitHeight`, evaluates the claim, writes the terminal
    /// status into it, and (on `Valid`) updates pool/distributor state.
    pub fn process_claim(
        &self,
        claim: &mut UBIClaim,
        identity_tree_root: Hash256,
        current_height: i32,
    ) -> ClaimStatus {
        let mut state = self.state.lock().expect("distributor mutex poisoned");
        claim.submit_height = current_height;
        let status = self.evaluate(&mut state, claim, identity_tree_root, current_height, true);
        claim.status = status;
        if status == ClaimStatus::Valid {
            claim.amount = state.pools[&claim.epoch].amount_per_person;
        }
        drop(state);
        log_claim_event(claim.epoch, status_label(status), claim.amount.sats());
        status
    }

    /// Read-only pre-screen: same predicate, no state mutation, no
    /// `submitHeight` write.
    pub fn verify_claim(
        &self,
        claim: &UBIClaim,
        identity_tree_root: Hash256,
        current_height: i32,
    ) -> ClaimStatus {
        let mut state = self.state.lock().expect("distributor mutex poisoned");
        self.evaluate(&mut state, claim, identity_tree_root, current_height, false)
    }

    pub fn is_epoch_claimable(&self, epoch: u64, height: i32) -> bool {
        let state = self.state.lock().expect("distributor mutex poisoned");
        state
            .pools
            .get(&epoch)
            .map(|p| p.accepting_claims(height))
            .unwrap_or(false)
    }

    pub fn get_claim_deadline(&self, epoch: u64) -> Option<i32> {
        let state = self.state.lock().expect("distributor mutex poisoned");
        state.pools.get(&epoch).map(|p| p.claim_deadline)
    }

    pub fn get_pool(&self, epoch: u64) -> Option<EpochUBIPool> {
        let state = self.state.lock().expect("distributor mutex poisoned");
        state.pools.get(&epoch).cloned()
    }

    pub fn get_amount_per_person(&self, epoch: u64) -> Option<Amount> {
        let state = self.state.lock().expect("distributor mutex poisoned");
        state.pools.get(&epoch).map(|p| p.amount_per_person)
    }

    pub fn get_epoch_stats(&self, epoch: u64) -> Option<EpochStats> {
        let state = self.state.lock().expect("distributor mutex poisoned");
        state.pools.get(&epoch).map(|p| EpochStats {
            claim_count: p.claim_count,
            amount_claimed: p.amount_claimed,
            total_pool: p.total_pool,
            amount_per_person: p.amount_per_person,
            is_finalized: p.is_finalized,
        })
    }

    /// Average number of claims per finalized epoch, `0.0` if none.
    pub fn get_average_claim_rate(&self) -> f64 {
        let state = self.state.lock().expect("distributor mutex poisoned");
        let finalized: Vec<_> = state.pools.values().filter(|p| p.is_finalized).collect();
        if finalized.is_empty() {
            return 0.0;
        }
        let total: u64 = finalized.iter().map(|p| p.claim_count as u64).sum();
        total as f64 / finalized.len() as f64
    }

    /// Delete pools below `currentEpoch - UBI_GRACE_EPOCHS - 10`.
    pub fn prune_old_pools(&self, current_epoch: u64) {
        let mut state = self.state.lock().expect("distributor mutex poisoned");
        let threshold = current_epoch
            .saturating_sub(self.params.ubi_grace_epochs)
            .saturating_sub(10);
        state.pools.retain(|&epoch, _| epoch >= threshold);
    }

    /// `UBIDistributor` persistent format (spec.md §6): version byte
    /// `0x01`, then currentEpoch, pool count, and each pool's fields in
    /// fixed little-endian layout.
    pub fn serialize(&self) -> Vec<u8> {
        let state = self.state.lock().expect("distributor mutex poisoned");
        let mut out = vec![0x01u8];
        out.extend_from_slice(&state.current_epoch.to_le_bytes());
        out.extend_from_slice(&(state.pools.len() as u32).to_le_bytes());

        let mut epochs: Vec<&u64> = state.pools.keys().collect();
        epochs.sort();
        for epoch in epochs {
            let pool = &state.pools[epoch];
            out.extend_from_slice(&pool.epoch.to_le_bytes());
            out.extend_from_slice(&pool.total_pool.sats().to_le_bytes());
            out.extend_from_slice(&pool.eligible_count.to_le_bytes());
            out.extend_from_slice(&pool.amount_per_person.sats().to_le_bytes());
            out.extend_from_slice(&pool.amount_claimed.sats().to_le_bytes());
            out.extend_from_slice(&pool.claim_count.to_le_bytes());
            out.push(pool.is_finalized as u8);
            out.extend_from_slice(&pool.end_height.to_le_bytes());
            out.extend_from_slice(&pool.claim_deadline.to_le_bytes());
            out.extend_from_slice(&(pool.used_nullifiers.len() as u32).to_le_bytes());
            let mut nullifiers: Vec<&Hash256> = pool.used_nullifiers.iter().map(|n| &n.hash).collect();
            nullifiers.sort();
            for hash in nullifiers {
                out.extend_from_slice(hash.as_bytes());
            }
        }
        out
    }

    pub fn deserialize(
        bytes: &[u8],
        params: NetworkParams,
        zk_prover: Arc<dyn ZkProver>,
    ) -> Result<Self, PoolError> {
        let mut offset = 0usize;
        let need = |offset: usize, n: usize| -> Result<(), PoolError> {
            if offset + n > bytes.len() {
                Err(PoolError::Malformed("unexpected end of input".into()))
            } else {
                Ok(())
            }
        };

        need(offset, 1)?;
        if bytes[offset] != 0x01 {
            return Err(PoolError::Malformed(format!(
                "unsupported version byte {}",
                bytes[offset]
            )));
        }
        offset += 1;

        need(offset, 8)?;
        let current_epoch = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
        offset += 8;

        need(offset, 4)?;
        let pool_count = u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
        offset += 4;
        if pool_count > 10_000 {
            return Err(PoolError::PoolCountExceeded(pool_count));
        }

        let mut pools = HashMap::with_capacity(pool_count as usize);
        for _ in 0..pool_count {
            need(offset, 8)?;
            let epoch = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
            offset += 8;

            need(offset, 8)?;
            let total_pool = i64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
            offset += 8;

            need(offset, 4)?;
            let eligible_count = u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
            offset += 4;

            need(offset, 8)?;
            let amount_per_person = i64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
            offset += 8;

            need(offset, 8)?;
            let amount_claimed = i64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
            offset += 8;

            need(offset, 4)?;
            let claim_count = u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
            offset += 4;

            need(offset, 1)?;
            let is_finalized = bytes[offset] != 0;
            offset += 1;

            need(offset, 4)?;
            let end_height = i32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
            offset += 4;

            need(offset, 4)?;
            let claim_deadline = i32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
            offset += 4;

            need(offset, 4)?;
            let nullifier_count = u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
            offset += 4;
            if nullifier_count > 1_000_000 {
                return Err(PoolError::NullifierCountExceeded(nullifier_count));
            }

            let mut used_nullifiers = std::collections::HashSet::with_capacity(nullifier_count as usize);
            for _ in 0..nullifier_count {
                need(offset, 32)?;
                let mut h = [0u8; 32];
                h.copy_from_slice(&bytes[offset..offset + 32]);
                offset += 32;
                used_nullifiers.insert(crate::ubi::claim::Nullifier {
                    hash: Hash256::from_bytes(h),
                    epoch,
                });
            }

            pools.insert(
                epoch,
                EpochUBIPool {
                    epoch,
                    end_height,
                    claim_deadline,
                    total_pool: Amount::from_sats(total_pool),
                    eligible_count,
                    amount_per_person: Amount::from_sats(amount_per_person),
                    amount_claimed: Amount::from_sats(amount_claimed),
                    claim_count,
                    is_finalized,
                    used_nullifiers,
                },
            );
        }

        let total_distributed = pools.values().fold(Amount::ZERO, |acc, p| acc + p.amount_claimed);
        let total_claims = pools.values().map(|p| p.claim_count as u64).sum();
        let last_height_seen = pools
            .values()
            .map(|p| (p.epoch + 1) * params.epoch_blocks - 1)
            .max();

        Ok(UBIDistributor {
            state: Mutex::new(DistributorState {
                pools,
                current_epoch,
                last_height_seen,
                total_distributed,
                total_claims,
            }),
            params,
            zk_prover,
        })
    }
}

fn status_label(status: ClaimStatus) -> &'static str {
    match status {
        ClaimStatus::Pending => "Pending",
        ClaimStatus::Valid => "Valid",
        ClaimStatus::InvalidProof => "InvalidProof",
        ClaimStatus::DoubleClaim => "DoubleClaim",
        ClaimStatus::IdentityNotFound => "IdentityNotFound",
        ClaimStatus::EpochExpired => "EpochExpired",
        ClaimStatus::EpochNotComplete => "EpochNotComplete",
        ClaimStatus::PoolEmpty => "PoolEmpty",
    }
}
