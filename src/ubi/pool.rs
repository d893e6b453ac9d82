//! `EpochUBIPool` (spec.md §4.F, Component F).

use std::collections::HashSet;

use crate::config::NetworkParams;
use crate::types::Amount;
use crate::ubi::claim::Nullifier;

/// Per-epoch UBI pool state.
#[derive(Debug, Clone)]
pub struct EpochUBIPool {
    pub epoch: u64,
    pub end_height: i32,
    pub claim_deadline: i32,

    pub total_pool: Amount,
    pub eligible_count: u32,
    pub amount_per_person: Amount,

    pub amount_claimed: Amount,
    pub claim_count: u32,

    pub is_finalized: bool,

    pub used_nullifiers: HashSet<Nullifier>,
}

impl EpochUBIPool {
    /// Constructor fills `epoch`, `endHeight`; all other fields zero/false
    /// (spec.md §4.F).
    pub fn new(epoch: u64, end_height: i32) -> Self {
        EpochUBIPool {
            epoch,
            end_height,
            claim_deadline: 0,
            total_pool: Amount::ZERO,
            eligible_count: 0,
            amount_per_person: Amount::ZERO,
            amount_claimed: Amount::ZERO,
            claim_count: 0,
            is_finalized: false,
            used_nullifiers: HashSet::new(),
        }
    }

    /// Freeze per-person allotment: `amountPerPerson = min(totalPool /
    /// eligibleCount, MAX_UBI_PER_PERSON)` if `eligibleCount >=
    /// MIN_IDENTITIES_FOR_UBI`, else 0.
    ///
    /// A no-op if already finalized; callers that need to reject a second
    /// finalization with a *different* `identity_count` as a bug should
    /// check `is_finalized`/`eligible_count` first (see
    /// `UBIDistributor::finalize_epoch`).
    pub fn finalize(&mut self, identity_count: u32, params: &NetworkParams) {
        if self.is_finalized {
            return;
        }
        self.eligible_count = identity_count;
        self.amount_per_person = if identity_count >= params.min_identities_for_ubi {
            let per_person = self.total_pool.div_count(identity_count);
            if per_person.sats() > params.max_ubi_per_person.sats() {
                params.max_ubi_per_person
            } else {
                per_person
            }
        } else {
            Amount::ZERO
        };
        self.is_finalized = true;
    }

    /// `AcceptingClaims(height) = isFinalized && height <= claimDeadline`.
    pub fn accepting_claims(&self, height: i32) -> bool {
        self.is_finalized && height <= self.claim_deadline
    }

    /// Record a successful claim against this pool. Caller must have
    /// already confirmed the nullifier is unused.
    pub fn record_claim(&mut self, nullifier: Nullifier, amount: Amount) {
        self.used_nullifiers.insert(nullifier);
        self.amount_claimed = self.amount_claimed + amount;
        self.claim_count += 1;
    }

    pub fn has_claimed(&self, nullifier: &Nullifier) -> bool {
        self.used_nullifiers.contains(nullifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hash256;

    fn params() -> NetworkParams {
        let mut p = NetworkParams::mainnet();
        p.min_identities_for_ubi = 10;
        p.max_ubi_per_person = Amount::from_sats(1_000);
        p
    }

    #[test]
    fn s5_insufficient_identities_yields_zero_per_person() {
        let mut pool = EpochUBIPool::new(1, 1000);
        pool.total_pool = Amount::from_sats(100_000);
        pool.finalize(9, &params());
        assert_eq!(pool.amount_per_person, Amount::ZERO);
    }

    #[test]
    fn finalize_caps_at_max_per_person() {
        let mut pool = EpochUBIPool::new(1, 1000);
        pool.total_pool = Amount::from_sats(1_000_000);
        pool.finalize(10, &params());
        assert_eq!(pool.amount_per_person, Amount::from_sats(1_000));
    }

    #[test]
    fn finalize_divides_pool_when_under_cap() {
        let mut pool = EpochUBIPool::new(1, 1000);
        pool.total_pool = Amount::from_sats(5_000);
        pool.finalize(10, &params());
        assert_eq!(pool.amount_per_person, Amount::from_sats(500));
    }

    #[test]
    fn record_claim_tracks_nullifier_and_totals() {
        let mut pool = EpochUBIPool::new(1, 1000);
        pool.total_pool = Amount::from_sats(5_000);
        pool.finalize(10, &params());
        let nullifier = Nullifier {
            hash: Hash256::sha256(b"n1"),
            epoch: 1,
        };
        assert!(!pool.has_claimed(&nullifier));
        pool.record_claim(nullifier, pool.amount_per_person);
        assert!(pool.has_claimed(&nullifier));
        assert_eq!(pool.claim_count, 1);
        assert_eq!(pool.amount_claimed, pool.amount_per_person);
    }

    #[test]
    fn accepting_claims_respects_deadline() {
        let mut pool = EpochUBIPool::new(1, 1000);
        pool.total_pool = Amount::from_sats(5_000);
        pool.finalize(10, &params());
        pool.claim_deadline = 2000;
        assert!(pool.accepting_claims(2000));
        assert!(!pool.accepting_claims(2001));
        assert!(!EpochUBIPool::new(2, 1000).accepting_claims(500));
    }
}
