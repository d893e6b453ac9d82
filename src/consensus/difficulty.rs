//! Difficulty retargeting (spec.md §4.C, Component C).
//!
//! `BlockIndex` mirrors the ownership note in spec.md §3: the chain tree
//! owns every index, and back-references are non-owning. We realize that
//! with `Option<Arc<BlockIndex>>` parent pointers rather than raw/lifetime
//! pointers — idiomatic Rust for a shared, immutable, append-only tree,
//! matching how the teacher's own header types (`btc_spv.rs::BlockHeader`)
//! are plain owned/cloned structs rather than pointer-chased ones.

use std::sync::Arc;

use crate::config::NetworkParams;
use crate::consensus::compact::{compact, expand, CompactTarget};
use crate::types::Hash256;

/// A node in the in-memory chain index.
#[derive(Debug, Clone)]
pub struct BlockIndex {
    pub height: u64,
    pub time: u32,
    pub n_bits: CompactTarget,
    pub prev: Option<Arc<BlockIndex>>,
}

impl BlockIndex {
    pub fn genesis(time: u32, n_bits: CompactTarget) -> Arc<BlockIndex> {
        Arc::new(BlockIndex {
            height: 0,
            time,
            n_bits,
            prev: None,
        })
    }

    pub fn next(prev: &Arc<BlockIndex>, time: u32, n_bits: CompactTarget) -> Arc<BlockIndex> {
        Arc::new(BlockIndex {
            height: prev.height + 1,
            time,
            n_bits,
            prev: Some(prev.clone()),
        })
    }

    /// Walk back to the ancestor at `height`, or `None` if `height` is
    /// beyond this index's own height or below what the chain retains.
    pub fn ancestor(index: &Arc<BlockIndex>, height: u64) -> Option<Arc<BlockIndex>> {
        if height > index.height {
            return None;
        }
        let mut cur = index.clone();
        while cur.height > height {
            cur = cur.prev.clone()?;
        }
        Some(cur)
    }
}

/// `CalculateNextWorkRequired`: rescale `old_bits` by the ratio of the
/// observed timespan to the target timespan (spec.md §4.C step 5), using a
/// widened `u128` intermediate for the mantissa multiply per the Design
/// Notes' "unsafe integer paths" warning (a 23-bit mantissa times a 4x
/// timespan multiplier fits `u64` in practice, but the explicit widening
/// removes the "must be asserted" caveat entirely).
pub fn calculate_next_work_required(
    old_bits: CompactTarget,
    actual_timespan: i64,
    target_timespan: u32,
    pow_limit: Hash256,
) -> CompactTarget {
    let lo = target_timespan as i64 / 4;
    let hi = target_timespan as i64 * 4;
    let clamped = actual_timespan.clamp(lo, hi).max(1);

    let mut mantissa: u64 = old_bits.mantissa() as u64;
    let mut size: i64 = old_bits.size() as i64;

    mantissa = ((mantissa as u128) * (clamped as u128) / (target_timespan as u128)) as u64;

    while mantissa > 0x007f_ffff {
        mantissa >>= 8;
        size += 1;
    }
    while mantissa < 0x8000 && size > 1 {
        mantissa <<= 8;
        size -= 1;
    }
    size = size.clamp(1, 32);

    let mut packed = ((size as u32) << 24) | (mantissa as u32 & 0x007f_ffff);
    if CompactTarget(packed).sign_bit_set() {
        mantissa >>= 8;
        size = (size + 1).clamp(1, 32);
        packed = ((size as u32) << 24) | (mantissa as u32 & 0x007f_ffff);
    }

    let candidate = CompactTarget(packed);
    if expand(candidate) > pow_limit {
        compact(pow_limit)
    } else {
        candidate
    }
}

/// Walk back from `last`, skipping consecutive min-difficulty blocks, to
/// recover the last "real" nBits — spec.md §8 invariant 5 / §4.C step 3.
fn last_real_nbits(
    params: &NetworkParams,
    last: &Arc<BlockIndex>,
    min_difficulty_compact: CompactTarget,
) -> CompactTarget {
    let mut cur = last.clone();
    loop {
        let at_interval = cur.height % params.difficulty_adjustment_interval() == 0;
        if cur.n_bits != min_difficulty_compact || at_interval {
            return cur.n_bits;
        }
        match &cur.prev {
            Some(prev) => cur = prev.clone(),
            None => return cur.n_bits,
        }
    }
}

impl NetworkParams {
    /// Number of blocks between retargets, derived from the timespan and
    /// spacing (spec.md §4.C: `W = DifficultyAdjustmentInterval`).
    pub fn difficulty_adjustment_interval(&self) -> u64 {
        (self.target_timespan / self.target_spacing) as u64
    }
}

/// `GetNextWorkRequired`: the full retarget decision for the block after
/// `last`. `proposed_time` is the candidate next block's timestamp, used
/// only for the min-difficulty-exception check in step 3.
pub fn get_next_work_required(
    params: &NetworkParams,
    last: Option<&Arc<BlockIndex>>,
    proposed_time: Option<u32>,
) -> CompactTarget {
    let pow_limit = Hash256::from_bytes(params.pow_limit);
    let min_difficulty_compact = compact(pow_limit);

    let last = match last {
        Some(l) => l,
        None => return min_difficulty_compact,
    };

    if params.no_retargeting {
        return last.n_bits;
    }

    let w = params.difficulty_adjustment_interval();
    let next_height = last.height + 1;

    if next_height % w != 0 {
        if params.allow_min_difficulty_blocks {
            if let Some(t) = proposed_time {
                if t as i64 > last.time as i64 + 2 * params.target_spacing as i64 {
                    return min_difficulty_compact;
                }
            }
            return last_real_nbits(params, last, min_difficulty_compact);
        }
        return last.n_bits;
    }

    let first_height = last.height.saturating_sub(w - 1);
    let first = BlockIndex::ancestor(last, first_height).unwrap_or_else(|| last.clone());

    let actual_timespan = last.time as i64 - first.time as i64;
    calculate_next_work_required(
        last.n_bits,
        actual_timespan,
        params.target_timespan,
        pow_limit,
    )
}

/// `CheckProofOfWork`: reject a zero/out-of-range target, then compare the
/// hash against the expanded target in unsigned little-endian order.
pub fn check_proof_of_work(block_hash: Hash256, n_bits: CompactTarget, pow_limit: Hash256) -> bool {
    if n_bits.0 == 0 {
        return false;
    }
    let target = expand(n_bits);
    if target.is_zero() || target > pow_limit {
        return false;
    }
    block_hash < target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> NetworkParams {
        let mut p = NetworkParams::mainnet();
        p.target_spacing = 600;
        p.target_timespan = 600 * 2016; // W = 2016 blocks
        p
    }

    #[test]
    fn genesis_returns_pow_limit() {
        let p = test_params();
        let bits = get_next_work_required(&p, None, None);
        assert_eq!(bits, compact(Hash256::from_bytes(p.pow_limit)));
    }

    #[test]
    fn no_retargeting_keeps_previous_bits() {
        let mut p = test_params();
        p.no_retargeting = true;
        let genesis = BlockIndex::genesis(0, CompactTarget::new(0x1d00ffff));
        let next = get_next_work_required(&p, Some(&genesis), Some(600));
        assert_eq!(next, genesis.n_bits);
    }

    #[test]
    fn non_interval_block_keeps_previous_bits() {
        let p = test_params();
        let genesis = BlockIndex::genesis(0, CompactTarget::new(0x1d00ffff));
        let block1 = BlockIndex::next(&genesis, 600, genesis.n_bits);
        let next = get_next_work_required(&p, Some(&block1), Some(1200));
        assert_eq!(next, block1.n_bits);
    }

    #[test]
    fn min_difficulty_block_on_testnet_style_gap() {
        let mut p = test_params();
        p.allow_min_difficulty_blocks = true;
        let genesis = BlockIndex::genesis(0, CompactTarget::new(0x1d00ffff));
        // time gap > 2x spacing
        let proposed_time = genesis.time + 2 * p.target_spacing + 1;
        let next = get_next_work_required(&p, Some(&genesis), Some(proposed_time));
        assert_eq!(next, compact(Hash256::from_bytes(p.pow_limit)));
    }

    #[test]
    fn min_difficulty_reentry_recovers_real_bits() {
        let mut p = test_params();
        p.allow_min_difficulty_blocks = true;
        let real_bits = CompactTarget::new(0x1c00ffff);
        let genesis = BlockIndex::genesis(0, real_bits);
        let min_bits = compact(Hash256::from_bytes(p.pow_limit));
        // Block 1 is a min-difficulty exception block.
        let gap_time = genesis.time + 2 * p.target_spacing + 1;
        let min_block = BlockIndex::next(&genesis, gap_time, min_bits);

        // Block 2 arrives on time (no new gap); it should inherit the
        // *real* nBits from genesis, not the min-difficulty exception.
        let next = get_next_work_required(
            &p,
            Some(&min_block),
            Some(min_block.time + p.target_spacing),
        );
        assert_eq!(next, real_bits);
    }

    #[test]
    fn retarget_doubles_difficulty_when_blocks_too_fast() {
        let p = test_params();
        let w = p.difficulty_adjustment_interval();
        let old_bits = CompactTarget::new(0x1d00ffff);
        // Blocks came in at half the target spacing -> timespan halved,
        // clamped at T/4 at most, so target shrinks (harder difficulty).
        let actual_timespan = p.target_timespan as i64 / 4;
        let next = calculate_next_work_required(
            old_bits,
            actual_timespan,
            p.target_timespan,
            Hash256::from_bytes(p.pow_limit),
        );
        assert!(expand(next) < expand(old_bits));
        let _ = w;
    }

    #[test]
    fn retarget_never_exceeds_pow_limit() {
        let p = test_params();
        let old_bits = compact(Hash256::from_bytes(p.pow_limit));
        let next = calculate_next_work_required(
            old_bits,
            p.target_timespan as i64 * 4,
            p.target_timespan,
            Hash256::from_bytes(p.pow_limit),
        );
        assert!(expand(next) <= Hash256::from_bytes(p.pow_limit));
    }

    #[test]
    fn check_pow_rejects_zero_bits() {
        let p = test_params();
        assert!(!check_proof_of_work(
            Hash256::ZERO,
            CompactTarget::new(0),
            Hash256::from_bytes(p.pow_limit)
        ));
    }

    #[test]
    fn check_pow_accepts_hash_below_target() {
        let p = test_params();
        let bits = compact(Hash256::from_bytes(p.pow_limit));
        let low_hash = Hash256::ZERO;
        assert!(check_proof_of_work(
            low_hash,
            bits,
            Hash256::from_bytes(p.pow_limit)
        ));
    }
}
