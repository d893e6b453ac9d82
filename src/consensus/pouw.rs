//! PoUW commitment extraction & validation, and standalone useful-work
//! solution verification (spec.md §4.D / §4.D′, Component D).
//!
//! Extraction is written against `bitcoin::Transaction`/`bitcoin::ScriptBuf`
//! the same way the teacher's `taproot.rs` builds scripts with
//! `bitcoin::opcodes::all::*` — here we scan raw script bytes rather than
//! build them, since the magic-plus-payload commitment format isn't a
//! standard Bitcoin script template.

use bitcoin::Transaction;
use thiserror::Error;

use crate::types::Hash256;

/// 4-byte magic prefix for a PoUW commitment: `b"SHRW"`.
pub const COMMITMENT_MAGIC: [u8; 4] = [0x53, 0x48, 0x52, 0x57];

const OP_RETURN: u8 = 0x6a;

/// PoUW commitment/solution errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PouwError {
    #[error("block is missing a required PoUW commitment")]
    MissingCommitment,

    #[error("commitment is all-zero")]
    ZeroCommitment,

    #[error("commitment has fewer than 8 distinct byte transitions")]
    InsufficientEntropy,

    #[error("commitment is identical to the previous block hash")]
    EqualsPrevHash,

    #[error("commitment is trivially (un)related to the previous block hash")]
    TrivialChainBinding,

    #[error("solution must be at least 32 bytes")]
    SolutionTooShort,

    #[error("solution is all-zero")]
    SolutionAllZero,

    #[error("difficulty 0 is misconfigured")]
    ZeroDifficulty,
}

/// Scan `bytes` for the first occurrence of the magic followed by at least
/// 32 more bytes, returning the 32-byte payload immediately after the magic.
fn scan_for_commitment(bytes: &[u8]) -> Option<Hash256> {
    if bytes.len() < COMMITMENT_MAGIC.len() + 32 {
        return None;
    }
    let last_start = bytes.len() - COMMITMENT_MAGIC.len() - 32;
    for i in 0..=last_start {
        if bytes[i..i + 4] == COMMITMENT_MAGIC {
            let mut payload = [0u8; 32];
            payload.copy_from_slice(&bytes[i + 4..i + 4 + 32]);
            return Some(Hash256::from_bytes(payload));
        }
    }
    None
}

/// Scan a coinbase output's scriptPubKey for `OP_RETURN`, optionally
/// followed by a push opcode `<= 75`, then the magic and payload.
fn scan_output_for_commitment(script_bytes: &[u8]) -> Option<Hash256> {
    for i in 0..script_bytes.len() {
        if script_bytes[i] != OP_RETURN {
            continue;
        }
        // Try immediately after OP_RETURN.
        if let Some(c) = scan_for_commitment(&script_bytes[i + 1..]) {
            // Only accept a match that starts right at i+1 (the immediate
            // occurrence), since scan_for_commitment searches forward and
            // an unrelated later magic in the same script shouldn't be
            // attributed to this OP_RETURN.
            if script_bytes[i + 1..].starts_with(&COMMITMENT_MAGIC) {
                return Some(c);
            }
        }
        // Try after a single push-length byte <= 75.
        if i + 1 < script_bytes.len() {
            let push_len = script_bytes[i + 1];
            if push_len <= 75 && i + 2 <= script_bytes.len() {
                let rest = &script_bytes[i + 2..];
                if rest.starts_with(&COMMITMENT_MAGIC) {
                    if let Some(c) = scan_for_commitment(rest) {
                        return Some(c);
                    }
                }
            }
        }
    }
    None
}

/// Locate the PoUW commitment inside a coinbase transaction.
///
/// Scans the first input's scriptSig, then every output's scriptPubKey, in
/// that order; the first occurrence wins (spec.md §4.D).
pub fn extract_commitment(coinbase: &Transaction) -> Option<Hash256> {
    if let Some(first_input) = coinbase.input.first() {
        let script_sig_bytes = first_input.script_sig.as_bytes();
        if let Some(c) = scan_for_commitment(script_sig_bytes) {
            return Some(c);
        }
    }
    for out in &coinbase.output {
        let script_bytes = out.script_pubkey.as_bytes();
        if let Some(c) = scan_output_for_commitment(script_bytes) {
            return Some(c);
        }
    }
    None
}

/// Validate a block's (already-extracted) commitment against the previous
/// block hash, per spec.md §4.D's pre-marketplace rules.
///
/// `is_genesis` exempts the genesis block (empty prev-hash). A `None`
/// commitment is valid only when `pouw_optional` is set.
pub fn validate_commitment(
    commitment: Option<Hash256>,
    prev_hash: Hash256,
    is_genesis: bool,
    pouw_optional: bool,
) -> Result<(), PouwError> {
    if is_genesis {
        return Ok(());
    }

    let commitment = match commitment {
        Some(c) => c,
        None => {
            return if pouw_optional {
                Ok(())
            } else {
                Err(PouwError::MissingCommitment)
            }
        }
    };

    if commitment.is_zero() {
        return Err(PouwError::ZeroCommitment);
    }
    if commitment.transition_count() < 8 {
        return Err(PouwError::InsufficientEntropy);
    }
    if commitment == prev_hash {
        return Err(PouwError::EqualsPrevHash);
    }

    let c_prefix = u32::from_le_bytes(commitment.as_bytes()[0..4].try_into().unwrap());
    let p_prefix = u32::from_le_bytes(prev_hash.as_bytes()[0..4].try_into().unwrap());
    let xor = c_prefix ^ p_prefix;
    if xor == 0 || xor == 0xFFFF_FFFF {
        return Err(PouwError::TrivialChainBinding);
    }

    Ok(())
}

/// `VerifyPoUWSolution(problemHash, solution, difficulty)` (spec.md §4.D′):
/// an independent check used by workers/auditors, unrelated to the
/// commitment format above.
pub fn verify_pouw_solution(
    problem_hash: &Hash256,
    solution: &[u8],
    difficulty: u32,
) -> Result<bool, PouwError> {
    if difficulty == 0 {
        return Err(PouwError::ZeroDifficulty);
    }
    if solution.len() < 32 {
        return Err(PouwError::SolutionTooShort);
    }
    if solution.iter().all(|&b| b == 0) {
        return Err(PouwError::SolutionAllZero);
    }

    let mut preimage = Vec::with_capacity(32 + solution.len());
    preimage.extend_from_slice(problem_hash.as_bytes());
    preimage.extend_from_slice(solution);
    let h = Hash256::sha256(&preimage);

    Ok(leading_zero_bits(h.as_bytes()) >= difficulty)
}

fn leading_zero_bits(bytes: &[u8]) -> u32 {
    let mut count = 0u32;
    for &b in bytes {
        if b == 0 {
            count += 8;
            continue;
        }
        count += b.leading_zeros();
        break;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::blockdata::script::ScriptBuf;
    use bitcoin::{absolute::LockTime, OutPoint, Sequence, TxIn, TxOut, Witness};

    fn coinbase_with_script_sig(bytes: &[u8]) -> Transaction {
        Transaction {
            version: bitcoin::transaction::Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::from_bytes(bytes.to_vec()),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![],
        }
    }

    fn coinbase_with_output_script(bytes: &[u8]) -> Transaction {
        Transaction {
            version: bitcoin::transaction::Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: bitcoin::Amount::ZERO,
                script_pubkey: ScriptBuf::from_bytes(bytes.to_vec()),
            }],
        }
    }

    fn commitment_bytes(payload: [u8; 32]) -> Vec<u8> {
        let mut v = COMMITMENT_MAGIC.to_vec();
        v.extend_from_slice(&payload);
        v
    }

    #[test]
    fn extracts_commitment_from_script_sig() {
        let mut payload = [0u8; 32];
        for (i, b) in payload.iter_mut().enumerate() {
            *b = i as u8;
        }
        let mut sig = vec![0x00, 0x01, 0x02];
        sig.extend(commitment_bytes(payload));
        let tx = coinbase_with_script_sig(&sig);
        assert_eq!(extract_commitment(&tx), Some(Hash256::from_bytes(payload)));
    }

    #[test]
    fn extracts_commitment_from_op_return_output() {
        let mut payload = [0u8; 32];
        payload[0] = 0xaa;
        let mut script = vec![OP_RETURN];
        script.extend(commitment_bytes(payload));
        let tx = coinbase_with_output_script(&script);
        assert_eq!(extract_commitment(&tx), Some(Hash256::from_bytes(payload)));
    }

    #[test]
    fn extracts_commitment_from_op_return_with_push_byte() {
        let mut payload = [0u8; 32];
        payload[1] = 0xbb;
        let mut script = vec![OP_RETURN, 36]; // push length <= 75
        script.extend(commitment_bytes(payload));
        let tx = coinbase_with_output_script(&script);
        assert_eq!(extract_commitment(&tx), Some(Hash256::from_bytes(payload)));
    }

    #[test]
    fn no_commitment_returns_none() {
        let tx = coinbase_with_script_sig(&[0x00, 0x01, 0x02]);
        assert_eq!(extract_commitment(&tx), None);
    }

    #[test]
    fn genesis_is_exempt() {
        assert_eq!(
            validate_commitment(None, Hash256::ZERO, true, false),
            Ok(())
        );
    }

    #[test]
    fn missing_commitment_rejected_unless_optional() {
        let prev = Hash256::sha256(b"prev");
        assert_eq!(
            validate_commitment(None, prev, false, false),
            Err(PouwError::MissingCommitment)
        );
        assert_eq!(validate_commitment(None, prev, false, true), Ok(()));
    }

    #[test]
    fn zero_commitment_rejected() {
        let prev = Hash256::sha256(b"prev");
        assert_eq!(
            validate_commitment(Some(Hash256::ZERO), prev, false, false),
            Err(PouwError::ZeroCommitment)
        );
    }

    #[test]
    fn low_entropy_commitment_rejected() {
        let prev = Hash256::sha256(b"prev");
        let flat = Hash256::from_bytes([0x41u8; 32]);
        assert_eq!(
            validate_commitment(Some(flat), prev, false, false),
            Err(PouwError::InsufficientEntropy)
        );
    }

    #[test]
    fn commitment_equal_to_prev_hash_rejected() {
        let prev = Hash256::sha256(b"prev-block");
        assert_eq!(
            validate_commitment(Some(prev), prev, false, false),
            Err(PouwError::EqualsPrevHash)
        );
    }

    #[test]
    fn s6_scenario_valid_commitment_accepted() {
        let prev = Hash256::sha256(b"prev-block");
        let mut payload = *prev.as_bytes();
        // flip enough bits to get >= 8 transitions and a non-trivial XOR,
        // while keeping it different from prev_hash.
        for (i, b) in payload.iter_mut().enumerate() {
            *b ^= (i as u8).wrapping_mul(37).wrapping_add(1);
        }
        let commitment = Hash256::from_bytes(payload);
        assert_ne!(commitment, prev);
        assert!(validate_commitment(Some(commitment), prev, false, false).is_ok());
    }

    #[test]
    fn verify_solution_rejects_zero_difficulty() {
        let problem = Hash256::sha256(b"problem");
        let solution = [1u8; 32];
        assert_eq!(
            verify_pouw_solution(&problem, &solution, 0),
            Err(PouwError::ZeroDifficulty)
        );
    }

    #[test]
    fn verify_solution_rejects_short_solution() {
        let problem = Hash256::sha256(b"problem");
        assert_eq!(
            verify_pouw_solution(&problem, &[1u8; 16], 1),
            Err(PouwError::SolutionTooShort)
        );
    }

    #[test]
    fn verify_solution_rejects_all_zero_solution() {
        let problem = Hash256::sha256(b"problem");
        assert_eq!(
            verify_pouw_solution(&problem, &[0u8; 32], 1),
            Err(PouwError::SolutionAllZero)
        );
    }

    #[test]
    fn verify_solution_monotone_in_difficulty() {
        // Invariant 11: a solution valid at difficulty d is valid at all
        // 0 < d' <= d.
        let problem = Hash256::sha256(b"monotone-problem");
        let mut found = None;
        for nonce in 0u64..10_000 {
            let mut solution = [0u8; 32];
            solution[..8].copy_from_slice(&nonce.to_le_bytes());
            solution[8] = 1;
            if let Ok(true) = verify_pouw_solution(&problem, &solution, 8) {
                found = Some(solution);
                break;
            }
        }
        let solution = found.expect("should find a solution clearing 8 bits within 10000 tries");
        for d in 1..=8u32 {
            assert_eq!(
                verify_pouw_solution(&problem, &solution, d),
                Ok(true),
                "failed monotonicity at difficulty {d}"
            );
        }
    }
}
