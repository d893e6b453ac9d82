//! Claim generation and transaction-output construction (spec.md §4.I,
//! Component I).
//!
//! `UBITransactionBuilder::build_claim_outputs` constructs a `bitcoin::TxOut`
//! with a P2PKH `ScriptBuf` for `claim.recipient`, the same
//! `bitcoin`-crate script-building idiom the teacher uses in
//! `taproot.rs::generate_deposit_address` (there building a taproot output
//! key; here a plain `ScriptBuf::new_p2pkh`). P2PKH-only is a known
//! simplification — witness-program upgrades are a transaction-format
//! layer concern outside this crate (spec.md §9 Design Notes).

use bitcoin::hashes::Hash as BitcoinHash;
use bitcoin::{Amount as BtcAmount, PubkeyHash, ScriptBuf, TxOut};
use thiserror::Error;

use crate::types::{Amount, Hash160, Hash256};
use crate::ubi::claim::{ClaimStatus, Nullifier, UBIClaim};
use crate::ubi::identity::{IdentitySecrets, MerkleProof, ProofType, ZKProof, ZkProver};

/// Errors building claim outputs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuilderError {
    #[error("claim amount must be positive to build an output, got {0}")]
    NonPositiveAmount(i64),
}

fn empty_proof() -> ZKProof {
    ZKProof {
        proof_type: ProofType::UbiClaim,
        public_inputs: vec![],
        proof_bytes: vec![],
    }
}

/// Assembles an unsubmitted `UBIClaim` from an identity's secrets and its
/// Merkle membership proof. Mirrors spec.md §4.I's `UBIClaim::Create`: the
/// identity root is folded from `secrets.commitment()` up `membership_proof`
/// internally (step 3), never supplied by the caller. An empty membership
/// proof or a prover failure never surfaces as an `Err` — per §4.I step 2 /
/// the §3 data model, it still produces a claim object, carrying the
/// no-proof-attempted sentinel status `InvalidProof`.
pub fn create_claim(
    zk_prover: &dyn ZkProver,
    secrets: &IdentitySecrets,
    membership_proof: &MerkleProof,
    epoch: u64,
    recipient: Hash160,
) -> UBIClaim {
    let nullifier = Nullifier {
        hash: secrets.nullifier_hash(epoch),
        epoch,
    };
    if membership_proof.is_empty() {
        return UBIClaim {
            epoch,
            nullifier,
            recipient,
            proof: empty_proof(),
            amount: Amount::ZERO,
            submit_height: 0,
            status: ClaimStatus::InvalidProof,
        };
    }
    let identity_root = membership_proof.compute_root(secrets.commitment());
    match zk_prover.generate_ubi_claim_proof(secrets, identity_root, membership_proof, epoch) {
        Ok(proof) => UBIClaim {
            epoch,
            nullifier,
            recipient,
            proof,
            amount: Amount::ZERO,
            submit_height: 0,
            status: ClaimStatus::Pending,
        },
        Err(_) => UBIClaim {
            epoch,
            nullifier,
            recipient,
            proof: empty_proof(),
            amount: Amount::ZERO,
            submit_height: 0,
            status: ClaimStatus::InvalidProof,
        },
    }
}

/// Builds the Bitcoin-side payout leg for a `Valid` claim.
pub struct UBITransactionBuilder;

impl UBITransactionBuilder {
    /// Build the single P2PKH `TxOut` paying `claim.amount` to
    /// `claim.recipient`. The caller is responsible for assembling this
    /// into a full transaction alongside any inputs/change.
    pub fn build_claim_outputs(claim: &UBIClaim) -> Result<TxOut, BuilderError> {
        if claim.amount.sats() <= 0 {
            return Err(BuilderError::NonPositiveAmount(claim.amount.sats()));
        }
        let pubkey_hash = PubkeyHash::from_byte_array(*claim.recipient.as_bytes());
        let script_pubkey = ScriptBuf::new_p2pkh(&pubkey_hash);
        Ok(TxOut {
            value: BtcAmount::from_sat(claim.amount.sats() as u64),
            script_pubkey,
        })
    }

    /// Verify a previously built output actually pays `claim.amount` to
    /// `claim.recipient` via a P2PKH script.
    pub fn verify_claim_outputs(claim: &UBIClaim, out: &TxOut) -> bool {
        let expected = match Self::build_claim_outputs(claim) {
            Ok(expected) => expected,
            Err(_) => return false,
        };
        out.value == expected.value && out.script_pubkey == expected.script_pubkey
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ubi::identity::ReferenceZkProver;

    fn secrets() -> IdentitySecrets {
        IdentitySecrets {
            secret_key: Hash256::sha256(b"sk"),
            nullifier_key: Hash256::sha256(b"nk"),
            trapdoor: Hash256::sha256(b"td"),
        }
    }

    #[test]
    fn create_claim_binds_nullifier_to_secrets_and_epoch() {
        let prover = ReferenceZkProver;
        let s = secrets();
        let proof_path = MerkleProof {
            siblings: vec![Hash256::sha256(b"sib")],
            path_bits: vec![false],
        };
        let claim = create_claim(&prover, &s, &proof_path, 7, Hash160::from_bytes([9u8; 20]));
        assert_eq!(claim.nullifier.hash, s.nullifier_hash(7));
        assert_eq!(claim.status, ClaimStatus::Pending);
    }

    #[test]
    fn create_claim_derives_root_from_commitment_and_path() {
        let prover = ReferenceZkProver;
        let s = secrets();
        let proof_path = MerkleProof {
            siblings: vec![Hash256::sha256(b"sib")],
            path_bits: vec![false],
        };
        let expected_root = proof_path.compute_root(s.commitment());
        let claim = create_claim(&prover, &s, &proof_path, 7, Hash160::from_bytes([9u8; 20]));
        assert_eq!(claim.proof.public_inputs[0], expected_root);
    }

    #[test]
    fn create_claim_returns_invalid_proof_status_on_empty_membership_proof() {
        let prover = ReferenceZkProver;
        let s = secrets();
        let empty = MerkleProof {
            siblings: vec![],
            path_bits: vec![],
        };
        let claim = create_claim(&prover, &s, &empty, 1, Hash160::from_bytes([0u8; 20]));
        assert_eq!(claim.status, ClaimStatus::InvalidProof);
        assert!(claim.proof.proof_bytes.is_empty());
    }

    fn funded_claim(amount_sats: i64) -> UBIClaim {
        let prover = ReferenceZkProver;
        let s = secrets();
        let proof_path = MerkleProof {
            siblings: vec![Hash256::sha256(b"sib")],
            path_bits: vec![false],
        };
        let mut claim = create_claim(&prover, &s, &proof_path, 3, Hash160::from_bytes([5u8; 20]));
        claim.amount = Amount::from_sats(amount_sats);
        claim.status = ClaimStatus::Valid;
        claim
    }

    #[test]
    fn build_claim_outputs_rejects_zero_amount() {
        let claim = funded_claim(0);
        let err = UBITransactionBuilder::build_claim_outputs(&claim).unwrap_err();
        assert_eq!(err, BuilderError::NonPositiveAmount(0));
    }

    #[test]
    fn build_and_verify_claim_outputs_roundtrip() {
        let claim = funded_claim(54_321);
        let out = UBITransactionBuilder::build_claim_outputs(&claim).unwrap();
        assert_eq!(out.value.to_sat(), 54_321);
        assert!(out.script_pubkey.is_p2pkh());
        assert!(UBITransactionBuilder::verify_claim_outputs(&claim, &out));
    }

    #[test]
    fn verify_claim_outputs_rejects_wrong_amount() {
        let claim = funded_claim(54_321);
        let mut out = UBITransactionBuilder::build_claim_outputs(&claim).unwrap();
        out.value = BtcAmount::from_sat(1);
        assert!(!UBITransactionBuilder::verify_claim_outputs(&claim, &out));
    }
}
