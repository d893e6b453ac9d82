//! `UBIClaim`, `ClaimStatus`, `Nullifier`, and the hand-rolled byte-exact
//! wire codec (spec.md §4.H / §6, Component H).
//!
//! Same hand-rolled codec style as the teacher's `BlockHeader::to_raw`/
//! `from_raw` and `TxMerkleProof` in `btc_spv.rs`: a fixed little-endian
//! byte layout, not a `serde`-derived one, since this format is a
//! consensus-critical wire contract rather than an internal data shape.

use thiserror::Error;

use crate::types::{Amount, Hash160, Hash256};
use crate::ubi::identity::ZKProof;

/// A nullifier is a 32-byte hash bound to the epoch it was spent in;
/// equality is over both fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nullifier {
    pub hash: Hash256,
    pub epoch: u64,
}

/// Terminal or in-flight status of a `UBIClaim`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClaimStatus {
    Pending = 0,
    Valid = 1,
    InvalidProof = 2,
    DoubleClaim = 3,
    IdentityNotFound = 4,
    EpochExpired = 5,
    EpochNotComplete = 6,
    PoolEmpty = 7,
}

impl ClaimStatus {
    pub fn from_byte(b: u8) -> Result<Self, ClaimError> {
        match b {
            0 => Ok(ClaimStatus::Pending),
            1 => Ok(ClaimStatus::Valid),
            2 => Ok(ClaimStatus::InvalidProof),
            3 => Ok(ClaimStatus::DoubleClaim),
            4 => Ok(ClaimStatus::IdentityNotFound),
            5 => Ok(ClaimStatus::EpochExpired),
            6 => Ok(ClaimStatus::EpochNotComplete),
            7 => Ok(ClaimStatus::PoolEmpty),
            other => Err(ClaimError::UnknownStatus(other)),
        }
    }
}

/// Claim wire/codec errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("claim bytes shorter than the 77-byte fixed header")]
    TooShort,

    #[error("declared proof size {declared} exceeds remaining bytes {remaining}")]
    ProofSizeOverflow { declared: u32, remaining: usize },

    #[error("unknown claim status byte {0}")]
    UnknownStatus(u8),
}

/// A submitted UBI claim.
#[derive(Debug, Clone, PartialEq)]
pub struct UBIClaim {
    pub epoch: u64,
    pub nullifier: Nullifier,
    pub recipient: Hash160,
    pub proof: ZKProof,
    pub amount: Amount,
    pub submit_height: i32,
    pub status: ClaimStatus,
}

impl UBIClaim {
    /// `Hash(claim) = SHA256(serialize(claim))`.
    pub fn hash(&self) -> Hash256 {
        Hash256::sha256(&self.serialize())
    }

    /// Canonical little-endian byte layout (spec.md §4.H).
    pub fn serialize(&self) -> Vec<u8> {
        let proof_bytes = encode_zk_proof(&self.proof);
        let mut out = Vec::with_capacity(81 + proof_bytes.len());
        out.extend_from_slice(&(self.epoch as u32).to_le_bytes());
        out.extend_from_slice(self.nullifier.hash.as_bytes());
        out.extend_from_slice(&self.nullifier.epoch.to_le_bytes());
        out.extend_from_slice(self.recipient.as_bytes());
        out.extend_from_slice(&self.submit_height.to_le_bytes());
        out.push(self.status as u8);
        out.extend_from_slice(&self.amount.sats().to_le_bytes());
        out.extend_from_slice(&(proof_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&proof_bytes);
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, ClaimError> {
        if bytes.len() < 81 {
            return Err(ClaimError::TooShort);
        }
        let epoch = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as u64;

        let mut hash_bytes = [0u8; 32];
        hash_bytes.copy_from_slice(&bytes[4..36]);
        let nullifier_epoch = u64::from_le_bytes(bytes[36..44].try_into().unwrap());

        let mut recipient_bytes = [0u8; 20];
        recipient_bytes.copy_from_slice(&bytes[44..64]);

        let submit_height = i32::from_le_bytes(bytes[64..68].try_into().unwrap());
        let status = ClaimStatus::from_byte(bytes[68])?;
        let amount = i64::from_le_bytes(bytes[69..77].try_into().unwrap());
        let proof_size = u32::from_le_bytes(bytes[77..81].try_into().unwrap());

        let remaining = bytes.len() - 81;
        if proof_size as usize > remaining {
            return Err(ClaimError::ProofSizeOverflow {
                declared: proof_size,
                remaining,
            });
        }
        let proof_bytes = &bytes[81..81 + proof_size as usize];
        let proof = decode_zk_proof(proof_bytes);

        Ok(UBIClaim {
            epoch,
            nullifier: Nullifier {
                hash: Hash256::from_bytes(hash_bytes),
                epoch: nullifier_epoch,
            },
            recipient: Hash160::from_bytes(recipient_bytes),
            proof,
            amount: Amount::from_sats(amount),
            submit_height,
            status,
        })
    }
}

/// Internal proof encoding used only inside the claim's opaque proof-bytes
/// region: `[type: u8][input_count: u32][inputs: 32 bytes each][proof data]`.
fn encode_zk_proof(proof: &ZKProof) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(match proof.proof_type {
        crate::ubi::identity::ProofType::UbiClaim => 0u8,
    });
    out.extend_from_slice(&(proof.public_inputs.len() as u32).to_le_bytes());
    for input in &proof.public_inputs {
        out.extend_from_slice(input.as_bytes());
    }
    out.extend_from_slice(&proof.proof_bytes);
    out
}

fn decode_zk_proof(bytes: &[u8]) -> ZKProof {
    if bytes.len() < 5 {
        return ZKProof {
            proof_type: crate::ubi::identity::ProofType::UbiClaim,
            public_inputs: vec![],
            proof_bytes: vec![],
        };
    }
    let proof_type = crate::ubi::identity::ProofType::UbiClaim;
    let count = u32::from_le_bytes(bytes[1..5].try_into().unwrap()) as usize;
    let mut public_inputs = Vec::with_capacity(count);
    let mut offset = 5;
    for _ in 0..count {
        if offset + 32 > bytes.len() {
            break;
        }
        let mut b = [0u8; 32];
        b.copy_from_slice(&bytes[offset..offset + 32]);
        public_inputs.push(Hash256::from_bytes(b));
        offset += 32;
    }
    let proof_bytes = bytes.get(offset..).unwrap_or(&[]).to_vec();
    ZKProof {
        proof_type,
        public_inputs,
        proof_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ubi::identity::ProofType;

    fn sample_claim() -> UBIClaim {
        UBIClaim {
            epoch: 42,
            nullifier: Nullifier {
                hash: Hash256::sha256(b"nullifier"),
                epoch: 42,
            },
            recipient: Hash160::from_bytes([7u8; 20]),
            proof: ZKProof {
                proof_type: ProofType::UbiClaim,
                public_inputs: vec![Hash256::sha256(b"root"), Hash256::sha256(b"null"), Hash256::sha256(b"epoch")],
                proof_bytes: vec![1, 2, 3, 4, 5],
            },
            amount: Amount::from_sats(12_345),
            submit_height: 100,
            status: ClaimStatus::Pending,
        }
    }

    #[test]
    fn claim_serialization_roundtrip() {
        let claim = sample_claim();
        let bytes = claim.serialize();
        let back = UBIClaim::deserialize(&bytes).unwrap();
        assert_eq!(claim, back);
    }

    #[test]
    fn rejects_too_short_input() {
        let err = UBIClaim::deserialize(&[0u8; 50]).unwrap_err();
        assert_eq!(err, ClaimError::TooShort);
    }

    #[test]
    fn rejects_proof_size_overflow() {
        let claim = sample_claim();
        let mut bytes = claim.serialize();
        // Corrupt the proofSize field to claim more bytes than remain.
        let huge = 10_000_000u32.to_le_bytes();
        bytes[77..81].copy_from_slice(&huge);
        let err = UBIClaim::deserialize(&bytes).unwrap_err();
        assert!(matches!(err, ClaimError::ProofSizeOverflow { .. }));
    }

    #[test]
    fn hash_changes_with_content() {
        let claim_a = sample_claim();
        let mut claim_b = sample_claim();
        claim_b.amount = Amount::from_sats(99);
        assert_ne!(claim_a.hash(), claim_b.hash());
    }

    #[test]
    fn status_byte_roundtrip() {
        for b in 0u8..=7 {
            let status = ClaimStatus::from_byte(b).unwrap();
            assert_eq!(status as u8, b);
        }
        assert!(ClaimStatus::from_byte(8).is_err());
    }
}
