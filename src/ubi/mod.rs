//! Privacy-preserving UBI distribution (spec.md §4.F–§4.I, Components
//! F–I): per-epoch pools, nullifier-based anti-double-claim, ZK
//! identity-membership claims, and the distributor coordinating all three.

pub mod builder;
pub mod claim;
pub mod distributor;
pub mod identity;
pub mod pool;

pub use builder::{create_claim, BuilderError, UBITransactionBuilder};
pub use claim::{ClaimError, ClaimStatus, Nullifier, UBIClaim};
pub use distributor::{EpochStats, PoolError, UBIDistributor};
pub use identity::{
    poseidon_hash, IdentityOracle, IdentitySecrets, MerkleProof, ProofType, ReferenceZkProver,
    ZKProof, ZkProver, ZkProverError, IDENTITY_TREE_DEPTH,
};
pub use pool::EpochUBIPool;
