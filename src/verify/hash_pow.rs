//! Hash-PoW verifier (spec.md §4.E, Component E).

use crate::types::Hash256;
use crate::verify::problem::{
    CheckResult, Problem, ProblemType, Solution, VerificationDetails,
};
use crate::verify::{quick_validate_common, IVerifier};

/// First 8 (most significant) bytes of a little-endian 256-bit value, as a
/// `u64`, used for the hash-PoW score ratio.
fn high_u64(h: &Hash256) -> u64 {
    u64::from_le_bytes(h.as_bytes()[24..32].try_into().unwrap())
}

pub struct HashPowVerifier;

impl IVerifier for HashPowVerifier {
    fn get_type(&self) -> ProblemType {
        ProblemType::HashPow
    }

    fn quick_validate(&self, problem: &Problem, solution: &Solution) -> bool {
        if !quick_validate_common(problem, solution, ProblemType::HashPow) {
            return false;
        }
        problem.spec.len() >= 32
    }

    fn verify(&self, problem: &Problem, solution: &Solution) -> VerificationDetails {
        let start = std::time::Instant::now();
        let mut checks = Vec::new();

        let target = if problem.spec.len() >= 32 {
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(&problem.spec[..32]);
            Some(Hash256::from_bytes(bytes))
        } else {
            None
        };
        checks.push(CheckResult {
            name: "target_present",
            passed: target.is_some(),
        });

        let computed_hash = Hash256::sha256(&solution.data.result);
        let hash_matches = computed_hash == solution.data.result_hash;
        checks.push(CheckResult {
            name: "result_hash_matches",
            passed: hash_matches,
        });

        let below_target = target
            .map(|t| computed_hash < t)
            .unwrap_or(false);
        checks.push(CheckResult {
            name: "hash_below_target",
            passed: below_target,
        });

        let score = match target {
            Some(t) => {
                let target_prefix = high_u64(&t);
                let hash_prefix = high_u64(&computed_hash);
                if target_prefix == 0 {
                    0
                } else {
                    let diff = target_prefix.saturating_sub(hash_prefix);
                    let ratio = (diff as u128 * 1_000_000u128) / target_prefix as u128;
                    ratio.min(1_000_000) as u32
                }
            }
            None => 0,
        };

        VerificationDetails::from_checks(checks, score, 0, start.elapsed().as_millis() as u64)
    }

    fn estimate_verification_time(&self, _problem: &Problem) -> u64 {
        1
    }
}
