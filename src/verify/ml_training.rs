//! ML-training verifier (spec.md §4.E, Component E).
//!
//! Result bytes are interpreted as serialized model weights (float32 or
//! float64, little-endian).

use crate::types::Hash256;
use crate::verify::problem::{
    CheckResult, Problem, ProblemType, Solution, VerificationDetails,
};
use crate::verify::{quick_validate_common, IVerifier};

const MAX_MAGNITUDE: f32 = 1000.0;
const MAX_ITERATIONS: u64 = 1_000_000_000;
const MIB: usize = 1024 * 1024;

fn has_nan_or_inf(result: &[u8]) -> bool {
    if result.len() % 4 != 0 {
        return false;
    }
    result.chunks_exact(4).any(|chunk| {
        let bits = u32::from_le_bytes(chunk.try_into().unwrap());
        (bits >> 23) & 0xFF == 0xFF
    })
}

fn magnitudes_in_bounds(result: &[u8]) -> bool {
    if result.len() % 4 != 0 {
        return true;
    }
    result.chunks_exact(4).all(|chunk| {
        let v = f32::from_le_bytes(chunk.try_into().unwrap());
        v.abs() <= MAX_MAGNITUDE
    })
}

/// Fold the intermediate hash chain from a zero seed and check it shares a
/// leading byte with the result hash (anti-triviality check).
fn hash_chain_matches(intermediates: &[Hash256], result_hash: &Hash256) -> bool {
    if intermediates.is_empty() {
        return false;
    }
    let mut chain = Hash256::ZERO;
    for h in intermediates {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(chain.as_bytes());
        buf.extend_from_slice(h.as_bytes());
        chain = Hash256::sha256(&buf);
    }
    chain.as_bytes()[0] == result_hash.as_bytes()[0]
}

/// Combine `SHA256(weights)` and `SHA256(verificationData)` into a
/// deterministic "derived" accuracy in `[0, 1]`.
fn derived_accuracy(weights: &[u8], verification_data: &[u8]) -> f64 {
    let h1 = Hash256::sha256(weights);
    let h2 = Hash256::sha256(verification_data);
    let mut combined = Vec::with_capacity(64);
    combined.extend_from_slice(h1.as_bytes());
    combined.extend_from_slice(h2.as_bytes());
    let folded = Hash256::sha256(&combined);
    let prefix = u32::from_le_bytes(folded.as_bytes()[0..4].try_into().unwrap());
    prefix as f64 / u32::MAX as f64
}

pub struct MlTrainingVerifier;

impl IVerifier for MlTrainingVerifier {
    fn get_type(&self) -> ProblemType {
        ProblemType::MlTraining
    }

    fn quick_validate(&self, problem: &Problem, solution: &Solution) -> bool {
        quick_validate_common(problem, solution, ProblemType::MlTraining)
    }

    fn verify(&self, problem: &Problem, solution: &Solution) -> VerificationDetails {
        let start = std::time::Instant::now();
        let result = &solution.data.result;
        let mut checks = Vec::new();

        checks.push(CheckResult {
            name: "length_multiple_of_word",
            passed: result.len() % 4 == 0 || result.len() % 8 == 0,
        });
        checks.push(CheckResult {
            name: "no_nan_or_inf",
            passed: !has_nan_or_inf(result),
        });
        checks.push(CheckResult {
            name: "magnitudes_bounded",
            passed: magnitudes_in_bounds(result),
        });
        checks.push(CheckResult {
            name: "iteration_count_in_range",
            passed: solution.data.iteration_count > 0
                && solution.data.iteration_count < MAX_ITERATIONS,
        });

        let input_size = problem.spec.len();
        let max_size = (100 * input_size).max(10 * MIB);
        checks.push(CheckResult {
            name: "result_size_in_range",
            passed: !result.is_empty() && result.len() <= max_size,
        });

        checks.push(CheckResult {
            name: "hash_chain_anti_triviality",
            passed: hash_chain_matches(&solution.data.intermediate_hashes, &solution.data.result_hash),
        });

        let derived = derived_accuracy(result, &problem.verification_data);
        let reported = solution.data.reported_accuracy;
        let accuracy_used = if (reported - derived).abs() <= 0.10 {
            reported
        } else {
            derived.min(0.95)
        };
        let score = (accuracy_used.clamp(0.0, 1.0) * 1_000_000.0) as u32;

        VerificationDetails::from_checks(checks, score, 0, start.elapsed().as_millis() as u64)
    }

    fn estimate_verification_time(&self, problem: &Problem) -> u64 {
        (problem.spec.len() as u64 / 4096).max(5)
    }
}
