//! Problem/Solution data model for the verifier registry (spec.md §3,
//! Component E).

use serde::{Deserialize, Serialize};

use crate::types::Hash256;

/// The class of useful-work problem a solution claims to solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    HashPow,
    MlTraining,
    LinearAlgebra,
    Generic,
}

/// A useful-work problem statement.
#[derive(Debug, Clone)]
pub struct Problem {
    pub id: String,
    pub problem_type: ProblemType,
    /// Opaque problem-specific input bytes (e.g. a hash-PoW target, or
    /// matrix dimensions for the linear-algebra verifier).
    pub spec: Vec<u8>,
    /// Opaque verification data (e.g. an ML verifier's held-out batch).
    pub verification_data: Vec<u8>,
    pub hash: Hash256,
}

/// The payload portion of a submitted solution.
#[derive(Debug, Clone)]
pub struct SolutionData {
    pub result: Vec<u8>,
    pub result_hash: Hash256,
    /// Chained intermediate hashes (`chain_i = SHA256(chain_{i-1} ||
    /// intermediate_i)`), used by the ML-training verifier's
    /// anti-triviality check.
    pub intermediate_hashes: Vec<Hash256>,
    pub iteration_count: u64,
    pub reported_accuracy: f64,
}

/// A submitted solution, bound to a problem by `problem_id`/`problem_type`.
#[derive(Debug, Clone)]
pub struct Solution {
    pub id: String,
    pub problem_id: String,
    pub problem_type: ProblemType,
    pub solver_id: String,
    pub data: SolutionData,
}

/// Outcome of a single named check inside `Verify`.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
}

/// Overall verdict for `Verify` (spec.md §6/§7). `Valid`/`Invalid` come out
/// of a verifier's own named checks; the remaining five are classification
/// outcomes the dispatch layer produces before a verifier ever runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationResult {
    Valid,
    Invalid,
    ProblemNotFound,
    Malformed,
    TypeMismatch,
    Timeout,
    Error,
}

/// Full result of a `Verify` call.
#[derive(Debug, Clone)]
pub struct VerificationDetails {
    pub result: VerificationResult,
    /// In `[0, 1_000_000]`.
    pub score: u32,
    pub meets_requirements: bool,
    pub elapsed_ms: u64,
    pub checks: Vec<CheckResult>,
}

impl VerificationDetails {
    /// Fold a set of named checks into an overall `VALID` iff all passed.
    pub fn from_checks(checks: Vec<CheckResult>, score: u32, score_floor: u32, elapsed_ms: u64) -> Self {
        let all_passed = checks.iter().all(|c| c.passed);
        let result = if all_passed {
            VerificationResult::Valid
        } else {
            VerificationResult::Invalid
        };
        VerificationDetails {
            result,
            score,
            meets_requirements: all_passed && score >= score_floor,
            elapsed_ms,
            checks,
        }
    }

    /// A classification outcome reached without running any verifier (e.g.
    /// `TYPE_MISMATCH` for an unregistered problem type, spec.md §7).
    pub fn terminal(result: VerificationResult, elapsed_ms: u64) -> Self {
        VerificationDetails {
            result,
            score: 0,
            meets_requirements: false,
            elapsed_ms,
            checks: vec![],
        }
    }
}
