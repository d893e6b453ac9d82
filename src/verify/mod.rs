//! Solution verification registry (spec.md §4.E, Component E).
//!
//! `IVerifier` is a plain synchronous trait — `Verify`/`QuickValidate` are
//! CPU-bound and §5 requires them freely callable from any thread with no
//! lock held while running. `SolutionVerifier`'s async submission path runs
//! the verifier body inside `tokio::task::spawn_blocking`, the same pattern
//! the teacher uses to keep CPU-bound work off the async executor
//! (`deposit_tracker/service.rs`'s `process_cycle` polling loop, adapted
//! here to a bounded-concurrency submission model instead of a fixed poll).

pub mod generic;
pub mod hash_pow;
pub mod linear_algebra;
pub mod ml_training;
pub mod problem;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::logging::log_verification_event;
use problem::{Problem, ProblemType, Solution, VerificationDetails, VerificationResult};

/// Verifier registry / submission errors.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("no verifier registered for problem type {0:?}")]
    UnknownProblemType(ProblemType),

    #[error("verification queue is at capacity")]
    QueueFull,

    #[error("solution is not bound to the given problem")]
    SolutionMismatch,

    #[error("verification task panicked: {0}")]
    TaskPanicked(String),
}

/// Capability set every problem-type-specific verifier implements.
pub trait IVerifier: Send + Sync {
    fn get_type(&self) -> ProblemType;
    fn quick_validate(&self, problem: &Problem, solution: &Solution) -> bool;
    fn verify(&self, problem: &Problem, solution: &Solution) -> VerificationDetails;
    fn estimate_verification_time(&self, problem: &Problem) -> u64;
}

/// Checks every verifier's `QuickValidate` must perform: matching problem
/// type on both problem and solution, a non-empty result, and a bound
/// problem id (spec.md §4.E).
pub fn quick_validate_common(problem: &Problem, solution: &Solution, expected: ProblemType) -> bool {
    if problem.problem_type != expected || solution.problem_type != expected {
        return false;
    }
    if solution.data.result.is_empty() {
        return false;
    }
    solution.problem_id == problem.id
}

/// Process-wide mapping from `ProblemType` to its verifier.
///
/// `get_verifier` returns a shared, immutable handle; registration replaces
/// wholesale, it never mutates a verifier in place (spec.md §5).
pub struct VerifierRegistry {
    verifiers: Mutex<HashMap<ProblemType, Arc<dyn IVerifier>>>,
}

impl VerifierRegistry {
    pub fn new() -> Self {
        VerifierRegistry {
            verifiers: Mutex::new(HashMap::new()),
        }
    }

    /// A registry pre-populated with the four verifiers this crate ships.
    pub fn with_default_verifiers() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(hash_pow::HashPowVerifier));
        registry.register(Arc::new(ml_training::MlTrainingVerifier));
        registry.register(Arc::new(linear_algebra::LinearAlgebraVerifier));
        registry.register(Arc::new(generic::GenericVerifier));
        registry
    }

    pub fn register(&self, verifier: Arc<dyn IVerifier>) {
        let problem_type = verifier.get_type();
        self.verifiers
            .lock()
            .expect("verifier registry mutex poisoned")
            .insert(problem_type, verifier);
    }

    pub fn get_verifier(&self, problem_type: ProblemType) -> Option<Arc<dyn IVerifier>> {
        self.verifiers
            .lock()
            .expect("verifier registry mutex poisoned")
            .get(&problem_type)
            .cloned()
    }
}

impl Default for VerifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Running totals across every verification this dispatcher has performed.
#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    success: AtomicU64,
    fail: AtomicU64,
    total_time_ms: AtomicU64,
}

/// Snapshot of `Counters` for querying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierStats {
    pub total: u64,
    pub success: u64,
    pub fail: u64,
    pub total_time_ms: u64,
}

/// Dispatches solutions to the registered verifier for their problem type,
/// tracking global counters and offering both synchronous and bounded
/// asynchronous verification.
pub struct SolutionVerifier {
    registry: Arc<VerifierRegistry>,
    counters: Arc<Counters>,
    semaphore: Arc<Semaphore>,
}

impl SolutionVerifier {
    pub fn new(registry: Arc<VerifierRegistry>, max_concurrent: usize) -> Self {
        SolutionVerifier {
            registry,
            counters: Arc::new(Counters::default()),
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// A quick, non-authoritative pre-check; does not touch the counters.
    pub fn quick_validate(&self, problem: &Problem, solution: &Solution) -> Result<bool, VerifyError> {
        let verifier = self
            .registry
            .get_verifier(problem.problem_type)
            .ok_or(VerifyError::UnknownProblemType(problem.problem_type))?;
        Ok(verifier.quick_validate(problem, solution))
    }

    /// Synchronous, authoritative verification. Safe to call from any
    /// thread; records stats and emits a structured log event.
    ///
    /// An unregistered problem type is a classification outcome
    /// (`TYPE_MISMATCH`, spec.md §7), not a Rust-level error — an empty
    /// registry entry must be indistinguishable from an unregistered type,
    /// so this never special-cases "registry empty" vs "type unknown".
    /// A solution bound to the wrong problem id is still rejected as a
    /// caller contract violation (`VerifyError::SolutionMismatch`), since
    /// spec.md only names `TYPE_MISMATCH` for the unregistered-type case.
    pub fn verify(&self, problem: &Problem, solution: &Solution) -> Result<VerificationDetails, VerifyError> {
        if solution.problem_id != problem.id {
            return Err(VerifyError::SolutionMismatch);
        }

        let start = Instant::now();
        let details = match self.registry.get_verifier(problem.problem_type) {
            Some(verifier) => verifier.verify(problem, solution),
            None => VerificationDetails::terminal(
                VerificationResult::TypeMismatch,
                start.elapsed().as_millis() as u64,
            ),
        };
        let elapsed = start.elapsed().as_millis() as u64;

        self.counters.total.fetch_add(1, Ordering::Relaxed);
        self.counters.total_time_ms.fetch_add(elapsed, Ordering::Relaxed);
        if details.result == VerificationResult::Valid {
            self.counters.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.fail.fetch_add(1, Ordering::Relaxed);
        }

        log_verification_event(
            &problem.id,
            if details.result == VerificationResult::Valid {
                "valid"
            } else {
                "invalid"
            },
            details.score,
            elapsed,
        );

        Ok(details)
    }

    /// Bounded asynchronous verification: rejects with `QueueFull` once
    /// `max_concurrent` verifications are already in flight, otherwise runs
    /// the (CPU-bound, synchronous) verifier body in `spawn_blocking`.
    pub async fn submit(
        &self,
        problem: Problem,
        solution: Solution,
    ) -> Result<VerificationDetails, VerifyError> {
        let permit = self
            .semaphore
            .clone()
            .try_acquire_owned()
            .map_err(|_| VerifyError::QueueFull)?;

        let registry = self.registry.clone();
        let counters = self.counters.clone();

        let join_result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            run_verification(&registry, &counters, &problem, &solution)
        })
        .await;

        match join_result {
            Ok(inner) => inner,
            Err(join_err) => Err(VerifyError::TaskPanicked(join_err.to_string())),
        }
    }

    pub fn stats(&self) -> VerifierStats {
        VerifierStats {
            total: self.counters.total.load(Ordering::Relaxed),
            success: self.counters.success.load(Ordering::Relaxed),
            fail: self.counters.fail.load(Ordering::Relaxed),
            total_time_ms: self.counters.total_time_ms.load(Ordering::Relaxed),
        }
    }
}

fn run_verification(
    registry: &VerifierRegistry,
    counters: &Counters,
    problem: &Problem,
    solution: &Solution,
) -> Result<VerificationDetails, VerifyError> {
    if solution.problem_id != problem.id {
        return Err(VerifyError::SolutionMismatch);
    }

    let start = Instant::now();
    let details = match registry.get_verifier(problem.problem_type) {
        Some(verifier) => verifier.verify(problem, solution),
        None => VerificationDetails::terminal(
            VerificationResult::TypeMismatch,
            start.elapsed().as_millis() as u64,
        ),
    };
    let elapsed = start.elapsed().as_millis() as u64;

    counters.total.fetch_add(1, Ordering::Relaxed);
    counters.total_time_ms.fetch_add(elapsed, Ordering::Relaxed);
    if details.result == VerificationResult::Valid {
        counters.success.fetch_add(1, Ordering::Relaxed);
    } else {
        counters.fail.fetch_add(1, Ordering::Relaxed);
    }

    log_verification_event(
        &problem.id,
        if details.result == VerificationResult::Valid {
            "valid"
        } else {
            "invalid"
        },
        details.score,
        elapsed,
    );

    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use problem::SolutionData;
    use crate::types::Hash256;

    fn generic_problem_and_solution(id: &str) -> (Problem, Solution) {
        let result = b"payload".to_vec();
        let result_hash = Hash256::sha256(&result);
        let problem = Problem {
            id: id.to_string(),
            problem_type: ProblemType::Generic,
            spec: vec![],
            verification_data: vec![],
            hash: Hash256::ZERO,
        };
        let solution = Solution {
            id: "s1".into(),
            problem_id: id.to_string(),
            problem_type: ProblemType::Generic,
            solver_id: "solver".into(),
            data: SolutionData {
                result,
                result_hash,
                intermediate_hashes: vec![],
                iteration_count: 1,
                reported_accuracy: 1.0,
            },
        };
        (problem, solution)
    }

    #[test]
    fn unknown_problem_type_yields_type_mismatch() {
        let registry = Arc::new(VerifierRegistry::new());
        let dispatcher = SolutionVerifier::new(registry, 4);
        let (problem, solution) = generic_problem_and_solution("p1");
        let details = dispatcher.verify(&problem, &solution).unwrap();
        assert_eq!(details.result, VerificationResult::TypeMismatch);
        assert_eq!(dispatcher.stats().fail, 1);
    }

    #[test]
    fn synchronous_verify_updates_counters() {
        let registry = Arc::new(VerifierRegistry::with_default_verifiers());
        let dispatcher = SolutionVerifier::new(registry, 4);
        let (problem, solution) = generic_problem_and_solution("p1");
        let details = dispatcher.verify(&problem, &solution).unwrap();
        assert_eq!(details.result, VerificationResult::Valid);
        let stats = dispatcher.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.success, 1);
    }

    #[test]
    fn mismatched_problem_id_rejected() {
        let registry = Arc::new(VerifierRegistry::with_default_verifiers());
        let dispatcher = SolutionVerifier::new(registry, 4);
        let (problem, mut solution) = generic_problem_and_solution("p1");
        solution.problem_id = "different".into();
        let err = dispatcher.verify(&problem, &solution).unwrap_err();
        assert!(matches!(err, VerifyError::SolutionMismatch));
    }

    #[tokio::test]
    async fn async_submit_rejects_when_queue_full() {
        let registry = Arc::new(VerifierRegistry::with_default_verifiers());
        let dispatcher = Arc::new(SolutionVerifier::new(registry, 1));
        let (p1, s1) = generic_problem_and_solution("p1");
        let (p2, s2) = generic_problem_and_solution("p2");

        // Hold the single permit open across an await point by racing two
        // submissions; with capacity 1 at least one attempt observes the
        // semaphore fully checked out if issued concurrently. Since
        // spawn_blocking completes fast, we instead assert capacity
        // accounting directly via try_acquire.
        let _permit = dispatcher
            .semaphore
            .clone()
            .try_acquire_owned()
            .expect("should acquire the only permit");
        let err = dispatcher.submit(p1, s1).await.unwrap_err();
        assert!(matches!(err, VerifyError::QueueFull));
        drop(_permit);

        let details = dispatcher.submit(p2, s2).await.unwrap();
        assert_eq!(details.result, VerificationResult::Valid);
    }
}
