//! Registry/dispatch tests for the verifier layer (spec.md §4.E, Component
//! E): correct routing by `ProblemType`, registry override semantics, and
//! the synchronous/asynchronous dispatch paths agreeing with each other.

use std::sync::Arc;

use shurium_consensus::types::Hash256;
use shurium_consensus::verify::problem::{
    Problem, ProblemType, Solution, SolutionData, VerificationResult,
};
use shurium_consensus::verify::{IVerifier, SolutionVerifier, VerifierRegistry, VerifyError};

fn problem_and_solution(problem_type: ProblemType, id: &str) -> (Problem, Solution) {
    let result = format!("payload for {id}").into_bytes();
    let result_hash = Hash256::sha256(&result);
    let problem = Problem {
        id: id.into(),
        problem_type,
        spec: vec![],
        verification_data: vec![],
        hash: Hash256::ZERO,
    };
    let solution = Solution {
        id: format!("{id}-solution"),
        problem_id: id.into(),
        problem_type,
        solver_id: "registry-test-solver".into(),
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
fn with_default_verifiers_routes_each_problem_type() {
    let registry = VerifierRegistry::with_default_verifiers();
    for problem_type in [
        ProblemType::HashPow,
        ProblemType::MlTraining,
        ProblemType::LinearAlgebra,
        ProblemType::Generic,
    ] {
        let verifier = registry
            .get_verifier(problem_type)
            .unwrap_or_else(|| panic!("missing default verifier for {problem_type:?}"));
        assert_eq!(verifier.get_type(), problem_type);
    }
}

#[test]
fn empty_registry_has_no_verifiers() {
    let registry = VerifierRegistry::new();
    assert!(registry.get_verifier(ProblemType::Generic).is_none());
}

/// `register` replaces wholesale rather than merging — a second
/// registration for the same `ProblemType` fully supersedes the first.
#[test]
fn register_replaces_existing_verifier_for_same_type() {
    struct AlwaysInvalid;
    impl IVerifier for AlwaysInvalid {
        fn get_type(&self) -> ProblemType {
            ProblemType::Generic
        }
        fn quick_validate(&self, _problem: &Problem, _solution: &Solution) -> bool {
            false
        }
        fn verify(
            &self,
            _problem: &Problem,
            _solution: &Solution,
        ) -> shurium_consensus::verify::problem::VerificationDetails {
            shurium_consensus::verify::problem::VerificationDetails::from_checks(vec![], 0, 0, 0)
        }
        fn estimate_verification_time(&self, _problem: &Problem) -> u64 {
            0
        }
    }

    let registry = VerifierRegistry::with_default_verifiers();
    let dispatcher = SolutionVerifier::new(Arc::new(registry), 4);
    // Not yet replaced: default GenericVerifier accepts a well-formed solution.
    let (problem, solution) = problem_and_solution(ProblemType::Generic, "p-before");
    assert_eq!(
        dispatcher.verify(&problem, &solution).unwrap().result,
        VerificationResult::Valid
    );

    let registry = VerifierRegistry::with_default_verifiers();
    registry.register(Arc::new(AlwaysInvalid));
    let dispatcher = SolutionVerifier::new(Arc::new(registry), 4);
    let (problem, solution) = problem_and_solution(ProblemType::Generic, "p-after");
    assert_eq!(
        dispatcher.verify(&problem, &solution).unwrap().result,
        VerificationResult::Invalid
    );
}

/// spec.md §7: an unregistered problem type yields `TYPE_MISMATCH` as a
/// classification outcome, not a dispatch error — indistinguishable from an
/// empty registry entry.
#[test]
fn dispatch_rejects_unregistered_problem_type_as_type_mismatch() {
    let registry = Arc::new(VerifierRegistry::new());
    let dispatcher = SolutionVerifier::new(registry, 4);
    let (problem, solution) = problem_and_solution(ProblemType::LinearAlgebra, "p1");
    let details = dispatcher.verify(&problem, &solution).unwrap();
    assert_eq!(details.result, VerificationResult::TypeMismatch);
}

/// A solution bound to the wrong problem id is still a Rust-level dispatch
/// error — distinct from the registry-lookup classification outcomes.
#[test]
fn dispatch_rejects_solution_problem_id_mismatch() {
    let registry = Arc::new(VerifierRegistry::with_default_verifiers());
    let dispatcher = SolutionVerifier::new(registry, 4);
    let (problem, mut solution) = problem_and_solution(ProblemType::Generic, "p1");
    solution.problem_id = "not-p1".into();
    let err = dispatcher.verify(&problem, &solution).unwrap_err();
    assert!(matches!(err, VerifyError::SolutionMismatch));
}

#[test]
fn quick_validate_rejects_mismatched_problem_type() {
    let registry = Arc::new(VerifierRegistry::with_default_verifiers());
    let dispatcher = SolutionVerifier::new(registry, 4);
    let (mut problem, solution) = problem_and_solution(ProblemType::Generic, "p1");
    problem.problem_type = ProblemType::HashPow;
    // quick_validate looks up by the *problem's* declared type; HashPow's
    // verifier then sees a Generic-typed solution and rejects it.
    let ok = dispatcher.quick_validate(&problem, &solution).unwrap();
    assert!(!ok);
}

/// The synchronous and asynchronous dispatch paths must agree on outcome
/// for the same input.
#[tokio::test]
async fn sync_and_async_dispatch_agree() {
    let registry = Arc::new(VerifierRegistry::with_default_verifiers());
    let dispatcher = SolutionVerifier::new(registry, 4);
    let (problem, solution) = problem_and_solution(ProblemType::Generic, "p1");

    let sync_result = dispatcher.verify(&problem, &solution).unwrap().result;
    let async_result = dispatcher
        .submit(problem, solution)
        .await
        .unwrap()
        .result;

    assert_eq!(sync_result, async_result);
    assert_eq!(dispatcher.stats().total, 2);
}

#[tokio::test]
async fn concurrent_submissions_up_to_capacity_all_succeed() {
    let registry = Arc::new(VerifierRegistry::with_default_verifiers());
    let dispatcher = Arc::new(SolutionVerifier::new(registry, 4));

    let mut handles = Vec::new();
    for i in 0..4 {
        let dispatcher = Arc::clone(&dispatcher);
        let (problem, solution) = problem_and_solution(ProblemType::Generic, &format!("concurrent-{i}"));
        handles.push(tokio::spawn(async move { dispatcher.submit(problem, solution).await }));
    }

    for handle in handles {
        let details = handle.await.unwrap().unwrap();
        assert_eq!(details.result, VerificationResult::Valid);
    }
    assert_eq!(dispatcher.stats().total, 4);
    assert_eq!(dispatcher.stats().success, 4);
}
