//! Generic verifier (spec.md §4.E, Component E): structural checks only,
//! used for problem types with no dedicated verifier.

use crate::types::Hash256;
use crate::verify::problem::{CheckResult, Problem, ProblemType, Solution, VerificationDetails};
use crate::verify::{quick_validate_common, IVerifier};

pub struct GenericVerifier;

impl IVerifier for GenericVerifier {
    fn get_type(&self) -> ProblemType {
        ProblemType::Generic
    }

    fn quick_validate(&self, problem: &Problem, solution: &Solution) -> bool {
        quick_validate_common(problem, solution, ProblemType::Generic)
    }

    fn verify(&self, _problem: &Problem, solution: &Solution) -> VerificationDetails {
        let start = std::time::Instant::now();
        let mut checks = Vec::new();

        checks.push(CheckResult {
            name: "result_non_empty",
            passed: !solution.data.result.is_empty(),
        });
        checks.push(CheckResult {
            name: "result_hash_matches",
            passed: Hash256::sha256(&solution.data.result) == solution.data.result_hash,
        });
        checks.push(CheckResult {
            name: "solver_id_non_empty",
            passed: !solution.solver_id.is_empty(),
        });
        checks.push(CheckResult {
            name: "problem_id_bound",
            passed: solution.problem_id == _problem.id,
        });

        let score = if checks.iter().all(|c| c.passed) {
            1_000_000
        } else {
            0
        };

        VerificationDetails::from_checks(checks, score, 0, start.elapsed().as_millis() as u64)
    }

    fn estimate_verification_time(&self, _problem: &Problem) -> u64 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::problem::SolutionData;

    #[test]
    fn accepts_well_formed_generic_solution() {
        let result = b"some output".to_vec();
        let result_hash = Hash256::sha256(&result);
        let problem = Problem {
            id: "p1".into(),
            problem_type: ProblemType::Generic,
            spec: vec![],
            verification_data: vec![],
            hash: Hash256::ZERO,
        };
        let solution = Solution {
            id: "s1".into(),
            problem_id: "p1".into(),
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
        let details = GenericVerifier.verify(&problem, &solution);
        assert_eq!(
            details.result,
            crate::verify::problem::VerificationResult::Valid
        );
    }

    #[test]
    fn rejects_empty_result() {
        let problem = Problem {
            id: "p1".into(),
            problem_type: ProblemType::Generic,
            spec: vec![],
            verification_data: vec![],
            hash: Hash256::ZERO,
        };
        let solution = Solution {
            id: "s1".into(),
            problem_id: "p1".into(),
            problem_type: ProblemType::Generic,
            solver_id: "solver".into(),
            data: SolutionData {
                result: vec![],
                result_hash: Hash256::sha256(&[]),
                intermediate_hashes: vec![],
                iteration_count: 1,
                reported_accuracy: 1.0,
            },
        };
        let details = GenericVerifier.verify(&problem, &solution);
        assert_eq!(
            details.result,
            crate::verify::problem::VerificationResult::Invalid
        );
    }
}
