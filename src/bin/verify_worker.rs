//! Standalone async verification-queue worker demo.
//!
//! Generates a stream of toy `Generic`-type solutions and submits them
//! through `SolutionVerifier::submit`, printing periodic stats — the same
//! `interval(...).tick().await` polling-loop shape as the teacher's
//! `DepositTrackerService::run`, adapted to drive submissions into a
//! bounded queue instead of polling external state.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

use shurium_consensus::logging::{init_logging, LogLevel};
use shurium_consensus::types::Hash256;
use shurium_consensus::verify::problem::{Problem, ProblemType, Solution, SolutionData};
use shurium_consensus::verify::{SolutionVerifier, VerifierRegistry};

const MAX_CONCURRENT: usize = 4;
const SUBMIT_INTERVAL_MS: u64 = 50;
const TOTAL_SUBMISSIONS: u64 = 40;

#[tokio::main]
async fn main() {
    let _ = init_logging(LogLevel::Info, false);

    let registry = Arc::new(VerifierRegistry::with_default_verifiers());
    let dispatcher = Arc::new(SolutionVerifier::new(registry, MAX_CONCURRENT));

    println!("=== SHURIUM Verification Worker ===");
    println!("max concurrent verifications: {MAX_CONCURRENT}");
    println!();

    let mut tick = interval(Duration::from_millis(SUBMIT_INTERVAL_MS));
    let mut submitted = 0u64;
    let mut handles = Vec::new();

    while submitted < TOTAL_SUBMISSIONS {
        tick.tick().await;
        let (problem, solution) = toy_problem_and_solution(submitted);
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(async move {
            match dispatcher.submit(problem, solution).await {
                Ok(details) => println!("submission {submitted}: {:?} (score {})", details.result, details.score),
                Err(e) => eprintln!("submission {submitted}: rejected ({e})"),
            }
        }));
        submitted += 1;
    }

    for handle in handles {
        let _ = handle.await;
    }

    println!();
    println!("final stats: {:?}", dispatcher.stats());
}

fn toy_problem_and_solution(index: u64) -> (Problem, Solution) {
    let id = format!("worker-problem-{index}");
    let result = format!("payload-{index}").into_bytes();
    let result_hash = Hash256::sha256(&result);

    let problem = Problem {
        id: id.clone(),
        problem_type: ProblemType::Generic,
        spec: vec![],
        verification_data: vec![],
        hash: Hash256::ZERO,
    };
    let solution = Solution {
        id: format!("worker-solution-{index}"),
        problem_id: id,
        problem_type: ProblemType::Generic,
        solver_id: "worker-demo".into(),
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
