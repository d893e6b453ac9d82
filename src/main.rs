//! SHURIUM consensus core - demo harness
//!
//! Exercises the library end to end without a network or a wallet.
//!
//! Run modes:
//!   cargo run                       - Show usage
//!   cargo run -- subsidy <height>   - Print a block's subsidy split
//!   cargo run -- pouw <difficulty>  - Mine and verify a toy PoUW solution
//!   cargo run -- ubi                - Run a one-epoch UBI distribution demo
//!   cargo run -- verify             - Submit a solution through the registry

use std::env;
use std::sync::Arc;

use shurium_consensus::config::NetworkParams;
use shurium_consensus::consensus::{
    block_subsidy, is_ubi_distribution_block, subsidy_split, verify_pouw_solution,
};
use shurium_consensus::logging::{init_logging, LogLevel};
use shurium_consensus::types::{Amount, Hash160, Hash256};
use shurium_consensus::ubi::{
    create_claim, ClaimStatus, IdentitySecrets, MerkleProof, ReferenceZkProver, UBIDistributor,
    UBITransactionBuilder,
};
use shurium_consensus::verify::problem::{Problem, ProblemType, Solution, SolutionData};
use shurium_consensus::verify::{SolutionVerifier, VerifierRegistry};

#[tokio::main]
async fn main() {
    let _ = init_logging(LogLevel::Info, false);
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "subsidy" => run_subsidy_demo(&args[2..]),
        "pouw" => run_pouw_demo(&args[2..]),
        "ubi" => run_ubi_demo(),
        "verify" => run_verify_demo().await,
        "help" | "--help" | "-h" => print_usage(),
        _ => print_usage(),
    }
}

fn print_usage() {
    println!("SHURIUM consensus core - demo harness");
    println!();
    println!("Usage:");
    println!("  shurium-cli subsidy <height>     Print a block's five-way subsidy split");
    println!("  shurium-cli pouw <difficulty>    Mine and verify a toy PoUW solution");
    println!("  shurium-cli ubi                  Run a one-epoch UBI distribution demo");
    println!("  shurium-cli verify               Submit a solution through the registry");
}

fn run_subsidy_demo(args: &[String]) {
    let params = NetworkParams::mainnet();
    let height: u64 = args.first().and_then(|s| s.parse().ok()).unwrap_or(0);

    let subsidy = block_subsidy(&params, height);
    let split = subsidy_split(&params, height);
    println!("height {height}: subsidy {subsidy}");
    println!("  ubi:          {}", split.ubi);
    println!("  work:         {}", split.work);
    println!("  contribution: {}", split.contribution);
    println!("  ecosystem:    {}", split.ecosystem);
    println!("  reserve:      {}", split.reserve);
    println!(
        "  UBI distribution block: {}",
        is_ubi_distribution_block(&params, height)
    );
}

fn run_pouw_demo(args: &[String]) {
    let difficulty: u32 = args.first().and_then(|s| s.parse().ok()).unwrap_or(8);
    let problem_hash = Hash256::sha256(b"toy pouw problem");

    let mut nonce: u64 = 0;
    loop {
        let mut solution = [0u8; 32];
        solution[0..8].copy_from_slice(&nonce.to_le_bytes());
        match verify_pouw_solution(&problem_hash, &solution, difficulty) {
            Ok(true) => {
                println!("found solution at nonce {nonce} for difficulty {difficulty}");
                break;
            }
            Ok(false) => nonce += 1,
            Err(e) => {
                eprintln!("pouw error: {e}");
                return;
            }
        }
        if nonce > 5_000_000 {
            println!("gave up after 5,000,000 attempts");
            break;
        }
    }
}

fn run_ubi_demo() {
    let mut params = NetworkParams::mainnet();
    params.epoch_blocks = 100;
    params.ubi_claim_window = 50;
    params.min_identities_for_ubi = 1;

    let distributor = UBIDistributor::new(params, Arc::new(ReferenceZkProver));
    for height in 0..100u64 {
        let _ = distributor.add_block_reward(height, Amount::from_sats(1_000));
    }
    distributor.finalize_epoch(0, 3).expect("first finalization of epoch 0");

    let secrets = IdentitySecrets {
        secret_key: Hash256::sha256(b"demo-sk"),
        nullifier_key: Hash256::sha256(b"demo-nk"),
        trapdoor: Hash256::sha256(b"demo-td"),
    };
    let membership = MerkleProof {
        siblings: vec![Hash256::sha256(b"sibling")],
        path_bits: vec![false],
    };
    let identity_root = membership.compute_root(secrets.commitment());

    let prover = ReferenceZkProver;
    let mut claim = create_claim(&prover, &secrets, &membership, 0, Hash160::from_bytes([3u8; 20]));

    let status = distributor.process_claim(&mut claim, identity_root, 10);
    println!("claim status: {status:?}, amount: {}", claim.amount);

    if status == ClaimStatus::Valid {
        let out = UBITransactionBuilder::build_claim_outputs(&claim).expect("build payout output");
        println!("payout script: {}", out.script_pubkey);
    }
}

async fn run_verify_demo() {
    let registry = Arc::new(VerifierRegistry::with_default_verifiers());
    let dispatcher = SolutionVerifier::new(registry, 4);

    let result = b"demo result payload".to_vec();
    let result_hash = Hash256::sha256(&result);
    let problem = Problem {
        id: "demo-problem".into(),
        problem_type: ProblemType::Generic,
        spec: vec![],
        verification_data: vec![],
        hash: Hash256::ZERO,
    };
    let solution = Solution {
        id: "demo-solution".into(),
        problem_id: problem.id.clone(),
        problem_type: ProblemType::Generic,
        solver_id: "demo-solver".into(),
        data: SolutionData {
            result,
            result_hash,
            intermediate_hashes: vec![],
            iteration_count: 1,
            reported_accuracy: 1.0,
        },
    };

    match dispatcher.submit(problem, solution).await {
        Ok(details) => println!("verification result: {:?}, score {}", details.result, details.score),
        Err(e) => eprintln!("verification error: {e}"),
    }
    println!("stats: {:?}", dispatcher.stats());
}
