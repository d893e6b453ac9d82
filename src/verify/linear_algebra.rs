//! Linear-algebra verifier (spec.md §4.E, Component E): spot-checks a
//! claimed dense matrix-multiplication result.

use crate::types::Hash256;
use crate::verify::problem::{
    CheckResult, Problem, ProblemType, Solution, VerificationDetails,
};
use crate::verify::{quick_validate_common, IVerifier};

const MAX_DIM: u32 = 100_000;
const SCORE_FLOOR: u32 = 500_000;

struct Dims {
    rows_a: u32,
    cols_a: u32,
    rows_b: u32,
    cols_b: u32,
}

fn parse_dims(spec: &[u8]) -> Option<Dims> {
    if spec.len() < 16 {
        return None;
    }
    let read_u32 = |off: usize| u32::from_le_bytes(spec[off..off + 4].try_into().unwrap());
    let dims = Dims {
        rows_a: read_u32(0),
        cols_a: read_u32(4),
        rows_b: read_u32(8),
        cols_b: read_u32(12),
    };
    let positive = [dims.rows_a, dims.cols_a, dims.rows_b, dims.cols_b]
        .iter()
        .all(|&d| d > 0 && d <= MAX_DIM);
    if positive {
        Some(dims)
    } else {
        None
    }
}

/// Reads dense row-major matrices A, B immediately following the 16-byte
/// dimension header, if `spec` is long enough to hold them at `elem_size`.
fn dense_matrices<'a>(spec: &'a [u8], dims: &Dims, elem_size: usize) -> Option<(&'a [u8], &'a [u8])> {
    let a_len = dims.rows_a as usize * dims.cols_a as usize * elem_size;
    let b_len = dims.rows_b as usize * dims.cols_b as usize * elem_size;
    if spec.len() < 16 + a_len + b_len {
        return None;
    }
    Some((&spec[16..16 + a_len], &spec[16 + a_len..16 + a_len + b_len]))
}

fn read_f32(bytes: &[u8], idx: usize) -> f32 {
    f32::from_le_bytes(bytes[idx * 4..idx * 4 + 4].try_into().unwrap())
}

fn read_f64(bytes: &[u8], idx: usize) -> f64 {
    f64::from_le_bytes(bytes[idx * 8..idx * 8 + 8].try_into().unwrap())
}

fn spot_check_indices(result_hash: &Hash256, bound: u32) -> [u32; 3] {
    let bytes = result_hash.as_bytes();
    let words = [
        u16::from_le_bytes([bytes[0], bytes[1]]),
        u16::from_le_bytes([bytes[2], bytes[3]]),
        u16::from_le_bytes([bytes[4], bytes[5]]),
    ];
    [
        words[0] as u32 % bound,
        words[1] as u32 % bound,
        words[2] as u32 % bound,
    ]
}

pub struct LinearAlgebraVerifier;

impl IVerifier for LinearAlgebraVerifier {
    fn get_type(&self) -> ProblemType {
        ProblemType::LinearAlgebra
    }

    fn quick_validate(&self, problem: &Problem, solution: &Solution) -> bool {
        quick_validate_common(problem, solution, ProblemType::LinearAlgebra) && parse_dims(&problem.spec).is_some()
    }

    fn verify(&self, problem: &Problem, solution: &Solution) -> VerificationDetails {
        let start = std::time::Instant::now();
        let mut checks = Vec::new();

        let dims = parse_dims(&problem.spec);
        checks.push(CheckResult {
            name: "dims_valid",
            passed: dims.is_some(),
        });
        let Some(dims) = dims else {
            return VerificationDetails::from_checks(checks, 0, SCORE_FLOOR, start.elapsed().as_millis() as u64);
        };

        checks.push(CheckResult {
            name: "shapes_compatible",
            passed: dims.cols_a == dims.rows_b,
        });

        let result_matches_hash = Hash256::sha256(&solution.data.result) == solution.data.result_hash;
        checks.push(CheckResult {
            name: "result_hash_matches",
            passed: result_matches_hash,
        });

        let out_elems = dims.rows_a as usize * dims.cols_b as usize;
        let elem_size = if solution.data.result.len() == out_elems * 8 {
            8usize
        } else {
            4usize
        };
        let expected_result_len = out_elems * elem_size;
        checks.push(CheckResult {
            name: "result_size_matches_shape",
            passed: solution.data.result.len() == expected_result_len,
        });

        let mut score = if result_matches_hash { 600_000 } else { 0 };

        if dims.cols_a != dims.rows_b {
            // Already failed `shapes_compatible` above; skip the spot-check
            // rather than index the inner product past a mismatched B.
            checks.push(CheckResult {
                name: "spot_check_elements",
                passed: false,
            });
        } else if let Some((a, b)) = dense_matrices(&problem.spec, &dims, elem_size) {
            let mut spot_ok = !solution.data.result.is_empty();
            if solution.data.result.len() == expected_result_len {
                for idx in spot_check_indices(&solution.data.result_hash, out_elems.max(1) as u32) {
                    let row = idx as usize / dims.cols_b as usize;
                    let col = idx as usize % dims.cols_b as usize;
                    let (expected, actual, tolerance) = if elem_size == 8 {
                        let mut acc = 0f64;
                        for k in 0..dims.cols_a as usize {
                            acc += read_f64(a, row * dims.cols_a as usize + k)
                                * read_f64(b, k * dims.cols_b as usize + col);
                        }
                        let actual = read_f64(&solution.data.result, idx as usize);
                        (acc, actual, (acc.abs() * 1e-10).max(1e-12))
                    } else {
                        let mut acc = 0f32;
                        for k in 0..dims.cols_a as usize {
                            acc += read_f32(a, row * dims.cols_a as usize + k)
                                * read_f32(b, k * dims.cols_b as usize + col);
                        }
                        let actual = read_f32(&solution.data.result, idx as usize);
                        (acc as f64, actual as f64, (acc.abs() as f64 * 1e-5).max(1e-6))
                    };
                    if (expected - actual).abs() > tolerance {
                        spot_ok = false;
                    }
                }
            } else {
                spot_ok = false;
            }
            checks.push(CheckResult {
                name: "spot_check_elements",
                passed: spot_ok,
            });
            if spot_ok && result_matches_hash {
                score = 900_000;
            }
        } else {
            // Sparse/compressed inputs: hash check only, lower score.
            score = if result_matches_hash { 550_000 } else { 0 };
        }

        VerificationDetails::from_checks(checks, score, SCORE_FLOOR, start.elapsed().as_millis() as u64)
    }

    fn estimate_verification_time(&self, problem: &Problem) -> u64 {
        (problem.spec.len() as u64 / 1024).max(2)
    }
}
