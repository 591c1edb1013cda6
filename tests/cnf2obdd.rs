//! End-to-end tests for the AllSAT pipeline.
//!
//! Library-level checks compare the emitted diagram against brute force; the
//! executable is driven as a subprocess to check exit codes and streams.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::atomic::AtomicBool;

use num_bigint::BigUint;

use cnf2dd::dimacs::{self, Outcome};
use cnf2dd::interrupt::Interrupt;
use cnf2dd::reduce::reduce;
use cnf2dd::solver::{Backtrack, CacheKind, CountingMode, Enumeration, Solver, SolverConfig, Status, Uip};

// ─── Helpers ───────────────────────────────────────────────────────────────────

fn brute_count(num_vars: usize, clauses: &[Vec<i32>]) -> BigUint {
    let mut count = 0u64;
    for bits in 0u64..(1 << num_vars) {
        let value = |lit: i32| {
            let bit = bits >> (lit.unsigned_abs() - 1) & 1 == 1;
            bit == (lit > 0)
        };
        if clauses.iter().all(|c| c.iter().any(|&l| value(l))) {
            count += 1;
        }
    }
    BigUint::from(count)
}

fn to_dimacs(num_vars: usize, clauses: &[Vec<i32>]) -> String {
    let mut text = format!("p cnf {} {}\n", num_vars, clauses.len());
    for clause in clauses {
        for lit in clause {
            text.push_str(&format!("{} ", lit));
        }
        text.push_str("0\n");
    }
    text
}

/// Small pseudo-random 3-CNF, every variable mentioned at least once.
fn random_cnf(num_vars: usize, num_clauses: usize, seed: u64) -> Vec<Vec<i32>> {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 33) as usize
    };
    let mut clauses: Vec<Vec<i32>> = (0..num_clauses)
        .map(|_| {
            (0..3)
                .map(|_| {
                    let var = (next() % num_vars + 1) as i32;
                    if next() % 2 == 0 {
                        var
                    } else {
                        -var
                    }
                })
                .collect()
        })
        .collect();
    clauses.push((1..=num_vars as i32).collect());
    clauses
}

fn all_configs() -> Vec<SolverConfig> {
    let mut configs = Vec::new();
    for cache in [CacheKind::Cutset, CacheKind::Separator] {
        for backtrack in [Backtrack::Bt, Backtrack::Bj, Backtrack::Cbj, Backtrack::BjCbj] {
            for uip in [Uip::Dlevel, Uip::Sublevel] {
                configs.push(SolverConfig {
                    cache,
                    backtrack,
                    uip,
                    ..Default::default()
                });
            }
        }
    }
    configs.push(SolverConfig {
        enumeration: Enumeration::Blocking,
        ..Default::default()
    });
    configs
}

fn cnf2obdd(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cnf2obdd"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

// ─── Diagram correctness ───────────────────────────────────────────────────────

#[test]
fn diagram_matches_brute_force() {
    for seed in 0..6 {
        let num_vars = 6;
        let clauses = random_cnf(num_vars, 7, seed);
        let expected = brute_count(num_vars, &clauses);
        let text = to_dimacs(num_vars, &clauses);

        for config in all_configs() {
            let mut solver = Solver::new(config.clone());
            let outcome = dimacs::parse(text.as_bytes(), &mut solver).unwrap();
            if outcome == Outcome::Conflict {
                assert_eq!(expected, BigUint::from(0u32));
                continue;
            }
            let flag = AtomicBool::new(false);
            let status = solver.solve(Interrupt::new(&flag));
            assert_ne!(status, Status::Interrupted);

            let count = solver.obdd().model_count(solver.root(), num_vars);
            assert_eq!(count, expected, "seed {} with {:?}", seed, config);

            let reduced = reduce(solver.obdd(), solver.root());
            assert_eq!(reduced.obdd.model_count(reduced.root, num_vars), expected);
            assert!(reduced.size() <= solver.obdd().size(solver.root()));
        }
    }
}

#[test]
fn bounded_counting_agrees_on_small_inputs() {
    let clauses = random_cnf(5, 4, 42);
    let expected = brute_count(5, &clauses);
    let mut solver = Solver::new(SolverConfig {
        counting: CountingMode::Bounded,
        ..Default::default()
    });
    dimacs::parse(to_dimacs(5, &clauses).as_bytes(), &mut solver).unwrap();
    let flag = AtomicBool::new(false);
    solver.solve(Interrupt::new(&flag));
    assert!(!solver.stats().solutions.overflowed());
    assert_eq!(solver.stats().solutions.to_biguint(), expected);
}

// ─── Executable ────────────────────────────────────────────────────────────────

#[test]
fn exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("unsat.cnf"), "p cnf 1 2\n1 0\n-1 0\n").unwrap();
    fs::write(dir.path().join("bad.cnf"), "p cnf 2 1\n1 x 0\n").unwrap();

    let out = cnf2obdd(dir.path(), &["unsat.cnf"]);
    assert_eq!(out.status.code(), Some(20));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Trivial problem\nUNSATISFIABLE"));
    assert!(out.stdout.is_empty());

    let out = cnf2obdd(dir.path(), &["bad.cnf"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Unexpected char: x"));

    let out = cnf2obdd(dir.path(), &["missing.cnf"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("ERROR! Could not open file: missing.cnf"));
}

#[test]
fn usage_exits_successfully() {
    let dir = tempfile::tempdir().unwrap();
    let cases: [&[&str]; 5] = [&[], &["-h"], &["-n0", "x.cnf"], &["a", "b", "c"], &["--bogus", "x.cnf"]];
    for args in cases {
        let out = cnf2obdd(dir.path(), args);
        assert_eq!(out.status.code(), Some(0), "args {:?}", args);
        assert!(String::from_utf8_lossy(&out.stderr).contains("[options] input-file [output-file]"));
    }
}

#[test]
fn solves_and_writes_diagram() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("f.cnf"), "p cnf 3 2\n1 2 0\n-2 3 0\n").unwrap();

    let out = cnf2obdd(dir.path(), &["-n1000", "--cache", "separator", "f.cnf", "f.obdd"]);
    assert_eq!(out.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("input             : f.cnf"));
    assert!(stderr.contains("pathwidth"));
    assert!(stderr.contains("cache type        : separator"));

    let stdout = String::from_utf8(out.stdout).unwrap();
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert!(json["time"].is_number());
    assert!(dir.path().join("f.obdd").exists());
}
