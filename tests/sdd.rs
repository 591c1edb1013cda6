//! End-to-end tests for SDD compilation.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use num_bigint::BigUint;

use cnf2dd::fnf::{Fnf, FnfKind};
use cnf2dd::sdd::{SddId, SddManager, Vtree, VtreeType};

// ─── Helpers ───────────────────────────────────────────────────────────────────

const FORMULA: &str = "c overlapping clauses\np cnf 5 4\n1 -2 0\n2 3 -4 0\n-1 5 0\n4 -5 0\n";

const VTREE_TYPES: [VtreeType; 4] = [VtreeType::Left, VtreeType::Right, VtreeType::Vertical, VtreeType::Balanced];

fn brute_count(fnf: &Fnf) -> BigUint {
    let n = fnf.var_count;
    let mut count = 0u64;
    for bits in 0u64..(1 << n) {
        let holds = |set: &Vec<cnf2dd::lit::Lit>| {
            let value = |i: usize| {
                let lit = set[i];
                (bits >> lit.var().index() & 1 == 1) == lit.is_positive()
            };
            match fnf.kind {
                FnfKind::Cnf => (0..set.len()).any(value),
                FnfKind::Dnf => (0..set.len()).all(value),
            }
        };
        let satisfied = match fnf.kind {
            FnfKind::Cnf => fnf.litsets.iter().all(holds),
            FnfKind::Dnf => fnf.litsets.iter().any(holds),
        };
        if satisfied {
            count += 1;
        }
    }
    BigUint::from(count)
}

fn sdd(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sdd"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ─── Library ───────────────────────────────────────────────────────────────────

#[test]
fn compiled_counts_match_brute_force() {
    for kind in [FnfKind::Cnf, FnfKind::Dnf] {
        let text = FORMULA.replace("cnf", &kind.to_string());
        let fnf = Fnf::parse(kind, text.as_bytes()).unwrap();
        let expected = brute_count(&fnf);
        for vtree_type in VTREE_TYPES {
            for interval in [0, 1, 3] {
                let mut manager = SddManager::new(Vtree::new(fnf.var_count, vtree_type));
                let options = cnf2dd::compiler::CompilerOptions {
                    vtree_search_interval: interval,
                    ..Default::default()
                };
                manager.set_options(&options);
                let f = manager.compile(&fnf).unwrap();
                assert_eq!(manager.model_count(f), expected, "{} under {} every {}", kind, vtree_type, interval);
            }
        }
    }
}

#[test]
fn minimization_and_search_preserve_semantics() {
    let fnf = Fnf::parse(FnfKind::Cnf, FORMULA.as_bytes()).unwrap();
    let mut manager = SddManager::new(Vtree::new(5, VtreeType::Right));
    let f = manager.compile(&fnf).unwrap();
    let card = manager.minimum_cardinality(f).unwrap();

    let min = manager.minimize_cardinality(f);
    assert_eq!(manager.minimum_cardinality(min), Some(card));
    // Every model of the minimized node is a model of f with exactly `card` true variables.
    for bits in 0u32..32 {
        let assignment: Vec<bool> = (0..5).map(|i| bits >> i & 1 == 1).collect();
        if manager.eval(min, &assignment) {
            assert!(manager.eval(f, &assignment));
            assert_eq!(bits.count_ones() as usize, card);
        }
    }

    let before = manager.model_count(min);
    let size = manager.size(min);
    let mut pinned = manager.pin(min);
    pinned.minimize_vtree_limited();
    let relocated = pinned.node();
    drop(pinned);
    assert_eq!(manager.model_count(relocated), before);
    assert!(manager.size(relocated) <= size);
}

#[test]
fn save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let fnf = Fnf::parse(FnfKind::Cnf, FORMULA.as_bytes()).unwrap();
    let expected = {
        let mut manager = SddManager::new(Vtree::new(5, VtreeType::Vertical));
        let f = manager.compile(&fnf).unwrap();
        manager.save(f, dir.path().join("f.sdd")).unwrap();
        manager.vtree().save(dir.path().join("f.vtree")).unwrap();
        (manager.model_count(f), manager.size(f))
    };

    let vtree = Vtree::load(dir.path().join("f.vtree")).unwrap();
    let loaded = SddManager::new(vtree);
    let g = loaded.load(dir.path().join("f.sdd")).unwrap();
    assert_eq!((loaded.model_count(g), loaded.size(g)), expected);
    assert_ne!(g, SddId::FALSE);
}

// ─── Executable ────────────────────────────────────────────────────────────────

#[test]
fn plain_run_prints_one_json_line() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("f.cnf"), FORMULA).unwrap();

    let out = sdd(dir.path(), &["-c", "f.cnf"]);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1);
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert!(json["compilation_time"].is_number());
    assert_eq!(files_in(dir.path()), ["f.cnf"]);

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("reading cnf...vars=5 clauses=4"));
    assert!(stderr.trim_end().ends_with("freeing...done"));
}

#[test]
fn metrics_reported_per_stage() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("f.cnf"), FORMULA).unwrap();

    let out = sdd(dir.path(), &["-c", "f.cnf", "-m", "-q", "-t", "left"]);
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stages: Vec<usize> = stderr.match_indices(" sdd size ").map(|(i, _)| i).collect();
    assert_eq!(stages.len(), 3);
    let minimize = stderr.find("minimizing cardinality").unwrap();
    let search = stderr.find("dynamic vtree (post compilation)").unwrap();
    assert!(stages[0] < minimize && minimize < stages[1]);
    assert!(stages[1] < search && search < stages[2]);
    assert!(stderr.contains(" min cardinality        : "));
}

#[test]
fn exports_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("f.cnf"), FORMULA).unwrap();

    let args = ["-c", "f.cnf", "-R", "f.sdd", "-S", "f.sdd.dot", "-W", "f.vtree", "-V", "f.vtree.dot"];
    let out = sdd(dir.path(), &args);
    assert!(out.status.success());
    assert_eq!(
        files_in(dir.path()),
        ["f.cnf", "f.sdd", "f.sdd.dot", "f.vtree", "f.vtree.dot"]
    );

    let out = sdd(dir.path(), &["-s", "f.sdd", "-v", "f.vtree"]);
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("reading sdd from file..."));
}

#[test]
fn conflicting_inputs_fail() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("f.cnf"), FORMULA).unwrap();
    let out = sdd(dir.path(), &["-c", "f.cnf", "-d", "f.cnf"]);
    assert!(!out.status.success());
    let out = sdd(dir.path(), &["-c", "missing.cnf"]);
    assert!(!out.status.success());
}
