//! One-shot benchmark over the two executables.
//!
//! Each input file is handed to `sdd` and/or `cnf2obdd`, depending on the
//! [`Strategy`], and the JSON line each tool prints on stdout is read back
//! into a log record. The records print as a side-by-side comparison and
//! serialize to a JSON array.

use std::fmt;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{self, Error, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// SDD over a left-linear vtree, no dynamic vtree search.
    Left,
    /// SDD over a right-linear vtree, no dynamic vtree search.
    #[default]
    Right,
    /// Both compilers, each in its best-effort configuration.
    Best,
    /// OBDD compilation only.
    BddBest,
}

impl Strategy {
    fn runs_sdd(self) -> bool {
        !matches!(self, Strategy::BddBest)
    }

    fn runs_cnf2obdd(self) -> bool {
        matches!(self, Strategy::Best | Strategy::BddBest)
    }

    /// Arguments after `-c FILE` for the `sdd` run.
    fn sdd_args(self) -> &'static [&'static str] {
        match self {
            Strategy::Left => &["-t", "left", "-r", "0"],
            Strategy::Right => &["-t", "right", "-r", "0"],
            // Keeps the default dynamic vtree search.
            Strategy::Best | Strategy::BddBest => &["-t", "right"],
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Left => "left linear",
            Strategy::Right => "right linear",
            Strategy::Best => "best fit",
            Strategy::BddBest => "best fit (bdd)",
        })
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Strategy::Left),
            "right" => Ok(Strategy::Right),
            "best" => Ok(Strategy::Best),
            "best-bdd" | "bdd-best" => Ok(Strategy::BddBest),
            _ => Err(format!("unknown strategy: '{}'", s)),
        }
    }
}

/// What `sdd` prints on stdout after compiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SddLog {
    pub compilation_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdd_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdd_count: Option<u64>,
}

/// What `cnf2obdd` prints on stdout after solving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cnf2ObddLog {
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkLog {
    pub file: String,
    pub strategy: Strategy,
    pub sdd: Option<SddLog>,
    pub cnf2obdd: Option<Cnf2ObddLog>,
}

impl fmt::Display for BenchmarkLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===")?;
        writeln!(f, "Benchmark: {} (strategy: {})...", self.file, self.strategy)?;
        writeln!(f, "---")?;
        match &self.sdd {
            Some(sdd) => writeln!(f, "sdd: {:.6}s", sdd.compilation_time)?,
            None => writeln!(f, "no sdd run reported")?,
        }
        writeln!(f, "---")?;
        match &self.cnf2obdd {
            Some(obdd) => write!(f, "cnf2obdd: {:.6}s", obdd.time)?,
            None => write!(f, "no cnf2obdd run reported")?,
        }
        if let (Some(sdd), Some(obdd)) = (&self.sdd, &self.cnf2obdd) {
            write!(f, "\n---\nsdd v cnf2obdd\n")?;
            if sdd.compilation_time > 0.0 {
                write!(
                    f,
                    "{:.2}x speedup (sdd: {:.6}s, cnf2obdd: {:.6}s)",
                    obdd.time / sdd.compilation_time,
                    sdd.compilation_time,
                    obdd.time
                )?;
            } else {
                write!(f, "sdd finished below timer resolution")?;
            }
        }
        Ok(())
    }
}

/// Locations of the benchmarked executables.
#[derive(Debug, Clone)]
pub struct Tools {
    pub sdd: PathBuf,
    pub cnf2obdd: PathBuf,
    /// Pass the tools' stderr through instead of discarding it.
    pub debug: bool,
}

impl Tools {
    /// The executables installed next to `exe`.
    pub fn beside(exe: &Path) -> Self {
        let name = |tool: &str| exe.with_file_name(format!("{}{}", tool, std::env::consts::EXE_SUFFIX));
        Self {
            sdd: name("sdd"),
            cnf2obdd: name("cnf2obdd"),
            debug: false,
        }
    }

    /// Runs `program` and parses its stdout as one JSON record.
    ///
    /// Only a failure to start the program is an error. A failed run or
    /// unreadable output is logged and yields `None`.
    fn run<T: DeserializeOwned>(&self, program: &Path, args: &[&str]) -> Result<Option<T>> {
        let mut command = Command::new(program);
        command.args(args).stdout(Stdio::piped());
        if !self.debug {
            command.stderr(Stdio::null());
        }
        debug!("running {:?}", command);

        let output = command
            .output()
            .map_err(|source| Error::Run {
                program: program.to_path_buf(),
                source,
            })?;
        match serde_json::from_slice(&output.stdout) {
            Ok(log) => Ok(Some(log)),
            Err(e) => {
                warn!("{} exited with {}: {}", program.display(), output.status, e);
                Ok(None)
            }
        }
    }

    pub fn sdd(&self, file: &str, strategy: Strategy) -> Result<Option<SddLog>> {
        if !strategy.runs_sdd() {
            return Ok(None);
        }
        let mut args = vec!["-c", file];
        args.extend_from_slice(strategy.sdd_args());
        self.run(&self.sdd, &args)
    }

    pub fn cnf2obdd(&self, file: &str, strategy: Strategy) -> Result<Option<Cnf2ObddLog>> {
        if !strategy.runs_cnf2obdd() {
            return Ok(None);
        }
        self.run(&self.cnf2obdd, &[file])
    }
}

/// Benchmarks every file in turn.
pub fn benchmark(files: &[String], strategy: Strategy, tools: &Tools) -> Result<Vec<BenchmarkLog>> {
    files
        .iter()
        .map(|file| {
            Ok(BenchmarkLog {
                file: file.clone(),
                strategy,
                sdd: tools.sdd(file, strategy)?,
                cnf2obdd: tools.cnf2obdd(file, strategy)?,
            })
        })
        .collect()
}

/// Writes the logs as a pretty-printed JSON array.
pub fn save(logs: &[BenchmarkLog], path: impl AsRef<Path>) -> Result<()> {
    let mut file = BufWriter::new(error::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut file, logs).map_err(io::Error::from)?;
    file.flush()?;
    Ok(())
}
