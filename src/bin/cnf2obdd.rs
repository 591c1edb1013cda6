use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cnf2dd::cnf2obdd::{self, Options};
use cnf2dd::error::Error;
use cnf2dd::interrupt::{self, Interrupt};
use cnf2dd::solver::{Backtrack, CacheKind, CountingMode, Enumeration, SolverConfig, Uip};

#[derive(Debug, Parser)]
#[command(author, version, disable_help_flag = true)]
struct Cli {
    input: PathBuf,

    output: Option<PathBuf>,

    /// Diagram nodes added between refreshes of the subproblem caches (nodes are kept).
    #[arg(short = 'n', value_name = "INT", value_parser = clap::value_parser!(u64).range(1..))]
    max_nodes: Option<u64>,

    #[arg(long, value_name = "cutset|separator", default_value = "cutset")]
    cache: CacheKind,

    #[arg(long, value_name = "blocking|non-blocking", default_value = "non-blocking")]
    enumeration: Enumeration,

    #[arg(long, value_name = "bt|bj|cbj|bj-cbj", default_value = "bj-cbj")]
    backtrack: Backtrack,

    #[arg(long, value_name = "dlevel|sublevel", default_value = "sublevel")]
    uip: Uip,

    #[arg(long, value_name = "exact|bounded", default_value = "exact")]
    counting: CountingMode,

    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: simplelog::LevelFilter,
}

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let program = std::env::args().next().unwrap_or_else(|| "cnf2obdd".to_string());
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) if e.kind() == clap::error::ErrorKind::DisplayVersion => {
            e.print()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(_) => {
            eprint!("{}", cnf2obdd::usage(&program));
            return Ok(ExitCode::SUCCESS);
        }
    };

    simplelog::TermLogger::init(
        args.log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    if interrupt::install_sigint_handler().is_err() {
        eprintln!("ERROR! Could not set signal");
        return Ok(ExitCode::from(1));
    }

    let options = Options {
        input: args.input,
        output: args.output,
        config: SolverConfig {
            cache: args.cache,
            enumeration: args.enumeration,
            backtrack: args.backtrack,
            uip: args.uip,
            counting: args.counting,
            max_nodes: args.max_nodes.map(|n| n as usize),
            verbosity: 0,
        },
    };
    log::debug!("options = {:?}", options);

    let stderr = io::stderr();
    let stdout = io::stdout();
    match cnf2obdd::run(&options, Interrupt::process(), &mut stderr.lock(), &mut stdout.lock()) {
        Ok(exit) => Ok(ExitCode::from(exit.code())),
        Err(e @ (Error::Open { .. } | Error::Parse(_))) => {
            eprintln!("{}", e);
            Ok(ExitCode::from(1))
        }
        Err(e) => Err(e.into()),
    }
}
