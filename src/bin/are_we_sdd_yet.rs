use std::path::PathBuf;

use clap::Parser;

use cnf2dd::bench::{self, Strategy, Tools};

/// Times `sdd` and `cnf2obdd` on a batch of CNF files.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Show the tools' own progress output.
    #[arg(short, long)]
    debug: bool,

    /// CNF files to benchmark.
    #[arg(short, long, num_args = 1..)]
    files: Vec<String>,

    #[arg(short, long, value_name = "left|right|best|best-bdd", default_value = "right")]
    mode: Strategy,

    /// Write all results as pretty JSON to this file.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// `sdd` executable [default: next to this one]
    #[arg(long, value_name = "PATH")]
    path_to_sdd: Option<PathBuf>,

    /// `cnf2obdd` executable [default: next to this one]
    #[arg(long, value_name = "PATH")]
    path_to_cnf2obdd: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: simplelog::LevelFilter,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        args.log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let mut tools = Tools::beside(&std::env::current_exe()?);
    if let Some(path) = args.path_to_sdd {
        tools.sdd = path;
    }
    if let Some(path) = args.path_to_cnf2obdd {
        tools.cnf2obdd = path;
    }
    tools.debug = args.debug;
    log::debug!("tools = {:?}", tools);

    let logs = bench::benchmark(&args.files, args.mode, &tools)?;
    for log in &logs {
        println!("{}", log);
    }

    if let Some(path) = &args.output {
        println!("Writing to {}...", path.display());
        bench::save(&logs, path)?;
    }

    Ok(())
}
