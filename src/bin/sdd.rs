use std::io;
use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use cnf2dd::compiler::{self, CompilerOptions};
use cnf2dd::sdd::VtreeType;

/// Compile a CNF or DNF into a sentential decision diagram.
#[derive(Debug, Parser)]
#[command(author, group(ArgGroup::new("input").required(true).args(["cnf", "dnf", "sdd"])))]
struct Cli {
    /// Input CNF file.
    #[arg(short = 'c', value_name = "FILE")]
    cnf: Option<PathBuf>,

    /// Input DNF file.
    #[arg(short = 'd', value_name = "FILE")]
    dnf: Option<PathBuf>,

    /// Input SDD file (skips compilation).
    #[arg(short = 's', value_name = "FILE")]
    sdd: Option<PathBuf>,

    /// Input vtree file.
    #[arg(short = 'v', value_name = "FILE")]
    vtree: Option<PathBuf>,

    /// Initial vtree type: left, right, vertical or balanced.
    #[arg(short = 't', value_name = "TYPE", default_value = "balanced")]
    vtree_type: VtreeType,

    /// Minimize the cardinality of the compiled SDD.
    #[arg(short = 'm')]
    minimize_cardinality: bool,

    /// Search for a better vtree after compilation.
    #[arg(short = 'q')]
    post_search: bool,

    /// Verbose output: dump the manager after each stage.
    #[arg(short = 'p')]
    verbose: bool,

    /// Search for a better vtree after every K clauses or terms (0 disables).
    #[arg(short = 'r', value_name = "K", default_value_t = 0)]
    vtree_search_interval: usize,

    /// Output SDD file.
    #[arg(short = 'R', value_name = "FILE")]
    output_sdd: Option<PathBuf>,

    /// Output SDD file in DOT format.
    #[arg(short = 'S', value_name = "FILE")]
    output_sdd_dot: Option<PathBuf>,

    /// Output vtree file.
    #[arg(short = 'W', value_name = "FILE")]
    output_vtree: Option<PathBuf>,

    /// Output vtree file in DOT format.
    #[arg(short = 'V', value_name = "FILE")]
    output_vtree_dot: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: simplelog::LevelFilter,
}

impl From<Cli> for CompilerOptions {
    fn from(args: Cli) -> Self {
        Self {
            cnf: args.cnf,
            dnf: args.dnf,
            sdd: args.sdd,
            vtree: args.vtree,
            vtree_type: args.vtree_type,
            minimize_cardinality: args.minimize_cardinality,
            post_search: args.post_search,
            vtree_search_interval: args.vtree_search_interval,
            output_sdd: args.output_sdd,
            output_sdd_dot: args.output_sdd_dot,
            output_vtree: args.output_vtree,
            output_vtree_dot: args.output_vtree_dot,
            verbose: args.verbose,
        }
    }
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

    let options = CompilerOptions::from(args);
    log::debug!("options = {:?}", options);

    let stderr = io::stderr();
    let stdout = io::stdout();
    compiler::run(&options, &mut stderr.lock(), &mut stdout.lock())?;
    Ok(())
}
