//! tslua - TypeScript to Lua compiler
//!
//! CLI driver for lowering TypeScript files to Lua syntax trees.

mod commands;
mod config;
mod driver;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// TypeScript to Lua compiler
#[derive(Parser, Debug)]
#[command(name = "tslua")]
#[command(author, version, about = "Lower TypeScript to Lua")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lower one TypeScript file and print its Lua tree as JSON
    Compile(commands::compile::CompileArgs),

    /// Lower every TypeScript file under a path and report errors
    Check(commands::check::CheckArgs),

    /// Write a default tslua.toml
    Init(commands::init::InitArgs),

    /// Explain a diagnostic code
    Explain(commands::explain::ExplainArgs),
}

/// `RUST_LOG` wins; otherwise `-v` raises the default filter.
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let use_color = !cli.no_color && !cli.quiet && atty::is(atty::Stream::Stdout);

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Compile(args) => commands::compile::run(args, cli.format, use_color, cli.quiet),
        Commands::Check(args) => commands::check::run(args, cli.format, use_color, cli.quiet),
        Commands::Init(args) => commands::init::run(args, cli.format, use_color),
        Commands::Explain(args) => commands::explain::run(args, cli.format, use_color),
    }
}
