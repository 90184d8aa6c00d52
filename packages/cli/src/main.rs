mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, parse, replay, schema, CheckArgs, ParseArgs, ReplayArgs, SchemaArgs};
use tracing_subscriber::EnvFilter;

/// Quire CLI - inspect and exercise the quire editor core
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the merged schema and who contributed each type
    Schema(SchemaArgs),

    /// Parse a content file through a string handler
    Parse(ParseArgs),

    /// Validate a JSON document against the merged schema
    Check(CheckArgs),

    /// Run a script of commands through a headless editor
    Replay(ReplayArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Schema(args) => schema(args, &cwd),
        Command::Parse(args) => parse(args, &cwd),
        Command::Check(args) => check(args, &cwd),
        Command::Replay(args) => replay(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
