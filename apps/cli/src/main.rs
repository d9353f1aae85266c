//! `loanpool` command-line tool
//!
//! - `bench`: run concurrent acquire/insert/release cycles against a
//!   SQLite-backed pool and print the resulting statistics
//! - `config`: print the effective layered configuration as TOML

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod bench;
mod config;

use crate::bench::BenchArgs;
use crate::config::{AppConfig, Overrides};

#[derive(Parser, Debug)]
#[command(
    name = "loanpool",
    author,
    version,
    about = "Exercise and inspect a bounded SQLite connection pool",
    after_help = config::ENV_HELP
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short = 'c', global = true, env = "LOANPOOL_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a concurrent load against a pool and report statistics
    Bench {
        #[command(flatten)]
        overrides: Overrides,
        #[command(flatten)]
        args: BenchArgs,
    },
    /// Print the effective configuration as TOML
    Config {
        #[command(flatten)]
        overrides: Overrides,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench { overrides, args } => {
            let config = AppConfig::load(cli.config.as_deref(), &overrides)?;
            let _logger = loanpool_log::init(config.logging.clone())?;

            let pool = loanpool_sqlite::pool(config.sqlite_config(), config.pool_config()?)
                .with_context(|| {
                    format!("failed to open pool on {}", config.sqlite.path.display())
                })?;
            let report = bench::run(&pool, &args);
            pool.shutdown();

            println!("{}", report?.render(args.format)?);
        }
        Commands::Config { overrides } => {
            let config = AppConfig::load(cli.config.as_deref(), &overrides)?;
            config.pool_config()?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
