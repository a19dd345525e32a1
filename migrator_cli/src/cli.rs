//! Defines the CLI argument surface: `-t/--type`, `-c/--connection`,
//! `-p/--path`, `-v/--verbose` (§6.1).

use std::path::PathBuf;

use clap::Parser;
use migrator_core::DbType;

#[derive(Parser)]
#[command(name = "migrator", version, about = "Apply pending schema migrations to a database")]
pub struct Cli {
    /// Target database dialect.
    #[arg(short = 't', long = "type", value_parser = parse_db_type)]
    pub db_type: DbType,

    /// Connection string for the target database.
    #[arg(short = 'c', long = "connection")]
    pub connection: String,

    /// Directory containing migration artifacts.
    #[arg(short = 'p', long = "path")]
    pub path: PathBuf,

    /// Raise the log threshold from Info to Debug.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

fn parse_db_type(raw: &str) -> Result<DbType, String> {
    raw.parse().map_err(|err| format!("{err}"))
}
