//! Main entry point for the migrator CLI tool (§6.1).

mod cli;

use clap::Parser;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::Write;

use cli::Cli;

fn main() {
    human_panic::setup_panic!();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    };

    init_logging(cli.verbose);

    let result = migrator_core::execute_migrations(
        cli.db_type,
        &cli.connection,
        &cli.path,
        Vec::new(),
    );

    match result {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            log::error!("{err}");
            std::process::exit(-1);
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .filter(Some("migrator_core"), level)
        .filter_level(level)
        .target(Target::Stdout)
        .init();
}
