mod cli;
mod commands;
mod config;
mod formatters;
mod tables;

use std::{env, io, process};

use clap::Parser;
use quickpack::{
    config::{ApplyToConfig, ConfigLoader, YamlLoader},
    fs::RealFileSystem,
    progress_reporter::TerminalProgressReporter,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::{cli::ClapCli, commands::dispatch_command};

/// Overrides the log filter, e.g. `QUICKPACK_LOG=quickpack=trace`
const LOG_ENV: &str = "QUICKPACK_LOG";

fn main() -> anyhow::Result<()> {
    let args = ClapCli::parse();
    init_tracing(args.verbose);
    debug!("CLI arguments: {:#?}", &args);

    let fs = RealFileSystem;

    // `original_config` is the config file alone, for the `config` commands
    let loader = YamlLoader::new(&fs);
    let (config, original_config) = {
        let config = loader.load_config()?;
        (args.apply_to_config(config.clone()), config)
    };
    let config_path = loader.find_config_file_paths()?.into_iter().next();

    debug!("Final config: {:#?}", &config);

    let root = match &args.directory {
        Some(dir) => dir.clone(),
        None => env::current_dir()?,
    };

    let reporter = TerminalProgressReporter::new(config.use_colors());

    let exit_code = dispatch_command(
        &args.command,
        &root,
        &config,
        (original_config, config_path),
        &reporter,
    );

    process::exit(exit_code)
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "warn" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
