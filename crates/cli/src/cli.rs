use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use quickpack::lock::parse_timestamp;
use url::Url;

/// Quickpack - build-time packaging for Python libraries
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct ClapCli {
    /// Project root (defaults to the current directory)
    #[clap(long, short = 'C', global = true)]
    pub(crate) directory: Option<PathBuf>,

    /// Setup document, relative to the project root
    #[clap(long, short = 's', global = true)]
    pub(crate) setup_file: Option<PathBuf>,

    /// Show detailed output
    #[clap(long, short = 'v', global = true, default_value_t = false)]
    pub(crate) verbose: bool,

    /// Disable colored output
    #[clap(long, global = true, default_value_t = false)]
    pub(crate) no_color: bool,

    /// Interpreter that runs the host toolchain
    #[clap(long, global = true)]
    pub(crate) python: Option<String>,

    /// Package index used to freeze requirements
    #[clap(long, global = true)]
    pub(crate) index_url: Option<Url>,

    #[clap(subcommand)]
    pub(crate) command: ClapCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum ClapCommands {
    /// Assemble the pipeline and run it
    Run(RunArgs),

    /// Show the assembled pipeline without running it
    Plan,

    /// Package a companion library pinning a release and its whole dependency tree
    Lock(LockArgs),

    /// Print the record the host toolchain would receive, as JSON
    Metadata(MetadataArgs),

    /// Print the version derived from version control
    Version,

    /// Scaffold a new library
    New(NewArgs),

    /// Configuration management commands
    Config(ConfigCommands),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct RunArgs {
    /// Use this version instead of asking version control
    #[clap(long)]
    pub(crate) version_override: Option<String>,

    /// Also write the stamped version to this file
    #[clap(long)]
    pub(crate) write_version_file: Option<PathBuf>,

    /// Arguments for the host toolchain (default: sdist)
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub(crate) host_args: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct LockArgs {
    /// Lock this version of the target (default: from the setup document or version control)
    #[clap(long = "version")]
    pub(crate) target_version: Option<String>,

    /// Timestamp for the lock templates, as YYYYMMDDTHHMMSS (default: now)
    #[clap(long, value_parser = parse_timestamp)]
    pub(crate) timestamp: Option<NaiveDateTime>,

    /// Allow pre-releases anywhere in the dependency tree
    #[clap(long, default_value_t = false)]
    pub(crate) pre: bool,

    /// Arguments for the host toolchain (default: sdist)
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub(crate) host_args: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct MetadataArgs {
    /// Use this version instead of asking version control
    #[clap(long)]
    pub(crate) version_override: Option<String>,

    /// Write the JSON to this file instead of standard output
    #[clap(long, short = 'o')]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct NewArgs {
    /// Directory to create the library in
    pub(crate) path: PathBuf,

    /// Distribution name
    #[clap(long)]
    pub(crate) name: Option<String>,

    /// Top-level import package
    #[clap(long)]
    pub(crate) package: Option<String>,

    #[clap(long)]
    pub(crate) description: Option<String>,

    #[clap(long)]
    pub(crate) url: Option<String>,

    #[clap(long)]
    pub(crate) author: Option<String>,

    #[clap(long)]
    pub(crate) author_email: Option<String>,

    /// Never prompt; use defaults for anything not given
    #[clap(long, default_value_t = false)]
    pub(crate) no_input: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ConfigCommands {
    #[clap(subcommand)]
    pub(crate) command: ConfigSubcommands,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum ConfigSubcommands {
    /// Validate the quickpack configuration
    Validate,
}
