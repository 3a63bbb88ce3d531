pub(crate) mod config;
pub(crate) mod lock;
pub(crate) mod metadata;
pub(crate) mod new;
pub(crate) mod plan;
pub(crate) mod run;
pub(crate) mod version;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use quickpack::{
    commands::{CommandRunner, ShellCommandRunner},
    config::AppConfig,
    fs::FileSystem,
    host::SetuptoolsHost,
    pipeline::Collaborators,
    progress_reporter::ProgressReporter,
    requirements::PypiIndex,
    setup::{SetupDocument, SetupOptions},
    version::{FixedVersionSource, GitVersionSource, VersionSource},
};
use tracing::debug;
use url::Url;

use crate::cli::{ClapCommands, ConfigSubcommands};

/// Primary command dispatcher that routes to the appropriate command handler
pub fn dispatch_command<R: ProgressReporter>(
    command: &ClapCommands,
    root: &Path,
    config: &AppConfig,
    original_config: (AppConfig, Option<PathBuf>),
    reporter: &R,
) -> i32 {
    debug!("Dispatching command: {:?}", command);

    match command {
        ClapCommands::Run(args) => run::handle_run(args, root, config, reporter),
        ClapCommands::Plan => plan::handle_plan(root, config, reporter),
        ClapCommands::Lock(args) => lock::handle_lock(args, root, config, reporter),
        ClapCommands::Metadata(args) => metadata::handle_metadata(args, root, config, reporter),
        ClapCommands::Version => version::handle_version(root, config, reporter),
        ClapCommands::New(args) => new::handle_new(args, root, reporter),
        ClapCommands::Config(config_cmd) => match config_cmd.command {
            ConfigSubcommands::Validate => {
                let (original, path) = original_config;
                config::handle_validate(&original, path, reporter)
            }
        },
    }
}

/// Print `err` and its causes, returning the exit code for a failed command
pub(crate) fn report_failure(reporter: &impl ProgressReporter, err: &anyhow::Error) -> i32 {
    reporter.report_error(err);
    for cause in err.chain().skip(1) {
        reporter.report_info(format!("caused by: {cause}"));
    }
    1
}

/// Load the setup document named by the config, relative to `root`
pub(crate) fn load_document(
    fs: &dyn FileSystem,
    root: &Path,
    config: &AppConfig,
) -> anyhow::Result<SetupDocument> {
    let path = root.join(config.setup_file());
    SetupDocument::load(fs, &path)
        .with_context(|| format!("could not load setup document {}", path.display()))
}

/// Typed options of the setup document named by the config
pub(crate) fn load_options(
    fs: &dyn FileSystem,
    root: &Path,
    config: &AppConfig,
) -> anyhow::Result<SetupOptions> {
    Ok(load_document(fs, root, config)?.project_options(fs)?)
}

pub(crate) fn command_runner(root: &Path, config: &AppConfig) -> Arc<dyn CommandRunner> {
    Arc::new(
        ShellCommandRunner::new(config.shell(), config.command_timeout())
            .with_working_directory(root),
    )
}

/// Wire the real collaborators for a run in `root`
pub(crate) fn collaborators(
    root: &Path,
    config: &AppConfig,
    options: &SetupOptions,
    version_override: Option<&str>,
) -> anyhow::Result<Collaborators> {
    let runner = command_runner(root, config);

    let versions: Arc<dyn VersionSource> = match version_override {
        Some(version) => Arc::new(FixedVersionSource::new(version)),
        None => Arc::new(GitVersionSource::new(Arc::clone(&runner), root)),
    };

    let index_url = match options.freeze_requirements.index_url() {
        Some(url) => Url::parse(url).with_context(|| format!("invalid index URL {url:?}"))?,
        None => config.index_url().clone(),
    };

    Ok(Collaborators {
        versions,
        index: Arc::new(PypiIndex::new(index_url)?),
        host: Arc::new(SetuptoolsHost::new(
            runner,
            config.python(),
            root,
            config.command_timeout(),
        )),
    })
}
