use std::{path::Path, sync::Arc};

use quickpack::{
    config::AppConfig,
    fs::{FileSystem, RealFileSystem},
    ledger::VirtualFileLedger,
    pipeline::{PipelineAssembler, PipelineRunner, RunSummary},
    progress_reporter::ProgressReporter,
};
use tracing::info;

use super::{collaborators, load_options, report_failure};
use crate::{cli::RunArgs, formatters::format_version};

/// Host arguments used when none are given on the command line
const DEFAULT_HOST_ARGS: &[&str] = &["sdist"];

pub(crate) fn default_host_args() -> Vec<String> {
    DEFAULT_HOST_ARGS.iter().map(ToString::to_string).collect()
}

pub(crate) fn handle_run<R: ProgressReporter>(
    args: &RunArgs,
    root: &Path,
    config: &AppConfig,
    reporter: &R,
) -> i32 {
    match run(args, root, config, reporter) {
        Ok(summary) => {
            reporter.report_success(format!(
                "Built {} {} ({} steps, {} virtual files cleaned up)",
                summary.name,
                format_version(summary.version.as_deref()),
                summary.executed.len(),
                summary.teardown.touched(),
            ));
            0
        }
        Err(err) => report_failure(reporter, &err),
    }
}

fn run<R: ProgressReporter>(
    args: &RunArgs,
    root: &Path,
    config: &AppConfig,
    reporter: &R,
) -> anyhow::Result<RunSummary> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let options = load_options(fs.as_ref(), root, config)?;

    let host_args = if args.host_args.is_empty() {
        default_host_args()
    } else {
        args.host_args.clone()
    };

    let assembler = PipelineAssembler::new(
        Arc::clone(&fs),
        root,
        collaborators(root, config, &options, args.version_override.as_deref())?,
    )
    .with_host_args(host_args)
    .with_version_file(args.write_version_file.clone());

    let mode = assembler.detect_mode();
    info!(root = %root.display(), %mode, "Starting run");
    reporter.report_info(format!("Project {} ({mode})", root.display()));

    let pipeline = assembler.assemble(&options, mode)?;
    let mut ledger = VirtualFileLedger::new(fs);

    Ok(PipelineRunner::new(reporter).run(pipeline, &mut ledger)?)
}
