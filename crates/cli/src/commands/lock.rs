use std::{path::Path, sync::Arc};

use anyhow::bail;
use chrono::Local;
use quickpack::{
    config::AppConfig,
    fs::{FileSystem, RealFileSystem},
    ledger::VirtualFileLedger,
    lock::{LockPlan, LockRequest, plan_lock},
    pipeline::{PackagingMode, PipelineAssembler, PipelineRunner, RunSummary},
    progress_reporter::ProgressReporter,
};
use tracing::info;

use super::{collaborators, load_document, report_failure, run::default_host_args};
use crate::{cli::LockArgs, formatters::format_version};

pub(crate) fn handle_lock<R: ProgressReporter>(
    args: &LockArgs,
    root: &Path,
    config: &AppConfig,
    reporter: &R,
) -> i32 {
    match lock(args, root, config, reporter) {
        Ok((plan, summary)) => {
            reporter.report_success(format!(
                "Locked {} {} as {} {} ({} pinned requirements)",
                plan.target_name,
                plan.target_version,
                summary.name,
                format_version(summary.version.as_deref()),
                plan.requirements.len(),
            ));
            0
        }
        Err(err) => report_failure(reporter, &err),
    }
}

fn lock<R: ProgressReporter>(
    args: &LockArgs,
    root: &Path,
    config: &AppConfig,
    reporter: &R,
) -> anyhow::Result<(LockPlan, RunSummary)> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let document = load_document(fs.as_ref(), root, config)?;
    let options = document.project_options(fs.as_ref())?;
    let collaborators = collaborators(root, config, &options, None)?;

    let request = LockRequest {
        version: args.target_version.clone(),
        timestamp: args
            .timestamp
            .unwrap_or_else(|| Local::now().naive_local()),
        prereleases: args.pre,
    };
    let plan = plan_lock(
        &document,
        &request,
        collaborators.versions.as_ref(),
        collaborators.index.as_ref(),
    )?;
    reporter.report_info(format!(
        "Pinned {} {}:",
        plan.target_name, plan.target_version
    ));
    for line in &plan.requirements {
        reporter.report_info(format!("  {line}"));
    }

    let host_args = if args.host_args.is_empty() {
        default_host_args()
    } else {
        args.host_args.clone()
    };
    let assembler = PipelineAssembler::new(Arc::clone(&fs), root, collaborators)
        .with_host_args(host_args);
    if assembler.detect_mode() == PackagingMode::AlreadyPackaged {
        bail!("{} is a built distribution; lock from the source tree", root.display());
    }
    info!(root = %root.display(), name = ?plan.options.name, "Packaging locked library");

    let pipeline = assembler.assemble(&plan.options, PackagingMode::Packaging)?;
    let mut ledger = VirtualFileLedger::new(fs);
    let summary = PipelineRunner::new(reporter).run(pipeline, &mut ledger)?;

    Ok((plan, summary))
}
