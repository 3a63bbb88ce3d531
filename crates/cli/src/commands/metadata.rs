use std::{path::Path, sync::Arc};

use anyhow::Context;
use quickpack::{
    config::AppConfig,
    fs::{FileSystem, RealFileSystem},
    pipeline::PipelineAssembler,
    progress_reporter::ProgressReporter,
};

use super::{collaborators, load_options, report_failure};
use crate::cli::MetadataArgs;

pub(crate) fn handle_metadata<R: ProgressReporter>(
    args: &MetadataArgs,
    root: &Path,
    config: &AppConfig,
    reporter: &R,
) -> i32 {
    let fs = RealFileSystem;
    let written = export(args, root, config).and_then(|json| match &args.output {
        Some(path) => {
            fs.write_file(path, format!("{json}\n").as_bytes())
                .with_context(|| format!("could not write {}", path.display()))?;
            reporter.report_success(format!("Wrote metadata to {}", path.display()));
            Ok(())
        }
        None => {
            reporter.report(json);
            Ok(())
        }
    });

    match written {
        Ok(()) => 0,
        Err(err) => report_failure(reporter, &err),
    }
}

fn export(args: &MetadataArgs, root: &Path, config: &AppConfig) -> anyhow::Result<String> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let options = load_options(fs.as_ref(), root, config)?;
    let assembler = PipelineAssembler::new(
        Arc::clone(&fs),
        root,
        collaborators(root, config, &options, args.version_override.as_deref())?,
    );

    let record = assembler.export_metadata(&options)?;
    Ok(serde_json::to_string_pretty(&record)?)
}
