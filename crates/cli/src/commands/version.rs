use std::path::Path;

use quickpack::{
    config::AppConfig,
    progress_reporter::ProgressReporter,
    version::{GitVersionSource, VersionSource},
};

use super::{command_runner, report_failure};

pub(crate) fn handle_version<R: ProgressReporter>(
    root: &Path,
    config: &AppConfig,
    reporter: &R,
) -> i32 {
    let source = GitVersionSource::new(command_runner(root, config), root);

    match source.version() {
        Ok(version) => {
            reporter.report(version);
            0
        }
        Err(err) => report_failure(reporter, &err.into()),
    }
}
