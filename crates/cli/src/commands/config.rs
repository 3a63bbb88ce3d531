use std::path::PathBuf;

use quickpack::{config::AppConfig, progress_reporter::ProgressReporter};
use tracing::info;

use crate::tables::ValidationTableReporter;

pub(crate) fn handle_validate<R: ProgressReporter>(
    original_config: &AppConfig,
    config_path: Option<PathBuf>,
    reporter: &R,
) -> i32 {
    info!("Validating configuration");

    let result = original_config.validate(config_path);
    let source = result
        .config_file_path()
        .map_or_else(|| "defaults (no config file)".to_string(), |p| p.display().to_string());
    let issues = result.issues();

    if issues.has_errors() {
        reporter.report_error(format!("Configuration is invalid: {source}"));

        ValidationTableReporter::new()
            .add_validation_errors(issues.errors(), reporter)
            .add_validation_warnings(issues.warnings(), reporter)
            .print();
        1
    } else if issues.warnings().next().is_some() {
        reporter.report_warning(format!("Configuration is valid, with warnings: {source}"));

        ValidationTableReporter::new()
            .add_validation_warnings(issues.warnings(), reporter)
            .print();
        0
    } else {
        reporter.report_success(format!("Configuration is valid: {source}"));

        0
    }
}
