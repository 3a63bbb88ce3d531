use std::{path::Path, sync::Arc};

use quickpack::{
    config::AppConfig,
    fs::{FileSystem, RealFileSystem},
    pipeline::{Pipeline, PipelineAssembler},
    progress_reporter::ProgressReporter,
    steps::StepOption,
};

use super::{collaborators, load_options, report_failure, run::default_host_args};
use crate::{
    formatters::{format_step_id, format_version},
    tables::PlanTableReporter,
};

pub(crate) fn handle_plan<R: ProgressReporter>(
    root: &Path,
    config: &AppConfig,
    reporter: &R,
) -> i32 {
    match assemble(root, config) {
        Ok(pipeline) => {
            reporter.report_info(format!(
                "{} {} ({})",
                pipeline.context.name,
                format_version(pipeline.context.version.as_deref()),
                pipeline.mode,
            ));
            print_plan(&pipeline, config.use_colors());
            0
        }
        Err(err) => report_failure(reporter, &err),
    }
}

fn assemble(root: &Path, config: &AppConfig) -> anyhow::Result<Pipeline> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let options = load_options(fs.as_ref(), root, config)?;
    let assembler = PipelineAssembler::new(
        Arc::clone(&fs),
        root,
        collaborators(root, config, &options, None)?,
    )
    .with_host_args(default_host_args());
    let mode = assembler.detect_mode();

    Ok(assembler.assemble(&options, mode)?)
}

fn print_plan(pipeline: &Pipeline, use_colors: bool) {
    let mut table = PlanTableReporter::new();

    for (index, step) in pipeline.steps.iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            format_step_id(step.id().as_str(), use_colors),
            step.kind().to_string(),
            step.description(),
            format_options(&step.options()),
        ]);
    }

    table.print();
}

fn format_options(options: &[StepOption]) -> String {
    options
        .iter()
        .map(|option| {
            if option.value == option.default {
                format!("{}={}", option.name, option.value)
            } else {
                format!("{}={} (default: {})", option.name, option.value, option.default)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_options_marks_non_defaults() {
        let options = vec![
            StepOption::new("mode", "persist", "persist"),
            StepOption::new("file", "deps.txt", "dynamic_requirements.txt"),
        ];

        assert_eq!(
            format_options(&options),
            "mode=persist\nfile=deps.txt (default: dynamic_requirements.txt)"
        );
    }
}
