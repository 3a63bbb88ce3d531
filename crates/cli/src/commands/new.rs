use std::path::Path;

use console::Term;
use dialoguer::Input;
use quickpack::{
    fs::RealFileSystem,
    progress_reporter::ProgressReporter,
    scaffold::{ScaffoldRequest, default_package_name, scaffold},
};

use super::report_failure;
use crate::cli::NewArgs;

pub(crate) fn handle_new<R: ProgressReporter>(args: &NewArgs, root: &Path, reporter: &R) -> i32 {
    let target = root.join(&args.path);
    let interactive = !args.no_input && Term::stdout().is_term();

    let request = match build_request(args, &target, interactive) {
        Ok(request) => request,
        Err(err) => return report_failure(reporter, &err),
    };

    match scaffold(&RealFileSystem, &target, &request) {
        Ok(written) => {
            for path in &written {
                reporter.report_progress(format!("created {}", path.display()));
            }
            reporter.report_success(format!(
                "Created {} in {}",
                request.name,
                target.display()
            ));
            0
        }
        Err(err) => report_failure(reporter, &err.into()),
    }
}

fn build_request(args: &NewArgs, target: &Path, interactive: bool) -> anyhow::Result<ScaffoldRequest> {
    let fallback_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = match &args.name {
        Some(name) => name.clone(),
        None if interactive => Input::<String>::new()
            .with_prompt("Library name")
            .default(fallback_name)
            .interact_text()?,
        None => fallback_name,
    };

    let package = match &args.package {
        Some(package) => package.clone(),
        None if interactive => Input::<String>::new()
            .with_prompt("Top-level package")
            .default(default_package_name(&name))
            .interact_text()?,
        None => default_package_name(&name),
    };

    let description = match &args.description {
        Some(description) => Some(description.clone()),
        None if interactive => optional(
            Input::<String>::new()
                .with_prompt("Description")
                .allow_empty(true)
                .interact_text()?,
        ),
        None => None,
    };

    Ok(ScaffoldRequest {
        name,
        package,
        description,
        url: args.url.clone(),
        author: args.author.clone(),
        author_email: args.author_email.clone(),
    })
}

fn optional(answer: String) -> Option<String> {
    let answer = answer.trim();
    (!answer.is_empty()).then(|| answer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use crate::cli::{ClapCli, ClapCommands};

    fn new_args(argv: &[&str]) -> NewArgs {
        let mut full = vec!["quickpack", "new"];
        full.extend_from_slice(argv);
        match ClapCli::parse_from(full).command {
            ClapCommands::New(args) => args,
            other => panic!("expected new, got {other:?}"),
        }
    }

    #[test]
    fn test_non_interactive_request_uses_directory_name() {
        let args = new_args(&["libs/My-Lib", "--no-input"]);

        let request = build_request(&args, Path::new("/work/libs/My-Lib"), false).unwrap();

        assert_eq!(request.name, "My-Lib");
        assert_eq!(request.package, "my_lib");
        assert_eq!(request.description, None);
    }

    #[test]
    fn test_explicit_values_win() {
        let args = new_args(&[
            "lib",
            "--name",
            "fancy",
            "--package",
            "fancy_core",
            "--description",
            "Fancy things",
            "--author",
            "ACME Inc.",
        ]);

        let request = build_request(&args, Path::new("/work/lib"), false).unwrap();

        assert_eq!(request.name, "fancy");
        assert_eq!(request.package, "fancy_core");
        assert_eq!(request.description.as_deref(), Some("Fancy things"));
        assert_eq!(request.author.as_deref(), Some("ACME Inc."));
    }
}
