use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::Pipeline;
use crate::ledger::{LedgerError, TeardownAction, TeardownReport, VirtualFileLedger};
use crate::progress_reporter::ProgressReporter;
use crate::steps::{StepError, StepId, StepKind};

#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("step {step} failed: {source}")]
    Step {
        step: StepId,
        #[source]
        source: StepError,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub name: String,
    pub version: Option<String>,
    /// Steps that ran to completion, in order
    pub executed: Vec<StepId>,
    pub teardown: TeardownReport,
}

/// Executes an assembled pipeline against a ledger
pub struct PipelineRunner<'a, R: ProgressReporter> {
    reporter: &'a R,
}

impl<'a, R: ProgressReporter> PipelineRunner<'a, R> {
    pub fn new(reporter: &'a R) -> Self {
        Self { reporter }
    }

    /// Run every step in order, then tear the ledger down
    ///
    /// After the first failure the remaining content steps are skipped, finalizers still run
    /// with their errors suppressed, and the ledger is torn down before the original error is
    /// returned. The ledger is torn down on success too.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Ledger`] if the ledger was already used, or
    /// [`PipelineError::Step`] for the first step that failed.
    #[instrument(skip_all, fields(mode = %pipeline.mode, steps = pipeline.steps.len()))]
    pub fn run(
        &self,
        pipeline: Pipeline,
        ledger: &mut VirtualFileLedger,
    ) -> Result<RunSummary, PipelineError> {
        ledger.open()?;

        let Pipeline {
            mut context, steps, ..
        } = pipeline;
        let total = steps.len();
        let mut failure: Option<(StepId, StepError)> = None;
        let mut executed = Vec::with_capacity(total);

        for (index, step) in steps.iter().enumerate() {
            let id = step.id();
            let kind = step.kind();
            if failure.is_some() && kind == StepKind::Content {
                debug!(step = %id, "Skipping step after failure");
                continue;
            }

            self.reporter.report_step(index + 1, total, id, kind);
            let result = step
                .validate(&context, ledger)
                .and_then(|()| step.execute(&mut context, ledger));

            match result {
                Ok(()) => {
                    debug!(step = %id, "Step completed");
                    executed.push(id);
                }
                Err(err) if failure.is_some() => {
                    warn!(step = %id, error = %err, "Finalizer failed after an earlier failure");
                    self.reporter
                        .report_warning(format!("{id} also failed during cleanup: {err}"));
                }
                Err(err) => {
                    error!(step = %id, error = %err, "Step failed, unwinding");
                    self.reporter.report_error(format!("{id} failed: {err}"));
                    failure = Some((id, err));
                }
            }
        }

        let leftover = ledger.teardown_with(|action, path| match action {
            TeardownAction::Remove => info!(path = %path.display(), "Removing leftover virtual file"),
            TeardownAction::Revert => info!(path = %path.display(), "Reverting leftover virtual file"),
        });
        context.teardown.merge(leftover);
        for failed in &context.teardown.failures {
            self.reporter.report_warning(format!(
                "could not {} {}: {}",
                failed.action,
                failed.path.display(),
                failed.error
            ));
        }

        if let Some((step, source)) = failure {
            return Err(PipelineError::Step { step, source });
        }

        info!(steps = executed.len(), "Pipeline completed");
        Ok(RunSummary {
            name: context.name,
            version: context.version,
            executed,
            teardown: context.teardown,
        })
    }
}
