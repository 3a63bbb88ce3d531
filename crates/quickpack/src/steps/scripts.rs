use std::{collections::BTreeMap, path::PathBuf};

use tracing::info;

use super::{BuildStep, StepError, StepId, StepOption};
use crate::context::BuildContext;
use crate::ledger::VirtualFileLedger;
use crate::setup::ConsoleScript;

/// Name of the generated trampoline module inside each top-level package
pub const HOOK_MODULE: &str = "__scripthooks__";

/// A console script routed through a generated trampoline function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHook {
    pub script: String,
    /// Module run as `__main__`
    pub module: String,
    pub top_package: String,
    pub function: String,
}

impl ScriptHook {
    /// `top.__scripthooks__`
    #[must_use]
    pub fn hook_module(&self) -> String {
        format!("{}.{HOOK_MODULE}", self.top_package)
    }

    /// The `name=module:function` console entry point
    #[must_use]
    pub fn entry_point(&self) -> String {
        format!("{}={}:{}", self.script, self.hook_module(), self.function)
    }
}

/// Plan one hook per console script
///
/// Function names carry the script's position, so one module may back several scripts.
#[must_use]
pub fn plan_script_hooks(scripts: &[ConsoleScript]) -> Vec<ScriptHook> {
    scripts
        .iter()
        .enumerate()
        .map(|(index, script)| {
            let top_package = script
                .module
                .split('.')
                .next()
                .unwrap_or(&script.module)
                .to_string();
            ScriptHook {
                script: script.name.clone(),
                module: script.module.clone(),
                top_package,
                function: format!("{}_{index}", script.module.replace('.', "_")),
            }
        })
        .collect()
}

/// Source text of a hook module holding `hooks`
#[must_use]
pub fn hook_module_text<'a>(hooks: impl IntoIterator<Item = &'a ScriptHook>) -> String {
    let mut text = String::from("import runpy\n");
    for hook in hooks {
        text.push_str(&format!(
            "\n\ndef {}():\n    runpy.run_module(\"{}\", run_name=\"__main__\")\n",
            hook.function, hook.module
        ));
    }
    text
}

/// Writes the `__scripthooks__` trampoline modules the console entry points point at
#[derive(Debug, Default)]
pub struct CreateScriptHooks;

impl CreateScriptHooks {
    fn modules(ctx: &BuildContext) -> BTreeMap<&str, Vec<&ScriptHook>> {
        let mut by_package: BTreeMap<&str, Vec<&ScriptHook>> = BTreeMap::new();
        for hook in &ctx.script_hooks {
            by_package.entry(hook.top_package.as_str()).or_default().push(hook);
        }
        by_package
    }

    fn module_path(ctx: &BuildContext, top_package: &str) -> PathBuf {
        ctx.path(top_package).join(format!("{HOOK_MODULE}.py"))
    }
}

impl BuildStep for CreateScriptHooks {
    fn id(&self) -> StepId {
        StepId::CreateScriptHooks
    }

    fn description(&self) -> String {
        "create console script trampolines".to_string()
    }

    fn options(&self) -> Vec<StepOption> {
        vec![StepOption::new("hook_module", HOOK_MODULE, HOOK_MODULE)]
    }

    fn validate(&self, ctx: &BuildContext, ledger: &VirtualFileLedger) -> Result<(), StepError> {
        for hook in &ctx.script_hooks {
            if !ledger.file_system().is_dir(&ctx.path(&hook.top_package)) {
                return Err(StepError::precondition(format!(
                    "cannot create a script hook for {}: its top package {} does not exist",
                    hook.module, hook.top_package
                )));
            }
        }
        Ok(())
    }

    fn execute(
        &self,
        ctx: &mut BuildContext,
        ledger: &mut VirtualFileLedger,
    ) -> Result<(), StepError> {
        for (top_package, hooks) in Self::modules(ctx) {
            let path = Self::module_path(ctx, top_package);
            ledger.create_file(&path, hook_module_text(hooks.iter().copied()).as_bytes())?;
            info!(path = %path.display(), scripts = hooks.len(), "Created script hooks");
        }
        Ok(())
    }
}
