//! Dual-mode command executor
//!
//! Resolves a command through the registry and dispatches to one of exactly
//! two runtime implementations: direct in-process invocation for native
//! handlers, or the out-of-process worker bridge for Python handlers. Every
//! path terminates in a well-formed CommandResult; no internal fault ever
//! escapes to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::bridge;
use crate::command::{ArgMap, CommandConfig, CommandResult, RuntimeKind};
use crate::context::ExecutionContext;
use crate::discovery::PYTHON_ENTRY;
use crate::error::CommandError;
use crate::registry::{CommandRegistry, RegisteredCommand};

const DEFAULT_PYTHON_BIN: &str = "python3";

/// Dispatch seam between the two execution environments.
#[async_trait]
trait CommandRuntime: Send + Sync {
    async fn invoke(
        &self,
        command: &RegisteredCommand,
        args: ArgMap,
        context: &ExecutionContext,
    ) -> CommandResult;
}

/// Direct in-process invocation of a native handler.
struct NativeRuntime;

#[async_trait]
impl CommandRuntime for NativeRuntime {
    async fn invoke(
        &self,
        command: &RegisteredCommand,
        args: ArgMap,
        context: &ExecutionContext,
    ) -> CommandResult {
        let Some(handler) = &command.handler else {
            // Discovery validates the handler contract, so this only occurs
            // for entries registered by hand with the wrong runtime kind.
            return CommandResult::error(format!(
                "Command '{}' has no registered native handler",
                command.name
            ));
        };
        match handler.execute(args, context).await {
            Ok(result) => result,
            Err(err) => CommandResult::error(CommandError::Execution(err.to_string()).to_string()),
        }
    }
}

/// Out-of-process invocation through the one-shot worker bridge.
struct PythonWorkerRuntime {
    python_bin: String,
}

#[async_trait]
impl CommandRuntime for PythonWorkerRuntime {
    async fn invoke(
        &self,
        command: &RegisteredCommand,
        args: ArgMap,
        context: &ExecutionContext,
    ) -> CommandResult {
        let Some(location) = &command.location else {
            return CommandResult::error(format!(
                "Command '{}' has no entry point on disk",
                command.name
            ));
        };
        let entry = location.join(PYTHON_ENTRY);
        let script = match bridge::bootstrap_script(&entry, &args, context) {
            Ok(script) => script,
            Err(err) => return CommandResult::error(err.to_string()),
        };
        debug!(command = %command.name, "spawning worker for {}", entry.display());
        bridge::run_worker(&self.python_bin, &script, &context.working_dir, &context.env).await
    }
}

/// Executes commands against one registry with one shared read-only
/// context.
pub struct CommandExecutor {
    registry: Arc<CommandRegistry>,
    context: ExecutionContext,
    native: NativeRuntime,
    python: PythonWorkerRuntime,
}

impl CommandExecutor {
    pub fn new(registry: Arc<CommandRegistry>, context: ExecutionContext) -> Self {
        let python_bin =
            std::env::var("TASKDECK_PYTHON").unwrap_or_else(|_| DEFAULT_PYTHON_BIN.to_string());
        Self {
            registry,
            context,
            native: NativeRuntime,
            python: PythonWorkerRuntime { python_bin },
        }
    }

    pub fn with_python_bin(mut self, python_bin: impl Into<String>) -> Self {
        self.python.python_bin = python_bin.into();
        self
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Resolve and run a command. Never returns an error: unknown names,
    /// handler faults, worker crashes, and spawn failures all surface as
    /// `success: false` results.
    pub async fn execute(&self, name: &str, mut args: ArgMap) -> CommandResult {
        let Some(command) = self.registry.get_command(name) else {
            return CommandResult::error(CommandError::NotFound(name.to_string()).to_string());
        };
        apply_declared_defaults(&command.config, &mut args);

        let runtime: &dyn CommandRuntime = match command.runtime {
            RuntimeKind::Native => &self.native,
            RuntimeKind::Python => &self.python,
        };
        runtime.invoke(&command, args, &self.context).await
    }
}

/// Fill in declared defaults for arguments the caller omitted. Handlers
/// validate their own required arguments.
fn apply_declared_defaults(config: &CommandConfig, args: &mut ArgMap) {
    for arg in &config.args {
        if let Some(default) = &arg.default {
            args.entry(arg.name.clone()).or_insert_with(|| default.clone());
        }
    }
}
