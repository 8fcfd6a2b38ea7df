//! One-shot worker bridge for out-of-process Python handlers
//!
//! The bridge generates a bootstrap script that imports the handler module,
//! runs its `execute` coroutine with JSON-serialized args and context, and
//! prints exactly one trailing JSON line of `CommandResult` shape to
//! stdout. Earlier stdout lines are arbitrary diagnostics. Each invocation
//! is a single blocking request/response exchange; there is no streaming,
//! cancellation, or timeout.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use indoc::formatdoc;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::command::{ArgMap, CommandResult};
use crate::context::ExecutionContext;
use crate::error::CommandError;

/// Wire contract version between host and worker.
pub const BRIDGE_PROTOCOL_VERSION: u32 = 1;

/// Generate the bootstrap source for one invocation. `args` and the context
/// are embedded as JSON literals; the handler module is loaded from its
/// entry-point file so hyphenated command names stay importable.
pub fn bootstrap_script(
    entry: &Path,
    args: &ArgMap,
    context: &ExecutionContext,
) -> Result<String, CommandError> {
    // A JSON string literal is also a valid Python string literal. The
    // args and context feed json.loads, so their JSON text is encoded a
    // second time into a string literal; the entry path is spliced as a
    // plain string literal and must be encoded exactly once.
    let string_literal = |text: &str| -> Result<String, CommandError> {
        serde_json::to_string(text).map_err(|err| CommandError::Execution(err.to_string()))
    };
    let embed_json = |value: &Value| -> Result<String, CommandError> {
        let json = serde_json::to_string(value)
            .map_err(|err| CommandError::Execution(err.to_string()))?;
        string_literal(&json)
    };

    let args_value = Value::Object(
        args.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    );
    let args_literal = embed_json(&args_value)?;
    let context_literal = embed_json(&context.to_worker_json())?;
    let entry_literal = string_literal(&entry.to_string_lossy())?;

    Ok(formatdoc! {r#"
        # taskdeck bridge protocol v{version}
        import asyncio
        import importlib.util
        import json

        ARGS = json.loads({args})
        CONTEXT = json.loads({context})

        spec = importlib.util.spec_from_file_location("taskdeck_handler", {entry})
        module = importlib.util.module_from_spec(spec)
        spec.loader.exec_module(module)

        result = asyncio.run(module.execute(ARGS, CONTEXT))
        if isinstance(result, dict):
            payload = {{"success": bool(result.get("success")), "output": result.get("output") or ""}}
            error = result.get("error")
        else:
            payload = {{"success": bool(getattr(result, "success", False)), "output": getattr(result, "output", "") or ""}}
            error = getattr(result, "error", None)
        if error:
            payload["error"] = error
        print(json.dumps(payload))
    "#,
        version = BRIDGE_PROTOCOL_VERSION,
        args = args_literal,
        context = context_literal,
        entry = entry_literal,
    })
}

/// Map a finished worker into a CommandResult.
///
/// Nonzero exit is a failure carrying whatever text was produced. A clean
/// exit whose final stdout line is not valid result JSON degrades to a
/// successful text result rather than an error.
pub fn interpret_worker_output(code: Option<i32>, stdout: &str, stderr: &str) -> CommandResult {
    if code != Some(0) {
        let error = if !stderr.trim().is_empty() {
            stderr.trim_end().to_string()
        } else {
            match code {
                Some(code) => format!("Process exited with code {}", code),
                None => "Process terminated by signal".to_string(),
            }
        };
        return CommandResult::error(error).with_output(stdout.to_string());
    }

    let last_line = stdout.lines().rev().find(|line| !line.trim().is_empty());
    match last_line.and_then(|line| serde_json::from_str::<CommandResult>(line.trim()).ok()) {
        Some(result) => result,
        None => {
            debug!("Worker exited cleanly without a result line; returning raw output");
            CommandResult::success(stdout.to_string())
        }
    }
}

/// Spawn the interpreter on a bootstrap script, collect stdout and stderr
/// in full, and await exit. Working directory and environment overrides
/// come from the execution context; the host environment passes through
/// underneath.
pub async fn run_worker(
    python_bin: &str,
    script: &str,
    working_dir: &Path,
    env: &HashMap<String, String>,
) -> CommandResult {
    let mut cmd = Command::new(python_bin);
    cmd.arg("-c")
        .arg(script)
        .current_dir(working_dir)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    configure_worker(&mut cmd);

    match cmd.output().await {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            interpret_worker_output(output.status.code(), &stdout, &stderr)
        }
        Err(err) => CommandResult::error(CommandError::Spawn(err.to_string()).to_string()),
    }
}

#[cfg(windows)]
const CREATE_NO_WINDOW_FLAG: u32 = 0x08000000;

#[allow(unused_variables)]
fn configure_worker(command: &mut Command) {
    // Isolate the worker into its own process group so it does not receive
    // SIGINT when the user presses Ctrl+C in the terminal.
    #[cfg(unix)]
    command.process_group(0);
    #[cfg(windows)]
    command.creation_flags(CREATE_NO_WINDOW_FLAG);
}
