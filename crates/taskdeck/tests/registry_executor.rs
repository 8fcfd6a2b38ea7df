//! End-to-end discovery, matching, and execution over an on-disk tree

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use taskdeck::{CommandExecutor, CommandRegistry, ExecutionContext};

const ERRORS_HANDLER: &str = r#"
class CommandConfig:
    def __init__(self, **fields):
        self.__dict__.update(fields)

config = CommandConfig(
    name="analyze-errors",
    description="Parse and explain error logs",
    self_invokable=True,
    triggers=[
        r"error.*occurred",
        r"traceback",
    ],
)

async def execute(args, context):
    return {"success": True, "output": "analyzed " + str(args.get("log", ""))}
"#;

const MIGRATE_MANIFEST: &str = r#"
name = "db-migrate"
description = "Migration helper"
self_invokable = true
triggers = ["migrate", "schema.*change"]

[[args]]
name = "action"
type = "string"
default = "list"
"#;

fn write_tree(root: &Path) {
    let errors = root.join("py/analyze-errors");
    std::fs::create_dir_all(&errors).unwrap();
    std::fs::write(errors.join("__init__.py"), ERRORS_HANDLER).unwrap();
    std::fs::write(errors.join("prompt.md"), "Paste an error log.\n").unwrap();

    let migrate = root.join("py/db-migrate");
    std::fs::create_dir_all(&migrate).unwrap();
    std::fs::write(migrate.join("command.toml"), MIGRATE_MANIFEST).unwrap();
    std::fs::write(migrate.join("__init__.py"), "async def execute(args, context):\n    return {\"success\": True, \"output\": args[\"action\"]}\n").unwrap();
}

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[tokio::test]
async fn discovers_both_manifest_and_scanned_handlers() {
    let temp = tempfile::tempdir().unwrap();
    write_tree(temp.path());

    let registry = CommandRegistry::initialize(temp.path(), Vec::new()).await;
    let names: Vec<_> = registry
        .all_commands()
        .iter()
        .map(|command| command.name.clone())
        .collect();
    assert_eq!(names, vec!["analyze-errors", "db-migrate"]);

    let migrate = registry.get_command("db-migrate").unwrap();
    assert_eq!(migrate.config.args.len(), 1);
}

#[tokio::test]
async fn trigger_matching_spans_both_extraction_paths() {
    let temp = tempfile::tempdir().unwrap();
    write_tree(temp.path());

    let registry = CommandRegistry::initialize(temp.path(), Vec::new()).await;
    let matches = registry.find_trigger_matches("A TRACEBACK appeared after the schema change");
    let matched: Vec<_> = matches
        .iter()
        .map(|m| (m.command.name.as_str(), m.pattern.as_str()))
        .collect();
    assert!(matched.contains(&("analyze-errors", "traceback")));
    assert!(matched.contains(&("db-migrate", "schema.*change")));
}

#[tokio::test]
async fn prompt_lookup_reads_sibling_documentation() {
    let temp = tempfile::tempdir().unwrap();
    write_tree(temp.path());

    let registry = CommandRegistry::initialize(temp.path(), Vec::new()).await;
    let prompt = registry.get_prompt("analyze-errors").await.unwrap();
    assert_eq!(prompt.as_deref(), Some("Paste an error log.\n"));
    assert!(registry.get_prompt("db-migrate").await.unwrap().is_none());
}

#[tokio::test]
async fn worker_round_trip_returns_final_result_line() {
    if !python_available() {
        eprintln!("python3 not available, skipping worker round trip");
        return;
    }

    let temp = tempfile::tempdir().unwrap();
    write_tree(temp.path());

    let registry = Arc::new(CommandRegistry::initialize(temp.path(), Vec::new()).await);
    let executor = CommandExecutor::new(registry, ExecutionContext::new(temp.path()))
        .with_python_bin("python3");

    let mut args = HashMap::new();
    args.insert("log".to_string(), serde_json::json!("boom"));
    let result = executor.execute("analyze-errors", args).await;
    assert!(result.success, "worker failed: {:?}", result.error);
    assert_eq!(result.output, "analyzed boom");

    // Declared defaults flow through to the worker.
    let result = executor.execute("db-migrate", HashMap::new()).await;
    assert!(result.success, "worker failed: {:?}", result.error);
    assert_eq!(result.output, "list");
}
