//! Command discovery and metadata extraction
//!
//! Handlers live at `commands/<runtime-tag>/<name>/`. Native handlers are
//! registered in-process and expose their config through the
//! `CommandHandler` contract. Python handlers are described either by a
//! declarative `command.toml` sidecar manifest or, failing that, by a
//! pattern scan of the handler source - neither path executes any Python,
//! so commands can be enumerated without the interpreter installed.
//!
//! Discovery is best-effort: a single handler that fails to parse is
//! logged and skipped, never aborting the rest of the pass.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::command::{CommandConfig, CommandHandler, RuntimeKind};
use crate::error::CommandError;

/// Entry point of a Python handler package
pub const PYTHON_ENTRY: &str = "__init__.py";
/// Declarative sidecar manifest, parsed without executing handler code
pub const MANIFEST_FILE: &str = "command.toml";
/// Optional sibling documentation file
pub const PROMPT_FILE: &str = "prompt.md";

/// One discovered command, prior to registry insertion
#[derive(Clone)]
pub struct DiscoveredCommand {
    pub runtime: RuntimeKind,
    pub location: Option<PathBuf>,
    pub config: CommandConfig,
    pub handler: Option<Arc<dyn CommandHandler>>,
}

impl std::fmt::Debug for DiscoveredCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveredCommand")
            .field("runtime", &self.runtime)
            .field("location", &self.location)
            .field("config", &self.config)
            .field("handler", &self.handler.as_ref().map(|_| "<handler>"))
            .finish()
    }
}

/// Read the configs of the registered native handlers, sorted lexically by
/// name. A handler declaring an empty name is skipped with a warning.
pub fn extract_native(
    handlers: &[Arc<dyn CommandHandler>],
    commands_dir: &Path,
) -> Vec<DiscoveredCommand> {
    let mut discovered = Vec::new();
    for handler in handlers {
        let config = handler.config();
        if config.name.is_empty() {
            warn!("Skipping native handler with an empty command name");
            continue;
        }
        // A native handler's on-disk directory is optional; it only holds
        // prompt documentation.
        let dir = commands_dir
            .join(RuntimeKind::Native.tag())
            .join(&config.name);
        let location = dir.is_dir().then_some(dir);
        discovered.push(DiscoveredCommand {
            runtime: RuntimeKind::Native,
            location,
            config,
            handler: Some(handler.clone()),
        });
    }
    discovered.sort_by(|a, b| a.config.name.cmp(&b.config.name));
    discovered
}

/// Scan `commands/py/` for handler directories in lexical order.
pub async fn extract_python_tree(commands_dir: &Path) -> Vec<DiscoveredCommand> {
    let tree = commands_dir.join(RuntimeKind::Python.tag());
    let mut discovered = Vec::new();

    let mut entries = match tokio::fs::read_dir(&tree).await {
        Ok(entries) => entries,
        Err(err) => {
            debug!("No Python command tree at {}: {}", tree.display(), err);
            return discovered;
        }
    };

    let mut dirs = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if path.is_dir() {
                    dirs.push(path);
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!("Failed to read entry under {}: {}", tree.display(), err);
                break;
            }
        }
    }
    dirs.sort();

    for dir in dirs {
        match extract_python_command(&dir).await {
            Ok(Some(config)) => discovered.push(DiscoveredCommand {
                runtime: RuntimeKind::Python,
                location: Some(dir),
                config,
                handler: None,
            }),
            Ok(None) => debug!("Skipping {}: not a command", dir.display()),
            Err(err) => warn!("{}", err),
        }
    }

    discovered
}

/// Extract a Python handler's config without executing it: sidecar manifest
/// first, source scan as the fallback for handlers that predate manifests.
pub async fn extract_python_command(dir: &Path) -> Result<Option<CommandConfig>, CommandError> {
    let manifest = dir.join(MANIFEST_FILE);
    if manifest.is_file() {
        let text = tokio::fs::read_to_string(&manifest)
            .await
            .map_err(|err| CommandError::Load {
                path: manifest.display().to_string(),
                reason: err.to_string(),
            })?;
        let config: CommandConfig =
            toml::from_str(&text).map_err(|err| CommandError::Load {
                path: manifest.display().to_string(),
                reason: err.to_string(),
            })?;
        if config.name.is_empty() {
            warn!("Manifest {} declares no command name", manifest.display());
            return Ok(None);
        }
        return Ok(Some(config));
    }

    let entry = dir.join(PYTHON_ENTRY);
    if !entry.is_file() {
        return Ok(None);
    }
    let source = tokio::fs::read_to_string(&entry)
        .await
        .map_err(|err| CommandError::Load {
            path: entry.display().to_string(),
            reason: err.to_string(),
        })?;

    match scan_python_source(&source) {
        Some(config) => Ok(Some(config)),
        None => {
            warn!("No command name recoverable from {}", entry.display());
            Ok(None)
        }
    }
}

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*name\s*=\s*["']([^"']+)["']"#).expect("static pattern"));
static DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*description\s*=\s*["']([^"']+)["']"#).expect("static pattern")
});
static SELF_INVOKABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*self_invokable\s*=\s*(True|False)").expect("static pattern")
});
static TRIGGERS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^\s*triggers\s*=\s*\[(.*?)\]").expect("static pattern"));
static QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["']([^"']*)["']"#).expect("static pattern"));

/// Recover a CommandConfig from Python handler source by pattern
/// extraction. Returns None when no name is present.
pub fn scan_python_source(source: &str) -> Option<CommandConfig> {
    let name = NAME_RE.captures(source)?.get(1)?.as_str().to_string();

    let description = DESCRIPTION_RE
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let self_invokable = SELF_INVOKABLE_RE
        .captures(source)
        .and_then(|caps| caps.get(1))
        .is_some_and(|m| m.as_str() == "True");

    let triggers = TRIGGERS_RE
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|body| {
            QUOTED_RE
                .captures_iter(body.as_str())
                .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
                .collect()
        })
        .unwrap_or_default();

    Some(CommandConfig {
        name,
        description,
        args: Vec::new(),
        self_invokable,
        triggers,
    })
}
