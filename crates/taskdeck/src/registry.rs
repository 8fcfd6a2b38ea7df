//! In-memory command registry with trigger matching and prompt lookup

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::RegexBuilder;
use tracing::{debug, info, warn};

use crate::command::{CommandConfig, CommandHandler, RuntimeKind};
use crate::context::ExecutionContext;
use crate::discovery::{self, DiscoveredCommand, PROMPT_FILE};
use crate::error::CommandError;

/// A command known to the registry. Owned by the registry; read-only after
/// initialization.
#[derive(Clone)]
pub struct RegisteredCommand {
    pub name: String,
    pub runtime: RuntimeKind,
    /// Directory of the handler on disk, when it has one. Holds the entry
    /// point for Python handlers and the optional prompt documentation.
    pub location: Option<PathBuf>,
    pub config: CommandConfig,
    pub(crate) handler: Option<Arc<dyn CommandHandler>>,
}

impl std::fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("name", &self.name)
            .field("runtime", &self.runtime)
            .field("location", &self.location)
            .finish()
    }
}

/// One trigger pattern hit against a context string. Ephemeral; produced
/// fresh per matching call.
#[derive(Debug, Clone)]
pub struct TriggerMatch {
    pub command: Arc<RegisteredCommand>,
    pub pattern: String,
    pub matched_text: String,
}

/// Mapping from command name to RegisteredCommand, built once over both
/// runtime trees. `initialize` returns a ready handle; there is no shared
/// global state and no initialized flag to race on.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<RegisteredCommand>>,
    // Discovery order: native set first (lexical), then the Python tree in
    // lexical directory order. A re-registered name moves to its later slot.
    order: Vec<String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run both discovery passes concurrently and return a populated
    /// registry.
    pub async fn initialize(
        commands_dir: impl AsRef<Path>,
        native_handlers: Vec<Arc<dyn CommandHandler>>,
    ) -> Self {
        let dir = commands_dir.as_ref();
        let (native, python) = tokio::join!(
            async { discovery::extract_native(&native_handlers, dir) },
            discovery::extract_python_tree(dir),
        );

        let mut registry = Self::new();
        for command in native.into_iter().chain(python) {
            registry.register(command);
        }
        info!(commands = registry.order.len(), "command registry initialized");
        registry
    }

    /// Insert a discovered command. The name is the sole identity:
    /// re-registration under an existing name replaces the prior entry
    /// (last-registered-wins), logged so the collision is diagnosable.
    pub fn register(&mut self, discovered: DiscoveredCommand) {
        let name = discovered.config.name.clone();
        let registered = Arc::new(RegisteredCommand {
            name: name.clone(),
            runtime: discovered.runtime,
            location: discovered.location,
            config: discovered.config,
            handler: discovered.handler,
        });
        if let Some(previous) = self.commands.insert(name.clone(), registered) {
            warn!(
                "Command '{}' ({} runtime) replaced by a later discovery",
                previous.name, previous.runtime
            );
            self.order.retain(|existing| existing != &name);
        }
        self.order.push(name);
    }

    pub fn get_command(&self, name: &str) -> Option<Arc<RegisteredCommand>> {
        self.commands.get(name).cloned()
    }

    /// Snapshot of every command in discovery order.
    pub fn all_commands(&self) -> Vec<Arc<RegisteredCommand>> {
        self.order
            .iter()
            .filter_map(|name| self.commands.get(name).cloned())
            .collect()
    }

    pub fn self_invokable_commands(&self) -> Vec<Arc<RegisteredCommand>> {
        self.all_commands()
            .into_iter()
            .filter(|command| command.config.self_invokable)
            .collect()
    }

    /// Test every self-invokable command's trigger patterns against the
    /// context string, case-insensitively. Each matching pattern yields one
    /// TriggerMatch; a command with several matching patterns yields
    /// several. An invalid pattern is skipped for that one pattern only.
    pub fn find_trigger_matches(&self, context: &str) -> Vec<TriggerMatch> {
        let mut matches = Vec::new();
        for command in self.self_invokable_commands() {
            for pattern in &command.config.triggers {
                let regex = match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(regex) => regex,
                    Err(err) => {
                        debug!(
                            "{}",
                            CommandError::InvalidPattern {
                                pattern: pattern.clone(),
                                reason: err.to_string(),
                            }
                        );
                        continue;
                    }
                };
                if let Some(found) = regex.find(context) {
                    matches.push(TriggerMatch {
                        command: command.clone(),
                        pattern: pattern.clone(),
                        matched_text: found.as_str().to_string(),
                    });
                }
            }
        }
        matches
    }

    /// Match against the context string synthesized from an execution
    /// context's recent edits and tool calls.
    pub fn find_context_matches(&self, context: &ExecutionContext) -> Vec<TriggerMatch> {
        self.find_trigger_matches(&context.synthesize())
    }

    /// Read the command's sibling `prompt.md`. A missing file is absence,
    /// not an error; only an unknown command name or an unreadable file is.
    pub async fn get_prompt(&self, name: &str) -> Result<Option<String>, CommandError> {
        let command = self
            .get_command(name)
            .ok_or_else(|| CommandError::NotFound(name.to_string()))?;
        let Some(location) = &command.location else {
            return Ok(None);
        };
        let path = location.join(PROMPT_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(CommandError::Load {
                path: path.display().to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandConfig;

    fn discovered(name: &str, runtime: RuntimeKind, triggers: Vec<&str>) -> DiscoveredCommand {
        let mut config = CommandConfig::new(name, "");
        if !triggers.is_empty() {
            config = config.with_triggers(triggers.into_iter().map(String::from).collect());
        }
        DiscoveredCommand {
            runtime,
            location: None,
            config,
            handler: None,
        }
    }

    #[test]
    fn test_duplicate_name_keeps_last_registration() {
        let mut registry = CommandRegistry::new();
        registry.register(discovered("review", RuntimeKind::Native, vec![]));
        registry.register(discovered("other", RuntimeKind::Native, vec![]));
        registry.register(discovered("review", RuntimeKind::Python, vec![]));

        assert_eq!(registry.all_commands().len(), 2);
        let command = registry.get_command("review").unwrap();
        assert_eq!(command.runtime, RuntimeKind::Python);

        // The surviving entry occupies its later discovery slot.
        let names: Vec<_> = registry
            .all_commands()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(names, vec!["other", "review"]);
    }

    #[test]
    fn test_trigger_matching_is_case_insensitive() {
        let mut registry = CommandRegistry::new();
        registry.register(discovered("pr-review", RuntimeKind::Python, vec!["review.*pr"]));

        let matches = registry.find_trigger_matches("Please REVIEW PR now");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].command.name, "pr-review");
        assert_eq!(matches[0].matched_text, "REVIEW PR");
    }

    #[test]
    fn test_invalid_pattern_skipped_without_losing_valid_ones() {
        let mut registry = CommandRegistry::new();
        registry.register(discovered(
            "mixed",
            RuntimeKind::Python,
            vec!["[unclosed", "deploy"],
        ));
        registry.register(discovered("tail", RuntimeKind::Python, vec!["deploy"]));

        let matches = registry.find_trigger_matches("time to deploy");
        let commands: Vec<_> = matches.iter().map(|m| m.command.name.clone()).collect();
        assert_eq!(commands, vec!["mixed", "tail"]);
    }

    #[test]
    fn test_multiple_matching_patterns_yield_multiple_matches() {
        let mut registry = CommandRegistry::new();
        registry.register(discovered(
            "errors",
            RuntimeKind::Python,
            vec!["traceback", "stack.*trace"],
        ));

        let matches = registry.find_trigger_matches("traceback follows a stack trace");
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_context_matches_use_synthesized_activity() {
        use crate::context::EditDescriptor;

        let mut registry = CommandRegistry::new();
        registry.register(discovered("errors", RuntimeKind::Python, vec!["traceback"]));

        let context = ExecutionContext::new(".").with_recent_edits(vec![EditDescriptor {
            path: "build.log".to_string(),
            summary: "Traceback captured from CI".to_string(),
        }]);
        let matches = registry.find_context_matches(&context);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].command.name, "errors");

        assert!(registry
            .find_context_matches(&ExecutionContext::new("."))
            .is_empty());
    }

    #[test]
    fn test_non_self_invokable_commands_never_match() {
        let mut registry = CommandRegistry::new();
        let mut command = discovered("quiet", RuntimeKind::Native, vec![]);
        command.config.triggers = vec!["quiet".to_string()];
        registry.register(command);

        assert!(registry.find_trigger_matches("quiet please").is_empty());
    }

    #[tokio::test]
    async fn test_get_prompt_absence_is_not_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let mut registry = CommandRegistry::new();
        let mut command = discovered("bare", RuntimeKind::Python, vec![]);
        command.location = Some(temp.path().to_path_buf());
        registry.register(command);
        registry.register(discovered("homeless", RuntimeKind::Native, vec![]));

        assert!(registry.get_prompt("bare").await.unwrap().is_none());
        assert!(registry.get_prompt("homeless").await.unwrap().is_none());
        assert!(matches!(
            registry.get_prompt("missing").await,
            Err(CommandError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_prompt_reads_sibling_file() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join(PROMPT_FILE), "Usage: run it\n").unwrap();

        let mut registry = CommandRegistry::new();
        let mut command = discovered("documented", RuntimeKind::Python, vec![]);
        command.location = Some(temp.path().to_path_buf());
        registry.register(command);

        let prompt = registry.get_prompt("documented").await.unwrap();
        assert_eq!(prompt.as_deref(), Some("Usage: run it\n"));
    }
}
