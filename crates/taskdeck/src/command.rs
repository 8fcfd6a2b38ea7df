//! Shared command types and the native handler contract

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ExecutionContext;

/// Arguments passed to a command invocation, keyed by argument name.
pub type ArgMap = HashMap<String, Value>;

/// Which execution environment a handler belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    /// Compiled into the host and invoked in-process
    Native,
    /// Run out of process through the worker bridge
    Python,
}

impl RuntimeKind {
    /// Directory tag under the commands tree (`commands/<tag>/<name>/`)
    pub fn tag(&self) -> &'static str {
        match self {
            RuntimeKind::Native => "native",
            RuntimeKind::Python => "py",
        }
    }
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Declared type of a command argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    #[default]
    String,
    Number,
    Boolean,
    Array,
}

/// One declared argument of a command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub arg_type: ArgType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Declared metadata of a command. The name is the sole identity.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommandConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub args: Vec<ArgDefinition>,
    #[serde(default)]
    pub self_invokable: bool,
    #[serde(default)]
    pub triggers: Vec<String>,
}

impl CommandConfig {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_args(mut self, args: Vec<ArgDefinition>) -> Self {
        self.args = args;
        self
    }

    /// Mark the command self-invokable with the given trigger patterns.
    pub fn with_triggers(mut self, triggers: Vec<String>) -> Self {
        self.self_invokable = true;
        self.triggers = triggers;
        self
    }
}

/// The only value ever returned across an invocation boundary, whether from
/// a direct call or the worker bridge. Always fully populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message.into()),
        }
    }

    /// Attach partial output to a failure so it is preserved for diagnosis.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }
}

/// Statically declared contract for native handlers. Discovery reads
/// `config()` without invoking the handler; the executor calls `execute`.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn config(&self) -> CommandConfig;

    async fn execute(&self, args: ArgMap, context: &ExecutionContext) -> Result<CommandResult>;
}
