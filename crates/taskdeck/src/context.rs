//! Execution context shared read-only across invocations

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;

/// A recently edited file, as reported by the host session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditDescriptor {
    pub path: String,
    #[serde(default)]
    pub summary: String,
}

/// A recently issued tool call, as reported by the host session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallDescriptor {
    pub tool: String,
    #[serde(default)]
    pub summary: String,
}

/// Per-executor invocation context. Constructed once, then treated as
/// immutable input to every invocation the executor performs. The `env`
/// map holds overrides only; spawned workers inherit the full host
/// environment underneath it.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionContext {
    pub working_dir: PathBuf,
    pub env: HashMap<String, String>,
    pub recent_edits: Vec<EditDescriptor>,
    pub recent_tool_calls: Vec<ToolCallDescriptor>,
}

impl ExecutionContext {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            env: HashMap::new(),
            recent_edits: Vec::new(),
            recent_tool_calls: Vec::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_recent_edits(mut self, edits: Vec<EditDescriptor>) -> Self {
        self.recent_edits = edits;
        self
    }

    pub fn with_recent_tool_calls(mut self, tool_calls: Vec<ToolCallDescriptor>) -> Self {
        self.recent_tool_calls = tool_calls;
        self
    }

    /// Build the free-text context string tested against trigger patterns,
    /// from the recent edit and tool-call descriptors.
    pub fn synthesize(&self) -> String {
        let mut lines = Vec::new();
        for edit in &self.recent_edits {
            if edit.summary.is_empty() {
                lines.push(format!("edited {}", edit.path));
            } else {
                lines.push(format!("edited {}: {}", edit.path, edit.summary));
            }
        }
        for call in &self.recent_tool_calls {
            if call.summary.is_empty() {
                lines.push(format!("tool {}", call.tool));
            } else {
                lines.push(format!("tool {}: {}", call.tool, call.summary));
            }
        }
        lines.join("\n")
    }

    /// The context shape serialized into the worker bootstrap.
    pub(crate) fn to_worker_json(&self) -> serde_json::Value {
        json!({
            "working_dir": self.working_dir.to_string_lossy(),
            "env": self.env,
            "recent_edits": self.recent_edits,
            "recent_tool_calls": self.recent_tool_calls,
        })
    }
}
