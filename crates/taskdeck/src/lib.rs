//! taskdeck - a dual-runtime registry for task-automation commands
//!
//! Provides:
//! - Discovery of command handlers across two runtimes (native in-process
//!   handlers and on-disk Python handlers) without requiring Python to be
//!   installed for enumeration
//! - An in-memory registry with lookup, enumeration, and trigger matching
//! - A dual-mode executor that invokes handlers in-process or through a
//!   one-shot out-of-process worker, normalizing both into one result shape
//! - Prompt documentation lookup for discovered commands

pub mod bridge;
pub mod command;
pub mod context;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod registry;

pub use command::{
    ArgDefinition, ArgMap, ArgType, CommandConfig, CommandHandler, CommandResult, RuntimeKind,
};
pub use context::{EditDescriptor, ExecutionContext, ToolCallDescriptor};
pub use error::CommandError;
pub use executor::CommandExecutor;
pub use registry::{CommandRegistry, RegisteredCommand, TriggerMatch};
