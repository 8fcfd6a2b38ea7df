//! Command-line surface: list, run, prompt, triggers

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use serde_json::Value;

use taskdeck::{ArgMap, CommandExecutor, CommandRegistry, ExecutionContext};

#[derive(Parser)]
#[command(
    name = "taskdeck",
    about = "Discover, match, and run task-automation commands",
    version
)]
pub struct Cli {
    /// Root of the commands tree (default: $TASKDECK_COMMANDS_DIR or ./commands)
    #[arg(long)]
    commands_dir: Option<PathBuf>,

    /// Python interpreter for out-of-process handlers (default: $TASKDECK_PYTHON or python3)
    #[arg(long)]
    python_bin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every discovered command
    List,
    /// Run a command with key=value arguments
    Run {
        name: String,
        /// Arguments as key=value; values parse as JSON when possible
        args: Vec<String>,
    },
    /// Show a command's prompt documentation
    Prompt { name: String },
    /// Match trigger patterns against a context string; with no arguments,
    /// the context is synthesized from the session's recent activity
    Triggers { context: Vec<String> },
}

pub async fn cli() -> Result<()> {
    let cli = Cli::parse();
    let commands_dir = cli
        .commands_dir
        .or_else(|| std::env::var("TASKDECK_COMMANDS_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("commands"));
    let registry = Arc::new(CommandRegistry::initialize(&commands_dir, Vec::new()).await);

    match cli.command {
        Commands::List => {
            for command in registry.all_commands() {
                let invokable = if command.config.self_invokable {
                    " (self-invokable)"
                } else {
                    ""
                };
                println!(
                    "{} [{}]{} - {}",
                    style(&command.name).bold(),
                    command.runtime,
                    invokable,
                    command.config.description
                );
            }
        }
        Commands::Run { name, args } => {
            let args = parse_key_value_args(&args);
            let context = ExecutionContext::new(std::env::current_dir()?);
            let mut executor = CommandExecutor::new(registry, context);
            if let Some(python_bin) = cli.python_bin {
                executor = executor.with_python_bin(python_bin);
            }
            let result = executor.execute(&name, args).await;
            if !result.output.is_empty() {
                println!("{}", result.output);
            }
            if let Some(error) = &result.error {
                eprintln!("{}", style(error).red());
            }
            if !result.success {
                std::process::exit(1);
            }
        }
        Commands::Prompt { name } => match registry.get_prompt(&name).await? {
            Some(text) => print!("{}", text),
            None => println!("No prompt documentation for '{}'", name),
        },
        Commands::Triggers { context } => {
            let context = if context.is_empty() {
                ExecutionContext::new(std::env::current_dir()?).synthesize()
            } else {
                context.join(" ")
            };
            for m in registry.find_trigger_matches(&context) {
                println!(
                    "{} matched '{}' on \"{}\"",
                    style(&m.command.name).bold(),
                    m.pattern,
                    m.matched_text
                );
            }
        }
    }

    Ok(())
}

/// Parse `key=value` arguments: JSON when the value parses, a literal
/// string otherwise, and boolean true when the value (or the `=`) is
/// absent.
pub fn parse_key_value_args(raw: &[String]) -> ArgMap {
    let mut args = HashMap::new();
    for item in raw {
        let Some((key, value)) = item.split_once('=') else {
            args.insert(item.clone(), Value::Bool(true));
            continue;
        };
        let parsed = if value.is_empty() {
            Value::Bool(true)
        } else {
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
        };
        args.insert(key.to_string(), parsed);
    }
    args
}
