use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Initialize stderr logging, honoring RUST_LOG and defaulting to warn.
pub fn setup_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to set subscriber: {}", e))
}
