//! Logging setup for the command line client
//!
//! Logs go to stderr so stdout stays clean JSON:
//! - Human-readable output by default
//! - JSON lines with `--log-json`
//! - Levels from `RUST_LOG`, falling back to info for the client crates

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "orchestrate=info,orchestrate_rs=info,orchestrate_core=info";

pub fn init_telemetry(json: bool) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        let json_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_target(true);
        registry.with(json_layer).try_init()?;
    } else {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);
        registry.with(console_layer).try_init()?;
    }

    tracing::debug!(json, "Telemetry initialized");
    Ok(())
}
