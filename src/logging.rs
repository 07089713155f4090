use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable that overrides the configured filter.
pub const LOG_ENV: &str = "SUBLINE_LOG";

/// Logs go to a file because the terminal belongs to the UI.
pub fn setup_logging(log_file: &Path, level: &str) -> Result<()> {
    let env_filter = match std::env::var(LOG_ENV) {
        Ok(filter) => EnvFilter::try_new(filter)?,
        Err(_) => EnvFilter::try_new(format!("subline={level}"))?,
    };

    let file = OpenOptions::new().create(true).append(true).open(log_file)?;
    let fmt_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
