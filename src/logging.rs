//! Tracing setup. Output goes to a file because the terminal UI owns stdout.
use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::{Error, Result};

pub fn setup_logging(config: &Config) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .map_err(|e| Error::io(&config.log_file, e))?;

    let (filter, invalid_filter) = match EnvFilter::try_new(&config.log_level) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new("info"), Some(e)),
    };

    let file_log = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file))
        .with_filter(filter);

    tracing_subscriber::registry().with(file_log).init();

    if let Some(e) = invalid_filter {
        tracing::warn!(filter = %config.log_level, "invalid log filter, using info: {}", e);
    }
    Ok(())
}
