use std::path::PathBuf;

use clap::Parser;

/// Track dated revenue and expenses and summarize them in the terminal.
#[derive(Parser, Debug, Clone)]
#[command(name = "fintrack", version, about, long_about = None)]
pub struct Config {
    /// CSV file holding all transactions. Created on the first change.
    #[arg(long, env = "FINTRACK_DATA_FILE", default_value = "finance_tracker.csv")]
    pub data_file: PathBuf,

    /// File that log output is appended to.
    #[arg(long, env = "FINTRACK_LOG_FILE", default_value = "fintrack.log")]
    pub log_file: PathBuf,

    /// Log filter, e.g. `info` or `finance_tracker=debug`.
    #[arg(long, env = "FINTRACK_LOG", default_value = "info")]
    pub log_level: String,
}
