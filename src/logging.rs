//! Logging setup
//!
//! Interactive chat redraws a progress line in place, so in that mode logs go
//! to a file instead of the terminal.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Get the log file path
pub fn log_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("kb-chat").join("kb-chat.log")
    } else {
        PathBuf::from("kb-chat.log")
    }
}

/// Get the current log file path for display
pub fn log_path_display() -> String {
    log_path().display().to_string()
}

fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "kb_chat=debug,info"
    } else {
        "kb_chat=info,warn"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into())
}

/// Initialize the global subscriber, writing to the log file or to stderr
pub fn init_logging(verbose: bool, to_file: bool) -> anyhow::Result<()> {
    if to_file {
        let path = log_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "\n=== kb-chat session started at {} ===\n", timestamp)?;

        tracing_subscriber::registry()
            .with(filter(verbose))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter(verbose))
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}
