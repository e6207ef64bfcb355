//! Process-wide tracing setup.
//!
//! `RUST_LOG` takes precedence over the configured level. Output goes to
//! stdout and, when configured, is appended to a log file as well.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Falls back to `info` if `level` is not a valid filter directive, and to
/// stdout only if `log_file` cannot be opened.
pub fn init(level: &str, format: LogFormat, log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, file_error) = match log_file.map(open_log_file) {
        Some(Ok(file)) => (
            BoxMakeWriter::new(std::io::stdout.and(Mutex::new(file))),
            None,
        ),
        Some(Err(error)) => (BoxMakeWriter::new(std::io::stdout), Some(error)),
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };
    // No colour codes in the file
    let ansi = log_file.is_none();

    match format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_target(true)
                .with_current_span(true)
                .init();
        }
        LogFormat::Text => {
            fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true)
                .init();
        }
    }

    if let Some(error) = file_error {
        tracing::error!("{error:#}");
    }
}

/// Opens `path` for appending, creating its directory if needed.
fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Could not create log directory '{}'", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| {
            format!(
                "Could not open log file '{}', logging to stdout only",
                path.display()
            )
        })
}
