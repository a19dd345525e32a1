//! The Error Log Sink (§4.8, §6.4): a best-effort, append-only audit trail
//! of critical migration failures, kept separate from the structured
//! logging facility and from error propagation.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const TIMESTAMP_FORMAT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Append `message` to `<cwd>/logs/migration-error.log`, creating the
/// `logs` directory if necessary. Failures to write are logged to the
/// structured logger but never propagated — the error log is an audit
/// trail, not part of error handling (§4.8).
pub fn append(message: &str) {
    if let Err(err) = try_append(message) {
        log::error!("could not write to migration error log: {err}");
    }
}

fn try_append(message: &str) -> std::io::Result<()> {
    let dir = log_dir();
    fs::create_dir_all(&dir)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("migration-error.log"))?;

    let timestamp = OffsetDateTime::now_utc()
        .format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| String::from("unknown-time"));

    writeln!(file, "{timestamp} {message}\n---")
}

fn log_dir() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("logs")
}
