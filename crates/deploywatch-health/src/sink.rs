//! Monitor log sink.
//!
//! Writes `[<ISO-8601>] [LEVEL] message` lines to an append-only file and
//! mirrors each one to stdout. Write failures on either target are reported
//! once through `tracing` and otherwise ignored; the sink never fails a check
//! cycle.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Alert,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Alert => "ALERT",
        })
    }
}

/// Render one log line (without trailing newline).
pub fn format_line(at: DateTime<Utc>, level: LogLevel, message: &str) -> String {
    format!(
        "[{}] [{level}] {message}",
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Where each line is mirrored besides the log file.
enum Echo {
    Off,
    Stdout,
    Writer(Mutex<Box<dyn Write + Send>>),
}

pub struct LogSink {
    file: Option<Mutex<File>>,
    path: Option<PathBuf>,
    echo: Echo,
    file_failed: AtomicBool,
    echo_failed: AtomicBool,
}

impl LogSink {
    /// Open (create or append) `path`, mirroring to stdout. `None` logs to stdout only.
    pub fn open(path: Option<&Path>) -> std::io::Result<Self> {
        let file = match path {
            Some(p) => Some(Mutex::new(
                OpenOptions::new().create(true).append(true).open(p)?,
            )),
            None => None,
        };
        Ok(Self {
            file,
            path: path.map(Path::to_path_buf),
            echo: Echo::Stdout,
            file_failed: AtomicBool::new(false),
            echo_failed: AtomicBool::new(false),
        })
    }

    /// Disable the stdout mirror.
    pub fn without_echo(mut self) -> Self {
        self.echo = Echo::Off;
        self
    }

    /// Mirror to `writer` instead of stdout.
    pub fn with_echo_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.echo = Echo::Writer(Mutex::new(Box::new(writer)));
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        let line = format_line(Utc::now(), level, message.as_ref());

        if let Some(file) = &self.file {
            let result = match file.lock() {
                Ok(mut f) => writeln!(f, "{line}"),
                Err(_) => Err(std::io::Error::other("log file lock poisoned")),
            };
            if let Err(e) = result {
                if !self.file_failed.swap(true, Ordering::Relaxed) {
                    warn!(path = ?self.path, error = %e, "failed to write monitor log");
                }
            }
        }

        let result = match &self.echo {
            Echo::Off => Ok(()),
            Echo::Stdout => writeln!(std::io::stdout().lock(), "{line}"),
            Echo::Writer(writer) => match writer.lock() {
                Ok(mut w) => writeln!(w, "{line}"),
                Err(_) => Err(std::io::Error::other("echo writer lock poisoned")),
            },
        };
        if let Err(e) = result {
            if !self.echo_failed.swap(true, Ordering::Relaxed) {
                warn!(error = %e, "failed to mirror monitor log");
            }
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    pub fn alert(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Alert, message);
    }
}
