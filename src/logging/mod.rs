//! Diagnostics setup and on-disk transcripts.
//!
//! [`init`] installs the `tracing` subscriber used by the binary. A
//! [`Transcript`] is an ordinary listener that appends every received command
//! to a daily file named `<server>_<date>.log` in the configured directory.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::config::expand_home;
use crate::irc::{Command, ListenerQueue};

/// Install a formatting subscriber. `RUST_LOG` overrides `default_level`.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .try_init();
}

/// Appends received commands to per-server daily log files.
///
/// The current file handle is cached and reopened when the date changes.
pub struct Transcript {
    log_dir: PathBuf,
    server: String,
    current: Option<(String, File)>,
}

impl Transcript {
    pub fn new(log_dir: &Path, server: &str) -> Self {
        Self {
            log_dir: expand_home(log_dir),
            server: sanitize(server),
            current: None,
        }
    }

    /// Append `command` in wire form behind a `[HH:MM:SS]` stamp.
    pub fn record(&mut self, command: &Command) -> io::Result<()> {
        let now = Local::now();
        let date = now.format("%Y-%m-%d").to_string();
        let file = self.file_for(&date)?;
        writeln!(file, "[{}] {}", now.format("%H:%M:%S"), command)
    }

    /// Path of the transcript for `date` (`YYYY-MM-DD`).
    pub fn path_for(&self, date: &str) -> PathBuf {
        self.log_dir.join(format!("{}_{}.log", self.server, date))
    }

    fn file_for(&mut self, date: &str) -> io::Result<&mut File> {
        let stale = !matches!(&self.current, Some((open_date, _)) if open_date == date);
        if stale {
            fs::create_dir_all(&self.log_dir)?;
            let path = self.path_for(date);
            debug!(path = %path.display(), "opening transcript");
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            self.current = Some((date.to_string(), file));
        }
        match &mut self.current {
            Some((_, file)) => Ok(file),
            None => Err(io::Error::other("transcript file not open")),
        }
    }

    /// Consume `queue` until it closes, recording each command.
    pub fn spawn(mut self, mut queue: ListenerQueue) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(command) = queue.recv().await {
                if let Err(e) = self.record(&command) {
                    warn!(error = %e, "failed to write transcript");
                }
            }
        })
    }
}

fn sanitize(target: &str) -> String {
    target
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}
