//! Append-only event log.
//!
//! All writers share one unbounded queue drained by a single task that owns
//! the file handle, so lines land in call order no matter how many handlers
//! log concurrently. `write` never blocks the caller. Lines reach the file
//! each time the queue runs empty; `flush` additionally syncs to storage.
//!
//! Line format: `[<ISO-8601 UTC, millis>] [#<request id> ]<message>`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, oneshot};

use benchd_core::error::{BenchError, Result};

/// Messages containing any of these are mirrored to the console.
pub const CONSOLE_MARKERS: [&str; 3] = ["ERROR", "Server running", "shutting down"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Info,
    Error,
    Stats,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Info => "INFO",
            Category::Error => "ERROR",
            Category::Stats => "STATS",
        }
    }
}

/// One log record. Created by a component, consumed by [`Logger::write`].
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub request_id: Option<u64>,
    pub category: Category,
    pub message: String,
}

impl LogEvent {
    pub fn new(category: Category, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: None,
            category,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Category::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Category::Error, message)
    }

    pub fn stats(message: impl Into<String>) -> Self {
        Self::new(Category::Stats, message)
    }

    pub fn with_request(mut self, id: u64) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Message with the request id prefix, without timestamp.
    pub fn body(&self) -> String {
        match self.request_id {
            Some(id) => format!("#{id} {}", self.message),
            None => self.message.clone(),
        }
    }

    /// Full log line, newline-terminated.
    pub fn line(&self) -> String {
        format!(
            "[{}] {}\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.body()
        )
    }
}

/// Whether a message belongs on the interactive console.
pub fn mirrors_to_console(message: &str) -> bool {
    CONSOLE_MARKERS.iter().any(|m| message.contains(m))
}

enum Command {
    Append(String),
    Flush(oneshot::Sender<io::Result<()>>),
}

/// Cloneable handle to the log writer task.
#[derive(Clone)]
pub struct Logger {
    tx: mpsc::UnboundedSender<Command>,
    path: Arc<PathBuf>,
}

impl Logger {
    /// Open `path` for appending (creating parent directories) and start the
    /// writer task. Must be called inside a tokio runtime.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                BenchError::Io(io::Error::new(
                    e.kind(),
                    format!("open log file {} failed: {e}", path.display()),
                ))
            })?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(BufWriter::new(file), rx));

        Ok(Self {
            tx,
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue `event` for the log file and mirror it to the console if it
    /// carries one of the [`CONSOLE_MARKERS`].
    pub fn write(&self, event: LogEvent) {
        if mirrors_to_console(&event.message) {
            let body = event.body();
            match event.category {
                Category::Error => tracing::error!("{body}"),
                Category::Info | Category::Stats => tracing::info!("{body}"),
            }
        }

        if self.tx.send(Command::Append(event.line())).is_err() {
            tracing::warn!(path = %self.path.display(), "log writer stopped; event dropped");
        }
    }

    /// Wait until every previously written event is on storage.
    pub async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(ack_tx))
            .map_err(|_| writer_gone())?;
        ack_rx.await.map_err(|_| writer_gone())??;
        Ok(())
    }
}

fn writer_gone() -> BenchError {
    BenchError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "log writer stopped"))
}

async fn run_writer(mut out: BufWriter<File>, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(first) = rx.recv().await {
        let mut next = Some(first);
        while let Some(cmd) = next {
            match cmd {
                Command::Append(line) => {
                    if let Err(e) = out.write_all(line.as_bytes()).await {
                        tracing::error!(error = %e, "log append failed");
                    }
                }
                Command::Flush(ack) => {
                    let res = match out.flush().await {
                        Ok(()) => out.get_ref().sync_data().await,
                        Err(e) => Err(e),
                    };
                    let _ = ack.send(res);
                }
            }
            next = rx.try_recv().ok();
        }

        // Queue drained: hand the batch to the file so the log can be tailed.
        if let Err(e) = out.flush().await {
            tracing::error!(error = %e, "log write-out failed");
        }
    }

    if let Err(e) = out.flush().await {
        tracing::error!(error = %e, "final log flush failed");
    }
}
