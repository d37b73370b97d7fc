//! Destinations for rendered access log lines
//!
//! Every sink writes one whole line per call so lines from concurrent
//! requests never interleave. Sinks are shared across workers as
//! `Arc<dyn LogSink>`.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::error::AccessLogError;

/// Append-only destination for access log lines
pub trait LogSink: Send + Sync {
    /// Write one line; the sink adds the trailing newline
    fn write_line(&self, line: &str) -> Result<(), AccessLogError>;
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn write_line(&self, line: &str) -> Result<(), AccessLogError> {
        (**self).write_line(line)
    }
}

fn with_newline(line: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    buf
}

/// Writes lines to standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_line(&self, line: &str) -> Result<(), AccessLogError> {
        let mut handle = io::stdout().lock();
        handle.write_all(&with_newline(line))?;
        handle.flush()?;
        Ok(())
    }
}

/// Writes lines to any `io::Write`, e.g. an append-mode file
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the sink and return the writer
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn write_line(&self, line: &str) -> Result<(), AccessLogError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| AccessLogError::from_string(format!("sink lock poisoned: {}", e)))?;
        writer.write_all(&with_newline(line))?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line written so far
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) -> Result<(), AccessLogError> {
        self.lines
            .lock()
            .map_err(|e| AccessLogError::from_string(format!("sink lock poisoned: {}", e)))?
            .push(line.to_string());
        Ok(())
    }
}

/// Emits each line as an `INFO` event on the `access_log` target
///
/// Lets the host application's `tracing` subscriber decide where lines go.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write_line(&self, line: &str) -> Result<(), AccessLogError> {
        tracing::info!(target: "access_log", "{}", line);
        Ok(())
    }
}
