//! Timestamped command log.
//!
//! Each accepted command is appended as `[<local time>] <command>`. The file
//! is truncated when the logger starts.

use chrono::Local;
use cutkit_core::ControllerError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug)]
pub struct CommandLogger {
    path: PathBuf,
    writer: BufWriter<File>,
    lines: usize,
}

impl CommandLogger {
    /// Open (and truncate) the log at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ControllerError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| ControllerError::Logger {
            reason: format!("{}: {}", path.display(), e),
        })?;
        let mut logger = Self {
            path,
            writer: BufWriter::new(file),
            lines: 0,
        };
        logger.write_line(&format!("; log started {}", Local::now().format(TIMESTAMP_FORMAT)))?;
        tracing::debug!("Command log opened at {}", logger.path.display());
        Ok(logger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of commands written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn log(&mut self, command: &str) -> Result<(), ControllerError> {
        let stamp = Local::now().format(TIMESTAMP_FORMAT);
        self.write_line(&format!("[{}] {}", stamp, command.trim_end()))?;
        self.lines += 1;
        Ok(())
    }

    /// Flush and close, returning the log location.
    pub fn finish(mut self) -> Result<PathBuf, ControllerError> {
        self.writer.flush().map_err(|e| ControllerError::Logger {
            reason: e.to_string(),
        })?;
        tracing::debug!(
            "Command log closed at {} ({} commands)",
            self.path.display(),
            self.lines
        );
        Ok(self.path)
    }

    fn write_line(&mut self, line: &str) -> Result<(), ControllerError> {
        writeln!(self.writer, "{}", line).map_err(|e| ControllerError::Logger {
            reason: e.to_string(),
        })
    }
}
