//! Capture-log source
//!
//! A capture log holds one device payload per line, oldest first, exactly as
//! received on the data topic. Blank lines and lines starting with `#` are
//! skipped.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{ConnectorError, ConnectorResult};

/// Recorded payloads on disk
#[derive(Debug, Clone)]
pub struct CaptureLog {
    path: PathBuf,
}

impl CaptureLog {
    /// Log at `path`; nothing is read until asked
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every payload, oldest first
    pub fn payloads(&self) -> ConnectorResult<Vec<String>> {
        let text = fs::read_to_string(&self.path).map_err(|source| ConnectorError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect())
    }

    /// Most recent payload, if any
    pub fn last_payload(&self) -> ConnectorResult<Option<String>> {
        Ok(self.payloads()?.pop())
    }

    /// Append one payload as received
    pub fn record(&self, payload: &str) -> ConnectorResult<()> {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}", payload.trim()))
            .map_err(|source| ConnectorError::Io {
                path: self.path.clone(),
                source,
            })
    }
}
