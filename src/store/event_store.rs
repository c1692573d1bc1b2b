//! Append-only line log shared by every ingestion connection
//!
//! One record per line. Appends are serialized through a mutex and issued as a
//! single `write_all` of the complete line (terminator included), so readers
//! never observe two producers interleaved inside one line.

use super::error::StoreError;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default file name of the event log inside the base directory
pub const LOG_FILE_NAME: &str = "logs.txt";

pub struct EventStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl EventStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Event log at `<base_dir>/logs.txt`
    pub fn in_dir(base_dir: impl AsRef<Path>) -> Self {
        Self::new(base_dir.as_ref().join(LOG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line, creating the file and its parent directory on demand.
    ///
    /// The file is reopened in append mode on every call so an externally
    /// removed log is recreated instead of written to a dangling handle.
    pub fn append(&self, raw_line: &str) -> Result<(), StoreError> {
        if raw_line.contains('\n') || raw_line.contains('\r') {
            return Err(StoreError::InvalidLine(format!(
                "line must not contain a line terminator: {:?}",
                raw_line
            )));
        }

        let mut buf = String::with_capacity(raw_line.len() + 1);
        buf.push_str(raw_line);
        buf.push('\n');

        let _guard = self.write_lock.lock().unwrap();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buf.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    /// All complete lines in file order, oldest first.
    ///
    /// A trailing fragment without its terminator belongs to an append that
    /// has not finished yet and is left out.
    pub fn read_all(&self) -> Result<Vec<String>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let complete = match bytes.iter().rposition(|b| *b == b'\n') {
            Some(last) => &bytes[..=last],
            None => return Ok(Vec::new()),
        };

        Ok(String::from_utf8_lossy(complete)
            .lines()
            .map(|line| line.to_string())
            .collect())
    }
}
