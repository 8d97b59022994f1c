//! Bounded CSV request log.
//!
//! The log is a single file: a fixed header row followed by at most
//! `max_entries` data rows, oldest first. Appends go to the end of the file;
//! once the row count exceeds the bound the file is rewritten as header +
//! newest `max_entries` rows.
//!
//! Rotation writes a `.tmp` sibling and renames it over the log, so a reader
//! sees either the pre- or post-rotation file, never a partial one. Writers
//! (append, rotate) hold the write side of an `RwLock`; readers share the
//! read side.

use reqlog_core::config::StoreConfig;
use reqlog_core::entry::{HEADER, LogEntry};
use reqlog_core::error::ReqLogError;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// The on-disk request log. Share it behind an `Arc`.
#[derive(Debug)]
pub struct LogStore {
    path: PathBuf,
    max_entries: usize,
    lock: RwLock<()>,
}

impl LogStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_path(config.log_path(), config.max_entries)
    }

    pub fn with_path(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries,
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Create the directory and the file with its header row if absent.
    ///
    /// Idempotent: an existing log keeps its entries. A zero-length file
    /// (e.g. left by a crash between create and write) gets its header.
    pub fn ensure_initialized(&self) -> Result<(), ReqLogError> {
        let _guard = self.write_guard()?;
        self.init_locked()
    }

    /// Append one entry as a new row, then rotate if the bound is exceeded.
    pub fn append(&self, entry: &LogEntry) -> Result<(), ReqLogError> {
        let _guard = self.write_guard()?;
        self.init_locked()?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.write_error(source))?;

        // A file whose last line lacks its newline would swallow this row.
        let mut line = String::new();
        if !ends_with_newline(&mut file).map_err(|source| self.write_error(source))? {
            line.push('\n');
        }
        line.push_str(&entry.to_row());
        line.push('\n');

        // One write per row keeps rows whole under O_APPEND.
        file.write_all(line.as_bytes())
            .map_err(|source| self.write_error(source))?;

        debug!(path = %self.path.display(), "Appended request log row");

        self.rotate_locked()?;
        Ok(())
    }

    /// Truncate to header + newest `max_entries` rows when over the bound.
    ///
    /// Returns `true` if a rotation happened.
    pub fn rotate_if_needed(&self) -> Result<bool, ReqLogError> {
        let _guard = self.write_guard()?;
        self.rotate_locked()
    }

    /// All stored entries in append order, header excluded.
    ///
    /// Rows that do not parse are skipped with a warning.
    pub fn read_all(&self) -> Result<Vec<LogEntry>, ReqLogError> {
        let _guard = self.read_guard()?;

        let bytes = fs::read(&self.path).map_err(|source| ReqLogError::StoreUnreadable {
            path: self.path.clone(),
            source,
        })?;
        let data = String::from_utf8_lossy(&bytes);

        let mut lines = data.lines();
        match lines.next() {
            Some(header) if header == HEADER => {}
            other => {
                return Err(ReqLogError::CorruptHeader {
                    path: self.path.clone(),
                    found: other.unwrap_or_default().to_string(),
                });
            }
        }

        let mut entries = Vec::new();
        for (idx, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match LogEntry::from_row(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = idx + 2,
                    error = %e,
                    "Skipping malformed request log row"
                ),
            }
        }

        Ok(entries)
    }

    // ── Internals (caller holds the write lock) ──────────────────

    fn init_locked(&self) -> Result<(), ReqLogError> {
        let init_error = |source: io::Error| ReqLogError::Initialization {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(init_error)?;
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => {
                info!(path = %self.path.display(), "Request log created");
                file
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let len = fs::metadata(&self.path).map_err(init_error)?.len();
                if len > 0 {
                    return Ok(());
                }
                warn!(path = %self.path.display(), "Request log is empty, writing header");
                OpenOptions::new()
                    .write(true)
                    .open(&self.path)
                    .map_err(init_error)?
            }
            Err(e) => return Err(init_error(e)),
        };

        file.write_all(format!("{HEADER}\n").as_bytes())
            .map_err(init_error)?;
        Ok(())
    }

    fn rotate_locked(&self) -> Result<bool, ReqLogError> {
        // Rows are handled as raw bytes so a stray non-UTF-8 row can neither
        // block rotation nor be rewritten differently.
        let data = fs::read(&self.path).map_err(|source| self.write_error(source))?;

        // First line is the header slot; it is rewritten verbatim below.
        let rows: Vec<&[u8]> = data
            .split(|b| *b == b'\n')
            .skip(1)
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .collect();

        if rows.len() <= self.max_entries {
            return Ok(false);
        }

        let dropped = rows.len() - self.max_entries;
        let kept = &rows[dropped..];

        let mut out = Vec::with_capacity(data.len());
        out.extend_from_slice(HEADER.as_bytes());
        out.push(b'\n');
        for row in kept {
            out.extend_from_slice(row);
            out.push(b'\n');
        }

        let tmp = tmp_path(&self.path);
        if let Err(source) = write_synced(&tmp, &out) {
            let _ = fs::remove_file(&tmp);
            return Err(ReqLogError::StoreWrite { path: tmp, source });
        }
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(self.write_error(source));
        }

        info!(
            path = %self.path.display(),
            dropped,
            kept = kept.len(),
            "Rotated request log"
        );
        Ok(true)
    }

    fn write_error(&self, source: io::Error) -> ReqLogError {
        ReqLogError::StoreWrite {
            path: self.path.clone(),
            source,
        }
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, ()>, ReqLogError> {
        self.lock.write().map_err(|_| ReqLogError::LockPoisoned)
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, ()>, ReqLogError> {
        self.lock.read().map_err(|_| ReqLogError::LockPoisoned)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Sibling scratch file used during rotation: `log.csv` → `log.csv.tmp`.
fn tmp_path(base: &Path) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(".tmp");
    PathBuf::from(path)
}

/// True if the file is empty or its last byte is `\n`.
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

// ── Tests ────────────────────────────────────────────────────────────────────
