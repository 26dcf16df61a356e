//! # Store - CaskKV key-value store
//!
//! An embeddable, single-writer, log-structured key-value store: byte-string
//! keys mapped to byte-string values in one append-only data log, with an
//! in-memory keydir index and a stop-the-world merge that rewrites the log
//! down to its live records.
//!
//! ## Architecture
//!
//! ```text
//! Caller
//!   |
//!   v
//! ┌──────────────────────────────────────────────┐
//! │                   STORE                      │
//! │                                              │
//! │ write.rs → log append → keydir insert/remove │
//! │ read.rs  → keydir lookup → positional read   │
//! │ merge.rs → scan live → merge file → rename   │
//! │ recovery.rs → replay log → rebuild keydir    │
//! │                                              │
//! │        RwLock: get shared, rest exclusive    │
//! └──────────────────────────────────────────────┘
//!   |
//!   v
//! bitcask.data  (bitcask.merge, transiently during merge)
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module         | Purpose                                              |
//! |----------------|------------------------------------------------------|
//! | [`lib.rs`]     | `Store` struct, options, errors, open/close, `Debug` |
//! | [`read`]       | `get()`, `contains_key()`                            |
//! | [`write`]      | `put()`, `del()`, `sync()`                           |
//! | [`recovery`]   | keydir replay on open                                |
//! | [`merge`]      | compaction: rewrite the log to live records only     |
//!
//! ## Crash Safety
//!
//! Appends are single positional writes and the append cursor advances only
//! on success, so a torn write is overwritten by the next append. Replay on
//! open stops at the first corrupt or truncated record and serves the clean
//! prefix. Merge syncs the merge file before atomically renaming it over
//! the live log; a crash on either side of the rename leaves exactly one
//! intact log. The ordinary write path does not fsync (see
//! [`StoreOptions::sync_writes`] and [`Store::sync`]).

mod merge;
mod read;
mod recovery;
mod write;

use logfile::LogFile;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;

pub use logfile::{LogError, Mark, Record, HEADER_SIZE};

/// Well-known name of the live data log inside the store directory.
pub const DATA_FILE_NAME: &str = "bitcask.data";
/// Well-known name of the transient compaction output.
pub const MERGE_FILE_NAME: &str = "bitcask.merge";

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested key is absent from the keydir. Produced by the internal
    /// existence check; [`Store::get`] swallows it and returns an empty
    /// value instead.
    #[error("key not found in database")]
    KeyNotFound,

    /// The store has no open log file (e.g. `close` after `close`).
    #[error("invalid database file")]
    InvalidDatabaseFile,

    /// A filesystem operation outside the log itself failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An error bubbled up from the log file.
    #[error(transparent)]
    Log(#[from] LogError),
}

/// A convenience `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Tunable store behavior. The defaults match the classic contract: no
/// fsync on the write path.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// If `true`, every successful append in `put`/`del` is followed by
    /// fsync. Durable, slower. Defaults to `false`.
    pub sync_writes: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { sync_writes: false }
    }
}

/// State guarded by the store's readers-writer lock.
///
/// `log` is `None` once the store has been closed; every operation checks it
/// first and fails with [`StoreError::InvalidDatabaseFile`] when absent.
/// The keydir maps each live key to the offset of its most recent put
/// record in the log.
pub(crate) struct Inner {
    pub(crate) log: Option<LogFile>,
    pub(crate) keydir: HashMap<Vec<u8>, u64>,
}

/// The store: one directory, one live log, one keydir, one lock.
///
/// # Concurrency
///
/// Designed for use from multiple cooperating threads in a single process.
/// `get` takes the lock in shared mode and issues positional reads that are
/// safe to run concurrently; `put`, `del`, `merge`, and `close` take it in
/// exclusive mode. No operation holds the lock beyond its own I/O.
///
/// # Durability
///
/// A crash may lose the most recent records; the log will not contain torn
/// records in the middle. Opt into per-write fsync with
/// [`StoreOptions::sync_writes`], or call [`Store::sync`] at chosen points.
pub struct Store {
    inner: RwLock<Inner>,
    dir: PathBuf,
    opts: StoreOptions,
}

impl Store {
    /// Opens (or creates) the store in `dir` with default options.
    ///
    /// Creates the directory if it does not exist, removes a leftover merge
    /// file from an interrupted compaction, opens the data log, and replays
    /// it to rebuild the keydir. Replay stops silently at the first corrupt
    /// or truncated record, so a damaged log still opens with every record
    /// of the clean prefix visible.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Store> {
        Self::open_with_options(dir, StoreOptions::default())
    }

    /// Opens (or creates) the store in `dir` with explicit options.
    pub fn open_with_options<P: AsRef<Path>>(dir: P, opts: StoreOptions) -> Result<Store> {
        fs::create_dir_all(dir.as_ref())?;
        let dir = dir.as_ref().canonicalize()?;

        // A merge file on disk means a compaction died before its rename;
        // the data file is still authoritative.
        let _ = fs::remove_file(dir.join(MERGE_FILE_NAME));

        let log = LogFile::open(dir.join(DATA_FILE_NAME))?;
        let mut keydir = HashMap::new();
        recovery::load_keydir(&log, &mut keydir);
        debug!(
            dir = %dir.display(),
            entries = keydir.len(),
            log_size = log.offset(),
            "store opened"
        );

        Ok(Store {
            inner: RwLock::new(Inner {
                log: Some(log),
                keydir,
            }),
            dir,
            opts,
        })
    }

    /// Closes the underlying log file, releasing the handle.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidDatabaseFile`] if the store is already closed.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.log.take() {
            Some(log) => {
                drop(log);
                Ok(())
            }
            None => Err(StoreError::InvalidDatabaseFile),
        }
    }

    /// The canonicalized directory this store lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().keydir.len()
    }

    /// `true` if the store holds no live keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().keydir.is_empty()
    }

    /// Snapshot of the live keys, in no particular order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.inner.read().unwrap().keydir.keys().cloned().collect()
    }

    /// Current append cursor of the live log; equals the log file size
    /// between operations.
    pub fn log_size(&self) -> Result<u64> {
        let inner = self.inner.read().unwrap();
        let log = inner.log.as_ref().ok_or(StoreError::InvalidDatabaseFile)?;
        Ok(log.offset())
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().unwrap();
        f.debug_struct("Store")
            .field("dir", &self.dir)
            .field("entries", &inner.keydir.len())
            .field("log_size", &inner.log.as_ref().map(|l| l.offset()))
            .field("sync_writes", &self.opts.sync_writes)
            .finish()
    }
}

#[cfg(test)]
mod tests;
