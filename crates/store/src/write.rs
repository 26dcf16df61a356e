/// Write path: `put()`, `del()`, and `sync()`.
///
/// All mutations take the exclusive lock, append one record to the live
/// log, and only then touch the keydir. A failed append propagates the I/O
/// error and leaves the keydir exactly as it was, so the index never points
/// into a tail that did not make it to disk.
use logfile::Record;

use crate::{Result, Store, StoreError};

impl Store {
    /// Inserts or overwrites `key` with `value`.
    ///
    /// An empty key is a silent no-op. The keydir entry is set to the
    /// offset the record was appended at, after the append succeeds.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidDatabaseFile`] if the store is closed;
    /// [`StoreError::Log`] if the append fails.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.write().unwrap();
        let inner = &mut *inner;
        let log = inner.log.as_mut().ok_or(StoreError::InvalidDatabaseFile)?;

        let record = Record::put(key.to_vec(), value.to_vec());
        let offset = log.append(&record)?;
        if self.opts.sync_writes {
            log.sync()?;
        }
        inner.keydir.insert(record.key, offset);
        Ok(())
    }

    /// Removes `key` by appending a tombstone.
    ///
    /// An empty key is a silent no-op, and deleting an absent key succeeds
    /// without writing anything (idempotent delete). The keydir entry is
    /// removed only after the tombstone is on disk.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidDatabaseFile`] if the store is closed;
    /// [`StoreError::Log`] if the append fails.
    pub fn del(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.write().unwrap();
        let inner = &mut *inner;
        let log = inner.log.as_mut().ok_or(StoreError::InvalidDatabaseFile)?;

        if !inner.keydir.contains_key(key) {
            return Ok(());
        }

        let record = Record::del(key.to_vec());
        log.append(&record)?;
        if self.opts.sync_writes {
            log.sync()?;
        }
        inner.keydir.remove(key);
        Ok(())
    }

    /// Forces the live log to disk via fsync.
    ///
    /// Useful when [`StoreOptions::sync_writes`] is off and the caller
    /// wants durability at a specific point.
    ///
    /// [`StoreOptions::sync_writes`]: crate::StoreOptions::sync_writes
    pub fn sync(&self) -> Result<()> {
        let inner = self.inner.read().unwrap();
        let log = inner.log.as_ref().ok_or(StoreError::InvalidDatabaseFile)?;
        log.sync()?;
        Ok(())
    }
}
