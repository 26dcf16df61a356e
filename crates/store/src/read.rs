/// Read path: `get()` and `contains_key()`.
///
/// Lookups take the shared lock, consult the keydir, and issue one
/// positional read against the live log. A missing key is not an error on
/// this path: `get` returns an empty value, preserving the classic contract
/// in which callers cannot distinguish an absent key from an empty one.
use logfile::LogError;

use crate::{Inner, Result, Store, StoreError};

impl Inner {
    /// Internal existence check: the keydir offset for `key`, or
    /// [`StoreError::KeyNotFound`].
    pub(crate) fn lookup(&self, key: &[u8]) -> Result<u64> {
        self.keydir.get(key).copied().ok_or(StoreError::KeyNotFound)
    }
}

impl Store {
    /// Returns the value stored under `key`, or an empty value if the key
    /// is absent (or empty: empty-key operations are silent no-ops).
    ///
    /// An end-of-log result from the positional read is swallowed the same
    /// way a missing key is; corruption and I/O failures propagate.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidDatabaseFile`] if the store is closed;
    /// [`StoreError::Log`] for corrupt records or I/O failures.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let inner = self.inner.read().unwrap();
        let log = inner.log.as_ref().ok_or(StoreError::InvalidDatabaseFile)?;

        let offset = match inner.lookup(key) {
            Ok(offset) => offset,
            Err(StoreError::KeyNotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        match log.read_at(offset) {
            Ok(record) => Ok(record.value),
            Err(LogError::EndOfLog) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// `true` if `key` is live in the keydir. Unlike [`get`], this can
    /// distinguish a key holding an empty value from an absent key.
    ///
    /// [`get`]: Store::get
    #[must_use]
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.inner.read().unwrap().keydir.contains_key(key)
    }
}
