use crate::{Store, DATA_FILE_NAME, HEADER_SIZE};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fresh store in a scratch directory. Keep the `TempDir` alive for the
/// duration of the test.
pub fn open_tmp() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    (dir, store)
}

pub fn data_file(dir: &Path) -> PathBuf {
    dir.join(DATA_FILE_NAME)
}

/// On-disk size of the live log, read from the filesystem rather than the
/// store, so tests can cross-check the append cursor against reality.
pub fn data_file_size(dir: &Path) -> u64 {
    fs::metadata(data_file(dir)).unwrap().len()
}

/// On-disk size of one encoded record.
pub fn record_size(key: &[u8], value: &[u8]) -> u64 {
    HEADER_SIZE + key.len() as u64 + value.len() as u64
}
