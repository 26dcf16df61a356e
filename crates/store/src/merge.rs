/// Merge: compacts the live log so it contains exactly the records the
/// keydir still references, reclaiming the space held by superseded puts
/// and by tombstones.
///
/// The whole procedure runs under the exclusive lock. That makes the
/// classic lost-write hazard (a foreground put landing between the liveness
/// scan and the file swap) structurally impossible, at the cost of blocking
/// writers for the duration.
use logfile::{LogError, LogFile};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::{Result, Store, StoreError, DATA_FILE_NAME, MERGE_FILE_NAME};

impl Store {
    /// Rewrites the log down to its live records.
    ///
    /// A record at offset `O` is live iff the keydir still maps its key to
    /// `O`; everything else (older puts and all tombstones) is dropped.
    /// The survivors are written to the merge file in log order, fsynced,
    /// and renamed over the data file in one atomic step. The keydir is
    /// then repointed at the new offsets.
    ///
    /// A store whose log is empty returns immediately.
    ///
    /// # Errors
    ///
    /// Propagates scan, write, and swap failures after deleting the partial
    /// merge file; the keydir and the live log are left in their pre-merge
    /// state. A scan that hits a corrupt record is an error here, not a
    /// truncation point: merge must not silently rewrite a log it could not
    /// fully read.
    pub fn merge(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let inner = &mut *inner;
        let log = inner.log.as_ref().ok_or(StoreError::InvalidDatabaseFile)?;
        if log.offset() == 0 {
            return Ok(());
        }

        // Phase 1: collect the live records, in log order.
        let mut live = Vec::new();
        let mut offset = 0u64;
        loop {
            let record = match log.read_at(offset) {
                Ok(record) => record,
                Err(LogError::EndOfLog) => break,
                Err(e) => return Err(e.into()),
            };
            let size = record.size();
            if inner.keydir.get(&record.key) == Some(&offset) {
                live.push(record);
            }
            offset += size;
        }

        // Phase 2: write the survivors to a fresh merge file and sync it.
        // The rename below is the commit point, so the merge file must be
        // fully on disk first. The truncating open discards anything a
        // crashed compaction left under the merge name.
        let data_path = self.dir.join(DATA_FILE_NAME);
        let merge_path = self.dir.join(MERGE_FILE_NAME);

        let mut merge_log = LogFile::create(&merge_path)?;
        let mut new_offsets = Vec::with_capacity(live.len());
        for record in &live {
            match merge_log.append(record) {
                Ok(new_offset) => new_offsets.push(new_offset),
                Err(e) => return Err(abort_merge(&merge_path, e.into())),
            }
        }
        if let Err(e) = merge_log.sync() {
            return Err(abort_merge(&merge_path, e.into()));
        }
        let merged_size = merge_log.offset();

        // Phase 3: swap. The old handle is closed, then the rename
        // atomically replaces the data file, so a crash on either side of
        // it leaves exactly one intact log. The rename moves the inode
        // under the still-open merge handle, which then serves as the live
        // log: the store is never left without a handle.
        inner.log = None;
        if let Err(e) = fs::rename(&merge_path, &data_path) {
            inner.log = reopen_original(&data_path);
            return Err(abort_merge(&merge_path, e.into()));
        }

        for (record, new_offset) in live.into_iter().zip(new_offsets) {
            inner.keydir.insert(record.key, new_offset);
        }
        inner.log = Some(merge_log);

        debug!(
            live = inner.keydir.len(),
            bytes = merged_size,
            reclaimed = offset - merged_size,
            "merge complete"
        );
        Ok(())
    }
}

/// Mandatory cleanup: a failed merge never leaves its partial output behind.
fn abort_merge(merge_path: &Path, err: StoreError) -> StoreError {
    if let Err(e) = fs::remove_file(merge_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(error = %e, "failed to remove partial merge file");
        }
    }
    err
}

/// Restores the pre-merge data file as the live log after a failed swap.
fn reopen_original(data_path: &Path) -> Option<LogFile> {
    match LogFile::open(data_path) {
        Ok(log) => Some(log),
        Err(e) => {
            warn!(error = %e, "failed to reopen data file after aborted merge");
            None
        }
    }
}
