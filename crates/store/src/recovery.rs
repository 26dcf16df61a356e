/// Keydir replay on open.
///
/// The cold-start path: scan the log from offset 0 and apply each record to
/// the keydir, so the index reflects the latest operation for every key.
use logfile::{LogError, LogFile, Mark};
use std::collections::HashMap;
use tracing::warn;

/// Replays `log` into `keydir`: puts set the key to the record's offset,
/// tombstones remove it.
///
/// Replay stops at the first corrupt or truncated record and keeps whatever
/// the clean prefix produced: availability over strictness. The damaged
/// tail is surfaced as a warning, not an error.
pub(crate) fn load_keydir(log: &LogFile, keydir: &mut HashMap<Vec<u8>, u64>) {
    let mut offset = 0u64;
    loop {
        let record = match log.read_at(offset) {
            Ok(record) => record,
            Err(LogError::EndOfLog) => break,
            Err(e) => {
                warn!(offset, error = %e, "replay stopped before end of log");
                break;
            }
        };
        let size = record.size();
        match record.mark {
            Mark::Put => {
                keydir.insert(record.key, offset);
            }
            Mark::Del => {
                keydir.remove(&record.key);
            }
        }
        offset += size;
    }
}
