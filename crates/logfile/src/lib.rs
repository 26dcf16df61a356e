//! # Logfile — append-only record log
//!
//! The on-disk primitive of the CaskKV store. A log file is a raw
//! concatenation of records starting at offset 0; records are appended at
//! the end, never mutated in place, and reclaimed only when the store
//! rewrites the whole log during a merge.
//!
//! ## Binary Record Format
//!
//! ```text
//! [key_size: u32 LE][value_size: u32 LE][mark: u16 LE][key ...][value ...]
//! ```
//!
//! The header is exactly [`HEADER_SIZE`] (10) bytes. `mark` is `0` for a
//! put and `1` for a tombstone; tombstones carry `value_size = 0`. This
//! layout is the compatibility surface: a log written here must be readable
//! byte for byte by any other conforming implementation, so there is no
//! checksum, no varints, and no padding.
//!
//! ## Example
//!
//! ```rust,no_run
//! use logfile::{LogFile, Record};
//!
//! let mut log = LogFile::open("bitcask.data").unwrap();
//! let off = log.append(&Record::put(b"hello".to_vec(), b"world".to_vec())).unwrap();
//! let rec = log.read_at(off).unwrap();
//! assert_eq!(rec.value, b"world");
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;
use thiserror::Error;

/// Serialized size of `(key_size, value_size, mark)`.
pub const HEADER_SIZE: u64 = 4 + 4 + 2;

/// Errors produced by log file operations.
#[derive(Debug, Error)]
pub enum LogError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A record header decoded to an unknown mark, or a payload read came
    /// up short against the sizes the header promised.
    #[error("corrupt record")]
    Corrupt,

    /// A positional read started at or past the end of the log. Terminal
    /// signal for replay and merge scans.
    #[error("end of log")]
    EndOfLog,
}

/// Operation kind carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    /// Key-value insertion or overwrite.
    Put = 0,
    /// Tombstone: the key has been removed.
    Del = 1,
}

impl Mark {
    fn from_wire(raw: u16) -> Result<Mark, LogError> {
        match raw {
            0 => Ok(Mark::Put),
            1 => Ok(Mark::Del),
            _ => Err(LogError::Corrupt),
        }
    }
}

/// A single log record. The unit of the log: owns its key and value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Operation kind.
    pub mark: Mark,
    /// The lookup key. Never empty for records written by the store.
    pub key: Vec<u8>,
    /// The payload value. Empty for tombstones.
    pub value: Vec<u8>,
}

impl Record {
    /// Builds a put record.
    pub fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            mark: Mark::Put,
            key,
            value,
        }
    }

    /// Builds a tombstone for `key`.
    pub fn del(key: Vec<u8>) -> Self {
        Self {
            mark: Mark::Del,
            key,
            value: Vec::new(),
        }
    }

    /// Total on-disk size of this record: header + key + value.
    pub fn size(&self) -> u64 {
        HEADER_SIZE + self.key.len() as u64 + self.value.len() as u64
    }

    /// Serializes the record into `buf`, appending exactly [`size`] bytes.
    ///
    /// [`size`]: Record::size
    fn encode_into(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        buf.write_u32::<LittleEndian>(self.key.len() as u32)?;
        buf.write_u32::<LittleEndian>(self.value.len() as u32)?;
        buf.write_u16::<LittleEndian>(self.mark as u16)?;
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);
        Ok(())
    }
}

/// Decoded header fields: the payload sizes and the mark. The caller reads
/// the key and value bytes at the offsets these sizes imply.
#[derive(Debug, Clone, Copy)]
struct Header {
    key_size: u32,
    value_size: u32,
    mark: Mark,
}

impl Header {
    fn decode(mut buf: &[u8]) -> Result<Header, LogError> {
        let key_size = buf.read_u32::<LittleEndian>()?;
        let value_size = buf.read_u32::<LittleEndian>()?;
        let mark = Mark::from_wire(buf.read_u16::<LittleEndian>()?)?;
        Ok(Header {
            key_size,
            value_size,
            mark,
        })
    }
}

/// Handle to an append-only log file.
///
/// Owns the OS file handle and the append cursor. Reads are positional
/// (`read_exact_at`) and safe to issue concurrently from multiple threads
/// over the same handle; the cursor is mutated only by [`append`], which the
/// store serializes under its write lock. Dropping the handle releases the
/// file.
///
/// [`append`]: LogFile::append
pub struct LogFile {
    file: File,
    /// Byte offset of the next append; equals the file size between
    /// operations.
    offset: u64,
    /// Reusable scratch buffer so steady-state appends do not allocate.
    buf: Vec<u8>,
}

impl LogFile {
    /// Opens (or creates) a log file for read-write and positions the
    /// append cursor at the current end of file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let offset = file.metadata()?.len();
        Ok(Self {
            file,
            offset,
            buf: Vec::with_capacity(256),
        })
    }

    /// Opens `path` truncated to empty, discarding any existing contents,
    /// with the append cursor at 0.
    ///
    /// For freshly-built logs that will be renamed into place; [`open`]
    /// preserves existing contents and is the right call for a live log.
    ///
    /// [`open`]: LogFile::open
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file,
            offset: 0,
            buf: Vec::with_capacity(256),
        })
    }

    /// Current append cursor.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the record starting at `offset`.
    ///
    /// # Errors
    ///
    /// - [`LogError::EndOfLog`] if there are not enough bytes at `offset`
    ///   for a full header (including zero bytes: `offset` at or past EOF).
    /// - [`LogError::Corrupt`] if the header decodes to an unknown mark or
    ///   the payload read comes up short.
    /// - [`LogError::Io`] for any other I/O failure.
    pub fn read_at(&self, offset: u64) -> Result<Record, LogError> {
        let mut header_buf = [0u8; HEADER_SIZE as usize];
        match self.file.read_exact_at(&mut header_buf, offset) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(LogError::EndOfLog)
            }
            Err(e) => return Err(LogError::Io(e)),
        }
        let header = Header::decode(&header_buf)?;

        // A header without its full payload is a torn tail: corruption, not EOF.
        let mut key = vec![0u8; header.key_size as usize];
        self.read_payload(&mut key, offset + HEADER_SIZE)?;
        let mut value = vec![0u8; header.value_size as usize];
        self.read_payload(&mut value, offset + HEADER_SIZE + header.key_size as u64)?;

        Ok(Record {
            mark: header.mark,
            key,
            value,
        })
    }

    fn read_payload(&self, buf: &mut [u8], offset: u64) -> Result<(), LogError> {
        match self.file.read_exact_at(buf, offset) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(LogError::Corrupt),
            Err(e) => Err(LogError::Io(e)),
        }
    }

    /// Encodes `record` and appends it at the current cursor in a single
    /// positional write. Returns the offset the record was written at.
    ///
    /// The cursor advances only when the write succeeds; after a failure the
    /// next append starts at the same offset and overwrites whatever partial
    /// prefix made it to disk.
    pub fn append(&mut self, record: &Record) -> Result<u64, LogError> {
        let offset = self.offset;
        self.buf.clear();
        record.encode_into(&mut self.buf)?;
        self.file.write_all_at(&self.buf, offset)?;
        self.offset = offset + record.size();
        Ok(offset)
    }

    /// Forces all written data to disk via `sync_all()` (fsync).
    ///
    /// The append path itself never syncs; callers choose their durability
    /// points.
    pub fn sync(&self) -> Result<(), LogError> {
        self.file.sync_all()?;
        Ok(())
    }
}
