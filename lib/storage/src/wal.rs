use crate::internal;
use parking_lot::Mutex;
use quiver_core::{Mutation, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const HEADER_LEN: usize = 8;
const RECORD_HEADER_LEN: usize = 8;

/// One logged DML batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    pub sequence: u64,
    pub mutations: Vec<Mutation>,
}

/// Contents of a log file read back during recovery.
#[derive(Debug, Default)]
pub struct WalContents {
    pub generation: Option<u64>,
    pub records: Vec<WalRecord>,
}

struct Inner {
    writer: BufWriter<File>,
    pending: Vec<u8>,
    sequence: u64,
    generation: u64,
}

/// Write-ahead log for one collection directory.
///
/// File layout: an 8 byte little-endian generation header, then records of
/// `len: u32 | crc32: u32 | bincode(WalRecord)`. The generation ties the log
/// to the snapshot it extends; a log whose generation differs from the
/// snapshot's is stale and ignored on recovery.
///
/// Appends collect in memory until `max_buffer_size` bytes are pending, then
/// reach the file. [`WriteAheadLog::flush`] writes everything and syncs.
pub struct WriteAheadLog {
    inner: Mutex<Inner>,
    raw_file: File,
    path: PathBuf,
    max_buffer_size: usize,
}

impl WriteAheadLog {
    /// Create (or truncate) the log at `path` for `generation`.
    pub fn create<P: AsRef<Path>>(path: P, generation: u64, max_buffer_size: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        let wal = Self::from_file(file, path, generation, 0, max_buffer_size)?;
        wal.write_header(generation)?;
        Ok(wal)
    }

    /// Open an existing log for appending after its records were replayed.
    pub fn open_append<P: AsRef<Path>>(
        path: P,
        contents: &WalContents,
        max_buffer_size: u64,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let generation = contents.generation.unwrap_or(0);
        let valid_len = Self::valid_length(&path)?;
        let mut file = OpenOptions::new().write(true).open(&path)?;
        // Cut any torn tail so new records follow the last intact one.
        file.set_len(valid_len)?;
        file.seek(SeekFrom::End(0))?;
        let sequence = contents.records.last().map_or(0, |r| r.sequence);
        Self::from_file(file, path, generation, sequence, max_buffer_size)
    }

    /// Wrap an already positioned log file.
    pub(crate) fn from_file(
        file: File,
        path: PathBuf,
        generation: u64,
        sequence: u64,
        max_buffer_size: u64,
    ) -> Result<Self> {
        let raw_file = file.try_clone()?;
        Ok(Self {
            inner: Mutex::new(Inner {
                writer: BufWriter::new(file),
                pending: Vec::new(),
                sequence,
                generation,
            }),
            raw_file,
            path,
            max_buffer_size: max_buffer_size as usize,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Queue one batch of mutations.
    pub fn append(&self, mutations: Vec<Mutation>) -> Result<()> {
        if mutations.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock();
        inner.sequence += 1;
        let record = WalRecord {
            sequence: inner.sequence,
            mutations,
        };
        let payload = bincode::serialize(&record).map_err(internal("encode WAL record"))?;
        let checksum = crc32fast::hash(&payload);
        inner.pending.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        inner.pending.extend_from_slice(&checksum.to_le_bytes());
        inner.pending.extend_from_slice(&payload);

        if inner.pending.len() >= self.max_buffer_size {
            Self::drain(&mut inner)?;
        }
        Ok(())
    }

    /// Write pending records and sync them to disk.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        Self::drain(&mut inner)?;
        self.raw_file.sync_data()?;
        Ok(())
    }

    /// Discard the log contents and start over at `generation`. Pending
    /// records are dropped: the caller has persisted them in a snapshot.
    pub fn reset(&self, generation: u64) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            inner.pending.clear();
            inner.writer.flush()?;
            inner.writer.get_mut().set_len(0)?;
            inner.writer.get_mut().seek(SeekFrom::Start(0))?;
            inner.sequence = 0;
            inner.generation = generation;
        }
        self.write_header(generation)
    }

    fn write_header(&self, generation: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.writer.write_all(&generation.to_le_bytes())?;
        inner.writer.flush()?;
        self.raw_file.sync_all()?;
        Ok(())
    }

    fn drain(inner: &mut Inner) -> Result<()> {
        if !inner.pending.is_empty() {
            let pending = std::mem::take(&mut inner.pending);
            inner.writer.write_all(&pending)?;
        }
        inner.writer.flush()?;
        Ok(())
    }

    /// Read every intact record. Reading stops at the first torn or corrupt
    /// record; everything before it is returned.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<WalContents> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(WalContents::default());
        }
        let bytes = std::fs::read(path)?;
        let (contents, _) = Self::parse(&bytes, path);
        Ok(contents)
    }

    fn valid_length(path: &Path) -> Result<u64> {
        let bytes = std::fs::read(path)?;
        Ok(Self::parse(&bytes, path).1 as u64)
    }

    fn parse(bytes: &[u8], path: &Path) -> (WalContents, usize) {
        let mut contents = WalContents::default();
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return (contents, 0);
        };
        let mut generation = [0u8; HEADER_LEN];
        generation.copy_from_slice(header);
        contents.generation = Some(u64::from_le_bytes(generation));

        let mut offset = HEADER_LEN;
        while offset < bytes.len() {
            let Some(frame) = bytes.get(offset..offset + RECORD_HEADER_LEN) else {
                warn!("Torn record header at offset {} in {:?}", offset, path);
                break;
            };
            let len = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
            let checksum = u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);
            let start = offset + RECORD_HEADER_LEN;
            let Some(payload) = bytes.get(start..start + len) else {
                warn!("Torn record at offset {} in {:?}", offset, path);
                break;
            };
            if crc32fast::hash(payload) != checksum {
                warn!("Checksum mismatch at offset {} in {:?}", offset, path);
                break;
            }
            match bincode::deserialize::<WalRecord>(payload) {
                Ok(record) => contents.records.push(record),
                Err(e) => {
                    warn!("Undecodable record at offset {} in {:?}: {}", offset, path, e);
                    break;
                }
            }
            offset = start + len;
        }
        (contents, offset)
    }
}

impl Drop for WriteAheadLog {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        if let Err(e) = Self::drain(&mut inner) {
            warn!("Failed to write buffered WAL records to {:?}: {}", self.path, e);
            return;
        }
        if let Err(e) = self.raw_file.sync_data() {
            warn!("Failed to sync {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_core::Doc;

    fn put(pk: &str) -> Mutation {
        Mutation::Put(Doc::new(pk))
    }

    #[test]
    fn test_append_flush_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let wal = WriteAheadLog::create(&path, 3, 1 << 20).unwrap();
        wal.append(vec![put("a"), put("b")]).unwrap();
        wal.append(vec![Mutation::Delete("a".to_string())]).unwrap();

        // Still buffered.
        assert_eq!(WriteAheadLog::read(&path).unwrap().records.len(), 0);

        wal.flush().unwrap();
        let contents = WriteAheadLog::read(&path).unwrap();
        assert_eq!(contents.generation, Some(3));
        assert_eq!(contents.records.len(), 2);
        assert_eq!(contents.records[1].sequence, 2);
        assert_eq!(contents.records[0].mutations, vec![put("a"), put("b")]);
    }

    #[test]
    fn test_zero_buffer_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let wal = WriteAheadLog::create(&path, 1, 0).unwrap();
        wal.append(vec![put("a")]).unwrap();
        assert_eq!(WriteAheadLog::read(&path).unwrap().records.len(), 1);
    }

    #[test]
    fn test_drop_writes_pending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");
        {
            let wal = WriteAheadLog::create(&path, 1, 1 << 20).unwrap();
            wal.append(vec![put("a")]).unwrap();
        }
        assert_eq!(WriteAheadLog::read(&path).unwrap().records.len(), 1);
    }

    #[test]
    fn test_torn_tail_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let wal = WriteAheadLog::create(&path, 1, 0).unwrap();
        wal.append(vec![put("a")]).unwrap();
        wal.append(vec![put("b")]).unwrap();
        drop(wal);

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
        let contents = WriteAheadLog::read(&path).unwrap();
        assert_eq!(contents.records.len(), 1);

        let wal = WriteAheadLog::open_append(&path, &contents, 0).unwrap();
        wal.append(vec![put("c")]).unwrap();
        drop(wal);
        let contents = WriteAheadLog::read(&path).unwrap();
        assert_eq!(contents.records.len(), 2);
        assert_eq!(contents.records[1].sequence, 2);
    }

    #[test]
    fn test_reset_changes_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let wal = WriteAheadLog::create(&path, 1, 0).unwrap();
        wal.append(vec![put("a")]).unwrap();
        wal.reset(2).unwrap();
        let contents = WriteAheadLog::read(&path).unwrap();
        assert_eq!(contents.generation, Some(2));
        assert!(contents.records.is_empty());
        assert_eq!(wal.generation(), 2);
    }
}
