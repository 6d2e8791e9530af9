//! # File-Backed Pool Storage
//!
//! Keeps the pool in a single `pool.dat` file, rewritten atomically (write
//! to a sibling temp file, then rename) on every sync.
//!
//! Format: `[MAGIC][COUNT][RECORD]...`, all integers little-endian.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use shared_types::Id;
use tracing::debug;

use crate::domain::{PersistedTransaction, PoolError, Result};
use crate::ports::PersistentPoolStorage;

/// Magic bytes for pool.dat
const POOL_MAGIC: &[u8; 8] = b"DCTPOOL\x01";

/// File name used inside the storage directory.
pub const POOL_FILE_NAME: &str = "pool.dat";

#[derive(Debug)]
pub struct FilePoolStorage {
    path: PathBuf,
    records: BTreeMap<Id, PersistedTransaction>,
    closed: bool,
}

impl FilePoolStorage {
    /// Open (or prepare) `pool.dat` under `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(POOL_FILE_NAME);
        let records = match fs::read(&path) {
            Ok(bytes) => decode(&bytes)?
                .into_iter()
                .map(|r| (r.id.clone(), r))
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), records = records.len(), "[dc-02] Opened pool storage");
        Ok(Self {
            path,
            records,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(PoolError::Closed);
        }
        Ok(())
    }

    fn write(&self) -> Result<()> {
        let bytes = encode(self.records.values());
        let tmp = self.path.with_extension("dat.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PersistentPoolStorage for FilePoolStorage {
    fn load_all(&mut self) -> Result<Vec<PersistedTransaction>> {
        self.ensure_open()?;
        let mut all: Vec<_> = self.records.values().cloned().collect();
        all.sort_by_key(|r| r.sequence);
        Ok(all)
    }

    fn bulk_add(&mut self, records: Vec<PersistedTransaction>) -> Result<()> {
        self.ensure_open()?;
        if records.is_empty() {
            return Ok(());
        }
        for record in records {
            self.records.insert(record.id.clone(), record);
        }
        self.write()
    }

    fn bulk_remove_by_id(&mut self, ids: &[Id]) -> Result<()> {
        self.ensure_open()?;
        let before = self.records.len();
        for id in ids {
            self.records.remove(id);
        }
        if self.records.len() == before {
            return Ok(());
        }
        self.write()
    }

    fn delete_all(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.records.clear();
        self.write()
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.write()?;
            self.closed = true;
        }
        Ok(())
    }
}

// =============================================================================
// CODEC
// =============================================================================

fn encode<'a>(records: impl ExactSizeIterator<Item = &'a PersistedTransaction>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(records.len() * 256 + 16);
    buf.extend_from_slice(POOL_MAGIC);
    buf.extend_from_slice(&(records.len() as u64).to_le_bytes());
    for record in records {
        write_record(&mut buf, record);
    }
    buf
}

fn decode(data: &[u8]) -> Result<Vec<PersistedTransaction>> {
    let mut reader = data;

    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != POOL_MAGIC {
        return Err(PoolError::Corrupt("invalid magic".into()));
    }

    let count = read_u64(&mut reader)?;
    let mut records = Vec::with_capacity(count.min(1 << 16) as usize);
    for _ in 0..count {
        records.push(read_record(&mut reader)?);
    }
    Ok(records)
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn write_record(buf: &mut Vec<u8>, record: &PersistedTransaction) {
    write_bytes(buf, record.id.as_bytes());
    write_bytes(buf, record.sender_public_key.as_bytes());
    buf.extend_from_slice(&record.sequence.to_le_bytes());
    buf.extend_from_slice(&record.added_at.to_le_bytes());
    buf.extend_from_slice(&record.expires_at.to_le_bytes());
    write_bytes(buf, &record.serialized);
}

fn read_u64(reader: &mut &[u8]) -> io::Result<u64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

fn read_bytes(reader: &mut &[u8]) -> io::Result<Vec<u8>> {
    let mut len = [0u8; 4];
    reader.read_exact(&mut len)?;
    let len = u32::from_le_bytes(len) as usize;
    if len > reader.len() {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated field"));
    }
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn read_string(reader: &mut &[u8]) -> Result<String> {
    String::from_utf8(read_bytes(reader)?).map_err(|e| PoolError::Corrupt(e.to_string()))
}

fn read_record(reader: &mut &[u8]) -> Result<PersistedTransaction> {
    let id = read_string(reader)?;
    let sender_public_key = read_string(reader)?;
    let sequence = read_u64(reader)?;
    let added_at = read_u64(reader)?;
    let expires_at = read_u64(reader)?;
    let serialized = read_bytes(reader)?;
    Ok(PersistedTransaction {
        id,
        sender_public_key,
        serialized,
        sequence,
        added_at,
        expires_at,
    })
}
