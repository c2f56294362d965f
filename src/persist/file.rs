//! File-backed snapshot store.

use super::SnapshotStore;
use crate::error::{Result, SyncError};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Magic bytes for snapshot files.
const SNAPSHOT_MAGIC: &[u8; 4] = b"LSS\0";

/// Current snapshot format version.
const SNAPSHOT_VERSION: u8 = 1;

/// One framed file per key under a base directory.
///
/// Frame layout: magic, version byte, u64 payload length, payload, crc32.
/// A corrupt or truncated frame surfaces as an error; the provider treats
/// that as an absent snapshot.
pub struct FileSnapshots {
    path: PathBuf,
}

impl FileSnapshots {
    /// Create a snapshot store rooted at the given directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.path.join(format!("{key}.snap"))
    }
}

impl SnapshotStore for FileSnapshots {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let blob_path = self.blob_path(key);
        if !blob_path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&blob_path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != SNAPSHOT_MAGIC {
            return Err(SyncError::InvalidFormat("bad snapshot magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != SNAPSHOT_VERSION {
            return Err(SyncError::InvalidFormat(format!(
                "unsupported snapshot version: {}",
                version[0]
            )));
        }

        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes) as usize;

        let mut blob = vec![0u8; len];
        file.read_exact(&mut blob)?;

        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let stored = u32::from_le_bytes(checksum_bytes);
        let computed = crc32fast::hash(&blob);
        if stored != computed {
            return Err(SyncError::ChecksumMismatch {
                expected: stored,
                got: computed,
            });
        }

        Ok(Some(blob))
    }

    fn save(&self, key: &str, blob: &[u8]) -> Result<()> {
        let mut file = File::create(self.blob_path(key))?;

        file.write_all(SNAPSHOT_MAGIC)?;
        file.write_all(&[SNAPSHOT_VERSION])?;
        file.write_all(&(blob.len() as u64).to_le_bytes())?;
        file.write_all(blob)?;
        file.write_all(&crc32fast::hash(blob).to_le_bytes())?;
        file.sync_all()?;

        Ok(())
    }
}
