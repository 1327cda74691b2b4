//! Pool persistence.
//!
//! The pool is always read and written whole. Every write is a
//! compare-and-swap against the version returned by [`PoolStore::load`], so
//! two test runners racing on the same file cannot both win.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Deserialize;
use tracing::debug;

use crate::error::PoolError;
use crate::record::{CredentialRecord, PoolDocument, Versioned};

/// Whole-collection storage with optimistic concurrency.
pub trait PoolStore: Send + Sync {
    /// Read the full collection and the version it was read at.
    fn load(&self) -> Result<Versioned<Vec<CredentialRecord>>, PoolError>;

    /// Write the full collection if the stored version still equals
    /// `expected_version`. Returns the new version.
    fn save(&self, expected_version: u64, records: &[CredentialRecord]) -> Result<u64, PoolError>;

    /// Write the full collection unconditionally. Returns the new version.
    fn replace(&self, records: &[CredentialRecord]) -> Result<u64, PoolError>;
}

/// JSON file accepted on load: the versioned document, or a bare record
/// array as written by older harness versions.
#[derive(Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Document(PoolDocument),
    Legacy(Vec<CredentialRecord>),
}

impl From<OnDisk> for PoolDocument {
    fn from(disk: OnDisk) -> Self {
        match disk {
            OnDisk::Document(doc) => doc,
            OnDisk::Legacy(records) => PoolDocument {
                version: 0,
                records,
            },
        }
    }
}

/// Pool stored in a JSON file shared by every test process on the host.
#[derive(Debug, Clone)]
pub struct FilePoolStore {
    path: PathBuf,
}

impl FilePoolStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn read_document(&self) -> Result<PoolDocument, PoolError> {
        let contents =
            fs::read_to_string(&self.path).map_err(|e| PoolError::io(&self.path, e))?;
        let disk: OnDisk = serde_json::from_str(&contents).map_err(|source| PoolError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(disk.into())
    }

    /// Write to a temp file and rename over the pool so readers never see a
    /// torn document.
    fn write_document(&self, doc: &PoolDocument) -> Result<(), PoolError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PoolError::io(parent, e))?;
        }

        let tmp_path = self.path.with_extension("tmp");
        let contents = serde_json::to_string_pretty(doc)?;
        fs::write(&tmp_path, contents).map_err(|e| PoolError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| PoolError::io(&self.path, e))?;

        debug!(
            path = %self.path.display(),
            version = doc.version,
            record_count = doc.records.len(),
            "Saved credential pool"
        );
        Ok(())
    }

    fn lock(&self) -> Result<FileLock, PoolError> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PoolError::io(parent, e))?;
        }
        FileLock::acquire(&lock_path).map_err(|e| PoolError::io(&lock_path, e))
    }
}

impl PoolStore for FilePoolStore {
    fn load(&self) -> Result<Versioned<Vec<CredentialRecord>>, PoolError> {
        let doc = self.read_document()?;
        Ok(Versioned {
            version: doc.version,
            value: doc.records,
        })
    }

    fn save(&self, expected_version: u64, records: &[CredentialRecord]) -> Result<u64, PoolError> {
        let _lock = self.lock()?;

        let current = self.read_document()?.version;
        if current != expected_version {
            return Err(PoolError::Conflict {
                expected: expected_version,
                actual: current,
            });
        }

        let doc = PoolDocument {
            version: current + 1,
            records: records.to_vec(),
        };
        self.write_document(&doc)?;
        Ok(doc.version)
    }

    fn replace(&self, records: &[CredentialRecord]) -> Result<u64, PoolError> {
        let _lock = self.lock()?;

        // A fresh or unreadable file starts the version sequence over.
        let current = self.read_document().map(|doc| doc.version).unwrap_or(0);
        let doc = PoolDocument {
            version: current + 1,
            records: records.to_vec(),
        };
        self.write_document(&doc)?;
        Ok(doc.version)
    }
}

/// Exclusive advisory lock held for the lifetime of the guard.
///
/// Released by the OS when the descriptor is closed on drop.
struct FileLock {
    _file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        flock_exclusive(&file)?;
        Ok(Self { _file: file })
    }
}

#[cfg(unix)]
fn flock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn flock_exclusive(file: &File) -> std::io::Result<()> {
    file.lock()
}

/// In-process pool with the same compare-and-swap rules as the file store.
#[derive(Debug, Default)]
pub struct MemoryPoolStore {
    doc: Mutex<PoolDocument>,
}

impl MemoryPoolStore {
    pub fn new(records: Vec<CredentialRecord>) -> Self {
        Self {
            doc: Mutex::new(PoolDocument {
                version: 1,
                records,
            }),
        }
    }

    fn with_doc<T>(&self, f: impl FnOnce(&mut PoolDocument) -> T) -> T {
        let mut guard = self
            .doc
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

impl PoolStore for MemoryPoolStore {
    fn load(&self) -> Result<Versioned<Vec<CredentialRecord>>, PoolError> {
        Ok(self.with_doc(|doc| Versioned {
            version: doc.version,
            value: doc.records.clone(),
        }))
    }

    fn save(&self, expected_version: u64, records: &[CredentialRecord]) -> Result<u64, PoolError> {
        self.with_doc(|doc| {
            if doc.version != expected_version {
                return Err(PoolError::Conflict {
                    expected: expected_version,
                    actual: doc.version,
                });
            }
            doc.version += 1;
            doc.records = records.to_vec();
            Ok(doc.version)
        })
    }

    fn replace(&self, records: &[CredentialRecord]) -> Result<u64, PoolError> {
        Ok(self.with_doc(|doc| {
            doc.version += 1;
            doc.records = records.to_vec();
            doc.version
        }))
    }
}
