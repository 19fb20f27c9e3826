//! Storage pool capability consumed by the provisioner.
//!
//! The engine never owns a pool: it lists names, looks entries up, creates
//! new entries and streams bytes into them through a [`PoolSink`]. Pools
//! expose no atomic "entry complete" marker, so an entry created for an
//! in-flight ingestion is visible to `list_names` before its bytes are all
//! written. Callers enumerating concurrently may treat it as cached.
//!
//! The same holds between `create` and `open_write_sink`: the entry exists
//! empty under its final name. If no sink can be opened the ingestion calls
//! [`Pool::discard`] so the empty entry does not linger as a cache hit.

mod dir;

pub use dir::{DirEntry, DirPool, DirSink};

use async_trait::async_trait;
use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    #[error("no entry named {0}")]
    NotFound(String),
    #[error("entry {0} already exists")]
    AlreadyExists(String),
    #[error("invalid entry name {0:?}")]
    InvalidName(String),
    #[error("sink for {0} is already closed")]
    Closed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk format requested when an entry is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolumeFormat {
    #[default]
    Qcow2,
    Raw,
}

impl VolumeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeFormat::Qcow2 => "qcow2",
            VolumeFormat::Raw => "raw",
        }
    }
}

impl fmt::Display for VolumeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to a pool-resident entry.
pub trait PoolEntry: Send + Sync {
    fn name(&self) -> &str;
}

/// Write side of a freshly created entry. Exactly one of `commit` or
/// `abort` ends its life.
#[async_trait]
pub trait PoolSink: Send {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), PoolError>;

    /// Finalises the upload. On error the entry must not be left behind as
    /// if complete; implementations discard it before returning.
    async fn commit(self) -> Result<(), PoolError>;

    /// Discards the in-progress upload and the entry it targets.
    async fn abort(self) -> Result<(), PoolError>;
}

#[async_trait]
pub trait Pool: Send + Sync {
    type Entry: PoolEntry;
    type Sink: PoolSink;

    async fn list_names(&self) -> Result<Vec<String>, PoolError>;

    async fn lookup(&self, name: &str) -> Result<Self::Entry, PoolError>;

    /// `size_hint` of 0 means unknown; the real size is discovered by
    /// [`Pool::refresh`] after commit.
    async fn create(&self, name: &str, size_hint: u64, format: VolumeFormat) -> Result<Self::Entry, PoolError>;

    async fn open_write_sink(&self, entry: &Self::Entry) -> Result<Self::Sink, PoolError>;

    /// Removes an entry the current ingestion created but never completed.
    /// An already missing entry is not an error.
    async fn discard(&self, entry: &Self::Entry) -> Result<(), PoolError>;

    /// Re-reads entry metadata (sizes) after an upload.
    async fn refresh(&self) -> Result<(), PoolError> {
        Ok(())
    }
}
