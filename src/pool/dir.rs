use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::{Pool, PoolEntry, PoolError, PoolSink, VolumeFormat};

/// A pool backed by a plain directory: one regular file per entry.
#[derive(Debug, Clone)]
pub struct DirPool {
    root: PathBuf,
}

impl DirPool {
    /// Opens (creating if needed) the directory at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, PoolError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, name: &str) -> Result<PathBuf, PoolError> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(PoolError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    path: PathBuf,
}

impl DirEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size in bytes.
    pub async fn size(&self) -> Result<u64, PoolError> {
        Ok(fs::metadata(&self.path).await?.len())
    }
}

impl PoolEntry for DirEntry {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Writes into a [`DirEntry`]. Dropping it without `commit` or `abort`
/// removes the partial file.
#[derive(Debug)]
pub struct DirSink {
    name: String,
    path: PathBuf,
    file: Option<fs::File>,
}

#[async_trait]
impl PoolSink for DirSink {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), PoolError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| PoolError::Closed(self.name.clone()))?;
        file.write_all(bytes).await?;
        Ok(())
    }

    async fn commit(mut self) -> Result<(), PoolError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| PoolError::Closed(self.name.clone()))?;
        let synced = match file.flush().await {
            Ok(()) => file.sync_all().await,
            Err(e) => Err(e),
        };
        if let Err(e) = synced {
            warn!(name = %self.name, error = %e, "Commit failed, removing partial entry");
            drop(self.file.take());
            remove_if_present(&self.path).await?;
            return Err(e.into());
        }
        // only now is the file released; Drop leaves committed entries alone
        self.file = None;
        debug!(name = %self.name, "Committed pool entry");
        Ok(())
    }

    async fn abort(mut self) -> Result<(), PoolError> {
        // close before unlinking
        drop(self.file.take());
        remove_if_present(&self.path).await?;
        debug!(name = %self.name, "Aborted pool entry");
        Ok(())
    }
}

async fn remove_if_present(path: &Path) -> Result<(), PoolError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl Drop for DirSink {
    fn drop(&mut self) {
        if self.file.take().is_some() {
            warn!(name = %self.name, "Sink dropped mid-upload, removing partial entry");
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[async_trait]
impl Pool for DirPool {
    type Entry = DirEntry;
    type Sink = DirSink;

    async fn list_names(&self) -> Result<Vec<String>, PoolError> {
        let mut names = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn lookup(&self, name: &str) -> Result<DirEntry, PoolError> {
        let path = self.entry_path(name)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(DirEntry {
                name: name.to_string(),
                path,
            }),
            Ok(_) => Err(PoolError::NotFound(name.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PoolError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, name: &str, size_hint: u64, format: VolumeFormat) -> Result<DirEntry, PoolError> {
        let path = self.entry_path(name)?;
        debug!(%name, size_hint, %format, "Creating pool entry");
        match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(_) => Ok(DirEntry {
                name: name.to_string(),
                path,
            }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(PoolError::AlreadyExists(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn open_write_sink(&self, entry: &DirEntry) -> Result<DirSink, PoolError> {
        let file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&entry.path)
            .await?;
        Ok(DirSink {
            name: entry.name.clone(),
            path: entry.path.clone(),
            file: Some(file),
        })
    }

    async fn discard(&self, entry: &DirEntry) -> Result<(), PoolError> {
        debug!(name = %entry.name, "Discarding pool entry");
        remove_if_present(&entry.path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_write_commit_is_listed() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DirPool::open(dir.path()).await.unwrap();

        let entry = pool.create("a.img", 0, VolumeFormat::Qcow2).await.unwrap();
        let mut sink = pool.open_write_sink(&entry).await.unwrap();
        sink.write(b"hello").await.unwrap();
        sink.commit().await.unwrap();

        assert_eq!(pool.list_names().await.unwrap(), vec!["a.img".to_string()]);
        let found = pool.lookup("a.img").await.unwrap();
        assert_eq!(found.size().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn abort_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DirPool::open(dir.path()).await.unwrap();

        let entry = pool.create("b.img", 0, VolumeFormat::Raw).await.unwrap();
        let mut sink = pool.open_write_sink(&entry).await.unwrap();
        sink.write(b"partial").await.unwrap();
        // visible while streaming
        assert_eq!(pool.list_names().await.unwrap().len(), 1);
        sink.abort().await.unwrap();

        assert!(pool.list_names().await.unwrap().is_empty());
        assert!(matches!(pool.lookup("b.img").await, Err(PoolError::NotFound(_))));
    }

    #[tokio::test]
    async fn dropped_sink_removes_partial_entry() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DirPool::open(dir.path()).await.unwrap();

        let entry = pool.create("c.img", 0, VolumeFormat::Qcow2).await.unwrap();
        let sink = pool.open_write_sink(&entry).await.unwrap();
        drop(sink);

        assert!(pool.list_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DirPool::open(dir.path()).await.unwrap();

        pool.create("d.img", 0, VolumeFormat::Qcow2).await.unwrap();
        let err = pool.create("d.img", 0, VolumeFormat::Qcow2).await.unwrap_err();
        assert!(matches!(err, PoolError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn discard_removes_unopened_entry() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DirPool::open(dir.path()).await.unwrap();

        let entry = pool.create("e.img", 0, VolumeFormat::Qcow2).await.unwrap();
        pool.discard(&entry).await.unwrap();
        assert!(pool.list_names().await.unwrap().is_empty());
        // second discard is a no-op
        pool.discard(&entry).await.unwrap();
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn failed_commit_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DirPool::open(dir.path()).await.unwrap();

        // writes to /dev/full surface ENOSPC once the write is flushed
        let path = dir.path().join("full.img");
        std::os::unix::fs::symlink("/dev/full", &path).unwrap();
        let entry = DirEntry {
            name: "full.img".to_string(),
            path: path.clone(),
        };

        let mut sink = pool.open_write_sink(&entry).await.unwrap();
        sink.write(b"bytes that never land").await.unwrap();
        assert!(sink.commit().await.is_err());

        assert!(std::fs::symlink_metadata(&path).is_err());
        assert!(pool.list_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DirPool::open(dir.path()).await.unwrap();

        let err = pool.create("../escape.img", 0, VolumeFormat::Qcow2).await.unwrap_err();
        assert!(matches!(err, PoolError::InvalidName(_)));
    }
}
