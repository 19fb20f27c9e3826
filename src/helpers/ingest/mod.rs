//! Verified ingestion: copy a byte source into a new pool entry while
//! hashing every chunk, then commit or abort on the digest comparison.

mod digest;
mod source;

pub use digest::{RunningDigest, digest_hex, digest_reader};
pub use source::{ByteSource, StreamSource};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::cloud::{CacheEntryName, Checksum};
use crate::error::ProvisionError;
use crate::pool::{Pool, PoolSink, VolumeFormat};

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Idle,
    Streaming,
    Verifying,
    Committed,
    Aborted,
}

/// What a committed ingestion produced.
#[derive(Debug)]
pub struct Ingested<E> {
    pub entry: E,
    pub bytes: u64,
    /// `None` when no checksum was supplied and verification was skipped.
    pub computed: Option<String>,
}

/// One ingestion attempt. Not reusable: a second `run` is refused.
pub struct Ingestion {
    name: CacheEntryName,
    expected: Option<Checksum>,
    format: VolumeFormat,
    chunk_size: usize,
    progress: ProgressBar,
    state: IngestState,
}

impl Ingestion {
    pub fn new(name: CacheEntryName, expected: Option<Checksum>) -> Self {
        Self {
            name,
            expected,
            format: VolumeFormat::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress: ProgressBar::hidden(),
            state: IngestState::Idle,
        }
    }

    pub fn with_format(mut self, format: VolumeFormat) -> Self {
        self.format = format;
        self
    }

    /// Upper bound on the size of each write into the sink. Zero is bumped to one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> IngestState {
        self.state
    }

    pub fn name(&self) -> &CacheEntryName {
        &self.name
    }

    fn enter(&mut self, next: IngestState) {
        debug!(name = %self.name, from = ?self.state, to = ?next, "Ingestion state change");
        self.state = next;
    }

    /// Streams `source` into a freshly created entry of `pool`.
    pub async fn run<P, S>(&mut self, pool: &P, mut source: S) -> Result<Ingested<P::Entry>, ProvisionError>
    where
        P: Pool,
        S: ByteSource,
    {
        if self.state != IngestState::Idle {
            return Err(ProvisionError::InvalidRequest(format!(
                "ingestion of {} already ran",
                self.name
            )));
        }

        let entry = pool.create(self.name.as_str(), 0, self.format).await?;
        let mut sink = match pool.open_write_sink(&entry).await {
            Ok(sink) => sink,
            Err(e) => {
                // the entry already exists empty under its final name
                self.discard(pool, &entry).await;
                return Err(e.into());
            }
        };
        self.enter(IngestState::Streaming);

        if let Some(len) = source.len_hint() {
            self.progress.set_length(len);
        }
        self.progress.set_message(format!("Ingesting {}", self.name));

        let mut digest = self.expected.as_ref().map(|c| RunningDigest::new(c.algorithm()));
        let mut total: u64 = 0;

        loop {
            let chunk = match source.next_chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    let err = self.transport_error(e);
                    return Err(self.abort(sink, err).await);
                }
            };

            for piece in chunk.chunks(self.chunk_size) {
                if let Some(digest) = digest.as_mut() {
                    digest.update(piece);
                }
                if let Err(e) = sink.write(piece).await {
                    let err = self.transport_error(e);
                    return Err(self.abort(sink, err).await);
                }
                total += piece.len() as u64;
                self.progress.inc(piece.len() as u64);
            }
        }

        self.enter(IngestState::Verifying);
        let computed = match (digest, self.expected.as_ref()) {
            (Some(digest), Some(expected)) => {
                let computed = digest.finish();
                if !expected.matches(&computed) {
                    let err = ProvisionError::Integrity {
                        name: self.name.to_string(),
                        algorithm: expected.algorithm(),
                        expected: expected.value().to_string(),
                        computed,
                    };
                    return Err(self.abort(sink, err).await);
                }
                debug!(name = %self.name, algorithm = %expected.algorithm(), "Checksum verified");
                Some(computed)
            }
            _ => {
                warn!(name = %self.name, "No checksum supplied, committing unverified");
                None
            }
        };

        if let Err(e) = sink.commit().await {
            let err = self.transport_error(e);
            warn!(name = %self.name, error = %err, "Commit failed");
            self.discard(pool, &entry).await;
            return Err(err);
        }
        self.enter(IngestState::Committed);
        self.progress.finish_with_message(format!("Ingested {} ({total} bytes)", self.name));

        if let Err(e) = pool.refresh().await {
            warn!(name = %self.name, error = %e, "Pool refresh after commit failed");
        }
        info!(name = %self.name, bytes = total, "Ingestion committed");

        Ok(Ingested {
            entry,
            bytes: total,
            computed,
        })
    }

    fn transport_error(&self, err: impl ToString) -> ProvisionError {
        ProvisionError::Transport {
            name: self.name.to_string(),
            reason: err.to_string(),
        }
    }

    /// Tells the pool to discard the partial entry, then hands back `err`.
    async fn abort<K: PoolSink>(&mut self, sink: K, err: ProvisionError) -> ProvisionError {
        self.enter(IngestState::Aborted);
        self.progress.abandon();
        warn!(name = %self.name, error = %err, "Aborting ingestion");
        if let Err(abort_err) = sink.abort().await {
            error!(name = %self.name, error = %abort_err, "Pool refused to abort partial entry");
        }
        err
    }

    /// Removes `entry` once its sink is gone (never opened, or consumed by a
    /// failed commit).
    async fn discard<P: Pool>(&mut self, pool: &P, entry: &P::Entry) {
        self.enter(IngestState::Aborted);
        self.progress.abandon();
        if let Err(e) = pool.discard(entry).await {
            error!(name = %self.name, error = %e, "Pool refused to discard entry");
        }
    }
}

/// Progress bar in the style the binary shows for downloads.
pub fn download_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] \
         {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
