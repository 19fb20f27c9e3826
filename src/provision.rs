//! Acquisition orchestrator: cache hit short-circuits, cache miss resolves
//! and ingests.
//!
//! Two concurrent `ensure` calls for the same tuple can both miss the cache
//! and both try to ingest. The pool's own create semantics settle the name
//! collision; nothing here locks around the pool.

use reqwest::Client;
use tracing::{debug, info};

use crate::cache;
use crate::cloud::{ArtifactDescriptor, CacheEntryName};
use crate::error::ProvisionError;
use crate::helpers::http::{ClientSettings, get_ok};
use crate::helpers::ingest::{DEFAULT_CHUNK_SIZE, Ingestion, download_progress_bar};
use crate::pool::{Pool, VolumeFormat};
use crate::repositories::ResolverRegistry;

/// Holds the HTTP client and resolver registry shared by every `ensure` call.
#[derive(Debug, Clone)]
pub struct Provisioner {
    client: Client,
    registry: ResolverRegistry,
    format: VolumeFormat,
    chunk_size: usize,
    show_progress: bool,
}

impl Provisioner {
    pub fn new(client: Client, registry: ResolverRegistry) -> Self {
        Self {
            client,
            registry,
            format: VolumeFormat::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            show_progress: false,
        }
    }

    pub fn from_settings(settings: &ClientSettings, registry: ResolverRegistry) -> Result<Self, ProvisionError> {
        let client = settings
            .build()
            .map_err(|e| ProvisionError::InvalidRequest(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::new(client, registry))
    }

    pub fn with_format(mut self, format: VolumeFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Draw a terminal progress bar while ingesting.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Resolves the tuple to a downloadable artifact without touching any pool.
    pub async fn resolve(&self, distro: &str, version: &str, arch: &str) -> Result<ArtifactDescriptor, ProvisionError> {
        validate(distro, version, arch)?;
        self.registry.resolve(&self.client, distro, version, arch).await
    }

    /// Returns the pool entry for the tuple, downloading and verifying it
    /// first if the pool has none. A cached name is trusted as-is.
    pub async fn ensure<P: Pool>(
        &self,
        pool: &P,
        distro: &str,
        version: &str,
        arch: &str,
    ) -> Result<P::Entry, ProvisionError> {
        validate(distro, version, arch)?;

        debug!("Listing cloud images in pool");
        let names = pool.list_names().await?;
        if let Some(name) = cache::find_existing(&names, distro, version, arch) {
            debug!(%name, "Already have cloud image");
            return Ok(pool.lookup(name.as_str()).await?);
        }

        debug!(distro, version, arch, "Discovering cloud images");
        let descriptor = self.registry.resolve(&self.client, distro, version, arch).await?;
        info!(serial = descriptor.serial(), "Will fetch serial number");

        let name = CacheEntryName::new(distro, version, descriptor.serial(), arch)
            .ok_or_else(|| ProvisionError::not_found("serial (resolver returned an empty one)", descriptor.url()))?;

        info!(url = descriptor.url(), %name, "Downloading image");
        let source = get_ok(&self.client, descriptor.url()).await?;

        let mut ingestion = Ingestion::new(name, descriptor.checksum().cloned())
            .with_format(self.format)
            .with_chunk_size(self.chunk_size);
        if self.show_progress {
            ingestion = ingestion.with_progress(download_progress_bar());
        }

        let ingested = ingestion.run(pool, source).await?;
        Ok(ingested.entry)
    }
}

fn validate(distro: &str, version: &str, arch: &str) -> Result<(), ProvisionError> {
    for (field, value) in [("distro", distro), ("version", version), ("arch", arch)] {
        if value.trim().is_empty() {
            return Err(ProvisionError::InvalidRequest(format!("{field} must not be empty")));
        }
        if value.contains(['/', '\\']) {
            return Err(ProvisionError::InvalidRequest(format!("{field} must not contain path separators")));
        }
    }
    Ok(())
}
