use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::cloud::{ArtifactDescriptor, Checksum, join_url};
use crate::error::ProvisionError;

/// A version string split into the upstream release name and the numeric
/// version used in filenames, eg. `precise` / `12.04`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedVersion {
    pub release: String,
    pub version: String,
}

/// Per-distribution resolution rules.
#[async_trait]
pub trait DistroStrategy: Send + Sync {
    /// Registry key, eg. `ubuntu`.
    fn name(&self) -> &str;

    /// Maps a numeric version to its codename and a codename to its number.
    /// Unknown inputs pass through unchanged.
    fn normalize_version(&self, version: &str) -> NormalizedVersion;

    /// Most recent stable serial published for `release`.
    async fn latest_serial(&self, client: &Client, release: &str) -> Result<String, ProvisionError>;

    fn artifact_filename(&self, arch: &str, version: &str) -> String;

    /// Directory holding the artifact and its checksum manifest.
    fn artifact_base_url(&self, release: &str, serial: &str) -> String;

    async fn checksum_for(&self, client: &Client, base_url: &str, filename: &str) -> Result<Checksum, ProvisionError>;

    /// Versions offered by the interactive picker.
    fn known_versions(&self) -> Vec<String> {
        Vec::new()
    }

    async fn resolve(&self, client: &Client, version: &str, arch: &str) -> Result<ArtifactDescriptor, ProvisionError> {
        let normalized = self.normalize_version(&version.to_lowercase());
        debug!(distro = self.name(), release = %normalized.release, version = %normalized.version, "Normalized version");

        let serial = self.latest_serial(client, &normalized.release).await?;
        let filename = self.artifact_filename(arch, &normalized.version);
        let base_url = self.artifact_base_url(&normalized.release, &serial);
        let checksum = self.checksum_for(client, &base_url, &filename).await?;

        Ok(ArtifactDescriptor::new(
            join_url(&base_url, &filename),
            serial,
            Some(checksum),
        ))
    }
}

/// Upstream image names use Debian architecture names.
pub fn normalize_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    }
}

/// Finds `filename` in a `hash filename` manifest. The filename may carry a
/// leading `*` (binary mode marker).
pub fn parse_checksum_manifest(body: &str, filename: &str) -> Option<String> {
    body.lines().find_map(|line| {
        let mut fields = line.split_whitespace();
        let hash = fields.next()?;
        let file = fields.next()?;
        let file = file.strip_prefix('*').unwrap_or(file);
        (file == filename).then(|| hash.to_string())
    })
}
