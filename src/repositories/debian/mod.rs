use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;
use tracing::debug;

use crate::cloud::{Checksum, HashAlgorithm, join_url};
use crate::error::ProvisionError;
use crate::helpers::http::fetch_text;
use crate::repositories::strategy::{DistroStrategy, NormalizedVersion, normalize_arch, parse_checksum_manifest};

pub const DEFAULT_BASE_URL: &str = "https://cloud.debian.org/images/cloud";
const CHECKSUM_FILENAME: &str = "SHA512SUMS";
const DEFAULT_VARIANT: &str = "genericcloud";

const MAJOR_TO_CODENAME: &[(&str, &str)] = &[
    ("10", "buster"),
    ("11", "bullseye"),
    ("12", "bookworm"),
    ("13", "trixie"),
];

fn build_dir_regex() -> &'static Regex {
    static DIR_RE: OnceLock<Regex> = OnceLock::new();
    DIR_RE.get_or_init(|| Regex::new(r#"href="(\d{8}-\d{4})/""#).expect("invalid Debian build dir regex"))
}

/// Debian cloud images: serials are the dated build directories of a
/// release (`YYYYMMDD-HHMM`), checksums come from `SHA512SUMS`.
#[derive(Debug, Clone)]
pub struct DebianStrategy {
    base_url: String,
    variant: String,
}

impl Default for DebianStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl DebianStrategy {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            variant: DEFAULT_VARIANT.to_string(),
        }
    }

    /// Image flavour, eg. `genericcloud` or `nocloud`.
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    fn release_listing_url(&self, release: &str) -> String {
        format!("{}/{release}/", self.base_url)
    }
}

/// Greatest dated build directory linked from a release listing. The
/// `YYYYMMDD-HHMM` format sorts chronologically.
pub fn latest_build_dir(listing: &str) -> Option<String> {
    build_dir_regex()
        .captures_iter(listing)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .max()
        .map(str::to_string)
}

#[async_trait]
impl DistroStrategy for DebianStrategy {
    fn name(&self) -> &str {
        "debian"
    }

    fn normalize_version(&self, version: &str) -> NormalizedVersion {
        if let Some((major, codename)) = MAJOR_TO_CODENAME.iter().find(|(_, c)| *c == version) {
            return NormalizedVersion {
                release: codename.to_string(),
                version: major.to_string(),
            };
        }
        // 12.5 -> 12
        let major = version.split('.').next().unwrap_or(version);
        match MAJOR_TO_CODENAME.iter().find(|(m, _)| *m == major) {
            Some((major, codename)) => NormalizedVersion {
                release: codename.to_string(),
                version: major.to_string(),
            },
            None => NormalizedVersion {
                release: version.to_string(),
                version: version.to_string(),
            },
        }
    }

    async fn latest_serial(&self, client: &Client, release: &str) -> Result<String, ProvisionError> {
        let url = self.release_listing_url(release);
        let listing = fetch_text(client, &url).await?;
        let serial = latest_build_dir(&listing)
            .ok_or_else(|| ProvisionError::not_found(format!("dated build for '{release}'"), &url))?;
        debug!(%release, %serial, "Found latest build directory");
        Ok(serial)
    }

    fn artifact_filename(&self, arch: &str, version: &str) -> String {
        format!("debian-{version}-{}-{}.qcow2", self.variant, normalize_arch(arch))
    }

    fn artifact_base_url(&self, release: &str, serial: &str) -> String {
        format!("{}/{release}/{serial}", self.base_url)
    }

    async fn checksum_for(&self, client: &Client, base_url: &str, filename: &str) -> Result<Checksum, ProvisionError> {
        let url = join_url(base_url, CHECKSUM_FILENAME);
        let body = fetch_text(client, &url).await?;
        parse_checksum_manifest(&body, filename)
            .map(|hash| Checksum::new(HashAlgorithm::Sha512, hash))
            .ok_or_else(|| ProvisionError::not_found(format!("SHA-512 checksum for {filename}"), &url))
    }

    fn known_versions(&self) -> Vec<String> {
        MAJOR_TO_CODENAME.iter().rev().map(|(m, _)| m.to_string()).collect()
    }
}
