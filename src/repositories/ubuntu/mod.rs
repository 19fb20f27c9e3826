use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::cloud::{Checksum, HashAlgorithm, join_url};
use crate::error::ProvisionError;
use crate::helpers::http::fetch_text;
use crate::repositories::strategy::{DistroStrategy, NormalizedVersion, normalize_arch, parse_checksum_manifest};

pub const DEFAULT_BASE_URL: &str = "https://cloud-images.ubuntu.com";
const RELEASE_INDEX_PATH: &str = "query/released.latest.txt";
const CHECKSUM_FILENAME: &str = "SHA256SUMS";

const VERSION_TO_RELEASE: &[(&str, &str)] = &[
    ("4.10", "warty"),
    ("5.04", "hoary"),
    ("5.10", "breezy"),
    ("6.06", "dapper"),
    ("6.10", "edgy"),
    ("7.04", "feisty"),
    ("7.10", "gutsy"),
    ("8.04", "hardy"),
    ("8.10", "intrepid"),
    ("9.04", "jaunty"),
    ("9.10", "karmic"),
    ("10.04", "lucid"),
    ("10.10", "maverick"),
    ("11.04", "natty"),
    ("11.10", "oneiric"),
    ("12.04", "precise"),
    ("12.10", "quantal"),
    ("13.04", "raring"),
    ("13.10", "saucy"),
    ("14.04", "trusty"),
    ("16.04", "xenial"),
    ("18.04", "bionic"),
    ("20.04", "focal"),
    ("22.04", "jammy"),
    ("24.04", "noble"),
];

/// Ubuntu cloud images: serials come from the `released.latest.txt` query
/// index, checksums from the per-build `SHA256SUMS`.
#[derive(Debug, Clone)]
pub struct UbuntuStrategy {
    base_url: String,
}

impl Default for UbuntuStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl UbuntuStrategy {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn release_index_url(&self) -> String {
        join_url(&self.base_url, RELEASE_INDEX_PATH)
    }
}

fn release_for_version(version: &str) -> Option<&'static str> {
    // 12.04.5 -> 12.04
    let mut parts = version.splitn(3, '.');
    let major = parts.next()?;
    let minor = parts.next()?;
    let key = format!("{major}.{minor}");
    VERSION_TO_RELEASE
        .iter()
        .find(|(v, _)| *v == key)
        .map(|(_, release)| *release)
}

fn version_for_release(release: &str) -> Option<&'static str> {
    VERSION_TO_RELEASE
        .iter()
        .find(|(_, r)| *r == release)
        .map(|(version, _)| *version)
}

/// Greatest serial among `release`/`server`/`release` rows of the
/// tab-delimited index.
pub fn parse_release_index(body: &str, release: &str) -> Option<String> {
    body.lines()
        .filter_map(|line| {
            let mut fields = line.split('\t').map(str::trim);
            let row_release = fields.next()?;
            let flavour = fields.next()?;
            let stability = fields.next()?;
            let serial = fields.next()?;
            (row_release == release && flavour == "server" && stability == "release" && !serial.is_empty())
                .then_some(serial)
        })
        .max()
        .map(str::to_string)
}

#[async_trait]
impl DistroStrategy for UbuntuStrategy {
    fn name(&self) -> &str {
        "ubuntu"
    }

    fn normalize_version(&self, version: &str) -> NormalizedVersion {
        if let Some(number) = version_for_release(version) {
            return NormalizedVersion {
                release: version.to_string(),
                version: number.to_string(),
            };
        }
        let release = release_for_version(version).unwrap_or(version);
        NormalizedVersion {
            release: release.to_string(),
            version: version.to_string(),
        }
    }

    async fn latest_serial(&self, client: &Client, release: &str) -> Result<String, ProvisionError> {
        let url = self.release_index_url();
        let body = fetch_text(client, &url).await?;
        let serial = parse_release_index(&body, release)
            .ok_or_else(|| ProvisionError::not_found(format!("released server serial for '{release}'"), &url))?;
        debug!(%release, %serial, "Found latest serial");
        Ok(serial)
    }

    fn artifact_filename(&self, arch: &str, version: &str) -> String {
        format!("ubuntu-{version}-server-cloudimg-{}-disk1.img", normalize_arch(arch))
    }

    fn artifact_base_url(&self, release: &str, serial: &str) -> String {
        format!("{}/releases/{release}/release-{serial}", self.base_url)
    }

    async fn checksum_for(&self, client: &Client, base_url: &str, filename: &str) -> Result<Checksum, ProvisionError> {
        let url = join_url(base_url, CHECKSUM_FILENAME);
        let body = fetch_text(client, &url).await?;
        parse_checksum_manifest(&body, filename)
            .map(|hash| Checksum::new(HashAlgorithm::Sha256, hash))
            .ok_or_else(|| ProvisionError::not_found(format!("SHA-256 checksum for {filename}"), &url))
    }

    fn known_versions(&self) -> Vec<String> {
        VERSION_TO_RELEASE.iter().rev().map(|(v, _)| v.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_version_maps_to_codename() {
        let s = UbuntuStrategy::default();
        assert_eq!(
            s.normalize_version("12.04"),
            NormalizedVersion {
                release: "precise".into(),
                version: "12.04".into()
            }
        );
        assert_eq!(s.normalize_version("12.04.5").release, "precise");
    }

    #[test]
    fn codename_maps_back_to_number() {
        let s = UbuntuStrategy::default();
        let n = s.normalize_version("precise");
        assert_eq!(n.release, "precise");
        assert_eq!(n.version, "12.04");
    }

    #[test]
    fn unknown_version_passes_through() {
        let s = UbuntuStrategy::default();
        let n = s.normalize_version("99.04");
        assert_eq!(n.release, "99.04");
        assert_eq!(n.version, "99.04");
        assert_eq!(s.normalize_version("devel").release, "devel");
    }

    #[test]
    fn filename_normalizes_arch() {
        let s = UbuntuStrategy::default();
        assert_eq!(
            s.artifact_filename("x86_64", "12.04"),
            "ubuntu-12.04-server-cloudimg-amd64-disk1.img"
        );
    }

    #[test]
    fn release_index_filters_flavour_and_stability() {
        let body = "\
precise\tserver\tbeta\t20190101
precise\tdesktop\trelease\t20190102
precise\tserver\trelease\t20180308\trelease\t/releases/precise/release-20180308
trusty\tserver\trelease\t20191107
";
        assert_eq!(parse_release_index(body, "precise").as_deref(), Some("20180308"));
        assert_eq!(parse_release_index(body, "trusty").as_deref(), Some("20191107"));
        assert_eq!(parse_release_index(body, "xenial"), None);
    }

    #[test]
    fn base_url_layout() {
        let s = UbuntuStrategy::new("http://mirror.local/");
        assert_eq!(
            s.artifact_base_url("precise", "20180308"),
            "http://mirror.local/releases/precise/release-20180308"
        );
        assert_eq!(s.release_index_url(), "http://mirror.local/query/released.latest.txt");
    }
}
