use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;
use tracing::debug;

use crate::cloud::{ArtifactDescriptor, Checksum, HashAlgorithm, join_url};
use crate::error::ProvisionError;
use crate::helpers::http::fetch_text;

pub const DEFAULT_LISTING_URL: &str = "http://ceph.com/cloudinit/";

fn href_regex() -> &'static Regex {
    static HREF_RE: OnceLock<Regex> = OnceLock::new();
    HREF_RE.get_or_init(|| Regex::new(r#"href="([^"]+\.img)""#).expect("invalid listing href regex"))
}

/// Fallback for distributions without a dedicated strategy: scrape a flat
/// directory listing of `<distro>-<version>-<serial>-cloudimg-<arch>.img`
/// files, each with a sibling `.sha512` file.
///
/// It is not a [`DistroStrategy`](crate::repositories::DistroStrategy): one
/// listing lookup keyed by the whole `(distro, version, arch)` tuple yields
/// filename and serial together, so there is no separate version,
/// release-index or filename step to plug into the trait.
#[derive(Debug, Clone)]
pub struct GenericStrategy {
    listing_url: String,
}

impl Default for GenericStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_LISTING_URL)
    }
}

/// An image file picked out of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingMatch {
    pub filename: String,
    pub serial: String,
}

/// `.img` hrefs in document order.
pub fn listing_entries(listing: &str) -> Vec<String> {
    href_regex()
        .captures_iter(listing)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().rsplit('/').next().unwrap_or(m.as_str()).to_string())
        .collect()
}

/// First entry in document order matching the tuple. This is not
/// necessarily the newest serial.
pub fn first_match(entries: &[String], distro: &str, version: &str, arch: &str) -> Option<ListingMatch> {
    let pattern = format!(
        r"^{}-{}-(\d+)-cloudimg-{}\.img$",
        regex::escape(distro),
        regex::escape(version),
        regex::escape(arch)
    );
    let re = Regex::new(&pattern).ok()?;
    entries.iter().find_map(|entry| {
        let caps = re.captures(entry)?;
        Some(ListingMatch {
            filename: entry.clone(),
            serial: caps.get(1)?.as_str().to_string(),
        })
    })
}

impl GenericStrategy {
    pub fn new(listing_url: impl Into<String>) -> Self {
        let mut listing_url = listing_url.into();
        if !listing_url.ends_with('/') {
            listing_url.push('/');
        }
        Self { listing_url }
    }

    pub fn listing_url(&self) -> &str {
        &self.listing_url
    }

    pub async fn resolve(
        &self,
        client: &Client,
        distro: &str,
        version: &str,
        arch: &str,
    ) -> Result<ArtifactDescriptor, ProvisionError> {
        let listing = fetch_text(client, &self.listing_url).await?;
        let entries = listing_entries(&listing);
        debug!(url = %self.listing_url, entries = entries.len(), "Scraped image listing");

        let found = first_match(&entries, distro, version, arch).ok_or_else(|| {
            ProvisionError::not_found(format!("image for {distro} {version} {arch}"), &self.listing_url)
        })?;

        let url = join_url(&self.listing_url, &found.filename);
        let checksum_url = format!("{url}.sha512");
        let checksum = fetch_text(client, &checksum_url).await?;
        let checksum = checksum.trim();
        if checksum.is_empty() {
            return Err(ProvisionError::not_found(
                format!("SHA-512 checksum for {}", found.filename),
                checksum_url,
            ));
        }

        Ok(ArtifactDescriptor::new(
            url,
            found.serial,
            Some(Checksum::new(HashAlgorithm::Sha512, checksum)),
        ))
    }
}
