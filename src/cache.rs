//! Cache index: picks the newest usable entry out of names the pool has
//! already enumerated. Pure; performs no I/O.

use tracing::debug;

use crate::cloud::{CacheEntryName, CacheNamePattern};

/// Every name in `pool_names` that is a valid cache entry for the tuple, in
/// the order the pool listed them.
pub fn list_cached<'a, I, S>(pool_names: I, distro: &str, version: &str, arch: &str) -> Vec<CacheEntryName>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    let pattern = CacheNamePattern::new(distro, version, arch);
    pool_names
        .into_iter()
        .filter_map(|name| {
            let name = name.as_ref();
            debug!(%name, "Considering image");
            let entry = CacheEntryName::parse(&pattern, name)?;
            debug!(%name, "Saw image");
            Some(entry)
        })
        .collect()
}

/// The lexicographically greatest valid entry. Serials are zero-padded, so
/// that is also the latest build.
pub fn find_existing<'a, I, S>(pool_names: I, distro: &str, version: &str, arch: &str) -> Option<CacheEntryName>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    let latest = list_cached(pool_names, distro, version, arch)
        .into_iter()
        .max_by(|a, b| a.as_str().cmp(b.as_str()));
    if latest.is_none() {
        debug!(distro, version, arch, "No cloud images found");
    }
    latest
}
