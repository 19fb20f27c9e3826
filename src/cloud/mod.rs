mod image;
mod name;

pub use image::{ArtifactDescriptor, Checksum, HashAlgorithm, join_url};
pub use name::{CacheEntryName, CacheNamePattern};
