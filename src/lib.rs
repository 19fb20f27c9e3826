//! Provision verified cloud base images into a storage pool.
//!
//! Given `(distro, version, arch)`, [`Provisioner::ensure`] returns the newest
//! matching entry already in the pool, or resolves the artifact upstream and
//! streams it into a new entry while checking its digest.
//!
//! ```rust,no_run
//! use cloud_image_pool::{DirPool, Provisioner, ResolverRegistry};
//! use cloud_image_pool::helpers::http::ClientSettings;
//! use cloud_image_pool::pool::PoolEntry;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DirPool::open("/var/lib/images").await?;
//! let provisioner = Provisioner::from_settings(&ClientSettings::default(), ResolverRegistry::default())?;
//! let entry = provisioner.ensure(&pool, "ubuntu", "12.04", "amd64").await?;
//! println!("{}", entry.name());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cloud;
pub mod error;
pub mod helpers;
pub mod pool;
pub mod provision;
pub mod repositories;

pub use cloud::{ArtifactDescriptor, CacheEntryName, Checksum, HashAlgorithm};
pub use error::{ErrorKind, ProvisionError};
pub use pool::{DirPool, Pool, PoolError};
pub use provision::Provisioner;
pub use repositories::{Repositories, ResolverRegistry};
