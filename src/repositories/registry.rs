use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::Repositories;
use super::debian::DebianStrategy;
use super::generic::GenericStrategy;
use super::strategy::DistroStrategy;
use super::ubuntu::UbuntuStrategy;
use crate::cloud::ArtifactDescriptor;
use crate::error::ProvisionError;

/// Distro name -> strategy, with the listing scraper as fallback. Built once
/// and read-only afterwards.
#[derive(Clone)]
pub struct ResolverRegistry {
    strategies: BTreeMap<String, Arc<dyn DistroStrategy>>,
    generic: GenericStrategy,
}

impl ResolverRegistry {
    /// A registry with no specialised strategies.
    pub fn new(generic: GenericStrategy) -> Self {
        Self {
            strategies: BTreeMap::new(),
            generic,
        }
    }

    /// Registers `strategy` under its own name, replacing any previous one.
    pub fn with_strategy(mut self, strategy: impl DistroStrategy + 'static) -> Self {
        self.strategies
            .insert(strategy.name().to_string(), Arc::new(strategy));
        self
    }

    /// Ubuntu and Debian strategies plus the generic fallback, each pointed
    /// at the URL configured in `repos` or at its built-in default.
    pub fn from_repositories(repos: &Repositories) -> Self {
        let ubuntu = repos
            .by_name("ubuntu")
            .map(|r| UbuntuStrategy::new(r.url()))
            .unwrap_or_default();

        let debian = match repos.by_name("debian") {
            Some(r) => {
                let strategy = DebianStrategy::new(r.url());
                match r.parameter("variant") {
                    Some(variant) => strategy.with_variant(variant),
                    None => strategy,
                }
            }
            None => DebianStrategy::default(),
        };

        let generic = repos
            .by_name("generic")
            .map(|r| GenericStrategy::new(r.url()))
            .unwrap_or_default();

        Self::new(generic).with_strategy(ubuntu).with_strategy(debian)
    }

    pub fn get(&self, distro: &str) -> Option<&dyn DistroStrategy> {
        self.strategies.get(distro).map(|s| s.as_ref())
    }

    /// Names with a specialised strategy, sorted.
    pub fn distros(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    pub fn generic(&self) -> &GenericStrategy {
        &self.generic
    }

    pub async fn resolve(
        &self,
        client: &Client,
        distro: &str,
        version: &str,
        arch: &str,
    ) -> Result<ArtifactDescriptor, ProvisionError> {
        match self.get(distro) {
            Some(strategy) => strategy.resolve(client, version, arch).await,
            None => {
                debug!(%distro, "No dedicated strategy, scraping listing");
                self.generic.resolve(client, distro, version, arch).await
            }
        }
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::from_repositories(&Repositories::builtin())
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("strategies", &self.distros())
            .field("generic", &self.generic)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::Repository;

    #[test]
    fn default_registry_knows_ubuntu_and_debian() {
        let registry = ResolverRegistry::default();
        assert_eq!(registry.distros(), vec!["debian", "ubuntu"]);
        assert!(registry.get("fedora").is_none());
    }

    #[test]
    fn configured_generic_url_is_used() {
        let repos = Repositories::new(vec![Repository::new("generic", "http://mirror.local/imgs")]);
        let registry = ResolverRegistry::from_repositories(&repos);
        assert_eq!(registry.generic().listing_url(), "http://mirror.local/imgs/");
    }

    #[test]
    fn empty_registry_has_no_strategies() {
        let registry = ResolverRegistry::new(GenericStrategy::default());
        assert!(registry.distros().is_empty());
    }
}
