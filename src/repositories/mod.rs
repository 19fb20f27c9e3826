//! Per-distribution resolvers and the repository configuration that points
//! them at their upstreams.

pub mod debian;
pub mod generic;
mod models;
mod registry;
pub mod strategy;
pub mod ubuntu;

use std::{fs, path::Path};

pub use models::Repository; // Re-export the model type to callers.
pub use registry::ResolverRegistry;
pub use strategy::{DistroStrategy, NormalizedVersion};

/// Environment variable holding a repository JSON document.
pub const REPOS_ENV_VAR: &str = "CLOUD_IMAGE_POOL_REPOS";

/// The configured upstream list, loaded once at start-up and passed around
/// by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repositories {
    entries: Vec<Repository>,
}

impl Repositories {
    pub fn new(entries: Vec<Repository>) -> Self {
        Self { entries }
    }

    /// The upstreams used when nothing is configured.
    pub fn builtin() -> Self {
        Self::new(vec![
            Repository::new("ubuntu", ubuntu::DEFAULT_BASE_URL),
            Repository::new("debian", debian::DEFAULT_BASE_URL).with_parameter("variant", "genericcloud"),
            Repository::new("generic", generic::DEFAULT_LISTING_URL),
        ])
    }

    /// Initialize from a JSON file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReposError> {
        let data = fs::read_to_string(path).map_err(ReposError::Io)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ReposError> {
        let parsed: Vec<Repository> = serde_json::from_str(json).map_err(ReposError::Json)?;
        Ok(Self::new(parsed))
    }

    /// Initialize from an env var containing JSON.
    pub fn from_env(var: &str) -> Result<Self, ReposError> {
        let s = std::env::var(var).map_err(|_| ReposError::MissingEnv(var.to_string()))?;
        Self::from_json_str(&s)
    }

    pub fn all(&self) -> &[Repository] {
        &self.entries
    }

    /// Find by name without cloning.
    pub fn by_name(&self, name: &str) -> Option<&Repository> {
        self.entries.iter().find(|r| r.name() == name)
    }
}

/// ---- Errors ----
#[derive(thiserror::Error, Debug)]
pub enum ReposError {
    #[error("missing env var: {0}")]
    MissingEnv(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_index_matches_builtin() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("resources").join("indexes.json");
        let repos = Repositories::from_file(path).unwrap();
        assert_eq!(repos, Repositories::builtin());
    }

    #[test]
    fn parameters_are_optional() {
        let repos = Repositories::from_json_str(r#"[{"name": "ubuntu", "url": "http://m/"}]"#).unwrap();
        let ubuntu = repos.by_name("ubuntu").unwrap();
        assert_eq!(ubuntu.url(), "http://m/");
        assert!(ubuntu.other_parameters().is_none());
        assert!(repos.by_name("debian").is_none());
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(Repositories::from_json_str("{"), Err(ReposError::Json(_))));
    }

    #[test]
    fn missing_env_is_reported() {
        let err = Repositories::from_env("CLOUD_IMAGE_POOL_TEST_UNSET_VAR").unwrap_err();
        assert!(matches!(err, ReposError::MissingEnv(_)));
    }
}
