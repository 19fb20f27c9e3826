use std::fmt;
use std::str::FromStr;
use url::Url;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(format!("unsupported hash algorithm '{other}'")),
        }
    }
}

/// Couples an expected hex digest with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    algorithm: HashAlgorithm,
    value: String,
}

impl Checksum {
    pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Self {
        Self {
            algorithm,
            value: value.into().trim().to_string(),
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Case-insensitive comparison against a computed hex digest.
    pub fn matches(&self, computed_hex: &str) -> bool {
        self.value.eq_ignore_ascii_case(computed_hex)
    }
}

/// A concrete downloadable artifact produced by a resolver. Built fresh on
/// every resolution and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    url: String,
    serial: String,
    checksum: Option<Checksum>,
}

impl ArtifactDescriptor {
    pub fn new(url: impl Into<String>, serial: impl Into<String>, checksum: Option<Checksum>) -> Self {
        Self {
            url: url.into(),
            serial: serial.into(),
            checksum,
        }
    }

    /// Absolute download URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build/revision token, eg. 20180308
    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn checksum(&self) -> Option<&Checksum> {
        self.checksum.as_ref()
    }

    pub fn checksum_value(&self) -> Option<&str> {
        self.checksum.as_ref().map(|c| c.value())
    }

    pub fn hash_algorithm(&self) -> Option<HashAlgorithm> {
        self.checksum.as_ref().map(|c| c.algorithm())
    }

    /// Last path segment of the URL.
    pub fn filename(&self) -> &str {
        self.url.rsplit('/').find(|s| !s.is_empty()).unwrap_or("download")
    }
}

/// Join `relative` onto `base`, falling back to string concatenation when
/// the base does not parse as a URL.
pub fn join_url(base: &str, relative: &str) -> String {
    let base_dir = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    };

    Url::parse(&base_dir)
        .and_then(|b| b.join(relative))
        .map(|u| u.into())
        .unwrap_or_else(|_| format!("{base_dir}{relative}"))
}
