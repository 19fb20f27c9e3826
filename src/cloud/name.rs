use std::fmt;

/// The `<distro>-<version>-` / `-cloudimg-<arch>.img` frame shared by every
/// cache entry of one (distro, version, arch) tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNamePattern {
    prefix: String,
    suffix: String,
}

impl CacheNamePattern {
    pub fn new(distro: &str, version: &str, arch: &str) -> Self {
        Self {
            prefix: format!("{distro}-{version}-"),
            suffix: format!("-cloudimg-{arch}.img"),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Returns the serial embedded in `name`, or `None` when the frame does
    /// not match or nothing is left between prefix and suffix.
    pub fn serial_of<'a>(&self, name: &'a str) -> Option<&'a str> {
        // prefix and suffix may overlap on short names; the length check rules that out
        if name.len() <= self.prefix.len() + self.suffix.len() {
            return None;
        }
        name.strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())
    }

    pub fn matches(&self, name: &str) -> bool {
        self.serial_of(name).is_some()
    }

    pub fn with_serial(&self, serial: &str) -> CacheEntryName {
        CacheEntryName {
            full: format!("{}{serial}{}", self.prefix, self.suffix),
            serial_start: self.prefix.len(),
            serial_end: self.prefix.len() + serial.len(),
        }
    }
}

/// A validated cache entry name: `<distro>-<version>-<serial>-cloudimg-<arch>.img`
/// with a non-empty serial.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheEntryName {
    full: String,
    serial_start: usize,
    serial_end: usize,
}

impl CacheEntryName {
    /// Builds the name a newly ingested artifact gets. Returns `None` when
    /// the serial is empty.
    pub fn new(distro: &str, version: &str, serial: &str, arch: &str) -> Option<Self> {
        if serial.is_empty() {
            return None;
        }
        Some(CacheNamePattern::new(distro, version, arch).with_serial(serial))
    }

    /// Recognises `name` as an entry of `pattern`.
    pub fn parse(pattern: &CacheNamePattern, name: &str) -> Option<Self> {
        let serial = pattern.serial_of(name)?;
        let serial_start = pattern.prefix().len();
        Some(Self {
            full: name.to_string(),
            serial_start,
            serial_end: serial_start + serial.len(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }

    pub fn serial(&self) -> &str {
        &self.full[self.serial_start..self.serial_end]
    }
}

impl fmt::Display for CacheEntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl AsRef<str> for CacheEntryName {
    fn as_ref(&self) -> &str {
        &self.full
    }
}
