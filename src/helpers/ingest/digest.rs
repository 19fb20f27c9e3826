use sha2::{Digest, Sha256, Sha512};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::cloud::HashAlgorithm;

/// Running digest fed one chunk at a time.
#[derive(Debug, Clone)]
pub enum RunningDigest {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl RunningDigest {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => RunningDigest::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => RunningDigest::Sha512(Sha512::new()),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            RunningDigest::Sha256(h) => h.update(bytes),
            RunningDigest::Sha512(h) => h.update(bytes),
        }
    }

    /// Lower-case hex of the final digest.
    pub fn finish(self) -> String {
        match self {
            RunningDigest::Sha256(h) => hex::encode(h.finalize()),
            RunningDigest::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

pub fn digest_hex(algorithm: HashAlgorithm, bytes: &[u8]) -> String {
    let mut digest = RunningDigest::new(algorithm);
    digest.update(bytes);
    digest.finish()
}

/// Hashes everything `reader` yields; used to re-check a committed entry.
pub async fn digest_reader<R>(algorithm: HashAlgorithm, mut reader: R) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut digest = RunningDigest::new(algorithm);
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        digest.update(&buf[..n]);
    }
    Ok(digest.finish())
}
