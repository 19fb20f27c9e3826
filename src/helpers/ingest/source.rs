use async_trait::async_trait;
use futures::Stream;
use futures_util::StreamExt;
use std::io;

/// Readable side of an ingestion: yields byte chunks until `None`.
#[async_trait]
pub trait ByteSource: Send {
    async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Total length when the source knows it up front.
    fn len_hint(&self) -> Option<u64> {
        None
    }
}

#[async_trait]
impl ByteSource for reqwest::Response {
    async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        // chunk() avoids needing reqwest's stream feature
        self.chunk()
            .await
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .map_err(io::Error::other)
    }

    fn len_hint(&self) -> Option<u64> {
        self.content_length()
    }
}

/// Adapts any stream of byte chunks.
pub struct StreamSource<S> {
    inner: S,
}

impl<S> StreamSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S> ByteSource for StreamSource<S>
where
    S: Stream<Item = io::Result<Vec<u8>>> + Send + Unpin,
{
    async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        self.inner.next().await.transpose()
    }
}
