//! Chunked download of a selected source stream.
//!
//! The body is read sequentially by a dedicated task and handed to the
//! consumer as a finite sequence of byte blocks. Each read is bounded by a
//! timeout; a stalled or failing read ends the sequence early instead of
//! failing the acquisition.

use crate::error::{AudiubeError, Result};
use crate::source::SourceStream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Upper bound for receiving a single chunk.
pub const CHUNK_TIMEOUT: Duration = Duration::from_secs(10);

/// Chunks buffered between the download task and its consumer.
pub const CHUNK_CHANNEL_CAPACITY: usize = 32;

/// Finite, single-consumer sequence of downloaded byte blocks.
pub struct ChunkStream {
    rx: mpsc::Receiver<Bytes>,
}

impl ChunkStream {
    pub fn new(rx: mpsc::Receiver<Bytes>) -> Self {
        Self { rx }
    }

    /// Build an already-complete sequence from in-memory chunks.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        let chunks: Vec<Bytes> = chunks.into_iter().collect();
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            // Capacity covers every chunk.
            let _ = tx.try_send(chunk);
        }
        Self { rx }
    }

    /// Next block, or `None` once the producer has finished.
    pub async fn next_chunk(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

/// Fetches a source stream's bytes.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, stream: &SourceStream) -> Result<ChunkStream>;
}

/// Downloads progressive HTTP streams with reqwest.
pub struct HttpDownloader {
    client: reqwest::Client,
    chunk_timeout: Duration,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::with_timeout(CHUNK_TIMEOUT)
    }

    pub fn with_timeout(chunk_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(chunk_timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            chunk_timeout,
        }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    #[instrument(skip_all, fields(format = %stream.format, resolution = %stream.resolution))]
    async fn download(&self, stream: &SourceStream) -> Result<ChunkStream> {
        // The response head counts as the first chunk.
        let response = tokio::time::timeout(self.chunk_timeout, self.client.get(&stream.url).send())
            .await
            .map_err(|_| AudiubeError::ChunkTimeout(self.chunk_timeout))??;

        let status = response.status();
        if !status.is_success() {
            return Err(AudiubeError::Download(format!(
                "source responded with {}",
                status
            )));
        }

        info!(
            "Downloading source stream ({} bytes announced)",
            response
                .content_length()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );

        let body = futures::stream::unfold(response, |mut response| async move {
            match response.chunk().await {
                Ok(Some(chunk)) => Some((Ok(chunk), response)),
                Ok(None) => None,
                Err(e) => Some((Err(e), response)),
            }
        });

        Ok(spawn_chunk_worker(Box::pin(body), self.chunk_timeout))
    }
}

/// Drain `source` on a dedicated task, forwarding chunks in order.
///
/// The sequence ends when the source is exhausted, a read fails, a read takes
/// longer than `chunk_timeout`, or the consumer goes away.
pub fn spawn_chunk_worker<S, E>(mut source: S, chunk_timeout: Duration) -> ChunkStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + Unpin + 'static,
    E: Display + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut chunks = 0usize;
        let mut bytes = 0usize;

        loop {
            match tokio::time::timeout(chunk_timeout, source.next()).await {
                Ok(Some(Ok(chunk))) => {
                    chunks += 1;
                    bytes += chunk.len();
                    if tx.send(chunk).await.is_err() {
                        debug!("Chunk consumer dropped, stopping download");
                        break;
                    }
                }
                Ok(Some(Err(e))) => {
                    warn!("Chunk read failed, ending download early: {}", e);
                    break;
                }
                Ok(None) => {
                    debug!("Download complete");
                    break;
                }
                Err(_) => {
                    warn!(
                        "{}, ending download early",
                        AudiubeError::ChunkTimeout(chunk_timeout)
                    );
                    break;
                }
            }
        }

        info!("Downloaded {} bytes in {} chunks", bytes, chunks);
    });

    ChunkStream::new(rx)
}
