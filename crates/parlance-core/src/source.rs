//! Inbound chunk sources.
//!
//! A [`ChunkSource`] yields the raw bytes of one synthesis response as they
//! arrive, in arbitrary chunk sizes. [`stream_into`] pumps a source into a
//! running [`PlaybackService`](crate::service::PlaybackService).

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use crate::error::PlaybackError;
use crate::service::PlaybackHandle;

/// Default read size for [`ReaderSource`].
pub const DEFAULT_CHUNK_SIZE: usize = 4_096;

/// Anything that delivers a response body chunk by chunk.
#[async_trait]
pub trait ChunkSource: Send {
    /// Next chunk, or `None` at end of stream.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, PlaybackError>;
}

/// Reads chunks from any async reader (file, stdin, socket).
///
/// An optional pacing delay between reads emulates a slow network.
pub struct ReaderSource<R> {
    reader: R,
    chunk_size: usize,
    pacing: Option<Duration>,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            pacing: None,
        }
    }

    /// Sleep for `delay` after every read that returns data.
    #[must_use]
    pub const fn paced(mut self, delay: Duration) -> Self {
        self.pacing = Some(delay);
        self
    }
}

#[async_trait]
impl<R> ChunkSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, PlaybackError> {
        let mut buf = BytesMut::zeroed(self.chunk_size);
        let read = self.reader.read(&mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        buf.truncate(read);
        if let Some(delay) = self.pacing {
            tokio::time::sleep(delay).await;
        }
        Ok(Some(buf.freeze()))
    }
}

/// Chunks pushed by another task (e.g. an HTTP client body stream).
///
/// The stream ends when every sender is dropped; an `Err` item aborts it.
pub struct ChannelSource {
    rx: mpsc::Receiver<Result<Bytes, PlaybackError>>,
}

impl ChannelSource {
    /// Create a bounded source and the sender that feeds it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Result<Bytes, PlaybackError>>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl ChunkSource for ChannelSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, PlaybackError> {
        self.rx.recv().await.transpose()
    }
}

/// Open a stream on `handle` and feed it every chunk from `source`.
///
/// The stream is finished when the source is exhausted. A source error
/// also finishes the stream (what arrived stays playable) and is returned.
/// On return the service has applied every chunk and the finish, so its
/// published snapshot already reflects the stream.
/// Returns the number of bytes delivered.
pub async fn stream_into<C>(
    handle: &PlaybackHandle,
    source: &mut C,
    text_len: usize,
    speed: f64,
) -> Result<u64, PlaybackError>
where
    C: ChunkSource + ?Sized,
{
    handle.prepare_for_stream(text_len, speed)?;

    let mut delivered = 0u64;
    let outcome = loop {
        match source.next_chunk().await {
            Ok(Some(chunk)) => {
                delivered += chunk.len() as u64;
                handle.push_chunk(chunk)?;
            }
            Ok(None) => break Ok(delivered),
            Err(e) => {
                tracing::warn!(error = %e, delivered, "Chunk source failed, closing stream");
                break Err(e);
            }
        }
    };

    handle.finish_stream()?;
    handle.flush().await?;
    tracing::debug!(delivered, "Stream delivered");
    outcome
}
