//! Frames a file and emits one echo request per chunk.
//!
//! Sends are strictly serialized: each one is awaited before the next chunk
//! goes out. There is no acknowledgment and no retry. A failure part way
//! through leaves the already-sent chunks on the wire; the receiver discards
//! the incomplete buffer when the next transfer starts.

use std::future::Future;
use std::net::Ipv4Addr;
use std::time::Duration;

use pyng_core::codec::{frame_transfer, Chunk, CodecError};
use pyng_core::wire::CHUNK_SIZE;

/// Something that can put one chunk on the wire as an ICMP echo request.
pub trait EchoSender {
    fn send_echo(
        &mut self,
        host: Ipv4Addr,
        chunk: &Chunk,
    ) -> impl Future<Output = std::io::Result<()>>;
}

/// Reported after every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 1-based count of chunks sent so far.
    pub sent: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_done(&self) -> bool {
        self.sent == self.total
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitSummary {
    pub chunks: usize,
    pub bytes: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum TransmitError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("chunk {index} has {len} bytes, expected {}", CHUNK_SIZE)]
    ChunkSize { index: usize, len: usize },

    #[error("failed to send chunk {index}: {source}")]
    Send {
        index: usize,
        #[source]
        source: std::io::Error,
    },
}

pub struct Transmitter<S> {
    sender: S,
    interval: Duration,
}

impl<S: EchoSender> Transmitter<S> {
    pub fn new(sender: S) -> Self {
        Self {
            sender,
            interval: Duration::ZERO,
        }
    }

    /// Pause between consecutive chunks.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn into_sender(self) -> S {
        self.sender
    }

    /// Send `path` as the metadata section and `content` as the data section.
    pub async fn transmit_file(
        &mut self,
        host: Ipv4Addr,
        path: &str,
        content: &[u8],
        progress: impl FnMut(Progress),
    ) -> Result<TransmitSummary, TransmitError> {
        let chunks = frame_transfer(path, content)?;
        tracing::info!(
            %host,
            path,
            bytes = content.len(),
            chunks = chunks.len(),
            "transfer start"
        );
        let sent = self.send_sequence(host, &chunks, progress).await?;
        Ok(TransmitSummary {
            chunks: sent,
            bytes: content.len(),
        })
    }

    /// Send pre-built chunks in order. Each one is length-checked right
    /// before it goes out; the first bad one aborts the sequence.
    pub async fn send_sequence<B: AsRef<[u8]>>(
        &mut self,
        host: Ipv4Addr,
        chunks: &[B],
        mut progress: impl FnMut(Progress),
    ) -> Result<usize, TransmitError> {
        let total = chunks.len();

        for (index, raw) in chunks.iter().enumerate() {
            let raw = raw.as_ref();
            let chunk = Chunk::try_from(raw).map_err(|_| TransmitError::ChunkSize {
                index,
                len: raw.len(),
            })?;

            if index > 0 && !self.interval.is_zero() {
                tokio::time::sleep(self.interval).await;
            }

            self.sender
                .send_echo(host, &chunk)
                .await
                .map_err(|source| TransmitError::Send { index, source })?;

            tracing::trace!(index, pattern = %chunk.to_hex(), "chunk sent");
            progress(Progress {
                sent: index + 1,
                total,
            });
        }

        Ok(total)
    }
}
