//! Turns a completed transfer buffer into a file on disk.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use pyng_core::digest::{DigestAlgorithm, Fingerprint};
use pyng_core::wire::Marker;

use crate::receiver::CompletedTransfer;

/// Metadata and data bytes recovered from a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections {
    pub meta: Vec<u8>,
    pub data: Vec<u8>,
}

/// Split a buffer at the DATA_START chunk and drop every marker chunk.
///
/// A payload chunk whose trimmed bytes happen to equal a marker is dropped
/// as well; the framing carries no escape mechanism to tell them apart.
/// Returns `None` when no DATA_START chunk is present.
pub fn split_sections(chunks: &[Vec<u8>]) -> Option<Sections> {
    let data_start = chunks
        .iter()
        .position(|c| c.as_slice() == Marker::DataStart.bytes())?;

    let (meta, data) = chunks.split_at(data_start);
    Some(Sections {
        meta: strip_markers(meta),
        data: strip_markers(data),
    })
}

fn strip_markers(chunks: &[Vec<u8>]) -> Vec<u8> {
    chunks
        .iter()
        .filter(|c| Marker::from_trimmed(c).is_none())
        .flat_map(|c| c.iter().copied())
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("T{transfer}: no DATA_START marker in {chunks} buffered chunks")]
    MalformedBuffer { transfer: u64, chunks: usize },

    #[error("T{transfer}: failed to write {}: {source}", path.display())]
    Persist {
        transfer: u64,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A transfer written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassembledFile {
    pub transfer: u64,
    pub source: Ipv4Addr,
    /// Path on the sending host, lossily decoded for display.
    pub remote_path: String,
    pub data: Vec<u8>,
    pub local_path: PathBuf,
    pub fingerprint: Fingerprint,
}

/// Persists completed transfers into one output directory.
#[derive(Debug, Clone)]
pub struct TransferFinalizer {
    output_dir: PathBuf,
    digest: DigestAlgorithm,
}

impl TransferFinalizer {
    pub fn new(output_dir: impl Into<PathBuf>, digest: DigestAlgorithm) -> Self {
        Self {
            output_dir: output_dir.into(),
            digest,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where transfer `number` from `source` is written.
    pub fn destination(&self, source: Ipv4Addr, number: u64) -> PathBuf {
        self.output_dir.join(format!("pyng_{source}_{number}"))
    }

    /// Consume a completed transfer: split, persist, fingerprint, report.
    pub fn finalize(&self, completed: CompletedTransfer) -> Result<ReassembledFile, FinalizeError> {
        let CompletedTransfer {
            number,
            source,
            buffer,
        } = completed;

        let sections =
            split_sections(buffer.chunks()).ok_or(FinalizeError::MalformedBuffer {
                transfer: number,
                chunks: buffer.len(),
            })?;

        let remote_path = String::from_utf8_lossy(&sections.meta).into_owned();
        let local_path = self.destination(source, number);

        self.persist(number, &local_path, &sections.data)?;
        let fingerprint = self.digest.fingerprint(&sections.data);

        tracing::info!(
            transfer = number,
            %source,
            remote = %remote_path,
            local = %local_path.display(),
            size = sections.data.len(),
            digest = %fingerprint,
            "transfer complete"
        );

        Ok(ReassembledFile {
            transfer: number,
            source,
            remote_path,
            data: sections.data,
            local_path,
            fingerprint,
        })
    }

    fn persist(&self, transfer: u64, path: &Path, data: &[u8]) -> Result<(), FinalizeError> {
        let wrap = |source| FinalizeError::Persist {
            transfer,
            path: path.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(&self.output_dir).map_err(wrap)?;
        std::fs::write(path, data).map_err(wrap)
    }
}
