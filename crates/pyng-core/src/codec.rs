//! Chunk framing.
//!
//! A section on the wire is `[pad(start)] + [pad(slice) for slice in
//! split(data)] + [pad(end)]`. The same primitive builds both the metadata
//! and the data section.

use crate::wire::{Marker, CHUNK_SIZE, NULL_BYTE};

/// One fixed-size unit on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk([u8; CHUNK_SIZE]);

impl Chunk {
    pub fn as_bytes(&self) -> &[u8; CHUNK_SIZE] {
        &self.0
    }

    /// Lower-case hex of the chunk, the form `ping -p` expects.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Chunk {
    type Error = CodecError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; CHUNK_SIZE] = bytes.try_into().map_err(|_| CodecError::BadLength {
            len: bytes.len(),
            expected: CHUNK_SIZE,
        })?;
        Ok(Chunk(arr))
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Chunk({})", self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("input of {len} bytes exceeds chunk capacity {capacity}")]
    OversizeInput { len: usize, capacity: usize },

    #[error("chunk has {len} bytes, expected {expected}")]
    BadLength { len: usize, expected: usize },
}

/// Right-pad `bytes` with `fill` to exactly `size` bytes.
///
/// Never truncates: oversized input is an error.
pub fn pad_with(bytes: &[u8], size: usize, fill: u8) -> Result<Vec<u8>, CodecError> {
    if bytes.len() > size {
        return Err(CodecError::OversizeInput {
            len: bytes.len(),
            capacity: size,
        });
    }
    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(bytes);
    out.resize(size, fill);
    Ok(out)
}

/// Pad to a wire chunk with null bytes.
pub fn pad(bytes: &[u8]) -> Result<Chunk, CodecError> {
    Chunk::try_from(pad_with(bytes, CHUNK_SIZE, NULL_BYTE)?.as_slice())
}

/// Consecutive slices of at most `chunk_size` bytes. Empty input gives none.
pub fn split_with(data: &[u8], chunk_size: usize) -> impl Iterator<Item = &[u8]> {
    data.chunks(chunk_size.max(1))
}

pub fn split(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    split_with(data, CHUNK_SIZE)
}

/// Build one section: start marker, padded payload slices, end marker.
pub fn frame(start: &[u8], end: &[u8], data: &[u8]) -> Result<Vec<Chunk>, CodecError> {
    let mut chunks = Vec::with_capacity(2 + data.len().div_ceil(CHUNK_SIZE));
    chunks.push(pad(start)?);
    for slice in split(data) {
        chunks.push(pad(slice)?);
    }
    chunks.push(pad(end)?);
    Ok(chunks)
}

/// Both sections of a transfer, metadata first.
pub fn frame_transfer(path: &str, content: &[u8]) -> Result<Vec<Chunk>, CodecError> {
    let mut chunks = frame(
        Marker::MetaStart.bytes(),
        Marker::MetaEnd.bytes(),
        path.as_bytes(),
    )?;
    chunks.extend(frame(
        Marker::DataStart.bytes(),
        Marker::DataEnd.bytes(),
        content,
    )?);
    Ok(chunks)
}
