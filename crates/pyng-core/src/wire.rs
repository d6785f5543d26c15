//! pyng wire format.
//!
//! Every unit on the wire is a 16-byte chunk carried as the payload pattern
//! of one ICMP echo request. A transfer is two sections, each bracketed by
//! marker chunks:
//!
//!   META_START, meta payload..., META_END, DATA_START, data payload..., DATA_END
//!
//! Markers and payload slices are right-padded with 0x00. Any trailing run of
//! null bytes in a chunk is treated as padding by the receiver.

use static_assertions::const_assert;

// ── Sizes ────────────────────────────────────────────────────────────────────

/// Size of every chunk on the wire.
pub const CHUNK_SIZE: usize = 16;

/// Padding byte for short chunks.
pub const NULL_BYTE: u8 = 0x00;

/// Length of the IPv4 header delivered by a raw ICMP socket (no options).
pub const IP_HEADER_LEN: usize = 20;

/// Offset of the chunk inside the ICMP message: 8 bytes of ICMP header,
/// then the 16-byte timestamp `ping` writes before its pattern.
pub const ICMP_DATA_OFFSET: usize = 24;

/// Bytes read per captured packet: IP header + ICMP header + 56 data bytes.
pub const PACKET_SIZE: usize = 84;

/// Size of the ICMP data region `ping` sends by default.
pub const ECHO_DATA_LEN: usize = PACKET_SIZE - IP_HEADER_LEN - ICMP_HEADER_LEN;

/// ICMP echo header length.
pub const ICMP_HEADER_LEN: usize = 8;

// ── Markers ──────────────────────────────────────────────────────────────────

pub const META_START: &[u8] = b"PYNGMETASTART";
pub const META_END: &[u8] = b"PYNGMETAEND";
pub const DATA_START: &[u8] = b"PYNGDATASTART";
pub const DATA_END: &[u8] = b"PYNGDATAEND";

// A marker must fit in one chunk with at least one byte of padding.
const_assert!(META_START.len() < CHUNK_SIZE);
const_assert!(META_END.len() < CHUNK_SIZE);
const_assert!(DATA_START.len() < CHUNK_SIZE);
const_assert!(DATA_END.len() < CHUNK_SIZE);
const_assert!(ICMP_DATA_OFFSET + CHUNK_SIZE <= PACKET_SIZE - IP_HEADER_LEN);

/// The four section markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    MetaStart,
    MetaEnd,
    DataStart,
    DataEnd,
}

impl Marker {
    pub const ALL: [Marker; 4] = [
        Marker::MetaStart,
        Marker::MetaEnd,
        Marker::DataStart,
        Marker::DataEnd,
    ];

    /// Marker bytes before padding.
    pub const fn bytes(self) -> &'static [u8] {
        match self {
            Marker::MetaStart => META_START,
            Marker::MetaEnd => META_END,
            Marker::DataStart => DATA_START,
            Marker::DataEnd => DATA_END,
        }
    }

    /// True if the marker appears anywhere inside `chunk`.
    pub fn found_in(self, chunk: &[u8]) -> bool {
        contains(chunk, self.bytes())
    }

    /// The marker whose bytes equal `chunk` once trailing padding is removed.
    pub fn from_trimmed(chunk: &[u8]) -> Option<Marker> {
        let trimmed = trim_padding(chunk);
        Self::ALL.into_iter().find(|m| m.bytes() == trimmed)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Strip the trailing run of null bytes.
pub fn trim_padding(chunk: &[u8]) -> &[u8] {
    let end = chunk
        .iter()
        .rposition(|&b| b != NULL_BYTE)
        .map_or(0, |i| i + 1);
    &chunk[..end]
}

/// Sub-sequence search. Chunks are at most 16 bytes, so a window scan is enough.
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Extract the chunk window from a raw IPv4 packet read off an ICMP socket.
///
/// Headers are stripped at fixed offsets. Packets shorter than the window
/// yield whatever bytes are present, possibly none.
pub fn payload_window(packet: &[u8]) -> &[u8] {
    let start = IP_HEADER_LEN + ICMP_DATA_OFFSET;
    match packet.get(start..) {
        Some(rest) => &rest[..rest.len().min(CHUNK_SIZE)],
        None => &[],
    }
}
