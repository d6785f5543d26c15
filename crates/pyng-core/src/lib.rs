//! pyng-core: wire constants, chunk framing, digests and configuration.
//! The other pyng crates depend on this one.

pub mod codec;
pub mod config;
pub mod digest;
pub mod wire;

pub use codec::{frame, pad, split, Chunk, CodecError};
pub use digest::{DigestAlgorithm, Fingerprint};
pub use wire::Marker;
