//! Receiver state machine. Picks transfers out of an ICMP payload stream.
//!
//! One transfer is tracked at a time, whatever the number of sources. Every
//! observed payload goes through [`ReceiverStateMachine::observe`]:
//!
//!   1. META_START anywhere in the chunk opens a new buffer. An open buffer
//!      is dropped and replaced.
//!   2. While a buffer is open the chunk is appended, trailing nulls removed.
//!   3. DATA_END anywhere in the chunk closes the buffer and hands it out as
//!      a [`CompletedTransfer`]. The transfer number then advances.
//!
//! Anything seen with no buffer open is ordinary ICMP traffic and ignored.
//! There is no ordering or loss detection; a lost DATA_END leaves the machine
//! active until the next META_START.

use std::net::Ipv4Addr;

use pyng_core::wire::{trim_padding, Marker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Idle,
    Active,
}

/// Chunks accumulated since the last META_START, padding already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferBuffer {
    origin: Ipv4Addr,
    chunks: Vec<Vec<u8>>,
}

impl TransferBuffer {
    pub fn new(origin: Ipv4Addr) -> Self {
        Self {
            origin,
            chunks: Vec::new(),
        }
    }

    /// Source whose META_START opened this buffer.
    pub fn origin(&self) -> Ipv4Addr {
        self.origin
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.chunks.push(chunk.to_vec());
    }

    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// A closed buffer, ready for the finalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTransfer {
    pub number: u64,
    /// Source of the DATA_END chunk.
    pub source: Ipv4Addr,
    pub buffer: TransferBuffer,
}

/// What a single observation did to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Not part of a transfer.
    Ignored,
    /// META_START seen. `restarted` is true when an open buffer was dropped.
    Started { transfer: u64, restarted: bool },
    /// Appended to the open buffer.
    Appended,
    /// DATA_END seen; the buffer is handed out.
    Completed(CompletedTransfer),
}

#[derive(Debug)]
pub struct ReceiverStateMachine {
    active: Option<TransferBuffer>,
    next_transfer: u64,
}

impl Default for ReceiverStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiverStateMachine {
    pub fn new() -> Self {
        Self {
            active: None,
            next_transfer: 1,
        }
    }

    pub fn state(&self) -> ReceiverState {
        if self.active.is_some() {
            ReceiverState::Active
        } else {
            ReceiverState::Idle
        }
    }

    /// Number the next (or currently open) transfer will carry.
    pub fn transfer_number(&self) -> u64 {
        self.next_transfer
    }

    /// The open buffer, if any.
    pub fn buffer(&self) -> Option<&TransferBuffer> {
        self.active.as_ref()
    }

    pub fn observe(&mut self, source: Ipv4Addr, raw: &[u8]) -> Observation {
        let mut started = None;

        if Marker::MetaStart.found_in(raw) {
            let dropped = self.active.replace(TransferBuffer::new(source));
            if let Some(old) = &dropped {
                tracing::warn!(
                    transfer = self.next_transfer,
                    origin = %old.origin(),
                    chunks = old.len(),
                    "discarding incomplete transfer"
                );
            }
            tracing::info!(transfer = self.next_transfer, %source, "transfer start");
            started = Some(dropped.is_some());
        }

        match self.active.as_mut() {
            Some(buffer) => buffer.push(trim_padding(raw)),
            None => {
                tracing::trace!(%source, len = raw.len(), "ignoring non-transfer payload");
                return Observation::Ignored;
            }
        }

        if Marker::DataEnd.found_in(raw) {
            if let Some(buffer) = self.active.take() {
                let number = self.next_transfer;
                self.next_transfer += 1;
                if buffer.origin() != source {
                    tracing::warn!(
                        transfer = number,
                        origin = %buffer.origin(),
                        %source,
                        "transfer ended from a different source"
                    );
                }
                tracing::debug!(transfer = number, chunks = buffer.len(), "transfer closed");
                return Observation::Completed(CompletedTransfer {
                    number,
                    source,
                    buffer,
                });
            }
        }

        match started {
            Some(restarted) => Observation::Started {
                transfer: self.next_transfer,
                restarted,
            },
            None => Observation::Appended,
        }
    }
}
