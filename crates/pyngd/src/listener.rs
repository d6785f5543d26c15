//! Receive loop: each captured packet goes through the state machine, then the finalizer.
//!
//! Everything runs inline on the one task: a transfer is written and hashed
//! before the next packet is read.

use std::future::Future;
use std::io;
use std::net::Ipv4Addr;

use anyhow::{Context, Result};
use pyng_core::wire::{payload_window, PACKET_SIZE};
use pyng_services::{Observation, ReassembledFile, ReceiverStateMachine, TransferFinalizer};

use crate::capture::IcmpCapture;

/// Where captured IPv4 packets come from.
pub trait PacketSource {
    fn next_packet(
        &mut self,
        buf: &mut [u8; PACKET_SIZE],
    ) -> impl Future<Output = io::Result<(usize, Ipv4Addr)>>;
}

impl PacketSource for IcmpCapture {
    async fn next_packet(&mut self, buf: &mut [u8; PACKET_SIZE]) -> io::Result<(usize, Ipv4Addr)> {
        self.recv_packet(buf).await
    }
}

/// Run one captured packet through the pipeline.
///
/// A failed finalization is logged and swallowed; the machine is already
/// back to idle and the next transfer can start.
pub fn handle_packet(
    machine: &mut ReceiverStateMachine,
    finalizer: &TransferFinalizer,
    source: Ipv4Addr,
    packet: &[u8],
) -> Option<ReassembledFile> {
    let chunk = payload_window(packet);
    match machine.observe(source, chunk) {
        Observation::Completed(completed) => match finalizer.finalize(completed) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(error = %e, "transfer discarded");
                None
            }
        },
        _ => None,
    }
}

/// Receive until the socket fails. Cancel by dropping the future.
///
/// Only transfer-level failures are absorbed; a receive error ends the loop.
pub async fn run(
    source: &mut impl PacketSource,
    machine: &mut ReceiverStateMachine,
    finalizer: &TransferFinalizer,
) -> Result<()> {
    let mut buf = [0u8; PACKET_SIZE];

    loop {
        let (len, from) = source
            .next_packet(&mut buf)
            .await
            .context("recv_from failed")?;
        handle_packet(machine, finalizer, from, &buf[..len]);
    }
}
