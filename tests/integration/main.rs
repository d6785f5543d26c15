//! pyng end-to-end tests.
//!
//! The sender's transmitter is wired straight into the receiver's state
//! machine through an in-process `EchoSender`, so whole transfers run
//! without raw sockets or root. Each test writes into its own temp directory.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use pyng_core::codec::Chunk;
use pyng_core::digest::DigestAlgorithm;
use pyng_services::{
    EchoSender, Observation, ReassembledFile, ReceiverStateMachine, TransferFinalizer,
};

mod round_trip;
mod stream;

// ── Harness ───────────────────────────────────────────────────────────────────

pub const SENDER: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 10);
pub const RECEIVER: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 20);

/// Sender and receiver joined by a perfect link.
pub struct Loopback {
    pub source: Ipv4Addr,
    pub machine: ReceiverStateMachine,
    pub finalizer: TransferFinalizer,
    pub received: Vec<ReassembledFile>,
    pub failures: usize,
    /// Every chunk that crossed the link.
    pub wire: Vec<Chunk>,
}

impl Loopback {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            source: SENDER,
            machine: ReceiverStateMachine::new(),
            finalizer: TransferFinalizer::new(output_dir, DigestAlgorithm::Md5),
            received: Vec::new(),
            failures: 0,
            wire: Vec::new(),
        }
    }

    /// Feed a payload the way the capture loop would.
    pub fn deliver(&mut self, source: Ipv4Addr, payload: &[u8]) {
        if let Observation::Completed(done) = self.machine.observe(source, payload) {
            match self.finalizer.finalize(done) {
                Ok(file) => self.received.push(file),
                Err(_) => self.failures += 1,
            }
        }
    }
}

impl EchoSender for Loopback {
    async fn send_echo(&mut self, host: Ipv4Addr, chunk: &Chunk) -> std::io::Result<()> {
        assert_eq!(host, RECEIVER);
        self.wire.push(*chunk);
        let source = self.source;
        self.deliver(source, chunk.as_ref());
        Ok(())
    }
}

/// Fresh per-test output directory.
pub fn output_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pyng-it-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
