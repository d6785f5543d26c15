//! Echo senders: the `ping` program or a raw ICMP socket.
//!
//! `PingCommand` shells out to the system `ping` with the chunk as its fill
//! pattern. `RawEcho` writes the echo request itself on a raw ICMP socket,
//! laid out the way `ping` lays it out so the receiver's fixed offsets hold:
//!
//!   [ICMP header: 8][timestamp: 16][pattern repeated: 40]

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::process::Stdio;
use std::time::{SystemTime, UNIX_EPOCH};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::process::Command;

use pyng_core::codec::Chunk;
use pyng_core::wire::{ECHO_DATA_LEN, ICMP_DATA_OFFSET, ICMP_HEADER_LEN};
use pyng_services::EchoSender;

const ICMP_ECHO_REQUEST: u8 = 8;

// ── ping(8) ───────────────────────────────────────────────────────────────────

pub struct PingCommand {
    program: String,
}

impl PingCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, host: Ipv4Addr, chunk: &Chunk) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-c", "1"])
            .arg(host.to_string())
            .args(["-p", &chunk.to_hex()])
            .stdout(Stdio::null());
        cmd
    }
}

impl EchoSender for PingCommand {
    async fn send_echo(&mut self, host: Ipv4Addr, chunk: &Chunk) -> io::Result<()> {
        let status = self.command(host, chunk).status().await?;
        // An unanswered ping exits non-zero but the request still went out.
        if !status.success() {
            tracing::debug!(%host, %status, "ping exited unsuccessfully");
        }
        Ok(())
    }
}

// ── Raw socket ────────────────────────────────────────────────────────────────

pub struct RawEcho {
    socket: UdpSocket,
    ident: u16,
    seq: u16,
}

impl RawEcho {
    /// Open a raw ICMP socket. Needs CAP_NET_RAW or root.
    pub fn open() -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
        socket.set_nonblocking(true)?;
        let socket = UdpSocket::from_std(socket.into())?;
        Ok(Self {
            socket,
            ident: (std::process::id() & 0xFFFF) as u16,
            seq: 0,
        })
    }
}

impl EchoSender for RawEcho {
    async fn send_echo(&mut self, host: Ipv4Addr, chunk: &Chunk) -> io::Result<()> {
        self.seq = self.seq.wrapping_add(1);
        let packet = build_echo_request(self.ident, self.seq, chunk, SystemTime::now());
        let dest = SocketAddr::V4(SocketAddrV4::new(host, 0));
        self.socket.send_to(&packet, dest).await?;
        Ok(())
    }
}

/// Build an ICMP echo request carrying `chunk` where `ping -p` would put it.
pub fn build_echo_request(ident: u16, seq: u16, chunk: &Chunk, now: SystemTime) -> Vec<u8> {
    let mut pkt = Vec::with_capacity(ICMP_HEADER_LEN + ECHO_DATA_LEN);

    pkt.extend_from_slice(&[ICMP_ECHO_REQUEST, 0, 0, 0]);
    pkt.extend_from_slice(&ident.to_be_bytes());
    pkt.extend_from_slice(&seq.to_be_bytes());

    // struct timeval, as ping writes it.
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    pkt.extend_from_slice(&since_epoch.as_secs().to_ne_bytes());
    pkt.extend_from_slice(&u64::from(since_epoch.subsec_micros()).to_ne_bytes());
    debug_assert_eq!(pkt.len(), ICMP_DATA_OFFSET);

    let pattern = chunk.as_ref();
    while pkt.len() < ICMP_HEADER_LEN + ECHO_DATA_LEN {
        let room = ICMP_HEADER_LEN + ECHO_DATA_LEN - pkt.len();
        pkt.extend_from_slice(&pattern[..pattern.len().min(room)]);
    }

    let csum = checksum(&pkt);
    pkt[2..4].copy_from_slice(&csum.to_be_bytes());
    pkt
}

/// Internet checksum (RFC 1071).
fn checksum(mut data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    while data.len() >= 2 {
        sum = sum.wrapping_add(u16::from_be_bytes([data[0], data[1]]) as u32);
        data = &data[2..];
    }
    if let [last] = data {
        sum = sum.wrapping_add((*last as u32) << 8);
    }
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}
