//! Raw ICMP capture.
//!
//! A raw IPv4/ICMP socket delivers every inbound ICMP message with its IP
//! header attached. The socket is built with socket2, switched to
//! non-blocking and driven through tokio's UdpSocket, which only needs a
//! datagram-shaped fd for `recv_from`.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use pyng_core::wire::PACKET_SIZE;

pub struct IcmpCapture {
    socket: UdpSocket,
    bound: Ipv4Addr,
}

impl IcmpCapture {
    /// Open and bind the raw socket. Needs CAP_NET_RAW or root.
    pub fn bind(addr: Ipv4Addr) -> io::Result<Self> {
        let socket = make_raw_socket(addr)?;
        let socket = UdpSocket::from_std(socket)?;
        Ok(Self {
            socket,
            bound: addr,
        })
    }

    pub fn bound_addr(&self) -> Ipv4Addr {
        self.bound
    }

    /// Wait for the next ICMP packet. At most `PACKET_SIZE` bytes are kept;
    /// the rest of a larger packet is discarded by the kernel.
    pub async fn recv_packet(&self, buf: &mut [u8; PACKET_SIZE]) -> io::Result<(usize, Ipv4Addr)> {
        loop {
            let (len, from) = self.socket.recv_from(buf).await?;
            match from {
                SocketAddr::V4(v4) => return Ok((len, *v4.ip())),
                SocketAddr::V6(_) => {
                    tracing::trace!("ignoring IPv6 source on IPv4 raw socket");
                    continue;
                }
            }
        }
    }
}

fn make_raw_socket(addr: Ipv4Addr) -> io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
    socket.set_nonblocking(true)?;
    socket.bind(&SocketAddrV4::new(addr, 0).into())?;
    Ok(socket.into())
}
