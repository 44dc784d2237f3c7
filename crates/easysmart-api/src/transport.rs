// UDP broadcast transport.
//
// The switch never answers unicast: requests are broadcast to one port and
// replies are broadcast back to another. Which host interface the request
// leaves from is selected by an `Egress` strategy.

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::Error;

/// Every request is broadcast.
pub const BROADCAST_ADDR: Ipv4Addr = Ipv4Addr::BROADCAST;

/// Port the switch listens on.
pub const SEND_PORT: u16 = 29808;

/// Port the switch answers on.
pub const RECEIVE_PORT: u16 = 29809;

/// How long to wait for a matching reply.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest datagram the switch sends.
pub const MAX_FRAME_LEN: usize = 1500;

/// How outgoing broadcasts pick a host network path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Egress {
    /// Bind the socket to a named interface (`SO_BINDTODEVICE`).
    Interface(String),
    /// Send from a specific local IPv4 address; replies are still
    /// received on the wildcard address.
    SourceAddress(Ipv4Addr),
}

impl std::fmt::Display for Egress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interface(name) => write!(f, "interface {name}"),
            Self::SourceAddress(ip) => write!(f, "source address {ip}"),
        }
    }
}

/// A datagram pipe to the switch.
///
/// `Session` holds its transport exclusively and drives it one exchange at
/// a time, so implementations need no internal synchronisation.
pub trait Transport: Send {
    /// Broadcast one obfuscated frame.
    fn send(&mut self, frame: &[u8]) -> impl Future<Output = Result<(), Error>> + Send;

    /// Wait for the next datagram. Never times out on its own; the caller
    /// bounds the wait.
    fn recv(&mut self) -> impl Future<Output = Result<Vec<u8>, Error>> + Send;
}

/// Real UDP transport.
#[derive(Debug)]
pub struct UdpTransport {
    send: UdpSocket,
    /// `None` when the send socket also receives.
    recv: Option<UdpSocket>,
    target: SocketAddr,
}

impl UdpTransport {
    /// Bind the sockets for `egress`. Must be called inside a tokio runtime.
    pub fn bind(egress: &Egress) -> Result<Self, Error> {
        let target = SocketAddr::V4(SocketAddrV4::new(BROADCAST_ADDR, SEND_PORT));
        let wildcard = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, RECEIVE_PORT);

        let transport = match egress {
            Egress::Interface(name) => {
                let socket = broadcast_socket()?;
                bind_to_device(&socket, name)?;
                socket.bind(&wildcard.into())?;
                Self {
                    send: into_tokio(socket)?,
                    recv: None,
                    target,
                }
            }
            Egress::SourceAddress(ip) => {
                let send = broadcast_socket()?;
                send.bind(&SocketAddrV4::new(*ip, RECEIVE_PORT).into())?;
                let recv = broadcast_socket()?;
                recv.bind(&wildcard.into())?;
                Self {
                    send: into_tokio(send)?,
                    recv: Some(into_tokio(recv)?),
                    target,
                }
            }
        };
        debug!(%egress, "udp transport bound");
        Ok(transport)
    }
}

impl Transport for UdpTransport {
    async fn send(&mut self, frame: &[u8]) -> Result<(), Error> {
        self.send.send_to(frame, self.target).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>, Error> {
        let socket = self.recv.as_ref().unwrap_or(&self.send);
        let mut buf = vec![0u8; MAX_FRAME_LEN];
        let (len, from) = socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        debug!(%from, len, "datagram received");
        Ok(buf)
    }
}

fn broadcast_socket() -> Result<Socket, Error> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "fuchsia"))]
fn bind_to_device(socket: &Socket, name: &str) -> Result<(), Error> {
    socket.bind_device(Some(name.as_bytes()))?;
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "fuchsia")))]
fn bind_to_device(_socket: &Socket, name: &str) -> Result<(), Error> {
    Err(Error::Io(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("binding to interface {name} is not supported here; use a source address"),
    )))
}

fn into_tokio(socket: Socket) -> Result<UdpSocket, Error> {
    Ok(UdpSocket::from_std(socket.into())?)
}
