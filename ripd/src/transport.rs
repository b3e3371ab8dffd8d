use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use log::warn;

use rip::feedback::TransportError;
use rip::framework::{ProtocolParams, Transport};

/// Plain-UDP rendition of the transport contract: one socket bound on the
/// RIP port and joined to the all-RIP-routers group.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub fn open(params: &ProtocolParams) -> io::Result<Self> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, params.port))?;
        socket.join_multicast_v4(&params.multicast_group, &Ipv4Addr::UNSPECIFIED)?;
        // announcements must not leave the local segment, and we must not
        // hear our own
        socket.set_multicast_ttl_v4(1)?;
        socket.set_multicast_loop_v4(false)?;
        Ok(UdpTransport { socket })
    }
}

impl Transport for UdpTransport {
    fn send(
        &mut self,
        dst_addr: Ipv4Addr,
        dst_port: u16,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        self.socket
            .send_to(payload, SocketAddrV4::new(dst_addr, dst_port))?;
        Ok(())
    }

    fn recv(
        &mut self,
        timeout: Duration,
        buf: &mut [u8],
    ) -> Result<Option<(Ipv4Addr, u16, usize)>, TransportError> {
        // std rejects a zero read timeout; an already-elapsed window is an
        // immediate tick
        if timeout.is_zero() {
            return Ok(None);
        }
        self.socket.set_read_timeout(Some(timeout))?;
        match self.socket.recv_from(buf) {
            Ok((len, SocketAddr::V4(src))) => Ok(Some((*src.ip(), src.port(), len))),
            Ok((_, SocketAddr::V6(src))) => {
                warn!("ignoring datagram from non-IPv4 source {src}");
                Ok(None)
            }
            // Interrupted: a signal landed mid-receive; report an elapsed
            // window so the loop re-checks its shutdown flag
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}
