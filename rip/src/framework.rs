use std::net::Ipv4Addr;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use serde_with::{serde_as, DurationMilliSeconds};

use crate::concepts::packet::RIP_PORT;
use crate::feedback::TransportError;

/// "All RIP routers" multicast group.
pub const RIP_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 9);

/// Datagram transport the engine runs over. Implementations deliver one
/// datagram per `recv` call and are free to drop, reorder or duplicate —
/// the protocol tolerates all three.
pub trait Transport {
    fn send(&mut self, dst_addr: Ipv4Addr, dst_port: u16, payload: &[u8])
        -> Result<(), TransportError>;

    /// Blocks until a datagram arrives or the window elapses. `Ok(None)`
    /// reports an elapsed window; a zero window must return immediately.
    fn recv(
        &mut self,
        timeout: Duration,
        buf: &mut [u8],
    ) -> Result<Option<(Ipv4Addr, u16, usize)>, TransportError>;
}

/// Protocol timing and addressing parameters. The defaults are the RFC 2453
/// values; tests and deployments shrink them as needed. Durations serialize
/// as integer milliseconds.
#[cfg_attr(
    feature = "serde",
    serde_as,
    derive(Serialize, Deserialize),
    serde(default)
)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolParams {
    /// nominal period between full-table announcements
    #[cfg_attr(feature = "serde", serde_as(as = "DurationMilliSeconds<u64>"))]
    pub update_interval: Duration,
    /// upper bound of the random extra delay added to each period
    #[cfg_attr(feature = "serde", serde_as(as = "DurationMilliSeconds<u64>"))]
    pub update_jitter: Duration,
    /// how long a route may go unconfirmed before it is poisoned
    #[cfg_attr(feature = "serde", serde_as(as = "DurationMilliSeconds<u64>"))]
    pub route_timeout: Duration,
    /// how long a poisoned route lingers before deletion
    #[cfg_attr(feature = "serde", serde_as(as = "DurationMilliSeconds<u64>"))]
    pub garbage_timeout: Duration,
    pub port: u16,
    pub multicast_group: Ipv4Addr,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_millis(30_000),
            update_jitter: Duration::from_millis(15_000),
            route_timeout: Duration::from_millis(180_000),
            garbage_timeout: Duration::from_millis(120_000),
            port: RIP_PORT,
            multicast_group: RIP_MULTICAST_GROUP,
        }
    }
}
