use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::concepts::route::Route;
use crate::feedback::FormatError;
use crate::router::INFINITY;

/// Well-known RIP UDP port.
pub const RIP_PORT: u16 = 520;
pub const RIP_VERSION: u8 = 2;

pub const RIP_HEADER_SIZE: usize = 4;
pub const RIP_ENTRY_SIZE: usize = 20;
pub const RIP_MAX_ENTRIES: usize = 25;
pub const RIP_MAX_PACKET_SIZE: usize = RIP_HEADER_SIZE + RIP_MAX_ENTRIES * RIP_ENTRY_SIZE;

/// `address_family` value denoting an IPv4 entry.
pub const AF_IPV4: u16 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum RipCommand {
    Request = 1,
    Response = 2,
}

impl TryFrom<u8> for RipCommand {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RipCommand::Request),
            2 => Ok(RipCommand::Response),
            other => Err(FormatError::UnknownCommand(other)),
        }
    }
}

/// One fixed-size route entry of a RIP message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RipEntry {
    pub address_family: u16,
    /// unused by this implementation, carried verbatim
    pub route_tag: u16,
    pub ip_addr: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub next_hop: Ipv4Addr,
    pub metric: u32,
}

impl RipEntry {
    /// Entry advertising one of our own routes. The next hop is zeroed so
    /// receivers substitute our source address.
    pub fn advertising(route: &Route) -> Self {
        RipEntry {
            address_family: AF_IPV4,
            route_tag: 0,
            ip_addr: route.subnet_addr,
            subnet_mask: route.subnet_mask,
            next_hop: Ipv4Addr::UNSPECIFIED,
            metric: route.metric,
        }
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.address_family.to_be_bytes());
        buf.extend_from_slice(&self.route_tag.to_be_bytes());
        buf.extend_from_slice(&self.ip_addr.octets());
        buf.extend_from_slice(&self.subnet_mask.octets());
        buf.extend_from_slice(&self.next_hop.octets());
        buf.extend_from_slice(&self.metric.to_be_bytes());
    }

    /// `bytes` must hold exactly one entry; `decode` slices accordingly.
    fn read_from(bytes: &[u8]) -> Self {
        RipEntry {
            address_family: u16::from_be_bytes([bytes[0], bytes[1]]),
            route_tag: u16::from_be_bytes([bytes[2], bytes[3]]),
            ip_addr: Ipv4Addr::new(bytes[4], bytes[5], bytes[6], bytes[7]),
            subnet_mask: Ipv4Addr::new(bytes[8], bytes[9], bytes[10], bytes[11]),
            next_hop: Ipv4Addr::new(bytes[12], bytes[13], bytes[14], bytes[15]),
            metric: u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]),
        }
    }
}

/// A RIPv2 message: 4-byte header plus up to 25 entries.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RipMessage {
    pub command: RipCommand,
    pub version: u8,
    pub entries: Vec<RipEntry>,
}

impl RipMessage {
    pub fn response(entries: Vec<RipEntry>) -> Self {
        RipMessage {
            command: RipCommand::Response,
            version: RIP_VERSION,
            entries,
        }
    }

    /// The conventional "send me your whole table" REQUEST: a single
    /// otherwise-empty entry with an infinite metric.
    pub fn request_full_table() -> Self {
        RipMessage {
            command: RipCommand::Request,
            version: RIP_VERSION,
            entries: vec![RipEntry {
                address_family: 0,
                route_tag: 0,
                ip_addr: Ipv4Addr::UNSPECIFIED,
                subnet_mask: Ipv4Addr::UNSPECIFIED,
                next_hop: Ipv4Addr::UNSPECIFIED,
                metric: INFINITY,
            }],
        }
    }

    pub fn is_full_table_request(&self) -> bool {
        self.command == RipCommand::Request
            && self.entries.len() == 1
            && self.entries[0].metric == INFINITY
    }

    pub fn wire_len(&self) -> usize {
        RIP_HEADER_SIZE + self.entries.len() * RIP_ENTRY_SIZE
    }

    /// Serializes to the big-endian wire format.
    pub fn encode(&self) -> Result<Vec<u8>, FormatError> {
        if self.entries.len() > RIP_MAX_ENTRIES {
            return Err(FormatError::TooManyEntries(self.entries.len()));
        }
        let mut buf = Vec::with_capacity(self.wire_len());
        buf.push(self.command as u8);
        buf.push(self.version);
        buf.extend_from_slice(&[0u8; 2]);
        for entry in &self.entries {
            entry.write_to(&mut buf);
        }
        Ok(buf)
    }

    /// Parses a received datagram. Only structural faults are rejected
    /// here; the engine is responsible for the meaning of address family
    /// and metric values.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < RIP_HEADER_SIZE {
            return Err(FormatError::Truncated(bytes.len()));
        }
        let payload = &bytes[RIP_HEADER_SIZE..];
        if payload.len() % RIP_ENTRY_SIZE != 0 {
            return Err(FormatError::BadLength(bytes.len()));
        }
        let command = RipCommand::try_from(bytes[0])?;
        let entries = payload
            .chunks_exact(RIP_ENTRY_SIZE)
            .map(RipEntry::read_from)
            .collect();
        Ok(RipMessage {
            command,
            version: bytes[1],
            entries,
        })
    }
}

impl Display for RipMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let command = match self.command {
            RipCommand::Request => "REQUEST",
            RipCommand::Response => "RESPONSE",
        };
        write!(
            f,
            "{command} v{}, {} entries",
            self.version,
            self.entries.len()
        )?;
        for entry in &self.entries {
            write!(
                f,
                "\n  af {} tag {} {}/{} via {} metric {}",
                entry.address_family,
                entry.route_tag,
                entry.ip_addr,
                entry.subnet_mask,
                entry.next_hop,
                entry.metric
            )?;
        }
        Ok(())
    }
}

/// A send the engine asks the server loop to perform on its behalf.
#[derive(Clone, Debug)]
pub struct OutboundMessage {
    pub dst_addr: Ipv4Addr,
    pub dst_port: u16,
    pub message: RipMessage,
}
