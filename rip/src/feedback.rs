use std::io;

use thiserror::Error;

/// A datagram that does not parse as a RIP message. Reported per datagram;
/// the offending datagram is dropped and the engine keeps running.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("{0}-byte datagram is shorter than the 4-byte RIP header")]
    Truncated(usize),
    #[error("{0}-byte datagram does not hold a whole number of 20-byte entries")]
    BadLength(usize),
    #[error("unknown RIP command {0}")]
    UnknownCommand(u8),
    #[error("a RIP message holds at most 25 entries, tried to encode {0}")]
    TooManyEntries(usize),
}

/// Insert into a route table with no free slot left.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("route table full, all {0} slots occupied")]
pub struct CapacityExceeded(pub usize);

/// A static route file that cannot be loaded. Any bad line aborts the whole
/// load.
#[derive(Error, Debug)]
pub enum RouteFileError {
    #[error("line {line}: expected `<subnet> <mask> <next-hop> <metric>`, got {got:?}")]
    BadLine { line: usize, got: String },
    #[error("line {line}: invalid {field} value {value:?}")]
    BadField {
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("line {line}: {source}")]
    Table {
        line: usize,
        source: CapacityExceeded,
    },
}

/// Failure in the datagram transport collaborator.
#[derive(Error, Debug)]
#[error("transport: {0}")]
pub struct TransportError(#[from] pub io::Error);
