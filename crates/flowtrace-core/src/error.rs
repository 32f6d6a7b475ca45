use flowtrace_packet::error::Error as PacketError;
use std::io;
use thiserror::Error;

/// A tracer error result.
pub type TraceResult<T> = Result<T, TraceError>;

/// A tracer error.
///
/// In steady state none of these are fatal: packet-level failures always
/// degrade to an `Accept` verdict so the diverted flow never stalls.  Only
/// setup-time failures terminate the process, and those are surfaced by the
/// bindings rather than here.
#[derive(Error, Debug)]
pub enum TraceError {
    /// A frame or packet layer could not be parsed.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] PacketError),
    /// The network layer is not IPv4.
    #[error("not an IPv4 packet")]
    NotIpv4,
    /// The transport layer is not TCP.
    #[error("not a TCP packet")]
    NotTcp,
    /// The transport layer is not ICMP.
    #[error("not an ICMP packet")]
    NotIcmp,
    /// A mangled packet could not be rebuilt from its parsed layers.
    #[error("failed to serialize mangled packet")]
    SerializeFailed,
    /// Invalid configuration.
    #[error("invalid config: {0}")]
    BadConfig(String),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
