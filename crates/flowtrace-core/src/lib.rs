//! Flowtrace - a parasitic TCP traceroute library.
//!
//! Instead of sending synthetic probes, flowtrace rides an existing TCP flow:
//! a kernel packet-filter hook diverts the flow's outbound packets into user
//! space, where every N-th packet is re-injected with a reduced IPv4
//! time-to-live.  Routers that exhaust the time-to-live answer with ICMP
//! time-exceeded messages whose payload embeds the original headers; a raw
//! sniffer captures those, and each responder is recorded as a hop for the
//! flow recovered from the payload.  Because the probes are genuine segments
//! of an established session, the trace passes stateful NAT and firewall
//! devices that would discard free-standing probe datagrams.
//!
//! The [`Observer`] binds the two ingress streams (diverted packets and
//! sniffed ICMP) to a [`FlowRegistry`] of per-flow [`TraceEngine`]s.  The
//! divert and capture mechanisms themselves are behind the [`PacketDivert`]
//! and [`FrameSource`] traits; the reference bindings (Linux NFQUEUE and
//! libpcap) live in the `flowtrace` binary crate.
//!
//! # Example
//!
//! The following example builds a configuration and an engine, and drives a
//! diverted packet through it by hand:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use flowtrace_core::{Builder, TraceEngine, Verdict};
//!
//! let config = Builder::new().ttl_max(30).mangle_freq(1).build()?;
//! let engine = TraceEngine::spawn(config)?;
//! # let packet: Vec<u8> = vec![];
//! match engine.process_packet(&packet) {
//!     Verdict::Accept => println!("released unchanged"),
//!     Verdict::RepeatWith(bytes) => println!("re-injected {} bytes", bytes.len()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! IPv4 only, by design.
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn
)]
#![forbid(unsafe_code)]

mod builder;
mod config;
mod constants;
mod engine;
mod error;
mod flow;
mod observer;
mod registry;
mod source;
mod types;

/// Packet decode and rewrite operations.
pub mod codec;

pub use builder::Builder;
pub use config::{defaults, TraceConfig};
pub use constants::MAX_TTL;
pub use engine::{TraceEngine, TraceReport, Verdict};
pub use error::{TraceError, TraceResult};
pub use flow::{AddrPair, FlowKey, PortPair};
pub use observer::Observer;
pub use registry::FlowRegistry;
pub use source::{DivertedPacket, FrameSource, PacketDivert};
pub use types::TimeToLive;
