use anyhow::Context;
use flowtrace_core::{FrameSource, TraceError, TraceResult};
use pcap::{Active, Capture, Device};
use std::io;
use tracing::debug;

/// Capture filter: only ICMP ever reaches the dispatcher.
const FILTER: &str = "icmp";

/// Capture whole frames; time-exceeded payloads are small but router
/// implementations vary in how much of the original datagram they return.
const SNAPLEN: i32 = 65536;

/// Capture read timeout, so the consumer loop can observe shutdown.
const READ_TIMEOUT_MS: i32 = 100;

/// A [`FrameSource`] over a libpcap capture handle.
pub struct PcapSniffer {
    capture: Capture<Active>,
}

impl PcapSniffer {
    /// Open a promiscuous ICMP capture on the given interface.
    ///
    /// Fails when the interface cannot be opened or the filter cannot be
    /// installed, which is fatal at startup: without the capture no replies
    /// would ever be recorded.
    pub fn open(iface: &str) -> anyhow::Result<Self> {
        let mut capture = Capture::from_device(Device::from(iface))
            .with_context(|| format!("unknown capture device {iface}"))?
            .promisc(true)
            .snaplen(SNAPLEN)
            .timeout(READ_TIMEOUT_MS)
            .immediate_mode(true)
            .open()
            .with_context(|| format!("failed to open capture on {iface}"))?;
        capture
            .filter(FILTER, true)
            .context("failed to set capture filter")?;
        debug!(iface, filter = FILTER, "capture started");
        Ok(Self { capture })
    }
}

impl FrameSource for PcapSniffer {
    fn next_frame(&mut self) -> TraceResult<Option<Vec<u8>>> {
        match self.capture.next_packet() {
            Ok(packet) => Ok(Some(packet.data.to_vec())),
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(err) => Err(TraceError::Io(io::Error::other(err))),
        }
    }
}
