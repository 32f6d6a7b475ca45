use crate::engine::Verdict;
use crate::error::TraceResult;

/// A packet held by the kernel filter hook, awaiting a verdict.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DivertedPacket {
    /// Opaque handle identifying the packet to the divertor.
    pub id: u64,
    /// The raw IPv4 packet bytes.
    pub bytes: Vec<u8>,
}

/// An abstraction over the kernel packet-divert mechanism.
///
/// Every packet yielded by [`PacketDivert::next_packet`] must be answered by
/// exactly one [`PacketDivert::verdict`] call: a packet left without a
/// verdict stalls the kernel queue.
#[cfg_attr(test, mockall::automock)]
pub trait PacketDivert {
    /// Receive the next diverted packet.
    ///
    /// Returns `None` if no packet is available within the implementation's
    /// poll interval, so that a consumer loop can observe shutdown.
    fn next_packet(&mut self) -> TraceResult<Option<DivertedPacket>>;

    /// Deliver the verdict for a previously received packet.
    fn verdict(&mut self, id: u64, verdict: Verdict) -> TraceResult<()>;

    /// Close the divertor, releasing the kernel queue.
    fn close(&mut self);
}

/// An abstraction over the raw frame capture.
///
/// The capture is expected to be filtered to ICMP at the source; anything
/// else yielded here is discarded after decoding.
#[cfg_attr(test, mockall::automock)]
pub trait FrameSource {
    /// Receive the next captured frame.
    ///
    /// Returns `None` if no frame arrives within the implementation's poll
    /// interval, so that a consumer loop can observe shutdown.
    fn next_frame(&mut self) -> TraceResult<Option<Vec<u8>>>;
}
