use crate::codec;
use crate::config::TraceConfig;
use crate::engine::{TraceEngine, Verdict};
use crate::error::TraceResult;
use crate::flow::FlowKey;
use crate::registry::FlowRegistry;
use crate::source::{FrameSource, PacketDivert};
use flowtrace_packet::icmpv4::IcmpType;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Binds the packet divertor and the ICMP sniffer to the flow registry.
///
/// Two consumer threads demultiplex the ingress streams: diverted outbound
/// packets are routed to their flow's engine for a verdict, and sniffed ICMP
/// time-exceeded replies are routed to the same engine by the flow key
/// recovered from their payload.  Engines are created lazily on the first
/// diverted packet of an unseen flow.
#[derive(Debug)]
pub struct Observer {
    registry: Arc<FlowRegistry>,
    shutdown: Arc<AtomicBool>,
    divert_handle: Option<JoinHandle<()>>,
    sniff_handle: Option<JoinHandle<()>>,
}

impl Observer {
    /// Launch consumers for both ingress streams.
    pub fn spawn<D, S>(config: TraceConfig, divert: D, sniffer: S) -> TraceResult<Self>
    where
        D: PacketDivert + Send + 'static,
        S: FrameSource + Send + 'static,
    {
        let registry = Arc::new(FlowRegistry::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let divert_handle = thread::Builder::new().name(String::from("flow-divert")).spawn({
            let registry = Arc::clone(&registry);
            let shutdown = Arc::clone(&shutdown);
            move || run_divert(divert, &registry, config, &shutdown)
        })?;
        let sniff_handle = thread::Builder::new().name(String::from("flow-sniff")).spawn({
            let registry = Arc::clone(&registry);
            let shutdown = Arc::clone(&shutdown);
            move || run_sniff(sniffer, &registry, &shutdown)
        })?;
        Ok(Self {
            registry,
            shutdown,
            divert_handle: Some(divert_handle),
            sniff_handle: Some(sniff_handle),
        })
    }

    /// The registry of flows observed so far.
    #[must_use]
    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    /// Stop both consumers and every engine.
    ///
    /// Blocks until the consumers have quiesced; the divert consumer closes
    /// the divertor on its way out so the kernel queue is released even with
    /// packets still in flight.  Idempotent.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.registry.stop_all();
        if let Some(handle) = self.divert_handle.take() {
            if handle.join().is_err() {
                error!("divert consumer panicked");
            }
        }
        if let Some(handle) = self.sniff_handle.take() {
            if handle.join().is_err() {
                error!("sniff consumer panicked");
            }
        }
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_divert<D: PacketDivert>(
    mut divert: D,
    registry: &FlowRegistry,
    config: TraceConfig,
    shutdown: &AtomicBool,
) {
    while !shutdown.load(Ordering::SeqCst) {
        match divert.next_packet() {
            Ok(Some(packet)) => {
                // The kernel holds the packet until it hears back: whatever
                // happens while dispatching, answer with some verdict.
                let verdict = catch_unwind(AssertUnwindSafe(|| {
                    dispatch_diverted(registry, config, &packet.bytes)
                }))
                .unwrap_or_else(|_| {
                    error!("dispatch panicked, releasing packet unmodified");
                    Verdict::Accept
                });
                if let Err(err) = divert.verdict(packet.id, verdict) {
                    warn!(%err, "failed to deliver verdict");
                }
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "divert receive failed"),
        }
    }
    divert.close();
}

fn dispatch_diverted(registry: &FlowRegistry, config: TraceConfig, bytes: &[u8]) -> Verdict {
    // Anything the filter rule caught beyond IPv4/TCP passes straight through.
    let Ok(datagram) = codec::decode_outbound(bytes) else {
        return Verdict::Accept;
    };
    let key = FlowKey::from_outbound(&datagram.ipv4, &datagram.tcp);
    let engine = registry.get_or_insert_with(key, || {
        debug!(%key, "tracking new flow");
        TraceEngine::spawn(config)
    });
    match engine {
        Ok(engine) => engine.process_packet(bytes),
        Err(err) => {
            warn!(%err, %key, "failed to create engine for flow");
            Verdict::Accept
        }
    }
}

fn run_sniff<S: FrameSource>(mut sniffer: S, registry: &FlowRegistry, shutdown: &AtomicBool) {
    while !shutdown.load(Ordering::SeqCst) {
        match sniffer.next_frame() {
            Ok(Some(frame)) => dispatch_frame(registry, &frame),
            Ok(None) => {}
            Err(err) => warn!(%err, "capture receive failed"),
        }
    }
}

fn dispatch_frame(registry: &FlowRegistry, frame: &[u8]) {
    let Ok(observation) = codec::decode_icmp_frame(frame) else {
        return;
    };
    if observation.icmp_type != IcmpType::TimeExceeded {
        return;
    }
    let key = FlowKey::from_icmp_payload(observation.payload);
    // ICMP for flows we do not track is expected noise.
    let Some(engine) = registry.get(&key) else {
        return;
    };
    engine.reply_received(observation.responder);
}
