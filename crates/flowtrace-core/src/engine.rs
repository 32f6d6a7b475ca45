use crate::codec;
use crate::config::TraceConfig;
use crate::error::TraceResult;
use crate::types::TimeToLive;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Weak};
use std::thread;
use tracing::{debug, warn};

/// The verdict for a diverted packet.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Verdict {
    /// Release the packet unchanged.
    Accept,
    /// Re-enqueue the replacement bytes at the filter hook.
    RepeatWith(Vec<u8>),
}

/// Control signals for the response timer task.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum TimerSignal {
    /// Rearm the timeout from now.
    Restart,
    /// Terminate the timer.
    Stop,
}

/// Hops recorded for a flow, keyed by probe time-to-live.
///
/// Each entry holds the responder addresses in reception order; duplicates
/// are kept as separate observations.
pub type TraceReport = BTreeMap<TimeToLive, Vec<Ipv4Addr>>;

#[derive(Debug)]
struct EngineState {
    /// The time-to-live currently being probed.  Non-decreasing.
    ttl: TimeToLive,
    /// Probes already sent at the current ttl.
    ttl_repeat: usize,
    /// Packets seen for this flow.
    count: usize,
    results: TraceReport,
    /// Terminal flag; once set the engine passes everything through.
    stopped: bool,
    /// Raised by the timer to force an advance on the next candidate.
    response_timed_out: bool,
}

impl EngineState {
    const fn new() -> Self {
        Self {
            ttl: TimeToLive(1),
            ttl_repeat: 0,
            count: 1,
            results: BTreeMap::new(),
            stopped: false,
            response_timed_out: false,
        }
    }
}

/// A parasitic traceroute over a single TCP flow.
///
/// The engine never sends packets of its own; it decides, for every packet
/// the kernel diverts from the flow, whether to release it untouched or to
/// re-inject it with a reduced time-to-live, and accounts the ICMP
/// time-exceeded replies those probes provoke.
///
/// Probing walks the time-to-live from 1 towards `ttl_max`, sending
/// `ttl_repeat_max` probes per hop and pacing itself so that only every
/// `mangle_freq`-th packet of the flow is touched.  A per-engine response
/// timer forces progress past silent hops.
#[derive(Debug)]
pub struct TraceEngine {
    config: TraceConfig,
    state: Mutex<EngineState>,
    timer_tx: Sender<TimerSignal>,
}

impl TraceEngine {
    /// Create an engine and arm its response timer.
    pub fn spawn(config: TraceConfig) -> TraceResult<Arc<Self>> {
        let (timer_tx, timer_rx) = unbounded();
        let engine = Arc::new(Self {
            config,
            state: Mutex::new(EngineState::new()),
            timer_tx,
        });
        let weak = Arc::downgrade(&engine);
        thread::Builder::new()
            .name(String::from("flow-timer"))
            .spawn(move || Self::run_timer(&weak, &timer_rx, config))?;
        Ok(engine)
    }

    /// Decide the fate of the next diverted packet of this flow.
    pub fn process_packet(&self, packet: &[u8]) -> Verdict {
        let mut state = self.state.lock();
        if state.stopped {
            return Verdict::Accept;
        }
        if state.count % self.config.mangle_freq != 0 {
            state.count += 1;
            return Verdict::Accept;
        }
        if state.response_timed_out || state.ttl_repeat == self.config.ttl_repeat_max {
            debug_assert!(state.ttl <= self.config.ttl_max);
            state.ttl = TimeToLive(state.ttl.0.saturating_add(1));
            state.ttl_repeat = 0;
            state.response_timed_out = false;
            let _ = self.timer_tx.send(TimerSignal::Restart);
            debug!(ttl = %state.ttl, "advanced to next hop");
        }
        if state.ttl > self.config.ttl_max {
            // Probing horizon exhausted: release the overrun packet unmangled.
            drop(state);
            self.stop();
            return Verdict::Accept;
        }
        state.ttl_repeat += 1;
        state.count += 1;
        let ttl = state.ttl;
        drop(state);
        match codec::serialize_with_ttl(packet, ttl) {
            Ok(bytes) => Verdict::RepeatWith(bytes),
            Err(err) => {
                warn!(%err, "could not rewrite packet, releasing unmodified");
                Verdict::Accept
            }
        }
    }

    /// Record an ICMP time-exceeded responder for the current hop.
    pub fn reply_received(&self, responder: Ipv4Addr) {
        let mut state = self.state.lock();
        let ttl = state.ttl;
        debug!(ttl = %ttl, %responder, "hop responded");
        let observed = state.results.entry(ttl).or_default();
        observed.push(responder);
        let finished =
            ttl == self.config.ttl_max && observed.len() >= self.config.ttl_repeat_max;
        drop(state);
        if finished {
            self.stop();
        }
    }

    /// Stop the trace.
    ///
    /// Idempotent, and safe to call from the processing path, the sniffer
    /// path, the timer and observer shutdown alike.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if state.stopped {
            return;
        }
        state.stopped = true;
        drop(state);
        debug!("trace stopped");
        // The timer may have exited already; a dead channel is fine here.
        let _ = self.timer_tx.send(TimerSignal::Stop);
    }

    /// Whether the trace has terminated.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    /// The time-to-live currently being probed.
    #[must_use]
    pub fn ttl(&self) -> TimeToLive {
        self.state.lock().ttl
    }

    /// Snapshot the hops recorded so far.
    #[must_use]
    pub fn report(&self) -> TraceReport {
        self.state.lock().results.clone()
    }

    fn run_timer(engine: &Weak<Self>, rx: &Receiver<TimerSignal>, config: TraceConfig) {
        loop {
            match rx.recv_timeout(config.response_timeout) {
                Ok(TimerSignal::Restart) => {}
                Ok(TimerSignal::Stop) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {
                    let Some(engine) = engine.upgrade() else {
                        return;
                    };
                    if engine.handle_timeout() {
                        return;
                    }
                    drop(engine);
                    // Fire at most once per arming: hold until the engine
                    // advances or the trace is stopped.
                    match rx.recv() {
                        Ok(TimerSignal::Restart) => {}
                        Ok(TimerSignal::Stop) | Err(_) => return,
                    }
                }
            }
        }
    }

    /// Handle an expired response timeout.  Returns true when the trace is
    /// over and the timer should exit.
    fn handle_timeout(&self) -> bool {
        let mut state = self.state.lock();
        if state.stopped {
            return true;
        }
        if state.ttl >= self.config.ttl_max && state.ttl_repeat >= self.config.ttl_repeat_max {
            // The timer is the caller, so there is nothing to signal.
            state.stopped = true;
            debug!("probing exhausted without replies, trace stopped");
            true
        } else {
            state.response_timed_out = true;
            debug!(ttl = %state.ttl, "response timeout, advancing on next candidate");
            false
        }
    }
}
