use anyhow::Context;
use flowtrace_core::{DivertedPacket, PacketDivert, TraceError, TraceResult, Verdict};
use nfq::Queue;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// How long to sleep when the queue has nothing for us, so the consumer loop
/// can observe shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How many packets the kernel may hold for this queue at once.
const QUEUE_CAPACITY: u32 = 100;

/// A [`PacketDivert`] over a Linux netfilter queue.
///
/// The operator installs a filter rule targeting the queue out-of-band (see
/// the command help for an example).  Packets are held by the kernel until a
/// verdict is delivered; [`NfqueueDivert::close`] releases anything still
/// pending so the kernel fast-path never stalls on shutdown.
pub struct NfqueueDivert {
    queue: Queue,
    queue_num: u16,
    pending: HashMap<u64, nfq::Message>,
    next_id: u64,
}

impl std::fmt::Debug for NfqueueDivert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NfqueueDivert")
            .field("queue_num", &self.queue_num)
            .field("pending", &self.pending)
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl NfqueueDivert {
    /// Bind the given netfilter queue.
    ///
    /// Fails when the queue cannot be opened or bound, which is fatal at
    /// startup: without the queue there is no flow to ride.
    pub fn open(queue_num: u16) -> anyhow::Result<Self> {
        let mut queue = Queue::open().context("failed to open netfilter queue socket")?;
        queue
            .bind(queue_num)
            .with_context(|| format!("failed to bind netfilter queue {queue_num}"))?;
        queue
            .set_queue_max_len(queue_num, QUEUE_CAPACITY)
            .with_context(|| format!("failed to size netfilter queue {queue_num}"))?;
        queue.set_nonblocking(true);
        debug!(queue_num, "netfilter queue bound");
        Ok(Self {
            queue,
            queue_num,
            pending: HashMap::new(),
            next_id: 0,
        })
    }
}

impl PacketDivert for NfqueueDivert {
    fn next_packet(&mut self) -> TraceResult<Option<DivertedPacket>> {
        match self.queue.recv() {
            Ok(message) => {
                let id = self.next_id;
                self.next_id += 1;
                let bytes = message.get_payload().to_vec();
                self.pending.insert(id, message);
                Ok(Some(DivertedPacket { id, bytes }))
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
                Ok(None)
            }
            Err(err) => Err(TraceError::Io(err)),
        }
    }

    fn verdict(&mut self, id: u64, verdict: Verdict) -> TraceResult<()> {
        let Some(mut message) = self.pending.remove(&id) else {
            return Ok(());
        };
        match verdict {
            Verdict::Accept => message.set_verdict(nfq::Verdict::Accept),
            Verdict::RepeatWith(bytes) => {
                message.set_payload(bytes);
                message.set_verdict(nfq::Verdict::Repeat);
            }
        }
        self.queue.verdict(message).map_err(TraceError::Io)
    }

    fn close(&mut self) {
        // Release anything still held by the kernel before unbinding.
        for (_, mut message) in self.pending.drain() {
            message.set_verdict(nfq::Verdict::Accept);
            let _ = self.queue.verdict(message);
        }
        let _ = self.queue.unbind(self.queue_num);
        debug!(queue_num = self.queue_num, "netfilter queue released");
    }
}
