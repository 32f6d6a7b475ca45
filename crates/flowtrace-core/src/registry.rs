use crate::engine::{TraceEngine, TraceReport};
use crate::error::TraceResult;
use crate::flow::FlowKey;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// A concurrent register of flows under trace.
///
/// Reads vastly outnumber writes: every diverted packet and every sniffed
/// reply does a lookup, while an insertion happens once per flow.  Stopped
/// engines are retained so that late ICMP replies and further flow packets
/// still resolve; process teardown is the only bulk collector.
#[derive(Debug, Default)]
pub struct FlowRegistry {
    flows: RwLock<HashMap<FlowKey, Arc<TraceEngine>>>,
}

impl FlowRegistry {
    /// Create an empty `FlowRegistry`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the given flow is tracked.
    #[must_use]
    pub fn has(&self, key: &FlowKey) -> bool {
        self.flows.read().contains_key(key)
    }

    /// The engine tracking the given flow, if any.
    #[must_use]
    pub fn get(&self, key: &FlowKey) -> Option<Arc<TraceEngine>> {
        self.flows.read().get(key).map(Arc::clone)
    }

    /// Track a flow with the given engine.
    pub fn insert(&self, key: FlowKey, engine: Arc<TraceEngine>) {
        self.flows.write().insert(key, engine);
    }

    /// Forget a flow.
    pub fn remove(&self, key: &FlowKey) -> Option<Arc<TraceEngine>> {
        self.flows.write().remove(key)
    }

    /// The engine for the given flow, creating one if the flow is new.
    ///
    /// Two packets of a previously unseen flow may race to create its engine;
    /// the check is repeated under the write lock so exactly one wins and the
    /// other reuses it.
    pub fn get_or_insert_with<F>(&self, key: FlowKey, create: F) -> TraceResult<Arc<TraceEngine>>
    where
        F: FnOnce() -> TraceResult<Arc<TraceEngine>>,
    {
        if let Some(engine) = self.get(&key) {
            return Ok(engine);
        }
        match self.flows.write().entry(key) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let engine = create()?;
                entry.insert(Arc::clone(&engine));
                Ok(engine)
            }
        }
    }

    /// Stop every tracked engine.
    pub fn stop_all(&self) {
        for engine in self.flows.read().values() {
            engine.stop();
        }
    }

    /// The number of tracked flows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flows.read().len()
    }

    /// Whether any flow is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flows.read().is_empty()
    }

    /// Snapshot the recorded hops of every tracked flow.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(FlowKey, TraceReport)> {
        self.flows
            .read()
            .iter()
            .map(|(key, engine)| (*key, engine.report()))
            .collect()
    }
}
