//! Event queue ordering live agents by their next event time.

use crate::agent::Agent;
use immsim_core::{AgentId, Error, Result};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use tracing::trace;

/// Sort key of one queue entry.
///
/// Ascending by time. Among equal times the most recently inserted entry
/// comes first; `seq` is unique per insertion so keys never collide.
#[derive(Debug, Clone, Copy)]
struct EventKey {
    time: f64,
    seq: u64,
    id: AgentId,
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EventKey {}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| other.seq.cmp(&self.seq))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// The global event order: one entry per live agent.
#[derive(Debug, Default)]
pub struct Driver {
    order: BTreeSet<EventKey>,
    index: HashMap<AgentId, EventKey>,
    next_seq: u64,
}

impl Driver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any entry for `agent` and insert it again at its current next-event time.
    pub fn reinsert(&mut self, agent: &Agent) {
        self.remove(agent.id);

        let key = EventKey {
            time: agent.next_time(),
            seq: self.next_seq,
            id: agent.id,
        };
        self.next_seq += 1;

        trace!(agent_id = %agent.id, time = key.time, "Queue insert");
        self.order.insert(key);
        self.index.insert(agent.id, key);
    }

    /// Remove the entry for `id`. Returns whether one existed.
    pub fn remove(&mut self, id: AgentId) -> bool {
        match self.index.remove(&id) {
            Some(key) => {
                self.order.remove(&key);
                true
            }
            None => false,
        }
    }

    /// The agent whose event fires next, and when.
    pub fn peek_earliest(&self) -> Result<(AgentId, f64)> {
        self.order
            .first()
            .map(|key| (key.id, key.time))
            .ok_or(Error::EmptyQueue)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.index.contains_key(&id)
    }

    /// Queued time for `id`, as of its last insertion
    pub fn scheduled_time(&self, id: AgentId) -> Option<f64> {
        self.index.get(&id).map(|key| key.time)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in firing order
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, f64)> + '_ {
        self.order.iter().map(|key| (key.id, key.time))
    }

    /// One line per entry: kind, id, queued time and both channel times.
    pub fn dump(&self, agents: &BTreeMap<AgentId, Agent>) -> String {
        let mut out = String::new();
        for (id, time) in self.iter() {
            match agents.get(&id) {
                Some(agent) => {
                    let _ = writeln!(
                        out,
                        "{} {}: next={} [{}, {}]",
                        agent.kind,
                        id,
                        time,
                        agent.move_time(),
                        agent.secondary_time()
                    );
                }
                None => {
                    let _ = writeln!(out, "<missing> {}: next={}", id, time);
                }
            }
        }
        out
    }
}
