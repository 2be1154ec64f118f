use crate::dialogue::InboundEvent;
use crate::shared::ids::AgentAddress;
use crate::workflow::{replies, WorkflowEngine};
use std::collections::{HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;

#[derive(Debug)]
pub struct Scheduled<T> {
    pub key: String,
    pub value: T,
}

/// FIFO queue that hands out at most one in-flight item per key.
#[derive(Debug)]
pub struct PerKeyScheduler<T> {
    pending: VecDeque<Scheduled<T>>,
    active_keys: HashSet<String>,
}

impl<T> Default for PerKeyScheduler<T> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            active_keys: HashSet::new(),
        }
    }
}

impl<T> PerKeyScheduler<T> {
    pub fn enqueue(&mut self, key: String, value: T) {
        self.pending.push_back(Scheduled { key, value });
    }

    pub fn dequeue_runnable(&mut self, max_items: usize) -> Vec<Scheduled<T>> {
        if max_items == 0 || self.pending.is_empty() {
            return Vec::new();
        }

        let mut selected = Vec::new();
        let mut remaining = VecDeque::new();

        while let Some(item) = self.pending.pop_front() {
            if !self.active_keys.contains(&item.key) && selected.len() < max_items {
                self.active_keys.insert(item.key.clone());
                selected.push(item);
            } else {
                remaining.push_back(item);
            }
        }

        self.pending = remaining;
        selected
    }

    pub fn complete(&mut self, key: &str) {
        self.active_keys.remove(key);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn active_len(&self) -> usize {
        self.active_keys.len()
    }
}

struct Completion {
    key: String,
    index: usize,
    reply: String,
}

fn ordering_key(event: &InboundEvent) -> String {
    AgentAddress::parse(&event.agent_address)
        .map(|address| address.agent_id().to_string())
        .unwrap_or_else(|_| event.agent_address.clone())
}

/// Handles a batch of events concurrently across agents while keeping each
/// agent's events in arrival order. Replies come back in input order.
pub fn dispatch_batch(
    engine: &WorkflowEngine,
    events: Vec<InboundEvent>,
    max_concurrency: usize,
    now: i64,
) -> Vec<String> {
    let total = events.len();
    let max_concurrency = max_concurrency.max(1);
    let mut scheduler = PerKeyScheduler::default();
    for (index, event) in events.into_iter().enumerate() {
        scheduler.enqueue(ordering_key(&event), (index, event));
    }

    let mut replies_by_index: Vec<Option<String>> = vec![None; total];
    let (result_tx, result_rx) = mpsc::channel::<Completion>();
    thread::scope(|scope| {
        let mut in_flight = 0usize;
        let mut finished = 0usize;
        while finished < total {
            let available_slots = max_concurrency.saturating_sub(in_flight);
            for scheduled in scheduler.dequeue_runnable(available_slots) {
                let tx = result_tx.clone();
                scope.spawn(move || {
                    let (index, event) = scheduled.value;
                    let reply = panic::catch_unwind(AssertUnwindSafe(|| engine.handle(&event, now)))
                        .unwrap_or_else(|_| replies::store_unavailable());
                    let _ = tx.send(Completion {
                        key: scheduled.key,
                        index,
                        reply,
                    });
                });
                in_flight += 1;
            }

            let Ok(done) = result_rx.recv() else {
                break;
            };
            in_flight = in_flight.saturating_sub(1);
            finished += 1;
            scheduler.complete(&done.key);
            replies_by_index[done.index] = Some(done.reply);
        }
    });

    replies_by_index
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect()
}
