//! Per-actor timer manager (§4.B): a min-heap of one-shot and self-renewing
//! ("system") timers driven by a single logical OS timer.
//!
//! All `TimerMgr` methods are called only from the owning mailbox task
//! (§4.B: "no internal synchronization"), so this type is deliberately
//! `!Sync`-by-convention — nothing here takes a lock. The heap uses lazy
//! deletion: `remove_timer`/`add_timer_once` invalidate a key's current
//! entry by bumping a generation id rather than rebuilding the heap, and
//! `process` skips any popped heap item whose id no longer matches the
//! key's live entry. This keeps update-by-key and remove-by-key both O(log n)
//! amortized without a full indexed-heap structure.

// Layer 1: Standard library imports
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

/// A scheduled timer as returned by `add_timer_once`/`add_system_timer`.
#[derive(Debug, Clone)]
pub struct Timer<P> {
    /// Caller-chosen key, unique per `TimerMgr`.
    pub key: String,
    /// Monotonic id, used as the heap tie-breaker for equal expirations.
    pub id: u64,
    /// The duration this timer was armed with.
    pub duration: Duration,
    /// When this timer is due to fire.
    pub expiration: Instant,
    /// The payload that will be delivered when this timer fires.
    pub payload: P,
    /// `true` for a system (self-renewing) timer.
    pub is_system: bool,
}

struct LiveEntry<P> {
    id: u64,
    duration: Duration,
    expiration: Instant,
    payload: P,
    is_system: bool,
}

struct HeapItem {
    expiration: Instant,
    id: u64,
    key: String,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.expiration == other.expiration && self.id == other.id
    }
}
impl Eq for HeapItem {}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the earliest
        // expiration first; ties broken by ascending id (§4.B).
        other
            .expiration
            .cmp(&self.expiration)
            .then_with(|| other.id.cmp(&self.id))
    }
}
impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-actor timer manager. `P` is the payload type delivered to
/// `process`'s callback; the mailbox instantiates this with
/// `TimerPayload<Behavior::Message>` (see `crate::message`).
pub struct TimerMgr<P: Clone> {
    live: HashMap<String, LiveEntry<P>>,
    heap: BinaryHeap<HeapItem>,
    next_id: u64,
}

impl<P: Clone> Default for TimerMgr<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Clone> TimerMgr<P> {
    /// Create an empty timer manager.
    pub fn new() -> Self {
        Self {
            live: HashMap::new(),
            heap: BinaryHeap::new(),
            next_id: 0,
        }
    }

    fn fresh_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Insert or replace a one-shot timer. Returns `None` if `duration` is
    /// zero (the "`Duration <= 0` rejected" boundary rule — `Duration` in
    /// Rust cannot be negative, so zero is the only rejectable value).
    /// If `key` already exists (one-shot or system), it is replaced.
    pub fn add_timer_once(&mut self, key: &str, duration: Duration, payload: P) -> Option<Timer<P>> {
        if duration.is_zero() {
            return None;
        }
        let id = self.fresh_id();
        let expiration = Instant::now() + duration;
        self.live.insert(
            key.to_owned(),
            LiveEntry {
                id,
                duration,
                expiration,
                payload: payload.clone(),
                is_system: false,
            },
        );
        self.heap.push(HeapItem {
            expiration,
            id,
            key: key.to_owned(),
        });
        Some(Timer {
            key: key.to_owned(),
            id,
            duration,
            expiration,
            payload,
            is_system: false,
        })
    }

    /// Insert a system (self-renewing) timer. Returns `None` if `duration`
    /// is zero, or if `key` already names a live system timer (§4.B:
    /// "replacing a system timer via add_system_timer is rejected; callers
    /// must remove first").
    pub fn add_system_timer(
        &mut self,
        key: &str,
        duration: Duration,
        payload: P,
    ) -> Option<Timer<P>> {
        if duration.is_zero() {
            return None;
        }
        if let Some(existing) = self.live.get(key) {
            if existing.is_system {
                return None;
            }
        }
        let id = self.fresh_id();
        let expiration = Instant::now() + duration;
        self.live.insert(
            key.to_owned(),
            LiveEntry {
                id,
                duration,
                expiration,
                payload: payload.clone(),
                is_system: true,
            },
        );
        self.heap.push(HeapItem {
            expiration,
            id,
            key: key.to_owned(),
        });
        Some(Timer {
            key: key.to_owned(),
            id,
            duration,
            expiration,
            payload,
            is_system: true,
        })
    }

    /// Remove a timer by key. A no-op if `key` is not registered (§8
    /// round-trip rule).
    pub fn remove_timer(&mut self, key: &str) {
        self.live.remove(key);
        // The corresponding heap entry is left in place and skipped lazily
        // by `process` once its id no longer matches `live`.
    }

    /// `true` if `key` currently names a live timer (one-shot or system).
    pub fn contains(&self, key: &str) -> bool {
        self.live.contains_key(key)
    }

    /// The earliest pending expiration, if any live timer remains. Callers
    /// use this to (re)arm the single OS-level sleep.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.drop_stale_heap_head();
        self.heap.peek().map(|item| item.expiration)
    }

    fn drop_stale_heap_head(&mut self) {
        while let Some(top) = self.heap.peek() {
            match self.live.get(&top.key) {
                Some(entry) if entry.id == top.id => break,
                _ => {
                    self.heap.pop();
                }
            }
        }
    }

    /// Pop every timer whose expiration is `<= now`, in ascending
    /// expiration order, invoking `deliver` with each fired payload. System
    /// timers still registered after firing are rearmed at
    /// `now + duration`; one-shot timers are removed. Returns the next
    /// pending deadline, if any.
    pub fn process(&mut self, now: Instant, mut deliver: impl FnMut(P)) -> Option<Instant> {
        loop {
            self.drop_stale_heap_head();
            let is_due = matches!(self.heap.peek(), Some(top) if top.expiration <= now);
            if !is_due {
                break;
            }
            let Some(top) = self.heap.pop() else { break };

            if let Some(entry) = self.live.get(&top.key) {
                if entry.id != top.id {
                    // Stale: replaced since this heap item was pushed.
                    continue;
                }
                let payload = entry.payload.clone();
                if entry.is_system {
                    let duration = entry.duration;
                    let new_expiration = now + duration;
                    if let Some(live) = self.live.get_mut(&top.key) {
                        live.expiration = new_expiration;
                    }
                    self.heap.push(HeapItem {
                        expiration: new_expiration,
                        id: top.id,
                        key: top.key.clone(),
                    });
                } else {
                    self.live.remove(&top.key);
                }
                deliver(payload);
            }
            // Else: removed between fire and this pop — dropped (§4.B edge case).
        }
        self.next_deadline()
    }
}
