//! Name Registry (§4.C): a concurrent map from `ActorName` to `ActorProcess`.
//!
//! Grounded on `broker/registry.rs`'s DashMap-backed routing table and its
//! cheap-clone-via-`Arc` pattern, trimmed to the four operations §4.C
//! actually names — no pool routing, no pre-computed hash keys, since
//! nothing here calls for them.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
use crate::behavior::Behavior;
use crate::process::ActorProcess;
use crate::util::ActorName;

/// Concurrent actor-name → process map. Does not own the process's
/// lifecycle (§4.C) — it only ever reflects decisions made by the
/// Supervisor that owns a given name.
pub struct Registry<B: Behavior> {
    entries: Arc<DashMap<ActorName, ActorProcess<B>>>,
}

impl<B: Behavior> Registry<B> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Look up `name`. An entry whose process has been marked `Stopped` is
    /// treated as absent and removed eagerly (§3 invariant), so a second
    /// `get` for the same name never re-observes the stale entry.
    pub fn get(&self, name: &ActorName) -> Option<ActorProcess<B>> {
        let process = self.entries.get(name).map(|entry| entry.value().clone())?;
        if process.is_live() {
            Some(process)
        } else {
            self.entries.remove(name);
            None
        }
    }

    /// Install `process` under `name`. Only ever called by the owning
    /// Supervisor, after `OnInit` has succeeded (§4.C).
    pub(crate) fn set(&self, name: ActorName, process: ActorProcess<B>) {
        self.entries.insert(name, process);
    }

    /// Remove `name` unconditionally, regardless of its process state.
    pub(crate) fn delete(&self, name: &ActorName) {
        self.entries.remove(name);
    }

    /// `true` if `name` has a live entry. Shares `get`'s "Stopped is
    /// absent" semantics but does not clone the process.
    pub fn exists(&self, name: &ActorName) -> bool {
        self.get(name).is_some()
    }

    /// Number of live-or-not-yet-reaped entries currently stored. Exposed
    /// for shutdown-convergence tests (§8 S-7: "leaves the registry
    /// empty").
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` iff `len() == 0`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of every currently-live name, for the Supervisor's
    /// shutdown sweep (§4.E `handle_stop_all`). A point-in-time copy, not a
    /// live view — entries may be stopped concurrently by the time the
    /// caller acts on it, which `handle_stop_actor`'s own absent-is-ok
    /// idempotence already tolerates.
    pub(crate) fn live_names(&self) -> Vec<ActorName> {
        self.entries
            .iter()
            .filter(|entry| entry.value().is_live())
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl<B: Behavior> Default for Registry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Behavior> Clone for Registry<B> {
    /// Cheap clone via `Arc`; all clones share the same underlying map.
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tokio::sync::mpsc;

    #[derive(Debug, Clone)]
    struct Msg;

    struct Dummy;

    #[async_trait::async_trait]
    impl Behavior for Dummy {
        type Message = Msg;
        type Reply = ();
        type Error = Infallible;

        async fn on_init(
            &mut self,
            _ctx: &mut crate::behavior::ActorContext<Self::Message>,
        ) -> Result<(), Self::Error> {
            Ok(())
        }
        async fn on_request(
            &mut self,
            _ctx: &mut crate::behavior::ActorContext<Self::Message>,
            _msg: Self::Message,
        ) -> (Self::Reply, Result<(), Self::Error>) {
            ((), Ok(()))
        }
        async fn on_send(
            &mut self,
            _ctx: &mut crate::behavior::ActorContext<Self::Message>,
            _msg: Self::Message,
        ) {
        }
        async fn on_forward(
            &mut self,
            _ctx: &mut crate::behavior::ActorContext<Self::Message>,
            _msg: Self::Message,
        ) {
        }
    }

    fn process() -> ActorProcess<Dummy> {
        let (tx, _rx) = mpsc::unbounded_channel();
        ActorProcess::new(ActorName::from("a1"), crate::util::Pattern::from("P"), tx)
    }

    #[test]
    fn get_on_empty_registry_is_none() {
        let reg: Registry<Dummy> = Registry::new();
        assert!(reg.get(&ActorName::from("a1")).is_none());
        assert!(!reg.exists(&ActorName::from("a1")));
    }

    #[test]
    fn set_then_get_round_trips() {
        let reg: Registry<Dummy> = Registry::new();
        let name = ActorName::from("a1");
        reg.set(name.clone(), process());
        assert!(reg.exists(&name));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn stopped_entry_is_absent_and_reaped() {
        let reg: Registry<Dummy> = Registry::new();
        let name = ActorName::from("a1");
        let p = process();
        reg.set(name.clone(), p.clone());
        p.mark_stopped();

        assert!(reg.get(&name).is_none());
        assert_eq!(reg.len(), 0, "stale Stopped entry must be reaped eagerly");
    }

    #[test]
    fn delete_removes_regardless_of_state() {
        let reg: Registry<Dummy> = Registry::new();
        let name = ActorName::from("a1");
        reg.set(name.clone(), process());
        reg.delete(&name);
        assert!(reg.is_empty());
    }

    #[test]
    fn clone_shares_underlying_map() {
        let reg: Registry<Dummy> = Registry::new();
        let clone = reg.clone();
        reg.set(ActorName::from("a1"), process());
        assert!(clone.exists(&ActorName::from("a1")));
    }
}
