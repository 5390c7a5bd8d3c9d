//! Runtime facade (§4.F, §6): the public entry point tying together the
//! pattern→Level routing table, the `Level::COUNT` Supervisors, and
//! `BehaviorFactory` registration.
//!
//! Grounded on `airssys-rt`'s `ActorSystem`/`ActorSystemBuilder` split: a
//! small top-level type that owns long-lived shared state and delegates
//! the actual work to per-tier workers it created. The pattern→Level map
//! is read far more often than it is written (every `get_or_start` reads
//! it, writes only happen at `register_factory` time), so it is a
//! `parking_lot::RwLock<Arc<HashMap<..>>>` rather than a `DashMap`: readers
//! clone the `Arc` under a short-lived read lock and then consult it
//! lock-free (§9's "pattern table is read-mostly" guidance).

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use parking_lot::RwLock;

// Layer 3: Internal module imports
use crate::behavior::Behavior;
use crate::config::{Props, RuntimeConfig};
use crate::error::WardenError;
use crate::process::ActorProcess;
use crate::supervisor::{spawn_supervisor, BehaviorFactory, SupervisorHandle};
use crate::util::{ActorName, Level, Pattern};

/// Supervised, priority-tiered runtime for one concrete `Behavior` type
/// (§9: the whole runtime is generic over a single `B` rather than
/// type-erased; distinct actor kinds that need distinct Rust types belong
/// in distinct `Runtime` instances, each with its own registry family).
pub struct Runtime<B: Behavior> {
    supervisors: [SupervisorHandle<B>; Level::COUNT],
    factories: Arc<DashMap<Pattern, BehaviorFactory<B>>>,
    pattern_level: RwLock<Arc<HashMap<Pattern, Level>>>,
    config: RuntimeConfig,
}

impl<B: Behavior> Runtime<B> {
    /// Build a runtime with default [`RuntimeConfig`].
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Build a runtime with an explicit [`RuntimeConfig`] (tests shrink the
    /// alive-check interval and shutdown poll interval so they don't have
    /// to wait out production-sized durations).
    pub fn with_config(config: RuntimeConfig) -> Self {
        let factories: Arc<DashMap<Pattern, BehaviorFactory<B>>> = Arc::new(DashMap::new());
        let supervisors = Level::ALL.map(|_| spawn_supervisor(Arc::clone(&factories), config.clone()));
        Self {
            supervisors,
            factories,
            pattern_level: RwLock::new(Arc::new(HashMap::new())),
            config,
        }
    }

    /// Register a `BehaviorFactory` for `pattern` at `level` (§6.1). A
    /// later call for the same pattern replaces the factory and level;
    /// actors already spawned under the old mapping are unaffected since
    /// `Supervisor::spawn_mailbox` resolves the factory fresh, per spawn.
    pub fn register_factory<F>(&self, pattern: Pattern, level: Level, factory: F)
    where
        F: Fn(&ActorName) -> B + Send + Sync + 'static,
    {
        self.factories.insert(pattern.clone(), Arc::new(factory));
        let mut table = self.pattern_level.write();
        let mut next: HashMap<Pattern, Level> = (**table).clone();
        next.insert(pattern, level);
        *table = Arc::new(next);
    }

    /// Look up the Level a pattern was registered under.
    pub fn level_of(&self, pattern: &Pattern) -> Option<Level> {
        self.pattern_level.read().get(pattern).copied()
    }

    fn supervisor_for(&self, pattern: &Pattern) -> Result<&SupervisorHandle<B>, WardenError> {
        let level = self
            .level_of(pattern)
            .ok_or_else(|| WardenError::UnknownPattern(pattern.clone()))?;
        Ok(&self.supervisors[level.as_index()])
    }

    /// Resolve `name`, starting it under `pattern` if it does not already
    /// exist (§4.F). A fast path consults the registry directly, bypassing
    /// the Supervisor's control channel entirely when the actor is already
    /// live.
    pub async fn get_or_start(
        &self,
        name: ActorName,
        pattern: Pattern,
        props: Props,
    ) -> Result<ActorProcess<B>, WardenError> {
        let supervisor = self.supervisor_for(&pattern)?;
        if let Some(process) = supervisor.registry.get(&name) {
            return Ok(process);
        }
        tokio::time::timeout(
            self.config.start_stop_timeout,
            supervisor.start_actor(name.clone(), pattern, props),
        )
        .await
        .map_err(|_| WardenError::Timeout(self.config.start_stop_timeout))?
    }

    /// Resolve `name` without starting it.
    pub fn lookup(&self, name: &ActorName, pattern: &Pattern) -> Result<Option<ActorProcess<B>>, WardenError> {
        Ok(self.supervisor_for(pattern)?.registry.get(name))
    }

    /// Stop `name` (§4.F). Idempotent: stopping an absent or
    /// already-stopping name succeeds without effect.
    pub async fn stop_actor(&self, name: ActorName, pattern: Pattern) -> Result<(), WardenError> {
        let supervisor = self.supervisor_for(&pattern)?;
        tokio::time::timeout(self.config.start_stop_timeout, supervisor.stop_actor(name, pattern))
            .await
            .map_err(|_| WardenError::Timeout(self.config.start_stop_timeout))?
    }

    /// Request every tier's Supervisor to begin stopping all of its live
    /// actors, returning `true` once every tier reports no starting,
    /// stopping, or restarting work left (§4.G relies on polling this).
    pub(crate) async fn stop_all_once(&self) -> bool {
        let mut complete = true;
        for supervisor in &self.supervisors {
            complete &= supervisor.stop_all().await;
        }
        complete
    }

    /// Runtime-wide configuration, shared with the shutdown coordinator.
    pub(crate) fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

impl<B: Behavior> Default for Runtime<B> {
    fn default() -> Self {
        Self::new()
    }
}
