//! Supervisor (§4.E): the per-tier state machine owning `starting`,
//! `stopping`, and `restarting` queues plus spawn/poison authority over
//! every mailbox in its tier.
//!
//! Modeled as a single-threaded task fielding two channels — external
//! requests (`StartActor`/`StopActor`/`StopAll`) and internal signals
//! reported by mailboxes (`ChildStarted`/`Terminated`/`PoisonActor`) — so
//! all state here is exclusive without locks (§4.E concurrency note). The
//! source's OTP-style supervision tree (multiple restart strategies, a
//! generic `Child` trait, nested child specs) models a fundamentally
//! different problem — restart *strategy* across a tree of heterogeneous
//! children — and has no counterpart here: a single priority tier is a
//! flat map of independently-restarted actors, so this is a ground-up
//! state machine rather than an adaptation of that tree.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

// Layer 3: Internal module imports
use crate::behavior::Behavior;
use crate::config::{Props, RuntimeConfig};
use crate::error::WardenError;
use crate::mailbox;
use crate::message::Envelope;
use crate::process::ActorProcess;
use crate::registry::Registry;
use crate::util::{ActorName, Pattern};

/// A registration table entry: builds a fresh `Behavior` instance for a
/// given actor name (§6.1). All patterns routed to one `Supervisor<B>`
/// (and therefore to one `Runtime<B>`) share the concrete type `B`.
pub type BehaviorFactory<B> = Arc<dyn Fn(&ActorName) -> B + Send + Sync>;

/// Internal signal a mailbox reports to its owning Supervisor.
pub(crate) enum SupervisorSignal {
    /// `OnInit` has run; `error` carries its failure message, if any.
    ChildStarted { name: ActorName, error: Option<String> },
    /// The mailbox task has exited.
    Terminated { name: ActorName },
    /// The alive-check timer tripped; the actor should be stopped.
    PoisonActor { name: ActorName },
}

/// An external request routed to a Supervisor.
pub(crate) enum SupervisorRequest<B: Behavior> {
    StartActor {
        name: ActorName,
        pattern: Pattern,
        props: Props,
        reply: oneshot::Sender<Result<ActorProcess<B>, WardenError>>,
    },
    StopActor {
        name: ActorName,
        pattern: Pattern,
        reply: oneshot::Sender<Result<(), WardenError>>,
    },
    StopAll {
        reply: oneshot::Sender<bool>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SupervisorState {
    Running,
    Stopping,
    Stopped,
}

struct StartingItem<B: Behavior> {
    pattern: Pattern,
    mailbox_tx: crate::process::MailboxTx<B>,
    waiters: Vec<oneshot::Sender<Result<ActorProcess<B>, WardenError>>>,
    #[allow(dead_code)]
    seq: u64,
}

struct StoppingItem {
    #[allow(dead_code)]
    pattern: Pattern,
    #[allow(dead_code)]
    seq: u64,
}

struct RestartingItem<B: Behavior> {
    pattern: Pattern,
    props: Props,
    waiters: Vec<oneshot::Sender<Result<ActorProcess<B>, WardenError>>>,
    #[allow(dead_code)]
    seq: u64,
}

struct SupervisorInner<B: Behavior> {
    registry: Registry<B>,
    factories: Arc<DashMap<Pattern, BehaviorFactory<B>>>,
    runtime_config: RuntimeConfig,
    sig_tx: mpsc::UnboundedSender<SupervisorSignal>,
    starting: HashMap<ActorName, StartingItem<B>>,
    stopping: HashMap<ActorName, StoppingItem>,
    restarting: HashMap<ActorName, RestartingItem<B>>,
    state: SupervisorState,
    next_seq: u64,
}

impl<B: Behavior> SupervisorInner<B> {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn spawn_mailbox(
        &self,
        name: &ActorName,
        pattern: &Pattern,
        props: &Props,
    ) -> Result<crate::process::MailboxTx<B>, WardenError> {
        let factory = self
            .factories
            .get(pattern)
            .ok_or_else(|| WardenError::UnknownPattern(pattern.clone()))?;
        let behavior = (factory.value())(name);
        let handle = mailbox::spawn(
            name.clone(),
            pattern.clone(),
            props.meta.clone(),
            props.effective_alive_timeout(),
            self.runtime_config.default_alive_check_interval,
            behavior,
            self.sig_tx.clone(),
        );
        Ok(handle.tx)
    }

    /// §4.E `handle_start_actor`.
    fn handle_start_actor(
        &mut self,
        name: ActorName,
        pattern: Pattern,
        props: Props,
        waiter: oneshot::Sender<Result<ActorProcess<B>, WardenError>>,
    ) {
        if self.state == SupervisorState::Stopped {
            let _ = waiter.send(Err(WardenError::SupervisionStopped(pattern)));
            return;
        }
        if let Some(process) = self.registry.get(&name) {
            let _ = waiter.send(Ok(process));
            return;
        }
        if let Some(item) = self.starting.get_mut(&name) {
            item.waiters.push(waiter);
            return;
        }
        if self.stopping.contains_key(&name) {
            let seq = self.next_seq();
            let item = self
                .restarting
                .entry(name.clone())
                .or_insert_with(|| RestartingItem {
                    pattern: pattern.clone(),
                    props,
                    waiters: Vec::new(),
                    seq,
                });
            item.waiters.push(waiter);
            return;
        }

        match self.spawn_mailbox(&name, &pattern, &props) {
            Ok(mailbox_tx) => {
                let seq = self.next_seq();
                self.starting.insert(
                    name,
                    StartingItem {
                        pattern,
                        mailbox_tx,
                        waiters: vec![waiter],
                        seq,
                    },
                );
            }
            Err(e) => {
                let _ = waiter.send(Err(e));
            }
        }
    }

    /// §4.E `handle_child_started`. §9: drain waiters into a local list
    /// *before* publishing to the registry or replying.
    fn handle_child_started(&mut self, name: ActorName, error: Option<String>) {
        let Some(item) = self.starting.remove(&name) else {
            tracing::warn!(%name, "ChildStarted observed for an unknown starting entry");
            return;
        };
        let waiters = item.waiters;

        match error {
            None => {
                let process = ActorProcess::new(name.clone(), item.pattern, item.mailbox_tx);
                self.registry.set(name, process.clone());
                for waiter in waiters {
                    let _ = waiter.send(Ok(process.clone()));
                }
            }
            Some(reason) => {
                let _ = item.mailbox_tx.send(Envelope::PoisonSelf);
                let seq = self.next_seq();
                self.stopping.insert(
                    name.clone(),
                    StoppingItem {
                        pattern: item.pattern.clone(),
                        seq,
                    },
                );
                for waiter in waiters {
                    let _ = waiter.send(Err(WardenError::SpawnFailed {
                        name: name.clone(),
                        pattern: item.pattern.clone(),
                        reason: reason.clone(),
                    }));
                }
            }
        }
    }

    /// §4.E `handle_stop_actor`. The registry flip happens synchronously,
    /// before the mailbox has actually drained, so Handles fail fast.
    fn handle_stop_actor(&mut self, name: ActorName, _pattern: Pattern) -> Result<(), WardenError> {
        if let Some(process) = self.registry.get(&name) {
            self.registry.delete(&name);
            process.mark_stopped();
            let _ = process.enqueue(Envelope::PoisonSelf);
            let seq = self.next_seq();
            self.stopping.insert(
                name,
                StoppingItem {
                    pattern: process.pattern().clone(),
                    seq,
                },
            );
        }
        // Absent, already-stopping: no-op, `Ok` either way (§8 idempotence rule).
        Ok(())
    }

    /// §4.E `handle_actor_terminated`.
    fn handle_actor_terminated(&mut self, name: ActorName) {
        self.stopping.remove(&name);
        if self.state == SupervisorState::Stopped {
            return;
        }
        let Some(restart) = self.restarting.remove(&name) else {
            return;
        };
        if restart.waiters.is_empty() {
            return;
        }
        match self.spawn_mailbox(&name, &restart.pattern, &restart.props) {
            Ok(mailbox_tx) => {
                let seq = self.next_seq();
                self.starting.insert(
                    name,
                    StartingItem {
                        pattern: restart.pattern,
                        mailbox_tx,
                        waiters: restart.waiters,
                        seq,
                    },
                );
            }
            Err(e) => {
                for waiter in restart.waiters {
                    let _ = waiter.send(Err(e.clone()));
                }
            }
        }
    }

    /// §4.E `handle_stop_all`.
    fn handle_stop_all(&mut self) -> bool {
        self.state = SupervisorState::Stopping;
        for name in self.registry.live_names() {
            if self.stopping.contains_key(&name) {
                continue;
            }
            if let Some(process) = self.registry.get(&name) {
                let pattern = process.pattern().clone();
                let _ = self.handle_stop_actor(name, pattern);
            }
        }
        let complete = self.starting.is_empty() && self.stopping.is_empty() && self.restarting.is_empty();
        if complete {
            self.state = SupervisorState::Stopped;
        }
        complete
    }
}

/// A cheap-to-clone reference to a running Supervisor task.
pub(crate) struct SupervisorHandle<B: Behavior> {
    req_tx: mpsc::UnboundedSender<SupervisorRequest<B>>,
    pub(crate) registry: Registry<B>,
    #[allow(dead_code)]
    join: JoinHandle<()>,
}

impl<B: Behavior> SupervisorHandle<B> {
    pub(crate) async fn start_actor(
        &self,
        name: ActorName,
        pattern: Pattern,
        props: Props,
    ) -> Result<ActorProcess<B>, WardenError> {
        let (reply, rx) = oneshot::channel();
        self.req_tx
            .send(SupervisorRequest::StartActor {
                name,
                pattern,
                props,
                reply,
            })
            .map_err(|_| WardenError::TaskPanic("supervisor task gone".into()))?;
        rx.await
            .map_err(|_| WardenError::TaskPanic("supervisor dropped reply sender".into()))?
    }

    pub(crate) async fn stop_actor(&self, name: ActorName, pattern: Pattern) -> Result<(), WardenError> {
        let (reply, rx) = oneshot::channel();
        self.req_tx
            .send(SupervisorRequest::StopActor { name, pattern, reply })
            .map_err(|_| WardenError::TaskPanic("supervisor task gone".into()))?;
        rx.await
            .map_err(|_| WardenError::TaskPanic("supervisor dropped reply sender".into()))?
    }

    pub(crate) async fn stop_all(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.req_tx.send(SupervisorRequest::StopAll { reply }).is_err() {
            return true;
        }
        rx.await.unwrap_or(true)
    }
}

/// Spawn a new per-tier Supervisor task.
pub(crate) fn spawn_supervisor<B: Behavior>(
    factories: Arc<DashMap<Pattern, BehaviorFactory<B>>>,
    runtime_config: RuntimeConfig,
) -> SupervisorHandle<B> {
    let (req_tx, mut req_rx) = mpsc::unbounded_channel::<SupervisorRequest<B>>();
    let (sig_tx, mut sig_rx) = mpsc::unbounded_channel::<SupervisorSignal>();
    let registry = Registry::new();

    let mut inner = SupervisorInner {
        registry: registry.clone(),
        factories,
        runtime_config,
        sig_tx,
        starting: HashMap::new(),
        stopping: HashMap::new(),
        restarting: HashMap::new(),
        state: SupervisorState::Running,
        next_seq: 0,
    };

    let join = tokio::spawn(async move {
        loop {
            tokio::select! {
                req = req_rx.recv() => {
                    match req {
                        Some(SupervisorRequest::StartActor { name, pattern, props, reply }) => {
                            inner.handle_start_actor(name, pattern, props, reply);
                        }
                        Some(SupervisorRequest::StopActor { name, pattern, reply }) => {
                            let result = inner.handle_stop_actor(name, pattern);
                            let _ = reply.send(result);
                        }
                        Some(SupervisorRequest::StopAll { reply }) => {
                            let complete = inner.handle_stop_all();
                            let _ = reply.send(complete);
                        }
                        None => break,
                    }
                }
                sig = sig_rx.recv() => {
                    match sig {
                        Some(SupervisorSignal::ChildStarted { name, error }) => {
                            inner.handle_child_started(name, error);
                        }
                        Some(SupervisorSignal::Terminated { name }) => {
                            inner.handle_actor_terminated(name);
                        }
                        Some(SupervisorSignal::PoisonActor { name }) => {
                            if let Some(process) = inner.registry.get(&name) {
                                let pattern = process.pattern().clone();
                                let _ = inner.handle_stop_actor(name, pattern);
                            }
                        }
                        None => break,
                    }
                }
            }
        }
    });

    SupervisorHandle { req_tx, registry, join }
}
