//! `ActorHandle` (§4.H): the caller-facing reference to one named actor —
//! resolve, send, forward, request, stop, with the one-shot
//! resolve-and-retry policy §4.H specifies for a `Stopped` race.
//!
//! Grounded on `airssys-rt`'s `ActorAddress`/mailbox-sender pair: a cheap,
//! cloneable value capturing just enough to re-resolve on demand, rather
//! than pinning a single `ActorProcess` for the handle's whole lifetime
//! (which would defeat restart-on-send, §8 S3).

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::sync::oneshot;

// Layer 3: Internal module imports
use crate::behavior::Behavior;
use crate::config::Props;
use crate::error::WardenError;
use crate::facade::Runtime;
use crate::message::Envelope;
use crate::process::ActorProcess;
use crate::util::{ActorName, Pattern};

/// A caller-facing reference to one named, pattern-typed actor.
///
/// Cheap to clone: cloning shares the same `Arc<Runtime<B>>` and `Props`.
/// `Props` is fixed at construction time — it is only ever consulted when
/// this handle causes a (re)start.
pub struct ActorHandle<B: Behavior> {
    runtime: Arc<Runtime<B>>,
    name: ActorName,
    pattern: Pattern,
    props: Props,
}

impl<B: Behavior> ActorHandle<B> {
    /// Build a handle bound to `name`/`pattern`. `props` is used for any
    /// start this handle triggers, including the implicit restart after a
    /// `Stopped` race.
    pub fn new(runtime: Arc<Runtime<B>>, name: ActorName, pattern: Pattern, props: Props) -> Self {
        Self {
            runtime,
            name,
            pattern,
            props,
        }
    }

    /// This handle's actor name.
    pub fn name(&self) -> &ActorName {
        &self.name
    }

    /// This handle's pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Resolve to a live `ActorProcess`, starting one under `pattern` if
    /// none currently exists (§4.H).
    pub async fn resolve(&self) -> Result<ActorProcess<B>, WardenError> {
        self.runtime
            .get_or_start(self.name.clone(), self.pattern.clone(), self.props.clone())
            .await
    }

    /// Enqueue `envelope`, retrying exactly once (by re-resolving, which
    /// restarts the actor if it had stopped) if the first attempt raced a
    /// `Stopped` mailbox (§4.H, §8 S3).
    ///
    /// §4.H step 2 requires checking `process.is_live()` before enqueueing,
    /// not just treating a closed channel as the only failure signal: the
    /// Supervisor's `handle_stop_actor` flips the state word and enqueues
    /// `PoisonSelf` before the mailbox task has drained (`supervisor.rs`),
    /// so the channel stays open for a window in which a plain `enqueue`
    /// would succeed but land *after* `PoisonSelf` and be silently dropped.
    async fn enqueue_with_retry(&self, envelope: Envelope<B>) -> Result<(), WardenError> {
        let process = self.resolve().await?;
        if !process.is_live() {
            return self.enqueue_after_restart(envelope).await;
        }
        let envelope = match process.enqueue(envelope) {
            Ok(()) => return Ok(()),
            Err(returned) => returned,
        };

        self.enqueue_after_restart(envelope).await
    }

    async fn enqueue_after_restart(&self, envelope: Envelope<B>) -> Result<(), WardenError> {
        let process = self.resolve().await?;
        process
            .enqueue(envelope)
            .map_err(|_| WardenError::ActorStopped(self.name.clone()))
    }

    /// Fire-and-forget delivery (§9: `Send` produces no reply).
    pub async fn send(&self, msg: B::Message) -> Result<(), WardenError> {
        self.enqueue_with_retry(Envelope::Send { msg }).await
    }

    /// Like [`Self::send`], but delivered as `Forward` so the Behavior can
    /// distinguish the two.
    pub async fn forward(&self, msg: B::Message) -> Result<(), WardenError> {
        self.enqueue_with_retry(Envelope::Forward { msg }).await
    }

    /// Request/reply with the runtime's configured default timeout.
    pub async fn request(&self, msg: B::Message) -> Result<B::Reply, WardenError> {
        self.request_with_timeout(msg, self.runtime.config().default_request_timeout)
            .await
    }

    /// Request/reply with an explicit timeout, retrying exactly once on a
    /// `Stopped` race (§4.H).
    pub async fn request_with_timeout(&self, msg: B::Message, timeout: Duration) -> Result<B::Reply, WardenError> {
        match self.try_request(msg.clone(), timeout).await {
            Err(WardenError::ActorStopped(_)) => self.try_request(msg, timeout).await,
            other => other,
        }
    }

    async fn try_request(&self, msg: B::Message, timeout: Duration) -> Result<B::Reply, WardenError> {
        let process = self.resolve().await?;
        if !process.is_live() {
            return Err(WardenError::ActorStopped(self.name.clone()));
        }
        let (reply, rx) = oneshot::channel();
        if process.enqueue(Envelope::Request { msg, reply }).is_err() {
            return Err(WardenError::ActorStopped(self.name.clone()));
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(WardenError::ActorStopped(self.name.clone())),
            Err(_) => Err(WardenError::Timeout(timeout)),
        }
    }

    /// Stop this actor (§4.H), idempotently.
    pub async fn stop(&self) -> Result<(), WardenError> {
        self.runtime.stop_actor(self.name.clone(), self.pattern.clone()).await
    }
}

impl<B: Behavior> Clone for ActorHandle<B> {
    fn clone(&self) -> Self {
        Self {
            runtime: Arc::clone(&self.runtime),
            name: self.name.clone(),
            pattern: self.pattern.clone(),
            props: self.props.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::behavior::ActorContext;
    use crate::util::Level;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[derive(Debug, Clone)]
    struct Msg(i64);

    struct Counter {
        total: Arc<AtomicI64>,
    }

    #[async_trait::async_trait]
    impl Behavior for Counter {
        type Message = Msg;
        type Reply = i64;
        type Error = Infallible;

        async fn on_init(&mut self, _ctx: &mut ActorContext<Self::Message>) -> Result<(), Self::Error> {
            Ok(())
        }
        async fn on_request(
            &mut self,
            _ctx: &mut ActorContext<Self::Message>,
            msg: Self::Message,
        ) -> (Self::Reply, Result<(), Self::Error>) {
            let total = self.total.fetch_add(msg.0, Ordering::SeqCst) + msg.0;
            (total, Ok(()))
        }
        async fn on_send(&mut self, _ctx: &mut ActorContext<Self::Message>, msg: Self::Message) {
            self.total.fetch_add(msg.0, Ordering::SeqCst);
        }
        async fn on_forward(&mut self, ctx: &mut ActorContext<Self::Message>, msg: Self::Message) {
            self.on_send(ctx, msg).await;
        }
    }

    fn handle() -> ActorHandle<Counter> {
        let runtime: Arc<Runtime<Counter>> = Arc::new(Runtime::new());
        runtime.register_factory(Pattern::from("Counter"), Level::Normal, |_name| Counter {
            total: Arc::new(AtomicI64::new(0)),
        });
        ActorHandle::new(runtime, ActorName::from("c1"), Pattern::from("Counter"), Props::default())
    }

    #[tokio::test]
    async fn request_spawns_on_first_use_and_replies() {
        let h = handle();
        let total = h.request(Msg(5)).await.unwrap();
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn send_then_request_accumulates() {
        let h = handle();
        h.send(Msg(3)).await.unwrap();
        h.send(Msg(4)).await.unwrap();
        let total = h.request(Msg(0)).await.unwrap();
        assert_eq!(total, 7);
    }

    #[tokio::test]
    async fn stop_then_send_restarts_with_fresh_state() {
        let h = handle();
        h.send(Msg(10)).await.unwrap();
        h.stop().await.unwrap();

        // The restarted instance is fresh: a brand-new Counter with total=0.
        let total = h.request(Msg(1)).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn request_timeout_is_honored() {
        let h = handle();
        let result = h.request_with_timeout(Msg(1), Duration::from_nanos(1)).await;
        // Either it wins the race and succeeds, or it times out; both are
        // acceptable outcomes of a 1ns deadline, but it must not hang.
        assert!(result.is_ok() || matches!(result, Err(WardenError::Timeout(_))));
    }

    #[tokio::test]
    async fn clone_shares_runtime() {
        let h = handle();
        let h2 = h.clone();
        h.send(Msg(2)).await.unwrap();
        let total = h2.request(Msg(0)).await.unwrap();
        assert_eq!(total, 2);
    }
}
