//! `ActorProcess`: the per-live-instance record shared between the registry,
//! the owning Supervisor, and every `ActorHandle` that last resolved it.
//!
//! The source keeps this record behind an RW-lock (§9). Since the only
//! mutation is a one-way `Live -> Stopped` transition, an RW-lock is
//! strictly more than is needed: a single atomic word lets readers load
//! without ever blocking on the mailbox's stop path, which is exactly the
//! hot-path cost §9 asks to avoid.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use tokio::sync::mpsc;

// Layer 3: Internal module imports
use crate::behavior::Behavior;
use crate::message::Envelope;
use crate::util::{ActorName, Pattern};

const LIVE: u8 = 0;
const STOPPED: u8 = 1;

/// The sending half of a mailbox's envelope channel.
pub(crate) type MailboxTx<B> = mpsc::UnboundedSender<Envelope<B>>;

struct Inner<B: Behavior> {
    name: ActorName,
    pattern: Pattern,
    mailbox: MailboxTx<B>,
    state: AtomicU8,
}

/// A cheap-to-clone handle onto one live (or just-stopped) actor instance.
///
/// All clones observe the same underlying state: flipping one to `Stopped`
/// is immediately visible to every other clone, which is what lets
/// `handle_stop_actor` (§4.E) flip state **before** the mailbox has
/// actually drained.
pub struct ActorProcess<B: Behavior> {
    inner: Arc<Inner<B>>,
}

impl<B: Behavior> ActorProcess<B> {
    pub(crate) fn new(name: ActorName, pattern: Pattern, mailbox: MailboxTx<B>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                pattern,
                mailbox,
                state: AtomicU8::new(LIVE),
            }),
        }
    }

    /// The actor's name.
    pub fn name(&self) -> &ActorName {
        &self.inner.name
    }

    /// The pattern this actor was spawned from.
    pub fn pattern(&self) -> &Pattern {
        &self.inner.pattern
    }

    /// `true` if this process has not yet been marked `Stopped`.
    ///
    /// A `true` result is a snapshot, not a guarantee — the process may be
    /// marked `Stopped` immediately after this returns. Callers enqueueing
    /// work must still handle a closed mailbox channel.
    pub fn is_live(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == LIVE
    }

    /// Atomically flip `Live -> Stopped`. Returns `true` if this call
    /// performed the flip, `false` if the process was already `Stopped`.
    ///
    /// Only the owning Supervisor's stop path and the mailbox's `Stopped`
    /// hook call this (§5 shared-resources rule).
    pub(crate) fn mark_stopped(&self) -> bool {
        self.inner
            .state
            .compare_exchange(LIVE, STOPPED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Enqueue an envelope on this process's mailbox. Fails if the mailbox
    /// task has already exited (channel closed) even if `state` has not
    /// yet been observed as `Stopped` — the two signals race by design
    /// (§4.D: `Terminated` is asynchronous).
    pub(crate) fn enqueue(&self, envelope: Envelope<B>) -> Result<(), Envelope<B>> {
        self.inner.mailbox.send(envelope).map_err(|e| e.0)
    }
}

impl<B: Behavior> Clone for ActorProcess<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::message::TimerPayload;
    use std::convert::Infallible;

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

    fn process() -> (ActorProcess<Dummy>, mpsc::UnboundedReceiver<Envelope<Dummy>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ActorProcess::new(ActorName::from("a1"), Pattern::from("P"), tx),
            rx,
        )
    }

    #[test]
    fn starts_live() {
        let (p, _rx) = process();
        assert!(p.is_live());
    }

    #[test]
    fn mark_stopped_is_one_way_and_idempotent() {
        let (p, _rx) = process();
        assert!(p.mark_stopped());
        assert!(!p.is_live());
        assert!(!p.mark_stopped()); // already stopped: no-op, reports false
    }

    #[test]
    fn clones_observe_shared_state() {
        let (p, _rx) = process();
        let clone = p.clone();
        p.mark_stopped();
        assert!(!clone.is_live());
    }

    #[test]
    fn enqueue_fails_once_mailbox_dropped() {
        let (p, rx) = process();
        drop(rx);
        let result = p.enqueue(Envelope::Send { msg: Msg });
        assert!(result.is_err());
    }

    #[test]
    fn enqueue_succeeds_while_mailbox_open() {
        let (p, mut rx) = process();
        p.enqueue(Envelope::SystemTick {
            payload: TimerPayload::CheckAlive,
        })
        .unwrap();
        assert!(rx.try_recv().is_ok());
    }
}
