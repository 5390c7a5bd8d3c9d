//! `Behavior`: the polymorphic user code (§3) and its execution context.
//!
//! Grounded on `airssys-rt`'s `Actor` trait (`async_trait`, associated
//! `Message`/`Error` types, doctested methods), generalized to the six
//! callbacks §3 names and given an associated `Reply` type so `on_request`
//! can answer with something other than `Message`.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc}; // §10.2 MANDATORY

// Layer 3: Internal module imports
use crate::config::Meta;
use crate::message::TimerPayload;
use crate::timer::TimerMgr;
use crate::util::{ActorName, Pattern};

/// Per-actor execution context passed to every `Behavior` callback.
///
/// Owns the actor's `TimerMgr` (§4.B): `TimerMgr` methods are only ever
/// called from the owning mailbox task, so no synchronization is needed
/// here, matching §4.B's "no internal synchronization" invariant. The
/// alive-check system timer and a Behavior's own timers share one heap, so
/// the manager is keyed on `TimerPayload<M>` rather than bare `M`.
pub struct ActorContext<M: Clone> {
    name: ActorName,
    pattern: Pattern,
    meta: Option<Meta>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    timers: TimerMgr<TimerPayload<M>>,
}

impl<M: Clone> ActorContext<M> {
    pub(crate) fn new(name: ActorName, pattern: Pattern, meta: Option<Meta>) -> Self {
        let now = Utc::now(); // §10.2
        Self {
            name,
            pattern,
            meta,
            created_at: now,
            last_activity: now,
            timers: TimerMgr::new(),
        }
    }

    /// This actor's name.
    pub fn name(&self) -> &ActorName {
        &self.name
    }

    /// This actor's pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Caller-supplied metadata, if any.
    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    /// When this context (and therefore the actor) was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Timestamp of the last `Request`/`Send`/`Forward` this actor handled.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Arm a one-shot timer. Returns `false` if `duration` is zero.
    pub fn add_timer_once(&mut self, key: &str, duration: std::time::Duration, payload: M) -> bool {
        self.timers
            .add_timer_once(key, duration, TimerPayload::User(payload))
            .is_some()
    }

    /// Arm a self-renewing timer. Returns `false` if `duration` is zero or
    /// `key` already names a live system timer.
    pub fn add_system_timer(&mut self, key: &str, duration: std::time::Duration, payload: M) -> bool {
        self.timers
            .add_system_timer(key, duration, TimerPayload::User(payload))
            .is_some()
    }

    /// Remove a timer by key. A no-op if `key` is not registered.
    pub fn remove_timer(&mut self, key: &str) {
        self.timers.remove_timer(key);
    }

    /// Arm (or re-arm) the reserved alive-check system timer.
    pub(crate) fn arm_alive_check(&mut self, key: &str, interval: std::time::Duration) -> bool {
        self.timers
            .add_system_timer(key, interval, TimerPayload::CheckAlive)
            .is_some()
    }

    /// Fire every timer due by `now`, handing each payload to `deliver`.
    pub(crate) fn process_timers(
        &mut self,
        now: std::time::Instant,
        deliver: impl FnMut(TimerPayload<M>),
    ) -> Option<std::time::Instant> {
        self.timers.process(now, deliver)
    }

    /// The earliest pending timer deadline, if any.
    pub(crate) fn next_timer_deadline(&mut self) -> Option<std::time::Instant> {
        self.timers.next_deadline()
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Utc::now(); // §10.2
    }
}

/// The user-provided callback set driving an actor's reaction to messages
/// and lifecycle events (§3).
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use warden_rt::{ActorContext, Behavior};
///
/// struct Counter { count: u64 }
///
/// #[async_trait]
/// impl Behavior for Counter {
///     type Message = i64;
///     type Reply = u64;
///     type Error = std::convert::Infallible;
///
///     async fn on_init(&mut self, _ctx: &mut ActorContext<Self::Message>) -> Result<(), Self::Error> {
///         Ok(())
///     }
///
///     async fn on_request(
///         &mut self,
///         _ctx: &mut ActorContext<Self::Message>,
///         delta: Self::Message,
///     ) -> (Self::Reply, Result<(), Self::Error>) {
///         self.count = self.count.saturating_add(delta as u64);
///         (self.count, Ok(()))
///     }
///
///     async fn on_send(&mut self, _ctx: &mut ActorContext<Self::Message>, delta: Self::Message) {
///         self.count = self.count.saturating_add(delta as u64);
///     }
///
///     async fn on_forward(&mut self, ctx: &mut ActorContext<Self::Message>, msg: Self::Message) {
///         self.on_send(ctx, msg).await;
///     }
/// }
/// ```
#[async_trait]
pub trait Behavior: Send + 'static {
    /// The message type this actor's mailbox carries. `Clone` is required
    /// so a system timer's payload can be redelivered on every renewal
    /// without being consumed.
    type Message: Send + Clone + 'static;
    /// The reply type returned from `Request` envelopes.
    type Reply: Send + 'static;
    /// The error type every fallible callback returns.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Called once, right after the mailbox is spawned and before any
    /// envelope is processed (§4.D step 3).
    async fn on_init(&mut self, ctx: &mut ActorContext<Self::Message>) -> Result<(), Self::Error>;

    /// Handle a `Request` envelope. Exactly one reply is produced per call.
    async fn on_request(
        &mut self,
        ctx: &mut ActorContext<Self::Message>,
        msg: Self::Message,
    ) -> (Self::Reply, Result<(), Self::Error>);

    /// Handle a `Send` envelope. No reply is produced (§9 canonical choice).
    async fn on_send(&mut self, ctx: &mut ActorContext<Self::Message>, msg: Self::Message);

    /// Handle a `Forward` envelope. Distinguished from `Send` so a Behavior
    /// can special-case forwarded traffic (e.g. avoid forwarding loops).
    async fn on_forward(&mut self, ctx: &mut ActorContext<Self::Message>, msg: Self::Message);

    /// Called once when a stop has been requested, before the mailbox
    /// drains. Errors are logged, not fatal (§4.D).
    async fn on_stopping(
        &mut self,
        _ctx: &mut ActorContext<Self::Message>,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called once, immediately before the mailbox task exits.
    async fn on_stopped(
        &mut self,
        _ctx: &mut ActorContext<Self::Message>,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}
