//! The mailbox envelope: a closed sum type instead of the source's
//! type-switch on a top-level `any` (§9 re-architecture guidance).
//!
//! `airssys-rt`'s `MessageEnvelope<M>` wraps a single generic payload plus
//! metadata (sender, correlation id, ttl); that shape does not fit here
//! because the mailbox must distinguish *kinds* of delivery (`Request` vs.
//! `Send` vs. a lifecycle tick), not just carry one payload type. `Envelope`
//! is the closed enum §9 asks for, generalized over a `Behavior`'s
//! associated `Message`/`Reply` types instead of one shared envelope type.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tokio::sync::oneshot;

// Layer 3: Internal module imports
use crate::behavior::Behavior;
use crate::error::WardenError;

/// One-shot reply channel used by `Request` envelopes.
pub type ReplySink<B> = oneshot::Sender<Result<<B as Behavior>::Reply, WardenError>>;

/// Payload delivered to `Behavior::on_send` when a `SystemTick` fires.
///
/// `CheckAlive` is reserved for the alive-timeout system timer armed by the
/// mailbox itself (§4.D step 4); every other payload is a user timer's
/// payload and is forwarded to `Behavior::on_send` verbatim.
#[derive(Debug, Clone)]
pub enum TimerPayload<M> {
    /// Reserved payload for the alive-check system timer.
    CheckAlive,
    /// A user-supplied timer payload.
    User(M),
}

/// The mailbox's FIFO unit. Ordering is strict per actor: envelopes
/// interleave only in arrival order, and `PoisonSelf` always comes after
/// the last user envelope already queued ahead of it (§4.D, §5).
pub enum Envelope<B: Behavior> {
    /// A request expecting exactly one reply.
    Request {
        /// The request payload.
        msg: B::Message,
        /// Where the reply (or error) is delivered.
        reply: ReplySink<B>,
    },
    /// A fire-and-forget message (§9: canonical choice, no result).
    Send {
        /// The message payload.
        msg: B::Message,
    },
    /// A forwarded message, handled distinctly from `Send` so a Behavior
    /// can tell the two apart (e.g. to avoid re-forwarding a loop).
    Forward {
        /// The forwarded payload.
        msg: B::Message,
    },
    /// Delivered when the actor's `TimerMgr` fires a timer.
    SystemTick {
        /// The fired timer's payload.
        payload: TimerPayload<B::Message>,
    },
    /// Instructs the mailbox to run its shutdown sequence
    /// (`OnStopping` → `OnStopped`) and exit.
    PoisonSelf,
}

impl<B: Behavior> std::fmt::Debug for Envelope<B>
where
    B::Message: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Envelope::Request { msg, .. } => {
                f.debug_struct("Request").field("msg", msg).finish()
            }
            Envelope::Send { msg } => f.debug_struct("Send").field("msg", msg).finish(),
            Envelope::Forward { msg } => f.debug_struct("Forward").field("msg", msg).finish(),
            Envelope::SystemTick { payload } => f
                .debug_struct("SystemTick")
                .field("payload", payload)
                .finish(),
            Envelope::PoisonSelf => f.debug_struct("PoisonSelf").finish(),
        }
    }
}
