//! Crate-level error taxonomy.
//!
//! Follows the same canonical-struct approach as `airssys-rt`'s
//! `SystemError`: one `thiserror` enum per crate, with helper predicates
//! instead of callers pattern-matching on variants to decide control flow.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::util::{ActorName, Pattern};

/// Errors surfaced by the runtime's public API (§7).
#[derive(Error, Debug, Clone)]
pub enum WardenError {
    /// The name was never registered (no live, starting, stopping, or
    /// restarting record exists for it).
    #[error("actor not found: {0}")]
    ActorNotFound(ActorName),

    /// The process was observed `Stopped` during a Handle operation.
    /// `ActorHandle` recovers from this once automatically; it should not
    /// escape to application code under normal operation.
    #[error("actor stopped: {0}")]
    ActorStopped(ActorName),

    /// The owning tier's Supervisor has flipped to `Stopped`; new starts
    /// are rejected.
    #[error("supervision stopped for pattern: {0}")]
    SupervisionStopped(Pattern),

    /// A `Request`, `StartActor`, or `StopActor` exceeded its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The runtime refused to create the mailbox (e.g. a race inserted a
    /// conflicting entry between the queue check and the spawn).
    #[error("spawn failed for {name} ({pattern}): {reason}")]
    SpawnFailed {
        /// Name the spawn was attempted for.
        name: ActorName,
        /// Pattern the spawn was attempted for.
        pattern: Pattern,
        /// Human-readable cause.
        reason: String,
    },

    /// The Supervisor reply did not match any expected shape for the
    /// request that produced it; a protocol violation, not a normal error.
    #[error("unknown supervisor result for {0}")]
    UnknownResult(ActorName),

    /// A panic was caught inside a `Behavior` callback or inside
    /// `UniqueTaskExecutor::execute_once`'s closure.
    #[error("task panic: {0}")]
    TaskPanic(String),

    /// The pattern was never registered via `register_factory`.
    #[error("unknown pattern: {0}")]
    UnknownPattern(Pattern),
}

impl WardenError {
    /// `true` for the one error kind a caller may treat as transient and
    /// retry without additional backoff (`ActorHandle` already does this
    /// once internally; exposed for callers building their own retries on
    /// top of `Runtime` directly).
    pub fn is_retryable(&self) -> bool {
        matches!(self, WardenError::ActorStopped(_))
    }

    /// `true` when the error means the surrounding tier (or the whole
    /// process, for `SupervisionStopped`) will never again accept the
    /// operation that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WardenError::SupervisionStopped(_))
    }
}
