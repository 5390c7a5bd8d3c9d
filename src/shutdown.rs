//! Graceful Shutdown Coordinator (§4.G): polls every tier's `StopAll` until
//! it has observed `success_threshold` consecutive all-tiers-complete
//! results, or gives up after `max_attempts`.
//!
//! A single `Complete` observation is not trusted on its own: a tier can
//! report empty queues on one poll and then immediately receive a fresh
//! `StartActor` racing in from application code, so requiring several
//! consecutive clean reads is what actually converges. Grounded on the
//! polling loop in `airssys-rt`'s `ActorSystem::shutdown` path, generalized
//! to the consecutive-success counter §4.G adds on top of it.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::behavior::Behavior;
use crate::facade::Runtime;

/// Result of a [`graceful_shutdown`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownOutcome {
    /// Number of `StopAll` polls issued across every tier.
    pub attempts: u32,
    /// `true` if `success_threshold` consecutive complete polls were observed.
    pub success: bool,
}

/// Drive every tier's Supervisor to completion (§4.G).
///
/// `success_threshold == 0` is the §8 boundary rule: shutdown is declared
/// successful without issuing a single poll. `max_attempts == 0` means
/// unbounded — the loop runs until `success_threshold` is satisfied.
///
/// # Examples
///
/// ```rust
/// # use warden_rt::{Runtime, Behavior, ActorContext, shutdown::graceful_shutdown};
/// # use async_trait::async_trait;
/// # struct Noop;
/// # #[async_trait]
/// # impl Behavior for Noop {
/// #     type Message = ();
/// #     type Reply = ();
/// #     type Error = std::convert::Infallible;
/// #     async fn on_init(&mut self, _ctx: &mut ActorContext<()>) -> Result<(), Self::Error> { Ok(()) }
/// #     async fn on_request(&mut self, _ctx: &mut ActorContext<()>, _m: ()) -> ((), Result<(), Self::Error>) { ((), Ok(())) }
/// #     async fn on_send(&mut self, _ctx: &mut ActorContext<()>, _m: ()) {}
/// #     async fn on_forward(&mut self, _ctx: &mut ActorContext<()>, _m: ()) {}
/// # }
/// # #[tokio::main]
/// # async fn main() {
/// let runtime: Runtime<Noop> = Runtime::new();
/// let outcome = graceful_shutdown(&runtime, 2, 10).await;
/// assert!(outcome.success);
/// # }
/// ```
pub async fn graceful_shutdown<B: Behavior>(
    runtime: &Runtime<B>,
    success_threshold: u32,
    max_attempts: u32,
) -> ShutdownOutcome {
    if success_threshold == 0 {
        return ShutdownOutcome {
            attempts: 0,
            success: true,
        };
    }

    let mut consecutive = 0u32;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let complete = runtime.stop_all_once().await;
        if complete {
            consecutive += 1;
            if consecutive >= success_threshold {
                return ShutdownOutcome { attempts, success: true };
            }
        } else {
            consecutive = 0;
        }

        if max_attempts != 0 && attempts >= max_attempts {
            return ShutdownOutcome {
                attempts,
                success: consecutive >= success_threshold,
            };
        }

        tokio::time::sleep(runtime.config().shutdown_poll_interval).await;
    }
}
