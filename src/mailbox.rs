//! Mailbox & Behavior Adapter (§4.D): the per-actor cooperative task that
//! drains a strict FIFO of envelopes and drives a `Behavior`.
//!
//! Panic containment (§4.D: "a panic is logged, does not kill the mailbox
//! task") is implemented by running every `Behavior` callback inside its
//! own `tokio::spawn`, the same mechanism `airssys-wasm`'s
//! `call_hook_with_timeout` uses for synchronous hooks (there via
//! `spawn_blocking` + `catch_unwind`; here the hooks are async, so the
//! panic boundary has to be a task boundary instead). `behavior` and the
//! actor's `ActorContext` live behind a `tokio::sync::Mutex` so that a
//! panicked call's task exiting does not take the actor's state down with
//! it — `tokio::sync::Mutex` does not poison on panic, unlike
//! `std::sync::Mutex`. The mailbox loop is otherwise single-threaded, so
//! the lock is never contended.

// Layer 1: Standard library imports
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Layer 2: Third-party crate imports
use chrono::Utc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

// Layer 3: Internal module imports
use crate::behavior::{ActorContext, Behavior};
use crate::config::Meta;
use crate::error::WardenError;
use crate::message::{Envelope, TimerPayload};
use crate::process::MailboxTx;
use crate::supervisor::SupervisorSignal;
use crate::util::{ActorName, Pattern};

const ALIVE_CHECK_KEY: &str = "__alive_check__";

struct ActorState<B: Behavior> {
    behavior: B,
    ctx: ActorContext<B::Message>,
}

/// Handle to a just-spawned mailbox task.
pub(crate) struct MailboxHandle<B: Behavior> {
    pub tx: MailboxTx<B>,
    pub join: JoinHandle<()>,
}

/// A `Behavior` callback invocation, boxed so its borrow of `&mut
/// ActorState<B>` doesn't force a single `Fut` type valid for every
/// lifetime (the async-closure-borrowing-its-argument limitation: a plain
/// `for<'a> FnOnce(&'a mut T) -> Fut` bound cannot be satisfied by a
/// closure whose returned `async move` block captures `'a`).
type BoxedCall<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

async fn guarded_call<B, F, T>(state: &Arc<AsyncMutex<ActorState<B>>>, call: F) -> Result<T, WardenError>
where
    B: Behavior,
    F: for<'a> FnOnce(&'a mut ActorState<B>) -> BoxedCall<'a, T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    let handle = tokio::spawn(async move {
        let mut guard = state.lock().await;
        call(&mut guard).await
    });
    handle
        .await
        .map_err(|join_err| WardenError::TaskPanic(join_err.to_string()))
}

/// Spawn a new mailbox task for `name`/`pattern`. `alive_timeout` is the
/// already-resolved effective timeout (§4.D step 4 always arms the
/// alive-check system timer; a Behavior that never goes idle simply never
/// trips it).
pub(crate) fn spawn<B: Behavior>(
    name: ActorName,
    pattern: Pattern,
    meta: Option<Meta>,
    alive_timeout: Duration,
    alive_check_interval: Duration,
    behavior: B,
    supervisor_tx: mpsc::UnboundedSender<SupervisorSignal>,
) -> MailboxHandle<B> {
    let (tx, rx) = mpsc::unbounded_channel::<Envelope<B>>();

    let join = tokio::spawn(run(
        name,
        pattern,
        meta,
        alive_timeout,
        alive_check_interval,
        behavior,
        rx,
        supervisor_tx,
    ));

    MailboxHandle { tx, join }
}

async fn run<B: Behavior>(
    name: ActorName,
    pattern: Pattern,
    meta: Option<Meta>,
    alive_timeout: Duration,
    alive_check_interval: Duration,
    behavior: B,
    mut rx: mpsc::UnboundedReceiver<Envelope<B>>,
    supervisor_tx: mpsc::UnboundedSender<SupervisorSignal>,
) {
    let ctx = ActorContext::new(name.clone(), pattern.clone(), meta);
    let state = Arc::new(AsyncMutex::new(ActorState { behavior, ctx }));

    // Step 3: OnInit, then report ChildStarted.
    let init_result = guarded_call(&state, |s| Box::pin(async move { s.behavior.on_init(&mut s.ctx).await })).await;
    let init_error = match &init_result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(e) => Some(e.to_string()),
    };
    let _ = supervisor_tx.send(SupervisorSignal::ChildStarted {
        name: name.clone(),
        error: init_error.clone(),
    });

    // Step 4: always arm the alive-check system timer; step 5: LastActivityTime
    // is already `now` from `ActorContext::new`.
    {
        let mut guard = state.lock().await;
        guard.ctx.arm_alive_check(ALIVE_CHECK_KEY, alive_check_interval);
    }

    loop {
        let deadline = {
            let mut guard = state.lock().await;
            guard.ctx.next_timer_deadline()
        };

        let sleep = async {
            match deadline {
                Some(instant) => tokio::time::sleep_until(instant.into()).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            maybe_envelope = rx.recv() => {
                match maybe_envelope {
                    Some(Envelope::PoisonSelf) => break,
                    Some(envelope) => {
                        handle_envelope(&state, envelope).await;
                    }
                    None => break, // all senders dropped: treat like poison
                }
            }
            _ = sleep => {
                fire_due_timers(&state, alive_timeout, &supervisor_tx, &name).await;
            }
        }
    }

    let _ = guarded_call(&state, |s| Box::pin(async move { s.behavior.on_stopping(&mut s.ctx).await })).await;
    let _ = guarded_call(&state, |s| Box::pin(async move { s.behavior.on_stopped(&mut s.ctx).await })).await;

    let _ = supervisor_tx.send(SupervisorSignal::Terminated { name });
}

async fn handle_envelope<B: Behavior>(state: &Arc<AsyncMutex<ActorState<B>>>, envelope: Envelope<B>) {
    match envelope {
        Envelope::Request { msg, reply } => {
            let result = guarded_call(state, move |s| {
                Box::pin(async move {
                    s.ctx.touch();
                    s.behavior.on_request(&mut s.ctx, msg).await
                })
            })
            .await;
            match result {
                Ok((reply_value, Ok(()))) => {
                    let _ = reply.send(Ok(reply_value));
                }
                Ok((reply_value, Err(e))) => {
                    tracing::error!(error = %e, "on_request returned an error");
                    let _ = reply.send(Ok(reply_value));
                }
                Err(panic_err) => {
                    tracing::error!(error = %panic_err, "on_request panicked");
                    let _ = reply.send(Err(panic_err));
                }
            }
        }
        Envelope::Send { msg } => {
            if let Err(e) = guarded_call(state, move |s| {
                Box::pin(async move {
                    s.ctx.touch();
                    s.behavior.on_send(&mut s.ctx, msg).await
                })
            })
            .await
            {
                tracing::error!(error = %e, "on_send panicked");
            }
        }
        Envelope::Forward { msg } => {
            if let Err(e) = guarded_call(state, move |s| {
                Box::pin(async move {
                    s.ctx.touch();
                    s.behavior.on_forward(&mut s.ctx, msg).await
                })
            })
            .await
            {
                tracing::error!(error = %e, "on_forward panicked");
            }
        }
        Envelope::SystemTick { .. } | Envelope::PoisonSelf => {
            // SystemTick is delivered internally by `fire_due_timers`, not
            // via the channel; PoisonSelf is matched before this function
            // is called.
        }
    }
}

/// Pop every timer due by now, running `CheckAlive` inline and forwarding
/// other payloads to `Behavior::on_send` (§4.D).
async fn fire_due_timers<B: Behavior>(
    state: &Arc<AsyncMutex<ActorState<B>>>,
    alive_timeout: Duration,
    supervisor_tx: &mpsc::UnboundedSender<SupervisorSignal>,
    name: &ActorName,
) {
    let due = {
        let mut guard = state.lock().await;
        let now = Instant::now();
        let mut due = Vec::new();
        guard.ctx.process_timers(now, |payload| due.push(payload));
        due
    };

    for payload in due {
        match payload {
            TimerPayload::CheckAlive => {
                let last_activity = {
                    let guard = state.lock().await;
                    guard.ctx.last_activity()
                };
                let idle = Utc::now().signed_duration_since(last_activity);
                let idle = idle.to_std().unwrap_or(Duration::ZERO);
                if idle > alive_timeout {
                    let _ = supervisor_tx.send(SupervisorSignal::PoisonActor { name: name.clone() });
                    let mut guard = state.lock().await;
                    guard.ctx.remove_timer(ALIVE_CHECK_KEY);
                }
            }
            TimerPayload::User(msg) => {
                if let Err(e) = guarded_call(state, move |s| {
                    Box::pin(async move {
                        s.ctx.touch();
                        s.behavior.on_send(&mut s.ctx, msg).await
                    })
                })
                .await
                {
                    tracing::error!(error = %e, "system timer handler panicked");
                }
            }
        }
    }
}
