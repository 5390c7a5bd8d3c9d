//! # warden-rt — supervised, priority-tiered actor runtime core
//!
//! A concurrency core for stateful game-server entities: named actors
//! spawned lazily on first use, organized into priority tiers that control
//! shutdown ordering, each running a strict per-actor FIFO mailbox with
//! transparent restart and idle reclamation.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use warden_rt::{ActorContext, ActorHandle, ActorName, Behavior, Level, Pattern, Props, Runtime};
//!
//! // 1. Define your message type.
//! #[derive(Debug, Clone)]
//! enum SessionMsg {
//!     Touch,
//!     Balance(i64),
//! }
//!
//! // 2. Define your actor.
//! struct Session { balance: i64 }
//!
//! // 3. Implement `Behavior`.
//! #[async_trait]
//! impl Behavior for Session {
//!     type Message = SessionMsg;
//!     type Reply = i64;
//!     type Error = std::convert::Infallible;
//!
//!     async fn on_init(&mut self, _ctx: &mut ActorContext<Self::Message>) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//!
//!     async fn on_request(
//!         &mut self,
//!         _ctx: &mut ActorContext<Self::Message>,
//!         msg: Self::Message,
//!     ) -> (Self::Reply, Result<(), Self::Error>) {
//!         if let SessionMsg::Balance(delta) = msg {
//!             self.balance += delta;
//!         }
//!         (self.balance, Ok(()))
//!     }
//!
//!     async fn on_send(&mut self, _ctx: &mut ActorContext<Self::Message>, _msg: Self::Message) {}
//!     async fn on_forward(&mut self, ctx: &mut ActorContext<Self::Message>, msg: Self::Message) {
//!         self.on_send(ctx, msg).await;
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! // 4. Register a factory per pattern, then talk to actors through a handle.
//! let runtime: Arc<Runtime<Session>> = Arc::new(Runtime::new());
//! runtime.register_factory(Pattern::from("Session"), Level::Normal, |_name| Session { balance: 0 });
//!
//! let handle = ActorHandle::new(
//!     Arc::clone(&runtime),
//!     ActorName::from("player-42"),
//!     Pattern::from("Session"),
//!     Props::default(),
//! );
//!
//! let balance = handle.request(SessionMsg::Balance(100)).await.unwrap();
//! assert_eq!(balance, 100);
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`behavior`] — the `Behavior` trait and `ActorContext`
//! - [`message`] — the mailbox envelope and timer payload types
//! - [`timer`] — the per-actor lazy-deletion timer heap
//! - [`task`] — `UniqueTaskExecutor`, a concurrent-call deduplicator
//! - [`config`] — `Meta`, `Props`, `RuntimeConfig`
//! - [`error`] — `WardenError`
//! - [`handle`] — `ActorHandle`, the caller-facing API
//! - [`shutdown`] — the graceful shutdown coordinator
//! - [`util`] — `ActorName`, `Pattern`, `Level`
//!
//! The name registry, per-actor mailbox task, per-tier supervisor, and
//! runtime facade are internal: reachable only through [`Runtime`] and
//! [`ActorHandle`].

pub mod behavior;
pub mod config;
pub mod error;
mod facade;
pub mod handle;
mod mailbox;
pub mod message;
mod process;
mod registry;
pub mod shutdown;
mod supervisor;
pub mod task;
pub mod timer;
pub mod util;

pub use behavior::{ActorContext, Behavior};
pub use config::{Meta, Props, PropsBuilder, RuntimeConfig};
pub use error::WardenError;
pub use facade::Runtime;
pub use handle::ActorHandle;
pub use process::ActorProcess;
pub use shutdown::{graceful_shutdown, ShutdownOutcome};
pub use task::UniqueTaskExecutor;
pub use timer::{Timer, TimerMgr};
pub use util::{ActorName, Level, Pattern};
