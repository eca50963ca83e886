//! Core kernel for tickwork process simulations.
//!
//! This crate provides the building blocks every simulation is made of:
//!
//! - [`Event`]: named, valued, timestamped message on the event bus
//! - [`Channel`]: named, time-ordered mailbox for scalar values
//! - [`Process`]: the schedulable unit, with `init`/`start`/`update`/`stop`
//! - [`StateMachine`] / [`State`]: a process organized as states and
//!   event-triggered transitions
//! - [`EventBus`], [`ProcessTable`], [`ChannelRegistry`]: the shared state a
//!   manager owns and lends to processes through a [`Context`]
//!
//! # Architecture
//!
//! ```text
//! Manager ──update──▶ Process ──emit──▶ outbox ──publish──▶ EventBus
//!    ▲                   │                                     │
//!    │                   └──send/latest──▶ ChannelRegistry     │
//!    └──────────────── end-of-tick dispatch ◀──────────────────┘
//! ```
//!
//! Everything here is:
//! - **Synchronous**: hooks run to completion, no async, no threads
//! - **Deterministic**: registration order within a tick, emission order
//!   for delivery
//! - **Owned by the manager**: processes reach channels and the bus only
//!   through the context handed to each hook

mod bus;
mod channel;
mod context;
mod error;
mod event;
mod fsm;
mod process;
mod registry;
mod signal;

pub use bus::{DispatchReport, EventBus, Watcher};
pub use channel::{Channel, ChannelRegistry, Sample};
pub use context::{ChannelHandle, Context, InitContext};
pub use error::{KernelError, Phase};
pub use event::{Event, START_EVENT};
pub use fsm::{NamedState, State, StateId, StateMachine};
pub use process::{AsAny, Lifecycle, Process};
pub use registry::{ProcessEntry, ProcessId, ProcessTable};
pub use signal::StopSignal;
