//! Kernel error taxonomy.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Lifecycle hook in which a process fault occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Init,
    Start,
    Update,
    /// A watcher handler invoked during event dispatch.
    Watch,
    Stop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::Start => "start",
            Phase::Update => "update",
            Phase::Watch => "watch",
            Phase::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Errors raised by the kernel.
///
/// Every variant is a local, synchronous contract violation. Nothing here is
/// transient, so callers never retry.
#[derive(Debug, Error)]
pub enum KernelError {
    /// An API call was made in the wrong lifecycle order.
    #[error("lifecycle violation: {0}")]
    Lifecycle(String),

    /// A process with this name is already scheduled.
    #[error("process `{0}` is already scheduled")]
    DuplicateProcess(String),

    /// A channel with this name is already registered.
    #[error("channel `{0}` is already registered")]
    DuplicateChannel(String),

    /// A state machine already maps this (event, source state) pair.
    #[error("transition on `{event}` out of state `{from_state}` is already defined")]
    DuplicateTransition { event: String, from_state: String },

    /// A state machine already holds a state with this name.
    #[error("state `{0}` is already defined")]
    DuplicateState(String),

    /// `latest()` was called on a channel that has never received a value.
    #[error("channel `{0}` has no values")]
    EmptyChannel(String),

    #[error("unknown channel `{0}`")]
    UnknownChannel(String),

    #[error("unknown state `{0}`")]
    UnknownState(String),

    /// A period was zero or not a multiple of the configured resolution.
    #[error("invalid period {period:?} for process `{process}`")]
    InvalidPeriod { process: String, period: Duration },

    /// A watch handler was typed for a different process than its owner.
    #[error("watch on `{event}` registered by `{process}` targets another process type")]
    WatcherMismatch { process: String, event: String },

    /// Event cascades within one tick exceeded the configured bound.
    #[error("dispatched more than {limit} events in the tick at {at:?}")]
    DispatchLimit { limit: usize, at: Duration },

    /// A process hook failed. The run is aborted.
    #[error("process `{process}` failed during {phase}")]
    ProcessFault {
        process: String,
        phase: Phase,
        #[source]
        source: Box<KernelError>,
    },

    /// Failure raised by application code inside a hook.
    #[error("{0}")]
    Application(String),
}

impl KernelError {
    /// Wrap an error raised by a process hook.
    pub fn fault(process: impl Into<String>, phase: Phase, source: KernelError) -> Self {
        KernelError::ProcessFault {
            process: process.into(),
            phase,
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through any `ProcessFault` wrappers.
    pub fn root_cause(&self) -> &KernelError {
        match self {
            KernelError::ProcessFault { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
