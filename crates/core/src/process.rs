//! The `Process` trait and its lifecycle.

use crate::{Context, InitContext, KernelError};
use std::any::Any;

/// Lifecycle of a scheduled process.
///
/// ```text
/// Created → Initialized → Started → (update)* → Stopped
///                            ▲                     │
///                            └──── restart ────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Created,
    Initialized,
    Started,
    Stopped,
}

/// Type-erased access to a concrete process or state.
///
/// Implemented for every `'static` type. The kernel uses it to hand watch
/// handlers the concrete type they were registered for.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A schedulable unit of behavior.
///
/// The manager drives every process through four hooks, all synchronous:
///
/// | Hook | Called | Purpose |
/// |------|--------|---------|
/// | `init` | once, before the first run | register watchers, static configuration |
/// | `start` | at the start of every run | reset all dynamic state |
/// | `update` | every tick the process is due | channel I/O, event emission |
/// | `stop` | at the end of every run | final cleanup |
///
/// `start` must leave the process in the same state every time it is called,
/// so that restarting a simulation does not leak values from the previous run.
///
/// # Example
///
/// ```
/// use tickwork_core::{Context, Event, InitContext, KernelError, Process};
///
/// struct Driver {
///     desired_speed: f64,
/// }
///
/// impl Process for Driver {
///     fn name(&self) -> &str {
///         "Driver"
///     }
///
///     fn start(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
///         self.desired_speed = 60.0;
///         Ok(())
///     }
///
///     fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
///         self.desired_speed = if self.desired_speed == 50.0 { 60.0 } else { 50.0 };
///         ctx.emit(Event::with_value("desired speed", self.desired_speed));
///         Ok(())
///     }
/// }
/// ```
pub trait Process: AsAny {
    /// Unique name within a simulation.
    fn name(&self) -> &str;

    fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), KernelError> {
        Ok(())
    }

    fn start(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError>;

    fn stop(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
        Ok(())
    }
}
