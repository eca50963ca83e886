//! Scoped access to channels, events and the clock from inside process hooks.
//!
//! Processes never hold references to channels or the bus. Every hook gets a
//! context borrowed from the manager for the duration of the call, which keeps
//! all shared state owned (and resettable) by the manager.

use crate::bus::{EventBus, Handler, Watcher};
use crate::{Channel, ChannelRegistry, Event, KernelError, Process, ProcessId, StopSignal};
use std::any::{Any, TypeId};
use std::time::Duration;

/// Context passed to `start`, `update`, `stop`, watch handlers and state hooks.
pub struct Context<'a> {
    process: &'a str,
    now: Duration,
    delta: Duration,
    channels: &'a mut ChannelRegistry,
    outbox: &'a mut Vec<Event>,
    stop: &'a StopSignal,
}

impl<'a> Context<'a> {
    /// Build a context for one hook invocation.
    ///
    /// Emitted events are appended to `outbox`; the caller decides when they
    /// reach the bus.
    pub fn new(
        process: &'a str,
        now: Duration,
        delta: Duration,
        channels: &'a mut ChannelRegistry,
        outbox: &'a mut Vec<Event>,
        stop: &'a StopSignal,
    ) -> Self {
        Self {
            process,
            now,
            delta,
            channels,
            outbox,
            stop,
        }
    }

    /// Name of the process this hook runs for.
    pub fn name(&self) -> &str {
        self.process
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn now_ms(&self) -> u64 {
        self.now.as_millis() as u64
    }

    /// Update period of the calling process.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Emit an event. It is stamped with the current time and delivered at
    /// the end of the tick.
    pub fn emit(&mut self, event: Event) {
        self.outbox.push(event.stamped(self.now));
    }

    /// Writable handle to a registered channel.
    pub fn channel(&mut self, name: &str) -> Result<ChannelHandle<'_>, KernelError> {
        let now = self.now;
        let channel = self.channels.get_mut(name)?;
        Ok(ChannelHandle { channel, now })
    }

    /// Read-only view of a registered channel.
    pub fn read_channel(&self, name: &str) -> Result<&Channel, KernelError> {
        self.channels.get(name)
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains(name)
    }

    /// Ask the manager to end the run at the next tick boundary.
    pub fn request_stop(&self) {
        self.stop.request();
    }
}

/// A channel borrowed through a [`Context`]. Sends are stamped with the
/// context's current time.
pub struct ChannelHandle<'c> {
    channel: &'c mut Channel,
    now: Duration,
}

impl ChannelHandle<'_> {
    pub fn send(&mut self, value: f64) {
        self.channel.send_at(value, self.now);
    }

    /// Most recent value (peek).
    pub fn latest(&self) -> Result<f64, KernelError> {
        self.channel.latest()
    }

    pub fn nonempty(&self) -> bool {
        self.channel.nonempty()
    }

    pub fn name(&self) -> &str {
        self.channel.name()
    }
}

/// Context passed to `Process::init`.
///
/// Watch registration is only possible through this type, so watchers can
/// only be added while a process initializes.
pub struct InitContext<'a> {
    owner: ProcessId,
    owner_name: &'a str,
    owner_type: TypeId,
    bus: &'a mut EventBus,
    channels: &'a ChannelRegistry,
}

impl<'a> InitContext<'a> {
    pub fn new(
        owner: ProcessId,
        owner_name: &'a str,
        owner_type: TypeId,
        bus: &'a mut EventBus,
        channels: &'a ChannelRegistry,
    ) -> Self {
        Self {
            owner,
            owner_name,
            owner_type,
            bus,
            channels,
        }
    }

    pub fn name(&self) -> &str {
        self.owner_name
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains(name)
    }

    /// Register `handler` for events named `event`.
    ///
    /// The handler receives the owning process as its concrete type `P`,
    /// which must be the type of the process being initialized.
    ///
    /// ```
    /// # use tickwork_core::{Context, Event, InitContext, KernelError, Process};
    /// struct CruiseControl {
    ///     desired_speed: f64,
    /// }
    ///
    /// impl Process for CruiseControl {
    ///     fn name(&self) -> &str {
    ///         "Control"
    ///     }
    ///
    ///     fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), KernelError> {
    ///         ctx.watch("desired speed", |this: &mut Self, event: &Event, _ctx: &mut Context<'_>| {
    ///             this.desired_speed = event.value();
    ///             Ok(())
    ///         })
    ///     }
    ///
    ///     fn update(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
    ///         Ok(())
    ///     }
    /// }
    /// ```
    pub fn watch<P, F>(&mut self, event: impl Into<String>, mut handler: F) -> Result<(), KernelError>
    where
        P: Process,
        F: FnMut(&mut P, &Event, &mut Context<'_>) -> Result<(), KernelError> + 'static,
    {
        let event = event.into();
        if TypeId::of::<P>() != self.owner_type {
            return Err(KernelError::WatcherMismatch {
                process: self.owner_name.to_string(),
                event,
            });
        }

        let owner_name = self.owner_name.to_string();
        let handler_event = event.clone();
        let erased: Handler = Box::new(
            move |target: &mut dyn Any, event: &Event, ctx: &mut Context<'_>| {
                match target.downcast_mut::<P>() {
                    Some(process) => handler(process, event, ctx),
                    None => Err(KernelError::WatcherMismatch {
                        process: owner_name.clone(),
                        event: handler_event.clone(),
                    }),
                }
            },
        );

        self.bus.register(Watcher::new(event, self.owner, erased));
        Ok(())
    }
}
