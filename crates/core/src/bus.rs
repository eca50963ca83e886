//! Publish/subscribe event bus with end-of-tick delivery.
//!
//! # Delivery model
//!
//! Events emitted while processes update are queued, not delivered. Once
//! every due process has returned from `update`, the manager calls
//! [`EventBus::dispatch`], which delivers queued events in emission order.
//! For each event, watchers run in the registration order of their owning
//! process, then in the order the process registered them.
//!
//! Events emitted by watch handlers are appended to the same queue and are
//! delivered within the same tick, after everything emitted before them. A
//! per-tick limit guards against handlers that keep emitting forever.
//!
//! Events nobody watches are dropped silently.

use crate::{
    ChannelRegistry, Context, Event, KernelError, Lifecycle, Phase, ProcessId, ProcessTable,
    StopSignal,
};
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::trace;

/// Type-erased watch handler. Receives the owning process as `dyn Any`.
pub(crate) type Handler =
    Box<dyn FnMut(&mut dyn Any, &Event, &mut Context<'_>) -> Result<(), KernelError>>;

/// A watch registration: `{event, owner, handler}`.
pub struct Watcher {
    event: String,
    owner: ProcessId,
    handler: Handler,
}

impl Watcher {
    pub(crate) fn new(event: String, owner: ProcessId, handler: Handler) -> Self {
        Self {
            event,
            owner,
            handler,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn owner(&self) -> ProcessId {
        self.owner
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("event", &self.event)
            .field("owner", &self.owner)
            .finish()
    }
}

/// Outcome of one dispatch pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Events taken off the queue.
    pub events: u64,
    /// Handler invocations.
    pub deliveries: u64,
    /// Events with no watcher.
    pub unmatched: u64,
}

/// Watcher registry plus the queue of events awaiting delivery.
#[derive(Debug, Default)]
pub struct EventBus {
    watchers: HashMap<String, Vec<Watcher>>,
    queue: VecDeque<Event>,
    watcher_count: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, watcher: Watcher) {
        trace!(event = %watcher.event, owner = watcher.owner, "Watcher registered");
        self.watchers
            .entry(watcher.event.clone())
            .or_default()
            .push(watcher);
        self.watcher_count += 1;
    }

    /// Total registered watchers.
    pub fn watcher_count(&self) -> usize {
        self.watcher_count
    }

    /// Watchers registered for one event name.
    pub fn watchers_for(&self, event: &str) -> usize {
        self.watchers.get(event).map_or(0, Vec::len)
    }

    /// Queue events for the next dispatch, preserving their order.
    pub fn publish(&mut self, events: impl IntoIterator<Item = Event>) {
        self.queue.extend(events);
    }

    /// Events waiting for dispatch.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drop all undelivered events.
    pub fn clear_pending(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }

    /// Deliver every queued event, including events emitted by the handlers
    /// themselves, stopping with [`KernelError::DispatchLimit`] once more than
    /// `limit` events have been taken off the queue.
    ///
    /// Watchers whose owner is not started are skipped.
    pub fn dispatch(
        &mut self,
        processes: &mut ProcessTable,
        channels: &mut ChannelRegistry,
        stop: &StopSignal,
        now: Duration,
        limit: usize,
    ) -> Result<DispatchReport, KernelError> {
        let mut report = DispatchReport::default();

        while let Some(event) = self.queue.pop_front() {
            if report.events >= limit as u64 {
                return Err(KernelError::DispatchLimit { limit, at: now });
            }
            report.events += 1;

            let Some(watchers) = self.watchers.get_mut(event.name()) else {
                trace!(event = %event, "No watchers, dropping event");
                report.unmatched += 1;
                continue;
            };

            let mut outbox = Vec::new();
            for watcher in watchers.iter_mut() {
                let Some(entry) = processes.entry_mut(watcher.owner) else {
                    continue;
                };
                if entry.lifecycle() != Lifecycle::Started {
                    continue;
                }

                let (target, name, period) = entry.split_mut();
                let mut ctx = Context::new(name, now, period, channels, &mut outbox, stop);
                (watcher.handler)(target, &event, &mut ctx)
                    .map_err(|e| KernelError::fault(name, Phase::Watch, e))?;
                report.deliveries += 1;
            }
            self.queue.extend(outbox);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InitContext, Process};

    /// Records every event it watches; re-emits "ping" as "pong".
    struct Listener {
        name: &'static str,
        seen: Vec<String>,
    }

    impl Listener {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                seen: Vec::new(),
            }
        }
    }

    impl Process for Listener {
        fn name(&self) -> &str {
            self.name
        }

        fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), KernelError> {
            for event in ["e1", "e2", "pong"] {
                ctx.watch(event, |this: &mut Self, e: &Event, _ctx: &mut Context<'_>| {
                    this.seen.push(e.name().to_string());
                    Ok(())
                })?;
            }
            ctx.watch("ping", |this: &mut Self, e: &Event, ctx: &mut Context<'_>| {
                this.seen.push(format!("{}:{}", e.name(), ctx.name()));
                ctx.emit(Event::new("pong"));
                Ok(())
            })
        }

        fn update(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
            Ok(())
        }
    }

    /// Watches "loop" and emits it again, forever.
    struct Echo;

    impl Process for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), KernelError> {
            ctx.watch("loop", |_: &mut Self, e: &Event, ctx: &mut Context<'_>| {
                ctx.emit(e.clone());
                Ok(())
            })
        }

        fn update(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
            Ok(())
        }
    }

    /// Tries to register a handler typed for another process.
    struct Impostor;

    impl Process for Impostor {
        fn name(&self) -> &str {
            "impostor"
        }

        fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), KernelError> {
            ctx.watch("e1", |_: &mut Echo, _: &Event, _: &mut Context<'_>| Ok(()))
        }

        fn update(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
            Ok(())
        }
    }

    struct World {
        table: ProcessTable,
        bus: EventBus,
        channels: ChannelRegistry,
        stop: StopSignal,
    }

    fn world(processes: Vec<Box<dyn Process>>) -> World {
        let mut table = ProcessTable::new();
        for process in processes {
            table.insert(process, Duration::from_millis(10)).unwrap();
        }
        let mut bus = EventBus::new();
        let mut channels = ChannelRegistry::new();
        let stop = StopSignal::new();
        table.init_all(&mut bus, &channels).unwrap();
        table
            .start_all(Duration::ZERO, &mut channels, &stop, &mut Vec::new())
            .unwrap();
        World {
            table,
            bus,
            channels,
            stop,
        }
    }

    impl World {
        fn dispatch(&mut self, limit: usize) -> Result<DispatchReport, KernelError> {
            self.bus.dispatch(
                &mut self.table,
                &mut self.channels,
                &self.stop,
                Duration::from_millis(10),
                limit,
            )
        }

        fn seen(&self, name: &str) -> Vec<String> {
            self.table.get::<Listener>(name).unwrap().seen.clone()
        }
    }

    #[test]
    fn test_emission_order_preserved() {
        let mut world = world(vec![Box::new(Listener::new("b"))]);
        world.bus.publish([Event::new("e1"), Event::new("e2")]);
        let report = world.dispatch(100).unwrap();

        assert_eq!(world.seen("b"), vec!["e1", "e2"]);
        assert_eq!(report.events, 2);
        assert_eq!(report.deliveries, 2);
    }

    #[test]
    fn test_watchers_follow_registration_order() {
        let mut world = world(vec![
            Box::new(Listener::new("first")),
            Box::new(Listener::new("second")),
        ]);
        assert_eq!(world.bus.watchers_for("ping"), 2);

        world.bus.publish([Event::new("ping")]);
        world.dispatch(100).unwrap();

        // Both pongs are delivered after both pings, to both listeners.
        assert_eq!(world.seen("first"), vec!["ping:first", "pong", "pong"]);
        assert_eq!(world.seen("second"), vec!["ping:second", "pong", "pong"]);
    }

    #[test]
    fn test_unmatched_events_are_dropped() {
        let mut world = world(vec![Box::new(Listener::new("b"))]);
        world.bus.publish([Event::new("nobody"), Event::new("e1")]);
        let report = world.dispatch(100).unwrap();

        assert_eq!(report.unmatched, 1);
        assert_eq!(world.seen("b"), vec!["e1"]);
        assert_eq!(world.bus.pending(), 0);
    }

    #[test]
    fn test_cascade_limit() {
        let mut world = world(vec![Box::new(Echo)]);
        world.bus.publish([Event::new("loop")]);
        let err = world.dispatch(50).unwrap_err();
        assert!(matches!(err, KernelError::DispatchLimit { limit: 50, .. }));
    }

    #[test]
    fn test_watch_type_mismatch_rejected() {
        let mut table = ProcessTable::new();
        table
            .insert(Box::new(Impostor), Duration::from_millis(10))
            .unwrap();
        let err = table
            .init_all(&mut EventBus::new(), &ChannelRegistry::new())
            .unwrap_err();
        assert!(matches!(
            err,
            KernelError::ProcessFault { phase: Phase::Init, .. }
        ));
        assert!(matches!(
            err.root_cause(),
            KernelError::WatcherMismatch { .. }
        ));
    }
}
