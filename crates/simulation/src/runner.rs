//! Deterministic lock-step simulation manager.
//!
//! The manager owns every process, channel and the event bus, and advances a
//! virtual clock in fixed base ticks. Within a tick, due processes update in
//! registration order, then the tick's events are dispatched. Given the same
//! registrations, every run produces identical results.

use crate::ManagerConfig;
use tickwork_core::{
    Channel, ChannelRegistry, EventBus, KernelError, Lifecycle, Process, ProcessTable, StopSignal,
};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Where the manager is in its own lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerPhase {
    /// Accepting `schedule` and `add_channel`.
    Registering,
    /// Initialized and started, ready to run.
    Ready,
    /// A run completed; the next `run` restarts the simulation.
    Finished,
    /// A process hook failed; the manager cannot run again.
    Faulted,
}

/// Statistics collected across runs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationStats {
    /// Completed runs.
    pub runs: u64,
    /// Ticks executed.
    pub ticks: u64,
    /// `update` calls made.
    pub updates: u64,
    /// Events taken off the bus queue.
    pub events_dispatched: u64,
    /// Watch handler invocations.
    pub deliveries: u64,
    /// Events dispatched with no watcher.
    pub events_unmatched: u64,
    /// Events emitted from `stop` hooks or left pending at a restart.
    pub events_discarded: u64,
}

impl SimulationStats {
    /// Fraction of dispatched events that reached at least one watcher.
    pub fn match_rate(&self) -> f64 {
        if self.events_dispatched == 0 {
            1.0
        } else {
            (self.events_dispatched - self.events_unmatched) as f64 / self.events_dispatched as f64
        }
    }
}

/// Scheduler and owner of a simulation.
///
/// ```
/// use std::time::Duration;
/// use tickwork_core::{Channel, Context, KernelError, Process};
/// use tickwork_simulation::Manager;
///
/// struct Counter(u32);
///
/// impl Process for Counter {
///     fn name(&self) -> &str {
///         "Counter"
///     }
///
///     fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
///         self.0 += 1;
///         ctx.channel("Count")?.send(self.0 as f64);
///         Ok(())
///     }
/// }
///
/// # fn main() -> Result<(), KernelError> {
/// let mut manager = Manager::new();
/// manager
///     .schedule(Counter(0), Duration::from_millis(100))?
///     .add_channel(Channel::new("Count"))?
///     .init()?
///     .run(Duration::from_secs(1))?;
///
/// assert_eq!(manager.channel("Count")?.latest()?, 10.0);
/// # Ok(())
/// # }
/// ```
pub struct Manager {
    config: ManagerConfig,
    processes: ProcessTable,
    channels: ChannelRegistry,
    bus: EventBus,
    stop: StopSignal,
    now: Duration,
    base_tick: Option<Duration>,
    phase: ManagerPhase,
    stats: SimulationStats,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        Self {
            config,
            processes: ProcessTable::new(),
            channels: ChannelRegistry::new(),
            bus: EventBus::new(),
            stop: StopSignal::new(),
            now: Duration::ZERO,
            base_tick: None,
            phase: ManagerPhase::Registering,
            stats: SimulationStats::default(),
        }
    }

    // ─── Registration ───

    /// Register a process updated every `period`.
    ///
    /// Registration order is the update order within a tick.
    pub fn schedule(
        &mut self,
        process: impl Process,
        period: Duration,
    ) -> Result<&mut Self, KernelError> {
        self.expect_registering("schedule a process")?;

        if let Some(resolution) = self.config.resolution {
            if period.as_nanos() % resolution.as_nanos() != 0 {
                return Err(KernelError::InvalidPeriod {
                    process: process.name().to_string(),
                    period,
                });
            }
        }

        let name = process.name().to_string();
        let id = self.processes.insert(Box::new(process), period)?;
        debug!(process = %name, ?period, id, "Process scheduled");
        Ok(self)
    }

    /// Register a channel.
    pub fn add_channel(&mut self, channel: Channel) -> Result<&mut Self, KernelError> {
        self.expect_registering("add a channel")?;
        debug!(channel = channel.name(), "Channel added");
        self.channels.insert(channel)?;
        Ok(self)
    }

    /// Call `init` then `start` on every process, in registration order.
    ///
    /// Events emitted from `start` are delivered at time zero once every
    /// process has started.
    pub fn init(&mut self) -> Result<&mut Self, KernelError> {
        self.expect_registering("initialize")?;

        self.base_tick = self.compute_base_tick();
        let result = self
            .processes
            .init_all(&mut self.bus, &self.channels)
            .and_then(|_| self.begin_run());
        self.guard(result)?;

        self.phase = ManagerPhase::Ready;
        info!(
            processes = self.processes.len(),
            channels = self.channels.len(),
            watchers = self.bus.watcher_count(),
            base_tick = ?self.base_tick,
            "Simulation initialized"
        );
        Ok(self)
    }

    // ─── Execution ───

    /// Advance virtual time from zero to `duration`, then stop every process.
    ///
    /// A process with period `P` is updated `floor(duration / P)` times,
    /// unless the run is stopped early. Calling `run` again after it returns
    /// restarts the simulation from time zero.
    pub fn run(&mut self, duration: Duration) -> Result<&mut Self, KernelError> {
        match self.phase {
            ManagerPhase::Registering => {
                return Err(KernelError::Lifecycle(
                    "run called before init".to_string(),
                ))
            }
            ManagerPhase::Faulted => {
                return Err(KernelError::Lifecycle(
                    "run called after a process fault".to_string(),
                ))
            }
            ManagerPhase::Finished => {
                let result = self.restart();
                self.guard(result)?;
            }
            ManagerPhase::Ready => {}
        }

        info!(
            duration_secs = duration.as_secs_f64(),
            base_tick = ?self.base_tick,
            "Starting run"
        );

        let result = self.run_ticks(duration).and_then(|_| self.finish());
        self.guard(result)?;

        info!(
            final_time = ?self.now,
            ticks = self.stats.ticks,
            updates = self.stats.updates,
            events = self.stats.events_dispatched,
            "Run complete"
        );
        Ok(self)
    }

    fn run_ticks(&mut self, duration: Duration) -> Result<(), KernelError> {
        let Some(base) = self.base_tick else {
            self.now = duration;
            return Ok(());
        };

        let ticks = duration.as_nanos() / base.as_nanos();
        for k in 1..=ticks {
            if self.stop.is_requested() {
                info!(now = ?self.now, "Stop requested, ending run early");
                break;
            }
            self.now = Duration::from_nanos((base.as_nanos() * k) as u64);
            self.step()?;
        }
        Ok(())
    }

    /// One tick: update due processes in registration order, then dispatch.
    fn step(&mut self) -> Result<(), KernelError> {
        let mut outbox = Vec::new();
        let mut updated = 0u64;

        for id in 0..self.processes.len() {
            let due = self
                .processes
                .entry(id)
                .is_some_and(|entry| entry.is_due(self.now));
            if !due {
                continue;
            }
            self.processes
                .update(id, self.now, &mut self.channels, &self.stop, &mut outbox)?;
            updated += 1;
        }

        trace!(
            now = ?self.now,
            updated,
            emitted = outbox.len(),
            "Tick updates complete"
        );

        self.stats.ticks += 1;
        self.stats.updates += updated;
        self.bus.publish(outbox);
        self.dispatch()
    }

    fn dispatch(&mut self) -> Result<(), KernelError> {
        let report = self.bus.dispatch(
            &mut self.processes,
            &mut self.channels,
            &self.stop,
            self.now,
            self.config.max_dispatch_per_tick,
        )?;
        self.stats.events_dispatched += report.events;
        self.stats.deliveries += report.deliveries;
        self.stats.events_unmatched += report.unmatched;
        Ok(())
    }

    /// Start every process at time zero and deliver the events they emit.
    fn begin_run(&mut self) -> Result<(), KernelError> {
        self.now = Duration::ZERO;
        let mut outbox = Vec::new();
        self.processes
            .start_all(self.now, &mut self.channels, &self.stop, &mut outbox)?;
        self.bus.publish(outbox);
        self.dispatch()
    }

    /// Reset shared state so a new run starts from scratch.
    fn restart(&mut self) -> Result<(), KernelError> {
        self.channels.reset();
        let dropped = self.bus.clear_pending();
        self.stats.events_discarded += dropped as u64;
        debug!(dropped, "Restarting simulation");
        self.begin_run()?;
        self.phase = ManagerPhase::Ready;
        Ok(())
    }

    /// Stop every process. Events emitted while stopping are discarded.
    fn finish(&mut self) -> Result<(), KernelError> {
        let mut outbox = Vec::new();
        self.processes
            .stop_all(self.now, &mut self.channels, &self.stop, &mut outbox)?;
        if !outbox.is_empty() {
            warn!(count = outbox.len(), "Discarding events emitted while stopping");
            self.stats.events_discarded += outbox.len() as u64;
        }
        self.stop.reset();
        self.stats.runs += 1;
        self.phase = ManagerPhase::Finished;
        Ok(())
    }

    /// Mark the manager faulted if `result` is an error.
    fn guard(&mut self, result: Result<(), KernelError>) -> Result<(), KernelError> {
        if let Err(e) = &result {
            warn!(error = %e, cause = %e.root_cause(), now = ?self.now, "Simulation aborted");
            self.phase = ManagerPhase::Faulted;
        }
        result
    }

    fn compute_base_tick(&self) -> Option<Duration> {
        if let Some(resolution) = self.config.resolution {
            return Some(resolution);
        }
        self.processes
            .iter()
            .map(|entry| entry.period().as_nanos())
            .reduce(gcd)
            .map(|nanos| Duration::from_nanos(nanos as u64))
    }

    fn expect_registering(&self, action: &str) -> Result<(), KernelError> {
        if self.phase == ManagerPhase::Registering {
            Ok(())
        } else {
            Err(KernelError::Lifecycle(format!(
                "cannot {action} after init"
            )))
        }
    }

    // ─── Introspection ───

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn phase(&self) -> ManagerPhase {
        self.phase
    }

    /// Base tick in effect, known once `init` has run.
    pub fn base_tick(&self) -> Option<Duration> {
        self.base_tick
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// A handle that ends the current run at the next tick boundary.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn channel(&self, name: &str) -> Result<&Channel, KernelError> {
        self.channels.get(name)
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The process named `name`, if it exists and is a `P`.
    pub fn process<P: Process>(&self, name: &str) -> Option<&P> {
        self.processes.get::<P>(name)
    }

    pub fn process_mut<P: Process>(&mut self, name: &str) -> Option<&mut P> {
        self.processes.get_mut::<P>(name)
    }

    pub fn process_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.processes.iter().map(|entry| entry.name())
    }

    pub fn lifecycle(&self, name: &str) -> Option<Lifecycle> {
        let id = self.processes.find(name)?;
        self.processes.entry(id).map(|entry| entry.lifecycle())
    }

    /// Updates the process received in the current (or last) run.
    pub fn update_count(&self, name: &str) -> Option<u64> {
        let id = self.processes.find(name)?;
        self.processes.entry(id).map(|entry| entry.updates())
    }
}

fn gcd(a: u128, b: u128) -> u128 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}
