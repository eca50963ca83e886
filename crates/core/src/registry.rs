//! Registry of scheduled processes and the lifecycle calls made on them.

use crate::{
    ChannelRegistry, Context, Event, EventBus, InitContext, KernelError, Lifecycle, Phase,
    Process, StopSignal,
};
use std::any::Any;
use std::collections::HashMap;
use std::time::Duration;
use tracing::trace;

/// Index of a process in registration order.
pub type ProcessId = usize;

/// A scheduled process with its period and lifecycle bookkeeping.
pub struct ProcessEntry {
    name: String,
    process: Box<dyn Process>,
    period: Duration,
    lifecycle: Lifecycle,
    /// Updates performed in the current (or last) run.
    updates: u64,
}

impl ProcessEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Whether the process is due at `now`: its period divides the time
    /// elapsed since the run started.
    pub fn is_due(&self, now: Duration) -> bool {
        now.as_nanos() % self.period.as_nanos() == 0
    }

    pub(crate) fn split_mut(&mut self) -> (&mut dyn Any, &str, Duration) {
        ((*self.process).as_any_mut(), &self.name, self.period)
    }

    fn expect_lifecycle(&self, allowed: &[Lifecycle], action: &str) -> Result<(), KernelError> {
        if allowed.contains(&self.lifecycle) {
            Ok(())
        } else {
            Err(KernelError::Lifecycle(format!(
                "cannot {action} process `{}` in state {:?}",
                self.name, self.lifecycle
            )))
        }
    }
}

impl std::fmt::Debug for ProcessEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessEntry")
            .field("name", &self.name)
            .field("period", &self.period)
            .field("lifecycle", &self.lifecycle)
            .field("updates", &self.updates)
            .finish()
    }
}

/// Processes in registration order, addressable by name.
#[derive(Debug, Default)]
pub struct ProcessTable {
    entries: Vec<ProcessEntry>,
    by_name: HashMap<String, ProcessId>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a process. Names must be unique; `period` must be non-zero.
    pub fn insert(
        &mut self,
        process: Box<dyn Process>,
        period: Duration,
    ) -> Result<ProcessId, KernelError> {
        let name = process.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(KernelError::DuplicateProcess(name));
        }
        if period.is_zero() {
            return Err(KernelError::InvalidPeriod {
                process: name,
                period,
            });
        }

        let id = self.entries.len();
        self.by_name.insert(name.clone(), id);
        self.entries.push(ProcessEntry {
            name,
            process,
            period,
            lifecycle: Lifecycle::Created,
            updates: 0,
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<ProcessId> {
        self.by_name.get(name).copied()
    }

    pub fn entry(&self, id: ProcessId) -> Option<&ProcessEntry> {
        self.entries.get(id)
    }

    pub(crate) fn entry_mut(&mut self, id: ProcessId) -> Option<&mut ProcessEntry> {
        self.entries.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessEntry> + '_ {
        self.entries.iter()
    }

    /// The process named `name`, if it exists and is a `P`.
    pub fn get<P: Process>(&self, name: &str) -> Option<&P> {
        let id = self.find(name)?;
        (*self.entries[id].process).as_any().downcast_ref::<P>()
    }

    pub fn get_mut<P: Process>(&mut self, name: &str) -> Option<&mut P> {
        let id = self.find(name)?;
        (*self.entries[id].process).as_any_mut().downcast_mut::<P>()
    }

    /// Call `init` on every process in registration order.
    pub fn init_all(
        &mut self,
        bus: &mut EventBus,
        channels: &ChannelRegistry,
    ) -> Result<(), KernelError> {
        for (id, entry) in self.entries.iter_mut().enumerate() {
            entry.expect_lifecycle(&[Lifecycle::Created], "initialize")?;

            let owner_type = (*entry.process).as_any().type_id();
            let mut ctx = InitContext::new(id, &entry.name, owner_type, bus, channels);
            entry
                .process
                .init(&mut ctx)
                .map_err(|e| KernelError::fault(&entry.name, Phase::Init, e))?;
            entry.lifecycle = Lifecycle::Initialized;
            trace!(process = %entry.name, "Process initialized");
        }
        Ok(())
    }

    /// Call `start` on every process in registration order and reset their
    /// update counters.
    pub fn start_all(
        &mut self,
        now: Duration,
        channels: &mut ChannelRegistry,
        stop: &StopSignal,
        outbox: &mut Vec<Event>,
    ) -> Result<(), KernelError> {
        for entry in self.entries.iter_mut() {
            entry.expect_lifecycle(&[Lifecycle::Initialized, Lifecycle::Stopped], "start")?;

            let mut ctx = Context::new(&entry.name, now, entry.period, channels, outbox, stop);
            entry
                .process
                .start(&mut ctx)
                .map_err(|e| KernelError::fault(&entry.name, Phase::Start, e))?;
            entry.lifecycle = Lifecycle::Started;
            entry.updates = 0;
        }
        Ok(())
    }

    /// Call `update` on one started process.
    pub fn update(
        &mut self,
        id: ProcessId,
        now: Duration,
        channels: &mut ChannelRegistry,
        stop: &StopSignal,
        outbox: &mut Vec<Event>,
    ) -> Result<(), KernelError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| KernelError::Lifecycle(format!("no process with id {id}")))?;
        entry.expect_lifecycle(&[Lifecycle::Started], "update")?;

        let mut ctx = Context::new(&entry.name, now, entry.period, channels, outbox, stop);
        entry
            .process
            .update(&mut ctx)
            .map_err(|e| KernelError::fault(&entry.name, Phase::Update, e))?;
        entry.updates += 1;
        Ok(())
    }

    /// Call `stop` on every started process in registration order.
    pub fn stop_all(
        &mut self,
        now: Duration,
        channels: &mut ChannelRegistry,
        stop: &StopSignal,
        outbox: &mut Vec<Event>,
    ) -> Result<(), KernelError> {
        for entry in self.entries.iter_mut() {
            if entry.lifecycle != Lifecycle::Started {
                continue;
            }
            let mut ctx = Context::new(&entry.name, now, entry.period, channels, outbox, stop);
            entry
                .process
                .stop(&mut ctx)
                .map_err(|e| KernelError::fault(&entry.name, Phase::Stop, e))?;
            entry.lifecycle = Lifecycle::Stopped;
        }
        Ok(())
    }
}
