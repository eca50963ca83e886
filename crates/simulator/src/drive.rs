//! Ignition, refuelling and breakdown modes of the car.

use tickwork_core::{Context, Event, KernelError, State, StateMachine};
use tracing::info;

pub const CHECK: &str = "Check";
pub const ON: &str = "On";
pub const DRIVE: &str = "Drive";
pub const FIND_STATION: &str = "Find Station";
pub const FILL_GAS: &str = "Fill Gas";
pub const OFF: &str = "Off";
pub const FIX: &str = "Fix";

/// A mode of the car. Counts how often it was entered in the current run.
#[derive(Debug)]
pub struct DriveState {
    name: &'static str,
    visits: u32,
}

impl DriveState {
    fn new(name: &'static str) -> Self {
        Self { name, visits: 0 }
    }

    pub fn visits(&self) -> u32 {
        self.visits
    }
}

impl State for DriveState {
    fn name(&self) -> &str {
        self.name
    }

    fn reset(&mut self) {
        self.visits = 0;
    }

    fn entry(&mut self, event: &Event, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        self.visits += 1;
        info!(state = self.name, trigger = event.name(), now_ms = ctx.now_ms(), "Drive mode");
        Ok(())
    }
}

/// The drive mode machine, named `"Drive"`:
///
/// ```text
/// Check ──key in──▶ On ──start drive──▶ Drive
/// Drive ──fuel low──▶ Find Station ──find gas station──▶ Fill Gas ──fuel full──▶ Check
/// Drive ──issue──▶ Off ──find issue──▶ Fix ──issue fixed──▶ Check
/// ```
pub fn drive_machine() -> Result<StateMachine, KernelError> {
    let mut machine = StateMachine::new("Drive");
    for name in [CHECK, ON, DRIVE, FIND_STATION, FILL_GAS, OFF, FIX] {
        machine.add_state(DriveState::new(name))?;
    }
    machine.set_initial(CHECK)?;

    machine.add_transition("key in", CHECK, ON)?;
    machine.add_transition("start drive", ON, DRIVE)?;
    machine.add_transition("fuel low", DRIVE, FIND_STATION)?;
    machine.add_transition("find gas station", FIND_STATION, FILL_GAS)?;
    machine.add_transition("fuel full", FILL_GAS, CHECK)?;
    machine.add_transition("issue", DRIVE, OFF)?;
    machine.add_transition("find issue", OFF, FIX)?;
    machine.add_transition("issue fixed", FIX, CHECK)?;
    Ok(machine)
}
