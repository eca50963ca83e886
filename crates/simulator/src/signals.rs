//! Turn signals: a state machine for the stalk and a process for the lamps.
//!
//! ```text
//!            left button            right button
//!   Left ◀────────────── Off ──────────────▶ Right
//!     │  ◀──────── right/left button ──────▶  │
//!     │                  │ emergency button   │
//!     └──────────▶   Emergency   ◀────────────┘
//!   every lit state ──signal button off──▶ Off
//! ```
//!
//! Entering a lit state announces it (`"left on"`, `"right on"`,
//! `"emergency on"`) followed by `"light on"` carrying the button event's
//! value as lamp power. Entering `Off` announces `"signal off"`.

use tickwork_core::{
    Context, Event, InitContext, KernelError, Process, State, StateMachine, START_EVENT,
};

pub const OFF: &str = "Off";
pub const LEFT: &str = "Left";
pub const RIGHT: &str = "Right";
pub const EMERGENCY: &str = "Emergency";

/// A position of the signal stalk.
#[derive(Debug)]
pub struct SignalState {
    name: &'static str,
    announce: &'static str,
    lit: bool,
    entries: u32,
}

impl SignalState {
    fn lit(name: &'static str, announce: &'static str) -> Self {
        Self {
            name,
            announce,
            lit: true,
            entries: 0,
        }
    }

    fn off() -> Self {
        Self {
            name: OFF,
            announce: "signal off",
            lit: false,
            entries: 0,
        }
    }

    /// Times this state has been entered in the current run.
    pub fn entries(&self) -> u32 {
        self.entries
    }
}

impl State for SignalState {
    fn name(&self) -> &str {
        self.name
    }

    fn reset(&mut self) {
        self.entries = 0;
    }

    fn entry(&mut self, event: &Event, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        if event.name() == START_EVENT {
            return Ok(());
        }
        self.entries += 1;
        ctx.emit(Event::new(self.announce));
        if self.lit {
            ctx.emit(Event::with_value("light on", event.value()));
        }
        Ok(())
    }
}

/// The signal stalk, named `"TurnSignal"`. Starts in [`OFF`].
pub fn turn_signal() -> Result<StateMachine, KernelError> {
    let mut machine = StateMachine::new("TurnSignal");
    machine.add_state(SignalState::off())?;
    machine.add_state(SignalState::lit(LEFT, "left on"))?;
    machine.add_state(SignalState::lit(RIGHT, "right on"))?;
    machine.add_state(SignalState::lit(EMERGENCY, "emergency on"))?;
    machine.set_initial(OFF)?;

    machine.add_transition("left signal button on", OFF, LEFT)?;
    machine.add_transition("left signal button on", RIGHT, LEFT)?;
    machine.add_transition("right signal button on", OFF, RIGHT)?;
    machine.add_transition("right signal button on", LEFT, RIGHT)?;
    for from in [OFF, LEFT, RIGHT] {
        machine.add_transition("emergency signal button on", from, EMERGENCY)?;
    }
    for from in [LEFT, RIGHT, EMERGENCY] {
        machine.add_transition("signal button off", from, OFF)?;
    }
    Ok(machine)
}

/// The indicator lamps. Blink on every update while a side is on.
#[derive(Debug, Default)]
pub struct SignalLights {
    left_on: bool,
    right_on: bool,
    power: f64,
    lamp_lit: bool,
    blinks: u32,
}

impl SignalLights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn left_on(&self) -> bool {
        self.left_on
    }

    pub fn right_on(&self) -> bool {
        self.right_on
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn lamp_lit(&self) -> bool {
        self.lamp_lit
    }

    pub fn blinks(&self) -> u32 {
        self.blinks
    }

    fn set_sides(&mut self, left: bool, right: bool) {
        self.left_on = left;
        self.right_on = right;
    }
}

impl Process for SignalLights {
    fn name(&self) -> &str {
        "Signals"
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), KernelError> {
        ctx.watch("left on", |this: &mut Self, _: &Event, _: &mut Context<'_>| {
            this.set_sides(true, false);
            Ok(())
        })?;
        ctx.watch("right on", |this: &mut Self, _: &Event, _: &mut Context<'_>| {
            this.set_sides(false, true);
            Ok(())
        })?;
        ctx.watch("emergency on", |this: &mut Self, _: &Event, _: &mut Context<'_>| {
            this.set_sides(true, true);
            Ok(())
        })?;
        ctx.watch("signal off", |this: &mut Self, _: &Event, _: &mut Context<'_>| {
            this.set_sides(false, false);
            this.power = 0.0;
            Ok(())
        })?;
        ctx.watch("light on", |this: &mut Self, e: &Event, _: &mut Context<'_>| {
            this.power = e.value();
            Ok(())
        })
    }

    fn start(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
        *self = Self::default();
        Ok(())
    }

    fn update(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
        if self.left_on || self.right_on {
            self.lamp_lit = !self.lamp_lit;
            if self.lamp_lit {
                self.blinks += 1;
            }
        } else {
            self.lamp_lit = false;
        }
        Ok(())
    }
}
