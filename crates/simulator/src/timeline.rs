//! Scripted events.

use std::time::Duration;
use tickwork_core::{Context, Event, KernelError, Process};
use tracing::debug;

/// Emits each scripted event on the first update at or after its time.
#[derive(Debug)]
pub struct Timeline {
    script: Vec<(Duration, Event)>,
    cursor: usize,
}

impl Timeline {
    pub fn new(mut script: Vec<(Duration, Event)>) -> Self {
        script.sort_by_key(|(at, _)| *at);
        Self { script, cursor: 0 }
    }

    /// Events not yet emitted in the current run.
    pub fn remaining(&self) -> usize {
        self.script.len() - self.cursor
    }
}

impl Process for Timeline {
    fn name(&self) -> &str {
        "Timeline"
    }

    fn start(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
        self.cursor = 0;
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        while let Some((at, event)) = self.script.get(self.cursor) {
            if *at > ctx.now() {
                break;
            }
            debug!(event = %event.name(), now_ms = ctx.now_ms(), "Scripted event");
            ctx.emit(event.clone());
            self.cursor += 1;
        }
        Ok(())
    }
}
