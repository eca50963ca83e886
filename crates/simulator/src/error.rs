use thiserror::Error;
use tickwork_core::KernelError;

/// Errors from assembling or running a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Invalid scenario configuration: {0}")]
    InvalidConfig(String),

    #[error("Scenario has no process named `{0}`")]
    MissingProcess(String),

    #[error("Simulation error: {0}")]
    Kernel(#[from] KernelError),
}
