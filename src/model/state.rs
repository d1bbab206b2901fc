//! Run state threaded through every execution context.

/// Where the model is in its annual cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Inside initialisation phase `n` (0-based, configuration order).
    Initialise(usize),
    /// Running the model years.
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunState {
    pub year: u32,
    pub time_step: usize,
    pub phase: Phase,
}

impl RunState {
    pub fn initialising(&self) -> bool {
        matches!(self.phase, Phase::Initialise(_))
    }
}

/// Top-level mode the model was asked to run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Basic,
    Estimation,
    Mcmc,
    Simulation,
}
