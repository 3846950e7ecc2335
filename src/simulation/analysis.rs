use crate::error::{ThermalError, ThermalResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Transient,
    Steady,
}

/// Time discretization of a simulation.
///
/// A transient analysis advances by steps of `step_time` seconds; every
/// `slot_length` steps a new set of power values is consumed. A steady
/// analysis has neither steps nor slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    kind: AnalysisKind,
    step_time: f64,
    slot_time: f64,
    slot_length: u64,
    current_step: u64,
    /// The power values of the current slot have been consumed and the slot
    /// has not completed yet.
    slot_in_progress: bool,
    pub initial_temperature: f64,
}

impl Analysis {
    pub fn transient(
        step_time: f64,
        slot_time: f64,
        initial_temperature: f64,
    ) -> ThermalResult<Self> {
        if !(step_time > 0.0) {
            return Err(ThermalError::WrongConfig(format!(
                "step time must be positive, got {}",
                step_time
            )));
        }
        if slot_time < step_time {
            return Err(ThermalError::WrongConfig(format!(
                "slot time {} is shorter than step time {}",
                slot_time, step_time
            )));
        }
        Ok(Self {
            kind: AnalysisKind::Transient,
            step_time,
            slot_time,
            slot_length: (slot_time / step_time).round() as u64,
            current_step: 0,
            slot_in_progress: false,
            initial_temperature,
        })
    }

    pub fn steady(initial_temperature: f64) -> Self {
        Self {
            kind: AnalysisKind::Steady,
            step_time: 0.0,
            slot_time: 0.0,
            slot_length: 0,
            current_step: 0,
            slot_in_progress: false,
            initial_temperature,
        }
    }

    pub fn kind(&self) -> AnalysisKind {
        self.kind
    }

    pub fn is_transient(&self) -> bool {
        self.kind == AnalysisKind::Transient
    }

    /// Time step of the implicit Euler scheme; `None` in steady state.
    pub fn delta_time(&self) -> Option<f64> {
        match self.kind {
            AnalysisKind::Transient => Some(self.step_time),
            AnalysisKind::Steady => None,
        }
    }

    pub fn step_time(&self) -> f64 {
        self.step_time
    }

    pub fn slot_time(&self) -> f64 {
        self.slot_time
    }

    /// Number of steps per slot.
    pub fn slot_length(&self) -> u64 {
        self.slot_length
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    /// Simulated time in seconds.
    pub fn current_time(&self) -> f64 {
        self.current_step as f64 * self.step_time
    }

    /// Counts a completed step; the last step of a slot ends it.
    pub fn increment_step(&mut self) {
        self.current_step += 1;
        if self.slot_completed() {
            self.slot_in_progress = false;
        }
    }

    pub fn slot_in_progress(&self) -> bool {
        self.slot_in_progress
    }

    pub(crate) fn begin_slot(&mut self) {
        self.slot_in_progress = true;
    }

    pub(crate) fn end_slot(&mut self) {
        self.slot_in_progress = false;
    }

    /// True right after the last step of a slot.
    pub fn slot_completed(&self) -> bool {
        self.slot_length > 0 && self.current_step > 0 && self.current_step % self.slot_length == 0
    }

    pub fn reset(&mut self) {
        self.current_step = 0;
        self.slot_in_progress = false;
    }
}
