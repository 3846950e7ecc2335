use log::{error, trace};

use crate::error::ThermalError;
use crate::physics::stack::StackDescription;
use crate::simulation::analysis::Analysis;
use crate::simulation::thermal_data::ThermalData;

/// Outcome of an emulation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimResult {
    StepDone,
    SlotDone,
    /// No power values left to start a new slot.
    EndOfSimulation,
    SolverError,
    /// The call does not match the kind of analysis.
    WrongConfig,
}

fn report(e: ThermalError) -> SimResult {
    error!("emulation failed: {}", e);
    match e {
        ThermalError::WrongConfig(_) => SimResult::WrongConfig,
        _ => SimResult::SolverError,
    }
}

/// Consumes the power values of a new slot unless the current one is still
/// running. Returns `false` when no values are left.
fn start_slot(stkd: &mut StackDescription, analysis: &mut Analysis) -> bool {
    if analysis.slot_in_progress() {
        return true;
    }
    if !stkd.pop_power_values() {
        return false;
    }
    analysis.begin_slot();
    true
}

/// Advances a transient simulation by one time step.
///
/// The first step of every slot consumes the next power values; the matrix is
/// refilled first if the flow rate changed in the meantime. A failed step
/// can be retried with the same power values.
pub fn emulate_step(
    tdata: &mut ThermalData,
    stkd: &mut StackDescription,
    analysis: &mut Analysis,
) -> SimResult {
    if !analysis.is_transient() {
        return SimResult::WrongConfig;
    }

    if !start_slot(stkd, analysis) {
        return SimResult::EndOfSimulation;
    }

    if let Err(e) = tdata.fill(stkd) {
        return report(e);
    }
    if let Err(e) = tdata.solve_step() {
        return report(e);
    }

    analysis.increment_step();
    trace!("step {} done, t = {:.6} s", analysis.current_step(), analysis.current_time());

    if analysis.slot_completed() {
        SimResult::SlotDone
    } else {
        SimResult::StepDone
    }
}

/// Runs steps until the end of the current slot.
pub fn emulate_slot(
    tdata: &mut ThermalData,
    stkd: &mut StackDescription,
    analysis: &mut Analysis,
) -> SimResult {
    loop {
        match emulate_step(tdata, stkd, analysis) {
            SimResult::StepDone => continue,
            other => return other,
        }
    }
}

/// Solves for the steady state of the next set of power values.
///
/// After a failure the same power values are used by the next call.
pub fn emulate_steady(
    tdata: &mut ThermalData,
    stkd: &mut StackDescription,
    analysis: &mut Analysis,
) -> SimResult {
    if analysis.is_transient() {
        return SimResult::WrongConfig;
    }

    if !start_slot(stkd, analysis) {
        return SimResult::EndOfSimulation;
    }

    if let Err(e) = tdata.fill(stkd) {
        return report(e);
    }
    match tdata.solve_step() {
        Ok(_) => {
            analysis.end_slot();
            SimResult::SlotDone
        }
        Err(e) => report(e),
    }
}

/// Restarts the simulation from the initial temperature at time zero.
pub fn reset_thermal_state(tdata: &mut ThermalData, analysis: &mut Analysis) {
    tdata.reset_thermal_state();
    analysis.reset();
}
