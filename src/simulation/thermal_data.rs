use log::{debug, info, trace};
use nalgebra::DVector;

use crate::error::{ThermalError, ThermalResult};
use crate::numerics::solver::{Factorization, SolveStats, SolverError, SparseLu, SystemSolver};
use crate::numerics::system_matrix::SystemMatrix;
use crate::numerics::system_vector::SystemVector;
use crate::numerics::timing::{record_assembly, record_factorization, record_linear_solve};
use crate::physics::conductances::{fill_conductances, Conductances};
use crate::physics::fill::{fill_capacities, fill_sources};
use crate::physics::non_uniform::ConnectionConductances;
use crate::physics::stack::StackDescription;
use crate::simulation::analysis::Analysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermalState {
    /// Buffers sized, temperatures at their initial value.
    Allocated,
    /// Conductances, capacities, sources and matrix up to date.
    Filled,
    /// Matrix factorized, ready to solve.
    Factorized,
    /// At least one linear solve since the last factorization.
    Solved,
}

/// Per-cell state of a thermal simulation and the linear system built from it.
///
/// The matrix is refilled (and refactorized) only when the coolant flow rate
/// changed; new power values only refresh the sources. A new grid structure
/// reallocates everything.
pub struct ThermalData {
    initial_temperature: f64,
    delta_time: Option<f64>,
    temperatures: DVector<f64>,
    scratch: DVector<f64>,
    sources: Vec<f64>,
    capacities: Vec<f64>,
    conductances: Vec<Conductances>,
    /// Used instead of `conductances` on a non-uniform grid.
    links: ConnectionConductances,
    matrix: SystemMatrix,
    vector: SystemVector,
    factorization: Factorization,
    state: ThermalState,
    solver: Box<dyn SystemSolver>,
}

impl ThermalData {
    pub fn new(
        stkd: &StackDescription,
        analysis: &Analysis,
        solver: Box<dyn SystemSolver>,
    ) -> Self {
        let mut tdata = Self {
            initial_temperature: analysis.initial_temperature,
            delta_time: analysis.delta_time(),
            temperatures: DVector::zeros(0),
            scratch: DVector::zeros(0),
            sources: Vec::new(),
            capacities: Vec::new(),
            conductances: Vec::new(),
            links: ConnectionConductances::default(),
            matrix: SystemMatrix::new(solver.preferred_storage(), 0, 0),
            vector: SystemVector::new(0),
            factorization: Factorization::DoFact,
            state: ThermalState::Allocated,
            solver,
        };
        tdata.allocate(stkd);
        tdata
    }

    pub fn with_sparse_lu(stkd: &StackDescription, analysis: &Analysis) -> Self {
        Self::new(stkd, analysis, Box::new(SparseLu::new()))
    }

    /// Sizes every buffer for the grid of `stkd`, temperatures at their
    /// initial value.
    fn allocate(&mut self, stkd: &StackDescription) {
        let size = stkd.n_cells();
        info!(
            "thermal data: {} cells, {} non-zeroes, solver {}",
            size,
            stkd.n_nonzeroes(),
            self.solver.name()
        );

        self.temperatures = DVector::from_element(size, self.initial_temperature);
        self.scratch = DVector::zeros(size);
        self.sources = vec![0.0; size];
        self.capacities = vec![0.0; size];
        self.conductances = match stkd.non_uniform() {
            Some(_) => Vec::new(),
            None => vec![Conductances::default(); size],
        };
        self.links = match stkd.non_uniform() {
            Some(layout) => ConnectionConductances::new(layout.grid()),
            None => ConnectionConductances::default(),
        };
        self.matrix = SystemMatrix::new(self.solver.preferred_storage(), size, stkd.n_nonzeroes());
        self.vector = SystemVector::new(size);
        self.factorization = Factorization::DoFact;
        self.state = ThermalState::Allocated;
    }

    /// Brings the system up to date with `stkd` and clears its dirty flags.
    ///
    /// A new grid structure reallocates every buffer and resets the
    /// temperatures. A flow-rate change rebuilds conductances, capacities and
    /// the matrix, and implies new sources. The matrix is factorized if it is
    /// not already.
    pub fn fill(&mut self, stkd: &mut StackDescription) -> ThermalResult<()> {
        if stkd.structure_changed {
            self.allocate(stkd);
            stkd.structure_changed = false;
            stkd.flow_rate_changed = true;
        }

        if self.temperatures.len() != stkd.n_cells() {
            return Err(ThermalError::WrongConfig(format!(
                "thermal data sized for {} cells, stack has {}",
                self.temperatures.len(),
                stkd.n_cells()
            )));
        }

        if stkd.flow_rate_changed {
            let delta_time = self.delta_time;
            record_assembly(|| match stkd.non_uniform() {
                Some(layout) => {
                    layout.fill_conductances(&stkd.stack, &stkd.top_boundary, &mut self.links)?;
                    layout.fill_capacities(&stkd.stack, &mut self.capacities, delta_time)?;
                    self.matrix.fill_from_connections(layout.grid(), &self.links, &self.capacities)
                }
                None => {
                    fill_conductances(stkd, &mut self.conductances);
                    fill_capacities(stkd, &mut self.capacities, delta_time);
                    self.matrix.fill(stkd, &self.conductances, &self.capacities)
                }
            })?;

            if self.factorization == Factorization::Factored {
                self.factorization = Factorization::SamePattern;
            }
            stkd.flow_rate_changed = false;
            stkd.power_values_changed = true;
            debug!("system matrix filled ({} entries)", self.matrix.values.len());
        }

        if stkd.power_values_changed {
            match stkd.non_uniform() {
                Some(layout) => layout.fill_sources(
                    &stkd.stack,
                    &stkd.top_boundary,
                    &self.links,
                    &mut self.sources,
                ),
                None => fill_sources(stkd, &self.conductances, &mut self.sources),
            }
            self.vector.fill(&self.sources, &self.capacities, &self.temperatures);
            stkd.power_values_changed = false;
            trace!("sources filled, total power {:.6e} W", self.sources.iter().sum::<f64>());
        }

        if self.state == ThermalState::Allocated {
            self.state = ThermalState::Filled;
        }

        if self.factorization != Factorization::Factored {
            self.factorize()?;
        }
        Ok(())
    }

    /// Factorizes the current matrix, reusing the previous sparsity pattern
    /// when only values changed.
    pub fn factorize(&mut self) -> ThermalResult<()> {
        if self.state == ThermalState::Allocated {
            return Err(ThermalError::WrongConfig(
                "factorization requested before the system was filled".to_string(),
            ));
        }

        let mode = self.factorization;
        let result = record_factorization(|| self.solver.factorize(&self.matrix, mode));
        if let Err(e) = result {
            self.factorization = Factorization::DoFact;
            self.state = ThermalState::Filled;
            return Err(e.into());
        }

        info!("{}: factorized ({:?})", self.solver.name(), mode);
        self.factorization = Factorization::Factored;
        self.state = ThermalState::Factorized;
        Ok(())
    }

    /// One linear solve: `A T' = S + Cap T`.
    ///
    /// On failure the temperatures are left as they were.
    pub fn solve_step(&mut self) -> ThermalResult<SolveStats> {
        if self.factorization != Factorization::Factored {
            return Err(SolverError::NotFactorized.into());
        }

        self.vector.fill(&self.sources, &self.capacities, &self.temperatures);
        self.scratch.copy_from(&self.temperatures);

        let stats =
            record_linear_solve(|| self.solver.solve(self.vector.as_vector(), &mut self.scratch))?;
        std::mem::swap(&mut self.temperatures, &mut self.scratch);
        self.state = ThermalState::Solved;

        trace!("{}: residual {:.3e}", self.solver.name(), stats.residual);
        Ok(stats)
    }

    /// Advances at least `total_time` seconds in steps of the analysis time
    /// step, or solves once for the steady state. Returns the number of
    /// solves.
    ///
    /// A partial step counts as a full one. A non-positive or non-finite
    /// `total_time` runs no transient step.
    pub fn solve(&mut self, total_time: f64) -> ThermalResult<usize> {
        let steps = match self.delta_time {
            Some(delta_time) => steps_covering(total_time, delta_time),
            None => 1,
        };
        for _ in 0..steps {
            self.solve_step()?;
        }
        Ok(steps)
    }

    /// Puts every cell back to the initial temperature.
    pub fn reset_thermal_state(&mut self) {
        self.temperatures.fill(self.initial_temperature);
        self.vector.fill(&self.sources, &self.capacities, &self.temperatures);
        if self.state == ThermalState::Solved {
            self.state = ThermalState::Factorized;
        }
    }

    pub fn n_cells(&self) -> usize {
        self.temperatures.len()
    }

    pub fn initial_temperature(&self) -> f64 {
        self.initial_temperature
    }

    pub fn delta_time(&self) -> Option<f64> {
        self.delta_time
    }

    pub fn temperatures(&self) -> &[f64] {
        self.temperatures.as_slice()
    }

    pub fn sources(&self) -> &[f64] {
        &self.sources
    }

    pub fn capacities(&self) -> &[f64] {
        &self.capacities
    }

    /// Per-cell conductances; empty on a non-uniform grid.
    pub fn conductances(&self) -> &[Conductances] {
        &self.conductances
    }

    /// Per-connection conductances; empty on the uniform grid.
    pub fn connection_conductances(&self) -> &ConnectionConductances {
        &self.links
    }

    pub fn system_matrix(&self) -> &SystemMatrix {
        &self.matrix
    }

    pub fn system_vector(&self) -> &SystemVector {
        &self.vector
    }

    pub fn factorization(&self) -> Factorization {
        self.factorization
    }

    pub fn state(&self) -> ThermalState {
        self.state
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }
}

/// Smallest number of `delta_time` steps spanning `total_time`.
fn steps_covering(total_time: f64, delta_time: f64) -> usize {
    if !total_time.is_finite() || total_time <= 0.0 {
        return 0;
    }
    ((total_time / delta_time - 1e-9).ceil() as usize).max(1)
}
