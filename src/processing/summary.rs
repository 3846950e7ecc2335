use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::processing::inspection::{hottest_cell, ElementTemperatures};
use crate::simulation::analysis::{Analysis, AnalysisKind};
use crate::simulation::thermal_data::ThermalData;
use crate::physics::stack::StackDescription;

pub struct SimulationSummary {
    // Grid
    pub n_layers: usize,
    pub n_rows: usize,
    pub n_columns: usize,
    pub n_cells: usize,
    pub n_nonzeroes: usize,
    pub non_uniform: bool,
    pub chip_size: (f64, f64),

    // Stack
    pub n_channels: usize,
    pub n_floorplan_elements: usize,
    pub ambient: Option<f64>,

    // Analysis
    pub kind: AnalysisKind,
    pub step_time: f64,
    pub slot_time: f64,
    pub steps: u64,
    pub simulated_time: f64,
    pub solver: &'static str,

    // Results
    pub hottest: Option<(usize, usize, usize, f64)>,
    pub coldest: f64,
    pub total_power: f64,
    pub elements: Vec<ElementTemperatures>,
}

impl SimulationSummary {
    pub fn from_run(stkd: &StackDescription, analysis: &Analysis, tdata: &ThermalData) -> Self {
        let dims = &stkd.dimensions;
        let temperatures = tdata.temperatures();
        let hottest = hottest_cell(temperatures).map(|(cell, t)| {
            let (layer, row, column) = stkd.cell_coordinates(cell);
            (layer, row, column, t)
        });

        Self {
            n_layers: dims.n_layers(),
            n_rows: dims.n_rows(),
            n_columns: dims.n_columns(),
            n_cells: stkd.n_cells(),
            n_nonzeroes: stkd.n_nonzeroes(),
            non_uniform: stkd.non_uniform().is_some(),
            chip_size: (dims.chip.length, dims.chip.width),
            n_channels: stkd.stack.channels().count(),
            n_floorplan_elements: stkd.total_number_of_floorplan_elements(),
            ambient: stkd.top_boundary.ambient_temperature(),
            kind: analysis.kind(),
            step_time: analysis.step_time(),
            slot_time: analysis.slot_time(),
            steps: analysis.current_step(),
            simulated_time: analysis.current_time(),
            solver: tdata.solver_name(),
            hottest,
            coldest: temperatures.iter().copied().fold(f64::INFINITY, f64::min),
            total_power: stkd
                .stack
                .dies()
                .map(|(_, die)| die.floorplan.powers().iter().sum::<f64>())
                .sum(),
            elements: Vec::new(),
        }
    }

    pub fn add_element_temperatures(&mut self, elements: Vec<ElementTemperatures>) {
        self.elements = elements;
    }

    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out, "THERMAL SIMULATION SUMMARY")?;
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out)?;

        writeln!(out, "GRID")?;
        writeln!(out, "{}", "-".repeat(60))?;
        if self.non_uniform {
            writeln!(
                out,
                "Cells:               {} layers, non-uniform = {}",
                self.n_layers, self.n_cells
            )?;
        } else {
            writeln!(
                out,
                "Cells:               {} layers x {} rows x {} columns = {}",
                self.n_layers, self.n_rows, self.n_columns, self.n_cells
            )?;
        }
        writeln!(out, "Non-zeroes:          {}", self.n_nonzeroes)?;
        writeln!(
            out,
            "Chip size:           {:.1} x {:.1} um",
            self.chip_size.0, self.chip_size.1
        )?;
        writeln!(out)?;

        writeln!(out, "STACK")?;
        writeln!(out, "{}", "-".repeat(60))?;
        writeln!(out, "Channels:            {}", self.n_channels)?;
        writeln!(out, "Floorplan elements:  {}", self.n_floorplan_elements)?;
        match self.ambient {
            Some(t) => writeln!(out, "Top boundary:        ambient at {:.2} K", t)?,
            None => writeln!(out, "Top boundary:        adiabatic")?,
        }
        writeln!(out, "Total power:         {:.6} W", self.total_power)?;
        writeln!(out)?;

        writeln!(out, "ANALYSIS")?;
        writeln!(out, "{}", "-".repeat(60))?;
        match self.kind {
            AnalysisKind::Transient => {
                writeln!(
                    out,
                    "Transient:           step {:.3e} s, slot {:.3e} s",
                    self.step_time, self.slot_time
                )?;
                writeln!(out, "Steps:               {}", self.steps)?;
                writeln!(out, "Simulated time:      {:.6} s", self.simulated_time)?;
            }
            AnalysisKind::Steady => writeln!(out, "Steady state")?,
        }
        writeln!(out, "Solver:              {}", self.solver)?;
        writeln!(out)?;

        writeln!(out, "TEMPERATURES")?;
        writeln!(out, "{}", "-".repeat(60))?;
        if let Some((layer, row, column, t)) = self.hottest {
            writeln!(
                out,
                "Hottest cell:        {:.3} K at layer {}, row {}, column {}",
                t, layer, row, column
            )?;
        }
        writeln!(out, "Coldest cell:        {:.3} K", self.coldest)?;
        if !self.elements.is_empty() {
            writeln!(out)?;
            writeln!(out, "{:<24} {:>10} {:>10} {:>10}", "element", "max", "min", "avg")?;
            for e in &self.elements {
                writeln!(
                    out,
                    "{:<24} {:>10.3} {:>10.3} {:>10.3}",
                    format!("{}.{}", e.die, e.element),
                    e.max,
                    e.min,
                    e.avg
                )?;
            }
        }
        writeln!(out, "{}", "=".repeat(60))?;

        Ok(())
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;
        self.write(&mut file)
    }

    pub fn print_to_console(&self) {
        let mut stdout = io::stdout().lock();
        if let Err(e) = self.write(&mut stdout) {
            log::warn!("could not print summary: {}", e);
        }
    }
}
