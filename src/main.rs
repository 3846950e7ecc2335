mod logger;

use ice3d_rs::error::ThermalResult;
use ice3d_rs::numerics::timing::{finalize_and_print, reset_timing};
use ice3d_rs::processing::inspection::{floorplan_temperatures, layer_of, thermal_map};
use ice3d_rs::processing::{csv_writer, SimulationSummary};
use ice3d_rs::simulation::{emulate_slot, emulate_steady, SimResult, ThermalData};
use ice3d_rs::SimulationConfig;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use crate::logger::Terminal;

const DEFAULT_CONFIG: &str = "demos/two_dies.json";
const DEFAULT_OUTPUT: &str = "output/main";

fn main() -> ExitCode {
    Terminal::install(Terminal::level_from_env());

    let mut args = std::env::args().skip(1);
    let config = args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let output = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string()));

    match run(Path::new(&config), &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &Path, output: &Path) -> ThermalResult<()> {
    fs::create_dir_all(output)?;

    let config = SimulationConfig::from_file(config_path)?;
    let (mut stkd, mut analysis) = config.build()?;
    let solver = config.solver.build()?;
    let mut tdata = ThermalData::new(&stkd, &analysis, solver);

    let headers: Vec<String> = stkd
        .stack
        .dies()
        .flat_map(|(_, die)| {
            die.floorplan.elements().iter().map(move |e| format!("{}.{}", die.id, e.id))
        })
        .collect();
    let mut samples: Vec<(f64, Vec<f64>)> = Vec::new();

    reset_timing();
    let start = Instant::now();

    let mut slot = 0;
    loop {
        let result = if analysis.is_transient() {
            emulate_slot(&mut tdata, &mut stkd, &mut analysis)
        } else {
            emulate_steady(&mut tdata, &mut stkd, &mut analysis)
        };

        match result {
            SimResult::SlotDone => {
                slot += 1;
                let stats = floorplan_temperatures(&stkd, tdata.temperatures())?;
                let hottest = stats.iter().map(|s| s.max).fold(f64::NEG_INFINITY, f64::max);
                info!(
                    "slot {} done at t = {:.4} s, hottest element {:.3} K",
                    slot,
                    analysis.current_time(),
                    hottest
                );
                samples.push((analysis.current_time(), stats.iter().map(|s| s.max).collect()));
            }
            SimResult::EndOfSimulation => break,
            SimResult::StepDone => {}
            SimResult::SolverError | SimResult::WrongConfig => {
                error!("simulation stopped after {} slots: {:?}", slot, result);
                break;
            }
        }
    }

    finalize_and_print(start.elapsed());

    let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();
    csv_writer::write_time_series(output.join("element_max.csv"), &header_refs, &samples)?;

    for (_, die) in stkd.stack.dies() {
        let layer = layer_of(&stkd, &die.id)?;
        let map = thermal_map(&stkd, tdata.temperatures(), layer)?;
        csv_writer::write_thermal_map(output.join(format!("{}_map.csv", die.id)), &map)?;
    }

    let elements = floorplan_temperatures(&stkd, tdata.temperatures())?;
    csv_writer::write_element_temperatures(output.join("elements.csv"), &elements)?;

    let mut summary = SimulationSummary::from_run(&stkd, &analysis, &tdata);
    summary.add_element_temperatures(elements);
    summary.write_to_file(output.join("simulation_summary.txt"))?;
    summary.print_to_console();

    info!("results saved to {}", output.display());
    Ok(())
}
