#![cfg(feature = "krylov")]

use ice3d_rs::discretization::CellDimensions;
use ice3d_rs::numerics::{IterationBudget, SolverBackend, Tolerance};
use ice3d_rs::physics::{
    Channel, Coolant, Die, Floorplan, FloorplanElement, IcElement, Layer, Material, Stack,
    StackDescription, StackElementKind, TopBoundary,
};
use ice3d_rs::simulation::{emulate_slot, Analysis, SimResult, ThermalData};

fn tight_budget() -> IterationBudget {
    IterationBudget {
        tolerance: Tolerance::Relative(1e-12),
        max_iterations: 5000,
    }
}

fn bicgstab(stkd: &StackDescription, analysis: &Analysis) -> ThermalData {
    let solver = SolverBackend::BiCgStab { budget: tight_budget() }.build().unwrap();
    ThermalData::new(stkd, analysis, solver)
}

/// One unit-cube layer on a 3x3 grid, powered in the center cell.
fn unit_grid(power: f64) -> StackDescription {
    let unit = Material::new("unit", 1.0, 1.0);
    let floorplan = Floorplan::new(vec![FloorplanElement::new(
        "center",
        vec![IcElement::new(1.0, 1.0, 1.0, 1.0)],
    )
    .with_power_values([power])])
    .unwrap();
    let die = Die::new("die", vec![Layer::new("slab", 1.0, unit)], "slab", floorplan).unwrap();
    let stack = Stack::new().with("die", StackElementKind::Die(die)).unwrap();
    StackDescription::new(stack, CellDimensions::uniform(1.0, 1.0), 3, 3, TopBoundary::Adiabatic)
        .unwrap()
}

/// Die, channel and lid on a 4x3 grid.
fn cooled_stack(power: f64) -> StackDescription {
    let silicon = Material::new("silicon", 1.3e-4, 1.628e-12);
    let coolant = Coolant {
        heat_transfer_coefficient: 2.7132e-8,
        volumetric_heat_capacity: 4.172e-12,
        incoming_temperature: 300.0,
    };
    let floorplan = Floorplan::new(vec![FloorplanElement::new(
        "core",
        vec![IcElement::new(0.0, 0.0, 300.0, 400.0)],
    )
    .with_power_values([power])])
    .unwrap();
    let layers = vec![Layer::new("source", 50.0, silicon.clone())];
    let die = Die::new("die", layers, "source", floorplan)
        .unwrap();
    let stack = Stack::new()
        .with("die", StackElementKind::Die(die))
        .unwrap()
        .with(
            "cavity",
            StackElementKind::Channel(Channel::new("cavity", 100.0, silicon.clone(), coolant, 0.5)),
        )
        .unwrap()
        .with("lid", StackElementKind::Layer(Layer::new("lid", 50.0, silicon)))
        .unwrap();
    let cell = CellDimensions::uniform(100.0, 100.0);
    StackDescription::new(stack, cell, 4, 3, TopBoundary::Adiabatic).unwrap()
}

fn compare(make: fn(f64) -> StackDescription, analysis: Analysis) {
    let mut direct_stkd = make(1.0);
    let mut direct_analysis = analysis.clone();
    let mut direct = ThermalData::with_sparse_lu(&direct_stkd, &direct_analysis);
    assert_eq!(
        emulate_slot(&mut direct, &mut direct_stkd, &mut direct_analysis),
        SimResult::SlotDone
    );

    let mut stkd = make(1.0);
    let mut iterative_analysis = analysis;
    let mut iterative = bicgstab(&stkd, &iterative_analysis);
    assert_eq!(iterative.solver_name(), "bicgstab");
    assert_eq!(
        emulate_slot(&mut iterative, &mut stkd, &mut iterative_analysis),
        SimResult::SlotDone
    );

    let max_err = direct
        .temperatures()
        .iter()
        .zip(iterative.temperatures())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    println!("max |sparse LU - BiCGSTAB| = {:.3e} K", max_err);
    assert!(max_err < 1e-6);
}

#[test]
fn bicgstab_matches_sparse_lu_on_the_unit_grid() {
    compare(unit_grid, Analysis::transient(1.0, 4.0, 300.0).unwrap());
}

#[test]
fn bicgstab_matches_sparse_lu_with_a_channel() {
    compare(cooled_stack, Analysis::transient(2e-3, 2e-2, 300.0).unwrap());
}

#[test]
fn bicgstab_reports_its_iterations() {
    let mut stkd = cooled_stack(1.0);
    let analysis = Analysis::transient(2e-3, 2e-2, 300.0).unwrap();
    let mut tdata = bicgstab(&stkd, &analysis);

    assert!(stkd.pop_power_values());
    tdata.fill(&mut stkd).unwrap();
    let stats = tdata.solve_step().unwrap();
    let iterations = stats.iterations.unwrap();
    assert!(iterations > 0 && iterations <= tight_budget().max_iterations);
    assert!(stats.residual.is_finite());
}
