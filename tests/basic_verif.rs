use ice3d_rs::discretization::CellDimensions;
use ice3d_rs::physics::{
    Channel, Conductances, Coolant, Die, Floorplan, FloorplanElement, IcElement, Layer, Material,
    Stack, StackDescription,
    StackElementKind, TopBoundary,
};
use ice3d_rs::numerics::StorageKind;
use ice3d_rs::simulation::{Analysis, ThermalData};

fn unit_material() -> Material {
    Material::new("unit", 1.0, 1.0)
}

/// One-layer 3x3 grid of unit cubes, with a one-element floorplan covering
/// the center cell only.
fn unit_grid(center_power: f64) -> StackDescription {
    let floorplan = Floorplan::new(vec![
        FloorplanElement::new("center", vec![IcElement::new(1.0, 1.0, 1.0, 1.0)])
            .with_power_values([center_power]),
    ])
    .unwrap();
    let layers = vec![Layer::new("slab", 1.0, unit_material())];
    let die = Die::new("die", layers, "slab", floorplan).unwrap();
    let stack = Stack::new().with("die", StackElementKind::Die(die)).unwrap();
    let cell = CellDimensions::uniform(1.0, 1.0);
    StackDescription::new(stack, cell, 3, 3, TopBoundary::Adiabatic).unwrap()
}

fn solid_stack(layers: usize, rows: usize, columns: usize) -> StackDescription {
    let silicon = Material::new("silicon", 1.3e-4, 1.628e-12);
    let mut stack = Stack::new();
    for l in 0..layers {
        let id = format!("layer{}", l);
        stack
            .push(id.clone(), StackElementKind::Layer(Layer::new(id, 50.0, silicon.clone())))
            .unwrap();
    }
    let cell = CellDimensions::uniform(100.0, 100.0);
    StackDescription::new(stack, cell, rows, columns, TopBoundary::Adiabatic).unwrap()
}

fn coolant() -> Coolant {
    Coolant {
        heat_transfer_coefficient: 2.7132e-8,
        volumetric_heat_capacity: 4.172e-12,
        incoming_temperature: 300.0,
    }
}

/// Die / channel / lid on a 4x3 grid, whole-chip floorplan.
fn cooled_stack(flow_rate: f64, power: f64) -> StackDescription {
    let silicon = Material::new("silicon", 1.3e-4, 1.628e-12);
    let floorplan = Floorplan::new(vec![
        FloorplanElement::new("core", vec![IcElement::new(0.0, 0.0, 300.0, 400.0)])
            .with_power_values([power])
    ])
    .unwrap();
    let layers = vec![Layer::new("source", 50.0, silicon.clone())];
    let die = Die::new("die", layers, "source", floorplan).unwrap();
    let stack = Stack::new()
        .with("die", StackElementKind::Die(die))
        .unwrap()
        .with(
            "cavity",
            StackElementKind::Channel(Channel::new(
                "cavity",
                100.0,
                silicon.clone(),
                coolant(),
                flow_rate,
            )),
        )
        .unwrap()
        .with("lid", StackElementKind::Layer(Layer::new("lid", 50.0, silicon)))
        .unwrap();
    let cell = CellDimensions::uniform(100.0, 100.0);
    StackDescription::new(stack, cell, 4, 3, TopBoundary::Adiabatic).unwrap()
}

#[test]
fn zero_power_is_a_fixed_point() {
    let mut stkd = unit_grid(0.0);
    let analysis = Analysis::transient(1.0, 1.0, 300.0).unwrap();
    let mut tdata = ThermalData::with_sparse_lu(&stkd, &analysis);

    assert!(stkd.pop_power_values());
    tdata.fill(&mut stkd).unwrap();
    tdata.solve_step().unwrap();

    let max_err = tdata.temperatures().iter().map(|t| (t - 300.0).abs()).fold(0.0, f64::max);
    println!("Max deviation from 300 K: {:.2e}", max_err);
    assert!(max_err < 1e-10);
}

#[test]
fn heated_center_is_hottest() {
    let mut stkd = unit_grid(1.0);
    let analysis = Analysis::transient(1.0, 1.0, 300.0).unwrap();
    let mut tdata = ThermalData::with_sparse_lu(&stkd, &analysis);

    assert!(stkd.pop_power_values());
    tdata.fill(&mut stkd).unwrap();
    assert_eq!(tdata.sources()[4], 1.0);
    tdata.solve_step().unwrap();

    let t = tdata.temperatures();
    for neighbor in [1, 3, 5, 7] {
        assert!(t[4] > t[neighbor], "center {} <= neighbor {}", t[4], t[neighbor]);
        assert!(t[neighbor] >= 300.0);
    }
    for corner in [0, 2, 6, 8] {
        assert!(t[corner] >= 300.0);
    }
    // the four edge neighbors see the same conductance to the center
    assert!((t[1] - t[3]).abs() < 1e-9 && (t[5] - t[7]).abs() < 1e-9);
}

#[test]
fn solid_matrix_is_symmetric() {
    let mut stkd = solid_stack(3, 4, 5);
    let analysis = Analysis::transient(1e-3, 1e-3, 300.0).unwrap();
    let mut tdata = ThermalData::with_sparse_lu(&stkd, &analysis);
    tdata.fill(&mut stkd).unwrap();

    let dense = tdata.system_matrix().to_dense();
    assert_eq!(dense, dense.transpose());
}

#[test]
fn laplacian_rows_sum_to_zero() {
    let mut stkd = solid_stack(3, 3, 3);
    let analysis = Analysis::transient(1e-3, 1e-3, 300.0).unwrap();
    let mut tdata = ThermalData::with_sparse_lu(&stkd, &analysis);
    tdata.fill(&mut stkd).unwrap();

    let dense = tdata.system_matrix().to_dense();
    for cell in 0..tdata.n_cells() {
        let off_diagonal: f64 =
            (0..tdata.n_cells()).filter(|&j| j != cell).map(|j| dense[(cell, j)]).sum();
        let laplacian = dense[(cell, cell)] - tdata.capacities()[cell];
        assert!(
            (off_diagonal + laplacian).abs() <= 1e-12 * laplacian,
            "row {}: {} vs {}",
            cell,
            off_diagonal,
            laplacian
        );
    }
}

#[test]
fn liquid_cells_couple_asymmetrically() {
    let flow_rate = 0.5;
    // ml/min -> µm³/s, shared by (3 - 1) half liquid columns
    let c = 4.172e-12 * (flow_rate * 1e12 / 60.0) / 2.0;

    for kind in [StorageKind::CompressedColumn, StorageKind::CompressedRow] {
        let stkd = cooled_stack(flow_rate, 0.0);
        let dims = &stkd.dimensions;
        let n = dims.n_cells();

        let mut conductances = vec![Conductances::default(); n];
        let mut capacities = vec![0.0; n];
        ice3d_rs::physics::conductances::fill_conductances(&stkd, &mut conductances);
        ice3d_rs::physics::fill::fill_capacities(&stkd, &mut capacities, Some(1e-3));
        let mut matrix = ice3d_rs::numerics::SystemMatrix::for_grid(kind, dims);
        matrix.fill(&stkd, &conductances, &capacities).unwrap();

        let upstream = dims.cell_offset_in_stack(1, 1, 1);
        let downstream = dims.cell_offset_in_stack(1, 2, 1);
        assert!((matrix.get(upstream, downstream) - c).abs() < 1e-12 * c);
        assert!((matrix.get(downstream, upstream) + c).abs() < 1e-12 * c);
        assert_ne!(matrix.get(upstream, downstream), matrix.get(downstream, upstream));
    }
}

#[test]
fn refill_without_changes_is_idempotent() {
    let mut stkd = cooled_stack(0.5, 2.0);
    let analysis = Analysis::transient(1e-3, 1e-2, 300.0).unwrap();
    let mut tdata = ThermalData::with_sparse_lu(&stkd, &analysis);

    assert!(stkd.pop_power_values());
    tdata.fill(&mut stkd).unwrap();
    let values = tdata.system_matrix().values.clone();
    let sources = tdata.sources().to_vec();
    let capacities = tdata.capacities().to_vec();

    tdata.fill(&mut stkd).unwrap();
    stkd.change_coolant_flow_rate(0.5);
    tdata.fill(&mut stkd).unwrap();
    stkd.set_power("die", "core", 2.0).unwrap();
    tdata.fill(&mut stkd).unwrap();

    assert_eq!(tdata.system_matrix().values, values);
    assert_eq!(tdata.sources(), &sources[..]);
    assert_eq!(tdata.capacities(), &capacities[..]);
}

#[test]
fn flow_rate_change_changes_temperatures() {
    let analysis = Analysis::transient(1e-3, 1e-2, 300.0).unwrap();

    let run = |new_flow_rate: Option<f64>| {
        let mut stkd = cooled_stack(0.5, 2.0);
        let mut tdata = ThermalData::with_sparse_lu(&stkd, &analysis);
        assert!(stkd.pop_power_values());
        tdata.fill(&mut stkd).unwrap();
        tdata.solve(5e-3).unwrap();
        let before = tdata.conductances().to_vec();
        if let Some(rate) = new_flow_rate {
            stkd.change_coolant_flow_rate(rate);
        }
        tdata.fill(&mut stkd).unwrap();
        tdata.solve(5e-3).unwrap();
        (stkd, before, tdata.conductances().to_vec(), tdata.temperatures().to_vec())
    };

    let (_, _, _, unchanged) = run(None);
    let (stkd, before, after, changed) = run(Some(1.5));

    let dims = &stkd.dimensions;
    for row in 0..dims.n_rows() {
        let liquid = dims.cell_offset_in_stack(1, row, 1);
        assert_ne!(before[liquid], after[liquid]);
        let wall = dims.cell_offset_in_stack(1, row, 0);
        assert_eq!(before[wall], after[wall]);
    }

    let max_diff = unchanged.iter().zip(&changed).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max);
    println!("Max temperature difference after flow change: {:.3e} K", max_diff);
    assert!(max_diff > 1e-6);
    // more coolant, cooler chip
    let hottest = |t: &[f64]| t.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(hottest(&changed) < hottest(&unchanged));
}
