use super::channel::Channel;
use super::conductances::Conductances;
use super::stack::{StackDescription, StackLayer};

/// Thermal capacity of every cell divided by the time step, in W/K.
///
/// `delta_time == None` selects steady-state analysis, where the time
/// derivative vanishes and every capacity is zero.
pub fn fill_capacities(stkd: &StackDescription, capacities: &mut [f64], delta_time: Option<f64>) {
    let dims = &stkd.dimensions;
    debug_assert_eq!(capacities.len(), dims.n_cells());

    let Some(delta_time) = delta_time else {
        capacities.fill(0.0);
        return;
    };

    for (layer, stack_layer) in stkd.stack.layers() {
        let height = stack_layer.height();
        for row in 0..dims.n_rows() {
            for column in 0..dims.n_columns() {
                let vhc = match stack_layer {
                    StackLayer::Solid(solid) => solid.material.volumetric_heat_capacity,
                    StackLayer::Channel(channel) if Channel::is_liquid_column(column) => {
                        channel.coolant.volumetric_heat_capacity
                    }
                    StackLayer::Channel(channel) => channel.wall_material.volumetric_heat_capacity,
                };
                capacities[dims.cell_offset_in_stack(layer, row, column)] =
                    vhc * dims.cell_volume(column, height) / delta_time;
            }
        }
    }
}

/// Heat injected in every cell, in W.
///
/// Sums the floorplan powers of every die on its source layer, the coolant
/// entering the liquid cells of row 0 and, with an ambient top boundary, the
/// ambient temperature seen through the top-layer conductances.
pub fn fill_sources(stkd: &StackDescription, conductances: &[Conductances], sources: &mut [f64]) {
    let dims = &stkd.dimensions;
    debug_assert_eq!(sources.len(), dims.n_cells());

    sources.fill(0.0);

    let area = dims.layer_area();

    for (source_layer, die) in stkd.stack.dies() {
        let offset = source_layer * area;
        die.floorplan.fill_sources(&mut sources[offset..offset + area]);
    }

    for (layer, channel) in stkd.stack.channels() {
        let inlet = channel.inlet_source(dims.n_columns());
        for column in (1..dims.n_columns()).step_by(2) {
            sources[dims.cell_offset_in_stack(layer, 0, column)] += inlet;
        }
    }

    if let Some(ambient) = stkd.top_boundary.ambient_temperature() {
        let top = dims.last_layer();
        for row in 0..dims.n_rows() {
            for column in 0..dims.n_columns() {
                let cell = dims.cell_offset_in_stack(top, row, column);
                sources[cell] += conductances[cell].top * ambient;
            }
        }
    }
}
