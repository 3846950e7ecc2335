use super::bc::TopBoundary;
use super::channel::Channel;
use super::stack::{StackDescription, StackLayer};
use crate::discretization::dimensions::{Dimensions, LayerPosition};

/// Thermal conductances, in W/K, from the center of a cell to each of its
/// faces.
///
/// Two neighbors exchange heat through [`parallel`] of their facing
/// conductances. Liquid cells store the advective coefficient instead of a
/// conductance in `north` (`+C`) and `south` (`-C`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Conductances {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Two conductances in series.
pub fn parallel(x: f64, y: f64) -> f64 {
    if x + y == 0.0 { 0.0 } else { x * y / (x + y) }
}

/// `(top, bottom)` conductances of a solid cell with horizontal section
/// `area`.
///
/// The bottom layer sends its full height upwards, the top layer downwards.
/// With an ambient top boundary the top-most face splits the cell height and
/// puts the convective film in series.
pub fn vertical_faces(
    position: LayerPosition,
    area: f64,
    height: f64,
    conductivity: f64,
    top_boundary: &TopBoundary,
) -> (f64, f64) {
    let full = conductivity * area / height;
    let half = conductivity * area / (height / 2.0);
    let ambient = top_boundary.conductance(area);

    match (position, top_boundary.is_ambient()) {
        (LayerPosition::Bottom, _) => (full, 0.0),
        (LayerPosition::Center, _) => (half, half),
        (LayerPosition::Top, false) => (0.0, full),
        (LayerPosition::Top, true) => (parallel(half, ambient), half),
        (LayerPosition::Single, false) => (0.0, 0.0),
        (LayerPosition::Single, true) => (parallel(full, ambient), 0.0),
    }
}

impl Conductances {
    pub fn solid(
        dims: &Dimensions,
        layer: usize,
        column: usize,
        height: f64,
        conductivity: f64,
        top_boundary: &TopBoundary,
    ) -> Self {
        let length = dims.cell_length(column);
        let width = dims.cell_width();

        let lateral_ns = conductivity * length * height / (width / 2.0);
        let lateral_ew = conductivity * width * height / (length / 2.0);
        let (top, bottom) = vertical_faces(
            dims.layer_position(layer),
            dims.top_surface(column),
            height,
            conductivity,
            top_boundary,
        );

        Self {
            north: lateral_ns,
            south: lateral_ns,
            east: lateral_ew,
            west: lateral_ew,
            top,
            bottom,
        }
    }

    /// `advection` is [`Channel::advection_coefficient`].
    pub fn liquid(dims: &Dimensions, column: usize, height: f64, htc: f64, advection: f64) -> Self {
        let lateral = htc * dims.cell_width() * height;
        let vertical = htc * dims.top_surface(column);

        Self {
            north: advection,
            south: -advection,
            east: lateral,
            west: lateral,
            top: vertical,
            bottom: vertical,
        }
    }
}

/// Computes the conductances of every cell of the stack.
pub fn fill_conductances(stkd: &StackDescription, conductances: &mut [Conductances]) {
    let dims = &stkd.dimensions;
    debug_assert_eq!(conductances.len(), dims.n_cells());

    for (layer, stack_layer) in stkd.stack.layers() {
        let height = stack_layer.height();
        for row in 0..dims.n_rows() {
            for column in 0..dims.n_columns() {
                let cell = dims.cell_offset_in_stack(layer, row, column);
                conductances[cell] = match stack_layer {
                    StackLayer::Solid(solid) => Conductances::solid(
                        dims,
                        layer,
                        column,
                        height,
                        solid.material.thermal_conductivity,
                        &stkd.top_boundary,
                    ),
                    StackLayer::Channel(channel) if Channel::is_liquid_column(column) => {
                        Conductances::liquid(
                            dims,
                            column,
                            height,
                            channel.coolant.heat_transfer_coefficient,
                            channel.advection_coefficient(dims.n_columns()),
                        )
                    }
                    StackLayer::Channel(channel) => Conductances::solid(
                        dims,
                        layer,
                        column,
                        height,
                        channel.wall_material.thermal_conductivity,
                        &stkd.top_boundary,
                    ),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::dimensions::CellDimensions;

    fn dims(layers: usize) -> Dimensions {
        Dimensions::new(
            CellDimensions {
                first_length: 50.0,
                length: 100.0,
                last_length: 50.0,
                width: 200.0,
            },
            layers,
            2,
            3,
        )
        .unwrap()
    }

    #[test]
    fn test_parallel() {
        assert_eq!(parallel(2.0, 2.0), 1.0);
        assert_eq!(parallel(0.0, 0.0), 0.0);
        assert!((parallel(1.0, 3.0) - 0.75).abs() < 1e-15);
    }

    #[test]
    fn test_solid_lateral() {
        let d = dims(3);
        let g = Conductances::solid(&d, 1, 1, 10.0, 2.0, &TopBoundary::Adiabatic);
        assert_eq!(g.north, 2.0 * 100.0 * 10.0 / 100.0);
        assert_eq!(g.east, 2.0 * 200.0 * 10.0 / 50.0);
        assert_eq!(g.top, 2.0 * 100.0 * 200.0 / 5.0);
        assert_eq!(g.top, g.bottom);

        let edge = Conductances::solid(&d, 1, 0, 10.0, 2.0, &TopBoundary::Adiabatic);
        assert_eq!(edge.east, 2.0 * 200.0 * 10.0 / 25.0);
    }

    #[test]
    fn test_solid_vertical_by_position() {
        let d = dims(3);
        let bottom = Conductances::solid(&d, 0, 1, 10.0, 1.0, &TopBoundary::Adiabatic);
        assert_eq!(bottom.bottom, 0.0);
        assert_eq!(bottom.top, 100.0 * 200.0 / 10.0);

        let top = Conductances::solid(&d, 2, 1, 10.0, 1.0, &TopBoundary::Adiabatic);
        assert_eq!(top.top, 0.0);
        assert_eq!(top.bottom, 100.0 * 200.0 / 10.0);
    }

    #[test]
    fn test_solid_top_to_ambient() {
        let d = dims(2);
        let bc = TopBoundary::Ambient {
            heat_transfer_coefficient: 1e-3,
            ambient_temperature: 300.0,
        };
        let top = Conductances::solid(&d, 1, 1, 10.0, 1.0, &bc);
        let half = 100.0 * 200.0 / 5.0;
        let sink = 1e-3 * 100.0 * 200.0;
        assert!((top.top - half * sink / (half + sink)).abs() < 1e-12);
        assert_eq!(top.bottom, half);
    }

    #[test]
    fn test_liquid_is_asymmetric() {
        let d = dims(3);
        let g = Conductances::liquid(&d, 1, 10.0, 0.5, 7.0);
        assert_eq!(g.north, 7.0);
        assert_eq!(g.south, -7.0);
        assert_eq!(g.east, 0.5 * 200.0 * 10.0);
        assert_eq!(g.top, 0.5 * 100.0 * 200.0);
    }

    #[test]
    fn test_vertical_faces_single_layer() {
        let bc = TopBoundary::Ambient {
            heat_transfer_coefficient: 2.0,
            ambient_temperature: 300.0,
        };
        let (top, bottom) = vertical_faces(LayerPosition::Single, 3.0, 1.0, 1.0, &bc);
        assert!((top - parallel(3.0, 6.0)).abs() < 1e-12);
        assert_eq!(bottom, 0.0);
        let adiabatic =
            vertical_faces(LayerPosition::Single, 3.0, 1.0, 1.0, &TopBoundary::Adiabatic);
        assert_eq!(adiabatic, (0.0, 0.0));
    }
}
