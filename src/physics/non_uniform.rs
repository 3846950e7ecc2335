use super::bc::TopBoundary;
use super::conductances::{parallel, vertical_faces};
use super::floorplan::FloorplanMatrix;
use super::layer::Layer;
use super::stack::{Stack, StackLayer};
use crate::discretization::dimensions::{ChipDimensions, LayerPosition};
use crate::discretization::non_uniform::{Axis, LayerGranularity, NonUniformCell, NonUniformGrid};
use crate::error::{ThermalError, ThermalResult};
use log::info;

/// Conductances of a non-uniform grid, in W/K.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionConductances {
    /// One per connection of the grid, in the grid's order.
    pub links: Vec<f64>,
    /// Link of every cell to the ambient; zero below the top layer.
    pub ambient: Vec<f64>,
}

impl ConnectionConductances {
    pub fn new(grid: &NonUniformGrid) -> Self {
        Self {
            links: vec![0.0; grid.n_connections()],
            ambient: vec![0.0; grid.n_cells()],
        }
    }
}

/// A solid stack discretized on a [`NonUniformGrid`], with the floorplan of
/// every die spread over the cells of its source layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NonUniformLayout {
    grid: NonUniformGrid,
    /// One per die, in stack order.
    floorplans: Vec<FloorplanMatrix>,
}

impl NonUniformLayout {
    /// Channels need the column structure of the uniform grid and are
    /// rejected.
    pub fn new(
        stack: &Stack,
        chip: ChipDimensions,
        granularity: Vec<LayerGranularity>,
    ) -> ThermalResult<Self> {
        if let Some((_, channel)) = stack.channels().next() {
            return Err(ThermalError::InvalidStack(format!(
                "channel `{}` cannot be placed on a non-uniform grid",
                channel.id
            )));
        }
        if granularity.len() != stack.n_layers() {
            return Err(ThermalError::InvalidDimensions(format!(
                "{} layer granularities for a stack of {} layers",
                granularity.len(),
                stack.n_layers()
            )));
        }

        let grid = NonUniformGrid::new(chip, granularity)?;
        let floorplans = stack
            .dies()
            .map(|(source_layer, die)| {
                let cells = &grid.cells()[grid.layer_cells(source_layer)];
                FloorplanMatrix::from_cells(cells, die.floorplan.elements())
            })
            .collect::<ThermalResult<Vec<_>>>()?;

        info!(
            "non-uniform grid: {} cells, {} connections, {} non-zeroes",
            grid.n_cells(),
            grid.n_connections(),
            grid.n_nonzeroes()
        );

        Ok(Self { grid, floorplans })
    }

    pub fn grid(&self) -> &NonUniformGrid {
        &self.grid
    }

    /// Floorplan matrices, one per die in stack order, indexed by cell
    /// offset inside the source layer.
    pub fn floorplans(&self) -> &[FloorplanMatrix] {
        &self.floorplans
    }

    fn solid_layers<'a>(&self, stack: &'a Stack) -> ThermalResult<Vec<&'a Layer>> {
        let layers: Vec<&Layer> = stack
            .layers()
            .filter_map(|(_, layer)| match layer {
                StackLayer::Solid(solid) => Some(solid),
                StackLayer::Channel(_) => None,
            })
            .collect();
        if layers.len() != self.grid.n_layers() || stack.n_layers() != self.grid.n_layers() {
            return Err(ThermalError::WrongConfig(format!(
                "non-uniform grid has {} layers, stack has {} solid layers",
                self.grid.n_layers(),
                layers.len()
            )));
        }
        Ok(layers)
    }

    pub fn fill_conductances(
        &self,
        stack: &Stack,
        top_boundary: &TopBoundary,
        conductances: &mut ConnectionConductances,
    ) -> ThermalResult<()> {
        let layers = self.solid_layers(stack)?;
        let n_layers = layers.len();
        debug_assert_eq!(conductances.links.len(), self.grid.n_connections());

        let lateral = |cell: &NonUniformCell, edge: f64, depth: f64| {
            let layer = layers[cell.layer];
            layer.material.thermal_conductivity * edge * layer.height / (depth / 2.0)
        };
        let faces = |cell: &NonUniformCell, area: f64| {
            let layer = layers[cell.layer];
            vertical_faces(
                LayerPosition::of(cell.layer, n_layers),
                area,
                layer.height,
                layer.material.thermal_conductivity,
                top_boundary,
            )
        };

        let links = conductances.links.iter_mut();
        for (connection, link) in self.grid.connections().iter().zip(links) {
            let a = self.grid.cell(connection.node1);
            let b = self.grid.cell(connection.node2);
            *link = match connection.axis {
                Axis::X => parallel(
                    lateral(a, connection.value, a.length),
                    lateral(b, connection.value, b.length),
                ),
                Axis::Y => parallel(
                    lateral(a, connection.value, a.width),
                    lateral(b, connection.value, b.width),
                ),
                Axis::Vertical => {
                    parallel(faces(a, connection.value).0, faces(b, connection.value).1)
                }
            };
        }

        conductances.ambient.fill(0.0);
        if top_boundary.is_ambient() {
            for cell in self.grid.layer_cells(n_layers - 1) {
                let c = self.grid.cell(cell);
                conductances.ambient[cell] = faces(c, c.area()).0;
            }
        }
        Ok(())
    }

    /// Same contract as [`fill_capacities`](super::fill::fill_capacities).
    pub fn fill_capacities(
        &self,
        stack: &Stack,
        capacities: &mut [f64],
        delta_time: Option<f64>,
    ) -> ThermalResult<()> {
        let layers = self.solid_layers(stack)?;
        debug_assert_eq!(capacities.len(), self.grid.n_cells());

        let Some(delta_time) = delta_time else {
            capacities.fill(0.0);
            return Ok(());
        };
        for (capacity, cell) in capacities.iter_mut().zip(self.grid.cells()) {
            let layer = layers[cell.layer];
            *capacity =
                layer.material.volumetric_heat_capacity * cell.area() * layer.height / delta_time;
        }
        Ok(())
    }

    /// Floorplan powers on the source layers plus the ambient seen through
    /// the top-layer links.
    pub fn fill_sources(
        &self,
        stack: &Stack,
        top_boundary: &TopBoundary,
        conductances: &ConnectionConductances,
        sources: &mut [f64],
    ) {
        debug_assert_eq!(sources.len(), self.grid.n_cells());
        sources.fill(0.0);

        for ((source_layer, die), matrix) in stack.dies().zip(&self.floorplans) {
            let range = self.grid.layer_cells(source_layer);
            matrix.multiply_add(&die.floorplan.powers(), &mut sources[range]);
        }

        if let Some(ambient) = top_boundary.ambient_temperature() {
            for (source, link) in sources.iter_mut().zip(&conductances.ambient) {
                *source += link * ambient;
            }
        }
    }
}
