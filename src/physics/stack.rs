use super::bc::TopBoundary;
use super::channel::{flow_rate_from_ml_per_min, Channel};
use super::die::Die;
use super::floorplan::{Floorplan, PowersQueue};
use super::layer::Layer;
use super::non_uniform::NonUniformLayout;
use crate::discretization::dimensions::{CellDimensions, Dimensions, LayerPosition};
use crate::discretization::non_uniform::LayerGranularity;
use crate::error::{ThermalError, ThermalResult};
use log::{info, warn};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum StackElementKind {
    Layer(Layer),
    Die(Die),
    Channel(Channel),
}

impl StackElementKind {
    pub fn num_layers(&self) -> usize {
        match self {
            StackElementKind::Layer(_) | StackElementKind::Channel(_) => 1,
            StackElementKind::Die(die) => die.layers.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackElement {
    pub id: String,
    pub kind: StackElementKind,
    /// Grid layer of the element's bottom-most layer.
    pub first_layer: usize,
}

/// One grid layer, as seen by the fill and assembly traversals.
#[derive(Debug, Clone, Copy)]
pub enum StackLayer<'a> {
    Solid(&'a Layer),
    Channel(&'a Channel),
}

impl StackLayer<'_> {
    pub fn height(&self) -> f64 {
        match self {
            StackLayer::Solid(layer) => layer.height,
            StackLayer::Channel(channel) => channel.height,
        }
    }

    pub fn is_liquid(&self, column: usize) -> bool {
        matches!(self, StackLayer::Channel(_)) && Channel::is_liquid_column(column)
    }
}

/// Ordered stack of elements, bottom first, with an id index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stack {
    elements: Vec<StackElement>,
    index: HashMap<String, usize>,
    n_layers: usize,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `kind` on top of the elements pushed so far.
    pub fn push(&mut self, id: impl Into<String>, kind: StackElementKind) -> ThermalResult<()> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(ThermalError::DuplicateId(id));
        }
        let first_layer = self.n_layers;
        self.n_layers += kind.num_layers();
        self.index.insert(id.clone(), self.elements.len());
        self.elements.push(StackElement {
            id,
            kind,
            first_layer,
        });
        Ok(())
    }

    pub fn with(mut self, id: impl Into<String>, kind: StackElementKind) -> ThermalResult<Self> {
        self.push(id, kind)?;
        Ok(self)
    }

    pub fn n_layers(&self) -> usize {
        self.n_layers
    }

    pub fn elements(&self) -> &[StackElement] {
        &self.elements
    }

    pub fn find(&self, id: &str) -> ThermalResult<&StackElement> {
        self.index
            .get(id)
            .map(|&i| &self.elements[i])
            .ok_or_else(|| ThermalError::UnknownElement(id.to_string()))
    }

    /// Every grid layer in stack order, with its index.
    pub fn layers(&self) -> impl Iterator<Item = (usize, StackLayer<'_>)> + '_ {
        self.elements
            .iter()
            .flat_map(|element| {
                let (single, die_layers): (Option<StackLayer<'_>>, &[Layer]) = match &element.kind {
                    StackElementKind::Layer(layer) => (Some(StackLayer::Solid(layer)), &[]),
                    StackElementKind::Channel(channel) => (Some(StackLayer::Channel(channel)), &[]),
                    StackElementKind::Die(die) => (None, die.layers.as_slice()),
                };
                single.into_iter().chain(die_layers.iter().map(StackLayer::Solid))
            })
            .enumerate()
    }

    pub fn channels(&self) -> impl Iterator<Item = (usize, &Channel)> + '_ {
        self.elements.iter().filter_map(|e| match &e.kind {
            StackElementKind::Channel(channel) => Some((e.first_layer, channel)),
            _ => None,
        })
    }

    pub fn has_channels(&self) -> bool {
        self.channels().next().is_some()
    }

    /// Checks every layer, channel and material of the stack.
    pub fn validate(&self) -> ThermalResult<()> {
        for element in &self.elements {
            match &element.kind {
                StackElementKind::Layer(layer) => layer.validate()?,
                StackElementKind::Die(die) => die.layers.iter().try_for_each(Layer::validate)?,
                StackElementKind::Channel(channel) => channel.validate()?,
            }
        }
        Ok(())
    }

    /// Dies with the grid layer of their source layer.
    pub fn dies(&self) -> impl Iterator<Item = (usize, &Die)> + '_ {
        self.elements.iter().filter_map(|e| match &e.kind {
            StackElementKind::Die(die) => Some((e.first_layer + die.source_layer, die)),
            _ => None,
        })
    }

    fn floorplans_mut(&mut self) -> impl Iterator<Item = &mut Floorplan> + '_ {
        self.elements.iter_mut().filter_map(|e| match &mut e.kind {
            StackElementKind::Die(die) => Some(&mut die.floorplan),
            _ => None,
        })
    }

    fn channels_mut(&mut self) -> impl Iterator<Item = &mut Channel> + '_ {
        self.elements.iter_mut().filter_map(|e| match &mut e.kind {
            StackElementKind::Channel(channel) => Some(channel),
            _ => None,
        })
    }
}

/// A stack bound to its grid, plus the dirty flags consumed by
/// [`ThermalData::fill`](crate::simulation::thermal_data::ThermalData::fill).
///
/// `dimensions` always describes the uniform grid. When a non-uniform grid
/// is set, the cells it defines replace the uniform ones in every fill.
#[derive(Debug, Clone, PartialEq)]
pub struct StackDescription {
    pub dimensions: Dimensions,
    pub stack: Stack,
    pub top_boundary: TopBoundary,
    non_uniform: Option<NonUniformLayout>,
    pub(crate) structure_changed: bool,
    pub(crate) flow_rate_changed: bool,
    pub(crate) power_values_changed: bool,
}

impl StackDescription {
    /// Grid of `n_rows x n_columns` cells per layer.
    pub fn new(
        stack: Stack,
        cell: CellDimensions,
        n_rows: usize,
        n_columns: usize,
        top_boundary: TopBoundary,
    ) -> ThermalResult<Self> {
        let dimensions = Dimensions::new(cell, stack.n_layers().max(1), n_rows, n_columns)?;
        Self::bind(stack, dimensions, top_boundary)
    }

    /// Grid covering a chip of `chip_length x chip_width` µm.
    pub fn from_chip(
        stack: Stack,
        cell: CellDimensions,
        chip_length: f64,
        chip_width: f64,
        top_boundary: TopBoundary,
    ) -> ThermalResult<Self> {
        let n_layers = stack.n_layers().max(1);
        let dimensions = Dimensions::from_chip(cell, chip_length, chip_width, n_layers)?;
        Self::bind(stack, dimensions, top_boundary)
    }

    fn bind(
        mut stack: Stack,
        dimensions: Dimensions,
        top_boundary: TopBoundary,
    ) -> ThermalResult<Self> {
        if stack.n_layers() == 0 {
            return Err(ThermalError::InvalidStack("stack is empty".to_string()));
        }
        stack.validate()?;
        top_boundary.validate()?;

        for (layer, channel) in stack.channels() {
            let columns = dimensions.n_columns();
            if columns < 3 || columns % 2 == 0 {
                return Err(ThermalError::InvalidStack(format!(
                    "channel `{}` needs an odd number of columns (at least 3), grid has {}",
                    channel.id, columns
                )));
            }
            match dimensions.layer_position(layer) {
                LayerPosition::Bottom | LayerPosition::Single => {
                    warn!("channel `{}` on the bottom layer is not supported", channel.id)
                }
                LayerPosition::Top => {
                    warn!("channel `{}` on the top layer is not supported", channel.id)
                }
                LayerPosition::Center => {}
            }
        }

        for floorplan in stack.floorplans_mut() {
            floorplan.align(&dimensions)?;
        }

        info!(
            "stack: {} x {} x {} cells, {} non-zeroes",
            dimensions.n_layers(),
            dimensions.n_rows(),
            dimensions.n_columns(),
            dimensions.n_nonzeroes()
        );

        Ok(Self {
            dimensions,
            stack,
            top_boundary,
            non_uniform: None,
            structure_changed: false,
            flow_rate_changed: true,
            power_values_changed: true,
        })
    }

    /// Discretizes every layer with its own `rows x columns` split of the
    /// chip. Stacks with channels are rejected.
    pub fn with_non_uniform_grid(
        mut self,
        granularity: Vec<LayerGranularity>,
    ) -> ThermalResult<Self> {
        self.set_non_uniform_grid(Some(granularity))?;
        Ok(self)
    }

    /// Switches between the uniform grid (`None`) and a non-uniform one.
    ///
    /// The cell count changes, so the next fill reallocates the thermal
    /// data and restarts from the initial temperature.
    pub fn set_non_uniform_grid(
        &mut self,
        granularity: Option<Vec<LayerGranularity>>,
    ) -> ThermalResult<()> {
        self.non_uniform = match granularity {
            Some(granularity) => {
                Some(NonUniformLayout::new(&self.stack, self.dimensions.chip, granularity)?)
            }
            None => None,
        };
        self.structure_changed = true;
        self.flow_rate_changed = true;
        self.power_values_changed = true;
        Ok(())
    }

    pub fn non_uniform(&self) -> Option<&NonUniformLayout> {
        self.non_uniform.as_ref()
    }

    /// Cells of the grid in use.
    pub fn n_cells(&self) -> usize {
        match &self.non_uniform {
            Some(layout) => layout.grid().n_cells(),
            None => self.dimensions.n_cells(),
        }
    }

    /// Entries of the system matrix on the grid in use.
    pub fn n_nonzeroes(&self) -> usize {
        match &self.non_uniform {
            Some(layout) => layout.grid().n_nonzeroes(),
            None => self.dimensions.n_nonzeroes(),
        }
    }

    /// `(layer, row, column)` of a cell of the grid in use.
    pub fn cell_coordinates(&self, cell: usize) -> (usize, usize, usize) {
        match &self.non_uniform {
            Some(layout) => layout.grid().cell_coordinates(cell),
            None => self.dimensions.cell_coordinates(cell),
        }
    }

    pub fn total_number_of_floorplan_elements(&self) -> usize {
        self.stack.dies().map(|(_, die)| die.floorplan.len()).sum()
    }

    /// Sets the flow rate, in ml/min, of every channel of the stack.
    pub fn change_coolant_flow_rate(&mut self, flow_rate_ml_per_min: f64) {
        let flow_rate = flow_rate_from_ml_per_min(flow_rate_ml_per_min);
        for channel in self.stack.channels_mut() {
            channel.flow_rate = flow_rate;
        }
        self.flow_rate_changed = true;
    }

    /// Moves one power value per floorplan element from `queue` into the
    /// elements' own queues, in stack then declaration order.
    ///
    /// Nothing is consumed when `queue` holds fewer values than elements.
    pub fn insert_power_values(&mut self, queue: &mut PowersQueue) -> ThermalResult<()> {
        let expected = self.total_number_of_floorplan_elements();
        if queue.len() < expected {
            return Err(ThermalError::NotEnoughPowerValues {
                expected,
                found: queue.len(),
            });
        }
        for floorplan in self.stack.floorplans_mut() {
            floorplan.take_power_values(queue);
        }
        Ok(())
    }

    /// Makes the next queued power value of every element current.
    ///
    /// Returns `false`, and leaves every element untouched, when some element
    /// has no queued value or when the stack has no floorplan element.
    pub fn pop_power_values(&mut self) -> bool {
        if self.total_number_of_floorplan_elements() == 0
            || !self.stack.dies().all(|(_, die)| die.floorplan.has_pending_powers())
        {
            return false;
        }
        for floorplan in self.stack.floorplans_mut() {
            floorplan.pop_power_values();
        }
        self.power_values_changed = true;
        true
    }

    /// Sets the current power of a single element.
    pub fn set_power(&mut self, die_id: &str, element: &str, power: f64) -> ThermalResult<()> {
        let position = self
            .stack
            .index
            .get(die_id)
            .copied()
            .ok_or_else(|| ThermalError::UnknownElement(die_id.to_string()))?;
        let StackElementKind::Die(die) = &mut self.stack.elements[position].kind else {
            return Err(ThermalError::UnknownElement(die_id.to_string()));
        };
        let slot = die
            .floorplan
            .position(element)
            .ok_or_else(|| ThermalError::UnknownElement(format!("{}.{}", die.id, element)))?;
        die.floorplan.set_power(slot, power);
        self.power_values_changed = true;
        Ok(())
    }

    pub fn flow_rate_changed(&self) -> bool {
        self.flow_rate_changed
    }

    pub fn power_values_changed(&self) -> bool {
        self.power_values_changed
    }

    pub fn structure_changed(&self) -> bool {
        self.structure_changed
    }
}
