use crate::discretization::dimensions::Dimensions;
use crate::discretization::non_uniform::NonUniformCell;
use crate::error::{ThermalError, ThermalResult};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// FIFO of power values, in W.
pub type PowersQueue = VecDeque<f64>;

/// An axis-aligned rectangle of the die surface, in µm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcElement {
    pub sw_x: f64,
    pub sw_y: f64,
    pub length: f64,
    pub width: f64,
}

impl IcElement {
    pub fn new(sw_x: f64, sw_y: f64, length: f64, width: f64) -> Self {
        Self {
            sw_x,
            sw_y,
            length,
            width,
        }
    }

    pub fn area(&self) -> f64 {
        self.length * self.width
    }

    pub fn ne_x(&self) -> f64 {
        self.sw_x + self.length
    }

    pub fn ne_y(&self) -> f64 {
        self.sw_y + self.width
    }

    /// Touching edges do not count as an overlap.
    pub fn overlaps(&self, other: &IcElement) -> bool {
        self.sw_x < other.ne_x()
            && other.sw_x < self.ne_x()
            && self.sw_y < other.ne_y()
            && other.sw_y < self.ne_y()
    }

    pub fn is_inside(&self, dims: &Dimensions) -> bool {
        let eps = 1e-9 * dims.chip.length.max(dims.chip.width);
        self.sw_x >= -eps
            && self.sw_y >= -eps
            && self.ne_x() <= dims.chip.length + eps
            && self.ne_y() <= dims.chip.width + eps
    }

    /// Area shared with the rectangle of south-west corner `(x0, y0)`.
    pub fn overlap_area(&self, x0: f64, y0: f64, length: f64, width: f64) -> f64 {
        let dx = self.ne_x().min(x0 + length) - self.sw_x.max(x0);
        let dy = self.ne_y().min(y0 + width) - self.sw_y.max(y0);
        if dx > 0.0 && dy > 0.0 { dx * dy } else { 0.0 }
    }

    /// Area shared with the cell at `(row, column)`.
    pub fn overlap_with_cell(&self, dims: &Dimensions, row: usize, column: usize) -> f64 {
        self.overlap_area(
            dims.cell_location_x(column),
            dims.cell_location_y(row),
            dims.cell_length(column),
            dims.cell_width(),
        )
    }
}

/// A named power-dissipating block made of one or more rectangles.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorplanElement {
    pub id: String,
    pub ic_elements: Vec<IcElement>,
    /// Power currently dissipated, in W.
    pub power: f64,
    pub pending_powers: PowersQueue,
}

impl FloorplanElement {
    pub fn new(id: impl Into<String>, ic_elements: Vec<IcElement>) -> Self {
        Self {
            id: id.into(),
            ic_elements,
            power: 0.0,
            pending_powers: PowersQueue::new(),
        }
    }

    pub fn with_power_values(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.pending_powers.extend(values);
        self
    }

    pub fn area(&self) -> f64 {
        self.ic_elements.iter().map(IcElement::area).sum()
    }
}

/// Sparse `cells x elements` matrix in compressed-column storage.
///
/// Entry `(cell, element)` holds the fraction of the element's area that
/// falls onto `cell`, so `sources = matrix * powers` spreads every power
/// value over the cells of the source layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloorplanMatrix {
    pub n_rows: usize,
    pub n_columns: usize,
    pub column_pointers: Vec<usize>,
    pub row_indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl FloorplanMatrix {
    pub fn build(dims: &Dimensions, elements: &[FloorplanElement]) -> ThermalResult<Self> {
        let columns = dims.n_columns();
        Self::from_overlaps(dims.layer_area(), elements, |ic, cell| {
            ic.overlap_with_cell(dims, cell / columns, cell % columns)
        })
    }

    /// Matrix over the cells of one layer of a non-uniform grid.
    pub fn from_cells(
        cells: &[NonUniformCell],
        elements: &[FloorplanElement],
    ) -> ThermalResult<Self> {
        Self::from_overlaps(cells.len(), elements, |ic, cell| {
            let c = &cells[cell];
            ic.overlap_area(c.left_x, c.left_y, c.length, c.width)
        })
    }

    /// `overlap(ic, cell)` is the area `ic` shares with `cell`.
    fn from_overlaps<F>(
        n_cells: usize,
        elements: &[FloorplanElement],
        overlap: F,
    ) -> ThermalResult<Self>
    where
        F: Fn(&IcElement, usize) -> f64,
    {
        let mut column_pointers = Vec::with_capacity(elements.len() + 1);
        let mut row_indices = Vec::new();
        let mut values = Vec::new();

        column_pointers.push(0);

        for element in elements {
            let area = element.area();
            let mut shares: BTreeMap<usize, f64> = BTreeMap::new();

            for ic in &element.ic_elements {
                for cell in 0..n_cells {
                    let shared = overlap(ic, cell);
                    if shared > 0.0 {
                        *shares.entry(cell).or_insert(0.0) += shared / area;
                    }
                }
            }

            if shares.is_empty() {
                return Err(ThermalError::EmptyElement(element.id.clone()));
            }

            for (cell, share) in shares {
                row_indices.push(cell);
                values.push(share);
            }
            column_pointers.push(row_indices.len());
        }

        Ok(Self {
            n_rows: n_cells,
            n_columns: elements.len(),
            column_pointers,
            row_indices,
            values,
        })
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// `out += self * powers`, with `out` indexed by cell offset in the layer.
    pub fn multiply_add(&self, powers: &[f64], out: &mut [f64]) {
        debug_assert_eq!(powers.len(), self.n_columns);
        debug_assert_eq!(out.len(), self.n_rows);
        for (column, power) in powers.iter().enumerate() {
            let range = self.column_pointers[column]..self.column_pointers[column + 1];
            for k in range {
                out[self.row_indices[k]] += self.values[k] * power;
            }
        }
    }

    /// Cells (offsets in the layer) covered by `element`.
    pub fn cells(&self, element: usize) -> &[usize] {
        &self.row_indices[self.column_pointers[element]..self.column_pointers[element + 1]]
    }
}

/// The floorplan of a die's source layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Floorplan {
    elements: Vec<FloorplanElement>,
    index: HashMap<String, usize>,
    matrix: FloorplanMatrix,
}

impl Floorplan {
    /// Checks ids and mutual overlaps. The floorplan is unusable until it
    /// has been aligned to a grid with [`Floorplan::align`].
    pub fn new(elements: Vec<FloorplanElement>) -> ThermalResult<Self> {
        let mut index = HashMap::with_capacity(elements.len());
        for (position, element) in elements.iter().enumerate() {
            if index.insert(element.id.clone(), position).is_some() {
                return Err(ThermalError::DuplicateId(element.id.clone()));
            }
            if element.ic_elements.is_empty() || element.area() <= 0.0 {
                return Err(ThermalError::EmptyElement(element.id.clone()));
            }
        }

        for (i, a) in elements.iter().enumerate() {
            for b in &elements[i + 1..] {
                if a.ic_elements.iter().any(|x| b.ic_elements.iter().any(|y| x.overlaps(y))) {
                    return Err(ThermalError::OverlappingElements(a.id.clone(), b.id.clone()));
                }
            }
            let ics = &a.ic_elements;
            for (j, x) in ics.iter().enumerate() {
                if ics[j + 1..].iter().any(|y| x.overlaps(y)) {
                    return Err(ThermalError::OverlappingElements(a.id.clone(), a.id.clone()));
                }
            }
        }

        Ok(Self {
            elements,
            index,
            matrix: FloorplanMatrix::default(),
        })
    }

    pub fn align(&mut self, dims: &Dimensions) -> ThermalResult<()> {
        if let Some(outside) = self
            .elements
            .iter()
            .find(|e| e.ic_elements.iter().any(|ic| !ic.is_inside(dims)))
        {
            return Err(ThermalError::ElementOutsideChip(outside.id.clone()));
        }
        self.matrix = FloorplanMatrix::build(dims, &self.elements)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[FloorplanElement] {
        &self.elements
    }

    pub fn find(&self, id: &str) -> Option<&FloorplanElement> {
        self.index.get(id).map(|&i| &self.elements[i])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn matrix(&self) -> &FloorplanMatrix {
        &self.matrix
    }

    pub fn powers(&self) -> Vec<f64> {
        self.elements.iter().map(|e| e.power).collect()
    }

    pub(crate) fn set_power(&mut self, element: usize, power: f64) {
        self.elements[element].power = power;
    }

    /// Adds the power of every element to `layer_sources`.
    pub fn fill_sources(&self, layer_sources: &mut [f64]) {
        self.matrix.multiply_add(&self.powers(), layer_sources);
    }

    /// Moves one value per element from `queue` to the elements' own queues.
    /// The caller checks that `queue` holds enough values.
    pub(crate) fn take_power_values(&mut self, queue: &mut PowersQueue) {
        for element in &mut self.elements {
            if let Some(value) = queue.pop_front() {
                element.pending_powers.push_back(value);
            }
        }
    }

    pub(crate) fn has_pending_powers(&self) -> bool {
        self.elements.iter().all(|e| !e.pending_powers.is_empty())
    }

    pub(crate) fn pop_power_values(&mut self) {
        for element in &mut self.elements {
            if let Some(value) = element.pending_powers.pop_front() {
                element.power = value;
            }
        }
    }
}
