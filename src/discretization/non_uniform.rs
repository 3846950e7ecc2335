use crate::discretization::dimensions::ChipDimensions;
use crate::error::{ThermalError, ThermalResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Number of cells a layer is split into. Every layer covers the whole chip,
/// so layers may use different resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerGranularity {
    pub n_rows: usize,
    pub n_columns: usize,
}

impl LayerGranularity {
    pub fn new(n_rows: usize, n_columns: usize) -> Self {
        Self { n_rows, n_columns }
    }

    pub fn n_cells(&self) -> usize {
        self.n_rows * self.n_columns
    }
}

/// A cell of a non-uniform grid, positioned by its south-west corner (µm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonUniformCell {
    pub layer: usize,
    pub left_x: f64,
    pub left_y: f64,
    pub length: f64,
    pub width: f64,
}

impl NonUniformCell {
    pub fn area(&self) -> f64 {
        self.length * self.width
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.left_x..=self.left_x + self.length).contains(&x)
            && (self.left_y..=self.left_y + self.width).contains(&y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Between two layers.
    Vertical,
    /// East-west, inside a layer.
    X,
    /// North-south, inside a layer.
    Y,
}

/// Thermal link between two cells of a non-uniform grid.
///
/// `node1` is the west, south or lower cell. `value` is the length of the
/// shared edge for lateral links and the shared area for vertical ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub node1: usize,
    pub node2: usize,
    pub axis: Axis,
    pub value: f64,
}

/// Cell list and connection list of a grid whose layers use their own
/// row/column split of the chip.
///
/// Cells are numbered layer by layer, rows then columns inside a layer, the
/// same way the uniform grid is.
#[derive(Debug, Clone, PartialEq)]
pub struct NonUniformGrid {
    chip: ChipDimensions,
    granularity: Vec<LayerGranularity>,
    /// First cell of every layer, plus the total.
    offsets: Vec<usize>,
    cells: Vec<NonUniformCell>,
    connections: Vec<Connection>,
}

impl NonUniformGrid {
    pub fn new(chip: ChipDimensions, granularity: Vec<LayerGranularity>) -> ThermalResult<Self> {
        if granularity.is_empty() {
            return Err(ThermalError::InvalidDimensions(
                "non-uniform grid without layers".to_string(),
            ));
        }
        if let Some((layer, g)) = granularity
            .iter()
            .enumerate()
            .find(|(_, g)| g.n_rows == 0 || g.n_columns == 0)
        {
            return Err(ThermalError::InvalidDimensions(format!(
                "layer {} split in {} x {} cells",
                layer, g.n_rows, g.n_columns
            )));
        }

        let mut offsets = Vec::with_capacity(granularity.len() + 1);
        let mut cells = Vec::new();
        offsets.push(0);
        for (layer, g) in granularity.iter().enumerate() {
            let length = chip.length / g.n_columns as f64;
            let width = chip.width / g.n_rows as f64;
            for row in 0..g.n_rows {
                for column in 0..g.n_columns {
                    cells.push(NonUniformCell {
                        layer,
                        left_x: column as f64 * length,
                        left_y: row as f64 * width,
                        length,
                        width,
                    });
                }
            }
            offsets.push(cells.len());
        }

        let mut grid = Self {
            chip,
            granularity,
            offsets,
            cells,
            connections: Vec::new(),
        };
        grid.connections = grid.connect();
        Ok(grid)
    }

    fn connect(&self) -> Vec<Connection> {
        let mut connections = Vec::new();

        for (layer, g) in self.granularity.iter().enumerate() {
            let length = self.chip.length / g.n_columns as f64;
            let width = self.chip.width / g.n_rows as f64;
            for row in 0..g.n_rows {
                for column in 0..g.n_columns {
                    let cell = self.cell_offset(layer, row, column);
                    if column + 1 < g.n_columns {
                        connections.push(Connection {
                            node1: cell,
                            node2: cell + 1,
                            axis: Axis::X,
                            value: width,
                        });
                    }
                    if row + 1 < g.n_rows {
                        connections.push(Connection {
                            node1: cell,
                            node2: cell + g.n_columns,
                            axis: Axis::Y,
                            value: length,
                        });
                    }
                }
            }
        }

        for (layer, pair) in self.granularity.windows(2).enumerate() {
            let (lower, upper) = (pair[0], pair[1]);
            let xs = interval_overlaps(self.chip.length, lower.n_columns, upper.n_columns);
            let ys = interval_overlaps(self.chip.width, lower.n_rows, upper.n_rows);
            for &(lower_row, upper_row, dy) in &ys {
                for &(lower_column, upper_column, dx) in &xs {
                    connections.push(Connection {
                        node1: self.cell_offset(layer, lower_row, lower_column),
                        node2: self.cell_offset(layer + 1, upper_row, upper_column),
                        axis: Axis::Vertical,
                        value: dx * dy,
                    });
                }
            }
        }

        connections
    }

    pub fn chip(&self) -> ChipDimensions {
        self.chip
    }

    pub fn n_layers(&self) -> usize {
        self.granularity.len()
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn n_connections(&self) -> usize {
        self.connections.len()
    }

    /// One diagonal per cell and two entries per connection.
    pub fn n_nonzeroes(&self) -> usize {
        self.n_cells() + 2 * self.n_connections()
    }

    pub fn granularity(&self, layer: usize) -> LayerGranularity {
        self.granularity[layer]
    }

    pub fn cells(&self) -> &[NonUniformCell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> &NonUniformCell {
        &self.cells[index]
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn layer_cells(&self, layer: usize) -> Range<usize> {
        self.offsets[layer]..self.offsets[layer + 1]
    }

    pub fn cell_offset(&self, layer: usize, row: usize, column: usize) -> usize {
        debug_assert!(row < self.granularity[layer].n_rows);
        self.offsets[layer] + row * self.granularity[layer].n_columns + column
    }

    /// `(layer, row, column)` of a cell.
    pub fn cell_coordinates(&self, index: usize) -> (usize, usize, usize) {
        let layer = self.cells[index].layer;
        let in_layer = index - self.offsets[layer];
        let columns = self.granularity[layer].n_columns;
        (layer, in_layer / columns, in_layer % columns)
    }

    /// Cell of `layer` containing the point `(x, y)`, if it is on the chip.
    pub fn cell_at(&self, layer: usize, x: f64, y: f64) -> Option<usize> {
        if layer >= self.n_layers()
            || !(0.0..=self.chip.length).contains(&x)
            || !(0.0..=self.chip.width).contains(&y)
        {
            return None;
        }
        let g = self.granularity[layer];
        let column = ((x / self.chip.length * g.n_columns as f64) as usize).min(g.n_columns - 1);
        let row = ((y / self.chip.width * g.n_rows as f64) as usize).min(g.n_rows - 1);
        Some(self.cell_offset(layer, row, column))
    }
}

/// Overlaps between the `n_a` and `n_b` equal parts of `[0, extent]`, as
/// `(part of a, part of b, shared length)`.
///
/// Boundaries sit at `i * n_b` and `j * n_a` on an integer scale of
/// `n_a * n_b` units, so touching parts never produce a sliver.
fn interval_overlaps(extent: f64, n_a: usize, n_b: usize) -> Vec<(usize, usize, f64)> {
    let unit = extent / (n_a * n_b) as f64;
    let mut overlaps = Vec::with_capacity(n_a + n_b);
    let (mut i, mut j) = (0, 0);
    while i < n_a && j < n_b {
        let start = (i * n_b).max(j * n_a);
        let end_a = (i + 1) * n_b;
        let end_b = (j + 1) * n_a;
        let end = end_a.min(end_b);
        if end > start {
            overlaps.push((i, j, (end - start) as f64 * unit));
        }
        if end_a <= end_b {
            i += 1;
        }
        if end_b <= end_a {
            j += 1;
        }
    }
    overlaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chip() -> ChipDimensions {
        ChipDimensions {
            length: 300.0,
            width: 200.0,
        }
    }

    #[test]
    fn test_interval_overlaps() {
        let same = interval_overlaps(3.0, 3, 3);
        assert_eq!(same, vec![(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)]);

        // thirds against halves
        let mixed = interval_overlaps(6.0, 3, 2);
        assert_eq!(mixed.len(), 4);
        assert_eq!((mixed[1].0, mixed[1].1), (1, 0));
        assert!((mixed[1].2 - 1.0).abs() < 1e-12);
        let total: f64 = mixed.iter().map(|o| o.2).sum();
        assert!((total - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_cells_tile_every_layer() {
        let granularity = vec![LayerGranularity::new(2, 3), LayerGranularity::new(1, 1)];
        let grid = NonUniformGrid::new(chip(), granularity).unwrap();
        assert_eq!(grid.n_cells(), 7);
        assert_eq!(grid.layer_cells(1), 6..7);
        for layer in 0..2 {
            let area: f64 = grid.cells()[grid.layer_cells(layer)].iter().map(|c| c.area()).sum();
            assert!((area - 300.0 * 200.0).abs() < 1e-9);
        }
        assert_eq!(grid.cell_coordinates(4), (0, 1, 1));
        assert_eq!(grid.cell_at(0, 150.0, 150.0), Some(4));
        assert_eq!(grid.cell_at(1, 299.0, 10.0), Some(6));
        assert_eq!(grid.cell_at(0, 301.0, 10.0), None);
    }

    #[test]
    fn test_connections() {
        let granularity = vec![LayerGranularity::new(2, 3), LayerGranularity::new(1, 1)];
        let grid = NonUniformGrid::new(chip(), granularity).unwrap();
        let lateral = grid.connections().iter().filter(|c| c.axis != Axis::Vertical).count();
        let vertical: Vec<_> =
            grid.connections().iter().filter(|c| c.axis == Axis::Vertical).collect();
        // 2 rows x 2 east-west links + 3 columns x 1 north-south link
        assert_eq!(lateral, 7);
        assert_eq!(vertical.len(), 6);
        assert!(vertical.iter().all(|c| c.node2 == 6 && (c.value - 100.0 * 100.0).abs() < 1e-9));
        assert_eq!(grid.n_nonzeroes(), 7 + 2 * 13);

        let x = grid.connections().iter().find(|c| c.axis == Axis::X).unwrap();
        assert_eq!((x.node1, x.node2, x.value), (0, 1, 100.0));
    }

    #[test]
    fn test_uniform_split_matches_the_stencil_count() {
        let granularity = vec![LayerGranularity::new(3, 4); 2];
        let grid = NonUniformGrid::new(chip(), granularity).unwrap();
        assert_eq!(
            grid.n_nonzeroes(),
            crate::discretization::dimensions::count_nonzeroes(2, 3, 4)
        );
    }

    #[test]
    fn test_rejects_empty_layers() {
        assert!(NonUniformGrid::new(chip(), vec![]).is_err());
        assert!(NonUniformGrid::new(chip(), vec![LayerGranularity::new(0, 2)]).is_err());
    }
}
