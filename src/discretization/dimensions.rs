use crate::error::{ThermalError, ThermalResult};
use log::warn;

/// Size of a thermal cell, in µm.
///
/// Every cell shares the same width. Column 0 and the last column may use a
/// different length than the inner columns to model the chip edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellDimensions {
    pub first_length: f64,
    pub length: f64,
    pub last_length: f64,
    pub width: f64,
}

impl CellDimensions {
    pub fn uniform(length: f64, width: f64) -> Self {
        Self {
            first_length: length,
            length,
            last_length: length,
            width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDimensions {
    pub n_layers: usize,
    pub n_rows: usize,
    pub n_columns: usize,
    pub n_cells: usize,
    pub n_nonzeroes: usize,
}

/// Size of the chip footprint, in µm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChipDimensions {
    pub length: f64,
    pub width: f64,
}

/// Position of a layer inside the stack, used by the vertical conductances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerPosition {
    Bottom,
    Center,
    Top,
    /// The stack has a single layer, which is both bottom and top.
    Single,
}

impl LayerPosition {
    pub fn of(layer: usize, n_layers: usize) -> Self {
        match (layer == 0, layer + 1 == n_layers) {
            (true, true) => LayerPosition::Single,
            (true, false) => LayerPosition::Bottom,
            (false, true) => LayerPosition::Top,
            (false, false) => LayerPosition::Center,
        }
    }
}

/// The discretized 3D grid: `n_layers x n_rows x n_columns` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimensions {
    pub cell: CellDimensions,
    pub grid: GridDimensions,
    pub chip: ChipDimensions,
}

impl Dimensions {
    /// Builds the grid from an explicit number of rows and columns. The chip
    /// size follows from the cell sizes.
    pub fn new(
        cell: CellDimensions,
        n_layers: usize,
        n_rows: usize,
        n_columns: usize,
    ) -> ThermalResult<Self> {
        if n_layers == 0 || n_rows == 0 || n_columns == 0 {
            return Err(ThermalError::InvalidDimensions(format!(
                "grid must have at least one cell per axis, got {} x {} x {}",
                n_layers, n_rows, n_columns
            )));
        }
        check_cell(&cell)?;

        let chip_length = match n_columns {
            1 => cell.first_length,
            _ => cell.first_length + cell.last_length + (n_columns - 2) as f64 * cell.length,
        };

        Ok(Self {
            cell,
            grid: GridDimensions {
                n_layers,
                n_rows,
                n_columns,
                n_cells: n_layers * n_rows * n_columns,
                n_nonzeroes: count_nonzeroes(n_layers, n_rows, n_columns),
            },
            chip: ChipDimensions {
                length: chip_length,
                width: n_rows as f64 * cell.width,
            },
        })
    }

    /// Builds the grid covering a chip of `chip_length x chip_width` µm.
    ///
    /// Columns are `(chip_length - first - last) / length + 2` and rows are
    /// `chip_width / width`. A chip that is not an exact multiple of the
    /// cell size is truncated to the cells that fit.
    pub fn from_chip(
        cell: CellDimensions,
        chip_length: f64,
        chip_width: f64,
        n_layers: usize,
    ) -> ThermalResult<Self> {
        check_cell(&cell)?;

        let inner = (chip_length - cell.first_length - cell.last_length) / cell.length;
        let rows = chip_width / cell.width;

        if inner < -1e-9 || rows < 1.0 - 1e-9 {
            return Err(ThermalError::InvalidDimensions(format!(
                "chip {:.2} x {:.2} um is smaller than one cell",
                chip_length, chip_width
            )));
        }

        let n_columns = (inner + 1e-9).floor() as usize + 2;
        let n_rows = (rows + 1e-9).floor() as usize;

        if (inner - inner.round()).abs() > 1e-6 || (rows - rows.round()).abs() > 1e-6 {
            warn!(
                "chip {:.2} x {:.2} um is not a multiple of the cell size, using {} x {} cells",
                chip_length, chip_width, n_rows, n_columns
            );
        }

        Self::new(cell, n_layers, n_rows, n_columns)
    }

    pub fn n_layers(&self) -> usize {
        self.grid.n_layers
    }

    pub fn n_rows(&self) -> usize {
        self.grid.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.grid.n_columns
    }

    pub fn n_cells(&self) -> usize {
        self.grid.n_cells
    }

    pub fn n_nonzeroes(&self) -> usize {
        self.grid.n_nonzeroes
    }

    pub fn layer_area(&self) -> usize {
        self.grid.n_rows * self.grid.n_columns
    }

    pub fn last_row(&self) -> usize {
        self.grid.n_rows - 1
    }

    pub fn last_column(&self) -> usize {
        self.grid.n_columns - 1
    }

    pub fn last_layer(&self) -> usize {
        self.grid.n_layers - 1
    }

    pub fn cell_length(&self, column: usize) -> f64 {
        debug_assert!(column < self.grid.n_columns);
        if column == 0 {
            self.cell.first_length
        } else if column == self.last_column() {
            self.cell.last_length
        } else {
            self.cell.length
        }
    }

    pub fn cell_width(&self) -> f64 {
        self.cell.width
    }

    pub fn cell_offset_in_layer(&self, row: usize, column: usize) -> usize {
        debug_assert!(row < self.grid.n_rows && column < self.grid.n_columns);
        row * self.grid.n_columns + column
    }

    pub fn cell_offset_in_stack(&self, layer: usize, row: usize, column: usize) -> usize {
        debug_assert!(layer < self.grid.n_layers);
        layer * self.layer_area() + self.cell_offset_in_layer(row, column)
    }

    /// Inverse of [`Dimensions::cell_offset_in_stack`].
    pub fn cell_coordinates(&self, offset: usize) -> (usize, usize, usize) {
        let layer = offset / self.layer_area();
        let in_layer = offset % self.layer_area();
        (layer, in_layer / self.grid.n_columns, in_layer % self.grid.n_columns)
    }

    pub fn layer_position(&self, layer: usize) -> LayerPosition {
        LayerPosition::of(layer, self.grid.n_layers)
    }

    /// West edge of `column`, measured from the chip origin.
    pub fn cell_location_x(&self, column: usize) -> f64 {
        match column {
            0 => 0.0,
            c => self.cell.first_length + (c - 1) as f64 * self.cell.length,
        }
    }

    /// South edge of `row`, measured from the chip origin.
    pub fn cell_location_y(&self, row: usize) -> f64 {
        row as f64 * self.cell.width
    }

    pub fn top_surface(&self, column: usize) -> f64 {
        self.cell_length(column) * self.cell.width
    }

    pub fn bottom_surface(&self, column: usize) -> f64 {
        self.top_surface(column)
    }

    pub fn north_surface(&self, column: usize, height: f64) -> f64 {
        self.cell_length(column) * height
    }

    pub fn south_surface(&self, column: usize, height: f64) -> f64 {
        self.north_surface(column, height)
    }

    pub fn east_surface(&self, height: f64) -> f64 {
        self.cell.width * height
    }

    pub fn west_surface(&self, height: f64) -> f64 {
        self.east_surface(height)
    }

    pub fn cell_volume(&self, column: usize, height: f64) -> f64 {
        self.top_surface(column) * height
    }

    /// Column containing the abscissa `x`, if it is on the chip.
    pub fn column_at(&self, x: f64) -> Option<usize> {
        if !(0.0..=self.chip.length).contains(&x) {
            return None;
        }
        (0..self.grid.n_columns)
            .find(|&c| x < self.cell_location_x(c) + self.cell_length(c))
            .or(Some(self.last_column()))
    }

    /// Row containing the ordinate `y`, if it is on the chip.
    pub fn row_at(&self, y: f64) -> Option<usize> {
        if !(0.0..=self.chip.width).contains(&y) {
            return None;
        }
        Some(((y / self.cell.width) as usize).min(self.last_row()))
    }
}

fn check_cell(cell: &CellDimensions) -> ThermalResult<()> {
    let sizes = [cell.first_length, cell.length, cell.last_length, cell.width];
    if sizes.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(ThermalError::InvalidDimensions(format!(
            "cell sizes must be positive, got {:?}",
            cell
        )));
    }
    Ok(())
}

/// Number of stencil entries of the full grid.
///
/// Each row of a layer contributes one diagonal and two entries per
/// east/west pair, each column two entries per north/south pair, and each
/// pair of stacked layers two entries per cell.
pub fn count_nonzeroes(n_layers: usize, n_rows: usize, n_columns: usize) -> usize {
    let in_layer = n_rows * (3 * n_columns - 2) + 2 * n_columns * (n_rows - 1);
    n_layers * in_layer + (n_layers - 1) * 2 * n_rows * n_columns
}
