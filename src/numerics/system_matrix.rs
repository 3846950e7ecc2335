use crate::discretization::dimensions::Dimensions;
use crate::discretization::non_uniform::NonUniformGrid;
use crate::error::{ThermalError, ThermalResult};
use crate::physics::bc::TopBoundary;
use crate::physics::conductances::{parallel, Conductances};
use crate::physics::non_uniform::ConnectionConductances;
use crate::physics::stack::StackDescription;
use std::cmp::Reverse;
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Compressed column storage: `pointers` index columns, `indices` hold rows.
    CompressedColumn,
    /// Compressed row storage: `pointers` index rows, `indices` hold columns.
    CompressedRow,
}

/// The implicit-Euler system matrix `A`, one row and one column per cell.
///
/// Within each column (CCS) or row (CRS) the entries follow the stencil
/// order Bottom, South, West, Diagonal, East, North, Top (CCS) or its mirror
/// (CRS), skipping neighbors that do not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemMatrix {
    pub kind: StorageKind,
    pub size: usize,
    pub nnz: usize,
    pub pointers: Vec<usize>,
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

/// Neighbors in CCS order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Bottom,
    South,
    West,
    Diagonal,
    East,
    North,
    Top,
}

const CCS_ORDER: [Direction; 7] = [
    Direction::Bottom,
    Direction::South,
    Direction::West,
    Direction::Diagonal,
    Direction::East,
    Direction::North,
    Direction::Top,
];

/// Entries of one cell's column (CCS) or row (CRS), in CCS order.
struct Stencil {
    entries: [Option<(usize, f64)>; 7],
}

impl SystemMatrix {
    pub fn new(kind: StorageKind, size: usize, nnz: usize) -> Self {
        Self {
            kind,
            size,
            nnz,
            pointers: vec![0; size + 1],
            indices: Vec::with_capacity(nnz),
            values: Vec::with_capacity(nnz),
        }
    }

    pub fn for_grid(kind: StorageKind, dims: &Dimensions) -> Self {
        Self::new(kind, dims.n_cells(), dims.n_nonzeroes())
    }

    /// Rebuilds every entry from the conductances and capacities.
    ///
    /// Fails if the number of entries written differs from `nnz`; the matrix
    /// content is then unspecified and must be filled again.
    pub fn fill(
        &mut self,
        stkd: &StackDescription,
        conductances: &[Conductances],
        capacities: &[f64],
    ) -> ThermalResult<()> {
        let dims = &stkd.dimensions;
        debug_assert_eq!(conductances.len(), self.size);
        debug_assert_eq!(capacities.len(), self.size);

        self.indices.clear();
        self.values.clear();
        self.pointers[0] = 0;

        for (layer, stack_layer) in stkd.stack.layers() {
            for row in 0..dims.n_rows() {
                for column in 0..dims.n_columns() {
                    let cell = dims.cell_offset_in_stack(layer, row, column);
                    let stencil = Stencil::new(
                        dims,
                        conductances,
                        capacities,
                        (layer, row, column),
                        stack_layer.is_liquid(column),
                        self.kind,
                        &stkd.top_boundary,
                    );
                    let added = self.emit(&stencil);
                    self.pointers[cell + 1] = self.pointers[cell] + added;
                }
            }
        }

        self.check_nonzeroes()
    }

    /// Rebuilds every entry of a non-uniform grid from its connections.
    ///
    /// The entries of a column (CCS) come in ascending row order, those of a
    /// row (CRS) in descending column order, like the uniform stencil.
    pub fn fill_from_connections(
        &mut self,
        grid: &NonUniformGrid,
        conductances: &ConnectionConductances,
        capacities: &[f64],
    ) -> ThermalResult<()> {
        debug_assert_eq!(grid.n_cells(), self.size);
        debug_assert_eq!(capacities.len(), self.size);

        let mut diagonal: Vec<f64> = capacities
            .iter()
            .zip(&conductances.ambient)
            .map(|(capacity, ambient)| capacity + ambient)
            .collect();
        let mut neighbors: Vec<Vec<(usize, f64)>> = vec![Vec::new(); self.size];
        for (connection, &g) in grid.connections().iter().zip(&conductances.links) {
            neighbors[connection.node1].push((connection.node2, -g));
            neighbors[connection.node2].push((connection.node1, -g));
            diagonal[connection.node1] += g;
            diagonal[connection.node2] += g;
        }

        self.indices.clear();
        self.values.clear();
        self.pointers[0] = 0;

        for (cell, mut entries) in neighbors.into_iter().enumerate() {
            entries.push((cell, diagonal[cell]));
            match self.kind {
                StorageKind::CompressedColumn => entries.sort_by_key(|&(index, _)| index),
                StorageKind::CompressedRow => entries.sort_by_key(|&(index, _)| Reverse(index)),
            }
            for (index, value) in entries {
                self.indices.push(index);
                self.values.push(value);
            }
            self.pointers[cell + 1] = self.indices.len();
        }

        self.check_nonzeroes()
    }

    fn check_nonzeroes(&self) -> ThermalResult<()> {
        if self.values.len() != self.nnz {
            return Err(ThermalError::NonZeroMismatch {
                written: self.values.len(),
                expected: self.nnz,
            });
        }
        Ok(())
    }

    fn emit(&mut self, stencil: &Stencil) -> usize {
        let mut added = 0;
        let mut push = |entry: &Option<(usize, f64)>| {
            if let Some((index, value)) = *entry {
                self.indices.push(index);
                self.values.push(value);
                added += 1;
            }
        };
        match self.kind {
            StorageKind::CompressedColumn => stencil.entries.iter().for_each(&mut push),
            StorageKind::CompressedRow => stencil.entries.iter().rev().for_each(&mut push),
        }
        added
    }

    /// Value at `(row, column)`, zero outside the pattern.
    pub fn get(&self, row: usize, column: usize) -> f64 {
        let (major, minor) = match self.kind {
            StorageKind::CompressedColumn => (column, row),
            StorageKind::CompressedRow => (row, column),
        };
        (self.pointers[major]..self.pointers[major + 1])
            .find(|&k| self.indices[k] == minor)
            .map_or(0.0, |k| self.values[k])
    }

    pub fn diagonal(&self, cell: usize) -> f64 {
        self.get(cell, cell)
    }

    /// Iterates `(row, column, value)` over the stored entries.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.size).flat_map(move |major| {
            (self.pointers[major]..self.pointers[major + 1]).map(move |k| match self.kind {
                StorageKind::CompressedColumn => (self.indices[k], major, self.values[k]),
                StorageKind::CompressedRow => (major, self.indices[k], self.values[k]),
            })
        })
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.size, self.size);
        for (row, column, value) in self.triplets() {
            dense[(row, column)] += value;
        }
        dense
    }

    /// Compressed rows with ascending column indices, whatever the storage.
    pub fn to_csr(&self) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); self.size];
        for (row, column, value) in self.triplets() {
            rows[row].push((column, value));
        }

        let mut indptr = Vec::with_capacity(self.size + 1);
        let mut indices = Vec::with_capacity(self.values.len());
        let mut data = Vec::with_capacity(self.values.len());
        indptr.push(0);
        for mut entries in rows {
            entries.sort_by_key(|&(column, _)| column);
            for (column, value) in entries {
                indices.push(column);
                data.push(value);
            }
            indptr.push(indices.len());
        }
        (indptr, indices, data)
    }

    /// `A * x`.
    pub fn multiply(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut y = DVector::zeros(self.size);
        for (row, column, value) in self.triplets() {
            y[row] += value * x[column];
        }
        y
    }
}

impl Stencil {
    /// Builds the entries of `cell` for the requested storage.
    ///
    /// Solid faces exchange `parallel(own, neighbor)` and add it to the
    /// diagonal. Liquid north/south faces carry the raw advective coefficient
    /// and leave the diagonal alone, except at the inlet and outlet rows where
    /// the boundary face is upwinded and the diagonal gains `C`.
    fn new(
        dims: &Dimensions,
        conductances: &[Conductances],
        capacities: &[f64],
        (layer, row, column): (usize, usize, usize),
        liquid: bool,
        kind: StorageKind,
        top_boundary: &TopBoundary,
    ) -> Self {
        let cell = dims.cell_offset_in_stack(layer, row, column);
        let own = &conductances[cell];
        let layer_offset = dims.layer_area();
        let row_offset = dims.n_columns();

        let mut entries = [None; 7];
        let mut diagonal = capacities[cell];

        for (slot, direction) in CCS_ORDER.iter().enumerate() {
            let (neighbor, exchange) = match direction {
                Direction::Diagonal => continue,
                Direction::Bottom if layer > 0 => {
                    let n = cell - layer_offset;
                    (n, parallel(own.bottom, conductances[n].top))
                }
                Direction::Top if layer < dims.last_layer() => {
                    let n = cell + layer_offset;
                    (n, parallel(own.top, conductances[n].bottom))
                }
                Direction::West if column > 0 => {
                    let n = cell - 1;
                    (n, parallel(own.west, conductances[n].east))
                }
                Direction::East if column < dims.last_column() => {
                    let n = cell + 1;
                    (n, parallel(own.east, conductances[n].west))
                }
                Direction::South if row > 0 => {
                    let n = cell - row_offset;
                    if liquid {
                        // CCS: A[n][cell], the northern coupling of the upstream cell.
                        // CRS: A[cell][n].
                        let advective = match kind {
                            StorageKind::CompressedColumn => own.north,
                            StorageKind::CompressedRow => own.south,
                        };
                        entries[slot] = Some((n, advective));
                        continue;
                    }
                    (n, parallel(own.south, conductances[n].north))
                }
                Direction::North if row < dims.last_row() => {
                    let n = cell + row_offset;
                    if liquid {
                        let advective = match kind {
                            StorageKind::CompressedColumn => own.south,
                            StorageKind::CompressedRow => own.north,
                        };
                        entries[slot] = Some((n, advective));
                        continue;
                    }
                    (n, parallel(own.north, conductances[n].south))
                }
                _ => continue,
            };
            entries[slot] = Some((neighbor, -exchange));
            diagonal += exchange;
        }

        if layer == dims.last_layer() && top_boundary.is_ambient() {
            diagonal += own.top;
        }

        if liquid && (row == 0 || row == dims.last_row()) {
            diagonal += own.north;
        }

        entries[3] = Some((cell, diagonal));

        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::dimensions::CellDimensions;
    use crate::physics::conductances::fill_conductances;
    use crate::physics::fill::fill_capacities;
    use crate::physics::layer::Layer;
    use crate::physics::material::Material;
    use crate::physics::stack::{Stack, StackElementKind};

    fn slab(
        layers: usize,
        rows: usize,
        columns: usize,
        top_boundary: TopBoundary,
    ) -> StackDescription {
        let mut stack = Stack::new();
        for l in 0..layers {
            let id = format!("layer{}", l);
            let layer = Layer::new(id.clone(), 1.0, Material::new("m", 1.0, 1.0));
            stack.push(id, StackElementKind::Layer(layer)).unwrap();
        }
        let cell = CellDimensions::uniform(1.0, 1.0);
        StackDescription::new(stack, cell, rows, columns, top_boundary).unwrap()
    }

    fn assemble(stkd: &StackDescription, kind: StorageKind) -> SystemMatrix {
        let n = stkd.dimensions.n_cells();
        let mut conductances = vec![Conductances::default(); n];
        let mut capacities = vec![0.0; n];
        fill_conductances(stkd, &mut conductances);
        fill_capacities(stkd, &mut capacities, Some(1.0));
        let mut matrix = SystemMatrix::for_grid(kind, &stkd.dimensions);
        matrix.fill(stkd, &conductances, &capacities).unwrap();
        matrix
    }

    #[test]
    fn test_ccs_order_of_interior_column() {
        let stkd = slab(3, 3, 3, TopBoundary::Adiabatic);
        let matrix = assemble(&stkd, StorageKind::CompressedColumn);
        let cell = stkd.dimensions.cell_offset_in_stack(1, 1, 1);
        let range = matrix.pointers[cell]..matrix.pointers[cell + 1];
        assert_eq!(
            &matrix.indices[range],
            &[cell - 9, cell - 3, cell - 1, cell, cell + 1, cell + 3, cell + 9]
        );
    }

    #[test]
    fn test_crs_order_is_mirrored() {
        let stkd = slab(3, 3, 3, TopBoundary::Adiabatic);
        let matrix = assemble(&stkd, StorageKind::CompressedRow);
        let cell = stkd.dimensions.cell_offset_in_stack(1, 1, 1);
        let range = matrix.pointers[cell]..matrix.pointers[cell + 1];
        assert_eq!(
            &matrix.indices[range],
            &[cell + 9, cell + 3, cell + 1, cell, cell - 1, cell - 3, cell - 9]
        );
    }

    #[test]
    fn test_storages_hold_the_same_matrix() {
        let stkd = slab(2, 3, 4, TopBoundary::Adiabatic);
        let ccs = assemble(&stkd, StorageKind::CompressedColumn);
        let crs = assemble(&stkd, StorageKind::CompressedRow);
        assert_eq!(ccs.to_dense(), crs.to_dense());
        assert_eq!(*ccs.pointers.last().unwrap(), stkd.dimensions.n_nonzeroes());
    }

    #[test]
    fn test_corner_cell_entries() {
        let stkd = slab(1, 3, 3, TopBoundary::Adiabatic);
        let matrix = assemble(&stkd, StorageKind::CompressedColumn);
        assert_eq!(matrix.pointers[1] - matrix.pointers[0], 3);
        assert_eq!(matrix.pointers[5] - matrix.pointers[4], 5);
        // unit cube, k = 1: half-cell conductances of 2 in series
        assert_eq!(matrix.get(1, 0), -1.0);
        assert_eq!(matrix.diagonal(0), 1.0 + 2.0);
    }

    #[test]
    fn test_ambient_top_adds_to_diagonal() {
        let bc = TopBoundary::Ambient {
            heat_transfer_coefficient: 0.5,
            ambient_temperature: 300.0,
        };
        let adiabatic =
            assemble(&slab(2, 1, 1, TopBoundary::Adiabatic), StorageKind::CompressedRow);
        let ambient = assemble(&slab(2, 1, 1, bc), StorageKind::CompressedRow);
        // with an ambient the top cell splits its height: 2 towards the bottom
        // neighbor and 2 in series with 0.5 towards the ambient
        let expected = 1.0 + parallel(1.0, 2.0) + parallel(2.0, 0.5);
        assert!((ambient.diagonal(1) - expected).abs() < 1e-12);
        assert!((adiabatic.diagonal(1) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_multiply_and_csr() {
        let stkd = slab(1, 2, 2, TopBoundary::Adiabatic);
        let matrix = assemble(&stkd, StorageKind::CompressedColumn);
        let y = matrix.multiply(&DVector::from_element(4, 1.0));
        // rows of the Laplacian part sum to zero, leaving the capacity
        assert!(y.iter().all(|v| (v - 1.0).abs() < 1e-12));

        let (indptr, indices, _) = matrix.to_csr();
        assert_eq!(indptr, vec![0, 3, 6, 9, 12]);
        assert_eq!(&indices[0..3], &[0, 1, 2]);
    }

    #[test]
    fn test_connections_reproduce_the_uniform_stencil() {
        use crate::discretization::non_uniform::LayerGranularity;

        let mut stkd = slab(2, 2, 3, TopBoundary::Adiabatic);
        let uniform = assemble(&stkd, StorageKind::CompressedColumn);
        stkd.set_non_uniform_grid(Some(vec![LayerGranularity::new(2, 3); 2])).unwrap();
        let layout = stkd.non_uniform().unwrap();

        let mut g = ConnectionConductances::new(layout.grid());
        layout.fill_conductances(&stkd.stack, &stkd.top_boundary, &mut g).unwrap();
        let mut capacities = vec![0.0; stkd.n_cells()];
        layout.fill_capacities(&stkd.stack, &mut capacities, Some(1.0)).unwrap();

        for kind in [StorageKind::CompressedColumn, StorageKind::CompressedRow] {
            let mut matrix = SystemMatrix::new(kind, stkd.n_cells(), stkd.n_nonzeroes());
            matrix.fill_from_connections(layout.grid(), &g, &capacities).unwrap();
            assert_eq!(matrix.pointers, uniform.pointers);
            let diff = (matrix.to_dense() - uniform.to_dense()).abs().max();
            assert!(diff < 1e-12, "{:?}: {:e}", kind, diff);
        }
    }

    #[test]
    fn test_connection_order_per_storage() {
        use crate::discretization::non_uniform::LayerGranularity;

        let mut stkd = slab(2, 2, 2, TopBoundary::Adiabatic);
        stkd.set_non_uniform_grid(Some(vec![
            LayerGranularity::new(2, 2),
            LayerGranularity::new(1, 1),
        ]))
        .unwrap();
        let layout = stkd.non_uniform().unwrap();
        let g = ConnectionConductances::new(layout.grid());
        let capacities = vec![1.0; 5];

        let mut ccs = SystemMatrix::new(StorageKind::CompressedColumn, 5, stkd.n_nonzeroes());
        ccs.fill_from_connections(layout.grid(), &g, &capacities).unwrap();
        assert_eq!(&ccs.indices[ccs.pointers[4]..ccs.pointers[5]], &[0, 1, 2, 3, 4]);

        let mut crs = SystemMatrix::new(StorageKind::CompressedRow, 5, stkd.n_nonzeroes());
        crs.fill_from_connections(layout.grid(), &g, &capacities).unwrap();
        assert_eq!(&crs.indices[crs.pointers[0]..crs.pointers[1]], &[4, 2, 1, 0]);

        let mut short = SystemMatrix::new(StorageKind::CompressedColumn, 5, 3);
        assert!(matches!(
            short.fill_from_connections(layout.grid(), &g, &capacities),
            Err(ThermalError::NonZeroMismatch { .. })
        ));
    }
}
