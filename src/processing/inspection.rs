use nalgebra::DMatrix;

use crate::error::{ThermalError, ThermalResult};
use crate::physics::stack::{StackDescription, StackElementKind};

/// Temperature statistics over the cells covered by one floorplan element.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ElementTemperatures {
    pub die: String,
    pub element: String,
    pub max: f64,
    pub min: f64,
    pub avg: f64,
}

/// Grid layer of a stack element: the layer itself, the source layer of a
/// die, or the liquid layer of a channel.
pub fn layer_of(stkd: &StackDescription, id: &str) -> ThermalResult<usize> {
    let element = stkd.stack.find(id)?;
    Ok(match &element.kind {
        StackElementKind::Die(die) => element.first_layer + die.source_layer,
        StackElementKind::Layer(_) | StackElementKind::Channel(_) => element.first_layer,
    })
}

/// Cells of one layer of the grid in use.
fn layer_slice<'a>(
    stkd: &StackDescription,
    values: &'a [f64],
    layer: usize,
) -> ThermalResult<&'a [f64]> {
    let n_layers = stkd.dimensions.n_layers();
    if layer >= n_layers {
        return Err(ThermalError::InvalidDimensions(format!(
            "layer {} out of {} layers",
            layer, n_layers
        )));
    }
    if values.len() != stkd.n_cells() {
        return Err(ThermalError::InvalidDimensions(format!(
            "{} values for {} cells",
            values.len(),
            stkd.n_cells()
        )));
    }
    let range = match stkd.non_uniform() {
        Some(layout) => layout.grid().layer_cells(layer),
        None => {
            let area = stkd.dimensions.layer_area();
            layer * area..(layer + 1) * area
        }
    };
    Ok(&values[range])
}

/// Max, min and average temperature of every element of every floorplan,
/// in stack then declaration order.
pub fn floorplan_temperatures(
    stkd: &StackDescription,
    temperatures: &[f64],
) -> ThermalResult<Vec<ElementTemperatures>> {
    let mut out = Vec::with_capacity(stkd.total_number_of_floorplan_elements());
    for (index, (layer, die)) in stkd.stack.dies().enumerate() {
        let cells = layer_slice(stkd, temperatures, layer)?;
        let matrix = match stkd.non_uniform() {
            Some(layout) => &layout.floorplans()[index],
            None => die.floorplan.matrix(),
        };
        for (position, element) in die.floorplan.elements().iter().enumerate() {
            let covered = matrix.cells(position);
            let (max, min, sum) = covered.iter().map(|&cell| cells[cell]).fold(
                (f64::NEG_INFINITY, f64::INFINITY, 0.0),
                |(max, min, sum), t| (max.max(t), min.min(t), sum + t),
            );
            out.push(ElementTemperatures {
                die: die.id.clone(),
                element: element.id.clone(),
                max,
                min,
                avg: sum / covered.len() as f64,
            });
        }
    }
    Ok(out)
}

pub fn element_temperatures(
    stkd: &StackDescription,
    temperatures: &[f64],
    die: &str,
    element: &str,
) -> ThermalResult<ElementTemperatures> {
    floorplan_temperatures(stkd, temperatures)?
        .into_iter()
        .find(|e| e.die == die && e.element == element)
        .ok_or_else(|| ThermalError::UnknownElement(format!("{}.{}", die, element)))
}

/// Values of one layer as a `rows x columns` matrix, row 0 first. On a
/// non-uniform grid the shape is the split of that layer.
pub fn layer_map(
    stkd: &StackDescription,
    values: &[f64],
    layer: usize,
) -> ThermalResult<DMatrix<f64>> {
    let cells = layer_slice(stkd, values, layer)?;
    let (n_rows, n_columns) = match stkd.non_uniform() {
        Some(layout) => {
            let g = layout.grid().granularity(layer);
            (g.n_rows, g.n_columns)
        }
        None => (stkd.dimensions.n_rows(), stkd.dimensions.n_columns()),
    };
    Ok(DMatrix::from_fn(n_rows, n_columns, |row, column| {
        cells[row * n_columns + column]
    }))
}

pub fn thermal_map(
    stkd: &StackDescription,
    temperatures: &[f64],
    layer: usize,
) -> ThermalResult<DMatrix<f64>> {
    layer_map(stkd, temperatures, layer)
}

pub fn source_map(
    stkd: &StackDescription,
    sources: &[f64],
    layer: usize,
) -> ThermalResult<DMatrix<f64>> {
    layer_map(stkd, sources, layer)
}

/// Temperature of the cell of `layer` containing the point `(x, y)`, in µm.
pub fn cell_temperature(
    stkd: &StackDescription,
    temperatures: &[f64],
    layer: usize,
    x: f64,
    y: f64,
) -> ThermalResult<f64> {
    let cells = layer_slice(stkd, temperatures, layer)?;
    let cell = match stkd.non_uniform() {
        Some(layout) => {
            let grid = layout.grid();
            grid.cell_at(layer, x, y).map(|cell| cell - grid.layer_cells(layer).start)
        }
        None => {
            let dims = &stkd.dimensions;
            match (dims.row_at(y), dims.column_at(x)) {
                (Some(row), Some(column)) => Some(dims.cell_offset_in_layer(row, column)),
                _ => None,
            }
        }
    };
    cell.map(|cell| cells[cell]).ok_or_else(|| {
        ThermalError::InvalidDimensions(format!("point ({}, {}) lies outside the chip", x, y))
    })
}

/// Hottest cell of the whole stack as `(offset, temperature)`.
pub fn hottest_cell(temperatures: &[f64]) -> Option<(usize, f64)> {
    temperatures
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (cell, t)| match best {
            Some((_, max)) if max >= t => best,
            _ => Some((cell, t)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::dimensions::CellDimensions;
    use crate::discretization::non_uniform::LayerGranularity;
    use crate::physics::bc::TopBoundary;
    use crate::physics::die::Die;
    use crate::physics::floorplan::{Floorplan, FloorplanElement, IcElement};
    use crate::physics::layer::Layer;
    use crate::physics::material::Material;
    use crate::physics::stack::Stack;

    fn two_layer_stack() -> StackDescription {
        let silicon = Material::new("silicon", 1.3e-4, 1.6e-12);
        let floorplan = Floorplan::new(vec![
            FloorplanElement::new("left", vec![IcElement::new(0.0, 0.0, 100.0, 200.0)]),
            FloorplanElement::new("right", vec![IcElement::new(100.0, 0.0, 100.0, 200.0)]),
        ])
        .unwrap();
        let die = Die::new(
            "die",
            vec![
                Layer::new("bulk", 50.0, silicon.clone()),
                Layer::new("active", 2.0, silicon.clone()),
            ],
            "active",
            floorplan,
        )
        .unwrap();
        let stack = Stack::new().with("die", StackElementKind::Die(die)).unwrap();
        StackDescription::new(
            stack,
            CellDimensions::uniform(100.0, 100.0),
            2,
            2,
            TopBoundary::Adiabatic,
        )
        .unwrap()
    }

    #[test]
    fn test_element_statistics() {
        let stkd = two_layer_stack();
        // bottom layer cold, active layer: left column 301/303, right column 310/320
        let temperatures = vec![300.0, 300.0, 300.0, 300.0, 301.0, 310.0, 303.0, 320.0];
        let stats = floorplan_temperatures(&stkd, &temperatures).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].element, "left");
        assert_eq!((stats[0].max, stats[0].min, stats[0].avg), (303.0, 301.0, 302.0));
        assert_eq!((stats[1].max, stats[1].min, stats[1].avg), (320.0, 310.0, 315.0));

        let right = element_temperatures(&stkd, &temperatures, "die", "right").unwrap();
        assert_eq!(right.max, 320.0);
        assert!(element_temperatures(&stkd, &temperatures, "die", "nope").is_err());
    }

    #[test]
    fn test_maps_and_point_lookup() {
        let stkd = two_layer_stack();
        let temperatures: Vec<f64> = (0..8).map(|i| 300.0 + i as f64).collect();
        assert_eq!(layer_of(&stkd, "die").unwrap(), 1);

        let map = thermal_map(&stkd, &temperatures, 1).unwrap();
        assert_eq!(map.shape(), (2, 2));
        assert_eq!(map[(1, 0)], 306.0);

        assert_eq!(cell_temperature(&stkd, &temperatures, 1, 150.0, 50.0).unwrap(), 305.0);
        assert!(cell_temperature(&stkd, &temperatures, 1, 250.0, 50.0).is_err());
        assert!(thermal_map(&stkd, &temperatures, 2).is_err());
        assert_eq!(hottest_cell(&temperatures), Some((7, 307.0)));
    }

    #[test]
    fn test_non_uniform_layers() {
        // bulk in one cell, active layer in 1 x 4 strips of 50 um
        let stkd = two_layer_stack()
            .with_non_uniform_grid(vec![LayerGranularity::new(1, 1), LayerGranularity::new(1, 4)])
            .unwrap();
        let temperatures = vec![300.0, 301.0, 302.0, 310.0, 311.0];

        let map = thermal_map(&stkd, &temperatures, 1).unwrap();
        assert_eq!(map.shape(), (1, 4));
        assert_eq!(map[(0, 2)], 310.0);
        assert_eq!(thermal_map(&stkd, &temperatures, 0).unwrap().shape(), (1, 1));

        assert_eq!(cell_temperature(&stkd, &temperatures, 1, 120.0, 150.0).unwrap(), 310.0);
        assert_eq!(cell_temperature(&stkd, &temperatures, 0, 120.0, 150.0).unwrap(), 300.0);
        assert!(thermal_map(&stkd, &temperatures[..4], 1).is_err());

        let stats = floorplan_temperatures(&stkd, &temperatures).unwrap();
        assert_eq!((stats[0].max, stats[0].min, stats[0].avg), (302.0, 301.0, 301.5));
        assert_eq!((stats[1].max, stats[1].min, stats[1].avg), (311.0, 310.0, 310.5));
    }
}
