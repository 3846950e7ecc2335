use nalgebra::DVector;

/// Right-hand side of the implicit-Euler system, `B = S + Cap * T`.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemVector {
    values: DVector<f64>,
}

impl SystemVector {
    pub fn new(size: usize) -> Self {
        Self {
            values: DVector::zeros(size),
        }
    }

    pub fn fill(&mut self, sources: &[f64], capacities: &[f64], temperatures: &DVector<f64>) {
        debug_assert_eq!(sources.len(), self.values.len());
        debug_assert_eq!(capacities.len(), self.values.len());
        debug_assert_eq!(temperatures.len(), self.values.len());

        self.values = DVector::from_column_slice(sources)
            + DVector::from_column_slice(capacities).component_mul(temperatures);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_vector(&self) -> &DVector<f64> {
        &self.values
    }

    pub fn as_slice(&self) -> &[f64] {
        self.values.as_slice()
    }
}
