//! Fixed-rank table shapes and row-major cell flattening.
//!
//! `cell = Σ indices[d] × Π extents[d+1..]`: the last dimension varies
//! fastest.

use serde::{Deserialize, Serialize};

use crate::error::TableError;

/// Extents of a table's dimensions and its derived cell count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableShape {
    table: String,
    extents: Vec<usize>,
    strides: Vec<usize>,
    cells: usize,
}

impl TableShape {
    /// Shape of table `table` with the given extents. Rank 0 has one cell.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::EmptyDimension`] for a zero extent or
    /// [`TableError::ShapeOverflow`] if the cell count overflows.
    pub fn new(table: &str, extents: &[usize]) -> Result<Self, TableError> {
        if let Some(dimension) = extents.iter().position(|e| *e == 0) {
            return Err(TableError::EmptyDimension {
                table: table.to_owned(),
                dimension,
            });
        }
        let mut strides = vec![1; extents.len()];
        let mut cells = 1_usize;
        for (stride, extent) in strides.iter_mut().zip(extents).rev() {
            *stride = cells;
            cells = cells
                .checked_mul(*extent)
                .ok_or_else(|| TableError::ShapeOverflow {
                    table: table.to_owned(),
                })?;
        }
        Ok(Self {
            table: table.to_owned(),
            extents: extents.to_vec(),
            strides,
            cells,
        })
    }

    /// Flatten one index per dimension into a cell index.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidRank`] if the index count differs from
    /// the rank, or [`TableError::InvalidIndex`] if an index is out of range.
    pub fn cell_index(&self, indices: &[usize]) -> Result<usize, TableError> {
        if indices.len() != self.extents.len() {
            return Err(TableError::InvalidRank {
                table: self.table.clone(),
                expected: self.extents.len(),
                actual: indices.len(),
            });
        }
        let mut cell = 0_usize;
        for (dimension, ((index, extent), stride)) in indices
            .iter()
            .zip(&self.extents)
            .zip(&self.strides)
            .enumerate()
        {
            if index >= extent {
                return Err(TableError::InvalidIndex {
                    table: self.table.clone(),
                    dimension,
                    index: *index,
                    extent: *extent,
                });
            }
            // index < extent and stride * extent <= cells, so neither overflows.
            cell = cell.wrapping_add(index.wrapping_mul(*stride));
        }
        Ok(cell)
    }

    /// Expand a cell index back into one index per dimension.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidIndex`] (dimension 0) if `cell` is not
    /// below the cell count.
    pub fn coordinates(&self, cell: usize) -> Result<Vec<usize>, TableError> {
        if cell >= self.cells {
            return Err(TableError::InvalidIndex {
                table: self.table.clone(),
                dimension: 0,
                index: cell,
                extent: self.cells,
            });
        }
        let mut rest = cell;
        Ok(self
            .strides
            .iter()
            .map(|stride| {
                let index = rest.checked_div(*stride).unwrap_or(0);
                rest = rest.checked_rem(*stride).unwrap_or(0);
                index
            })
            .collect())
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    /// Number of cells.
    pub const fn cells(&self) -> usize {
        self.cells
    }

    /// Extent of every dimension.
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    #[test]
    fn row_major_flattening_matches_formula() {
        let shape = TableShape::new("t", &[3, 4]).unwrap();
        assert_eq!(shape.cells(), 12);
        assert_eq!(shape.cell_index(&[2, 1]).unwrap(), 9);
        assert_eq!(shape.cell_index(&[0, 3]).unwrap(), 3);
        assert_eq!(shape.cell_index(&[1, 0]).unwrap(), 4);
    }

    #[test]
    fn three_dimensions_flatten_last_fastest() {
        let shape = TableShape::new("t", &[2, 3, 5]).unwrap();
        assert_eq!(shape.cell_index(&[1, 2, 4]).unwrap(), 29);
        assert_eq!(shape.coordinates(29).unwrap(), vec![1, 2, 4]);
    }

    #[test]
    fn unflatten_inverts_flatten() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..50 {
            let rank = rng.random_range(0..5);
            let extents: Vec<usize> = (0..rank).map(|_| rng.random_range(1..6)).collect();
            let shape = TableShape::new("t", &extents).unwrap();
            let indices: Vec<usize> = extents.iter().map(|e| rng.random_range(0..*e)).collect();
            let cell = shape.cell_index(&indices).unwrap();
            assert!(cell < shape.cells());
            assert_eq!(shape.coordinates(cell).unwrap(), indices);
        }
    }

    #[test]
    fn rank_zero_has_one_cell() {
        let shape = TableShape::new("t", &[]).unwrap();
        assert_eq!(shape.cells(), 1);
        assert_eq!(shape.cell_index(&[]).unwrap(), 0);
        assert_eq!(shape.coordinates(0).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn wrong_rank_and_index_are_reported() {
        let shape = TableShape::new("t", &[2, 3]).unwrap();
        assert!(matches!(
            shape.cell_index(&[1]),
            Err(TableError::InvalidRank { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            shape.cell_index(&[1, 3]),
            Err(TableError::InvalidIndex { dimension: 1, index: 3, extent: 3, .. })
        ));
        assert!(shape.coordinates(6).is_err());
    }

    #[test]
    fn zero_extent_is_rejected() {
        assert!(matches!(
            TableShape::new("t", &[2, 0]),
            Err(TableError::EmptyDimension { dimension: 1, .. })
        ));
        assert!(TableShape::new("t", &[usize::MAX, 2]).is_err());
    }
}
