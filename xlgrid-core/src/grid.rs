//! Write-payload reconciliation.
//!
//! A payload is a row-major grid whose rows may differ in length. With an
//! explicit target range the payload must fill it exactly (row count and
//! widest row); without one the payload is anchored at `A1` and sizes its own
//! rectangle.

use crate::error::{Axis, Result, XlgridError};
use crate::range::{CellRange, Coordinate};

/// Number of rows and the widest row of a payload.
pub fn payload_shape<T>(grid: &[Vec<T>]) -> (usize, usize) {
    let columns = grid.iter().map(Vec::len).max().unwrap_or(0);
    (grid.len(), columns)
}

/// A validated write: where the payload lands, and the payload itself.
#[derive(Debug)]
pub struct WritePlan<'a, T> {
    target: CellRange,
    grid: &'a [Vec<T>],
}

impl<'a, T> WritePlan<'a, T> {
    pub fn target(&self) -> CellRange {
        self.target
    }

    /// Each payload value paired with the cell it is written to.
    ///
    /// Rows shorter than the target width stop early; the cells past their end
    /// are left alone.
    pub fn assignments(&self) -> impl Iterator<Item = (Coordinate, &'a T)> + '_ {
        let start = self.target.start;
        self.grid.iter().enumerate().flat_map(move |(i, row)| {
            row.iter().enumerate().map(move |(j, value)| {
                (
                    Coordinate::new(start.column + j as u32, start.row + i as u32),
                    value,
                )
            })
        })
    }

    /// Number of values that [`assignments`](Self::assignments) yields.
    pub fn len(&self) -> usize {
        self.grid.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve the rectangle a payload is written to.
pub fn reconcile<T>(range: Option<CellRange>, grid: &[Vec<T>]) -> Result<WritePlan<'_, T>> {
    let (rows, columns) = payload_shape(grid);

    let target = match range {
        Some(range) => {
            let range = range.ensure_ordered()?;
            if rows != range.row_count() {
                return Err(XlgridError::ShapeMismatch {
                    axis: Axis::Rows,
                    payload: rows,
                    range: range.row_count(),
                });
            }
            if columns != range.column_count() {
                return Err(XlgridError::ShapeMismatch {
                    axis: Axis::Columns,
                    payload: columns,
                    range: range.column_count(),
                });
            }
            range
        }
        None => {
            if rows == 0 || columns == 0 {
                return Err(XlgridError::EmptyPayload);
            }
            let too_large = || XlgridError::InvalidRange(format!("{columns} columns x {rows} rows"));
            let end_column = u32::try_from(columns).map_err(|_| too_large())?;
            let end_row = u32::try_from(rows).map_err(|_| too_large())?;
            if end_column > crate::utils::MAX_COLUMN || end_row > crate::utils::MAX_ROW {
                return Err(too_large());
            }
            CellRange::from_bounds(1, 1, end_column, end_row)
        }
    };

    Ok(WritePlan { target, grid })
}
