//! Read-window clamping.
//!
//! A read never serves more than [`MAX_WINDOW`] cells per axis, and never runs
//! further past its start than the sheet is wide or tall. The full extent is
//! reported alongside so callers can page through larger sheets by shifting
//! the start of their requested range.

use crate::error::Result;
use crate::range::{CellRange, Coordinate};

/// Column and row counts of a rectangular area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowSize {
    pub columns: u32,
    pub rows: u32,
}

/// The largest window a single read may serve.
pub const MAX_WINDOW: WindowSize = WindowSize {
    columns: 50,
    rows: 50,
};

/// Populated extent of a sheet: the highest used column and row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SheetExtent {
    pub columns: u32,
    pub rows: u32,
}

impl SheetExtent {
    pub const fn new(columns: u32, rows: u32) -> Self {
        SheetExtent { columns, rows }
    }

    pub const fn is_empty(&self) -> bool {
        self.columns == 0 || self.rows == 0
    }

    /// The range `A1` through the last used cell, or `None` for an empty sheet.
    pub fn full_range(&self) -> Option<CellRange> {
        (!self.is_empty()).then(|| CellRange::from_bounds(1, 1, self.columns, self.rows))
    }
}

/// Outcome of clamping a read request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClampedWindow {
    /// Cells actually served; `None` when nothing is left after clamping.
    pub served: Option<CellRange>,
    /// The sheet's whole populated area, for paging context.
    pub full: Option<CellRange>,
}

/// Compute the window served for `requested` (or the default window at `A1`).
///
/// Fails only when the requested range is reversed.
pub fn clamp_window(
    requested: Option<CellRange>,
    max: WindowSize,
    extent: SheetExtent,
) -> Result<ClampedWindow> {
    let requested = match requested {
        Some(range) => range.ensure_ordered()?,
        None => CellRange::from_bounds(1, 1, max.columns, max.rows),
    };
    let start = requested.start;

    let end_column = clamp_axis(requested.end.column, start.column, max.columns, extent.columns);
    let end_row = clamp_axis(requested.end.row, start.row, max.rows, extent.rows);

    let served = (end_column >= start.column && end_row >= start.row)
        .then(|| CellRange::new(start, Coordinate::new(end_column, end_row)));

    Ok(ClampedWindow {
        served,
        full: extent.full_range(),
    })
}

/// `min(requested_end, start + limit - 1, start + used - 1)`; may land below `start`
/// when `used` is zero.
fn clamp_axis(requested_end: u32, start: u32, limit: u32, used: u32) -> u32 {
    let by_limit = start.saturating_add(limit).saturating_sub(1);
    let by_extent = start.saturating_add(used).saturating_sub(1);
    requested_end.min(by_limit).min(by_extent)
}
