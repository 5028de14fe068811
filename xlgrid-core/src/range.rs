//! Cell coordinates, rectangular ranges and the `A1:C10` range parser.

use std::fmt;

use crate::error::{Result, XlgridError};
use crate::utils::{column_to_letter, parse_coordinate_bytes};

/// A 1-based (column, row) pair. Column 1 is "A".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub column: u32,
    pub row: u32,
}

impl Coordinate {
    pub const fn new(column: u32, row: u32) -> Self {
        Coordinate { column, row }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letter(self.column), self.row)
    }
}

/// A rectangle of cells between two corners, both inclusive.
///
/// Parsing keeps the corners in the order they were written; use
/// [`CellRange::ensure_ordered`] before treating the range as a rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: Coordinate,
    pub end: Coordinate,
}

impl CellRange {
    pub const fn new(start: Coordinate, end: Coordinate) -> Self {
        CellRange { start, end }
    }

    /// Build a range from raw bounds in `startCol, startRow, endCol, endRow` order.
    pub const fn from_bounds(start_col: u32, start_row: u32, end_col: u32, end_row: u32) -> Self {
        CellRange {
            start: Coordinate::new(start_col, start_row),
            end: Coordinate::new(end_col, end_row),
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.start.column <= self.end.column && self.start.row <= self.end.row
    }

    /// Reject ranges whose end lies before their start on either axis.
    pub fn ensure_ordered(self) -> Result<Self> {
        if self.is_ordered() {
            Ok(self)
        } else {
            Err(XlgridError::ReversedRange(self.to_string()))
        }
    }

    /// Number of columns spanned. Only meaningful for ordered ranges.
    pub fn column_count(&self) -> usize {
        (self.end.column - self.start.column + 1) as usize
    }

    /// Number of rows spanned. Only meaningful for ordered ranges.
    pub fn row_count(&self) -> usize {
        (self.end.row - self.start.row + 1) as usize
    }

    pub fn contains(&self, coordinate: Coordinate) -> bool {
        (self.start.column..=self.end.column).contains(&coordinate.column)
            && (self.start.row..=self.end.row).contains(&coordinate.row)
    }

    /// Iterate the column numbers covered by this range.
    pub fn columns(&self) -> std::ops::RangeInclusive<u32> {
        self.start.column..=self.end.column
    }

    /// Iterate the row numbers covered by this range.
    pub fn rows(&self) -> std::ops::RangeInclusive<u32> {
        self.start.row..=self.end.row
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl std::str::FromStr for CellRange {
    type Err = XlgridError;

    fn from_str(s: &str) -> Result<Self> {
        parse_range(s)
    }
}

/// Parse an `A1:C10` style address into a [`CellRange`].
///
/// Letters are case-insensitive. The whole text must match
/// `<letters><digits>:<letters><digits>`; reversed corners are kept as written.
pub fn parse_range(text: &str) -> Result<CellRange> {
    let invalid = || XlgridError::InvalidRange(text.to_string());
    let (start, end) = text.split_once(':').ok_or_else(invalid)?;
    let start = parse_coordinate_bytes(start.as_bytes()).ok_or_else(invalid)?;
    let end = parse_coordinate_bytes(end.as_bytes()).ok_or_else(invalid)?;
    Ok(CellRange::new(start, end))
}
