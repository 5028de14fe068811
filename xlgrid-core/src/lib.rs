//! Range addressing and windowed grid access for xlsx workbooks.
//!
//! The crate covers the A1-notation codec, range parsing, the capped read
//! window, write-payload reconciliation, an xlsx reader/writer that carries
//! unmodelled package content through a save, and a path-keyed cache of
//! opened documents.
//!
//! ```no_run
//! use xlgrid_core::{read_window, Workbook};
//!
//! let workbook = Workbook::load("/tmp/report.xlsx")?;
//! let window = read_window(&workbook, None, Some("A1:C10"), false)?;
//! println!("{:?}", window.window.served);
//! # Ok::<(), xlgrid_core::XlgridError>(())
//! ```

pub mod access;
pub mod cache;
pub mod cell;
pub mod error;
pub mod formula;
pub mod grid;
mod layout;
pub mod numfmt;
mod package;
pub mod range;
pub mod utils;
pub mod window;
pub mod workbook;
pub mod worksheet;
mod writer;

pub use access::{copy_sheet, list_sheets, read_window, write_formulas, write_grid, AppliedWrite, SheetWindow};
pub use cache::{Document, DocumentCache, DocumentHandle};
pub use cell::{format_number, CellValue, InternedString};
pub use error::{Axis, ErrorKind, Result, XlgridError};
pub use formula::shift_formula;
pub use grid::{payload_shape, reconcile, WritePlan};
pub use numfmt::NumberFormats;
pub use package::Table;
pub use range::{parse_range, CellRange, Coordinate};
pub use utils::{
    column_to_letter, coordinate_from_row_col, letter_to_column, parse_coordinate, parse_coordinate_bytes,
    parse_f64_bytes, parse_u32_bytes, MAX_COLUMN, MAX_ROW,
};
pub use window::{clamp_window, ClampedWindow, SheetExtent, WindowSize, MAX_WINDOW};
pub use workbook::{validate_sheet_name, NamedRange, Workbook};
pub use worksheet::{CellData, Worksheet};
