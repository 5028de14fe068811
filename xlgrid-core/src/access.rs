//! Windowed reads and rectangular writes against a workbook.
//!
//! These tie the range parser, window clamper and grid reconciler to the
//! in-memory sheets. Nothing here touches storage; persisting is the caller's
//! job.

use crate::cell::CellValue;
use crate::error::{Result, XlgridError};
use crate::grid::reconcile;
use crate::range::{parse_range, CellRange};
use crate::utils::column_to_letter;
use crate::window::{clamp_window, ClampedWindow, MAX_WINDOW};
use crate::workbook::Workbook;
use crate::worksheet::CellData;

/// The served part of a sheet, ready to render.
#[derive(Clone, Debug, PartialEq)]
pub struct SheetWindow {
    pub sheet_name: String,
    pub window: ClampedWindow,
    /// Column letters of the served range, left to right.
    pub columns: Vec<String>,
    /// Row number and cell text for each served row.
    pub rows: Vec<(u32, Vec<String>)>,
}

/// Read at most a 50 x 50 window of `sheet` (the first sheet when `None`).
///
/// Missing cells read as empty text. Numbers styled as dates read as dates.
/// With `show_formula`, formula cells give `=<formula>` instead of their
/// cached value.
pub fn read_window(
    workbook: &Workbook,
    sheet: Option<&str>,
    range: Option<&str>,
    show_formula: bool,
) -> Result<SheetWindow> {
    let worksheet = workbook.sheet(sheet)?;
    let requested = range.map(parse_range).transpose()?;
    let window = clamp_window(requested, MAX_WINDOW, worksheet.extent())?;

    let text = |cell: &CellData| match &cell.value {
        CellValue::Formula { .. } if show_formula => cell.value.formula_text(),
        _ => workbook.display_text(cell),
    };

    let (columns, rows) = match window.served {
        Some(served) => {
            let columns = served.columns().map(column_to_letter).collect();
            let rows = served
                .rows()
                .map(|row| {
                    let cells = served
                        .columns()
                        .map(|column| worksheet.get_cell(row, column).map(text).unwrap_or_default())
                        .collect();
                    (row, cells)
                })
                .collect();
            (columns, rows)
        }
        None => (Vec::new(), Vec::new()),
    };

    Ok(SheetWindow {
        sheet_name: worksheet.title().to_string(),
        window,
        columns,
        rows,
    })
}

/// A write that has been applied in memory and can still be undone.
#[derive(Debug)]
#[must_use = "roll the write back if persisting it fails"]
pub struct AppliedWrite {
    sheet: String,
    target: CellRange,
    undo: Vec<(u32, u32, Option<CellData>)>,
}

impl AppliedWrite {
    /// The rectangle the payload was written to.
    pub fn target(&self) -> CellRange {
        self.target
    }

    /// Number of cells that were assigned.
    pub fn cells_written(&self) -> usize {
        self.undo.len()
    }

    /// Restore every assigned cell to what it held before the write.
    pub fn rollback(self, workbook: &mut Workbook) -> Result<()> {
        let worksheet = workbook.get_sheet_by_name_mut(&self.sheet)?;
        for (row, column, previous) in self.undo.into_iter().rev() {
            worksheet.replace_cell(row, column, previous);
        }
        Ok(())
    }
}

/// Write `data` as text cells into `sheet`.
///
/// Without a range the payload lands at `A1`; with one, its shape must match
/// the range exactly. Existing cell styles are kept.
pub fn write_grid(
    workbook: &mut Workbook,
    sheet: &str,
    range: Option<&str>,
    data: &[Vec<String>],
) -> Result<AppliedWrite> {
    apply(workbook, sheet, range, data, |text| CellValue::string(text))
}

/// Write `formulas` into `sheet`; every entry must start with `=`.
///
/// Nothing is written if any entry is not a formula.
pub fn write_formulas(
    workbook: &mut Workbook,
    sheet: &str,
    range: &str,
    formulas: &[Vec<String>],
) -> Result<AppliedWrite> {
    if let Some(bad) = formulas.iter().flatten().find(|f| !f.starts_with('=')) {
        return Err(XlgridError::InvalidFormula(bad.clone()));
    }
    apply(workbook, sheet, Some(range), formulas, |text| CellValue::formula(text))
}

fn apply(
    workbook: &mut Workbook,
    sheet: &str,
    range: Option<&str>,
    data: &[Vec<String>],
    to_value: impl Fn(&str) -> CellValue,
) -> Result<AppliedWrite> {
    let worksheet = workbook.get_sheet_by_name_mut(sheet)?;
    let requested = range.map(parse_range).transpose()?;
    let plan = reconcile(requested, data)?;

    let mut undo = Vec::with_capacity(plan.len());
    for (coordinate, text) in plan.assignments() {
        let (row, column) = (coordinate.row, coordinate.column);
        let style_index = worksheet.get_cell(row, column).and_then(|cell| cell.style_index);
        let cell = CellData {
            value: to_value(text.as_str()),
            style_index,
        };
        let previous = worksheet.replace_cell(row, column, Some(cell));
        undo.push((row, column, previous));
    }

    Ok(AppliedWrite {
        sheet: sheet.to_string(),
        target: plan.target(),
        undo,
    })
}

/// Names of all sheets in workbook order.
pub fn list_sheets(workbook: &Workbook) -> Vec<String> {
    workbook.sheet_names().into_iter().map(str::to_string).collect()
}

/// Append a copy of `source` named `destination`.
pub fn copy_sheet(workbook: &mut Workbook, source: &str, destination: &str) -> Result<()> {
    workbook.copy_sheet(source, destination)?;
    Ok(())
}
