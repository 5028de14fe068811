//! In-memory worksheet: a sparse map of cells plus the sheet's used extent.

#[cfg(feature = "fast-hash")]
use hashbrown::HashMap;
#[cfg(not(feature = "fast-hash"))]
use std::collections::HashMap;

use crate::cell::CellValue;
use crate::layout::SheetLayout;
use crate::package::Table;
use crate::window::SheetExtent;

/// Pack a (row, column) pair into one map key; keys sort in row-major order.
#[inline]
pub fn cell_key(row: u32, column: u32) -> u64 {
    ((row as u64) << 32) | column as u64
}

/// Inverse of [`cell_key`].
#[inline]
pub fn split_cell_key(key: u64) -> (u32, u32) {
    ((key >> 32) as u32, key as u32)
}

/// A cell's value and the style record it points at in `styles.xml`.
#[derive(Clone, Debug, PartialEq)]
pub struct CellData {
    pub value: CellValue,
    pub style_index: Option<u32>,
}

impl CellData {
    pub fn new(value: CellValue) -> Self {
        CellData {
            value,
            style_index: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Worksheet {
    title: String,
    pub(crate) cells: HashMap<u64, CellData>,
    max_row: u32,
    max_column: u32,
    /// Loaded worksheet XML around the cells; `None` for new sheets.
    layout: Option<SheetLayout>,
    tables: Vec<Table>,
}

impl Worksheet {
    pub fn new(title: impl Into<String>) -> Self {
        Worksheet {
            title: title.into(),
            cells: HashMap::new(),
            max_row: 0,
            max_column: 0,
            layout: None,
            tables: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
    }

    /// Highest used column and row. Every cell present counts, including
    /// blank cells that only carry a style.
    pub fn extent(&self) -> SheetExtent {
        SheetExtent::new(self.max_column, self.max_row)
    }

    /// The `<dimension>` reference: the used range, or `A1` for an empty sheet.
    pub fn dimension(&self) -> String {
        match self.extent().full_range() {
            Some(range) if range.start == range.end => range.start.to_string(),
            Some(range) => range.to_string(),
            None => "A1".to_string(),
        }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub(crate) fn set_tables(&mut self, tables: Vec<Table>) {
        self.tables = tables;
    }

    pub(crate) fn layout(&self) -> Option<&SheetLayout> {
        self.layout.as_ref()
    }

    pub(crate) fn set_layout(&mut self, layout: Option<SheetLayout>) {
        self.layout = layout;
    }

    /// Forget everything that lives in parts related to this sheet, keeping
    /// the cells and the sheet's own layout.
    pub(crate) fn detach_related_parts(&mut self) {
        self.layout = self.layout.as_ref().map(SheetLayout::detached);
        self.tables.clear();
    }

    pub fn get_cell(&self, row: u32, column: u32) -> Option<&CellData> {
        self.cells.get(&cell_key(row, column))
    }

    pub fn get_cell_value(&self, row: u32, column: u32) -> Option<&CellValue> {
        self.get_cell(row, column).map(|cell| &cell.value)
    }

    /// Set a value, keeping whatever style the cell already had.
    pub fn set_cell_value(&mut self, row: u32, column: u32, value: CellValue) {
        self.cells
            .entry(cell_key(row, column))
            .and_modify(|cell| cell.value = value.clone())
            .or_insert_with(|| CellData::new(value));
        self.grow(row, column);
    }

    pub fn set_cell_data(&mut self, row: u32, column: u32, data: CellData) {
        self.cells.insert(cell_key(row, column), data);
        self.grow(row, column);
    }

    /// Put `data` (or nothing) at a cell and hand back what was there.
    pub fn replace_cell(&mut self, row: u32, column: u32, data: Option<CellData>) -> Option<CellData> {
        let key = cell_key(row, column);
        match data {
            Some(data) => {
                self.grow(row, column);
                self.cells.insert(key, data)
            }
            None => {
                let previous = self.cells.remove(&key);
                if previous.is_some() && (row == self.max_row || column == self.max_column) {
                    self.recompute_extent();
                }
                previous
            }
        }
    }

    /// All cells in row-major order as `(row, column, data)`.
    pub fn sorted_cells(&self) -> Vec<(u32, u32, &CellData)> {
        let mut keys: Vec<u64> = self.cells.keys().copied().collect();
        keys.sort_unstable();
        keys.into_iter()
            .map(|key| {
                let (row, column) = split_cell_key(key);
                (row, column, &self.cells[&key])
            })
            .collect()
    }

    pub fn has_formulas(&self) -> bool {
        self.cells
            .values()
            .any(|cell| matches!(cell.value, CellValue::Formula { .. }))
    }

    fn grow(&mut self, row: u32, column: u32) {
        self.max_row = self.max_row.max(row);
        self.max_column = self.max_column.max(column);
    }

    fn recompute_extent(&mut self) {
        let (rows, columns) = self.cells.keys().fold((0, 0), |(r, c), &key| {
            let (row, column) = split_cell_key(key);
            (r.max(row), c.max(column))
        });
        self.max_row = rows;
        self.max_column = columns;
    }
}
