//! Moving relative cell references when a formula is filled into another cell.
//!
//! Shared formulas store their text once, on the first cell of the block;
//! every other cell in the block reads that text shifted by its offset from
//! the first one.

use crate::utils::{column_to_letter, coordinate_from_row_col, letter_to_column, parse_u32_bytes, MAX_COLUMN, MAX_ROW};

/// A cell reference found in formula text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Reference {
    column: u32,
    row: u32,
    column_fixed: bool,
    row_fixed: bool,
    /// Byte offset just past the reference.
    end: usize,
}

impl Reference {
    fn shifted(&self, rows: i64, columns: i64) -> String {
        let column = self.column as i64 + if self.column_fixed { 0 } else { columns };
        let row = self.row as i64 + if self.row_fixed { 0 } else { rows };
        let column = Some(column).filter(|c| (1..=MAX_COLUMN as i64).contains(c));
        let row = Some(row).filter(|r| (1..=MAX_ROW as i64).contains(r));
        let (Some(column), Some(row)) = (column, row) else {
            return "#REF!".to_string();
        };

        if !self.column_fixed && !self.row_fixed {
            return coordinate_from_row_col(row as u32, column as u32);
        }
        let mut out = String::new();
        if self.column_fixed {
            out.push('$');
        }
        out.push_str(&column_to_letter(column as u32));
        if self.row_fixed {
            out.push('$');
        }
        out.push_str(itoa::Buffer::new().format(row));
        out
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'$') || b >= 0x80
}

/// Parse an A1 reference starting at `start`; `None` if the word there is
/// anything else (a function name, a defined name, a number).
fn scan_reference(bytes: &[u8], start: usize) -> Option<Reference> {
    let mut pos = start;
    let column_fixed = bytes.get(pos) == Some(&b'$');
    if column_fixed {
        pos += 1;
    }
    let letters_start = pos;
    while bytes.get(pos).is_some_and(u8::is_ascii_alphabetic) {
        pos += 1;
    }
    let letters = &bytes[letters_start..pos];
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let row_fixed = bytes.get(pos) == Some(&b'$');
    if row_fixed {
        pos += 1;
    }
    let digits_start = pos;
    while bytes.get(pos).is_some_and(u8::is_ascii_digit) {
        pos += 1;
    }
    let digits = &bytes[digits_start..pos];
    if digits.is_empty() {
        return None;
    }
    if let Some(&next) = bytes.get(pos) {
        if is_word_byte(next) || matches!(next, b'(' | b'[') {
            return None;
        }
    }

    let column = letter_to_column(std::str::from_utf8(letters).ok()?).ok()?;
    let row = parse_u32_bytes(digits).filter(|r| (1..=MAX_ROW).contains(r))?;
    Some(Reference {
        column,
        row,
        column_fixed,
        row_fixed,
        end: pos,
    })
}

/// Index just past the quoted run starting at `start` (a doubled quote is an escape).
fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut pos = start + 1;
    while pos < bytes.len() {
        if bytes[pos] == quote {
            if bytes.get(pos + 1) == Some(&quote) {
                pos += 2;
                continue;
            }
            return pos + 1;
        }
        pos += 1;
    }
    pos
}

/// Rewrite `formula` as it reads when filled `rows` down and `columns` right.
///
/// References anchored with `$` keep that part; a reference pushed off the
/// sheet becomes `#REF!`. Text inside string literals and quoted sheet names
/// is left alone.
pub fn shift_formula(formula: &str, rows: i64, columns: i64) -> String {
    if rows == 0 && columns == 0 {
        return formula.to_string();
    }
    let bytes = formula.as_bytes();
    let mut out = String::with_capacity(formula.len() + 8);
    let mut copied = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'"' | b'\'' => pos = skip_quoted(bytes, pos),
            b if is_word_byte(b) => {
                if let Some(reference) = scan_reference(bytes, pos) {
                    out.push_str(&formula[copied..pos]);
                    out.push_str(&reference.shifted(rows, columns));
                    pos = reference.end;
                    copied = pos;
                    continue;
                }
                while pos < bytes.len() && is_word_byte(bytes[pos]) {
                    pos += 1;
                }
            }
            _ => pos += 1,
        }
    }
    out.push_str(&formula[copied..]);
    out
}
