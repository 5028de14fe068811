//! Column letter codec and byte-level cell reference scanning.

use crate::error::{Result, XlgridError};
use crate::range::Coordinate;

/// Maximum column number in an xlsx sheet (XFD = 16384).
pub const MAX_COLUMN: u32 = 16384;
/// Maximum row number in an xlsx sheet.
pub const MAX_ROW: u32 = 1_048_576;

/// Split a reference such as `b"AB12"` into its letter and digit groups.
///
/// Both groups must be non-empty and together cover the whole input.
#[inline]
pub fn split_reference(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let letters = bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
    if letters == 0 || letters == bytes.len() {
        return None;
    }
    let (head, tail) = bytes.split_at(letters);
    if tail.iter().all(u8::is_ascii_digit) {
        Some((head, tail))
    } else {
        None
    }
}

/// Decode an ASCII letter group into a 1-based column, rejecting anything past XFD.
#[inline]
fn decode_column(letters: &[u8]) -> Option<u32> {
    let mut column: u32 = 0;
    for &b in letters {
        let digit = match b {
            b'a'..=b'z' => b - b'a' + 1,
            b'A'..=b'Z' => b - b'A' + 1,
            _ => return None,
        };
        column = column.checked_mul(26)?.checked_add(digit as u32)?;
        if column > MAX_COLUMN {
            return None;
        }
    }
    (column > 0).then_some(column)
}

/// Decode a decimal row number, rejecting zero and anything past the sheet limit.
#[inline]
fn decode_row(digits: &[u8]) -> Option<u32> {
    let row = parse_u32_bytes(digits)?;
    (1..=MAX_ROW).contains(&row).then_some(row)
}

/// Parse a single cell reference (`b"C7"`) without allocating.
#[inline]
pub fn parse_coordinate_bytes(bytes: &[u8]) -> Option<Coordinate> {
    let (letters, digits) = split_reference(bytes)?;
    Some(Coordinate::new(decode_column(letters)?, decode_row(digits)?))
}

/// Parse a single cell reference such as `"AB10"`.
pub fn parse_coordinate(reference: &str) -> Result<Coordinate> {
    parse_coordinate_bytes(reference.as_bytes())
        .ok_or_else(|| XlgridError::InvalidCoordinate(reference.to_string()))
}

/// Parse a u32 directly from ASCII digits.
#[inline]
pub fn parse_u32_bytes(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() {
        return None;
    }
    bytes.iter().try_fold(0u32, |acc, &b| {
        if !b.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add((b - b'0') as u32)
    })
}

/// Parse an f64 from bytes, with a fast path for plain integers.
#[inline]
pub fn parse_f64_bytes(bytes: &[u8]) -> Option<f64> {
    if !bytes.is_empty() && bytes.len() < 16 && bytes.iter().all(u8::is_ascii_digit) {
        return Some(
            bytes
                .iter()
                .fold(0.0, |acc, &b| acc * 10.0 + (b - b'0') as f64),
        );
    }
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

/// Convert column letters (`"A"`, `"ab"`, `"XFD"`) to a 1-based column number.
pub fn letter_to_column(letters: &str) -> Result<u32> {
    decode_column(letters.as_bytes()).ok_or_else(|| {
        XlgridError::InvalidCoordinate(format!(
            "column letters [{}] must be A through XFD",
            letters
        ))
    })
}

/// Convert a 1-based column number to letters (1 -> "A", 27 -> "AA").
///
/// Returns an empty string for column 0.
pub fn column_to_letter(column: u32) -> String {
    let mut reversed = Vec::with_capacity(4);
    let mut rest = column;
    while rest > 0 {
        rest -= 1;
        reversed.push(b'A' + (rest % 26) as u8);
        rest /= 26;
    }
    reversed.iter().rev().map(|&b| b as char).collect()
}

/// Build a cell reference (`"AB10"`) from a 1-based row and column.
pub fn coordinate_from_row_col(row: u32, column: u32) -> String {
    let mut out = column_to_letter(column);
    out.push_str(itoa::Buffer::new().format(row));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_to_column() {
        assert_eq!(letter_to_column("A").unwrap(), 1);
        assert_eq!(letter_to_column("Z").unwrap(), 26);
        assert_eq!(letter_to_column("AA").unwrap(), 27);
        assert_eq!(letter_to_column("AV").unwrap(), 48);
        assert_eq!(letter_to_column("AX").unwrap(), 50);
        assert_eq!(letter_to_column("ZZ").unwrap(), 702);
        assert_eq!(letter_to_column("XFD").unwrap(), 16384);
    }

    #[test]
    fn test_letter_to_column_case_insensitive() {
        assert_eq!(letter_to_column("ab").unwrap(), 28);
        assert_eq!(letter_to_column("aB").unwrap(), 28);
    }

    #[test]
    fn test_letter_to_column_rejects_bad_input() {
        assert!(letter_to_column("").is_err());
        assert!(letter_to_column("A1").is_err());
        assert!(letter_to_column("XFE").is_err());
        assert!(letter_to_column("AAAAAAAAAA").is_err());
    }

    #[test]
    fn test_column_to_letter() {
        assert_eq!(column_to_letter(1), "A");
        assert_eq!(column_to_letter(26), "Z");
        assert_eq!(column_to_letter(27), "AA");
        assert_eq!(column_to_letter(50), "AX");
        assert_eq!(column_to_letter(702), "ZZ");
        assert_eq!(column_to_letter(703), "AAA");
        assert_eq!(column_to_letter(16384), "XFD");
        assert_eq!(column_to_letter(0), "");
    }

    #[test]
    fn test_column_roundtrip() {
        for col in 1..=MAX_COLUMN {
            assert_eq!(letter_to_column(&column_to_letter(col)).unwrap(), col);
        }
        for letters in ["a", "zz", "Ab", "xfd", "Q"] {
            let col = letter_to_column(letters).unwrap();
            assert_eq!(column_to_letter(col), letters.to_ascii_uppercase());
        }
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("A1").unwrap(), Coordinate::new(1, 1));
        assert_eq!(parse_coordinate("ab10").unwrap(), Coordinate::new(28, 10));
        assert_eq!(
            parse_coordinate("XFD1048576").unwrap(),
            Coordinate::new(16384, 1_048_576)
        );
    }

    #[test]
    fn test_parse_coordinate_errors() {
        for bad in ["", "A", "1", "A0", "1A", "A1B", " A1", "A-1", "A1048577", "XFE1"] {
            assert!(parse_coordinate(bad).is_err(), "{bad:?} should be rejected");
        }
        assert!(parse_coordinate("A99999999999999999999").is_err());
    }

    #[test]
    fn test_split_reference() {
        assert_eq!(split_reference(b"AB12"), Some((&b"AB"[..], &b"12"[..])));
        assert_eq!(split_reference(b"AB"), None);
        assert_eq!(split_reference(b"12"), None);
        assert_eq!(split_reference(b"A1:B2"), None);
    }

    #[test]
    fn test_coordinate_from_row_col() {
        assert_eq!(coordinate_from_row_col(1, 1), "A1");
        assert_eq!(coordinate_from_row_col(10, 28), "AB10");
    }

    #[test]
    fn test_parse_number_bytes() {
        assert_eq!(parse_u32_bytes(b"4294967295"), Some(u32::MAX));
        assert!(parse_u32_bytes(b"4294967296").is_none());
        assert!(parse_u32_bytes(b"").is_none());
        assert_eq!(parse_f64_bytes(b"42"), Some(42.0));
        assert_eq!(parse_f64_bytes(b"-1.5E3"), Some(-1500.0));
        assert!(parse_f64_bytes(b"abc").is_none());
    }
}
