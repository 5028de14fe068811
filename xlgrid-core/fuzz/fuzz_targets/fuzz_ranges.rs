#![no_main]

//! Fuzz target for A1 notation, range parsing, window clamping and write
//! reconciliation.
//!
//! Checks that no input panics, that anything parsed stays inside sheet
//! limits, and that served windows never exceed the request or the cap.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use xlgrid_core::{
    clamp_window, column_to_letter, letter_to_column, parse_coordinate, parse_coordinate_bytes,
    parse_range, reconcile, SheetExtent, MAX_COLUMN, MAX_ROW, MAX_WINDOW,
};

#[derive(Arbitrary, Debug)]
struct RangeFuzzInput {
    text: String,
    raw_bytes: Vec<u8>,
    column: u32,
    extent_columns: u16,
    extent_rows: u32,
    payload: Vec<Vec<u8>>,
}

/// String and byte coordinate parsers must agree.
fn fuzz_coordinate_consistency(input: &str) {
    match (parse_coordinate(input), parse_coordinate_bytes(input.as_bytes())) {
        (Ok(s), Some(b)) => assert_eq!(s, b, "parsers disagree on {:?}", input),
        (Err(_), None) => {}
        (s, b) => panic!("parsers disagree on {:?}: {:?} vs {:?}", input, s.ok(), b),
    }
}

fn fuzz_column_roundtrip(column: u32) {
    let letters = column_to_letter(column);
    if column == 0 {
        assert!(letters.is_empty());
    } else if column <= MAX_COLUMN {
        assert_eq!(letter_to_column(&letters).ok(), Some(column), "roundtrip failed for {}", column);
    }
}

fn fuzz_window(input: &RangeFuzzInput) {
    let extent = SheetExtent::new(
        u32::from(input.extent_columns).min(MAX_COLUMN),
        input.extent_rows.min(MAX_ROW),
    );
    let requested = parse_range(&input.text).ok();

    if let Some(range) = requested {
        assert!(range.start.column >= 1 && range.end.column <= MAX_COLUMN);
        assert!(range.start.row >= 1 && range.end.row <= MAX_ROW);
    }

    let Ok(window) = clamp_window(requested, MAX_WINDOW, extent) else {
        return;
    };
    if let Some(served) = window.served {
        assert!(served.is_ordered());
        assert!(served.column_count() <= MAX_WINDOW.columns as usize);
        assert!(served.row_count() <= MAX_WINDOW.rows as usize);
        if let Some(range) = requested {
            assert!(range.contains(served.start) && range.contains(served.end));
        }
    }

    if let Ok(plan) = reconcile(requested, &input.payload) {
        let target = plan.target();
        for (coordinate, _) in plan.assignments() {
            assert!(target.contains(coordinate));
        }
    }
}

fuzz_target!(|input: RangeFuzzInput| {
    fuzz_coordinate_consistency(&input.text);
    let _ = parse_coordinate_bytes(&input.raw_bytes);
    fuzz_column_roundtrip(input.column);
    fuzz_window(&input);
});
