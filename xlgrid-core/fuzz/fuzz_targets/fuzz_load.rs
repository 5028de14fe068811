#![no_main]

//! Fuzz target for loading arbitrary bytes as an xlsx package.
//!
//! Malformed archives and parts must fail with an error, never a panic.
//! Whatever loads must save and load again.

use libfuzzer_sys::fuzz_target;
use xlgrid_core::{read_window, Workbook};

fuzz_target!(|data: &[u8]| {
    let Ok(workbook) = Workbook::load_from_bytes(data) else {
        return;
    };

    for name in workbook.sheet_names() {
        let _ = read_window(&workbook, Some(name), None, true);
    }

    if let Ok(bytes) = workbook.save_to_bytes() {
        let reloaded = Workbook::load_from_bytes(&bytes).expect("saved workbook must load");
        assert_eq!(reloaded.worksheets().len(), workbook.worksheets().len());
    }
});
