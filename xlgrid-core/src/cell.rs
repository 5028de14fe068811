//! Cell values and their display text.

use std::sync::Arc;

/// Shared, immutable string storage for cell text.
pub type InternedString = Arc<str>;

/// The value held by a single cell.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    /// Present in the sheet but holding no value (e.g. a styled blank cell).
    Empty,
    String(InternedString),
    Number(f64),
    Boolean(bool),
    /// An error literal such as `#DIV/0!`.
    Error(String),
    /// An ISO 8601 date stored with the `d` cell type.
    Date(String),
    /// A formula without the leading `=`, with the value last computed for it.
    Formula {
        formula: String,
        cached: Option<Box<CellValue>>,
        /// For array formulas, the block the result fills.
        array_range: Option<String>,
    },
}

impl CellValue {
    pub fn string(text: impl AsRef<str>) -> Self {
        CellValue::String(Arc::from(text.as_ref()))
    }

    /// A formula cell from user text; a leading `=` is dropped.
    pub fn formula(text: &str) -> Self {
        CellValue::Formula {
            formula: text.strip_prefix('=').unwrap_or(text).to_string(),
            cached: None,
            array_range: None,
        }
    }

    /// Text shown for this value in a rendered sheet.
    ///
    /// Formulas show their cached result, or nothing if they were never computed.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::String(s) => s.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Boolean(true) => "TRUE".to_string(),
            CellValue::Boolean(false) => "FALSE".to_string(),
            CellValue::Error(e) => e.clone(),
            CellValue::Date(d) => d.clone(),
            CellValue::Formula { cached, .. } => cached
                .as_deref()
                .map(CellValue::display_text)
                .unwrap_or_default(),
        }
    }

    /// Like [`display_text`](Self::display_text), but formulas show `=<formula>`.
    pub fn formula_text(&self) -> String {
        match self {
            CellValue::Formula { formula, .. } => format!("={formula}"),
            other => other.display_text(),
        }
    }
}

/// Render a number the way a spreadsheet shows it in General format:
/// integral values without a fractional part, others in shortest round-trip form.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        itoa::Buffer::new().format(n as i64).to_string()
    } else {
        ryu::Buffer::new().format(n).to_string()
    }
}
