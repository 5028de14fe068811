//! HTML table rendering of a sheet window.

use std::fmt::Write;

use xlgrid_core::SheetWindow;

/// Escape text for HTML element content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn cell_html(text: &str) -> String {
    escape_html(text).replace("\r\n", "<br>").replace('\n', "<br>")
}

/// Render `window` as a table.
///
/// The first header cell names the sheet, the served range and the full data
/// range, followed by one header cell per column letter. Each row starts with
/// its row number; the first row uses `th` cells, the rest `td`.
pub fn render_table(window: &SheetWindow) -> String {
    let served = window
        .window
        .served
        .map(|r| r.to_string())
        .unwrap_or_else(|| "none".to_string());
    let full = window
        .window
        .full
        .map(|r| r.to_string())
        .unwrap_or_else(|| "none".to_string());

    let mut html = String::from("<table>\n");
    // Writing into a String cannot fail.
    let _ = write!(
        html,
        "<tr><th>[{}] Current data range: {}, Full data range: {}</th>",
        escape_html(&window.sheet_name),
        served,
        full
    );
    for letter in &window.columns {
        let _ = write!(html, "<th>{letter}</th>");
    }
    html.push_str("</tr>\n");

    for (idx, (row, cells)) in window.rows.iter().enumerate() {
        let tag = if idx == 0 { "th" } else { "td" };
        html.push_str("<tr>");
        let _ = write!(html, "<{tag}>{row}</{tag}>");
        for text in cells {
            let _ = write!(html, "<{tag}>{}</{tag}>", cell_html(text));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>");
    html
}
