//! Worksheet XML outside `<sheetData>`.
//!
//! Saving rebuilds the cell grid, but column widths, views, merges, data
//! validation, hyperlinks, drawings and the rest of a loaded worksheet part
//! are written back byte for byte around it.

use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;

use crate::error::Result;
use crate::workbook::xml_error;

/// Top-level worksheet children that point into the part's relationships.
const RELATED_ELEMENTS: [&[u8]; 8] = [
    b"hyperlinks",
    b"drawing",
    b"legacyDrawing",
    b"legacyDrawingHF",
    b"picture",
    b"oleObjects",
    b"controls",
    b"tableParts",
];

/// The loaded text of a worksheet part around its cell grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetLayout {
    /// Root start tag and `<sheetPr>`, up to where `<dimension>` goes.
    pub(crate) head: String,
    /// Everything after `<dimension>` up to `<sheetData>`.
    pub(crate) before_data: String,
    /// Everything after `</sheetData>` up to the closing root tag.
    pub(crate) tail: String,
    /// The part's relationships, verbatim.
    pub(crate) rels: Option<Vec<u8>>,
}

#[derive(Default)]
struct Marks {
    root: Option<(usize, usize)>,
    sheet_pr_end: Option<usize>,
    dimension: Option<(usize, usize)>,
    data: Option<(usize, usize)>,
    root_close: Option<usize>,
}

impl Marks {
    fn note(&mut self, local_name: &[u8], start: usize, end: usize) {
        match local_name {
            b"sheetPr" => self.sheet_pr_end = Some(end),
            b"dimension" => self.dimension = Some((start, end)),
            b"sheetData" => self.data = Some((start, end)),
            _ => {}
        }
    }
}

fn position<R>(reader: &Reader<R>) -> usize {
    reader.buffer_position() as usize
}

impl SheetLayout {
    /// Split a worksheet part around its cell grid.
    ///
    /// `None` when the part is not an unprefixed `<worksheet>` with a
    /// `<sheetData>` child; such parts are rewritten from scratch on save.
    pub(crate) fn capture(xml: &[u8], part: &str, rels: Option<Vec<u8>>) -> Result<Option<Self>> {
        let mut reader = Reader::from_reader(xml);
        let mut marks = Marks::default();
        let mut depth = 0usize;
        let mut buf = Vec::new();
        let mut skipped = Vec::new();

        loop {
            let start = position(&reader);
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    depth += 1;
                    if depth == 1 {
                        if e.name().prefix().is_some() || e.local_name().as_ref() != b"worksheet" {
                            return Ok(None);
                        }
                        marks.root = Some((start, position(&reader)));
                    } else if depth == 2 {
                        let local = e.local_name().as_ref().to_vec();
                        let name = e.name().as_ref().to_vec();
                        reader
                            .read_to_end_into(QName(&name), &mut skipped)
                            .map_err(|e| xml_error(part, e))?;
                        skipped.clear();
                        depth -= 1;
                        marks.note(&local, start, position(&reader));
                    }
                }
                Ok(Event::Empty(e)) if depth == 1 => {
                    marks.note(e.local_name().as_ref(), start, position(&reader));
                }
                Ok(Event::End(_)) => {
                    if depth == 1 {
                        marks.root_close = Some(start);
                    }
                    depth = depth.saturating_sub(1);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(part, e)),
                _ => {}
            }
            buf.clear();
        }

        let (Some((root_start, root_end)), Some((data_start, data_end)), Some(close)) =
            (marks.root, marks.data, marks.root_close)
        else {
            return Ok(None);
        };
        let (head_end, body_start) = match marks.dimension {
            Some(span) => span,
            None => {
                let split = marks.sheet_pr_end.unwrap_or(root_end);
                (split, split)
            }
        };
        if !(root_start <= head_end && body_start <= data_start && data_end <= close) {
            return Ok(None);
        }

        let text = |from: usize, to: usize| std::str::from_utf8(&xml[from..to]).map(str::to_string);
        let (Ok(head), Ok(before_data), Ok(tail)) = (
            text(root_start, head_end),
            text(body_start, data_start),
            text(data_end, close),
        ) else {
            return Ok(None);
        };
        Ok(Some(SheetLayout {
            head,
            before_data,
            tail,
            rels,
        }))
    }

    /// The layout for a copy of the sheet: same structure, but without the
    /// elements that reference the source sheet's relationships.
    pub(crate) fn detached(&self) -> SheetLayout {
        SheetLayout {
            head: self.head.clone(),
            before_data: self.before_data.clone(),
            tail: strip_elements(&self.tail, &RELATED_ELEMENTS),
            rels: None,
        }
    }
}

/// Remove top-level elements named in `names` from an XML fragment.
fn strip_elements(fragment: &str, names: &[&[u8]]) -> String {
    let mut reader = Reader::from_str(fragment);
    let mut out = String::with_capacity(fragment.len());
    let mut kept_from = 0;

    loop {
        let start = position(&reader);
        let local = match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = e.local_name().as_ref().to_vec();
                let name = e.name().as_ref().to_vec();
                if reader.read_to_end(QName(&name)).is_err() {
                    return fragment.to_string();
                }
                local
            }
            Ok(Event::Empty(e)) => e.local_name().as_ref().to_vec(),
            Ok(Event::Eof) => break,
            Err(_) => return fragment.to_string(),
            _ => continue,
        };
        if names.contains(&local.as_slice()) {
            out.push_str(&fragment[kept_from..start]);
            kept_from = position(&reader);
        }
    }
    out.push_str(&fragment[kept_from..]);
    out
}
