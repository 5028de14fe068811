//! Workbook representation and xlsx package I/O.

#[cfg(feature = "fast-hash")]
use hashbrown::HashMap;
#[cfg(not(feature = "fast-hash"))]
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rayon::prelude::*;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::cell::{CellValue, InternedString};
use crate::error::{Result, XlgridError};
use crate::formula::shift_formula;
use crate::layout::SheetLayout;
use crate::numfmt::NumberFormats;
use crate::package::{
    parse_relationships, parse_table, part_dir, rels_path_for, resolve_target, PackagePart, Passthrough, Table,
};
use crate::utils::{parse_coordinate_bytes, parse_f64_bytes, parse_u32_bytes, MAX_COLUMN, MAX_ROW};
use crate::worksheet::{CellData, Worksheet};
use crate::writer;

/// Longest sheet name a spreadsheet application accepts.
const MAX_SHEET_NAME_LEN: usize = 31;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// Parts the writer always produces itself. A stale calculation chain is
/// dropped rather than carried, since cells may have changed.
const REBUILT_PARTS: [&str; 9] = [
    "[Content_Types].xml",
    "_rels/.rels",
    "docProps/core.xml",
    "docProps/app.xml",
    WORKBOOK_PART,
    WORKBOOK_RELS_PART,
    "xl/sharedStrings.xml",
    "xl/styles.xml",
    "xl/calcChain.xml",
];

/// A defined name from `workbook.xml`.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedRange {
    pub name: String,
    /// Reference text, e.g. `'Sheet1'!$A$1:$B$2`.
    pub range: String,
    /// Index of the sheet this name is scoped to, if it is not workbook-global.
    pub local_sheet_id: Option<u32>,
}

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// An xlsx workbook held in memory.
#[derive(Clone, Debug, Default)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    named_ranges: Vec<NamedRange>,
    /// `xl/styles.xml` exactly as loaded; cell style indices point into it.
    styles_xml: Option<Vec<u8>>,
    formats: NumberFormats,
    passthrough: Passthrough,
}

/// What `workbook.xml` declares.
#[derive(Debug, Default)]
struct WorkbookXml {
    /// (name, sheetId, relationship id) per sheet, in tab order.
    sheets: Vec<(String, u32, String)>,
    named_ranges: Vec<NamedRange>,
    date1904: bool,
}

/// A worksheet part read from the archive, waiting to be parsed.
struct SheetPart {
    name: String,
    path: String,
    xml: Vec<u8>,
    rels: Option<Vec<u8>>,
}

/// How a cell's `<v>` text is to be read, from its `t` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellKind {
    Number,
    Shared,
    FormulaString,
    Inline,
    Boolean,
    Error,
    Date,
}

impl CellKind {
    fn from_attr(value: &[u8]) -> Self {
        match value {
            b"s" => CellKind::Shared,
            b"str" => CellKind::FormulaString,
            b"inlineStr" => CellKind::Inline,
            b"b" => CellKind::Boolean,
            b"e" => CellKind::Error,
            b"d" => CellKind::Date,
            _ => CellKind::Number,
        }
    }

    fn is_textual(self) -> bool {
        matches!(self, CellKind::Shared | CellKind::Inline | CellKind::FormulaString)
    }
}

/// The `t` attribute of an `<f>` element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum FormulaType {
    #[default]
    Normal,
    Shared,
    Array,
}

/// The cell that carries the text of a shared formula group.
struct SharedFormula {
    row: u32,
    column: u32,
    formula: String,
}

/// Which element the parser is currently collecting text for.
#[derive(Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    None,
    Value,
    Formula,
    Inline,
}

/// A `<c>` element being assembled while its children stream past.
struct PendingCell {
    row: u32,
    column: u32,
    kind: CellKind,
    style_index: Option<u32>,
    value: Option<String>,
    inline: Option<String>,
    formula: Option<String>,
    formula_type: FormulaType,
    formula_ref: Option<String>,
    shared_index: Option<u32>,
}

impl PendingCell {
    /// Read position, type and style from a `<c>` tag. A missing `r` means the
    /// cell sits right after the previous one in the current row.
    fn start(e: &BytesStart, row: u32, previous_column: u32, part: &str) -> Result<Self> {
        let mut pending = PendingCell {
            row: row.max(1),
            column: previous_column.saturating_add(1),
            kind: CellKind::Number,
            style_index: None,
            value: None,
            inline: None,
            formula: None,
            formula_type: FormulaType::Normal,
            formula_ref: None,
            shared_index: None,
        };
        for attr in e.attributes().flatten() {
            match attr.key.local_name().as_ref() {
                b"r" => {
                    if let Some(coord) = parse_coordinate_bytes(&attr.value) {
                        pending.row = coord.row;
                        pending.column = coord.column;
                    }
                }
                b"t" => pending.kind = CellKind::from_attr(&attr.value),
                b"s" => pending.style_index = parse_u32_bytes(&attr.value),
                _ => {}
            }
        }
        if pending.row > MAX_ROW || pending.column > MAX_COLUMN {
            return Err(XlgridError::ParseError(format!(
                "Cell position out of range in {}: row {}, column {}",
                part, pending.row, pending.column
            )));
        }
        Ok(pending)
    }

    fn read_formula_tag(&mut self, e: &BytesStart) {
        for attr in e.attributes().flatten() {
            match attr.key.local_name().as_ref() {
                b"t" => {
                    self.formula_type = match attr.value.as_ref() {
                        b"shared" => FormulaType::Shared,
                        b"array" => FormulaType::Array,
                        _ => FormulaType::Normal,
                    }
                }
                b"ref" => self.formula_ref = attr.unescape_value().ok().map(|v| v.into_owned()),
                b"si" => self.shared_index = parse_u32_bytes(&attr.value),
                _ => {}
            }
        }
    }

    fn push_text(&mut self, target: TextTarget, text: &str) {
        let slot = match target {
            TextTarget::None => return,
            TextTarget::Value => &mut self.value,
            TextTarget::Formula => &mut self.formula,
            TextTarget::Inline => &mut self.inline,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    /// Build the cell. Shared formula followers get the group's text moved to
    /// their own position.
    fn finish(
        self,
        shared_strings: &[InternedString],
        shared_formulas: &mut HashMap<u32, SharedFormula>,
    ) -> CellData {
        let PendingCell {
            row,
            column,
            kind,
            style_index,
            value,
            inline,
            formula,
            formula_type,
            formula_ref,
            shared_index,
        } = self;

        let value = match (kind, value) {
            (CellKind::Shared, Some(v)) => match v.trim().parse::<usize>() {
                Ok(idx) if idx < shared_strings.len() => CellValue::String(shared_strings[idx].clone()),
                _ => CellValue::string(v),
            },
            (CellKind::Inline, _) => CellValue::string(inline.unwrap_or_default()),
            (CellKind::FormulaString, Some(v)) => CellValue::string(v),
            (CellKind::Boolean, Some(v)) => CellValue::Boolean(v == "1" || v.eq_ignore_ascii_case("true")),
            (CellKind::Error, Some(v)) => CellValue::Error(v),
            (CellKind::Date, Some(v)) => CellValue::Date(v),
            (CellKind::Number, Some(v)) => match parse_f64_bytes(v.as_bytes()) {
                Some(n) => CellValue::Number(n),
                None => CellValue::string(v),
            },
            (kind, None) if kind.is_textual() => CellValue::string(""),
            (_, None) => CellValue::Empty,
        };

        let formula = formula.filter(|f| !f.is_empty());
        let formula = match (formula_type, shared_index, formula) {
            (FormulaType::Shared, Some(index), Some(text)) => {
                shared_formulas.insert(
                    index,
                    SharedFormula {
                        row,
                        column,
                        formula: text.clone(),
                    },
                );
                Some(text)
            }
            (FormulaType::Shared, Some(index), None) => shared_formulas.get(&index).map(|master| {
                shift_formula(
                    &master.formula,
                    row as i64 - master.row as i64,
                    column as i64 - master.column as i64,
                )
            }),
            (_, _, formula) => formula,
        };

        let value = match formula {
            Some(formula) => CellValue::Formula {
                formula,
                cached: (!matches!(value, CellValue::Empty)).then(|| Box::new(value)),
                array_range: formula_ref.filter(|_| formula_type == FormulaType::Array),
            },
            None => value,
        };

        CellData { value, style_index }
    }
}

/// The row a `<row>` tag opens: its `r` attribute, or the row after `previous`.
fn row_number(e: &BytesStart, previous: u32, part: &str) -> Result<u32> {
    let row = match attr_value(e, b"r") {
        Some(r) => r.trim().parse::<u32>().ok(),
        None => previous.checked_add(1),
    };
    row.filter(|r| (1..=MAX_ROW).contains(r)).ok_or_else(|| {
        XlgridError::ParseError(format!("Row number out of range in {} after row {}", part, previous))
    })
}

/// Unescaped value of the attribute whose local name is `key`.
pub(crate) fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

pub(crate) fn xml_error(part: &str, e: impl std::fmt::Display) -> XlgridError {
    XlgridError::ParseError(format!("XML parsing error in {}: {}", part, e))
}

/// Reject names a spreadsheet application would refuse to open.
pub fn validate_sheet_name(name: &str) -> Result<()> {
    let forbidden = [':', '\\', '/', '?', '*', '[', ']'];
    let len = name.chars().count();
    if len == 0
        || len > MAX_SHEET_NAME_LEN
        || name.contains(forbidden)
        || name.starts_with('\'')
        || name.ends_with('\'')
    {
        return Err(XlgridError::InvalidSheetName(name.to_string()));
    }
    Ok(())
}

impl Workbook {
    /// Create a new empty workbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a workbook from a file path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => XlgridError::NotFound(path.display().to_string()),
            _ => XlgridError::Io(e),
        })?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;
        let mut workbook = Workbook::new();
        workbook.parse_workbook(&mut archive)?;
        Ok(workbook)
    }

    /// Load a workbook from an in-memory package.
    pub fn load_from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;
        let mut workbook = Workbook::new();
        workbook.parse_workbook(&mut archive)?;
        Ok(workbook)
    }

    pub fn worksheets(&self) -> &[Worksheet] {
        &self.worksheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.worksheets.iter().map(Worksheet::title).collect()
    }

    pub fn named_ranges(&self) -> &[NamedRange] {
        &self.named_ranges
    }

    /// The text a spreadsheet application shows for `cell`. Numbers styled
    /// with a date or time format render as that date or time.
    pub fn display_text(&self, cell: &CellData) -> String {
        let number = match &cell.value {
            CellValue::Number(n) => Some(*n),
            CellValue::Formula { cached, .. } => match cached.as_deref() {
                Some(CellValue::Number(n)) => Some(*n),
                _ => None,
            },
            _ => None,
        };
        number
            .and_then(|n| self.formats.format_date(cell.style_index, n))
            .unwrap_or_else(|| cell.value.display_text())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.title() == name)
    }

    pub fn get_sheet_by_name(&self, name: &str) -> Result<&Worksheet> {
        self.position(name)
            .map(|idx| &self.worksheets[idx])
            .ok_or_else(|| XlgridError::WorksheetNotFound(name.to_string()))
    }

    pub fn get_sheet_by_name_mut(&mut self, name: &str) -> Result<&mut Worksheet> {
        match self.position(name) {
            Some(idx) => Ok(&mut self.worksheets[idx]),
            None => Err(XlgridError::WorksheetNotFound(name.to_string())),
        }
    }

    /// The named sheet, or the first sheet when no name is given.
    pub fn sheet(&self, name: Option<&str>) -> Result<&Worksheet> {
        match name {
            Some(name) => self.get_sheet_by_name(name),
            None => self.worksheets.first().ok_or(XlgridError::NoWorksheets),
        }
    }

    /// Mutable counterpart of [`sheet`](Self::sheet).
    pub fn sheet_mut(&mut self, name: Option<&str>) -> Result<&mut Worksheet> {
        match name {
            Some(name) => self.get_sheet_by_name_mut(name),
            None => self.worksheets.first_mut().ok_or(XlgridError::NoWorksheets),
        }
    }

    /// Append a new empty worksheet.
    pub fn create_sheet(&mut self, title: Option<String>) -> Result<&mut Worksheet> {
        let title = title.unwrap_or_else(|| format!("Sheet{}", self.worksheets.len() + 1));
        validate_sheet_name(&title)?;
        if self.position(&title).is_some() {
            return Err(XlgridError::WorksheetAlreadyExists(title));
        }
        self.worksheets.push(Worksheet::new(title));
        let last = self.worksheets.len() - 1;
        Ok(&mut self.worksheets[last])
    }

    /// Append a copy of `source` under the name `destination`.
    ///
    /// Cells and sheet layout are copied; tables, drawings and hyperlinks
    /// stay with the source sheet.
    pub fn copy_sheet(&mut self, source: &str, destination: &str) -> Result<&Worksheet> {
        let idx = self
            .position(source)
            .ok_or_else(|| XlgridError::WorksheetNotFound(source.to_string()))?;
        validate_sheet_name(destination)?;
        if self.position(destination).is_some() {
            return Err(XlgridError::WorksheetAlreadyExists(destination.to_string()));
        }
        let mut copy = self.worksheets[idx].clone();
        copy.set_title(destination.to_string());
        copy.detach_related_parts();
        self.worksheets.push(copy);
        let last = self.worksheets.len() - 1;
        Ok(&self.worksheets[last])
    }

    pub fn remove_sheet(&mut self, name: &str) -> Result<Worksheet> {
        let idx = self
            .position(name)
            .ok_or_else(|| XlgridError::WorksheetNotFound(name.to_string()))?;
        Ok(self.worksheets.remove(idx))
    }

    pub fn has_formulas(&self) -> bool {
        self.worksheets.iter().any(Worksheet::has_formulas)
    }

    /// Save the workbook to a file.
    ///
    /// The package is assembled in memory first so a failure part-way never
    /// leaves a truncated file behind.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.save_to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn save_to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.save_to_writer(&mut buffer)?;
        Ok(buffer.into_inner())
    }

    pub fn save_to_writer<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        self.write_workbook_contents(&mut zip)?;
        zip.finish()?;
        Ok(())
    }

    fn write_workbook_contents<W: Write + Seek>(&self, zip: &mut ZipWriter<W>) -> Result<()> {
        let options = file_options();
        let names: Vec<String> = self.worksheets.iter().map(|ws| ws.title().to_string()).collect();

        let (shared_strings, shared_index) = writer::collect_shared_strings(&self.worksheets);
        let has_shared_strings = !shared_strings.is_empty();

        // A carried part must not shadow a worksheet part written below.
        let sheet_count = names.len();
        let is_sheet_part = |name: &str| {
            (1..=sheet_count).any(|id| {
                let path = writer::sheet_path(id);
                name == path || name == rels_path_for(&path)
            })
        };
        let parts: Vec<&PackagePart> = self
            .passthrough
            .parts
            .iter()
            .filter(|part| !is_sheet_part(&part.name))
            .collect();
        let overrides: Vec<(String, String)> = self
            .passthrough
            .overrides
            .iter()
            .filter(|(name, _)| !is_sheet_part(name))
            .cloned()
            .collect();

        writer::write_content_types(
            zip,
            options,
            sheet_count,
            has_shared_strings,
            &self.passthrough.defaults,
            &overrides,
        )?;
        writer::write_rels(zip, options)?;
        writer::write_doc_props(zip, options, &names)?;
        writer::write_workbook_xml(
            zip,
            options,
            &names,
            &self.named_ranges,
            self.has_formulas(),
            self.formats.date1904(),
        )?;
        writer::write_workbook_rels(
            zip,
            options,
            sheet_count,
            has_shared_strings,
            &self.passthrough.workbook_rels,
        )?;
        if has_shared_strings {
            writer::write_shared_strings(zip, options, &shared_strings)?;
        }
        writer::write_styles_xml(zip, options, self.styles_xml.as_deref())?;
        for (idx, worksheet) in self.worksheets.iter().enumerate() {
            writer::write_worksheet_xml(zip, options, worksheet, idx + 1, &shared_index)?;
        }
        for part in parts {
            writer::write_raw_part(zip, options, &part.name, &part.data)?;
        }
        Ok(())
    }

    /// Parse the package, worksheets in parallel when there are several.
    fn parse_workbook<R: Read + Seek>(&mut self, archive: &mut ZipArchive<R>) -> Result<()> {
        let workbook_xml = Self::read_zip_file_to_vec(archive, WORKBOOK_PART)?;
        let rels = match Self::read_zip_file_to_vec(archive, WORKBOOK_RELS_PART).ok() {
            Some(xml) => parse_relationships(&xml, WORKBOOK_RELS_PART)?,
            None => Vec::new(),
        };
        let shared_strings_xml = Self::read_zip_file_to_vec(archive, "xl/sharedStrings.xml").ok();
        let content_types = Self::read_zip_file_to_vec(archive, "[Content_Types].xml").ok();
        self.styles_xml = Self::read_zip_file_to_vec(archive, "xl/styles.xml").ok();

        let declared = Self::parse_workbook_xml(Cursor::new(&workbook_xml))?;
        self.named_ranges = declared.named_ranges;
        self.formats = match &self.styles_xml {
            Some(xml) => NumberFormats::parse(xml)?,
            None => NumberFormats::default(),
        };
        self.formats.set_date1904(declared.date1904);

        let mut consumed: Vec<String> = REBUILT_PARTS.iter().map(|part| part.to_string()).collect();
        let mut sheet_parts: Vec<SheetPart> = Vec::with_capacity(declared.sheets.len());
        for (name, sheet_id, rid) in declared.sheets {
            let path = match rels.iter().find(|rel| rel.id == rid) {
                Some(rel) => resolve_target("xl", &rel.target),
                None => format!("xl/worksheets/sheet{}.xml", sheet_id),
            };
            let xml = Self::read_zip_file_to_vec(archive, &path)?;
            let rels_path = rels_path_for(&path);
            let sheet_rels = Self::read_zip_file_to_vec(archive, &rels_path).ok();
            consumed.push(rels_path);
            consumed.push(path.clone());
            sheet_parts.push(SheetPart {
                name,
                path,
                xml,
                rels: sheet_rels,
            });
        }

        let carried: Vec<String> = archive
            .file_names()
            .filter(|name| !name.ends_with('/') && !consumed.iter().any(|c| c.as_str() == *name))
            .map(str::to_string)
            .collect();
        for name in carried {
            let data = Self::read_zip_file_to_vec(archive, &name)?;
            self.passthrough.parts.push(PackagePart { name, data });
        }
        self.passthrough.link(content_types.as_deref(), &rels)?;

        let shared_strings = match shared_strings_xml {
            Some(xml) => Self::parse_shared_strings_xml(Cursor::new(&xml))?,
            None => Vec::new(),
        };
        let shared_strings = &shared_strings;
        let passthrough = &self.passthrough;

        let parse = |sheet: &SheetPart| -> Result<Worksheet> {
            let mut worksheet = Worksheet::new(sheet.name.clone());
            Self::parse_worksheet_xml(Cursor::new(&sheet.xml), shared_strings, &mut worksheet)?;
            if let Some(rels) = &sheet.rels {
                worksheet.set_tables(Self::sheet_tables(rels, &sheet.path, passthrough)?);
            }
            worksheet.set_layout(SheetLayout::capture(&sheet.xml, &sheet.path, sheet.rels.clone())?);
            Ok(worksheet)
        };
        let worksheets: Vec<Result<Worksheet>> = if sheet_parts.len() > 1 {
            sheet_parts.par_iter().map(parse).collect()
        } else {
            sheet_parts.iter().map(parse).collect()
        };

        for worksheet in worksheets {
            self.worksheets.push(worksheet?);
        }
        Ok(())
    }

    /// Tables a worksheet's relationships point at.
    fn sheet_tables(rels_xml: &[u8], sheet_path: &str, passthrough: &Passthrough) -> Result<Vec<Table>> {
        let dir = part_dir(sheet_path);
        Ok(parse_relationships(rels_xml, &rels_path_for(sheet_path))?
            .iter()
            .filter(|rel| rel.is_table() && !rel.external)
            .filter_map(|rel| passthrough.part(&resolve_target(dir, &rel.target)))
            .filter_map(parse_table)
            .collect())
    }

    fn read_zip_file_to_vec<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>> {
        let mut file = archive.by_name(path).map_err(|e| {
            XlgridError::InvalidFormat(format!("Failed to find {} in archive: {}", path, e))
        })?;
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Sheets, defined names and the date system from `workbook.xml`.
    fn parse_workbook_xml<R: BufRead>(reader: R) -> Result<WorkbookXml> {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);

        let mut declared = WorkbookXml::default();
        let mut pending_name: Option<(String, Option<u32>)> = None;
        let mut name_text = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.local_name().as_ref() == b"sheet" => {
                    let name = attr_value(&e, b"name");
                    let sheet_id = attr_value(&e, b"sheetId").and_then(|id| id.parse().ok());
                    let rid = attr_value(&e, b"id");
                    if let (Some(name), Some(sheet_id), Some(rid)) = (name, sheet_id, rid) {
                        declared.sheets.push((name, sheet_id, rid));
                    }
                }
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.local_name().as_ref() == b"workbookPr" => {
                    declared.date1904 = attr_value(&e, b"date1904").is_some_and(|v| v == "1" || v == "true");
                }
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"definedName" => {
                    if let Some(name) = attr_value(&e, b"name") {
                        let local = attr_value(&e, b"localSheetId").and_then(|id| id.parse().ok());
                        pending_name = Some((name, local));
                        name_text.clear();
                    }
                }
                Ok(Event::Text(e)) if pending_name.is_some() => {
                    name_text.push_str(&e.unescape().map_err(|e| xml_error("workbook.xml", e))?);
                }
                Ok(Event::End(e)) if e.local_name().as_ref() == b"definedName" => {
                    if let Some((name, local_sheet_id)) = pending_name.take() {
                        declared.named_ranges.push(NamedRange {
                            name,
                            range: std::mem::take(&mut name_text),
                            local_sheet_id,
                        });
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error("workbook.xml", e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(declared)
    }

    /// Shared string table; rich-text runs are concatenated, phonetic hints skipped.
    fn parse_shared_strings_xml<R: BufRead>(reader: R) -> Result<Vec<InternedString>> {
        let mut reader = Reader::from_reader(reader);
        // Whitespace inside <t> is significant.
        reader.config_mut().trim_text(false);

        let mut strings = Vec::new();
        let mut current = String::new();
        let mut in_t = false;
        let mut in_phonetic = false;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"t" if !in_phonetic => in_t = true,
                    b"rPh" => in_phonetic = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                    strings.push(InternedString::from(""));
                }
                Ok(Event::Text(e)) if in_t => {
                    current.push_str(&e.unescape().map_err(|e| xml_error("sharedStrings.xml", e))?);
                }
                Ok(Event::CData(e)) if in_t => {
                    current.push_str(&String::from_utf8_lossy(&e));
                }
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"t" => in_t = false,
                    b"rPh" => in_phonetic = false,
                    b"si" => {
                        strings.push(InternedString::from(current.as_str()));
                        current.clear();
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error("sharedStrings.xml", e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    fn parse_worksheet_xml<R: BufRead>(
        reader: R,
        shared_strings: &[InternedString],
        worksheet: &mut Worksheet,
    ) -> Result<()> {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(false);

        let part = worksheet.title().to_string();
        let mut row: u32 = 0;
        let mut column: u32 = 0;
        let mut cell: Option<PendingCell> = None;
        let mut shared_formulas: HashMap<u32, SharedFormula> = HashMap::new();
        let mut target = TextTarget::None;
        let mut in_phonetic = false;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"row" => {
                        row = row_number(&e, row, &part)?;
                        column = 0;
                    }
                    b"c" => cell = Some(PendingCell::start(&e, row, column, &part)?),
                    b"v" if cell.is_some() => target = TextTarget::Value,
                    b"f" => {
                        if let Some(pending) = cell.as_mut() {
                            pending.read_formula_tag(&e);
                            target = TextTarget::Formula;
                        }
                    }
                    b"t" if cell.is_some() && !in_phonetic => target = TextTarget::Inline,
                    b"rPh" => in_phonetic = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"row" => {
                        row = row_number(&e, row, &part)?;
                        column = 0;
                    }
                    b"c" => {
                        let pending = PendingCell::start(&e, row, column, &part)?;
                        row = pending.row;
                        column = pending.column;
                        let data = pending.finish(shared_strings, &mut shared_formulas);
                        worksheet.set_cell_data(row, column, data);
                    }
                    b"f" => {
                        if let Some(pending) = cell.as_mut() {
                            pending.read_formula_tag(&e);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if let (Some(pending), true) = (cell.as_mut(), target != TextTarget::None) {
                        let text = e.unescape().map_err(|e| xml_error(&part, e))?;
                        pending.push_text(target, &text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(pending) = cell.as_mut() {
                        pending.push_text(target, &String::from_utf8_lossy(&e));
                    }
                }
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            row = pending.row;
                            column = pending.column;
                            let data = pending.finish(shared_strings, &mut shared_formulas);
                            worksheet.set_cell_data(row, column, data);
                        }
                        target = TextTarget::None;
                    }
                    b"v" | b"f" | b"t" => target = TextTarget::None,
                    b"rPh" => in_phonetic = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(&part, e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_from_xml(xml: &str, shared: &[&str]) -> Worksheet {
        let shared: Vec<InternedString> = shared.iter().map(|s| InternedString::from(*s)).collect();
        let mut ws = Worksheet::new("Test");
        Workbook::parse_worksheet_xml(Cursor::new(xml), &shared, &mut ws).unwrap();
        ws
    }

    #[test]
    fn test_create_sheet() {
        let mut wb = Workbook::new();
        wb.create_sheet(Some("Data".to_string())).unwrap();
        wb.create_sheet(None).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Data", "Sheet2"]);
        assert!(matches!(
            wb.create_sheet(Some("Data".to_string())),
            Err(XlgridError::WorksheetAlreadyExists(_))
        ));
    }

    #[test]
    fn test_sheet_defaults_to_first() {
        let mut wb = Workbook::new();
        assert!(matches!(wb.sheet(None), Err(XlgridError::NoWorksheets)));
        wb.create_sheet(Some("First".to_string())).unwrap();
        wb.create_sheet(Some("Second".to_string())).unwrap();
        assert_eq!(wb.sheet(None).unwrap().title(), "First");
        assert_eq!(wb.sheet(Some("Second")).unwrap().title(), "Second");
        assert!(matches!(
            wb.sheet(Some("Third")),
            Err(XlgridError::WorksheetNotFound(name)) if name == "Third"
        ));
    }

    #[test]
    fn test_validate_sheet_name() {
        assert!(validate_sheet_name("Q1 results").is_ok());
        for bad in ["", "a/b", "x[1]", "what?", "'quoted'"] {
            assert!(validate_sheet_name(bad).is_err(), "{bad:?}");
        }
        assert!(validate_sheet_name(&"n".repeat(32)).is_err());
        assert!(validate_sheet_name(&"n".repeat(31)).is_ok());
    }

    #[test]
    fn test_copy_sheet() {
        let mut wb = Workbook::new();
        let ws = wb.create_sheet(Some("Src".to_string())).unwrap();
        ws.set_cell_value(1, 1, CellValue::string("v"));
        wb.copy_sheet("Src", "Dst").unwrap();
        wb.get_sheet_by_name_mut("Dst")
            .unwrap()
            .set_cell_value(1, 1, CellValue::string("changed"));

        assert_eq!(wb.sheet_names(), vec!["Src", "Dst"]);
        assert_eq!(
            wb.get_sheet_by_name("Src").unwrap().get_cell_value(1, 1),
            Some(&CellValue::string("v"))
        );
        assert!(matches!(wb.copy_sheet("Nope", "X"), Err(XlgridError::WorksheetNotFound(_))));
        assert!(matches!(
            wb.copy_sheet("Src", "Dst"),
            Err(XlgridError::WorksheetAlreadyExists(_))
        ));
    }

    #[test]
    fn test_parse_workbook_xml() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <workbookPr date1904="1"/>
    <sheets>
        <sheet name="R&amp;D" sheetId="8" r:id="rId1"/>
        <sheet name="Summary" sheetId="2" r:id="rId2"/>
    </sheets>
    <definedNames>
        <definedName name="Totals" localSheetId="1">Summary!$A$1:$B$2</definedName>
    </definedNames>
</workbook>"#;
        let declared = Workbook::parse_workbook_xml(Cursor::new(xml)).unwrap();
        assert_eq!(declared.sheets[0], ("R&D".to_string(), 8, "rId1".to_string()));
        assert_eq!(declared.sheets[1], ("Summary".to_string(), 2, "rId2".to_string()));
        assert!(declared.date1904);
        assert_eq!(
            declared.named_ranges,
            vec![NamedRange {
                name: "Totals".to_string(),
                range: "Summary!$A$1:$B$2".to_string(),
                local_sheet_id: Some(1),
            }]
        );
    }

    #[test]
    fn test_parse_shared_strings_rich_text_and_phonetic() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<si><t xml:space="preserve"> plain </t></si>
<si><r><t>bold</t></r><r><t> tail</t></r></si>
<si><t>漢字</t><rPh sb="0" eb="2"><t>かんじ</t></rPh></si>
<si/>
</sst>"#;
        let strings = Workbook::parse_shared_strings_xml(Cursor::new(xml)).unwrap();
        let strings: Vec<&str> = strings.iter().map(|s| s.as_ref()).collect();
        assert_eq!(strings, vec![" plain ", "bold tail", "漢字", ""]);
    }

    #[test]
    fn test_parse_worksheet_cell_types() {
        let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1">
  <c r="A1" t="s"><v>1</v></c>
  <c r="B1"><v>3.25</v></c>
  <c r="C1" t="b"><v>0</v></c>
  <c r="D1" t="inlineStr"><is><t>inline &amp; text</t></is></c>
  <c r="E1" t="e"><v>#DIV/0!</v></c>
</row>
<row r="3">
  <c r="A3"><f>SUM(B1:B2)</f><v>6</v></c>
  <c r="B3" t="str"><f>A1&amp;"x"</f><v>secondx</v></c>
  <c r="C3" s="2"/>
</row>
</sheetData></worksheet>"#;
        let ws = sheet_from_xml(xml, &["first", "second"]);
        assert_eq!(ws.get_cell_value(1, 1), Some(&CellValue::string("second")));
        assert_eq!(ws.get_cell_value(1, 2), Some(&CellValue::Number(3.25)));
        assert_eq!(ws.get_cell_value(1, 3), Some(&CellValue::Boolean(false)));
        assert_eq!(ws.get_cell_value(1, 4), Some(&CellValue::string("inline & text")));
        assert_eq!(ws.get_cell_value(1, 5), Some(&CellValue::Error("#DIV/0!".into())));
        assert_eq!(
            ws.get_cell_value(3, 1),
            Some(&CellValue::Formula {
                formula: "SUM(B1:B2)".into(),
                cached: Some(Box::new(CellValue::Number(6.0))),
                array_range: None,
            })
        );
        assert_eq!(ws.get_cell_value(3, 2).unwrap().display_text(), "secondx");
        assert_eq!(ws.get_cell(3, 3).unwrap().style_index, Some(2));
        assert_eq!(ws.extent(), crate::window::SheetExtent::new(5, 3));
    }

    #[test]
    fn test_parse_worksheet_implicit_positions() {
        let xml = r#"<worksheet><sheetData>
<row><c><v>1</v></c><c><v>2</v></c></row>
<row><c r="C2"><v>3</v></c><c><v>4</v></c></row>
</sheetData></worksheet>"#;
        let ws = sheet_from_xml(xml, &[]);
        assert_eq!(ws.get_cell_value(1, 2), Some(&CellValue::Number(2.0)));
        assert_eq!(ws.get_cell_value(2, 4), Some(&CellValue::Number(4.0)));
    }

    #[test]
    fn test_parse_worksheet_rejects_positions_off_the_grid() {
        let parse = |xml: &str| {
            let mut ws = Worksheet::new("Test");
            Workbook::parse_worksheet_xml(Cursor::new(xml), &[], &mut ws)
        };
        for xml in [
            r#"<worksheet><sheetData><row r="4294967295"><c><v>1</v></c></row></sheetData></worksheet>"#,
            r#"<worksheet><sheetData><row r="1048577"/></sheetData></worksheet>"#,
            r#"<worksheet><sheetData><row r="1048576"/><row/></sheetData></worksheet>"#,
            r#"<worksheet><sheetData><row r="1"><c r="XFD1"/><c><v>2</v></c></row></sheetData></worksheet>"#,
        ] {
            assert!(matches!(parse(xml), Err(XlgridError::ParseError(_))), "{xml}");
        }
        let last = r#"<worksheet><sheetData><row r="1048576"><c r="XFD1048576"><v>1</v></c></row></sheetData></worksheet>"#;
        assert!(parse(last).is_ok());
    }

    #[test]
    fn test_parse_worksheet_shared_and_array_formulas() {
        let xml = r#"<worksheet><sheetData>
<row r="1"><c r="A1"><v>1</v></c><c r="B1"><f t="shared" ref="B1:C3" si="0">A1*2+$A$1</f><v>3</v></c></row>
<row r="2"><c r="A2"><v>2</v></c><c r="B2"><f t="shared" si="0"/><v>5</v></c></row>
<row r="3"><c r="C3"><f t="shared" si="0"/><v>0</v></c><c r="D3"><f t="array" ref="D3:D4">A1:A2*10</f><v>10</v></c></row>
</sheetData></worksheet>"#;
        let ws = sheet_from_xml(xml, &[]);
        assert_eq!(ws.get_cell_value(1, 2).unwrap().formula_text(), "=A1*2+$A$1");
        assert_eq!(ws.get_cell_value(2, 2).unwrap().formula_text(), "=A2*2+$A$1");
        assert_eq!(ws.get_cell_value(3, 3).unwrap().formula_text(), "=B3*2+$A$1");
        assert_eq!(ws.get_cell_value(2, 2).unwrap().display_text(), "5");
        assert!(matches!(
            ws.get_cell_value(3, 4),
            Some(CellValue::Formula { array_range: Some(range), .. }) if range == "D3:D4"
        ));
    }

    fn zip_package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    const PACKAGE_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/xl/tables/table1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;
    const PACKAGE_WORKBOOK: &str = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
    const PACKAGE_WORKBOOK_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;
    const PACKAGE_SHEET: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><dimension ref="A1:B3"/><cols><col min="1" max="1" width="24" customWidth="1"/></cols><sheetData><row r="1"><c r="A1"><v>1</v></c><c r="B1"><f t="shared" ref="B1:B3" si="0">A1*2</f><v>2</v></c></row><row r="2"><c r="A2"><v>2</v></c><c r="B2"><f t="shared" si="0"/><v>4</v></c></row><row r="3"><c r="A3"><v>3</v></c><c r="B3"><f t="shared" si="0"/><v>6</v></c></row></sheetData><mergeCells count="1"><mergeCell ref="C1:D1"/></mergeCells><tableParts count="1"><tablePart r:id="rId1"/></tableParts></worksheet>"#;
    const PACKAGE_SHEET_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/table" Target="../tables/table1.xml"/></Relationships>"#;
    const PACKAGE_TABLE: &str = r#"<table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="1" name="Table1" displayName="Doubles" ref="A1:B3"/>"#;
    const PACKAGE_THEME: &str = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"/>"#;
    const PACKAGE_STYLES: &str = r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy-mm-dd"/></numFmts><cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="14"/><xf numFmtId="164"/></cellXfs></styleSheet>"#;

    fn sample_package() -> Vec<u8> {
        zip_package(&[
            ("[Content_Types].xml", PACKAGE_TYPES),
            ("xl/workbook.xml", PACKAGE_WORKBOOK),
            ("xl/_rels/workbook.xml.rels", PACKAGE_WORKBOOK_RELS),
            ("xl/worksheets/sheet1.xml", PACKAGE_SHEET),
            ("xl/worksheets/_rels/sheet1.xml.rels", PACKAGE_SHEET_RELS),
            ("xl/tables/table1.xml", PACKAGE_TABLE),
            ("xl/theme/theme1.xml", PACKAGE_THEME),
            ("xl/styles.xml", PACKAGE_STYLES),
            ("xl/calcChain.xml", r#"<calcChain xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"/>"#),
        ])
    }

    fn part_text(package: &[u8], name: &str) -> Option<String> {
        let mut archive = ZipArchive::new(Cursor::new(package)).unwrap();
        let mut file = archive.by_name(name).ok()?;
        let mut text = String::new();
        file.read_to_string(&mut text).unwrap();
        Some(text)
    }

    #[test]
    fn test_save_keeps_formulas_layout_and_unmodelled_parts() {
        let mut wb = Workbook::load_from_bytes(&sample_package()).unwrap();
        assert_eq!(
            wb.sheet(None).unwrap().tables(),
            &[Table {
                name: "Doubles".into(),
                range: "A1:B3".into()
            }]
        );
        wb.sheet_mut(None).unwrap().set_cell_value(5, 1, CellValue::string("edited"));

        let saved = wb.save_to_bytes().unwrap();
        let reloaded = Workbook::load_from_bytes(&saved).unwrap();
        let ws = reloaded.sheet(None).unwrap();
        assert_eq!(ws.get_cell_value(2, 2).unwrap().formula_text(), "=A2*2");
        assert_eq!(ws.get_cell_value(3, 2).unwrap().formula_text(), "=A3*2");
        assert_eq!(ws.get_cell_value(5, 1), Some(&CellValue::string("edited")));
        assert_eq!(ws.tables().len(), 1);

        let sheet_xml = part_text(&saved, "xl/worksheets/sheet1.xml").unwrap();
        assert!(sheet_xml.contains(r#"<dimension ref="A1:B5"/>"#));
        assert!(sheet_xml.contains(r#"<col min="1" max="1" width="24" customWidth="1"/>"#));
        assert!(sheet_xml.contains(r#"<mergeCell ref="C1:D1"/>"#));
        assert!(sheet_xml.contains(r#"<tablePart r:id="rId1"/>"#));
        assert_eq!(
            part_text(&saved, "xl/worksheets/_rels/sheet1.xml.rels").as_deref(),
            Some(PACKAGE_SHEET_RELS)
        );
        assert_eq!(part_text(&saved, "xl/theme/theme1.xml").as_deref(), Some(PACKAGE_THEME));
        assert_eq!(part_text(&saved, "xl/tables/table1.xml").as_deref(), Some(PACKAGE_TABLE));
        assert!(part_text(&saved, "xl/calcChain.xml").is_none());

        let types = part_text(&saved, "[Content_Types].xml").unwrap();
        assert!(types.contains(r#"PartName="/xl/theme/theme1.xml""#));
        assert!(types.contains(r#"PartName="/xl/tables/table1.xml""#));
        let rels = part_text(&saved, "xl/_rels/workbook.xml.rels").unwrap();
        assert!(rels.contains(r#"Target="theme/theme1.xml""#));
    }

    #[test]
    fn test_copy_sheet_leaves_related_parts_behind() {
        let mut wb = Workbook::load_from_bytes(&sample_package()).unwrap();
        wb.copy_sheet("Data", "Copy").unwrap();
        assert!(wb.get_sheet_by_name("Copy").unwrap().tables().is_empty());

        let saved = wb.save_to_bytes().unwrap();
        let copy_xml = part_text(&saved, "xl/worksheets/sheet2.xml").unwrap();
        assert!(copy_xml.contains(r#"<mergeCell ref="C1:D1"/>"#));
        assert!(!copy_xml.contains("tablePart"));
        assert!(part_text(&saved, "xl/worksheets/_rels/sheet2.xml.rels").is_none());
        assert_eq!(Workbook::load_from_bytes(&saved).unwrap().sheet_names(), vec!["Data", "Copy"]);
    }

    #[test]
    fn test_display_text_renders_dates() {
        let mut wb = Workbook::load_from_bytes(&sample_package()).unwrap();
        let ws = wb.sheet_mut(None).unwrap();
        ws.set_cell_data(
            6,
            1,
            CellData {
                value: CellValue::Number(45292.0),
                style_index: Some(1),
            },
        );
        ws.set_cell_data(
            7,
            1,
            CellData {
                value: CellValue::Number(45292.5),
                style_index: Some(2),
            },
        );
        let ws = wb.sheet(None).unwrap();
        assert_eq!(wb.display_text(ws.get_cell(6, 1).unwrap()), "01-01-24");
        assert_eq!(wb.display_text(ws.get_cell(7, 1).unwrap()), "2024-01-01");
        assert_eq!(wb.display_text(ws.get_cell(1, 1).unwrap()), "1");
    }

    #[test]
    fn test_bytes_roundtrip_with_multiple_sheets() {
        let mut wb = Workbook::new();
        let ws1 = wb.create_sheet(Some("Sheet1".to_string())).unwrap();
        ws1.set_cell_value(1, 1, CellValue::string("Sheet1 Data"));
        ws1.set_cell_value(2, 3, CellValue::formula("=A1"));
        let ws2 = wb.create_sheet(Some("Sheet2".to_string())).unwrap();
        ws2.set_cell_value(1, 1, CellValue::string("line1\nline2"));
        ws2.set_cell_value(2, 2, CellValue::Number(999.5));
        ws2.set_cell_value(3, 1, CellValue::Boolean(true));

        let bytes = wb.save_to_bytes().unwrap();
        assert_eq!(&bytes[0..2], b"PK");

        let loaded = Workbook::load_from_bytes(&bytes).unwrap();
        assert_eq!(loaded.sheet_names(), vec!["Sheet1", "Sheet2"]);
        let s1 = loaded.get_sheet_by_name("Sheet1").unwrap();
        assert_eq!(s1.get_cell_value(1, 1), Some(&CellValue::string("Sheet1 Data")));
        assert_eq!(s1.get_cell_value(2, 3), Some(&CellValue::formula("A1")));
        let s2 = loaded.get_sheet_by_name("Sheet2").unwrap();
        assert_eq!(s2.get_cell_value(1, 1), Some(&CellValue::string("line1\nline2")));
        assert_eq!(s2.get_cell_value(2, 2), Some(&CellValue::Number(999.5)));
        assert_eq!(s2.get_cell_value(3, 1), Some(&CellValue::Boolean(true)));
        assert_eq!(s2.extent(), crate::window::SheetExtent::new(2, 3));
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let err = Workbook::load("/definitely/not/here.xlsx").unwrap_err();
        assert!(matches!(err, XlgridError::NotFound(path) if path == "/definitely/not/here.xlsx"));
    }
}
