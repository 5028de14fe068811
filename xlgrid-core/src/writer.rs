//! XML part writers used when saving a workbook package.

#[cfg(feature = "fast-hash")]
use hashbrown::HashMap;
#[cfg(not(feature = "fast-hash"))]
use std::collections::HashMap;
use std::io::{Seek, Write};

use chrono::{SecondsFormat, Utc};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::cell::{format_number, CellValue};
use crate::error::Result;
use crate::package::rels_path_for;
use crate::utils::coordinate_from_row_col;
use crate::workbook::NamedRange;
use crate::worksheet::{CellData, Worksheet};

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
"#;
const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Minimal stylesheet for packages that arrived without one.
const DEFAULT_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// Escape text for use in XML content or attribute values.
///
/// Control characters that XML 1.0 cannot carry are dropped.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(ch),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

/// Unique strings across all sheets, in first-seen order, plus their indices.
pub fn collect_shared_strings(worksheets: &[Worksheet]) -> (Vec<&str>, HashMap<&str, usize>) {
    let mut strings = Vec::new();
    let mut index = HashMap::new();
    for worksheet in worksheets {
        for (_, _, cell) in worksheet.sorted_cells() {
            if let CellValue::String(s) = &cell.value {
                let s: &str = s;
                index.entry(s).or_insert_with(|| {
                    strings.push(s);
                    strings.len() - 1
                });
            }
        }
    }
    (strings, index)
}

/// Package path of the `sheet_id`th worksheet as written.
pub fn sheet_path(sheet_id: usize) -> String {
    format!("xl/worksheets/sheet{sheet_id}.xml")
}

fn write_part<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    path: &str,
    content: &str,
) -> Result<()> {
    write_raw_part(zip, options, path, content.as_bytes())
}

/// Write a part's bytes unchanged.
pub fn write_raw_part<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    path: &str,
    data: &[u8],
) -> Result<()> {
    zip.start_file(path, options)?;
    zip.write_all(data)?;
    Ok(())
}

/// `[Content_Types].xml` for the parts this writer produces, plus the
/// `Default` and `Override` entries of carried parts.
pub fn write_content_types<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    sheet_count: usize,
    has_shared_strings: bool,
    extra_defaults: &[(String, String)],
    extra_overrides: &[(String, String)],
) -> Result<()> {
    let mut xml = String::from(XML_HEADER);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>"#);
    for (extension, content_type) in extra_defaults {
        xml.push_str(&format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            escape_xml(extension),
            escape_xml(content_type)
        ));
    }
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    for idx in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Override PartName="/{}" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            sheet_path(idx)
        ));
    }
    for (part, content_type) in extra_overrides {
        xml.push_str(&format!(
            r#"<Override PartName="/{}" ContentType="{}"/>"#,
            escape_xml(part),
            escape_xml(content_type)
        ));
    }
    if has_shared_strings {
        xml.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
    }
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#);
    write_part(zip, options, "[Content_Types].xml", &xml)
}

pub fn write_rels<W: Write + Seek>(zip: &mut ZipWriter<W>, options: SimpleFileOptions) -> Result<()> {
    let mut xml = String::from(XML_HEADER);
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#);
    write_part(zip, options, "_rels/.rels", &xml)
}

pub fn write_doc_props<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    sheet_names: &[String],
) -> Result<()> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut core = String::from(XML_HEADER);
    core.push_str(&format!(
        r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:creator>xlgrid</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified></cp:coreProperties>"#
    ));
    write_part(zip, options, "docProps/core.xml", &core)?;

    let mut app = String::from(XML_HEADER);
    app.push_str(&format!(
        r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>xlgrid</Application><TitlesOfParts><vt:vector size="{}" baseType="lpstr">"#,
        sheet_names.len()
    ));
    for name in sheet_names {
        app.push_str(&format!("<vt:lpstr>{}</vt:lpstr>", escape_xml(name)));
    }
    app.push_str("</vt:vector></TitlesOfParts></Properties>");
    write_part(zip, options, "docProps/app.xml", &app)
}

pub fn write_workbook_xml<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    sheet_names: &[String],
    named_ranges: &[NamedRange],
    recalculate_on_load: bool,
    date1904: bool,
) -> Result<()> {
    let mut xml = String::from(XML_HEADER);
    xml.push_str(&format!(r#"<workbook xmlns="{NS_MAIN}" xmlns:r="{NS_REL}">"#));
    if date1904 {
        xml.push_str(r#"<workbookPr date1904="1"/>"#);
    }
    xml.push_str("<sheets>");
    for (idx, name) in sheet_names.iter().enumerate() {
        let id = idx + 1;
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{id}" r:id="rId{id}"/>"#,
            escape_xml(name)
        ));
    }
    xml.push_str("</sheets>");
    if !named_ranges.is_empty() {
        xml.push_str("<definedNames>");
        for named in named_ranges {
            xml.push_str(&format!(r#"<definedName name="{}""#, escape_xml(&named.name)));
            if let Some(local) = named.local_sheet_id {
                xml.push_str(&format!(r#" localSheetId="{local}""#));
            }
            xml.push_str(&format!(">{}</definedName>", escape_xml(&named.range)));
        }
        xml.push_str("</definedNames>");
    }
    if recalculate_on_load {
        xml.push_str(r#"<calcPr fullCalcOnLoad="1"/>"#);
    }
    xml.push_str("</workbook>");
    write_part(zip, options, "xl/workbook.xml", &xml)
}

pub fn write_workbook_rels<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    sheet_count: usize,
    has_shared_strings: bool,
    extra: &[(String, String)],
) -> Result<()> {
    let mut xml = String::from(XML_HEADER);
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    for id in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#
        ));
    }
    let styles_id = sheet_count + 1;
    xml.push_str(&format!(
        r#"<Relationship Id="rId{styles_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#
    ));
    let mut next_id = styles_id + 1;
    if has_shared_strings {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{next_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#
        ));
        next_id += 1;
    }
    for (kind, target) in extra {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{next_id}" Type="{}" Target="{}"/>"#,
            escape_xml(kind),
            escape_xml(target)
        ));
        next_id += 1;
    }
    xml.push_str("</Relationships>");
    write_part(zip, options, "xl/_rels/workbook.xml.rels", &xml)
}

/// Write `xl/styles.xml`, reusing the original stylesheet bytes when present.
pub fn write_styles_xml<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    original: Option<&[u8]>,
) -> Result<()> {
    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(original.unwrap_or(DEFAULT_STYLES.as_bytes()))?;
    Ok(())
}

pub fn write_shared_strings<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    strings: &[&str],
) -> Result<()> {
    let mut xml = String::from(XML_HEADER);
    xml.push_str(&format!(
        r#"<sst xmlns="{NS_MAIN}" count="{0}" uniqueCount="{0}">"#,
        strings.len()
    ));
    for s in strings {
        xml.push_str("<si>");
        push_text_element(&mut xml, s);
        xml.push_str("</si>");
    }
    xml.push_str("</sst>");
    write_part(zip, options, "xl/sharedStrings.xml", &xml)
}

fn push_text_element(out: &mut String, text: &str) {
    let needs_preserve = text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace);
    if needs_preserve {
        out.push_str(r#"<t xml:space="preserve">"#);
    } else {
        out.push_str("<t>");
    }
    out.push_str(&escape_xml(text));
    out.push_str("</t>");
}

/// Write a worksheet part and, when it has any, its relationships.
///
/// A loaded sheet keeps its own XML around the regenerated `<dimension>`
/// and `<sheetData>`.
pub fn write_worksheet_xml<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    worksheet: &Worksheet,
    sheet_id: usize,
    shared_strings: &HashMap<&str, usize>,
) -> Result<()> {
    let layout = worksheet.layout();
    let dimension = format!(r#"<dimension ref="{}"/>"#, worksheet.dimension());

    let mut xml = String::from(XML_HEADER);
    match layout {
        Some(layout) => {
            xml.push_str(&layout.head);
            xml.push_str(&dimension);
            xml.push_str(&layout.before_data);
        }
        None => {
            xml.push_str(&format!(r#"<worksheet xmlns="{NS_MAIN}" xmlns:r="{NS_REL}">"#));
            xml.push_str(&dimension);
        }
    }

    xml.push_str("<sheetData>");
    let mut current_row: Option<u32> = None;
    let mut row_buf = itoa::Buffer::new();
    for (row, column, cell) in worksheet.sorted_cells() {
        if current_row != Some(row) {
            if current_row.is_some() {
                xml.push_str("</row>");
            }
            xml.push_str(r#"<row r=""#);
            xml.push_str(row_buf.format(row));
            xml.push_str(r#"">"#);
            current_row = Some(row);
        }
        format_cell(&mut xml, row, column, cell, shared_strings);
    }
    if current_row.is_some() {
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");
    if let Some(layout) = layout {
        xml.push_str(&layout.tail);
    }
    xml.push_str("</worksheet>");

    let path = sheet_path(sheet_id);
    write_part(zip, options, &path, &xml)?;
    if let Some(rels) = layout.and_then(|layout| layout.rels.as_deref()) {
        write_raw_part(zip, options, &rels_path_for(&path), rels)?;
    }
    Ok(())
}

/// Append one `<c>` element.
pub fn format_cell(
    out: &mut String,
    row: u32,
    column: u32,
    cell: &CellData,
    shared_strings: &HashMap<&str, usize>,
) {
    out.push_str(r#"<c r=""#);
    out.push_str(&coordinate_from_row_col(row, column));
    out.push('"');
    if let Some(style) = cell.style_index {
        out.push_str(r#" s=""#);
        out.push_str(itoa::Buffer::new().format(style));
        out.push('"');
    }

    match &cell.value {
        CellValue::Empty => out.push_str("/>"),
        CellValue::String(s) => {
            if let Some(idx) = shared_strings.get(s.as_ref()) {
                out.push_str(r#" t="s"><v>"#);
                out.push_str(itoa::Buffer::new().format(*idx));
                out.push_str("</v></c>");
            } else {
                out.push_str(r#" t="inlineStr"><is>"#);
                push_text_element(out, s);
                out.push_str("</is></c>");
            }
        }
        CellValue::Number(n) => {
            out.push_str("><v>");
            out.push_str(&format_number(*n));
            out.push_str("</v></c>");
        }
        CellValue::Boolean(b) => {
            out.push_str(r#" t="b"><v>"#);
            out.push(if *b { '1' } else { '0' });
            out.push_str("</v></c>");
        }
        CellValue::Error(e) => {
            out.push_str(r#" t="e"><v>"#);
            out.push_str(&escape_xml(e));
            out.push_str("</v></c>");
        }
        CellValue::Date(d) => {
            out.push_str(r#" t="d"><v>"#);
            out.push_str(&escape_xml(d));
            out.push_str("</v></c>");
        }
        CellValue::Formula {
            formula,
            cached,
            array_range,
        } => {
            let (type_attr, value) = match cached.as_deref() {
                Some(CellValue::Number(n)) => ("", Some(format_number(*n))),
                Some(CellValue::Boolean(b)) => (r#" t="b""#, Some(if *b { "1" } else { "0" }.to_string())),
                Some(CellValue::Error(e)) => (r#" t="e""#, Some(e.clone())),
                Some(CellValue::Empty) | None => ("", None),
                Some(other) => (r#" t="str""#, Some(other.display_text())),
            };
            out.push_str(type_attr);
            match array_range {
                Some(range) => {
                    out.push_str(r#"><f t="array" ref=""#);
                    out.push_str(&escape_xml(range));
                    out.push_str(r#"">"#);
                }
                None => out.push_str("><f>"),
            }
            out.push_str(&escape_xml(formula));
            out.push_str("</f>");
            if let Some(value) = value {
                out.push_str("<v>");
                out.push_str(&escape_xml(&value));
                out.push_str("</v>");
            }
            out.push_str("</c>");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(cell: CellData, strings: &HashMap<&str, usize>) -> String {
        let mut out = String::new();
        format_cell(&mut out, 2, 3, &cell, strings);
        out
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(escape_xml("line\nbreak\u{1}"), "line\nbreak");
    }

    #[test]
    fn test_format_cell_variants() {
        let mut strings = HashMap::new();
        strings.insert("hello", 0usize);

        assert_eq!(
            render(CellData::new(CellValue::string("hello")), &strings),
            r#"<c r="C2" t="s"><v>0</v></c>"#
        );
        assert_eq!(
            render(CellData::new(CellValue::Number(1.5)), &strings),
            r#"<c r="C2"><v>1.5</v></c>"#
        );
        assert_eq!(
            render(CellData::new(CellValue::Boolean(true)), &strings),
            r#"<c r="C2" t="b"><v>1</v></c>"#
        );
        assert_eq!(
            render(
                CellData {
                    value: CellValue::Empty,
                    style_index: Some(3)
                },
                &strings
            ),
            r#"<c r="C2" s="3"/>"#
        );
        assert_eq!(
            render(CellData::new(CellValue::formula("=A1&\"x\"")), &strings),
            r#"<c r="C2"><f>A1&amp;&quot;x&quot;</f></c>"#
        );
        assert_eq!(
            render(
                CellData::new(CellValue::Formula {
                    formula: "A1:A2*10".into(),
                    cached: Some(Box::new(CellValue::Number(10.0))),
                    array_range: Some("C2:C3".into()),
                }),
                &strings
            ),
            r#"<c r="C2"><f t="array" ref="C2:C3">A1:A2*10</f><v>10</v></c>"#
        );
    }

    #[test]
    fn test_worksheet_without_layout_gets_plain_root() {
        let mut ws = Worksheet::new("S");
        ws.set_cell_value(1, 1, CellValue::Number(1.0));
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        write_worksheet_xml(&mut zip, SimpleFileOptions::default(), &ws, 1, &HashMap::new()).unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert!(archive.by_name("xl/worksheets/_rels/sheet1.xml.rels").is_err());
        let mut xml = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("xl/worksheets/sheet1.xml").unwrap(), &mut xml).unwrap();
        assert!(xml.ends_with(
            r#"<dimension ref="A1"/><sheetData><row r="1"><c r="A1"><v>1</v></c></row></sheetData></worksheet>"#
        ));
    }

    #[test]
    fn test_unshared_string_written_inline() {
        let strings = HashMap::new();
        assert_eq!(
            render(CellData::new(CellValue::string(" padded")), &strings),
            r#"<c r="C2" t="inlineStr"><is><t xml:space="preserve"> padded</t></is></c>"#
        );
    }

    #[test]
    fn test_collect_shared_strings_dedupes() {
        let mut ws = Worksheet::new("S");
        ws.set_cell_value(1, 1, CellValue::string("a"));
        ws.set_cell_value(1, 2, CellValue::string("b"));
        ws.set_cell_value(2, 1, CellValue::string("a"));
        ws.set_cell_value(2, 2, CellValue::Number(1.0));
        let sheets = vec![ws];
        let (strings, index) = collect_shared_strings(&sheets);
        assert_eq!(strings, vec!["a", "b"]);
        assert_eq!(index.get("b"), Some(&1));
    }
}
