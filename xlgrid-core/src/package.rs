//! Package plumbing: relationship files, content types, and the parts this
//! crate does not model but must carry through a load/save cycle.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::Result;
use crate::workbook::{attr_value, xml_error};

const REL_WORKSHEET: &str = "/worksheet";
const REL_STYLES: &str = "/styles";
const REL_SHARED_STRINGS: &str = "/sharedStrings";
const REL_CALC_CHAIN: &str = "/calcChain";
const REL_TABLE: &str = "/table";

/// One `<Relationship>` from a `.rels` part.
#[derive(Clone, Debug, PartialEq)]
pub struct Relationship {
    pub id: String,
    /// The relationship type URI.
    pub kind: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    pub fn is_table(&self) -> bool {
        self.kind.ends_with(REL_TABLE)
    }

    /// Relationships the workbook writer regenerates itself.
    fn is_rebuilt(&self) -> bool {
        [REL_WORKSHEET, REL_STYLES, REL_SHARED_STRINGS, REL_CALC_CHAIN]
            .iter()
            .any(|suffix| self.kind.ends_with(suffix))
    }
}

/// Parse a relationships part.
pub fn parse_relationships(xml: &[u8], part: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut rels = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr_value(&e, b"Id"), attr_value(&e, b"Target")) {
                    rels.push(Relationship {
                        id,
                        kind: attr_value(&e, b"Type").unwrap_or_default(),
                        target,
                        external: attr_value(&e, b"TargetMode").is_some_and(|m| m == "External"),
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(part, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// Resolve a relationship target against the folder of its source part.
///
/// `resolve_target("xl/worksheets", "../tables/table1.xml")` is
/// `"xl/tables/table1.xml"`; absolute targets drop their leading `/`.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`.
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Folder holding `part`, without a trailing `/`.
pub fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// A part copied through unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct PackagePart {
    pub name: String,
    pub data: Vec<u8>,
}

/// Everything in a loaded package the writer does not rebuild.
#[derive(Clone, Debug, Default)]
pub struct Passthrough {
    /// Parts written back verbatim, in archive order.
    pub parts: Vec<PackagePart>,
    /// `Default` content types by extension, other than `rels` and `xml`.
    pub defaults: Vec<(String, String)>,
    /// `Override` content types for passthrough parts, by part name without the leading `/`.
    pub overrides: Vec<(String, String)>,
    /// Workbook relationships pointing at passthrough parts, as (type, target).
    pub workbook_rels: Vec<(String, String)>,
}

impl Passthrough {
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.iter().find(|p| p.name == name).map(|p| p.data.as_slice())
    }

    /// Keep the content types and workbook relationships that concern kept parts.
    pub fn link(&mut self, content_types: Option<&[u8]>, workbook_rels: &[Relationship]) -> Result<()> {
        if let Some(xml) = content_types {
            let (defaults, overrides) = parse_content_types(xml)?;
            self.defaults = defaults
                .into_iter()
                .filter(|(ext, _)| !ext.eq_ignore_ascii_case("rels") && !ext.eq_ignore_ascii_case("xml"))
                .collect();
            self.overrides = overrides
                .into_iter()
                .filter(|(name, _)| self.part(name).is_some())
                .collect();
        }
        self.workbook_rels = workbook_rels
            .iter()
            .filter(|rel| !rel.external && !rel.is_rebuilt())
            .filter(|rel| self.part(&resolve_target("xl", &rel.target)).is_some())
            .map(|rel| (rel.kind.clone(), rel.target.clone()))
            .collect();
        Ok(())
    }
}

/// `Default` (extension, type) and `Override` (part name, type) entries.
#[allow(clippy::type_complexity)]
pub fn parse_content_types(xml: &[u8]) -> Result<(Vec<(String, String)>, Vec<(String, String)>)> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut defaults = Vec::new();
    let mut overrides = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                let content_type = attr_value(&e, b"ContentType");
                match (e.local_name().as_ref(), content_type) {
                    (b"Default", Some(content_type)) => {
                        if let Some(ext) = attr_value(&e, b"Extension") {
                            defaults.push((ext, content_type));
                        }
                    }
                    (b"Override", Some(content_type)) => {
                        if let Some(name) = attr_value(&e, b"PartName") {
                            let name = name.trim_start_matches('/').to_string();
                            overrides.push((name, content_type));
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("[Content_Types].xml", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok((defaults, overrides))
}

/// A table (list object) defined on a sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    /// The cells the table covers, e.g. `A1:C20`.
    pub range: String,
}

/// Read name and range from a table part. Prefers `displayName`, which is
/// what formulas and the application show.
pub fn parse_table(xml: &[u8]) -> Option<Table> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"table" => {
                let name = attr_value(&e, b"displayName").or_else(|| attr_value(&e, b"name"))?;
                let range = attr_value(&e, b"ref")?;
                return Some(Table { name, range });
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}
