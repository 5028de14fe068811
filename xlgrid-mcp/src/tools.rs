//! Tool registry and handlers.
//!
//! Every handler resolves the document through the shared cache, holds its
//! lock for the whole call, and persists before answering when it changed
//! anything.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use xlgrid_core::{access, AppliedWrite, Document, DocumentCache};

use crate::error::McpError;
use crate::protocol::{CallToolResult, Content};
use crate::render::render_table;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadSheetNamesParams {
    /// Absolute path to the Excel file
    pub file_absolute_path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DescribeSheetsParams {
    /// Absolute path to the Excel file
    pub file_absolute_path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadSheetDataParams {
    /// Absolute path to the Excel file
    pub file_absolute_path: String,
    /// Sheet name in the Excel file; the first sheet when omitted
    #[serde(default)]
    pub sheet_name: Option<String>,
    /// Range of cells in the Excel sheet (e.g., "A1:C10")
    #[serde(default)]
    pub range: Option<String>,
    /// Show formulas instead of their computed values
    #[serde(default)]
    pub show_formula: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WriteSheetDataParams {
    /// Absolute path to the Excel file
    pub file_absolute_path: String,
    /// Sheet name in the Excel file
    pub sheet_name: String,
    /// Range of cells in the Excel sheet (e.g., "A1:C10"); starts at A1 when omitted
    #[serde(default)]
    pub range: Option<String>,
    /// Data to write to the Excel sheet, row by row
    pub data: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WriteSheetFormulaParams {
    /// Absolute path to the Excel file
    pub file_absolute_path: String,
    /// Sheet name in the Excel file
    pub sheet_name: String,
    /// Range of cells in the Excel sheet (e.g., "A1:C10")
    pub range: String,
    /// Formulas to write, row by row; each must start with "="
    pub formulas: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CopySheetParams {
    /// Absolute path to the Excel file
    pub file_absolute_path: String,
    /// Sheet to copy
    pub src_sheet_name: String,
    /// Name of the new sheet
    pub dst_sheet_name: String,
}

/// One entry of the `describe_sheets` answer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SheetDescription<'a> {
    name: &'a str,
    used_range: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tables: Vec<TableDescription<'a>>,
}

#[derive(Debug, Serialize)]
struct TableDescription<'a> {
    name: &'a str,
    range: &'a str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    ReadSheetNames,
    DescribeSheets,
    ReadSheetData,
    WriteSheetData,
    WriteSheetFormula,
    CopySheet,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::ReadSheetNames,
        Tool::DescribeSheets,
        Tool::ReadSheetData,
        Tool::WriteSheetData,
        Tool::WriteSheetFormula,
        Tool::CopySheet,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::ReadSheetNames => "read_sheet_names",
            Tool::DescribeSheets => "describe_sheets",
            Tool::ReadSheetData => "read_sheet_data",
            Tool::WriteSheetData => "write_sheet_data",
            Tool::WriteSheetFormula => "write_sheet_formula",
            Tool::CopySheet => "copy_sheet",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Tool::ReadSheetNames => "List all sheet names in an Excel file",
            Tool::DescribeSheets => "List all sheet information of the Excel file: used range and tables",
            Tool::ReadSheetData => {
                "Read data from the Excel sheet. \
                 The number of columns and rows responded is limited to 50x50. \
                 To read more data, adjust range parameter and make requests again."
            }
            Tool::WriteSheetData => "Write data to the Excel sheet",
            Tool::WriteSheetFormula => "Write formulas to the Excel sheet",
            Tool::CopySheet => "Copy an existing sheet to a new sheet appended to the Excel file",
        }
    }

    pub fn input_schema(self) -> Value {
        let schema = match self {
            Tool::ReadSheetNames => schemars::schema_for!(ReadSheetNamesParams),
            Tool::DescribeSheets => schemars::schema_for!(DescribeSheetsParams),
            Tool::ReadSheetData => schemars::schema_for!(ReadSheetDataParams),
            Tool::WriteSheetData => schemars::schema_for!(WriteSheetDataParams),
            Tool::WriteSheetFormula => schemars::schema_for!(WriteSheetFormulaParams),
            Tool::CopySheet => schemars::schema_for!(CopySheetParams),
        };
        schema.to_value()
    }
}

/// Result of `tools/list`.
pub fn list_tools() -> Value {
    let tools: Vec<Value> = Tool::ALL
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name(),
                "description": tool.description(),
                "inputSchema": tool.input_schema(),
            })
        })
        .collect();
    json!({ "tools": tools })
}

fn parse_args<T: DeserializeOwned>(arguments: Option<Value>) -> Result<T, McpError> {
    let arguments = arguments.unwrap_or_else(|| Value::Object(Map::new()));
    Ok(serde_json::from_value(arguments)?)
}

/// Run the tool called `name`.
pub async fn call_tool(
    cache: &DocumentCache,
    name: &str,
    arguments: Option<Value>,
) -> Result<CallToolResult, McpError> {
    let tool = Tool::from_name(name).ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;
    match tool {
        Tool::ReadSheetNames => read_sheet_names(cache, parse_args(arguments)?).await,
        Tool::DescribeSheets => describe_sheets(cache, parse_args(arguments)?).await,
        Tool::ReadSheetData => read_sheet_data(cache, parse_args(arguments)?).await,
        Tool::WriteSheetData => write_sheet_data(cache, parse_args(arguments)?).await,
        Tool::WriteSheetFormula => write_sheet_formula(cache, parse_args(arguments)?).await,
        Tool::CopySheet => copy_sheet(cache, parse_args(arguments)?).await,
    }
}

async fn read_sheet_names(cache: &DocumentCache, params: ReadSheetNamesParams) -> Result<CallToolResult, McpError> {
    let handle = cache.get_or_open(&params.file_absolute_path).await?;
    let doc = handle.lock().await;
    let content = access::list_sheets(doc.workbook())
        .into_iter()
        .map(Content::text)
        .collect();
    Ok(CallToolResult { content })
}

async fn describe_sheets(cache: &DocumentCache, params: DescribeSheetsParams) -> Result<CallToolResult, McpError> {
    let handle = cache.get_or_open(&params.file_absolute_path).await?;
    let doc = handle.lock().await;
    let sheets: Vec<SheetDescription> = doc
        .workbook()
        .worksheets()
        .iter()
        .map(|ws| SheetDescription {
            name: ws.title(),
            used_range: ws.dimension(),
            tables: ws
                .tables()
                .iter()
                .map(|table| TableDescription {
                    name: &table.name,
                    range: &table.range,
                })
                .collect(),
        })
        .collect();
    let text = serde_json::to_string_pretty(&sheets).map_err(|e| McpError::Internal(e.to_string()))?;
    Ok(CallToolResult::text(text))
}

async fn read_sheet_data(cache: &DocumentCache, params: ReadSheetDataParams) -> Result<CallToolResult, McpError> {
    let handle = cache.get_or_open(&params.file_absolute_path).await?;
    let doc = handle.lock().await;
    let window = access::read_window(
        doc.workbook(),
        params.sheet_name.as_deref(),
        params.range.as_deref(),
        params.show_formula,
    )?;
    Ok(CallToolResult {
        content: vec![Content::html(render_table(&window))],
    })
}

async fn write_sheet_data(cache: &DocumentCache, params: WriteSheetDataParams) -> Result<CallToolResult, McpError> {
    let handle = cache.get_or_open(&params.file_absolute_path).await?;
    let mut doc = handle.lock().await;
    let applied = access::write_grid(
        doc.workbook_mut(),
        &params.sheet_name,
        params.range.as_deref(),
        &params.data,
    )?;
    persist_or_rollback(&mut doc, applied).await?;
    Ok(CallToolResult::text("File saved successfully"))
}

async fn write_sheet_formula(
    cache: &DocumentCache,
    params: WriteSheetFormulaParams,
) -> Result<CallToolResult, McpError> {
    let handle = cache.get_or_open(&params.file_absolute_path).await?;
    let mut doc = handle.lock().await;
    let applied = access::write_formulas(doc.workbook_mut(), &params.sheet_name, &params.range, &params.formulas)?;
    persist_or_rollback(&mut doc, applied).await?;
    Ok(CallToolResult::text("Formulas saved successfully"))
}

async fn copy_sheet(cache: &DocumentCache, params: CopySheetParams) -> Result<CallToolResult, McpError> {
    let handle = cache.get_or_open(&params.file_absolute_path).await?;
    let mut doc = handle.lock().await;
    access::copy_sheet(doc.workbook_mut(), &params.src_sheet_name, &params.dst_sheet_name)?;
    if let Err(e) = doc.persist().await {
        warn!(path = %doc.path().display(), error = %e, "save failed, dropping copied sheet");
        doc.workbook_mut().remove_sheet(&params.dst_sheet_name)?;
        return Err(e.into());
    }
    info!(
        path = %doc.path().display(),
        src = %params.src_sheet_name,
        dst = %params.dst_sheet_name,
        "copied sheet"
    );
    Ok(CallToolResult::text(format!(
        "Sheet {} copied to {}",
        params.src_sheet_name, params.dst_sheet_name
    )))
}

/// Persist `doc`; if that fails, undo `applied` so the cached copy matches the file.
async fn persist_or_rollback(doc: &mut Document, applied: AppliedWrite) -> Result<(), McpError> {
    if let Err(e) = doc.persist().await {
        warn!(path = %doc.path().display(), error = %e, "save failed, rolling back write");
        applied.rollback(doc.workbook_mut())?;
        return Err(e.into());
    }
    info!(
        path = %doc.path().display(),
        range = %applied.target(),
        cells = applied.cells_written(),
        "wrote cells"
    );
    Ok(())
}
