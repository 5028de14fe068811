use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use xlgrid_core::{CellValue, DocumentCache, Workbook};
use xlgrid_mcp::Server;

fn sample_workbook(dir: &TempDir) -> PathBuf {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(Some("Sheet1".to_string())).unwrap();
    ws.set_cell_value(1, 1, CellValue::string("name"));
    ws.set_cell_value(1, 2, CellValue::string("qty"));
    ws.set_cell_value(2, 1, CellValue::string("apple\npie"));
    ws.set_cell_value(2, 2, CellValue::Number(3.0));
    wb.create_sheet(Some("Notes".to_string())).unwrap();
    let path = dir.path().join("sample.xlsx");
    wb.save(&path).unwrap();
    path
}

async fn call(server: &Server, id: u64, tool: &str, arguments: Value) -> Value {
    let request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": tool, "arguments": arguments },
    });
    server.handle_message(&request.to_string()).await.unwrap()
}

fn text(response: &Value) -> &str {
    response["result"]["content"][0]["text"].as_str().unwrap()
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

#[tokio::test]
async fn test_read_sheet_names() {
    let dir = TempDir::new().unwrap();
    let path = sample_workbook(&dir);
    let server = Server::new(DocumentCache::new());

    let response = call(&server, 1, "read_sheet_names", json!({ "fileAbsolutePath": path_arg(&path) })).await;
    assert_eq!(
        response["result"]["content"],
        json!([{ "type": "text", "text": "Sheet1" }, { "type": "text", "text": "Notes" }])
    );
}

#[tokio::test]
async fn test_read_sheet_data_renders_table() {
    let dir = TempDir::new().unwrap();
    let path = sample_workbook(&dir);
    let server = Server::new(DocumentCache::new());

    let response = call(&server, 1, "read_sheet_data", json!({ "fileAbsolutePath": path_arg(&path) })).await;
    assert_eq!(response["result"]["content"][0]["mimeType"], "text/html");
    assert_eq!(
        text(&response),
        "<table>\n\
         <tr><th>[Sheet1] Current data range: A1:B2, Full data range: A1:B2</th><th>A</th><th>B</th></tr>\n\
         <tr><th>1</th><th>name</th><th>qty</th></tr>\n\
         <tr><td>2</td><td>apple<br>pie</td><td>3</td></tr>\n\
         </table>"
    );
}

#[tokio::test]
async fn test_write_then_read_through_cache_and_disk() {
    let dir = TempDir::new().unwrap();
    let path = sample_workbook(&dir);
    let server = Server::new(DocumentCache::new());

    let response = call(
        &server,
        1,
        "write_sheet_data",
        json!({
            "fileAbsolutePath": path_arg(&path),
            "sheetName": "Sheet1",
            "range": "B2:C3",
            "data": [["4", "fresh"], ["x", "y"]],
        }),
    )
    .await;
    assert_eq!(text(&response), "File saved successfully");
    assert_eq!(server.cache().len(), 1);

    let read = call(
        &server,
        2,
        "read_sheet_data",
        json!({ "fileAbsolutePath": path_arg(&path), "sheetName": "Sheet1", "range": "A2:C3" }),
    )
    .await;
    assert_eq!(
        text(&read),
        "<table>\n\
         <tr><th>[Sheet1] Current data range: A2:C3, Full data range: A1:C3</th><th>A</th><th>B</th><th>C</th></tr>\n\
         <tr><th>2</th><th>apple<br>pie</th><th>4</th><th>fresh</th></tr>\n\
         <tr><td>3</td><td></td><td>x</td><td>y</td></tr>\n\
         </table>"
    );

    let from_disk = Workbook::load(&path).unwrap();
    let ws = from_disk.get_sheet_by_name("Sheet1").unwrap();
    assert_eq!(ws.get_cell_value(2, 2), Some(&CellValue::string("4")));
    assert_eq!(ws.get_cell_value(1, 1), Some(&CellValue::string("name")));
}

#[tokio::test]
async fn test_write_without_range_leaves_short_row_tail() {
    let dir = TempDir::new().unwrap();
    let path = sample_workbook(&dir);
    let server = Server::new(DocumentCache::new());

    call(
        &server,
        1,
        "write_sheet_data",
        json!({
            "fileAbsolutePath": path_arg(&path),
            "sheetName": "Sheet1",
            "data": [["x", "y"], ["z"]],
        }),
    )
    .await;

    let ws_value = Workbook::load(&path).unwrap();
    let ws = ws_value.get_sheet_by_name("Sheet1").unwrap();
    assert_eq!(ws.get_cell_value(1, 2), Some(&CellValue::string("y")));
    assert_eq!(ws.get_cell_value(2, 1), Some(&CellValue::string("z")));
    assert_eq!(ws.get_cell_value(2, 2), Some(&CellValue::Number(3.0)));
}

#[tokio::test]
async fn test_shape_mismatch_is_invalid_params() {
    let dir = TempDir::new().unwrap();
    let path = sample_workbook(&dir);
    let server = Server::new(DocumentCache::new());

    let response = call(
        &server,
        7,
        "write_sheet_data",
        json!({
            "fileAbsolutePath": path_arg(&path),
            "sheetName": "Sheet1",
            "range": "A1:D2",
            "data": [["1", "2", "3"], ["4", "5", "6"]],
        }),
    )
    .await;
    assert_eq!(
        response["error"],
        json!({
            "code": -32602,
            "message": "Number of columns [3] of 'data' argument is not equal to the number of columns of specified range [4]",
        })
    );
}

#[tokio::test]
async fn test_error_messages() {
    let dir = TempDir::new().unwrap();
    let path = sample_workbook(&dir);
    let missing = dir.path().join("missing.xlsx");
    let server = Server::new(DocumentCache::new());

    let response = call(&server, 1, "read_sheet_names", json!({ "fileAbsolutePath": path_arg(&missing) })).await;
    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(
        response["error"]["message"],
        format!("File [{}] not found", missing.display())
    );

    let response = call(
        &server,
        2,
        "read_sheet_data",
        json!({ "fileAbsolutePath": path_arg(&path), "sheetName": "Ghost" }),
    )
    .await;
    assert_eq!(response["error"]["message"], "Sheet Ghost not found");

    let response = call(
        &server,
        3,
        "read_sheet_data",
        json!({ "fileAbsolutePath": path_arg(&path), "range": "bad-range" }),
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);

    let response = call(&server, 4, "drop_table", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["message"], "Tool [drop_table] not found");

    let response = call(&server, 5, "write_sheet_data", json!({ "fileAbsolutePath": path_arg(&path) })).await;
    assert_eq!(response["error"]["code"], -32602);
}

#[tokio::test]
async fn test_formulas_and_copy_sheet() {
    let dir = TempDir::new().unwrap();
    let path = sample_workbook(&dir);
    let server = Server::new(DocumentCache::new());

    let rejected = call(
        &server,
        1,
        "write_sheet_formula",
        json!({
            "fileAbsolutePath": path_arg(&path),
            "sheetName": "Sheet1",
            "range": "C2:C2",
            "formulas": [["B2*2"]],
        }),
    )
    .await;
    assert_eq!(rejected["error"]["code"], -32602);

    let saved = call(
        &server,
        2,
        "write_sheet_formula",
        json!({
            "fileAbsolutePath": path_arg(&path),
            "sheetName": "Sheet1",
            "range": "C2:C2",
            "formulas": [["=B2*2"]],
        }),
    )
    .await;
    assert_eq!(text(&saved), "Formulas saved successfully");

    let copied = call(
        &server,
        3,
        "copy_sheet",
        json!({ "fileAbsolutePath": path_arg(&path), "srcSheetName": "Sheet1", "dstSheetName": "Backup" }),
    )
    .await;
    assert_eq!(text(&copied), "Sheet Sheet1 copied to Backup");

    let reloaded = Workbook::load(&path).unwrap();
    assert_eq!(reloaded.sheet_names(), vec!["Sheet1", "Notes", "Backup"]);
    assert_eq!(
        reloaded.get_sheet_by_name("Backup").unwrap().get_cell_value(2, 3),
        Some(&CellValue::formula("=B2*2"))
    );

    let shown = call(
        &server,
        4,
        "read_sheet_data",
        json!({ "fileAbsolutePath": path_arg(&path), "sheetName": "Backup", "range": "C2:C2", "showFormula": true }),
    )
    .await;
    assert!(text(&shown).contains("<th>=B2*2</th>"));
}

#[tokio::test]
async fn test_describe_sheets() {
    let dir = TempDir::new().unwrap();
    let path = sample_workbook(&dir);
    let server = Server::new(DocumentCache::new());

    let response = call(&server, 1, "describe_sheets", json!({ "fileAbsolutePath": path_arg(&path) })).await;
    let described = text(&response);
    assert!(described.starts_with("[\n  {\n    \"name\": \"Sheet1\""));
    let described: Value = serde_json::from_str(described).unwrap();
    assert_eq!(
        described,
        json!([
            { "name": "Sheet1", "usedRange": "A1:B2" },
            { "name": "Notes", "usedRange": "A1" },
        ])
    );

    let response = call(&server, 2, "describe_sheets", json!({})).await;
    assert_eq!(response["error"]["code"], -32602);
}

#[tokio::test]
async fn test_failed_save_rolls_back_cached_workbook() {
    let dir = TempDir::new().unwrap();
    let path = sample_workbook(&dir);
    let server = Server::new(DocumentCache::new());
    let file = json!({ "fileAbsolutePath": path_arg(&path) });

    call(&server, 1, "read_sheet_names", file.clone()).await;
    // The cached copy stays; saving over a directory fails.
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let write = call(
        &server,
        2,
        "write_sheet_data",
        json!({
            "fileAbsolutePath": path_arg(&path),
            "sheetName": "Sheet1",
            "range": "A1:B1",
            "data": [["lost", "lost"]],
        }),
    )
    .await;
    assert_eq!(write["error"]["code"], -32603);

    let formula = call(
        &server,
        3,
        "write_sheet_formula",
        json!({
            "fileAbsolutePath": path_arg(&path),
            "sheetName": "Sheet1",
            "range": "C1:C1",
            "formulas": [["=B2*2"]],
        }),
    )
    .await;
    assert_eq!(formula["error"]["code"], -32603);

    let copy = call(
        &server,
        4,
        "copy_sheet",
        json!({ "fileAbsolutePath": path_arg(&path), "srcSheetName": "Sheet1", "dstSheetName": "Backup" }),
    )
    .await;
    assert_eq!(copy["error"]["code"], -32603);

    let handle = server.cache().get_or_open(&path).await.unwrap();
    let doc = handle.lock().await;
    assert_eq!(doc.workbook().sheet_names(), vec!["Sheet1", "Notes"]);
    let ws = doc.sheet(Some("Sheet1")).unwrap();
    assert_eq!(ws.get_cell_value(1, 1), Some(&CellValue::string("name")));
    assert_eq!(ws.get_cell_value(1, 2), Some(&CellValue::string("qty")));
    assert_eq!(ws.get_cell_value(1, 3), None);
    assert_eq!(ws.dimension(), "A1:B2");
}
