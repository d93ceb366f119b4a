// Source spreadsheet reading (xls, xlsx) through calamine.
//
// Cells keep their absolute sheet positions: a range that starts at C4 is
// padded with empty rows and columns so that row indices match the sheet.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use taxsheet_payroll::header::locate_header;
use taxsheet_payroll::{CellValue, PayrollError, RawTable, Table};

/// Read every sheet of a workbook, in workbook order.
pub fn read_sheets(path: &Path) -> Result<Vec<(String, RawTable)>, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| format!("Failed to read sheet '{}': {}", name, e))?;
        sheets.push((name, range_to_raw(&range)));
    }
    Ok(sheets)
}

/// Read the first sheet only; source files carry one pay bill each.
pub fn read_first_sheet(path: &Path) -> Result<(String, RawTable), String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;
    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "Excel file contains no sheets".to_string())?;
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", name, e))?;
    Ok((name, range_to_raw(&range)))
}

fn range_to_raw(range: &calamine::Range<Data>) -> RawTable {
    let (height, width) = range.get_size();
    if height == 0 || width == 0 {
        return RawTable::default();
    }

    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(data_to_cell));
        rows.push(cells);
    }
    RawTable::new(rows)
}

pub fn data_to_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => {
            if s.is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        // Serial number, as stored
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Load one source file of a month folder: locate the header, apply it,
/// drop blank and grand-total rows, stamp file and month.
pub fn load_source(path: &Path, month: &str, scan_rows: usize) -> Result<Table, PayrollError> {
    let file = file_name(path);
    let (_, raw) = read_first_sheet(path).map_err(|message| PayrollError::FileLoad {
        file: file.clone(),
        message,
    })?;
    let header_row = locate_header(&raw, scan_rows)?;
    let table = Table::from_raw(&raw, header_row, &file, month);
    log::debug!("{file}: header at row {header_row}, {} row(s)", table.len());
    Ok(table)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
