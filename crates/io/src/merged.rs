// Merged monthly workbook: one sheet per month folder, each carrying the
// style donor's heading block above the consolidated table.

use std::collections::BTreeMap;
use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use taxsheet_payroll::header::locate_header_or_first;
use taxsheet_payroll::merge::MonthTable;
use taxsheet_payroll::schema::MONTH;
use taxsheet_payroll::{CellValue, Table};

use crate::cells::{bordered, display_len, donor_format, write_value};
use crate::donor::StyleDonor;
use crate::source;

/// Auto-widened columns never exceed this width.
pub const MAX_AUTO_WIDTH: f64 = 50.0;

#[derive(Debug, Default, Clone)]
pub struct MergedWriteResult {
    pub sheets: usize,
    pub rows: usize,
}

/// Write every month table to its own sheet. `donor` supplies the heading
/// block and header styles; without one the table starts at row 0.
pub fn write_merged_workbook(
    months: &[MonthTable],
    donor: Option<&StyleDonor>,
    path: &Path,
) -> Result<MergedWriteResult, String> {
    let mut workbook = Workbook::new();
    let mut result = MergedWriteResult::default();

    for month in months {
        let worksheet = workbook
            .add_worksheet()
            .set_name(&month.sheet_name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", month.sheet_name, e))?;

        let header_row = match donor {
            Some(donor) => {
                write_heading(worksheet, donor)?;
                donor.header_row as u32 + 1
            }
            None => 0,
        };
        write_table(worksheet, &month.table, header_row, donor)?;

        result.sheets += 1;
        result.rows += month.table.len();
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save merged workbook: {}", e))?;
    log::info!(
        "merged workbook {}: {} sheet(s), {} row(s)",
        path.display(),
        result.sheets,
        result.rows
    );
    Ok(result)
}

fn write_heading(worksheet: &mut Worksheet, donor: &StyleDonor) -> Result<(), String> {
    // Merges first: merge_range blanks the whole range, the origin value is
    // written over it below.
    for m in &donor.merges {
        let origin = donor
            .heading
            .iter()
            .find(|c| c.row == m.first_row && c.col == m.first_col);
        let format = origin
            .map(|c| donor_format(&c.style))
            .unwrap_or_default()
            .set_align(FormatAlign::VerticalCenter);
        worksheet
            .merge_range(m.first_row, m.first_col, m.last_row, m.last_col, "", &format)
            .map_err(|e| format!("Failed to write merge: {}", e))?;
    }

    for cell in &donor.heading {
        let format = donor_format(&cell.style).set_align(FormatAlign::VerticalCenter);
        write_value(worksheet, cell.row, cell.col, &cell.value, &format)?;
    }

    for (row, height) in &donor.row_heights {
        worksheet
            .set_row_height(*row, *height)
            .map_err(|e| format!("Failed to set row {} height: {}", row, e))?;
    }
    Ok(())
}

fn write_table(
    worksheet: &mut Worksheet,
    table: &Table,
    header_row: u32,
    donor: Option<&StyleDonor>,
) -> Result<(), String> {
    let data_format = bordered();

    for (col, name) in table.columns.iter().enumerate() {
        let base = match donor.and_then(|d| d.header_style(col)) {
            Some(style) => donor_format(style),
            None => Format::new().set_bold(),
        };
        let format = base
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap()
            .set_border(FormatBorder::Thin);
        write_value(worksheet, header_row, col as u16, &CellValue::text(name.as_str()), &format)?;
    }

    for (i, record) in table.records.iter().enumerate() {
        let row = header_row + 1 + i as u32;
        for (col, name) in table.columns.iter().enumerate() {
            write_value(worksheet, row, col as u16, record.get(name), &data_format)?;
        }
    }

    for (col, width) in column_widths(table, donor) {
        worksheet
            .set_column_width(col, width)
            .map_err(|e| format!("Failed to set column {} width: {}", col, e))?;
    }
    Ok(())
}

/// Every donor column width (heading merges may reach past the table),
/// with table columns widened to fit their content up to `MAX_AUTO_WIDTH`.
pub fn column_widths(table: &Table, donor: Option<&StyleDonor>) -> Vec<(u16, f64)> {
    let mut widths: BTreeMap<u16, f64> = donor
        .map(|d| d.col_widths.clone())
        .unwrap_or_default();

    for (col, name) in table.columns.iter().enumerate() {
        let longest = table
            .records
            .iter()
            .map(|r| display_len(r.get(name)))
            .chain(std::iter::once(name.chars().count()))
            .max()
            .unwrap_or(0);
        let fitted = ((longest + 2) as f64).min(MAX_AUTO_WIDTH);
        let width = widths.entry(col as u16).or_insert(fitted);
        if *width < fitted {
            *width = fitted;
        }
    }
    widths.into_iter().collect()
}

/// Read the merged workbook back into one table. Each sheet's header is
/// searched in its first `scan_rows` rows (row 0 when absent); records
/// without a month take the sheet name.
pub fn reload_merged(path: &Path, scan_rows: usize) -> Result<Table, String> {
    let sheets = source::read_sheets(path)?;
    let tables = sheets.into_iter().map(|(name, raw)| {
        let header_row = locate_header_or_first(&raw, scan_rows);
        let mut table = Table::with_header(&raw, header_row);
        table.fill_blank(MONTH, &name);
        log::debug!("{name}: header at row {header_row}, {} row(s)", table.len());
        table
    });
    let table = Table::concat(tables);
    log::info!("reloaded {}: {} row(s)", path.display(), table.len());
    Ok(table)
}
