// Summary workbook: one totals row per employee and a grand total.

use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use taxsheet_payroll::{CellValue, Summary};

use crate::cells::write_value;
use crate::statement::PAPER_A4;

pub const SHEET_NAME: &str = "Summary Totals";
const HEADER_FILL: u32 = 0x4472C4;
const TITLE_ROW: u32 = 0;
const HEADER_ROW: u32 = 1;
const SR_WIDTH: f64 = 6.0;
const NAME_WIDTH: f64 = 30.0;
const VALUE_WIDTH: f64 = 14.0;

pub fn summary_title(school: &str, fiscal_year: &str) -> String {
    format!("{} - Employee Summary Totals ({})", school, fiscal_year)
}

pub fn write_summary(summary: &Summary, school: &str, fiscal_year: &str, path: &Path) -> Result<(), String> {
    let mut workbook = Workbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(SHEET_NAME)
        .map_err(|e| format!("Failed to create sheet '{}': {}", SHEET_NAME, e))?;

    let total_cols = summary.columns.len() as u16 + 2;

    let title = Format::new()
        .set_bold()
        .set_font_size(14)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    worksheet
        .merge_range(TITLE_ROW, 0, TITLE_ROW, total_cols - 1, &summary_title(school, fiscal_year), &title)
        .map_err(|e| format!("Failed to write title: {}", e))?;

    let header = Format::new()
        .set_bold()
        .set_font_size(10)
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap();
    let headers = ["SR.NO", "EMPLOYEE NAME"]
        .into_iter()
        .chain(summary.columns.iter().map(String::as_str));
    for (col, name) in headers.enumerate() {
        write_value(worksheet, HEADER_ROW, col as u16, &CellValue::text(name), &header)?;
    }

    let sr = Format::new().set_border(FormatBorder::Thin).set_align(FormatAlign::Center);
    let name = Format::new().set_border(FormatBorder::Thin);
    let value = Format::new().set_border(FormatBorder::Thin).set_align(FormatAlign::Right);
    let mut row = HEADER_ROW + 1;
    for employee in &summary.rows {
        write_value(worksheet, row, 0, &CellValue::Number(employee.sr_no as f64), &sr)?;
        write_value(worksheet, row, 1, &CellValue::text(employee.name.as_str()), &name)?;
        for (i, (_, total)) in employee.totals.iter().enumerate() {
            write_value(worksheet, row, i as u16 + 2, &CellValue::Number(total), &value)?;
        }
        row += 1;
    }

    let bold_name = name.clone().set_bold();
    let bold_value = value.clone().set_bold();
    write_value(worksheet, row, 0, &CellValue::Empty, &sr)?;
    write_value(worksheet, row, 1, &CellValue::text("GRAND TOTAL"), &bold_name)?;
    for (i, (_, total)) in summary.grand_total.iter().enumerate() {
        write_value(worksheet, row, i as u16 + 2, &CellValue::Number(total), &bold_value)?;
    }

    worksheet
        .set_column_width(0, SR_WIDTH)
        .map_err(|e| format!("Failed to set column width: {}", e))?;
    worksheet
        .set_column_width(1, NAME_WIDTH)
        .map_err(|e| format!("Failed to set column width: {}", e))?;
    for col in 2..total_cols {
        worksheet
            .set_column_width(col, VALUE_WIDTH)
            .map_err(|e| format!("Failed to set column {} width: {}", col, e))?;
    }

    worksheet
        .set_freeze_panes(HEADER_ROW + 1, 2)
        .map_err(|e| format!("Failed to set freeze panes: {}", e))?;
    worksheet.set_landscape();
    worksheet.set_paper_size(PAPER_A4);
    // one page wide, as many tall as needed
    worksheet.set_print_fit_to_pages(1, 0);

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save summary '{}': {}", path.display(), e))?;
    log::info!("summary written: {} ({} employee(s))", path.display(), summary.rows.len());
    Ok(())
}
