// Income-tax statement workbook for one employee, rendered from the layout
// model in `taxsheet_payroll::statement`.

use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use taxsheet_payroll::statement::{HEADER_ROW, NAME_ROW, TITLE_ROW};
use taxsheet_payroll::{CellValue, Statement};

use crate::cells::write_value;

pub const SHEET_NAME: &str = "Income Tax Details";
/// Excel paper size code for A4.
pub const PAPER_A4: u8 = 9;

pub fn write_statement(statement: &Statement, path: &Path) -> Result<(), String> {
    let mut workbook = Workbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(SHEET_NAME)
        .map_err(|e| format!("Failed to create sheet '{}': {}", SHEET_NAME, e))?;

    write_body(worksheet, statement)?;
    apply_page_setup(worksheet, statement)?;

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save statement '{}': {}", path.display(), e))?;
    log::debug!("statement written: {}", path.display());
    Ok(())
}

fn write_body(worksheet: &mut Worksheet, statement: &Statement) -> Result<(), String> {
    let last_col = statement.total_cols().saturating_sub(1);

    let title = Format::new()
        .set_bold()
        .set_font_size(14)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    if last_col > 0 {
        worksheet
            .merge_range(TITLE_ROW, 0, TITLE_ROW, last_col, &statement.title, &title)
            .map_err(|e| format!("Failed to write title: {}", e))?;
    } else {
        write_value(worksheet, TITLE_ROW, 0, &CellValue::text(statement.title.as_str()), &title)?;
    }

    let bold = Format::new().set_bold();
    write_text(worksheet, NAME_ROW, 0, &statement.employee_line, &bold)?;
    write_text(worksheet, NAME_ROW, statement.school_col(), &statement.school, &bold)?;

    let header = Format::new()
        .set_bold()
        .set_font_size(9)
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap();
    for (col, name) in statement.headers.iter().enumerate() {
        write_text(worksheet, HEADER_ROW, col as u16, name, &header)?;
    }

    let first = Format::new().set_border(FormatBorder::Thin);
    let rest = first.clone().set_align(FormatAlign::Right);
    for (i, cells) in statement.data_rows.iter().enumerate() {
        let row = HEADER_ROW + 1 + i as u32;
        for (col, value) in cells.iter().enumerate() {
            let format = if col == 0 { &first } else { &rest };
            write_value(worksheet, row, col as u16, value, format)?;
        }
    }

    let total_first = Format::new().set_bold().set_border(FormatBorder::Thin);
    let total_rest = total_first.clone().set_align(FormatAlign::Right);
    let total_row = statement.total_row_index();
    for (col, value) in statement.total_row.iter().enumerate() {
        let format = if col == 0 { &total_first } else { &total_rest };
        write_value(worksheet, total_row, col as u16, value, format)?;
    }

    write_text(worksheet, statement.disclaimer_row(), 0, &statement.disclaimer, &Format::new())?;

    let signature_row = statement.signature_row();
    write_text(worksheet, signature_row, 0, &statement.employee_signature, &bold)?;
    write_text(
        worksheet,
        signature_row,
        statement.headmaster_col(),
        &statement.headmaster_signature,
        &bold,
    )?;
    write_text(worksheet, signature_row + 1, 0, &statement.employee_line, &bold)?;

    for (col, width) in statement.column_widths.iter().enumerate() {
        worksheet
            .set_column_width(col as u16, *width)
            .map_err(|e| format!("Failed to set column {} width: {}", col, e))?;
    }
    Ok(())
}

fn write_text(worksheet: &mut Worksheet, row: u32, col: u16, text: &str, format: &Format) -> Result<(), String> {
    if text.is_empty() {
        return Ok(());
    }
    write_value(worksheet, row, col, &CellValue::text(text), format)
}

/// A4 landscape on a single page, header row repeated, centered.
fn apply_page_setup(worksheet: &mut Worksheet, statement: &Statement) -> Result<(), String> {
    worksheet.set_landscape();
    worksheet.set_paper_size(PAPER_A4);
    worksheet.set_print_fit_to_pages(1, 1);
    worksheet.set_margins(0.3, 0.3, 0.4, 0.4, 0.2, 0.2);
    worksheet.set_print_center_horizontally(true);
    worksheet
        .set_print_area(0, 0, statement.last_row(), statement.last_col())
        .map_err(|e| format!("Failed to set print area: {}", e))?;
    worksheet
        .set_repeat_rows(HEADER_ROW, HEADER_ROW)
        .map_err(|e| format!("Failed to set repeat rows: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::read_first_sheet;
    use taxsheet_payroll::statement::FIRST_DATA_ROW;
    use taxsheet_payroll::{partition_employees, RawTable, ReportLabels, Schema, Table};

    fn t(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn statement() -> Statement {
        let schema = Schema::default();
        let raw = RawTable::new(vec![
            vec![t("SR.NO"), t("EMPLOYEE NAME"), t("GENDER M/F"), t("NAME OF SCHOOL"), t("Month"), t("PT"), t("INCOME TAX")],
            vec![t("1"), t("John Doe"), t("M"), t("ZP SCHOOL"), t("apr 25"), t("200"), t("500")],
            vec![t("1"), t("John Doe"), t("M"), t("ZP SCHOOL"), t("jan26"), t("200"), t("500")],
        ]);
        let table = Table::with_header(&raw, 0);
        let columns = schema.report_columns(&table.columns);
        let employees = partition_employees(&table, &schema);
        let sheet = employees[0].prepare(&schema, &columns).unwrap();
        Statement::build(&sheet, &schema, &ReportLabels::default())
    }

    #[test]
    fn statement_layout_lands_on_expected_rows() {
        let statement = statement();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("JOHN DOE.xlsx");
        write_statement(&statement, &path).unwrap();

        let (name, raw) = read_first_sheet(&path).unwrap();
        assert_eq!(name, SHEET_NAME);
        assert_eq!(raw.row(0)[0], t("INCOME TAX DETAILS 2025-26"));
        assert_eq!(raw.row(1)[0], t("SHRI JOHN DOE"));
        assert_eq!(raw.row(HEADER_ROW as usize)[0], t("SR. NO."));
        assert_eq!(raw.row(HEADER_ROW as usize)[1], t("MONTH"));
        assert_eq!(raw.row(FIRST_DATA_ROW as usize)[1], t("Apr-2025"));
        // apr, jan, projected feb
        assert_eq!(raw.row(FIRST_DATA_ROW as usize + 2)[1], t("Feb-2026"));

        let total = statement.total_row_index() as usize;
        assert_eq!(raw.row(total)[1], t("Total"));
        assert_eq!(raw.row(statement.disclaimer_row() as usize)[0], t(&statement.disclaimer));
        let signature = statement.signature_row() as usize;
        assert_eq!(raw.row(signature)[0], t("Employee Signature"));
        assert_eq!(raw.row(signature)[statement.headmaster_col() as usize], t("Headmaster"));
        assert_eq!(raw.row(signature + 1)[0], t("SHRI JOHN DOE"));
    }

    #[test]
    fn school_name_sits_in_its_column() {
        let statement = statement();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.xlsx");
        write_statement(&statement, &path).unwrap();

        let (_, raw) = read_first_sheet(&path).unwrap();
        assert_eq!(raw.row(1)[statement.school_col() as usize], t("ZP SCHOOL"));
    }
}
