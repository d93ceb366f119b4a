//! Layout model for one employee's income-tax statement.
//!
//! Pure data: positions, labels and widths. The xlsx writer in `taxsheet-io`
//! turns it into a workbook.

use serde::Deserialize;

use crate::pivot::EmployeeSheet;
use crate::schema::{self, Schema};
use crate::value::CellValue;

/// Printable width of an A4 landscape page, in Excel character units.
pub const PAGE_WIDTH: f64 = 140.0;
pub const SR_NO_WIDTH: f64 = 6.0;
pub const MONTH_WIDTH: f64 = 11.0;
pub const MIN_DATA_WIDTH: f64 = 8.0;
pub const MAX_DATA_WIDTH: f64 = 15.0;

// 0-based sheet rows
pub const TITLE_ROW: u32 = 0;
pub const NAME_ROW: u32 = 1;
pub const HEADER_ROW: u32 = 2;
pub const FIRST_DATA_ROW: u32 = 3;

/// Fixed texts of the statement.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportLabels {
    pub title: String,
    pub fiscal_year: String,
    pub disclaimer: String,
    pub employee_signature: String,
    pub headmaster_signature: String,
    pub male_salutation: String,
    pub female_salutation: String,
}

/// Fiscal year printed when settings give none.
pub const DEFAULT_FISCAL_YEAR: &str = "2025-26";

pub fn default_title(fiscal_year: &str) -> String {
    format!("INCOME TAX DETAILS {fiscal_year}")
}

impl Default for ReportLabels {
    fn default() -> Self {
        Self::for_fiscal_year(DEFAULT_FISCAL_YEAR)
    }
}

impl ReportLabels {
    /// Built-in wording, titled for `fiscal_year`.
    pub fn for_fiscal_year(fiscal_year: &str) -> Self {
        Self {
            title: default_title(fiscal_year),
            fiscal_year: fiscal_year.to_string(),
            disclaimer: "या तक्त्यात काही चूक आढळून आल्यास तात्काळ मुख्याध्यापकांच्या लक्षात आणून द्यावी, नजरचुकीने काही चूक झाल्यास लागणा-या आयकरास कर्मचारी स्वत: जबाबदार राहील.".to_string(),
            employee_signature: "Employee Signature".to_string(),
            headmaster_signature: "Headmaster".to_string(),
            male_salutation: "SHRI".to_string(),
            female_salutation: "SHRIMATI".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub title: String,
    /// "SHRI JOHN DOE"
    pub employee_line: String,
    pub school: String,
    pub headers: Vec<String>,
    /// Real months followed by the projected terminal row, if any.
    pub data_rows: Vec<Vec<CellValue>>,
    pub projected_rows: usize,
    pub total_row: Vec<CellValue>,
    pub disclaimer: String,
    pub employee_signature: String,
    pub headmaster_signature: String,
    pub column_widths: Vec<f64>,
}

impl Statement {
    pub fn build(sheet: &EmployeeSheet, schema: &Schema, labels: &ReportLabels) -> Self {
        let first = sheet.first_row();
        let gender = first
            .map(|r| r.text(schema::GENDER).to_uppercase())
            .unwrap_or_default();
        let salutation = if gender == "M" {
            &labels.male_salutation
        } else {
            &labels.female_salutation
        };
        let school = first.map(|r| r.text(schema::SCHOOL_NAME)).unwrap_or_default();

        let mut headers = vec!["SR. NO.".to_string(), "MONTH".to_string()];
        headers.extend(sheet.active_columns.iter().cloned());

        let mut data_rows = Vec::with_capacity(sheet.rows.len() + 1);
        for (idx, row) in sheet.rows.iter().enumerate() {
            let month = row.month();
            let mut cells = vec![
                CellValue::Number((idx + 1) as f64),
                CellValue::text(schema.month_label(&month)),
            ];
            for col in &sheet.active_columns {
                cells.push(display_value(row.get(col)));
            }
            data_rows.push(cells);
        }

        let mut projected_rows = 0;
        if let Some(projected) = &sheet.projected {
            let label = schema
                .terminal_month()
                .map(|m| m.label.clone())
                .unwrap_or_else(|| projected.month());
            let mut cells = vec![
                CellValue::Number((data_rows.len() + 1) as f64),
                CellValue::text(label),
            ];
            for col in &sheet.active_columns {
                cells.push(display_value(projected.get(col)));
            }
            data_rows.push(cells);
            projected_rows = 1;
        }

        let mut total_row = vec![CellValue::text(""), CellValue::text("Total")];
        total_row.extend(sheet.totals.iter().map(|(_, v)| CellValue::Number(v)));

        let column_widths = column_widths(headers.len());

        Self {
            title: labels.title.clone(),
            employee_line: format!("{salutation} {}", sheet.name),
            school,
            headers,
            data_rows,
            projected_rows,
            total_row,
            disclaimer: labels.disclaimer.clone(),
            employee_signature: labels.employee_signature.clone(),
            headmaster_signature: labels.headmaster_signature.clone(),
            column_widths,
        }
    }

    pub fn total_cols(&self) -> u16 {
        self.headers.len() as u16
    }

    /// 0-based column of the school name: the 10th column, or the last.
    pub fn school_col(&self) -> u16 {
        self.total_cols().min(10).saturating_sub(1)
    }

    /// 0-based column of the headmaster signature.
    pub fn headmaster_col(&self) -> u16 {
        self.total_cols().saturating_sub(3).max(14) - 1
    }

    pub fn total_row_index(&self) -> u32 {
        FIRST_DATA_ROW + self.data_rows.len() as u32
    }

    pub fn disclaimer_row(&self) -> u32 {
        self.total_row_index() + 2
    }

    pub fn signature_row(&self) -> u32 {
        self.disclaimer_row() + 2
    }

    /// Last used row; the print area ends here.
    pub fn last_row(&self) -> u32 {
        self.signature_row() + 1
    }

    /// Rightmost used column, including the signature.
    pub fn last_col(&self) -> u16 {
        self.total_cols().saturating_sub(1).max(self.headmaster_col())
    }
}

/// Widths for the first two fixed columns and the evenly shared rest.
pub fn column_widths(total_cols: usize) -> Vec<f64> {
    let mut widths = vec![SR_NO_WIDTH, MONTH_WIDTH];
    let data_cols = total_cols.saturating_sub(2);
    if data_cols > 0 {
        let share = (PAGE_WIDTH - SR_NO_WIDTH - MONTH_WIDTH) / data_cols as f64;
        let width = share.clamp(MIN_DATA_WIDTH, MAX_DATA_WIDTH);
        widths.extend(std::iter::repeat(width).take(data_cols));
    }
    widths.truncate(total_cols.max(2));
    widths
}

fn display_value(value: &CellValue) -> CellValue {
    if value.is_blank() {
        CellValue::Empty
    } else {
        value.clone()
    }
}

/// Output file stem for an employee: `/ \ : * ? " < > |` become `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::partition_employees;
    use crate::schema::{GROUP_ACCIDENTAL_POLICY, INCOME_TAX, PT};
    use crate::table::{RawTable, Table};

    fn t(s: &str) -> CellValue {
        CellValue::text(s)
    }

    fn n(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    fn john_doe() -> (Schema, EmployeeSheet) {
        let schema = Schema::default();
        let raw = RawTable::new(vec![
            vec![
                t("SR.NO"),
                t("EMPLOYEE NAME"),
                t("GENDER M/F"),
                t("NAME OF SCHOOL"),
                t("PT"),
                t("GROUP ACCIDENTAL POLICY"),
                t("INCOME TAX"),
            ],
            vec![n(1.0), t("John Doe"), t(" m "), t("ZP SCHOOL"), n(200.0), CellValue::Empty, n(100.0)],
            vec![n(1.0), t("John Doe"), t("M"), t("ZP SCHOOL"), n(200.0), CellValue::Empty, n(100.0)],
        ]);
        let mut table = Table::with_header(&raw, 0);
        table.records[0].set("Month", t("apr 25"));
        table.records[1].set("Month", t("jan26"));
        let employees = partition_employees(&table, &schema);
        let columns = schema.report_columns(&table.columns);
        let sheet = employees[0].prepare(&schema, &columns).unwrap();
        (schema, sheet)
    }

    #[test]
    fn statement_rows_for_projected_employee() {
        let (schema, sheet) = john_doe();
        let st = Statement::build(&sheet, &schema, &ReportLabels::default());

        assert_eq!(st.employee_line, "SHRI JOHN DOE");
        assert_eq!(st.school, "ZP SCHOOL");
        assert_eq!(
            st.headers,
            vec!["SR. NO.", "MONTH", PT, GROUP_ACCIDENTAL_POLICY, INCOME_TAX]
        );
        assert_eq!(st.data_rows.len(), 3);
        assert_eq!(st.projected_rows, 1);
        assert_eq!(st.data_rows[0][1], t("Apr-2025"));
        assert_eq!(st.data_rows[1][1], t("Jan-2026"));
        assert_eq!(st.data_rows[2], vec![n(3.0), t("Feb-2026"), n(300.0), n(531.0), n(0.0)]);
        // blank GROUP ACCIDENTAL POLICY renders as an empty cell
        assert_eq!(st.data_rows[0][3], CellValue::Empty);
        assert_eq!(st.total_row, vec![t(""), t("Total"), n(700.0), n(531.0), n(200.0)]);
    }

    #[test]
    fn layout_positions() {
        let (schema, sheet) = john_doe();
        let st = Statement::build(&sheet, &schema, &ReportLabels::default());
        assert_eq!(st.total_cols(), 5);
        assert_eq!(st.school_col(), 4);
        assert_eq!(st.headmaster_col(), 13);
        assert_eq!(st.total_row_index(), 6);
        assert_eq!(st.disclaimer_row(), 8);
        assert_eq!(st.signature_row(), 10);
        assert_eq!(st.last_row(), 11);
        assert_eq!(st.last_col(), 13);
    }

    #[test]
    fn salutation_defaults_to_shrimati() {
        let (schema, mut sheet) = john_doe();
        for row in &mut sheet.rows {
            row.set("GENDER M/F", CellValue::Empty);
        }
        let st = Statement::build(&sheet, &schema, &ReportLabels::default());
        assert_eq!(st.employee_line, "SHRIMATI JOHN DOE");
    }

    #[test]
    fn widths_are_clamped() {
        assert_eq!(column_widths(2), vec![6.0, 11.0]);
        // 123 / 3 = 41 -> 15
        assert_eq!(column_widths(5), vec![6.0, 11.0, 15.0, 15.0, 15.0]);
        // 123 / 20 = 6.15 -> 8
        assert!(column_widths(22)[2..].iter().all(|w| *w == 8.0));
        // 123 / 10 = 12.3 passes through
        assert!((column_widths(12)[2] - 12.3).abs() < 1e-9);
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("A/B\\C:D*E?F\"G<H>I|J"), "A_B_C_D_E_F_G_H_I_J");
        assert_eq!(sanitize_file_name("JOHN DOE"), "JOHN DOE");
    }

    #[test]
    fn default_title_follows_fiscal_year() {
        assert_eq!(ReportLabels::default().title, "INCOME TAX DETAILS 2025-26");
        let labels = ReportLabels::for_fiscal_year("2026-27");
        assert_eq!(labels.title, "INCOME TAX DETAILS 2026-27");
        assert_eq!(labels.fiscal_year, "2026-27");
    }
}
