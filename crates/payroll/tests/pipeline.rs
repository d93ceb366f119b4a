use proptest::prelude::*;

use taxsheet_payroll::header::{locate_header, SOURCE_SCAN_ROWS};
use taxsheet_payroll::schema::{GROUP_ACCIDENTAL_POLICY, INCOME_TAX, PT};
use taxsheet_payroll::{
    build_summary, partition_employees, CellValue, MonthGroups, RawTable, ReportLabels, Schema,
    Statement, Table,
};

fn t(s: &str) -> CellValue {
    CellValue::text(s)
}

fn n(v: f64) -> CellValue {
    CellValue::Number(v)
}

/// A source sheet as a school clerk produces it: letterhead, blank row,
/// header, employees, trailing grand total.
fn source_sheet(employees: &[(&str, &str, f64, f64)]) -> RawTable {
    let mut rows = vec![
        vec![t("ZILLA PARISHAD PRIMARY SCHOOL")],
        vec![t("PAY BILL")],
        vec![],
        vec![
            t("SR.NO"),
            t("EMPLOYEE NAME"),
            t("GENDER M/F"),
            t("NAME OF SCHOOL"),
            t("BASIC PAY"),
            t("PT"),
            t("GROUP ACCIDENTAL POLICY"),
            t("INCOME TAX"),
            t("NPS TOTAL"),
        ],
    ];
    let mut pt_sum = 0.0;
    for (i, (name, gender, pt, tax)) in employees.iter().enumerate() {
        pt_sum += pt;
        rows.push(vec![
            n(i as f64 + 1.0),
            t(name),
            t(gender),
            t("ZP SCHOOL PALASGAON"),
            n(30000.0),
            n(*pt),
            n(0.0),
            n(*tax),
            n(1200.0),
        ]);
    }
    rows.push(vec![
        t("Grand Total"),
        CellValue::Empty,
        CellValue::Empty,
        CellValue::Empty,
        n(30000.0 * employees.len() as f64),
        n(pt_sum),
    ]);
    RawTable::new(rows)
}

fn load(raw: &RawTable, file: &str, month: &str) -> Table {
    let header = locate_header(raw, SOURCE_SCAN_ROWS).unwrap();
    Table::from_raw(raw, header, file, month)
}

fn merged() -> Table {
    let mut groups = MonthGroups::new();
    let apr = source_sheet(&[("John Doe", "M", 200.0, 500.0), ("Asha Patil", "F", 0.0, 0.0)]);
    let jan = source_sheet(&[("JOHN DOE", "M", 200.0, 500.0)]);
    let feb = source_sheet(&[("asha patil", "F", 300.0, 700.0)]);
    groups.add("apr 25", "a.xls", load(&apr, "a.xls", "apr 25"));
    groups.add("jan26", "b.xls", load(&jan, "b.xls", "jan26"));
    groups.add("FEB 26", "c.xls", load(&feb, "c.xls", "FEB 26"));
    let months = groups.into_month_tables();
    Table::concat(months.into_iter().map(|m| m.table))
}

#[test]
fn header_found_below_letterhead() {
    let raw = source_sheet(&[("A", "M", 0.0, 0.0)]);
    assert_eq!(locate_header(&raw, SOURCE_SCAN_ROWS).unwrap(), 3);
}

#[test]
fn grand_total_rows_never_reach_the_merge() {
    let table = merged();
    assert_eq!(table.len(), 4);
    assert!(table
        .records
        .iter()
        .all(|r| !r.text("SR.NO").eq_ignore_ascii_case("grand total")));
}

#[test]
fn john_doe_statement_end_to_end() {
    let schema = Schema::default();
    let table = merged();
    let columns = schema.report_columns(&table.columns);
    assert!(!columns.iter().any(|c| c == "NPS TOTAL"));

    let employees = partition_employees(&table, &schema);
    let john = employees.iter().find(|e| e.name == "JOHN DOE").unwrap();
    let sheet = john.prepare(&schema, &columns).unwrap();
    let statement = Statement::build(&sheet, &schema, &ReportLabels::default());

    assert_eq!(statement.data_rows.len(), 3);
    let feb = &statement.data_rows[2];
    let col = |name: &str| statement.headers.iter().position(|h| h == name).unwrap();
    assert_eq!(feb[1], t("Feb-2026"));
    assert_eq!(feb[col(PT)], n(300.0));
    assert_eq!(feb[col(GROUP_ACCIDENTAL_POLICY)], n(531.0));
    assert_eq!(feb[col(INCOME_TAX)], n(0.0));
    assert_eq!(statement.total_row[col(PT)], n(700.0));
    assert_eq!(statement.employee_line, "SHRI JOHN DOE");
}

#[test]
fn real_terminal_month_income_tax_is_zeroed() {
    let schema = Schema::default();
    let table = merged();
    let columns = schema.report_columns(&table.columns);
    let employees = partition_employees(&table, &schema);
    let asha = employees.iter().find(|e| e.name == "ASHA PATIL").unwrap();
    let sheet = asha.prepare(&schema, &columns).unwrap();

    assert!(sheet.projected.is_none());
    assert_eq!(sheet.totals.get(INCOME_TAX), 0.0);
    assert_eq!(sheet.totals.get(PT), 300.0);
    assert!(sheet.active_columns.iter().any(|c| c == INCOME_TAX));

    let statement = Statement::build(&sheet, &schema, &ReportLabels::default());
    assert_eq!(statement.employee_line, "SHRIMATI ASHA PATIL");
}

#[test]
fn summary_matches_statement_totals() {
    let schema = Schema::default();
    let table = merged();
    let columns = schema.report_columns(&table.columns);
    let employees = partition_employees(&table, &schema);
    let summary = build_summary(&employees, &schema, &columns);

    assert_eq!(summary.rows.len(), 2);
    assert_eq!(summary.rows[0].name, "ASHA PATIL");
    assert_eq!(summary.rows[1].totals.get(PT), 700.0);
    assert_eq!(summary.grand_total.get(PT), 1000.0);
    assert_eq!(summary.grand_total.get(GROUP_ACCIDENTAL_POLICY), 531.0);
}

proptest! {
    #[test]
    fn month_lookup_ignores_case_and_spacing(
        idx in 0usize..12,
        upper in any::<bool>(),
        lead in 0usize..3,
        inner in 0usize..3,
        trail in 0usize..3,
    ) {
        let schema = Schema::default();
        let key = &schema.months[idx].key;
        let (mon, year) = key.split_at(3);
        let mon = if upper { mon.to_uppercase() } else { mon.to_string() };
        let token = format!(
            "{}{}{}{}{}",
            " ".repeat(lead),
            mon,
            " ".repeat(inner),
            year.trim(),
            " ".repeat(trail)
        );
        prop_assert_eq!(schema.month_label(&token), schema.months[idx].label.as_str());
        prop_assert_eq!(schema.month_order(&token), idx as u32);
    }
}
