use serde::Serialize;

use crate::error::{Warning, WarningScope};
use crate::pivot::EmployeeRecords;
use crate::schema::Schema;
use crate::totals::Totals;

#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub sr_no: usize,
    pub name: String,
    pub totals: Totals,
}

/// One totals row per employee plus the grand total.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub columns: Vec<String>,
    pub rows: Vec<SummaryRow>,
    pub grand_total: Totals,
    pub warnings: Vec<Warning>,
}

/// Totals for every employee over every report column. An employee whose
/// totals cannot be computed is skipped with a warning.
pub fn build_summary(employees: &[EmployeeRecords], schema: &Schema, columns: &[String]) -> Summary {
    let mut summary = Summary {
        columns: columns.to_vec(),
        grand_total: Totals {
            columns: columns.to_vec(),
            values: vec![0.0; columns.len()],
        },
        ..Summary::default()
    };

    for employee in employees {
        match employee.summary_totals(schema, columns) {
            Ok(totals) => {
                summary.grand_total.accumulate(&totals);
                summary.rows.push(SummaryRow {
                    sr_no: summary.rows.len() + 1,
                    name: employee.name.clone(),
                    totals,
                });
            }
            Err(e) => summary
                .warnings
                .push(Warning::from_error(WarningScope::Employee, &employee.name, &e)),
        }
    }

    log::info!("summary: {} employee(s), {} column(s)", summary.rows.len(), columns.len());
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::partition_employees;
    use crate::schema::PT;
    use crate::table::{RawTable, Table};
    use crate::value::CellValue;

    fn t(s: &str) -> CellValue {
        CellValue::text(s)
    }

    #[test]
    fn rows_sorted_by_name_with_grand_total() {
        let schema = Schema::default();
        let raw = RawTable::new(vec![
            vec![t("SR.NO"), t("EMPLOYEE NAME"), t("Month"), t("PT"), t("HRA")],
            vec![t("1"), t("zed"), t("apr 25"), t("200"), t("10")],
            vec![t("2"), t("amy"), t("jan 26"), t("200"), t("")],
            vec![t("3"), t("nan"), t("jan 26"), t("200"), t("5")],
        ]);
        let table = Table::with_header(&raw, 0);
        let employees = partition_employees(&table, &schema);
        let columns = schema.report_columns(&table.columns);
        let summary = build_summary(&employees, &schema, &columns);

        assert_eq!(summary.columns, vec!["HRA", "PT"]);
        assert_eq!(summary.rows.len(), 2);
        assert_eq!(summary.rows[0].name, "AMY");
        assert_eq!(summary.rows[0].sr_no, 1);
        // jan row plus projected feb
        assert_eq!(summary.rows[0].totals.get(PT), 500.0);
        assert_eq!(summary.rows[1].name, "ZED");
        assert_eq!(summary.grand_total.get(PT), 700.0);
        assert_eq!(summary.grand_total.get("HRA"), 10.0);
        assert!(summary.warnings.is_empty());
    }

    #[test]
    fn failing_employee_becomes_warning() {
        let schema = Schema::default();
        let employees = vec![EmployeeRecords {
            name: "GHOST".into(),
            rows: vec![],
        }];
        let summary = build_summary(&employees, &schema, &[]);
        assert!(summary.rows.is_empty());
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(summary.warnings[0].subject, "GHOST");
    }
}
